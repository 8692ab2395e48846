//! Block wire structure (§6): `{previous_id, timestamp, witness,
//! transaction_merkle_root, extensions, witness_signature,
//! [signed_transactions]}`. Block id is `sha256(header)` with the block
//! number folded into the high 32 bits by the caller that assigns ids.

use serde::{Deserialize, Serialize};

use crate::transaction::SignedTransaction;
use crate::types::{AccountName, BlockId, Signature, Timestamp};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum BlockExtension {
    None,
}

/// The signed portion of a block, hashed to produce its id.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlockHeader {
    pub previous_id: BlockId,
    pub timestamp: Timestamp,
    pub witness: AccountName,
    pub transaction_merkle_root: BlockId,
    pub extensions: Vec<BlockExtension>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub witness_signature: Signature,
    pub transactions: Vec<SignedTransaction>,
}

impl Block {
    pub fn canonical_header_bytes(&self) -> Vec<u8> {
        bincode::serialize(&self.header).expect("block header serialization is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_of_encode_header_round_trips() {
        let header = BlockHeader {
            previous_id: crate::types::Sha256Digest([3u8; 32]),
            timestamp: 1_700_000_600,
            witness: AccountName::new_unchecked("initminer"),
            transaction_merkle_root: crate::types::Sha256Digest([9u8; 32]),
            extensions: vec![BlockExtension::None],
        };
        let bytes = bincode::serialize(&header).expect("encode");
        let decoded: BlockHeader = bincode::deserialize(&bytes).expect("round-trip decode");
        assert_eq!(decoded, header);
    }
}
