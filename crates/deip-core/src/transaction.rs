use serde::{Deserialize, Serialize};

use crate::operation::Operation;
use crate::types::{Signature, Timestamp, TxId};

/// A transaction body (§4.2): `(ref_block_num, ref_block_prefix,
/// expiration, [operations], [extensions])`. Its digest is the canonical
/// binary serialization of exactly these fields.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: Timestamp,
    pub operations: Vec<Operation>,
    pub extensions: Vec<TransactionExtension>,
}

/// Extension slots reserved on the wire (§6); only the tenant affirmation
/// is defined today.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum TransactionExtension {
    TenantAffirmation { tenant_external_id: [u8; 20] },
}

impl Transaction {
    /// Canonical bytes hashed to produce the transaction id and signed
    /// (after prefixing the chain id) to produce the signing digest.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("transaction serialization is infallible")
    }
}

/// A transaction plus the signatures authorizing it (§4.2). `tenant_signature`
/// is present only when the node's configured tenant requires a second
/// affirming signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<Signature>,
    pub tenant_signature: Option<Signature>,
}

impl SignedTransaction {
    pub fn id(&self, hasher: impl Fn(&[u8]) -> TxId) -> TxId {
        hasher(&self.transaction.canonical_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Asset;
    use crate::operation::Operation;
    use crate::types::AccountName;

    fn sample() -> Transaction {
        Transaction {
            ref_block_num: 42,
            ref_block_prefix: 0xdead_beef,
            expiration: 1_700_000_600,
            operations: vec![Operation::Transfer {
                from: AccountName::new_unchecked("alice"),
                to: AccountName::new_unchecked("bob"),
                amount: Asset::core(100),
                memo: Some("thanks".to_string()),
            }],
            extensions: vec![TransactionExtension::TenantAffirmation { tenant_external_id: [7u8; 20] }],
        }
    }

    #[test]
    fn decode_of_encode_round_trips() {
        let tx = sample();
        let bytes = tx.canonical_bytes();
        let decoded: Transaction = bincode::deserialize(&bytes).expect("round-trip decode");
        assert_eq!(decoded, tx);
    }
}
