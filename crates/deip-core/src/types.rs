//! Primitive identifiers and scalar types shared across the chain core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp (seconds, UTC). Block time, expirations, and every
/// "…_at" field in the data model are expressed in this unit.
pub type Timestamp = i64;

/// 64-bit monotonic id of a record within its table. Never reused: undoing
/// a creation rolls the allocator back, it does not free the id for reuse
/// by a later, unrelated object (chainbase §4.1).
pub type ObjectId = u64;

/// An account name: 3–16 chars, lowercase alphanumerics plus `-` and `.`,
/// must not start/end with `-`, no consecutive dots (data model §3).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountName(String);

impl AccountName {
    /// Validate and construct. Rejects anything that does not meet the
    /// account-name shape invariant.
    pub fn new(s: impl Into<String>) -> Result<Self, crate::error::DeipError> {
        let s = s.into();
        if !(3..=16).contains(&s.len()) {
            return Err(crate::error::ValidationError::InvalidAccountName(s).into());
        }
        let bytes = s.as_bytes();
        let valid_chars = s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
        let starts_or_ends_hyphen = bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-';
        let consecutive_dots = s.as_bytes().windows(2).any(|w| w == b"..");
        if !valid_chars || starts_or_ends_hyphen || consecutive_dots {
            return Err(crate::error::ValidationError::InvalidAccountName(s).into());
        }
        Ok(Self(s))
    }

    /// Construct without validation. Only for names already known-valid
    /// (deserialized from a signed transaction that evaluators will
    /// re-validate, or genesis records).
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 160-bit (20-byte) external identifier, used for research, research
/// content, reviews, token sales, and proposals so that off-chain systems
/// can mint ids before the first on-chain reference (data model §3).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalId(pub [u8; 20]);

impl ExternalId {
    pub fn from_hex(s: &str) -> Result<Self, crate::error::DeipError> {
        let bytes = hex::decode(s)
            .map_err(|_| crate::error::ValidationError::MalformedExternalId(s.to_string()))?;
        if bytes.len() != 20 {
            return Err(crate::error::ValidationError::MalformedExternalId(s.to_string()).into());
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExternalId({}…)", &self.to_hex()[..8])
    }
}

/// A 32-byte sha256 digest: the basis for block ids, transaction signing
/// digests, and Merkle roots (§6). Transaction ids are additionally
/// truncated to 20 bytes on the wire — see [`ShortTxId`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sha256Digest(pub [u8; 32]);

impl Sha256Digest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Low 32 bits (little-endian), used as the TaPOS `ref_block_prefix`
    /// and as the high bits of a block number/id pairing.
    pub fn low_u32(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", &self.to_hex()[..12])
    }
}

pub type BlockId = Sha256Digest;
pub type TxId = Sha256Digest;

/// A 20-byte truncated transaction id, as carried on the wire (§6).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShortTxId(pub [u8; 20]);

impl From<TxId> for ShortTxId {
    fn from(full: TxId) -> Self {
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&full.0[..20]);
        Self(arr)
    }
}

/// 33-byte compressed secp256k1 public key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 33]);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

/// 65-byte recoverable ECDSA signature (64-byte r||s plus 1-byte recovery id).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub [u8; 65]);

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", &hex::encode(self.0)[..16])
    }
}

/// A discipline tag used to partition expertise and ECI accounting.
pub type DisciplineId = u32;
