use sha2::{Digest, Sha256};

use deip_core::types::{Sha256Digest, TxId};

/// Compute SHA-256 of arbitrary bytes → 32-byte digest.
pub fn sha256(data: &[u8]) -> Sha256Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&out);
    Sha256Digest(bytes)
}

/// Transaction id from canonical body bytes (§6): `sha256(canonical_tx_bytes)`.
pub fn tx_id_from_body(body_bytes: &[u8]) -> TxId {
    sha256(body_bytes)
}

/// Signing digest: `sha256(chain_id ‖ canonical_tx_bytes)` (§6). The chain
/// id is bound into the digest so a signature cannot be replayed across
/// chains that share an account key.
pub fn signing_digest(chain_id: &Sha256Digest, body_bytes: &[u8]) -> Sha256Digest {
    let mut buf = Vec::with_capacity(32 + body_bytes.len());
    buf.extend_from_slice(&chain_id.0);
    buf.extend_from_slice(body_bytes);
    sha256(&buf)
}

/// Binary Merkle root over a block's transaction ids (§6). An odd level
/// duplicates its last node rather than promoting it unhashed, so a
/// single-transaction block's root is `sha256(id ‖ id)`, not `id` itself.
pub fn merkle_root(tx_ids: &[TxId]) -> Sha256Digest {
    if tx_ids.is_empty() {
        return Sha256Digest([0u8; 32]);
    }
    let mut level: Vec<Sha256Digest> = tx_ids.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let mut buf = [0u8; 64];
            buf[..32].copy_from_slice(&pair[0].0);
            buf[32..].copy_from_slice(&pair.get(1).unwrap_or(&pair[0]).0);
            next.push(sha256(&buf));
        }
        level = next;
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_transaction_root_is_not_the_id_itself() {
        let id = sha256(b"one transaction");
        let root = merkle_root(&[id]);
        assert_ne!(root, id);
    }

    #[test]
    fn odd_count_duplicates_the_last_leaf() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        let c = sha256(b"c");
        let root = merkle_root(&[a, b, c]);
        let root_with_dupe = merkle_root(&[a, b, c, c]);
        assert_eq!(root, root_with_dupe);
    }
}
