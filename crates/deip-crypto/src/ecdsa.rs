use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use thiserror::Error;

use deip_core::types::{PublicKey, Signature};

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid signature encoding")]
    InvalidEncoding,
    #[error("non-canonical signature (high-S); reject before recovery")]
    NonCanonical,
    #[error("signature does not recover to a valid public key")]
    RecoveryFailed,
    #[error("invalid public key encoding")]
    InvalidPublicKey,
    #[error("signature does not verify against the given public key")]
    VerificationFailed,
}

/// Sign a 32-byte digest, returning a 65-byte recoverable signature
/// (64-byte r‖s plus a 1-byte recovery id), per §4.2/§6.
pub fn sign_prehash(
    secret_key_bytes: &[u8; 32],
    digest: &[u8; 32],
) -> Result<Signature, SignatureError> {
    let signing_key =
        SigningKey::from_bytes(secret_key_bytes.into()).map_err(|_| SignatureError::InvalidEncoding)?;
    let (sig, recid) = signing_key
        .sign_prehash_recoverable(digest)
        .map_err(|_| SignatureError::InvalidEncoding)?;
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&sig.to_bytes());
    out[64] = recid.to_byte();
    Ok(Signature(out))
}

/// Canonical (low-S) check. Non-canonical signatures must be rejected
/// before recovery is attempted (§4.2).
pub fn is_canonical(signature: &Signature) -> bool {
    K256Signature::from_slice(&signature.0[..64])
        .map(|sig| sig.s().is_high().unwrap_u8() == 0)
        .unwrap_or(false)
}

/// Recover the signer's compressed public key from a recoverable
/// signature over `digest` (§4.2 step 1).
pub fn recover_public_key(
    signature: &Signature,
    digest: &[u8; 32],
) -> Result<PublicKey, SignatureError> {
    if !is_canonical(signature) {
        return Err(SignatureError::NonCanonical);
    }
    let sig = K256Signature::from_slice(&signature.0[..64]).map_err(|_| SignatureError::InvalidEncoding)?;
    let recid = RecoveryId::from_byte(signature.0[64]).ok_or(SignatureError::InvalidEncoding)?;
    let verifying_key = VerifyingKey::recover_from_prehash(digest, &sig, recid)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    let encoded = verifying_key.to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(encoded.as_bytes());
    Ok(PublicKey(out))
}

/// Verify that `signature` over `digest` recovers to exactly `expected_key`.
pub fn verify_prehash(
    expected_key: &PublicKey,
    digest: &[u8; 32],
    signature: &Signature,
) -> Result<(), SignatureError> {
    let recovered = recover_public_key(signature, digest)?;
    if &recovered != expected_key {
        return Err(SignatureError::VerificationFailed);
    }
    let verifying_key =
        VerifyingKey::from_sec1_bytes(&expected_key.0).map_err(|_| SignatureError::InvalidPublicKey)?;
    let sig =
        K256Signature::from_slice(&signature.0[..64]).map_err(|_| SignatureError::InvalidEncoding)?;
    verifying_key
        .verify_prehash(digest, &sig)
        .map_err(|_| SignatureError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_secret_key() -> [u8; 32] {
        let mut sk = [7u8; 32];
        sk[31] = 42;
        sk
    }

    #[test]
    fn sign_recover_round_trip() {
        let sk_bytes = fixed_secret_key();
        let signing_key = SigningKey::from_bytes((&sk_bytes).into()).unwrap();
        let verifying_key = VerifyingKey::from(&signing_key);
        let pk_encoded = verifying_key.to_encoded_point(true);
        let mut pk_bytes = [0u8; 33];
        pk_bytes.copy_from_slice(pk_encoded.as_bytes());
        let expected = PublicKey(pk_bytes);

        let digest = [9u8; 32];
        let sig = sign_prehash(&sk_bytes, &digest).unwrap();
        let recovered = recover_public_key(&sig, &digest).unwrap();
        assert_eq!(recovered, expected);
        assert!(verify_prehash(&expected, &digest, &sig).is_ok());
    }

    #[test]
    fn tampered_digest_fails_to_verify() {
        let sk_bytes = fixed_secret_key();
        let signing_key = SigningKey::from_bytes((&sk_bytes).into()).unwrap();
        let verifying_key = VerifyingKey::from(&signing_key);
        let pk_encoded = verifying_key.to_encoded_point(true);
        let mut pk_bytes = [0u8; 33];
        pk_bytes.copy_from_slice(pk_encoded.as_bytes());
        let expected = PublicKey(pk_bytes);

        let digest = [9u8; 32];
        let sig = sign_prehash(&sk_bytes, &digest).unwrap();
        let other_digest = [10u8; 32];
        assert!(verify_prehash(&expected, &other_digest, &sig).is_err());
    }
}
