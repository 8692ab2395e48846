use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use deip_core::types::{PublicKey, Signature};

use crate::ecdsa;

/// A chain account keypair: a secp256k1 signing key and its derived
/// compressed public key. The secret key is held in a `Zeroizing` buffer
/// to wipe memory on drop.
pub struct KeyPair {
    pub public_key: PublicKey,
    secret_key: Zeroizing<[u8; 32]>,
}

impl KeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    pub fn from_secret_key_bytes(sk_bytes: [u8; 32]) -> Option<Self> {
        let signing_key = SigningKey::from_bytes((&sk_bytes).into()).ok()?;
        Some(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let encoded = verifying_key.to_encoded_point(true);
        let mut pk_bytes = [0u8; 33];
        pk_bytes.copy_from_slice(encoded.as_bytes());
        Self {
            public_key: PublicKey(pk_bytes),
            secret_key: Zeroizing::new(signing_key.to_bytes().into()),
        }
    }

    /// Sign a 32-byte prehashed digest, producing a recoverable signature.
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Signature {
        ecdsa::sign_prehash(&self.secret_key, digest)
            .expect("signing with a valid secret key is infallible")
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ public_key: {:?} }}", self.public_key)
    }
}
