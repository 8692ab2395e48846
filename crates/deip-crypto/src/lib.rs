pub mod ecdsa;
pub mod hash;
pub mod keypair;

pub use ecdsa::{is_canonical, recover_public_key, sign_prehash, verify_prehash, SignatureError};
pub use hash::{merkle_root, sha256, signing_digest, tx_id_from_body};
pub use keypair::KeyPair;
