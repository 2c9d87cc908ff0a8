//! secp256k1 key and signature types.
//!
//! Thin wrappers over the k256 crate providing the exact key and signature
//! shapes Bitcoin consensus expects: 32-byte private scalars, 33-byte
//! compressed SEC1 public keys, and low-S DER signatures produced with
//! RFC6979 deterministic nonces.

mod private_key;
mod public_key;
mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
