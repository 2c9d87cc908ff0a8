//! Low-level primitives for the btx SDK.
//!
//! Provides the hash functions, secp256k1 key types, consensus constants,
//! and binary reader/writer helpers shared by the transaction and worker
//! crates.

pub mod consensus;
pub mod ec;
pub mod hash;
pub mod util;

mod error;
pub use error::PrimitivesError;
