#![deny(missing_docs)]

//! Bitcoin transaction SDK - complete toolkit.
//!
//! Re-exports every component crate for convenient single-crate usage.

pub use btx_primitives as primitives;
pub use btx_script as script;
pub use btx_transaction as transaction;
pub use btx_workers as workers;
