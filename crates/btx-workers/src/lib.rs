//! Worker pool for CPU-heavy transaction jobs.
//!
//! Script verification, signing, raw ECDSA, proof-of-work search, and
//! scrypt derivation run on dedicated worker threads, keeping the async
//! runtime responsive. The parent and workers speak a framed binary
//! protocol with per-job correlation ids, so a pool can keep many jobs
//! in flight per worker; a pool with no workers executes jobs in-process
//! behind the same interface.

#![deny(missing_docs)]

mod error;
pub mod framer;
pub mod jobs;
pub mod packets;
mod parser;
mod pool;
mod worker;

pub use error::WorkerError;
pub use packets::{JobError, Packet};
pub use parser::{Frame, Parser};
pub use pool::{WorkerPool, DEFAULT_TIMEOUT};
pub use worker::Worker;
