//! Error types for the worker pool and its framed IPC protocol.

use thiserror::Error;

use crate::packets::JobError;

/// Errors produced by the worker pool, the wire framer/parser, and the
/// job dispatch table.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// A frame on the wire was malformed (bad sentinel, oversized
    /// payload, unknown command byte).
    #[error("bad frame: {0}")]
    Frame(String),

    /// A packet payload could not be decoded.
    #[error("bad packet (cmd={cmd}): {reason}")]
    Packet {
        /// Command byte of the offending packet.
        cmd: u8,
        /// What went wrong while decoding the payload.
        reason: String,
    },

    /// The job did not complete within its deadline. The pending entry
    /// is removed, so a late reply is dropped rather than delivered.
    #[error("job timed out")]
    Timeout,

    /// The worker was destroyed (or crashed) while the job was
    /// outstanding.
    #[error("worker destroyed")]
    Destroyed,

    /// The remote side rejected the job and sent back an error result.
    #[error("job failed: {0}")]
    Job(JobError),

    /// Transaction-level failure while executing a job in-process.
    #[error("transaction error: {0}")]
    Transaction(#[from] btx_transaction::TransactionError),

    /// Script-level failure while executing a job in-process.
    #[error("script error: {0}")]
    Script(#[from] btx_script::ScriptError),

    /// Primitive decode failure inside a packet payload.
    #[error("primitives error: {0}")]
    Primitives(#[from] btx_primitives::PrimitivesError),

    /// Invalid job parameters (e.g. a scrypt N that is not a power of
    /// two).
    #[error("invalid job parameter: {0}")]
    InvalidParameter(String),
}
