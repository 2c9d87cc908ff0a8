use thiserror::Error;

/// Errors produced while reading, building, or validating transactions.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Raw transaction data could not be parsed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A signing operation could not be completed.
    #[error("signing error: {0}")]
    Signing(String),

    /// An input or output index was out of range.
    #[error("index {0} out of range")]
    IndexOutOfRange(usize),

    /// A consensus-level structural check failed.
    #[error("sanity check failed: {reason}")]
    Sanity {
        /// Reject reason, bitcoind style (e.g. `bad-txns-vin-empty`).
        reason: &'static str,
        /// Ban score associated with the failure.
        score: u32,
    },

    /// A relay policy check failed.
    #[error("standardness check failed: {reason}")]
    Nonstandard {
        /// Reject reason, bitcoind style (e.g. `dust`).
        reason: &'static str,
        /// Ban score associated with the failure.
        score: u32,
    },

    /// A contextual input check failed.
    #[error("input check failed: {reason}")]
    Verification {
        /// Reject reason, bitcoind style.
        reason: &'static str,
        /// Ban score associated with the failure.
        score: u32,
    },

    /// Coin selection could not satisfy the requested outputs.
    #[error(transparent)]
    Funding(#[from] FundingError),

    /// A script failed to parse or verify.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// An EC key or signature operation failed.
    #[error(transparent)]
    Primitives(#[from] PrimitivesError),
}

pub use btx_primitives::PrimitivesError;
pub use btx_script::ScriptError;

/// Errors produced by the coin selector.
#[derive(Debug, Error)]
pub enum FundingError {
    /// The eligible coins do not cover the outputs plus fee.
    #[error("not enough funds (available={available}, required={required})")]
    InsufficientFunds {
        /// Total value of the coins that were eligible for selection.
        available: i64,
        /// Output value plus fee that selection needed to reach.
        required: i64,
    },

    /// The estimated fee exceeded the configured maximum.
    #[error("fee is too high (fee={fee}, max={max})")]
    FeeTooHigh {
        /// Fee the estimator arrived at.
        fee: i64,
        /// Configured ceiling.
        max: i64,
    },

    /// A preferred input named an outpoint absent from the coin set.
    #[error("unresolvable preferred input: {0}")]
    UnresolvedInput(String),

    /// A selection option was malformed.
    #[error("invalid selection option: {0}")]
    InvalidOption(String),
}
