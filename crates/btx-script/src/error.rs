/// Error types for script operations.
///
/// Covers structural parsing failures plus the machine-checkable
/// verification failure shape produced by a script engine.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Generic invalid script error.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// An unrecognized or invalid opcode was encountered.
    #[error("invalid opcode: {0}")]
    InvalidOpcode(u8),

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Not enough data in the script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds the maximum allowed size.
    #[error("data too big")]
    DataTooBig,

    /// Script verification failed.
    ///
    /// Raised by a script engine when the input fails to satisfy the
    /// previous output script. Carries a machine-checkable code plus the
    /// failing opcode index and instruction pointer.
    #[error("script verify failed: {code} (op={op}, ip={ip})")]
    Verify {
        /// Stable failure code (e.g. "EQUALVERIFY", "BAD_SIGNATURE").
        code: &'static str,
        /// Index of the failing opcode, when known.
        op: usize,
        /// Instruction pointer at the time of failure.
        ip: usize,
    },

    /// Error from the primitives crate.
    #[error("primitives error: {0}")]
    Primitives(#[from] btx_primitives::PrimitivesError),
}

impl ScriptError {
    /// Construct a verification failure with the given code at position 0.
    pub fn verify(code: &'static str) -> Self {
        ScriptError::Verify { code, op: 0, ip: 0 }
    }

    /// Whether this error is a verification failure (as opposed to a
    /// structural error that should propagate unchanged).
    pub fn is_verify(&self) -> bool {
        matches!(self, ScriptError::Verify { .. })
    }
}
