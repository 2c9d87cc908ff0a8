/// Error types for primitive operations.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    /// A read ran past the end of the input buffer.
    #[error("unexpected end of data")]
    UnexpectedEof,

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The bytes do not encode a valid secp256k1 private key scalar.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The bytes do not encode a valid SEC1 public key point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The bytes do not encode a valid DER ECDSA signature.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}
