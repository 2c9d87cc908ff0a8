//! secp256k1 public key in compressed SEC1 form.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::ec::signature::Signature;
use crate::PrimitivesError;

/// A secp256k1 public key.
///
/// Wraps a k256 `VerifyingKey` and serializes as the 33-byte compressed
/// SEC1 encoding used in scripts and witnesses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Wrap a k256 verifying key.
    pub(crate) fn from_verifying_key(inner: VerifyingKey) -> Self {
        PublicKey { inner }
    }

    /// Parse a public key from SEC1 bytes (compressed or uncompressed).
    ///
    /// # Arguments
    /// * `bytes` - SEC1-encoded point (33 or 65 bytes).
    ///
    /// # Returns
    /// `Ok(PublicKey)` if the bytes encode a valid curve point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let inner = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
        Ok(PublicKey { inner })
    }

    /// Parse a public key from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes =
            hex::decode(hex_str).map_err(|e| PrimitivesError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Return the 33-byte compressed SEC1 encoding.
    pub fn to_compressed(&self) -> Vec<u8> {
        self.inner.to_encoded_point(true).as_bytes().to_vec()
    }

    /// Verify an ECDSA signature over a 32-byte message hash.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte message hash that was signed.
    /// * `signature` - The signature to check.
    ///
    /// # Returns
    /// `true` if the signature is valid for this key.
    pub fn verify(&self, hash: &[u8; 32], signature: &Signature) -> bool {
        self.inner.verify_prehash(hash, signature.inner()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_roundtrip() {
        let key = crate::ec::PrivateKey::generate().public_key();
        let bytes = key.to_compressed();
        assert_eq!(bytes.len(), 33);
        assert!(bytes[0] == 0x02 || bytes[0] == 0x03);
        assert_eq!(PublicKey::from_bytes(&bytes).unwrap(), key);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(PublicKey::from_bytes(&[0x05; 33]).is_err());
        assert!(PublicKey::from_bytes(&[]).is_err());
    }
}
