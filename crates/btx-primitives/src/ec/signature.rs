//! ECDSA signature with DER serialization.

use crate::PrimitivesError;

/// An ECDSA signature over secp256k1.
///
/// Wraps a k256 signature and provides the DER encoding used inside
/// scriptSigs and witness stacks (without the trailing sighash-type byte,
/// which belongs to the transaction layer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: k256::ecdsa::Signature,
}

impl Signature {
    pub(crate) fn from_inner(inner: k256::ecdsa::Signature) -> Self {
        Signature { inner }
    }

    pub(crate) fn inner(&self) -> &k256::ecdsa::Signature {
        &self.inner
    }

    /// Parse a DER-encoded ECDSA signature.
    ///
    /// # Arguments
    /// * `bytes` - DER-encoded signature bytes.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error if the encoding is malformed.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let inner = k256::ecdsa::Signature::from_der(bytes)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature { inner })
    }

    /// Encode the signature as DER bytes.
    ///
    /// # Returns
    /// The DER encoding (70-72 bytes for low-S signatures).
    pub fn to_der(&self) -> Vec<u8> {
        self.inner.to_der().as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_der_roundtrip() {
        let key = crate::ec::PrivateKey::generate();
        let hash = crate::hash::sha256d(b"der roundtrip");
        let sig = key.sign(&hash).unwrap();
        let der = sig.to_der();
        assert_eq!(Signature::from_der(&der).unwrap(), sig);
    }

    #[test]
    fn test_rejects_malformed_der() {
        assert!(Signature::from_der(&[]).is_err());
        assert!(Signature::from_der(&[0x30, 0x02, 0x01, 0x01]).is_err());
    }
}
