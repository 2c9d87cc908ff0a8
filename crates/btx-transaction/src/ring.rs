use btx_primitives::ec::{PrivateKey, Signature};
use btx_primitives::hash::hash160;
use btx_primitives::util::{TxReader, TxWriter};
use btx_script::{Script, ScriptKind};

use crate::error::TransactionError;

/// A signing key plus the script context needed to spend with it: whether
/// the key is used for witness outputs, and an optional redeem script for
/// script-hash outputs.
#[derive(Clone, Debug)]
pub struct KeyRing {
    private: PrivateKey,
    public: Vec<u8>,
    /// Redeem script backing P2SH or P2WSH outputs owned by this ring.
    pub redeem: Option<Script>,
    /// Whether this ring spends witness outputs.
    pub witness: bool,
}

impl KeyRing {
    /// Creates a ring from a private key.
    pub fn from_private(private: PrivateKey, witness: bool) -> Self {
        let public = private.public_key().to_compressed();
        KeyRing {
            private,
            public,
            redeem: None,
            witness,
        }
    }

    /// Creates a ring with a freshly generated key.
    pub fn generate(witness: bool) -> Self {
        Self::from_private(PrivateKey::generate(), witness)
    }

    /// Attaches a redeem script.
    pub fn set_redeem(&mut self, redeem: Script) {
        self.redeem = Some(redeem);
    }

    /// Compressed public key bytes.
    pub fn public_key(&self) -> &[u8] {
        &self.public
    }

    /// HASH160 of the compressed public key.
    pub fn key_hash(&self) -> [u8; 20] {
        hash160(&self.public)
    }

    /// The P2WPKH program for this key.
    pub fn program(&self) -> Script {
        Script::p2wpkh(&self.key_hash())
    }

    /// Signs a 32-byte digest.
    pub fn sign(&self, hash: &[u8; 32]) -> Result<Signature, TransactionError> {
        self.private
            .sign(hash)
            .map_err(TransactionError::Primitives)
    }

    /// Whether this ring can satisfy the given locking script.
    pub fn owns_output(&self, script: &Script) -> bool {
        match script.kind() {
            ScriptKind::Pubkey => script.last_push().as_deref() == Some(&self.public[..]),
            ScriptKind::PubkeyHash => script.hash160_payload() == Some(self.key_hash()),
            ScriptKind::WitnessPubkeyHash => {
                self.witness
                    && script
                        .witness_program()
                        .map(|(_, program)| program == self.key_hash().as_slice())
                        .unwrap_or(false)
            }
            ScriptKind::Scripthash => script
                .hash160_payload()
                .map(|payload| self.get_redeem(&payload).is_some())
                .unwrap_or(false),
            ScriptKind::WitnessScripthash => match (&self.redeem, script.witness_program()) {
                (Some(redeem), Some((0, program))) => {
                    self.witness && redeem.sha256().as_slice() == program
                }
                _ => false,
            },
            ScriptKind::Multisig { .. } => script
                .multisig_keys()
                .map(|keys| keys.iter().any(|key| key[..] == self.public[..]))
                .unwrap_or(false),
            ScriptKind::Nulldata | ScriptKind::Unknown => false,
        }
    }

    /// Resolves the script directly underneath a P2SH output with the given
    /// HASH160 payload: the attached redeem script, this key's P2WPKH
    /// program, or the P2WSH wrapper of the attached redeem script.
    pub fn get_redeem(&self, payload: &[u8; 20]) -> Option<Script> {
        if let Some(redeem) = &self.redeem {
            if redeem.hash160() == *payload {
                return Some(redeem.clone());
            }
            if self.witness {
                let wrapper = Script::p2wsh(&redeem.sha256());
                if wrapper.hash160() == *payload {
                    return Some(wrapper);
                }
            }
        }
        if self.witness {
            let program = self.program();
            if program.hash160() == *payload {
                return Some(program);
            }
        }
        None
    }

    /// Writes the ring for the worker wire format: 32 key bytes, a witness
    /// flag, and a length-prefixed redeem script (zero length for none).
    pub fn write_to(&self, writer: &mut TxWriter) {
        writer.write_bytes(&self.private.to_bytes());
        writer.write_u8(self.witness as u8);
        match &self.redeem {
            Some(redeem) => writer.write_var_bytes(redeem.as_bytes()),
            None => writer.write_var_bytes(&[]),
        }
    }

    /// Reads a ring written by [`KeyRing::write_to`].
    pub fn read_from(reader: &mut TxReader<'_>) -> Result<Self, TransactionError> {
        let err = |e: btx_primitives::PrimitivesError| TransactionError::Serialization(e.to_string());
        let key_bytes = reader.read_bytes(32).map_err(err)?;
        let private = PrivateKey::from_bytes(key_bytes).map_err(TransactionError::Primitives)?;
        let witness = reader.read_u8().map_err(err)? != 0;
        let redeem_bytes = reader.read_var_bytes().map_err(err)?;
        let mut ring = Self::from_private(private, witness);
        if !redeem_bytes.is_empty() {
            ring.redeem = Some(Script::from_bytes(redeem_bytes));
        }
        Ok(ring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_by_template() {
        let ring = KeyRing::generate(true);

        assert!(ring.owns_output(&Script::p2pkh(&ring.key_hash())));
        assert!(ring.owns_output(&Script::p2wpkh(&ring.key_hash())));
        assert!(ring.owns_output(&Script::p2pk(ring.public_key()).unwrap()));
        assert!(!ring.owns_output(&Script::p2pkh(&[0u8; 20])));

        // Nested P2WPKH inside P2SH.
        let nested = Script::p2sh(&ring.program().hash160());
        assert!(ring.owns_output(&nested));
    }

    #[test]
    fn redeem_resolution() {
        let mut ring = KeyRing::generate(true);
        let other = KeyRing::generate(true);
        let redeem =
            Script::multisig(1, &[ring.public_key().to_vec(), other.public_key().to_vec()])
                .unwrap();
        ring.set_redeem(redeem.clone());

        // Plain P2SH over the redeem script.
        assert_eq!(ring.get_redeem(&redeem.hash160()), Some(redeem.clone()));
        assert!(ring.owns_output(&Script::p2sh(&redeem.hash160())));

        // P2WSH over the redeem script.
        assert!(ring.owns_output(&Script::p2wsh(&redeem.sha256())));

        // P2SH over the P2WSH wrapper.
        let wrapper = Script::p2wsh(&redeem.sha256());
        assert_eq!(ring.get_redeem(&wrapper.hash160()), Some(wrapper.clone()));
        assert!(ring.owns_output(&Script::p2sh(&wrapper.hash160())));
    }

    #[test]
    fn wire_roundtrip() {
        let mut ring = KeyRing::generate(false);
        ring.set_redeem(Script::p2pkh(&[5u8; 20]));

        let mut writer = TxWriter::new();
        ring.write_to(&mut writer);

        let mut reader = TxReader::new(writer.as_bytes());
        let back = KeyRing::read_from(&mut reader).unwrap();
        assert_eq!(back.public_key(), ring.public_key());
        assert_eq!(back.redeem, ring.redeem);
        assert!(!back.witness);
    }
}
