use btx_primitives::consensus::{SEQUENCE_FINAL, SEQUENCE_RBF_THRESHOLD};
use btx_primitives::util::{TxReader, TxWriter, VarInt};
use btx_script::{Script, Witness};
use serde::{Deserialize, Serialize};

use crate::error::TransactionError;
use crate::outpoint::Outpoint;

/// A transaction input: the outpoint being spent, the script satisfying it,
/// the sequence number, and the segregated witness stack.
///
/// The witness travels with the input so that sorting inputs keeps each
/// witness attached to the outpoint it spends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    /// Output being spent.
    pub prevout: Outpoint,
    /// Legacy scriptSig.
    pub script: Script,
    /// Sequence number.
    pub sequence: u32,
    /// Witness stack. Empty for non-witness spends.
    #[serde(default)]
    pub witness: Witness,
}

impl Input {
    /// Creates an unsigned input spending `prevout` with a final sequence.
    pub fn from_outpoint(prevout: Outpoint) -> Self {
        Input {
            prevout,
            script: Script::default(),
            sequence: SEQUENCE_FINAL,
            witness: Witness::new(),
        }
    }

    /// Whether the sequence number marks this input final.
    pub fn is_final(&self) -> bool {
        self.sequence == SEQUENCE_FINAL
    }

    /// Whether the input signals BIP125 replaceability.
    pub fn is_rbf(&self) -> bool {
        self.sequence < SEQUENCE_RBF_THRESHOLD
    }

    /// Whether this is a coinbase input.
    pub fn is_coinbase(&self) -> bool {
        self.prevout.is_null()
    }

    /// Serialized size of the non-witness portion.
    pub fn base_size(&self) -> usize {
        Outpoint::SIZE + self.script.serialized_size() + 4
    }

    /// Reads the non-witness portion from a cursor. The witness stack, if
    /// any, is attached separately by the transaction decoder.
    pub fn read_from(reader: &mut TxReader<'_>) -> Result<Self, TransactionError> {
        let prevout = Outpoint::read_from(reader)?;
        let script_bytes = reader
            .read_var_bytes()
            .map_err(|e| TransactionError::Serialization(e.to_string()))?;
        let sequence = reader
            .read_u32_le()
            .map_err(|e| TransactionError::Serialization(e.to_string()))?;
        Ok(Input {
            prevout,
            script: Script::from_bytes(script_bytes),
            sequence,
            witness: Witness::new(),
        })
    }

    /// Writes the non-witness portion to a cursor.
    pub fn write_to(&self, writer: &mut TxWriter) {
        self.prevout.write_to(writer);
        writer.write_varint(VarInt::from(self.script.len()));
        writer.write_bytes(self.script.as_bytes());
        writer.write_u32_le(self.sequence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rbf_signalling() {
        let mut input = Input::from_outpoint(Outpoint::new([1u8; 32], 0));
        assert!(input.is_final());
        assert!(!input.is_rbf());

        input.sequence = 0xfffffffd;
        assert!(!input.is_final());
        assert!(input.is_rbf());

        input.sequence = 0xfffffffe;
        assert!(!input.is_rbf());
    }

    #[test]
    fn roundtrip() {
        let mut input = Input::from_outpoint(Outpoint::new([2u8; 32], 1));
        input.script = Script::from_bytes(&[0x51]);
        input.sequence = 0xfffffffd;

        let mut writer = TxWriter::new();
        input.write_to(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), input.base_size());

        let mut reader = TxReader::new(&bytes);
        assert_eq!(Input::read_from(&mut reader).unwrap(), input);
    }
}
