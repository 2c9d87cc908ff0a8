use btx_primitives::util::{TxReader, TxWriter, VarInt};
use btx_script::{Script, ScriptKind};
use serde::{Deserialize, Serialize};

use crate::error::TransactionError;

/// A transaction output: a value in satoshis and the locking script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// Value in satoshis.
    pub value: i64,
    /// Locking script.
    pub script: Script,
}

impl Output {
    /// Creates an output paying `value` to `script`.
    pub fn new(value: i64, script: Script) -> Self {
        Output { value, script }
    }

    /// Serialized size on the wire.
    pub fn serialized_size(&self) -> usize {
        8 + self.script.serialized_size()
    }

    /// Dust threshold for this output at the given relay rate (satoshis per
    /// 1000 vbytes). Outputs below the threshold cost more to spend than the
    /// network fee to relay them.
    ///
    /// Unspendable outputs (OP_RETURN data carriers) are never dust.
    pub fn dust_threshold(&self, rate: i64) -> i64 {
        if self.script.is_unspendable() {
            return 0;
        }
        // Cost of spending: outpoint + sequence + a typical unlocking
        // script. Witness spends discount the unlocking data by the
        // witness scale factor.
        let spend_size: usize = if self.script.witness_program().is_some() {
            32 + 4 + 1 + 107 / 4 + 4
        } else {
            32 + 4 + 1 + 107 + 4
        };
        let size = (self.serialized_size() + spend_size) as i64;
        size * rate / 1000
    }

    /// Whether the output is dust at the given relay rate.
    pub fn is_dust(&self, rate: i64) -> bool {
        self.value < self.dust_threshold(rate)
    }

    /// Template kind of the locking script.
    pub fn kind(&self) -> ScriptKind {
        self.script.kind()
    }

    /// Reads an output from a cursor.
    pub fn read_from(reader: &mut TxReader<'_>) -> Result<Self, TransactionError> {
        let value = reader
            .read_i64_le()
            .map_err(|e| TransactionError::Serialization(e.to_string()))?;
        let script_bytes = reader
            .read_var_bytes()
            .map_err(|e| TransactionError::Serialization(e.to_string()))?;
        Ok(Output {
            value,
            script: Script::from_bytes(script_bytes),
        })
    }

    /// Writes the output to a cursor.
    pub fn write_to(&self, writer: &mut TxWriter) {
        writer.write_i64_le(self.value);
        writer.write_varint(VarInt::from(self.script.len()));
        writer.write_bytes(self.script.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dust_thresholds_match_reference_values() {
        // 3000 sat/kvB is the customary dust relay rate.
        let p2pkh = Output::new(0, Script::p2pkh(&[0u8; 20]));
        assert_eq!(p2pkh.dust_threshold(3000), 546);

        let p2wpkh = Output::new(0, Script::p2wpkh(&[0u8; 20]));
        assert_eq!(p2wpkh.dust_threshold(3000), 294);

        let nulldata = Output::new(0, Script::nulldata(b"hi").unwrap());
        assert_eq!(nulldata.dust_threshold(3000), 0);
        assert!(!nulldata.is_dust(3000));
    }

    #[test]
    fn roundtrip() {
        let output = Output::new(50_000, Script::p2pkh(&[3u8; 20]));
        let mut writer = TxWriter::new();
        output.write_to(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), output.serialized_size());

        let mut reader = TxReader::new(&bytes);
        assert_eq!(Output::read_from(&mut reader).unwrap(), output);
    }
}
