//! Per-input witness stack (BIP141).

use btx_primitives::util::{TxReader, TxWriter, VarInt};
use btx_primitives::PrimitivesError;

/// The witness stack attached to a transaction input.
///
/// A sequence of raw byte vectors pushed for script execution on the
/// witness side. Serialized as a varint item count followed by
/// varint-prefixed items; it is carried out-of-band relative to the
/// scriptSig and only present in the witness transaction encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Witness {
    items: Vec<Vec<u8>>,
}

impl Witness {
    /// Create a new empty witness stack.
    pub fn new() -> Self {
        Witness { items: Vec::new() }
    }

    /// Create a witness from its stack items.
    pub fn from_items(items: Vec<Vec<u8>>) -> Self {
        Witness { items }
    }

    /// Push an item onto the stack.
    pub fn push(&mut self, item: Vec<u8>) {
        self.items.push(item);
    }

    /// Replace the item at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn set(&mut self, index: usize, item: Vec<u8>) {
        self.items[index] = item;
    }

    /// Return the item at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.items.get(index).map(|v| v.as_slice())
    }

    /// Return the number of stack items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the stack has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Return the stack items as a slice.
    pub fn items(&self) -> &[Vec<u8>] {
        &self.items
    }

    /// Return a mutable reference to the stack items.
    pub fn items_mut(&mut self) -> &mut Vec<Vec<u8>> {
        &mut self.items
    }

    /// Return the final stack item, if any.
    ///
    /// For P2WSH spends this is the witness script.
    pub fn last(&self) -> Option<&[u8]> {
        self.items.last().map(|v| v.as_slice())
    }

    /// Deserialize a witness stack from a reader.
    pub fn read_from(reader: &mut TxReader) -> Result<Self, PrimitivesError> {
        let count = reader.read_varint()?.value() as usize;
        let mut items = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            items.push(reader.read_var_bytes()?.to_vec());
        }
        Ok(Witness { items })
    }

    /// Serialize this witness stack into a writer.
    pub fn write_to(&self, writer: &mut TxWriter) {
        writer.write_varint(VarInt::from(self.items.len()));
        for item in &self.items {
            writer.write_var_bytes(item);
        }
    }

    /// Return the serialized size in bytes.
    pub fn serialized_size(&self) -> usize {
        let mut size = VarInt::size_of(self.items.len());
        for item in &self.items {
            size += VarInt::size_of(item.len()) + item.len();
        }
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let witness = Witness::from_items(vec![vec![], vec![0xab; 72], vec![0x02; 33]]);

        let mut writer = TxWriter::new();
        witness.write_to(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), witness.serialized_size());

        let mut reader = TxReader::new(&bytes);
        assert_eq!(Witness::read_from(&mut reader).unwrap(), witness);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_truncated() {
        let mut reader = TxReader::new(&[0x02, 0x05, 0x01]);
        assert!(Witness::read_from(&mut reader).is_err());
    }
}
