use std::fmt;

use btx_primitives::util::{TxReader, TxWriter};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TransactionError;

/// Reference to a previous transaction output: a txid plus an output index.
///
/// The hash is stored in internal (little-endian) byte order, the same order
/// it appears on the wire. Display and JSON use the reversed hex convention.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Outpoint {
    /// Transaction hash in internal byte order.
    pub hash: [u8; 32],
    /// Output index within that transaction.
    pub index: u32,
}

impl Outpoint {
    /// Serialized size on the wire.
    pub const SIZE: usize = 36;

    /// Creates an outpoint from a hash and index.
    pub fn new(hash: [u8; 32], index: u32) -> Self {
        Outpoint { hash, index }
    }

    /// The null outpoint used by coinbase inputs.
    pub fn null() -> Self {
        Outpoint {
            hash: [0u8; 32],
            index: u32::MAX,
        }
    }

    /// Whether this is the coinbase null outpoint.
    pub fn is_null(&self) -> bool {
        self.index == u32::MAX && self.hash == [0u8; 32]
    }

    /// Transaction id as reversed hex.
    pub fn txid(&self) -> String {
        let mut bytes = self.hash;
        bytes.reverse();
        hex::encode(bytes)
    }

    /// Reads an outpoint from a cursor.
    pub fn read_from(reader: &mut TxReader<'_>) -> Result<Self, TransactionError> {
        let hash = reader
            .read_hash()
            .map_err(|e| TransactionError::Serialization(e.to_string()))?;
        let index = reader
            .read_u32_le()
            .map_err(|e| TransactionError::Serialization(e.to_string()))?;
        Ok(Outpoint { hash, index })
    }

    /// Writes the outpoint to a cursor.
    pub fn write_to(&self, writer: &mut TxWriter) {
        writer.write_bytes(&self.hash);
        writer.write_u32_le(self.index);
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid(), self.index)
    }
}

impl fmt::Debug for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Outpoint({self})")
    }
}

impl Serialize for Outpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Json<'a> {
            hash: &'a str,
            index: u32,
        }
        Json {
            hash: &self.txid(),
            index: self.index,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Outpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Json {
            hash: String,
            index: u32,
        }
        let json = Json::deserialize(deserializer)?;
        let bytes = hex::decode(&json.hash).map_err(D::Error::custom)?;
        let mut hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| D::Error::custom("outpoint hash must be 32 bytes"))?;
        hash.reverse();
        Ok(Outpoint {
            hash,
            index: json.index,
        })
    }
}
