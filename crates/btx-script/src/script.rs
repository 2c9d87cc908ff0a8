//! Bitcoin Script type - a sequence of opcodes and data pushes.
//!
//! Scripts are used in transaction inputs (scriptSig) and outputs
//! (scriptPubKey) to define spending conditions. The `Script` wraps a
//! `Vec<u8>` and provides construction, chunk-level parsing,
//! classification, sigop counting, and the standard lock-script templates.

use std::fmt;

use btx_primitives::hash::{hash160, sha256};

use crate::kind::ScriptKind;
use crate::opcodes::*;
use crate::ScriptError;

/// Maximum script length in bytes.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Maximum size of a single pushed element.
pub const MAX_PUSH_SIZE: usize = 520;

/// Maximum total size of a nulldata (OP_RETURN) output script under policy.
pub const MAX_NULLDATA_SIZE: usize = 83;

/// Default sigop count charged for an inaccurate OP_CHECKMULTISIG.
const MAX_MULTISIG_PUBKEYS: usize = 20;

/// A single parsed script element: an opcode plus its push data, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte.
    pub op: u8,
    /// The pushed data for push opcodes, `None` for bare opcodes.
    pub data: Option<Vec<u8>>,
}

/// A Bitcoin script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str).map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script taking ownership of the byte vector.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }

    // -----------------------------------------------------------------------
    // Lock-script templates
    // -----------------------------------------------------------------------

    /// Build a pay-to-pubkey locking script: `<pubkey> OP_CHECKSIG`.
    pub fn p2pk(pubkey: &[u8]) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        script.append_push_data(pubkey)?;
        script.0.push(OP_CHECKSIG);
        Ok(script)
    }

    /// Build a pay-to-pubkey-hash locking script:
    /// `OP_DUP OP_HASH160 <20-byte hash> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn p2pkh(key_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(25);
        bytes.push(OP_DUP);
        bytes.push(OP_HASH160);
        bytes.push(OP_DATA_20);
        bytes.extend_from_slice(key_hash);
        bytes.push(OP_EQUALVERIFY);
        bytes.push(OP_CHECKSIG);
        Script(bytes)
    }

    /// Build a pay-to-script-hash locking script:
    /// `OP_HASH160 <20-byte hash> OP_EQUAL`.
    pub fn p2sh(script_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(23);
        bytes.push(OP_HASH160);
        bytes.push(OP_DATA_20);
        bytes.extend_from_slice(script_hash);
        bytes.push(OP_EQUAL);
        Script(bytes)
    }

    /// Build a version-0 pay-to-witness-pubkey-hash program:
    /// `OP_0 <20-byte hash>`.
    pub fn p2wpkh(key_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(22);
        bytes.push(OP_0);
        bytes.push(OP_DATA_20);
        bytes.extend_from_slice(key_hash);
        Script(bytes)
    }

    /// Build a version-0 pay-to-witness-script-hash program:
    /// `OP_0 <32-byte hash>`.
    pub fn p2wsh(script_hash: &[u8; 32]) -> Self {
        let mut bytes = Vec::with_capacity(34);
        bytes.push(OP_0);
        bytes.push(OP_DATA_32);
        bytes.extend_from_slice(script_hash);
        Script(bytes)
    }

    /// Build a bare multisig locking script:
    /// `OP_m <pubkey>... OP_n OP_CHECKMULTISIG`.
    ///
    /// # Arguments
    /// * `m` - Required signature count (1..=n).
    /// * `pubkeys` - The public keys, in the order they will appear.
    ///
    /// # Returns
    /// The multisig script, or an error if the parameters are out of range.
    pub fn multisig(m: usize, pubkeys: &[Vec<u8>]) -> Result<Self, ScriptError> {
        let n = pubkeys.len();
        if m == 0 || m > n || n > 16 {
            return Err(ScriptError::InvalidScript(format!(
                "invalid multisig {m}-of-{n}"
            )));
        }
        let mut script = Script::new();
        script.0.push(small_int_op(m));
        for key in pubkeys {
            script.append_push_data(key)?;
        }
        script.0.push(small_int_op(n));
        script.0.push(OP_CHECKMULTISIG);
        Ok(script)
    }

    /// Build a nulldata (OP_RETURN) data-carrier script.
    pub fn nulldata(data: &[u8]) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        script.0.push(OP_RETURN);
        script.append_push_data(data)?;
        if script.len() > MAX_NULLDATA_SIZE {
            return Err(ScriptError::DataTooBig);
        }
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Return a reference to the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the script and return the underlying byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Return the script length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the varint-prefixed serialized size of this script.
    pub fn serialized_size(&self) -> usize {
        btx_primitives::util::VarInt::size_of(self.0.len()) + self.0.len()
    }

    // -----------------------------------------------------------------------
    // Chunk parsing
    // -----------------------------------------------------------------------

    /// Parse the script into opcode/push chunks.
    ///
    /// # Returns
    /// The chunk sequence, or an error if a push runs past the end.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        let mut chunks = Vec::new();
        let mut pos = 0;
        while pos < self.0.len() {
            chunks.push(self.read_op(&mut pos)?);
        }
        Ok(chunks)
    }

    /// Read a single opcode (and its push data, if any) at `pos`.
    fn read_op(&self, pos: &mut usize) -> Result<ScriptChunk, ScriptError> {
        let b = &self.0;
        let op = b[*pos];
        match op {
            OP_PUSHDATA1 => {
                if b.len() < *pos + 2 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = b[*pos + 1] as usize;
                *pos += 2;
                if b.len() < *pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = b[*pos..*pos + length].to_vec();
                *pos += length;
                Ok(ScriptChunk {
                    op: OP_PUSHDATA1,
                    data: Some(data),
                })
            }
            OP_PUSHDATA2 => {
                if b.len() < *pos + 3 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = u16::from_le_bytes([b[*pos + 1], b[*pos + 2]]) as usize;
                *pos += 3;
                if b.len() < *pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = b[*pos..*pos + length].to_vec();
                *pos += length;
                Ok(ScriptChunk {
                    op: OP_PUSHDATA2,
                    data: Some(data),
                })
            }
            OP_PUSHDATA4 => {
                if b.len() < *pos + 5 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length =
                    u32::from_le_bytes([b[*pos + 1], b[*pos + 2], b[*pos + 3], b[*pos + 4]])
                        as usize;
                *pos += 5;
                if b.len() < *pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = b[*pos..*pos + length].to_vec();
                *pos += length;
                Ok(ScriptChunk {
                    op: OP_PUSHDATA4,
                    data: Some(data),
                })
            }
            _ if (OP_DATA_1..OP_PUSHDATA1).contains(&op) => {
                let length = op as usize;
                if b.len() < *pos + 1 + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = b[*pos + 1..*pos + 1 + length].to_vec();
                *pos += 1 + length;
                Ok(ScriptChunk {
                    op,
                    data: Some(data),
                })
            }
            _ => {
                *pos += 1;
                Ok(ScriptChunk { op, data: None })
            }
        }
    }

    /// Append a minimal push of `data` to the script.
    ///
    /// Uses a direct push, OP_PUSHDATA1, OP_PUSHDATA2, or OP_PUSHDATA4
    /// depending on the data length. An empty slice becomes OP_0.
    ///
    /// # Arguments
    /// * `data` - The bytes to push.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        match data.len() {
            0 => self.0.push(OP_0),
            len if len < OP_PUSHDATA1 as usize => {
                self.0.push(len as u8);
                self.0.extend_from_slice(data);
            }
            len if len <= 0xff => {
                self.0.push(OP_PUSHDATA1);
                self.0.push(len as u8);
                self.0.extend_from_slice(data);
            }
            len if len <= 0xffff => {
                self.0.push(OP_PUSHDATA2);
                self.0.extend_from_slice(&(len as u16).to_le_bytes());
                self.0.extend_from_slice(data);
            }
            len if len <= 0xffff_ffff => {
                self.0.push(OP_PUSHDATA4);
                self.0.extend_from_slice(&(len as u32).to_le_bytes());
                self.0.extend_from_slice(data);
            }
            _ => return Err(ScriptError::DataTooBig),
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    /// Classify this script into its `ScriptKind`.
    ///
    /// The classification is structural: malformed scripts fall out as
    /// `Unknown` rather than erroring.
    pub fn kind(&self) -> ScriptKind {
        if self.is_p2pkh() {
            return ScriptKind::PubkeyHash;
        }
        if self.is_p2sh() {
            return ScriptKind::Scripthash;
        }
        if let Some((version, program)) = self.witness_program() {
            if version == 0 {
                match program.len() {
                    20 => return ScriptKind::WitnessPubkeyHash,
                    32 => return ScriptKind::WitnessScripthash,
                    _ => return ScriptKind::Unknown,
                }
            }
            return ScriptKind::Unknown;
        }
        if self.is_nulldata() {
            return ScriptKind::Nulldata;
        }

        let chunks = match self.chunks() {
            Ok(chunks) => chunks,
            Err(_) => return ScriptKind::Unknown,
        };

        // <pubkey> OP_CHECKSIG
        if chunks.len() == 2 && chunks[1].op == OP_CHECKSIG {
            if let Some(key) = &chunks[0].data {
                if key.len() == 33 || key.len() == 65 {
                    return ScriptKind::Pubkey;
                }
            }
        }

        if let Some((m, n)) = multisig_params(&chunks) {
            return ScriptKind::Multisig { m, n };
        }

        ScriptKind::Unknown
    }

    fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
    }

    fn is_nulldata(&self) -> bool {
        if self.0.is_empty() || self.0[0] != OP_RETURN || self.0.len() > MAX_NULLDATA_SIZE {
            return false;
        }
        // Remainder must be pushes only.
        Script::from_bytes(&self.0[1..]).is_push_only()
    }

    /// Extract a segwit program, if this script is one.
    ///
    /// # Returns
    /// `Some((version, program))` when the script is a single version
    /// opcode followed by one 2..=40 byte push, `None` otherwise.
    pub fn witness_program(&self) -> Option<(u8, &[u8])> {
        let b = &self.0;
        if b.len() < 4 || b.len() > 42 {
            return None;
        }
        let version = small_int(b[0])?;
        if version > 16 {
            return None;
        }
        let push_len = b[1] as usize;
        if !(2..=40).contains(&push_len) || b.len() != push_len + 2 {
            return None;
        }
        Some((version as u8, &b[2..]))
    }

    /// Extract the 20-byte hash from a P2PKH, P2SH, or P2WPKH script.
    pub fn hash160_payload(&self) -> Option<[u8; 20]> {
        let payload: &[u8] = match self.kind() {
            ScriptKind::PubkeyHash => &self.0[3..23],
            ScriptKind::Scripthash => &self.0[2..22],
            ScriptKind::WitnessPubkeyHash => &self.0[2..22],
            _ => return None,
        };
        let mut hash = [0u8; 20];
        hash.copy_from_slice(payload);
        Some(hash)
    }

    /// Return the public keys of a bare multisig script, in script order.
    pub fn multisig_keys(&self) -> Option<Vec<Vec<u8>>> {
        let chunks = self.chunks().ok()?;
        multisig_params(&chunks)?;
        Some(
            chunks[1..chunks.len() - 2]
                .iter()
                .filter_map(|c| c.data.clone())
                .collect(),
        )
    }

    // -----------------------------------------------------------------------
    // Predicates and transforms
    // -----------------------------------------------------------------------

    /// Whether every element of the script is a data push.
    pub fn is_push_only(&self) -> bool {
        match self.chunks() {
            Ok(chunks) => chunks
                .iter()
                .all(|c| c.data.is_some() || c.op <= OP_16),
            Err(_) => false,
        }
    }

    /// Whether the script is provably unspendable (starts with OP_RETURN
    /// or exceeds the consensus size limit).
    pub fn is_unspendable(&self) -> bool {
        self.0.len() > MAX_SCRIPT_SIZE || self.0.first() == Some(&OP_RETURN)
    }

    /// Return a copy of this script with all OP_CODESEPARATOR opcodes
    /// removed, as required before legacy signature hashing.
    pub fn remove_separators(&self) -> Script {
        let chunks = match self.chunks() {
            Ok(chunks) => chunks,
            Err(_) => return self.clone(),
        };
        if !chunks.iter().any(|c| c.op == OP_CODESEPARATOR && c.data.is_none()) {
            return self.clone();
        }
        let mut out = Script::new();
        for chunk in chunks {
            match chunk.data {
                Some(data) => {
                    // Re-encoding a push preserves its bytes: pushes are
                    // copied verbatim, only bare separators are dropped.
                    out.append_raw_push(chunk.op, &data);
                }
                None if chunk.op == OP_CODESEPARATOR => {}
                None => out.0.push(chunk.op),
            }
        }
        out
    }

    /// Re-append a push chunk using its original push opcode.
    fn append_raw_push(&mut self, op: u8, data: &[u8]) {
        match op {
            OP_PUSHDATA1 => {
                self.0.push(OP_PUSHDATA1);
                self.0.push(data.len() as u8);
            }
            OP_PUSHDATA2 => {
                self.0.push(OP_PUSHDATA2);
                self.0.extend_from_slice(&(data.len() as u16).to_le_bytes());
            }
            OP_PUSHDATA4 => {
                self.0.push(OP_PUSHDATA4);
                self.0.extend_from_slice(&(data.len() as u32).to_le_bytes());
            }
            _ => self.0.push(op),
        }
        self.0.extend_from_slice(data);
    }

    /// Return the data of the final push in this script, if any.
    ///
    /// Used to extract the redeem script from a P2SH scriptSig.
    pub fn last_push(&self) -> Option<Vec<u8>> {
        self.chunks().ok()?.into_iter().last()?.data
    }

    /// Count the signature operations in this script.
    ///
    /// # Arguments
    /// * `accurate` - When true, an OP_CHECKMULTISIG preceded by a
    ///   small-int key count costs that many sigops; otherwise it costs
    ///   the maximum of 20.
    ///
    /// # Returns
    /// The sigop count. Malformed tails are counted up to the parse error,
    /// matching reference-implementation behavior.
    pub fn get_sigops(&self, accurate: bool) -> usize {
        let mut sigops = 0;
        let mut last_op = 0xff_u8;
        let mut pos = 0;
        while pos < self.0.len() {
            let chunk = match self.read_op(&mut pos) {
                Ok(chunk) => chunk,
                Err(_) => break,
            };
            match chunk.op {
                OP_CHECKSIG | OP_CHECKSIGVERIFY => sigops += 1,
                OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                    if accurate {
                        if let Some(n) = small_int(last_op).filter(|n| *n >= 1) {
                            sigops += n;
                        } else {
                            sigops += MAX_MULTISIG_PUBKEYS;
                        }
                    } else {
                        sigops += MAX_MULTISIG_PUBKEYS;
                    }
                }
                _ => {}
            }
            last_op = chunk.op;
        }
        sigops
    }

    // -----------------------------------------------------------------------
    // Hashes
    // -----------------------------------------------------------------------

    /// Hash160 of the script bytes (P2SH commitment).
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.0)
    }

    /// Single SHA-256 of the script bytes (P2WSH commitment).
    pub fn sha256(&self) -> [u8; 32] {
        sha256(&self.0)
    }
}

/// Extract `(m, n)` if the chunk sequence is a bare multisig script.
fn multisig_params(chunks: &[ScriptChunk]) -> Option<(usize, usize)> {
    if chunks.len() < 4 {
        return None;
    }
    let last = chunks.len() - 1;
    if chunks[last].op != OP_CHECKMULTISIG || chunks[last].data.is_some() {
        return None;
    }
    let m = small_int(chunks[0].op).filter(|_| chunks[0].data.is_none())?;
    let n = small_int(chunks[last - 1].op).filter(|_| chunks[last - 1].data.is_none())?;
    let keys = &chunks[1..last - 1];
    if m == 0 || m > n || n != keys.len() {
        return None;
    }
    if !keys
        .iter()
        .all(|c| matches!(c.data.as_ref().map(|d| d.len()), Some(33) | Some(65)))
    {
        return None;
    }
    Some((m, n))
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    #[test]
    fn test_kind_p2pkh() {
        let script =
            Script::from_hex("76a914e2a623699e81b291c0327f408fea765d534baa2a88ac").unwrap();
        assert_eq!(script.kind(), ScriptKind::PubkeyHash);
        assert_eq!(
            hex::encode(script.hash160_payload().unwrap()),
            "e2a623699e81b291c0327f408fea765d534baa2a"
        );
    }

    #[test]
    fn test_kind_p2sh() {
        let script =
            Script::from_hex("a914e2a623699e81b291c0327f408fea765d534baa2a87").unwrap();
        assert_eq!(script.kind(), ScriptKind::Scripthash);
    }

    #[test]
    fn test_kind_witness_v0() {
        let p2wpkh = Script::p2wpkh(&[0xaa; 20]);
        assert_eq!(p2wpkh.kind(), ScriptKind::WitnessPubkeyHash);
        assert_eq!(p2wpkh.witness_program().unwrap().0, 0);

        let p2wsh = Script::p2wsh(&[0xbb; 32]);
        assert_eq!(p2wsh.kind(), ScriptKind::WitnessScripthash);
        assert_eq!(p2wsh.witness_program().unwrap().1.len(), 32);
    }

    #[test]
    fn test_kind_multisig() {
        let keys: Vec<Vec<u8>> = (0..3).map(|i| vec![0x02 + (i % 2) as u8; 33]).collect();
        let script = Script::multisig(2, &keys).unwrap();
        assert_eq!(script.kind(), ScriptKind::Multisig { m: 2, n: 3 });
        assert_eq!(script.multisig_keys().unwrap().len(), 3);
    }

    #[test]
    fn test_kind_nulldata() {
        let script = Script::nulldata(b"hello world").unwrap();
        assert_eq!(script.kind(), ScriptKind::Nulldata);
        assert!(script.is_unspendable());
    }

    #[test]
    fn test_kind_unknown() {
        assert_eq!(Script::new().kind(), ScriptKind::Unknown);
        assert_eq!(
            Script::from_bytes(&[OP_DUP, OP_DUP]).kind(),
            ScriptKind::Unknown
        );
    }

    // -----------------------------------------------------------------------
    // Push data
    // -----------------------------------------------------------------------

    #[test]
    fn test_append_push_data_sizes() {
        for len in [0usize, 1, 75, 76, 255, 256, 65535, 65536] {
            let data = vec![0xab; len];
            let mut script = Script::new();
            script.append_push_data(&data).unwrap();
            let chunks = script.chunks().unwrap();
            assert_eq!(chunks.len(), 1, "single chunk for len {len}");
            if len == 0 {
                assert_eq!(chunks[0].op, OP_0);
            } else {
                assert_eq!(chunks[0].data.as_deref(), Some(&data[..]));
            }
        }
    }

    #[test]
    fn test_truncated_push_fails() {
        // Direct push of 5 bytes with only 2 present.
        let script = Script::from_bytes(&[0x05, 0x01, 0x02]);
        assert!(script.chunks().is_err());
        assert!(!script.is_push_only());
    }

    // -----------------------------------------------------------------------
    // Separators and sigops
    // -----------------------------------------------------------------------

    #[test]
    fn test_remove_separators() {
        let mut script = Script::new();
        script.append_push_data(b"data").unwrap();
        let mut with_sep = script.clone();
        with_sep.0.push(OP_CODESEPARATOR);
        with_sep.0.push(OP_CHECKSIG);

        let cleaned = with_sep.remove_separators();
        let mut expected = script;
        expected.0.push(OP_CHECKSIG);
        assert_eq!(cleaned, expected);

        // Separator bytes inside push data are preserved.
        let mut payload = Script::new();
        payload.append_push_data(&[OP_CODESEPARATOR]).unwrap();
        assert_eq!(payload.remove_separators(), payload);
    }

    #[test]
    fn test_sigop_counting() {
        let p2pkh = Script::p2pkh(&[0u8; 20]);
        assert_eq!(p2pkh.get_sigops(false), 1);

        let keys: Vec<Vec<u8>> = (0..3).map(|_| vec![0x02; 33]).collect();
        let multisig = Script::multisig(2, &keys).unwrap();
        assert_eq!(multisig.get_sigops(true), 3);
        assert_eq!(multisig.get_sigops(false), 20);
    }

    #[test]
    fn test_last_push() {
        let redeem = Script::p2pkh(&[7u8; 20]);
        let mut script_sig = Script::new();
        script_sig.append_push_data(b"sig").unwrap();
        script_sig.append_push_data(redeem.as_bytes()).unwrap();
        assert_eq!(script_sig.last_push().unwrap(), redeem.as_bytes());
    }
}
