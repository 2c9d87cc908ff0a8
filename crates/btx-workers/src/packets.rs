//! Packet types exchanged between the pool and its workers.
//!
//! Every packet is a tagged enum variant with a stable command byte and
//! a binary payload built from the same reader/writer primitives the
//! transaction wire format uses. Request packets carry full transaction
//! and coin state so a worker needs no shared memory with the caller;
//! result packets carry only what changed.

use std::fmt;

use btx_primitives::util::{TxReader, TxWriter, VarInt};
use btx_script::{Script, ScriptError, Witness};
use btx_transaction::{Coin, CoinView, KeyRing, Transaction, TransactionError};

use crate::error::WorkerError;

/// Command bytes, one per packet type. These are wire-stable: renumber
/// nothing.
pub mod cmd {
    /// Environment handshake sent once when a worker starts.
    pub const ENV: u8 = 0;
    /// Out-of-band event from a worker.
    pub const EVENT: u8 = 1;
    /// Log line from a worker.
    pub const LOG: u8 = 2;
    /// Unsolicited worker error (not tied to a job).
    pub const ERROR: u8 = 3;
    /// Job rejection reply.
    pub const ERROR_RESULT: u8 = 4;
    /// Full transaction script verification request.
    pub const CHECK: u8 = 5;
    /// Successful [`CHECK`] reply.
    pub const CHECK_RESULT: u8 = 6;
    /// Full transaction signing request.
    pub const SIGN: u8 = 7;
    /// [`SIGN`] reply with the produced scripts and witnesses.
    pub const SIGN_RESULT: u8 = 8;
    /// Single-input verification request.
    pub const CHECK_INPUT: u8 = 9;
    /// Successful [`CHECK_INPUT`] reply.
    pub const CHECK_INPUT_RESULT: u8 = 10;
    /// Single-input signing request.
    pub const SIGN_INPUT: u8 = 11;
    /// [`SIGN_INPUT`] reply.
    pub const SIGN_INPUT_RESULT: u8 = 12;
    /// Raw ECDSA verification request.
    pub const EC_VERIFY: u8 = 13;
    /// [`EC_VERIFY`] reply.
    pub const EC_VERIFY_RESULT: u8 = 14;
    /// Raw ECDSA signing request.
    pub const EC_SIGN: u8 = 15;
    /// [`EC_SIGN`] reply.
    pub const EC_SIGN_RESULT: u8 = 16;
    /// Proof-of-work nonce search request.
    pub const MINE: u8 = 17;
    /// [`MINE`] reply.
    pub const MINE_RESULT: u8 = 18;
    /// Scrypt key derivation request.
    pub const SCRYPT: u8 = 19;
    /// [`SCRYPT`] reply.
    pub const SCRYPT_RESULT: u8 = 20;
}

/// Protocol version announced in the [`Packet::Env`] handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// A job failure carried over the wire. Script failures keep the
/// failing opcode position so callers can report it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobError {
    /// Human-readable failure description.
    pub message: String,
    /// Stable failure code (a script verify code or an error class).
    pub code: String,
    /// Index of the failing opcode, zero when not a script failure.
    pub op: u32,
    /// Instruction pointer at failure, zero when not a script failure.
    pub ip: u32,
}

impl JobError {
    /// Converts an in-process job failure into its wire form.
    pub fn from_failure(err: &TransactionError) -> Self {
        let message = err.to_string();
        match err {
            TransactionError::Script(ScriptError::Verify { code, op, ip }) => JobError {
                message,
                code: (*code).to_string(),
                op: *op as u32,
                ip: *ip as u32,
            },
            TransactionError::Script(_) => JobError {
                message,
                code: "SCRIPT".into(),
                op: 0,
                ip: 0,
            },
            TransactionError::Funding(_) => JobError {
                message,
                code: "FUNDS".into(),
                op: 0,
                ip: 0,
            },
            TransactionError::Sanity { reason, .. }
            | TransactionError::Nonstandard { reason, .. }
            | TransactionError::Verification { reason, .. } => JobError {
                message,
                code: (*reason).to_string(),
                op: 0,
                ip: 0,
            },
            _ => JobError {
                message,
                code: "ERR".into(),
                op: 0,
                ip: 0,
            },
        }
    }

    fn write_to(&self, writer: &mut TxWriter) {
        writer.write_var_bytes(self.message.as_bytes());
        writer.write_var_bytes(self.code.as_bytes());
        writer.write_u32_le(self.op);
        writer.write_u32_le(self.ip);
    }

    fn read_from(reader: &mut TxReader<'_>) -> Result<Self, WorkerError> {
        let message = read_string(reader)?;
        let code = read_string(reader)?;
        let op = reader.read_u32_le()?;
        let ip = reader.read_u32_le()?;
        Ok(JobError { message, code, op, ip })
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op != 0 || self.ip != 0 {
            write!(
                f,
                "{} [{}] (op={}, ip={})",
                self.message, self.code, self.op, self.ip
            )
        } else {
            write!(f, "{} [{}]", self.message, self.code)
        }
    }
}

/// Every message that can cross the worker boundary.
#[derive(Debug)]
pub enum Packet {
    /// Handshake announcing the worker's protocol version.
    Env {
        /// Protocol version the worker speaks.
        version: u32,
    },
    /// Out-of-band event items from a worker.
    Event {
        /// Opaque event items.
        items: Vec<Vec<u8>>,
    },
    /// Log line forwarded to the parent's logger.
    Log {
        /// UTF-8 log text.
        text: String,
    },
    /// Unsolicited error not tied to any job.
    Error {
        /// The failure.
        error: JobError,
    },
    /// Reply rejecting the correlated job.
    ErrorResult {
        /// Why the job was rejected.
        error: JobError,
    },
    /// Verify every input of a transaction.
    Check {
        /// The transaction to verify.
        tx: Transaction,
        /// Coins for its inputs.
        view: CoinView,
        /// Verification flags.
        flags: u32,
    },
    /// All inputs verified.
    CheckResult,
    /// Template and sign every input the rings can satisfy.
    Sign {
        /// The transaction to sign.
        tx: Transaction,
        /// Coins for its inputs.
        view: CoinView,
        /// Keys available for signing.
        rings: Vec<KeyRing>,
        /// Sighash type to sign with.
        sighash_type: u32,
    },
    /// Scripts and witnesses produced by a [`Packet::Sign`] job.
    SignResult {
        /// Number of inputs signed.
        total: u32,
        /// Final scriptSig per input.
        scripts: Vec<Script>,
        /// Final witness per input.
        witnesses: Vec<Witness>,
    },
    /// Verify a single input.
    CheckInput {
        /// The spending transaction.
        tx: Transaction,
        /// Index of the input to verify.
        index: u32,
        /// The coin that input spends.
        coin: Coin,
        /// Verification flags.
        flags: u32,
    },
    /// The input verified.
    CheckInputResult,
    /// Template and sign a single input.
    SignInput {
        /// The spending transaction.
        tx: Transaction,
        /// Index of the input to sign.
        index: u32,
        /// The coin that input spends.
        coin: Coin,
        /// Key to sign with.
        ring: KeyRing,
        /// Sighash type to sign with.
        sighash_type: u32,
    },
    /// Result of a [`Packet::SignInput`] job.
    SignInputResult {
        /// Whether a signature was produced.
        signed: bool,
        /// Final scriptSig for the input.
        script: Script,
        /// Final witness for the input.
        witness: Witness,
    },
    /// Verify a raw ECDSA signature over a 32-byte digest.
    EcVerify {
        /// Message digest.
        hash: [u8; 32],
        /// DER-encoded signature.
        signature: Vec<u8>,
        /// SEC1-encoded public key.
        key: Vec<u8>,
    },
    /// Result of an [`Packet::EcVerify`] job.
    EcVerifyResult {
        /// Whether the signature is valid.
        valid: bool,
    },
    /// Produce a raw ECDSA signature over a 32-byte digest.
    EcSign {
        /// Message digest.
        hash: [u8; 32],
        /// Raw 32-byte private key.
        key: [u8; 32],
    },
    /// Result of an [`Packet::EcSign`] job.
    EcSignResult {
        /// DER-encoded signature.
        signature: Vec<u8>,
    },
    /// Search a block header's nonce range for a hash at or below the
    /// target.
    Mine {
        /// 80-byte serialized block header.
        header: Vec<u8>,
        /// 32-byte big-endian target.
        target: [u8; 32],
        /// First nonce to try (inclusive).
        min: u32,
        /// Last nonce to try (inclusive).
        max: u32,
    },
    /// Result of a [`Packet::Mine`] job.
    MineResult {
        /// The solving nonce, if one exists in the range.
        nonce: Option<u32>,
    },
    /// Derive a key with scrypt.
    Scrypt {
        /// Passphrase bytes.
        passphrase: Vec<u8>,
        /// Salt bytes.
        salt: Vec<u8>,
        /// CPU/memory cost (must be a power of two greater than one).
        n: u32,
        /// Block size parameter.
        r: u32,
        /// Parallelization parameter.
        p: u32,
        /// Derived key length in bytes.
        length: u32,
    },
    /// Result of a [`Packet::Scrypt`] job.
    ScryptResult {
        /// Derived key.
        key: Vec<u8>,
    },
}

impl Packet {
    /// The command byte identifying this packet on the wire.
    pub fn cmd(&self) -> u8 {
        match self {
            Packet::Env { .. } => cmd::ENV,
            Packet::Event { .. } => cmd::EVENT,
            Packet::Log { .. } => cmd::LOG,
            Packet::Error { .. } => cmd::ERROR,
            Packet::ErrorResult { .. } => cmd::ERROR_RESULT,
            Packet::Check { .. } => cmd::CHECK,
            Packet::CheckResult => cmd::CHECK_RESULT,
            Packet::Sign { .. } => cmd::SIGN,
            Packet::SignResult { .. } => cmd::SIGN_RESULT,
            Packet::CheckInput { .. } => cmd::CHECK_INPUT,
            Packet::CheckInputResult => cmd::CHECK_INPUT_RESULT,
            Packet::SignInput { .. } => cmd::SIGN_INPUT,
            Packet::SignInputResult { .. } => cmd::SIGN_INPUT_RESULT,
            Packet::EcVerify { .. } => cmd::EC_VERIFY,
            Packet::EcVerifyResult { .. } => cmd::EC_VERIFY_RESULT,
            Packet::EcSign { .. } => cmd::EC_SIGN,
            Packet::EcSignResult { .. } => cmd::EC_SIGN_RESULT,
            Packet::Mine { .. } => cmd::MINE,
            Packet::MineResult { .. } => cmd::MINE_RESULT,
            Packet::Scrypt { .. } => cmd::SCRYPT,
            Packet::ScryptResult { .. } => cmd::SCRYPT_RESULT,
        }
    }

    /// Serializes the packet payload (header and sentinel excluded).
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = TxWriter::new();
        match self {
            Packet::Env { version } => {
                writer.write_u32_le(*version);
            }
            Packet::Event { items } => {
                writer.write_varint(VarInt::from(items.len() as u64));
                for item in items {
                    writer.write_var_bytes(item);
                }
            }
            Packet::Log { text } => {
                writer.write_var_bytes(text.as_bytes());
            }
            Packet::Error { error } | Packet::ErrorResult { error } => {
                error.write_to(&mut writer);
            }
            Packet::Check { tx, view, flags } => {
                return encode_check(tx, view, *flags);
            }
            Packet::CheckResult | Packet::CheckInputResult => {}
            Packet::Sign {
                tx,
                view,
                rings,
                sighash_type,
            } => {
                return encode_sign(tx, view, rings, *sighash_type);
            }
            Packet::SignResult {
                total,
                scripts,
                witnesses,
            } => {
                writer.write_u32_le(*total);
                writer.write_varint(VarInt::from(scripts.len() as u64));
                for (script, witness) in scripts.iter().zip(witnesses) {
                    writer.write_var_bytes(script.as_bytes());
                    witness.write_to(&mut writer);
                }
            }
            Packet::CheckInput {
                tx,
                index,
                coin,
                flags,
            } => {
                return encode_check_input(tx, *index, coin, *flags);
            }
            Packet::SignInput {
                tx,
                index,
                coin,
                ring,
                sighash_type,
            } => {
                return encode_sign_input(tx, *index, coin, ring, *sighash_type);
            }
            Packet::SignInputResult {
                signed,
                script,
                witness,
            } => {
                writer.write_u8(u8::from(*signed));
                writer.write_var_bytes(script.as_bytes());
                witness.write_to(&mut writer);
            }
            Packet::EcVerify {
                hash,
                signature,
                key,
            } => {
                writer.write_bytes(hash);
                writer.write_var_bytes(signature);
                writer.write_var_bytes(key);
            }
            Packet::EcVerifyResult { valid } => {
                writer.write_u8(u8::from(*valid));
            }
            Packet::EcSign { hash, key } => {
                writer.write_bytes(hash);
                writer.write_bytes(key);
            }
            Packet::EcSignResult { signature } => {
                writer.write_var_bytes(signature);
            }
            Packet::Mine {
                header,
                target,
                min,
                max,
            } => {
                writer.write_var_bytes(header);
                writer.write_bytes(target);
                writer.write_u32_le(*min);
                writer.write_u32_le(*max);
            }
            Packet::MineResult { nonce } => match nonce {
                Some(nonce) => {
                    writer.write_u8(1);
                    writer.write_u32_le(*nonce);
                }
                None => writer.write_u8(0),
            },
            Packet::Scrypt {
                passphrase,
                salt,
                n,
                r,
                p,
                length,
            } => {
                writer.write_var_bytes(passphrase);
                writer.write_var_bytes(salt);
                writer.write_u32_le(*n);
                writer.write_u32_le(*r);
                writer.write_u32_le(*p);
                writer.write_u32_le(*length);
            }
            Packet::ScryptResult { key } => {
                writer.write_var_bytes(key);
            }
        }
        writer.into_bytes()
    }

    /// Decodes a packet payload for the given command byte.
    pub fn decode(cmd_byte: u8, payload: &[u8]) -> Result<Self, WorkerError> {
        decode_payload(cmd_byte, payload).map_err(|err| match err {
            err @ WorkerError::Frame(_) => err,
            err => WorkerError::Packet {
                cmd: cmd_byte,
                reason: err.to_string(),
            },
        })
    }
}

fn decode_payload(cmd_byte: u8, payload: &[u8]) -> Result<Packet, WorkerError> {
    let mut reader = TxReader::new(payload);
    let packet = match cmd_byte {
        cmd::ENV => Packet::Env {
            version: reader.read_u32_le()?,
        },
        cmd::EVENT => {
            let count = reader.read_varint()?.value() as usize;
            let mut items = Vec::with_capacity(count.min(64));
            for _ in 0..count {
                items.push(reader.read_var_bytes()?.to_vec());
            }
            Packet::Event { items }
        }
        cmd::LOG => Packet::Log {
            text: read_string(&mut reader)?,
        },
        cmd::ERROR => Packet::Error {
            error: JobError::read_from(&mut reader)?,
        },
        cmd::ERROR_RESULT => Packet::ErrorResult {
            error: JobError::read_from(&mut reader)?,
        },
        cmd::CHECK => {
            let tx = Transaction::from_bytes(reader.read_var_bytes()?)?;
            let view = CoinView::read_for(&mut reader, tx.inputs())?;
            let flags = reader.read_u32_le()?;
            Packet::Check { tx, view, flags }
        }
        cmd::CHECK_RESULT => Packet::CheckResult,
        cmd::SIGN => {
            let tx = Transaction::from_bytes(reader.read_var_bytes()?)?;
            let view = CoinView::read_for(&mut reader, tx.inputs())?;
            let count = reader.read_varint()?.value() as usize;
            let mut rings = Vec::with_capacity(count.min(64));
            for _ in 0..count {
                rings.push(KeyRing::read_from(&mut reader)?);
            }
            let sighash_type = reader.read_u32_le()?;
            Packet::Sign {
                tx,
                view,
                rings,
                sighash_type,
            }
        }
        cmd::SIGN_RESULT => {
            let total = reader.read_u32_le()?;
            let count = reader.read_varint()?.value() as usize;
            let mut scripts = Vec::with_capacity(count.min(64));
            let mut witnesses = Vec::with_capacity(count.min(64));
            for _ in 0..count {
                scripts.push(Script::from_bytes(reader.read_var_bytes()?));
                witnesses.push(Witness::read_from(&mut reader)?);
            }
            Packet::SignResult {
                total,
                scripts,
                witnesses,
            }
        }
        cmd::CHECK_INPUT => {
            let tx = Transaction::from_bytes(reader.read_var_bytes()?)?;
            let index = reader.read_u32_le()?;
            let prevout = input_prevout(&tx, index)?;
            let coin = Coin::read_from(&mut reader, prevout)?;
            let flags = reader.read_u32_le()?;
            Packet::CheckInput {
                tx,
                index,
                coin,
                flags,
            }
        }
        cmd::CHECK_INPUT_RESULT => Packet::CheckInputResult,
        cmd::SIGN_INPUT => {
            let tx = Transaction::from_bytes(reader.read_var_bytes()?)?;
            let index = reader.read_u32_le()?;
            let prevout = input_prevout(&tx, index)?;
            let coin = Coin::read_from(&mut reader, prevout)?;
            let ring = KeyRing::read_from(&mut reader)?;
            let sighash_type = reader.read_u32_le()?;
            Packet::SignInput {
                tx,
                index,
                coin,
                ring,
                sighash_type,
            }
        }
        cmd::SIGN_INPUT_RESULT => Packet::SignInputResult {
            signed: reader.read_u8()? != 0,
            script: Script::from_bytes(reader.read_var_bytes()?),
            witness: Witness::read_from(&mut reader)?,
        },
        cmd::EC_VERIFY => Packet::EcVerify {
            hash: reader.read_hash()?,
            signature: reader.read_var_bytes()?.to_vec(),
            key: reader.read_var_bytes()?.to_vec(),
        },
        cmd::EC_VERIFY_RESULT => Packet::EcVerifyResult {
            valid: reader.read_u8()? != 0,
        },
        cmd::EC_SIGN => Packet::EcSign {
            hash: reader.read_hash()?,
            key: reader.read_hash()?,
        },
        cmd::EC_SIGN_RESULT => Packet::EcSignResult {
            signature: reader.read_var_bytes()?.to_vec(),
        },
        cmd::MINE => Packet::Mine {
            header: reader.read_var_bytes()?.to_vec(),
            target: reader.read_hash()?,
            min: reader.read_u32_le()?,
            max: reader.read_u32_le()?,
        },
        cmd::MINE_RESULT => {
            let found = reader.read_u8()? != 0;
            let nonce = if found {
                Some(reader.read_u32_le()?)
            } else {
                None
            };
            Packet::MineResult { nonce }
        }
        cmd::SCRYPT => Packet::Scrypt {
            passphrase: reader.read_var_bytes()?.to_vec(),
            salt: reader.read_var_bytes()?.to_vec(),
            n: reader.read_u32_le()?,
            r: reader.read_u32_le()?,
            p: reader.read_u32_le()?,
            length: reader.read_u32_le()?,
        },
        cmd::SCRYPT_RESULT => Packet::ScryptResult {
            key: reader.read_var_bytes()?.to_vec(),
        },
        unknown => {
            return Err(WorkerError::Frame(format!(
                "unknown command byte {}",
                unknown
            )))
        }
    };
    Ok(packet)
}

// ---- borrowing payload encoders ----
//
// Request builders that take references, so callers keep their
// transaction state. `Packet::encode` delegates here for the same
// variants.

/// Encodes a [`Packet::Check`] payload.
pub fn encode_check(tx: &Transaction, view: &CoinView, flags: u32) -> Vec<u8> {
    let mut writer = TxWriter::new();
    writer.write_var_bytes(&tx.to_bytes());
    view.write_for(&mut writer, tx.inputs());
    writer.write_u32_le(flags);
    writer.into_bytes()
}

/// Encodes a [`Packet::Sign`] payload.
pub fn encode_sign(
    tx: &Transaction,
    view: &CoinView,
    rings: &[KeyRing],
    sighash_type: u32,
) -> Vec<u8> {
    let mut writer = TxWriter::new();
    writer.write_var_bytes(&tx.to_bytes());
    view.write_for(&mut writer, tx.inputs());
    writer.write_varint(VarInt::from(rings.len() as u64));
    for ring in rings {
        ring.write_to(&mut writer);
    }
    writer.write_u32_le(sighash_type);
    writer.into_bytes()
}

/// Encodes a [`Packet::CheckInput`] payload.
pub fn encode_check_input(tx: &Transaction, index: u32, coin: &Coin, flags: u32) -> Vec<u8> {
    let mut writer = TxWriter::new();
    writer.write_var_bytes(&tx.to_bytes());
    writer.write_u32_le(index);
    coin.write_to(&mut writer);
    writer.write_u32_le(flags);
    writer.into_bytes()
}

/// Encodes a [`Packet::SignInput`] payload.
pub fn encode_sign_input(
    tx: &Transaction,
    index: u32,
    coin: &Coin,
    ring: &KeyRing,
    sighash_type: u32,
) -> Vec<u8> {
    let mut writer = TxWriter::new();
    writer.write_var_bytes(&tx.to_bytes());
    writer.write_u32_le(index);
    coin.write_to(&mut writer);
    ring.write_to(&mut writer);
    writer.write_u32_le(sighash_type);
    writer.into_bytes()
}

fn input_prevout(tx: &Transaction, index: u32) -> Result<btx_transaction::Outpoint, WorkerError> {
    tx.inputs()
        .get(index as usize)
        .map(|input| input.prevout)
        .ok_or_else(|| WorkerError::Frame(format!("input index {} out of range", index)))
}

fn read_string(reader: &mut TxReader<'_>) -> Result<String, WorkerError> {
    let bytes = reader.read_var_bytes()?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| WorkerError::Frame("invalid utf-8 in packet".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use btx_transaction::{Input, Outpoint, Output};

    fn roundtrip(packet: Packet) -> Packet {
        let encoded = packet.encode();
        Packet::decode(packet.cmd(), &encoded).unwrap()
    }

    #[test]
    fn error_result_roundtrip() {
        let error = JobError {
            message: "script verify failed".into(),
            code: "EQUALVERIFY".into(),
            op: 3,
            ip: 4,
        };
        match roundtrip(Packet::ErrorResult { error: error.clone() }) {
            Packet::ErrorResult { error: decoded } => assert_eq!(decoded, error),
            other => panic!("wrong packet: {:?}", other),
        }
    }

    #[test]
    fn check_roundtrip_carries_view() {
        let input = Input::from_outpoint(Outpoint::new([9u8; 32], 1));
        let tx = Transaction::new(
            1,
            vec![input],
            vec![Output::new(5_000, Script::from_bytes(&[0x51]))],
            0,
        );
        let mut view = CoinView::new();
        view.add(Coin {
            version: 1,
            height: 100,
            value: 7_000,
            script: Script::from_bytes(&[0x51]),
            coinbase: false,
            hash: [9u8; 32],
            index: 1,
        });
        match roundtrip(Packet::Check { tx, view, flags: 3 }) {
            Packet::Check { tx, view, flags } => {
                assert_eq!(flags, 3);
                let coin = view.get_coin_for(&tx.inputs()[0]).unwrap();
                assert_eq!(coin.value, 7_000);
                assert_eq!(coin.height, 100);
            }
            other => panic!("wrong packet: {:?}", other),
        }
    }

    #[test]
    fn mine_result_roundtrip() {
        match roundtrip(Packet::MineResult { nonce: Some(0xdeadbeef) }) {
            Packet::MineResult { nonce } => assert_eq!(nonce, Some(0xdeadbeef)),
            other => panic!("wrong packet: {:?}", other),
        }
        match roundtrip(Packet::MineResult { nonce: None }) {
            Packet::MineResult { nonce } => assert_eq!(nonce, None),
            other => panic!("wrong packet: {:?}", other),
        }
    }

    #[test]
    fn unknown_command_rejected() {
        assert!(matches!(
            Packet::decode(0xff, &[]),
            Err(WorkerError::Frame(_))
        ));
    }

    #[test]
    fn truncated_payload_rejected() {
        let packet = Packet::EcVerify {
            hash: [1u8; 32],
            signature: vec![0x30, 0x06],
            key: vec![0x02; 33],
        };
        let encoded = packet.encode();
        assert!(Packet::decode(cmd::EC_VERIFY, &encoded[..encoded.len() - 1]).is_err());
    }
}
