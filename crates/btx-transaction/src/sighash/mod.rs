//! Signature hashing.
//!
//! Two algorithms are supported, selected by a sighash version: version 0 is
//! the legacy scheme that reserializes the whole transaction, version 1 is
//! the BIP143 scheme used by witness programs, which commits to the spent
//! amount and hashes in constant time per input via reusable midstates.

use btx_primitives::hash::sha256d;
use btx_primitives::util::{TxWriter, VarInt};
use btx_script::Script;

use crate::error::TransactionError;
use crate::input::Input;
use crate::output::Output;

/// Sign all outputs.
pub const SIGHASH_ALL: u32 = 0x01;
/// Sign no outputs.
pub const SIGHASH_NONE: u32 = 0x02;
/// Sign only the output paired with the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;
/// Modifier: commit to this input only.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;
/// Mask extracting the base type from a sighash flag.
pub const SIGHASH_MASK: u32 = 0x1f;

/// Legacy (version 0) signature hashing.
pub const SIGVERSION_BASE: u32 = 0;
/// BIP143 (version 1) signature hashing for witness programs.
pub const SIGVERSION_WITNESS_V0: u32 = 1;

/// Reusable BIP143 intermediate hashes over the prevouts, sequences, and
/// outputs of a transaction. Only valid while the transaction is unchanged,
/// so they are cached exclusively on the immutable transaction type.
#[derive(Clone, Debug)]
pub struct Midstates {
    /// Double-SHA256 of all input outpoints.
    pub prevouts: [u8; 32],
    /// Double-SHA256 of all input sequence numbers.
    pub sequences: [u8; 32],
    /// Double-SHA256 of all serialized outputs.
    pub outputs: [u8; 32],
}

/// Computes the three BIP143 midstates for a transaction body.
pub fn midstates(inputs: &[Input], outputs: &[Output]) -> Midstates {
    let mut writer = TxWriter::new();
    for input in inputs {
        input.prevout.write_to(&mut writer);
    }
    let prevouts = sha256d(writer.as_bytes());

    let mut writer = TxWriter::new();
    for input in inputs {
        writer.write_u32_le(input.sequence);
    }
    let sequences = sha256d(writer.as_bytes());

    let mut writer = TxWriter::new();
    for output in outputs {
        output.write_to(&mut writer);
    }
    let outputs = sha256d(writer.as_bytes());

    Midstates {
        prevouts,
        sequences,
        outputs,
    }
}

/// Computes the legacy (version 0) signature hash for one input.
///
/// # Arguments
/// * `version`, `inputs`, `outputs`, `locktime` - The transaction body.
/// * `index` - Input being signed.
/// * `prev` - Script code of the output being spent.
/// * `sighash_type` - SIGHASH flags.
///
/// # Returns
/// The 32-byte digest to sign.
#[allow(clippy::too_many_arguments)]
pub fn signature_hash_v0(
    version: u32,
    inputs: &[Input],
    outputs: &[Output],
    locktime: u32,
    index: usize,
    prev: &Script,
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    if index >= inputs.len() {
        return Err(TransactionError::IndexOutOfRange(index));
    }

    let base = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    // Historical quirk: SIGHASH_SINGLE with no matching output hashes the
    // constant 0x01 digest instead of failing.
    if base == SIGHASH_SINGLE && index >= outputs.len() {
        let mut digest = [0u8; 32];
        digest[0] = 0x01;
        return Ok(digest);
    }

    let prev = prev.remove_separators();

    let mut writer = TxWriter::new();
    writer.write_u32_le(version);

    if anyone_can_pay {
        writer.write_varint(VarInt::from(1u64));
        let input = &inputs[index];
        input.prevout.write_to(&mut writer);
        writer.write_var_bytes(prev.as_bytes());
        writer.write_u32_le(input.sequence);
    } else {
        writer.write_varint(VarInt::from(inputs.len()));
        for (i, input) in inputs.iter().enumerate() {
            input.prevout.write_to(&mut writer);
            if i == index {
                writer.write_var_bytes(prev.as_bytes());
            } else {
                writer.write_varint(VarInt::from(0u64));
            }
            if i != index && (base == SIGHASH_NONE || base == SIGHASH_SINGLE) {
                writer.write_u32_le(0);
            } else {
                writer.write_u32_le(input.sequence);
            }
        }
    }

    match base {
        SIGHASH_NONE => {
            writer.write_varint(VarInt::from(0u64));
        }
        SIGHASH_SINGLE => {
            writer.write_varint(VarInt::from(index + 1));
            for _ in 0..index {
                // Null output: maximal value, empty script.
                writer.write_i64_le(-1);
                writer.write_varint(VarInt::from(0u64));
            }
            outputs[index].write_to(&mut writer);
        }
        _ => {
            writer.write_varint(VarInt::from(outputs.len()));
            for output in outputs {
                output.write_to(&mut writer);
            }
        }
    }

    writer.write_u32_le(locktime);
    writer.write_u32_le(sighash_type);

    Ok(sha256d(writer.as_bytes()))
}

/// Computes the BIP143 (version 1) signature hash for one input.
///
/// # Arguments
/// * `version`, `inputs`, `outputs`, `locktime` - The transaction body.
/// * `index` - Input being signed.
/// * `prev` - Script code of the output being spent.
/// * `value` - Value in satoshis of the output being spent.
/// * `sighash_type` - SIGHASH flags.
/// * `cache` - Precomputed midstates, or `None` to compute them here.
#[allow(clippy::too_many_arguments)]
pub fn signature_hash_v1(
    version: u32,
    inputs: &[Input],
    outputs: &[Output],
    locktime: u32,
    index: usize,
    prev: &Script,
    value: i64,
    sighash_type: u32,
    cache: Option<&Midstates>,
) -> Result<[u8; 32], TransactionError> {
    if index >= inputs.len() {
        return Err(TransactionError::IndexOutOfRange(index));
    }

    let base = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    let computed;
    let full = match cache {
        Some(m) => m,
        None => {
            computed = midstates(inputs, outputs);
            &computed
        }
    };

    let zero = [0u8; 32];

    let hash_prevouts = if anyone_can_pay { zero } else { full.prevouts };
    let hash_sequence = if anyone_can_pay || base == SIGHASH_NONE || base == SIGHASH_SINGLE {
        zero
    } else {
        full.sequences
    };
    let hash_outputs = match base {
        SIGHASH_NONE => zero,
        SIGHASH_SINGLE => {
            if index < outputs.len() {
                let mut writer = TxWriter::new();
                outputs[index].write_to(&mut writer);
                sha256d(writer.as_bytes())
            } else {
                zero
            }
        }
        _ => full.outputs,
    };

    let input = &inputs[index];
    let mut writer = TxWriter::new();
    writer.write_u32_le(version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    input.prevout.write_to(&mut writer);
    writer.write_var_bytes(prev.as_bytes());
    writer.write_i64_le(value);
    writer.write_u32_le(input.sequence);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(locktime);
    writer.write_u32_le(sighash_type);

    Ok(sha256d(writer.as_bytes()))
}
