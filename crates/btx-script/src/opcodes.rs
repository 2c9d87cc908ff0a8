//! Script opcode constants.
//!
//! Only the opcodes needed for template construction, classification, and
//! sigop counting are defined; execution belongs to an external engine.

/// Push an empty byte vector.
pub const OP_0: u8 = 0x00;
/// Lowest direct-push opcode (push 1 byte).
pub const OP_DATA_1: u8 = 0x01;
/// Push 20 bytes (key hash / script hash).
pub const OP_DATA_20: u8 = 0x14;
/// Push 32 bytes (witness script hash).
pub const OP_DATA_32: u8 = 0x20;
/// Push the next byte's worth of data.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// Push the next two (LE) bytes' worth of data.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Push the next four (LE) bytes' worth of data.
pub const OP_PUSHDATA4: u8 = 0x4e;
/// Push the number -1.
pub const OP_1NEGATE: u8 = 0x4f;
/// Push the number 1.
pub const OP_1: u8 = 0x51;
/// Push the number 16.
pub const OP_16: u8 = 0x60;

/// Marks an output as provably unspendable data carrier.
pub const OP_RETURN: u8 = 0x6a;

/// Duplicate the top stack item.
pub const OP_DUP: u8 = 0x76;
/// Fail unless the top two items are equal.
pub const OP_EQUAL: u8 = 0x87;
/// OP_EQUAL then OP_VERIFY.
pub const OP_EQUALVERIFY: u8 = 0x88;

/// Hash160 the top stack item.
pub const OP_HASH160: u8 = 0xa9;
/// Signature-hash boundary marker, stripped before legacy sighash.
pub const OP_CODESEPARATOR: u8 = 0xab;
/// Check an ECDSA signature.
pub const OP_CHECKSIG: u8 = 0xac;
/// OP_CHECKSIG then OP_VERIFY.
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
/// Check m-of-n ECDSA signatures.
pub const OP_CHECKMULTISIG: u8 = 0xae;
/// OP_CHECKMULTISIG then OP_VERIFY.
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;

/// Convert a small-integer opcode (OP_0, OP_1..OP_16) to its value.
///
/// # Returns
/// `Some(n)` for small-int opcodes, `None` otherwise.
pub fn small_int(op: u8) -> Option<usize> {
    match op {
        OP_0 => Some(0),
        OP_1..=OP_16 => Some((op - OP_1 + 1) as usize),
        _ => None,
    }
}

/// Convert a value in `0..=16` to its small-integer opcode.
///
/// # Panics
/// Panics if `n > 16`.
pub fn small_int_op(n: usize) -> u8 {
    assert!(n <= 16, "small int opcode out of range");
    if n == 0 {
        OP_0
    } else {
        OP_1 + (n as u8) - 1
    }
}
