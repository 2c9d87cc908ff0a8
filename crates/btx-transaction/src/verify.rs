//! Script verification seam.
//!
//! Full script interpretation lives outside this crate. The transaction
//! layer only needs a way to ask "does this input satisfy the output it
//! spends", expressed by the [`ScriptVerifier`] trait. [`StandardVerifier`]
//! implements it for the standard script templates by checking signatures
//! directly against the appropriate sighash, which is enough to validate
//! anything this crate can build.

use btx_primitives::ec::{PublicKey, Signature};
use btx_primitives::hash::{hash160, sha256};
use btx_script::{opcodes, Script, ScriptError, ScriptKind, Witness};

use crate::sighash::{SIGVERSION_BASE, SIGVERSION_WITNESS_V0};
use crate::transaction::Transaction;

/// Script verification flag bits.
pub mod flags {
    /// Evaluate pay-to-script-hash.
    pub const VERIFY_P2SH: u32 = 1 << 0;
    /// Evaluate witness programs.
    pub const VERIFY_WITNESS: u32 = 1 << 1;
    /// Standard verification: P2SH plus witness.
    pub const STANDARD: u32 = VERIFY_P2SH | VERIFY_WITNESS;
}

/// Checks that an input satisfies the output it spends.
pub trait ScriptVerifier {
    /// Verifies one input of `tx`.
    ///
    /// # Arguments
    /// * `script_sig` - The input's scriptSig.
    /// * `witness` - The input's witness stack.
    /// * `prev` - Locking script of the spent output.
    /// * `tx` - The spending transaction.
    /// * `index` - Index of the input within `tx`.
    /// * `value` - Value of the spent output in satoshis.
    /// * `flags` - Verification flag bits.
    #[allow(clippy::too_many_arguments)]
    fn verify(
        &self,
        script_sig: &Script,
        witness: &Witness,
        prev: &Script,
        tx: &Transaction,
        index: usize,
        value: i64,
        flags: u32,
    ) -> Result<(), ScriptError>;
}

/// Template-driven verifier for the standard script shapes.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardVerifier;

impl ScriptVerifier for StandardVerifier {
    fn verify(
        &self,
        script_sig: &Script,
        witness: &Witness,
        prev: &Script,
        tx: &Transaction,
        index: usize,
        value: i64,
        flags: u32,
    ) -> Result<(), ScriptError> {
        match prev.kind() {
            ScriptKind::Pubkey => {
                let items = push_items(script_sig)?;
                let [sig] = take::<1>(&items)?;
                let key = prev
                    .last_push()
                    .ok_or_else(|| ScriptError::verify("BAD_PUBKEY"))?;
                check_sig(tx, index, sig, &key, prev, value, SIGVERSION_BASE)
            }
            ScriptKind::PubkeyHash => {
                let items = push_items(script_sig)?;
                let [sig, key] = take::<2>(&items)?;
                let payload = prev
                    .hash160_payload()
                    .ok_or_else(|| ScriptError::verify("BAD_SCRIPT"))?;
                if hash160(key) != payload {
                    return Err(ScriptError::verify("EQUALVERIFY"));
                }
                check_sig(tx, index, sig, key, prev, value, SIGVERSION_BASE)
            }
            ScriptKind::Multisig { m, .. } => {
                let items = push_items(script_sig)?;
                // Leading dummy element, then exactly m signatures.
                if items.len() != m + 1 {
                    return Err(ScriptError::verify("INVALID_STACK_OPERATION"));
                }
                check_multisig(tx, index, &items[1..], prev, prev, value, SIGVERSION_BASE)
            }
            ScriptKind::Scripthash => {
                if flags & flags::VERIFY_P2SH == 0 {
                    return Err(ScriptError::verify("DISCOURAGE_UPGRADABLE_NOPS"));
                }
                self.verify_p2sh(script_sig, witness, prev, tx, index, value, flags)
            }
            ScriptKind::WitnessPubkeyHash | ScriptKind::WitnessScripthash => {
                if flags & flags::VERIFY_WITNESS == 0 {
                    return Err(ScriptError::verify("DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM"));
                }
                if !script_sig.is_empty() {
                    return Err(ScriptError::verify("WITNESS_MALLEATED"));
                }
                self.verify_program(witness, prev, tx, index, value)
            }
            ScriptKind::Nulldata => Err(ScriptError::verify("RETURN")),
            ScriptKind::Unknown => Err(ScriptError::verify("NONSTANDARD")),
        }
    }
}

impl StandardVerifier {
    #[allow(clippy::too_many_arguments)]
    fn verify_p2sh(
        &self,
        script_sig: &Script,
        witness: &Witness,
        prev: &Script,
        tx: &Transaction,
        index: usize,
        value: i64,
        flags: u32,
    ) -> Result<(), ScriptError> {
        let items = push_items(script_sig)?;
        let (redeem_bytes, rest) = items
            .split_last()
            .ok_or_else(|| ScriptError::verify("INVALID_STACK_OPERATION"))?;
        let payload = prev
            .hash160_payload()
            .ok_or_else(|| ScriptError::verify("BAD_SCRIPT"))?;
        if hash160(redeem_bytes) != payload {
            return Err(ScriptError::verify("EQUALVERIFY"));
        }
        let redeem = Script::from_bytes(redeem_bytes);

        if redeem.witness_program().is_some() {
            if flags & flags::VERIFY_WITNESS == 0 {
                return Err(ScriptError::verify("DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM"));
            }
            // Nested witness: the scriptSig must be exactly the program push.
            if !rest.is_empty() {
                return Err(ScriptError::verify("WITNESS_MALLEATED_P2SH"));
            }
            return self.verify_program(witness, &redeem, tx, index, value);
        }

        match redeem.kind() {
            ScriptKind::Pubkey => {
                let [sig] = take::<1>(rest)?;
                let key = redeem
                    .last_push()
                    .ok_or_else(|| ScriptError::verify("BAD_PUBKEY"))?;
                check_sig(tx, index, sig, &key, &redeem, value, SIGVERSION_BASE)
            }
            ScriptKind::PubkeyHash => {
                let [sig, key] = take::<2>(rest)?;
                if hash160(key)
                    != redeem
                        .hash160_payload()
                        .ok_or_else(|| ScriptError::verify("BAD_SCRIPT"))?
                {
                    return Err(ScriptError::verify("EQUALVERIFY"));
                }
                check_sig(tx, index, sig, key, &redeem, value, SIGVERSION_BASE)
            }
            ScriptKind::Multisig { m, .. } => {
                if rest.len() != m + 1 {
                    return Err(ScriptError::verify("INVALID_STACK_OPERATION"));
                }
                check_multisig(tx, index, &rest[1..], &redeem, &redeem, value, SIGVERSION_BASE)
            }
            _ => Err(ScriptError::verify("NONSTANDARD")),
        }
    }

    fn verify_program(
        &self,
        witness: &Witness,
        prev: &Script,
        tx: &Transaction,
        index: usize,
        value: i64,
    ) -> Result<(), ScriptError> {
        let (version, program) = prev
            .witness_program()
            .ok_or_else(|| ScriptError::verify("BAD_SCRIPT"))?;
        if version != 0 {
            return Err(ScriptError::verify("DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM"));
        }

        match program.len() {
            20 => {
                if witness.len() != 2 {
                    return Err(ScriptError::verify("WITNESS_PROGRAM_MISMATCH"));
                }
                let sig = witness.get(0).unwrap_or(&[]);
                let key = witness.get(1).unwrap_or(&[]);
                if hash160(key).as_slice() != program {
                    return Err(ScriptError::verify("WITNESS_PROGRAM_MISMATCH"));
                }
                let key_hash: [u8; 20] = hash160(key);
                let code = Script::p2pkh(&key_hash);
                check_sig(tx, index, sig, key, &code, value, SIGVERSION_WITNESS_V0)
            }
            32 => {
                let (redeem_bytes, rest) = witness
                    .items()
                    .split_last()
                    .ok_or_else(|| ScriptError::verify("WITNESS_PROGRAM_WITNESS_EMPTY"))?;
                if sha256(redeem_bytes).as_slice() != program {
                    return Err(ScriptError::verify("WITNESS_PROGRAM_MISMATCH"));
                }
                let redeem = Script::from_bytes(redeem_bytes);

                match redeem.kind() {
                    ScriptKind::Pubkey => {
                        let [sig] = take::<1>(rest)?;
                        let key = redeem
                            .last_push()
                            .ok_or_else(|| ScriptError::verify("BAD_PUBKEY"))?;
                        check_sig(tx, index, sig, &key, &redeem, value, SIGVERSION_WITNESS_V0)
                    }
                    ScriptKind::PubkeyHash => {
                        let [sig, key] = take::<2>(rest)?;
                        let payload = redeem
                            .hash160_payload()
                            .ok_or_else(|| ScriptError::verify("BAD_SCRIPT"))?;
                        if hash160(key) != payload {
                            return Err(ScriptError::verify("EQUALVERIFY"));
                        }
                        check_sig(tx, index, sig, key, &redeem, value, SIGVERSION_WITNESS_V0)
                    }
                    ScriptKind::Multisig { m, .. } => {
                        if rest.len() != m + 1 {
                            return Err(ScriptError::verify("INVALID_STACK_OPERATION"));
                        }
                        check_multisig(
                            tx,
                            index,
                            &rest[1..],
                            &redeem,
                            &redeem,
                            value,
                            SIGVERSION_WITNESS_V0,
                        )
                    }
                    _ => Err(ScriptError::verify("NONSTANDARD")),
                }
            }
            _ => Err(ScriptError::verify("WITNESS_PROGRAM_WRONG_LENGTH")),
        }
    }
}

/// Extracts the pushed items of a push-only script. OP_0 pushes an empty
/// item; anything not a push fails verification.
fn push_items(script: &Script) -> Result<Vec<Vec<u8>>, ScriptError> {
    let mut items = Vec::new();
    for chunk in script.chunks()? {
        match chunk.data {
            Some(data) => items.push(data),
            None if chunk.op == opcodes::OP_0 => items.push(Vec::new()),
            None => return Err(ScriptError::verify("SIG_PUSHONLY")),
        }
    }
    Ok(items)
}

fn take<const N: usize>(items: &[Vec<u8>]) -> Result<[&[u8]; N], ScriptError> {
    if items.len() != N {
        return Err(ScriptError::verify("INVALID_STACK_OPERATION"));
    }
    let mut out = [&[][..]; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_slice();
    }
    Ok(out)
}

/// Verifies one signature-plus-sighash-type element against a key.
fn check_sig(
    tx: &Transaction,
    index: usize,
    sig: &[u8],
    key: &[u8],
    code: &Script,
    value: i64,
    sigversion: u32,
) -> Result<(), ScriptError> {
    let (der, sighash_type) = split_sig(sig)?;
    let signature = Signature::from_der(der)?;
    let pubkey = PublicKey::from_bytes(key)?;
    let hash = tx
        .signature_hash(index, code, value, sighash_type, sigversion)
        .map_err(|_| ScriptError::verify("SIGHASH"))?;
    if !pubkey.verify(&hash, &signature) {
        return Err(ScriptError::verify("CHECKSIGVERIFY"));
    }
    Ok(())
}

/// Verifies an ordered run of multisig signatures against the keys of a
/// multisig script. Signatures must appear in key order, as consensus
/// requires.
fn check_multisig(
    tx: &Transaction,
    index: usize,
    sigs: &[Vec<u8>],
    keys_script: &Script,
    code: &Script,
    value: i64,
    sigversion: u32,
) -> Result<(), ScriptError> {
    let keys = keys_script
        .multisig_keys()
        .ok_or_else(|| ScriptError::verify("BAD_SCRIPT"))?;

    let mut key_iter = keys.iter();
    'sigs: for sig in sigs {
        let (der, sighash_type) = split_sig(sig)?;
        let signature = Signature::from_der(der)?;
        let hash = tx
            .signature_hash(index, code, value, sighash_type, sigversion)
            .map_err(|_| ScriptError::verify("SIGHASH"))?;
        for key in key_iter.by_ref() {
            if let Ok(pubkey) = PublicKey::from_bytes(key) {
                if pubkey.verify(&hash, &signature) {
                    continue 'sigs;
                }
            }
        }
        return Err(ScriptError::verify("CHECKMULTISIGVERIFY"));
    }
    Ok(())
}

fn split_sig(sig: &[u8]) -> Result<(&[u8], u32), ScriptError> {
    match sig.split_last() {
        Some((sighash_type, der)) if !der.is_empty() => Ok((der, *sighash_type as u32)),
        _ => Err(ScriptError::verify("SIG_DER")),
    }
}
