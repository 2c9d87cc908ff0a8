use std::collections::HashSet;
use std::fmt;

use btx_primitives::consensus::{
    money_range, LOCKTIME_THRESHOLD, MAX_BLOCK_SIZE, MAX_MONEY, SEQUENCE_FINAL,
    WITNESS_SCALE_FACTOR,
};
use btx_primitives::hash::sha256d;
use btx_primitives::util::{TxReader, TxWriter, VarInt};
use btx_script::{Script, ScriptKind, Witness};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TransactionError;
use crate::input::Input;
use crate::output::Output;
use crate::policy;
use crate::sighash::{self, Midstates, SIGVERSION_BASE, SIGVERSION_WITNESS_V0};
use crate::verify::ScriptVerifier;
use crate::view::CoinView;

/// Serialized sizes of a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Sizes {
    /// Size without witness data.
    pub base: usize,
    /// Size with witness data.
    pub total: usize,
}

/// An immutable transaction.
///
/// The body is fixed at construction, which makes it safe to cache the hash,
/// witness hash, sizes, and BIP143 sighash midstates lazily. Anything that
/// needs to change a transaction goes through
/// [`MutableTransaction`](crate::mtx::MutableTransaction) and converts back.
#[derive(Clone, Default)]
pub struct Transaction {
    version: u32,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    locktime: u32,

    hash: OnceCell<[u8; 32]>,
    witness_hash: OnceCell<[u8; 32]>,
    sizes: OnceCell<Sizes>,
    midstates: OnceCell<Midstates>,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.locktime == other.locktime
    }
}

impl Eq for Transaction {}

impl Transaction {
    /// Creates a transaction from its parts.
    pub fn new(version: u32, inputs: Vec<Input>, outputs: Vec<Output>, locktime: u32) -> Self {
        Transaction {
            version,
            inputs,
            outputs,
            locktime,
            hash: OnceCell::new(),
            witness_hash: OnceCell::new(),
            sizes: OnceCell::new(),
            midstates: OnceCell::new(),
        }
    }

    // ---- accessors ----

    /// Transaction version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Transaction inputs.
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Transaction outputs.
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Transaction locktime.
    pub fn locktime(&self) -> u32 {
        self.locktime
    }

    /// Decomposes the transaction into its parts, dropping all caches.
    pub fn into_parts(self) -> (u32, Vec<Input>, Vec<Output>, u32) {
        (self.version, self.inputs, self.outputs, self.locktime)
    }

    // ---- serialization ----

    /// Parses a transaction from raw bytes, auto-detecting the witness
    /// serialization by the BIP144 marker byte.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = TxReader::new(data);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::Serialization(format!(
                "{} trailing bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Parses a transaction from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let data =
            hex::decode(hex_str).map_err(|e| TransactionError::Serialization(e.to_string()))?;
        Self::from_bytes(&data)
    }

    /// Reads a transaction from a cursor.
    pub fn read_from(reader: &mut TxReader<'_>) -> Result<Self, TransactionError> {
        let err = |e: btx_primitives::PrimitivesError| TransactionError::Serialization(e.to_string());

        // A witness serialization has a zero where the legacy input count
        // would be, followed by a nonzero flag byte.
        let witness = reader.peek(4).map_err(err)? == 0 && reader.peek(5).map_err(err)? != 0;

        let version = reader.read_u32_le().map_err(err)?;

        if witness {
            let marker = reader.read_u8().map_err(err)?;
            let flag = reader.read_u8().map_err(err)?;
            if marker != 0 || flag & 1 == 0 {
                return Err(TransactionError::Serialization(format!(
                    "bad witness flag {flag:#04x}"
                )));
            }
        }

        let input_count = reader.read_varint().map_err(err)?.value() as usize;
        let mut inputs = Vec::with_capacity(input_count.min(1024));
        for _ in 0..input_count {
            inputs.push(Input::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(err)?.value() as usize;
        let mut outputs = Vec::with_capacity(output_count.min(1024));
        for _ in 0..output_count {
            outputs.push(Output::read_from(reader)?);
        }

        if witness {
            for input in &mut inputs {
                input.witness = Witness::read_from(reader)
                    .map_err(|e| TransactionError::Serialization(e.to_string()))?;
            }
        }

        let locktime = reader.read_u32_le().map_err(err)?;

        Ok(Transaction::new(version, inputs, outputs, locktime))
    }

    /// Serializes the transaction, using the witness format when any input
    /// carries witness data.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = TxWriter::with_capacity(self.sizes().total);
        if self.has_witness() {
            self.write_witness(&mut writer);
        } else {
            self.write_normal(&mut writer);
        }
        writer.into_bytes()
    }

    /// Serializes the transaction as hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Writes the legacy (non-witness) serialization.
    pub fn write_normal(&self, writer: &mut TxWriter) {
        writer.write_u32_le(self.version);
        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(writer);
        }
        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(writer);
        }
        writer.write_u32_le(self.locktime);
    }

    /// Writes the BIP144 witness serialization.
    pub fn write_witness(&self, writer: &mut TxWriter) {
        writer.write_u32_le(self.version);
        writer.write_u8(0);
        writer.write_u8(1);
        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(writer);
        }
        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(writer);
        }
        for input in &self.inputs {
            input.witness.write_to(writer);
        }
        writer.write_u32_le(self.locktime);
    }

    // ---- hashing ----

    /// Double-SHA256 of the legacy serialization. This is the txid preimage
    /// and never commits to witness data.
    pub fn hash(&self) -> [u8; 32] {
        *self.hash.get_or_init(|| {
            let mut writer = TxWriter::with_capacity(self.sizes().base);
            self.write_normal(&mut writer);
            sha256d(writer.as_bytes())
        })
    }

    /// Double-SHA256 of the witness serialization. Equal to [`hash`] for
    /// transactions without witness data.
    ///
    /// [`hash`]: Transaction::hash
    pub fn witness_hash(&self) -> [u8; 32] {
        if !self.has_witness() {
            return self.hash();
        }
        *self.witness_hash.get_or_init(|| {
            let mut writer = TxWriter::with_capacity(self.sizes().total);
            self.write_witness(&mut writer);
            sha256d(writer.as_bytes())
        })
    }

    /// Transaction id as reversed hex.
    pub fn txid(&self) -> String {
        let mut hash = self.hash();
        hash.reverse();
        hex::encode(hash)
    }

    /// Witness transaction id as reversed hex.
    pub fn wtxid(&self) -> String {
        let mut hash = self.witness_hash();
        hash.reverse();
        hex::encode(hash)
    }

    // ---- sizes ----

    /// Whether any input carries witness data.
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Base and total serialized sizes, computed without serializing.
    pub fn sizes(&self) -> Sizes {
        *self.sizes.get_or_init(|| {
            let mut base = 4 + 4;
            base += VarInt::size_of(self.inputs.len());
            for input in &self.inputs {
                base += input.base_size();
            }
            base += VarInt::size_of(self.outputs.len());
            for output in &self.outputs {
                base += output.serialized_size();
            }

            let mut total = base;
            if self.has_witness() {
                total += 2;
                for input in &self.inputs {
                    total += input.witness.serialized_size();
                }
            }

            Sizes { base, total }
        })
    }

    /// Serialized size in bytes, witness included.
    pub fn size(&self) -> usize {
        self.sizes().total
    }

    /// BIP141 weight: base size times three plus total size.
    pub fn weight(&self) -> usize {
        let sizes = self.sizes();
        sizes.base * (WITNESS_SCALE_FACTOR - 1) + sizes.total
    }

    /// Virtual size: weight divided by four, rounded up.
    pub fn vsize(&self) -> usize {
        (self.weight() + WITNESS_SCALE_FACTOR - 1) / WITNESS_SCALE_FACTOR
    }

    /// Virtual size adjusted upward for sigop cost.
    pub fn sigops_adjusted_vsize(&self, sigops_cost: usize) -> usize {
        self.vsize().max(sigops_cost * policy::BYTES_PER_SIGOP / WITNESS_SCALE_FACTOR)
    }

    /// Total sigop cost of this transaction against a view. Legacy and
    /// P2SH sigops are scaled by the witness factor; witness sigops count
    /// at face value.
    pub fn sigops_cost(&self, view: &CoinView) -> usize {
        let mut cost = 0;
        for output in &self.outputs {
            cost += output.script.get_sigops(false) * WITNESS_SCALE_FACTOR;
        }
        for input in &self.inputs {
            cost += input.script.get_sigops(false) * WITNESS_SCALE_FACTOR;
            let Some(coin) = view.get_coin_for(input) else {
                continue;
            };
            match coin.script.kind() {
                ScriptKind::Scripthash if input.script.is_push_only() => {
                    if let Some(redeem) = input.script.last_push() {
                        let redeem = Script::from_vec(redeem);
                        if let Some((0, program)) = redeem.witness_program() {
                            cost += witness_sigops(program, &input.witness);
                        } else {
                            cost += redeem.get_sigops(true) * WITNESS_SCALE_FACTOR;
                        }
                    }
                }
                ScriptKind::WitnessPubkeyHash | ScriptKind::WitnessScripthash => {
                    if let Some((0, program)) = coin.script.witness_program() {
                        cost += witness_sigops(program, &input.witness);
                    }
                }
                _ => {}
            }
        }
        cost
    }

    // ---- values ----

    /// Sum of output values.
    pub fn output_value(&self) -> i64 {
        self.outputs.iter().map(|output| output.value).sum()
    }

    /// Sum of the values of the coins this transaction spends, where the
    /// view can resolve them.
    pub fn input_value(&self, view: &CoinView) -> i64 {
        self.inputs
            .iter()
            .filter_map(|input| view.get_coin_for(input))
            .map(|coin| coin.value)
            .sum()
    }

    /// Fee paid, or zero when the view cannot resolve every input.
    pub fn fee(&self, view: &CoinView) -> i64 {
        if !self.inputs.iter().all(|input| view.contains(&input.prevout)) {
            return 0;
        }
        self.input_value(view) - self.output_value()
    }

    /// Whether this is a coinbase transaction.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    /// Whether the transaction is final at the given height and median
    /// time.
    pub fn is_final(&self, height: u32, time: u32) -> bool {
        if self.locktime == 0 {
            return true;
        }
        let limit = if self.locktime < LOCKTIME_THRESHOLD {
            height
        } else {
            time
        };
        if self.locktime < limit {
            return true;
        }
        self.inputs.iter().all(|input| input.sequence == SEQUENCE_FINAL)
    }

    /// Whether any input signals BIP125 replaceability.
    pub fn is_rbf(&self) -> bool {
        self.inputs.iter().any(|input| input.is_rbf())
    }

    // ---- signature hashing ----

    /// BIP143 midstates, computed once per transaction.
    pub fn midstates(&self) -> &Midstates {
        self.midstates
            .get_or_init(|| sighash::midstates(&self.inputs, &self.outputs))
    }

    /// Computes the signature hash for one input.
    ///
    /// # Arguments
    /// * `index` - Input being signed.
    /// * `prev` - Script code of the output being spent.
    /// * `value` - Value of the spent output, required for version 1.
    /// * `sighash_type` - SIGHASH flags.
    /// * `sigversion` - 0 for legacy hashing, 1 for BIP143.
    pub fn signature_hash(
        &self,
        index: usize,
        prev: &Script,
        value: i64,
        sighash_type: u32,
        sigversion: u32,
    ) -> Result<[u8; 32], TransactionError> {
        match sigversion {
            SIGVERSION_BASE => sighash::signature_hash_v0(
                self.version,
                &self.inputs,
                &self.outputs,
                self.locktime,
                index,
                prev,
                sighash_type,
            ),
            SIGVERSION_WITNESS_V0 => sighash::signature_hash_v1(
                self.version,
                &self.inputs,
                &self.outputs,
                self.locktime,
                index,
                prev,
                value,
                sighash_type,
                Some(self.midstates()),
            ),
            _ => Err(TransactionError::Signing(format!(
                "unknown sighash version {sigversion}"
            ))),
        }
    }

    // ---- validation ----

    /// Context-free structural checks. Returns the bitcoind-style reject
    /// reason on failure.
    pub fn check_sanity(&self) -> Result<(), TransactionError> {
        let sanity = |reason, score| TransactionError::Sanity { reason, score };

        if self.inputs.is_empty() {
            return Err(sanity("bad-txns-vin-empty", 100));
        }
        if self.outputs.is_empty() {
            return Err(sanity("bad-txns-vout-empty", 100));
        }
        if self.sizes().base > MAX_BLOCK_SIZE {
            return Err(sanity("bad-txns-oversize", 100));
        }

        let mut total: i64 = 0;
        for output in &self.outputs {
            if output.value < 0 {
                return Err(sanity("bad-txns-vout-negative", 100));
            }
            if output.value > MAX_MONEY {
                return Err(sanity("bad-txns-vout-toolarge", 100));
            }
            total = total.saturating_add(output.value);
            if !money_range(total) {
                return Err(sanity("bad-txns-txouttotal-toolarge", 100));
            }
        }

        let mut seen = HashSet::with_capacity(self.inputs.len());
        for input in &self.inputs {
            if !seen.insert(input.prevout) {
                return Err(sanity("bad-txns-inputs-duplicate", 100));
            }
        }

        if self.is_coinbase() {
            let size = self.inputs[0].script.len();
            if !(2..=100).contains(&size) {
                return Err(sanity("bad-cb-length", 100));
            }
        } else {
            for input in &self.inputs {
                if input.prevout.is_null() {
                    return Err(sanity("bad-txns-prevout-null", 10));
                }
            }
        }

        Ok(())
    }

    /// Relay policy checks. Returns the bitcoind-style reject reason on
    /// failure.
    pub fn check_standard(&self) -> Result<(), TransactionError> {
        let reject = |reason, score| TransactionError::Nonstandard { reason, score };

        if self.version < 1 || self.version > policy::MAX_TX_VERSION {
            return Err(reject("version", 0));
        }
        if self.weight() > policy::MAX_TX_WEIGHT {
            return Err(reject("tx-size", 0));
        }

        for input in &self.inputs {
            if input.script.len() > policy::MAX_SCRIPT_SIG_SIZE {
                return Err(reject("scriptsig-size", 0));
            }
            if !input.script.is_push_only() {
                return Err(reject("scriptsig-not-pushonly", 0));
            }
            if input.witness.len() > policy::MAX_P2WSH_STACK {
                return Err(reject("bad-witness-nonstandard", 0));
            }
            // Everything below the final witness item (the redeem script
            // or public key) is a signature-sized push in a standard
            // spend.
            if input.witness.len() > 1 {
                let items = input.witness.items();
                for item in &items[..items.len() - 1] {
                    if item.len() > policy::MAX_P2WSH_PUSH {
                        return Err(reject("bad-witness-nonstandard", 0));
                    }
                }
            }
        }

        let mut nulldata = 0;
        for output in &self.outputs {
            match output.kind() {
                ScriptKind::Unknown => return Err(reject("scriptpubkey", 0)),
                ScriptKind::Nulldata => nulldata += 1,
                ScriptKind::Multisig { m, n } => {
                    // Bare multisig relays only in small configurations.
                    if m < 1 || m > n || n < 1 || n > 3 {
                        return Err(reject("bare-multisig", 0));
                    }
                    if output.is_dust(policy::DUST_RELAY) {
                        return Err(reject("dust", 0));
                    }
                }
                _ => {
                    if output.is_dust(policy::DUST_RELAY) {
                        return Err(reject("dust", 0));
                    }
                }
            }
        }
        if nulldata > 1 {
            return Err(reject("multi-op-return", 0));
        }

        Ok(())
    }

    /// Contextual input checks against a view at a given spend height.
    ///
    /// # Returns
    /// The fee paid, in satoshis.
    pub fn check_inputs(&self, view: &CoinView, height: u32) -> Result<i64, TransactionError> {
        let verification = |reason, score| TransactionError::Verification { reason, score };

        if self.is_coinbase() {
            return Ok(0);
        }

        let mut total: i64 = 0;
        for input in &self.inputs {
            let coin = view
                .get_coin_for(input)
                .ok_or_else(|| verification("bad-txns-inputs-missingorspent", 0))?;

            if !coin.is_mature(height) {
                return Err(verification("bad-txns-premature-spend-of-coinbase", 0));
            }
            if !money_range(coin.value) {
                return Err(verification("bad-txns-inputvalues-outofrange", 100));
            }
            total = total.saturating_add(coin.value);
            if !money_range(total) {
                return Err(verification("bad-txns-inputvalues-outofrange", 100));
            }
        }

        let output_value = self.output_value();
        if total < output_value {
            return Err(verification("bad-txns-in-belowout", 100));
        }
        let fee = total - output_value;
        if !money_range(fee) {
            return Err(verification("bad-txns-fee-outofrange", 100));
        }

        if self.sigops_cost(view) > policy::MAX_TX_SIGOPS_COST {
            return Err(verification("bad-txns-too-many-sigops", 0));
        }
        Ok(fee)
    }

    /// Runs the script verifier over every input. Coinbase transactions
    /// pass trivially.
    pub fn check(
        &self,
        view: &CoinView,
        verifier: &dyn ScriptVerifier,
        flags: u32,
    ) -> Result<(), TransactionError> {
        if self.is_coinbase() {
            return Ok(());
        }
        for (index, input) in self.inputs.iter().enumerate() {
            let coin = view.get_coin_for(input).ok_or(TransactionError::Verification {
                reason: "bad-txns-inputs-missingorspent",
                score: 0,
            })?;
            verifier.verify(
                &input.script,
                &input.witness,
                &coin.script,
                self,
                index,
                coin.value,
                flags,
            )?;
        }
        Ok(())
    }

    /// Boolean form of [`check`]: script failures become `false`, anything
    /// else (missing coins, internal errors) still propagates.
    ///
    /// [`check`]: Transaction::check
    pub fn verify(
        &self,
        view: &CoinView,
        verifier: &dyn ScriptVerifier,
        flags: u32,
    ) -> Result<bool, TransactionError> {
        match self.check(view, verifier, flags) {
            Ok(()) => Ok(true),
            Err(TransactionError::Script(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn witness_sigops(program: &[u8], witness: &Witness) -> usize {
    match program.len() {
        20 => 1,
        32 => witness
            .last()
            .map(|redeem| Script::from_bytes(redeem).get_sigops(true))
            .unwrap_or(0),
        _ => 0,
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("txid", &self.txid())
            .field("version", &self.version)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("locktime", &self.locktime)
            .finish()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.txid())
    }
}

#[derive(Serialize, Deserialize)]
struct TxJson {
    version: u32,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    locktime: u32,
}

impl Serialize for Transaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TxJson {
            version: self.version,
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            locktime: self.locktime,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Transaction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = TxJson::deserialize(deserializer)?;
        Ok(Transaction::new(
            json.version,
            json.inputs,
            json.outputs,
            json.locktime,
        ))
    }
}
