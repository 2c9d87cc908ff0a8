use btx_primitives::consensus::{
    SEQUENCE_FINAL, SEQUENCE_GRANULARITY, SEQUENCE_MASK, SEQUENCE_TYPE_FLAG,
};
use btx_primitives::util::VarInt;
use btx_script::{Script, ScriptKind, Witness};
use rand::Rng;

use crate::coin::{AccountLookup, Coin};
use crate::error::{FundingError, TransactionError};
use crate::input::Input;
use crate::outpoint::Outpoint;
use crate::output::Output;
use crate::policy;
use crate::ring::KeyRing;
use crate::selector::{CoinSelector, FundOptions, Selection};
use crate::sighash::{self, SIGHASH_ALL, SIGVERSION_BASE, SIGVERSION_WITNESS_V0};
use crate::transaction::Transaction;
use crate::verify::ScriptVerifier;
use crate::view::CoinView;

/// Which outputs absorb the fee when funding with fee subtraction.
#[derive(Clone, Copy, Debug)]
pub enum SubtractTarget {
    /// Spread the fee across all spendable outputs.
    All,
    /// Take the whole fee from one output.
    Index(usize),
}

/// A transaction under construction.
///
/// Unlike [`Transaction`], everything here is freely mutable and nothing is
/// cached. The builder carries its own [`CoinView`] resolving the coins its
/// inputs spend, which is what templating, signing, and fee estimation work
/// against. Call [`commit`](MutableTransaction::commit) to freeze the
/// result.
#[derive(Debug, Default)]
pub struct MutableTransaction {
    /// Transaction version.
    pub version: u32,
    /// Transaction inputs.
    pub inputs: Vec<Input>,
    /// Transaction outputs.
    pub outputs: Vec<Output>,
    /// Transaction locktime.
    pub locktime: u32,
    /// Index of the change output, once funded.
    pub change_index: Option<usize>,
    /// Coins spent by the inputs.
    pub view: CoinView,
}

impl MutableTransaction {
    /// Creates an empty version-1 transaction.
    pub fn new() -> Self {
        MutableTransaction {
            version: 1,
            ..Default::default()
        }
    }

    /// Rebuilds a builder from an immutable transaction and the view it was
    /// checked against.
    pub fn from_tx(tx: Transaction, view: CoinView) -> Self {
        let (version, inputs, outputs, locktime) = tx.into_parts();
        MutableTransaction {
            version,
            inputs,
            outputs,
            locktime,
            change_index: None,
            view,
        }
    }

    /// Snapshots the current state as an immutable transaction.
    pub fn to_tx(&self) -> Transaction {
        Transaction::new(
            self.version,
            self.inputs.clone(),
            self.outputs.clone(),
            self.locktime,
        )
    }

    /// Consumes the builder, returning the immutable transaction and the
    /// view needed to verify it.
    pub fn commit(self) -> (Transaction, CoinView) {
        (
            Transaction::new(self.version, self.inputs, self.outputs, self.locktime),
            self.view,
        )
    }

    // ---- building ----

    /// Adds a prepared input as-is.
    pub fn add_input(&mut self, input: Input) {
        self.inputs.push(input);
    }

    /// Adds an unsigned input spending `prevout`.
    pub fn add_outpoint(&mut self, prevout: Outpoint) {
        self.inputs.push(Input::from_outpoint(prevout));
    }

    /// Registers every output of a funding transaction as a spendable
    /// coin in the view.
    ///
    /// # Arguments
    /// * `tx` - The funding transaction.
    /// * `height` - Block height of the funding transaction, or -1.
    pub fn add_tx(&mut self, tx: &Transaction, height: i32) -> Result<(), TransactionError> {
        self.view.add_tx(tx, height)
    }

    /// Whether the view resolves a coin for every input.
    pub fn has_coins(&self) -> bool {
        self.inputs
            .iter()
            .all(|input| self.view.get_coin_for(input).is_some())
    }

    /// Adds an input spending `coin` and records the coin in the view.
    pub fn add_coin(&mut self, coin: Coin) {
        self.add_outpoint(coin.outpoint());
        self.view.add(coin);
    }

    /// Adds an output paying `value` to `script`.
    pub fn add_output(&mut self, script: Script, value: i64) {
        self.outputs.push(Output::new(value, script));
    }

    /// Sum of output values.
    pub fn output_value(&self) -> i64 {
        self.outputs.iter().map(|output| output.value).sum()
    }

    /// Sum of the values of inputs the view can resolve.
    pub fn input_value(&self) -> i64 {
        self.inputs
            .iter()
            .filter_map(|input| self.view.get_coin_for(input))
            .map(|coin| coin.value)
            .sum()
    }

    /// Fee implied by the current inputs and outputs.
    pub fn fee(&self) -> i64 {
        self.input_value() - self.output_value()
    }

    // ---- checking ----

    /// Contextual input checks against the builder's own view.
    ///
    /// # Returns
    /// The fee paid, in satoshis.
    pub fn check_inputs(&self, height: u32) -> Result<i64, TransactionError> {
        self.to_tx().check_inputs(&self.view, height)
    }

    /// Runs the script verifier over every input against the builder's
    /// view. Script failures become `false`; structural errors propagate.
    pub fn verify(
        &self,
        verifier: &dyn ScriptVerifier,
        flags: u32,
    ) -> Result<bool, TransactionError> {
        self.to_tx().verify(&self.view, verifier, flags)
    }

    // ---- locktime and sequences ----

    /// Sets the locktime, downgrading final sequences so the locktime is
    /// actually enforced.
    pub fn set_locktime(&mut self, locktime: u32) {
        for input in &mut self.inputs {
            if input.sequence == SEQUENCE_FINAL {
                input.sequence = SEQUENCE_FINAL - 1;
            }
        }
        self.locktime = locktime;
    }

    /// Encodes a BIP68 relative locktime into an input's sequence and bumps
    /// the version to 2, where relative locktimes are enforced.
    ///
    /// # Arguments
    /// * `index` - Input to constrain.
    /// * `value` - Blocks, or seconds when `seconds` is set.
    /// * `seconds` - Interpret `value` as a time span (512s granularity).
    pub fn set_sequence(
        &mut self,
        index: usize,
        value: u32,
        seconds: bool,
    ) -> Result<(), TransactionError> {
        let input = self
            .inputs
            .get_mut(index)
            .ok_or(TransactionError::IndexOutOfRange(index))?;
        input.sequence = if seconds {
            SEQUENCE_TYPE_FLAG | ((value >> SEQUENCE_GRANULARITY) & SEQUENCE_MASK)
        } else {
            value & SEQUENCE_MASK
        };
        if self.version < 2 {
            self.version = 2;
        }
        Ok(())
    }

    /// Sets the locktime to the current height so the transaction cannot be
    /// mined into an earlier reorged block, occasionally backdating it so
    /// that transactions delayed in broadcast do not stand out.
    pub fn avoid_fee_sniping(&mut self, height: u32) {
        let mut rng = rand::thread_rng();
        let mut locktime = height;
        if rng.gen_range(0..10) == 0 {
            locktime = locktime.saturating_sub(rng.gen_range(0..100));
        }
        self.set_locktime(locktime);
    }

    // ---- ordering ----

    /// Sorts inputs and outputs canonically (BIP69), keeping track of where
    /// the change output lands.
    pub fn sort_members(&mut self) {
        let change = self.change_index.take().map(|index| self.outputs[index].clone());

        // BIP69 orders inputs by txid as displayed, which is the reversed
        // hash, then by output index.
        self.inputs.sort_by(|a, b| {
            let mut ah = a.prevout.hash;
            let mut bh = b.prevout.hash;
            ah.reverse();
            bh.reverse();
            ah.cmp(&bh).then(a.prevout.index.cmp(&b.prevout.index))
        });

        self.outputs
            .sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.script.cmp(&b.script)));

        if let Some(change) = change {
            self.change_index = self.outputs.iter().position(|output| *output == change);
        }
    }

    // ---- fee subtraction ----

    /// Subtracts `fee` from the output at `index`.
    pub fn subtract_index(&mut self, index: usize, fee: i64) -> Result<(), TransactionError> {
        let output = self
            .outputs
            .get_mut(index)
            .ok_or(TransactionError::IndexOutOfRange(index))?;
        let value = output.value - fee;
        if value < 0 {
            return Err(FundingError::InvalidOption(
                "fee exceeds output value".into(),
            )
            .into());
        }
        output.value = value;
        if output.is_dust(policy::DUST_RELAY) {
            return Err(FundingError::InvalidOption(
                "fee subtraction would leave a dust output".into(),
            )
            .into());
        }
        Ok(())
    }

    /// Subtracts `fee` from the outputs named by `target`.
    pub fn subtract_fee(
        &mut self,
        fee: i64,
        target: SubtractTarget,
    ) -> Result<(), TransactionError> {
        match target {
            SubtractTarget::Index(index) => self.subtract_index(index, fee),
            SubtractTarget::All => {
                let spendable: Vec<usize> = self
                    .outputs
                    .iter()
                    .enumerate()
                    .filter(|(_, output)| !output.script.is_unspendable())
                    .map(|(index, _)| index)
                    .collect();
                if spendable.is_empty() {
                    return Err(FundingError::InvalidOption(
                        "no spendable outputs to subtract fee from".into(),
                    )
                    .into());
                }
                let share = fee / spendable.len() as i64;
                let remainder = fee - share * spendable.len() as i64;

                // The uneven split goes to the first output that can take
                // it without dipping under dust.
                let absorber = if remainder == 0 {
                    None
                } else {
                    let found = spendable.iter().copied().find(|&index| {
                        let output = &self.outputs[index];
                        output.value - (share + remainder)
                            >= output.dust_threshold(policy::DUST_RELAY)
                    });
                    if found.is_none() {
                        return Err(FundingError::InvalidOption(
                            "no output can absorb the fee remainder".into(),
                        )
                        .into());
                    }
                    found
                };

                for index in spendable {
                    let amount = if absorber == Some(index) {
                        share + remainder
                    } else {
                        share
                    };
                    self.subtract_index(index, amount)?;
                }
                Ok(())
            }
        }
    }

    // ---- funding ----

    /// Selects coins to cover the outputs plus fee, appending the selected
    /// inputs and a change output.
    ///
    /// # Arguments
    /// * `coins` - Candidate coins. Selected ones are consumed into the
    ///   transaction; the rest are dropped.
    /// * `options` - Selection strategy, fee parameters, and change script.
    ///
    /// # Returns
    /// The [`Selection`] describing the fee paid and change produced.
    pub fn fund(
        &mut self,
        coins: Vec<Coin>,
        options: FundOptions,
    ) -> Result<Selection, TransactionError> {
        if self.outputs.is_empty() {
            return Err(FundingError::InvalidOption(
                "cannot fund a transaction without outputs".into(),
            )
            .into());
        }

        let selector = CoinSelector::new(&options);
        let (chosen, mut fee) = selector.select(self, coins)?;
        let selected = chosen.len();
        for coin in chosen {
            self.add_coin(coin);
        }

        if let Some(target) = options.subtract_fee {
            self.subtract_fee(fee, target)?;
        }

        let change = self.input_value() - self.output_value() - fee;
        if change < 0 {
            return Err(FundingError::InsufficientFunds {
                available: self.input_value(),
                required: self.output_value() + fee,
            }
            .into());
        }

        let change_output = Output::new(change, options.change_script.clone());
        if change_output.is_dust(policy::DUST_RELAY) {
            // Dust change is not worth an output. Give it to the miners.
            self.change_index = None;
            fee += change;
            Ok(Selection {
                fee,
                change: 0,
                inputs: selected,
            })
        } else {
            self.outputs.push(change_output);
            self.change_index = Some(self.outputs.len() - 1);
            Ok(Selection {
                fee,
                change,
                inputs: selected,
            })
        }
    }

    // ---- size estimation ----

    /// Estimated virtual size once fully signed.
    pub fn estimate_size(
        &self,
        lookup: Option<&AccountLookup<'_>>,
    ) -> Result<usize, TransactionError> {
        self.estimate_size_with(&[], None, lookup)
    }

    /// Estimated virtual size with hypothetical extra inputs and an extra
    /// change output, used during coin selection.
    pub(crate) fn estimate_size_with(
        &self,
        extra: &[Coin],
        change: Option<&Script>,
        lookup: Option<&AccountLookup<'_>>,
    ) -> Result<usize, TransactionError> {
        let input_count = self.inputs.len() + extra.len();
        let output_count = self.outputs.len() + usize::from(change.is_some());

        let mut base = 4 + 4;
        base += VarInt::size_of(input_count);
        base += VarInt::size_of(output_count);
        for output in &self.outputs {
            base += output.serialized_size();
        }
        if let Some(script) = change {
            base += 8 + script.serialized_size();
        }

        let mut witness = 0;
        let mut add = |coin: &Coin| {
            let (script_sig, wit) = coin.estimate_spending(lookup);
            base += Outpoint::SIZE + 4 + script_sig;
            witness += wit;
        };

        for input in &self.inputs {
            let coin = self.view.get_coin_for(input).ok_or_else(|| {
                TransactionError::Signing(format!(
                    "cannot estimate input {}: coin not in view",
                    input.prevout
                ))
            })?;
            add(coin);
        }
        for coin in extra {
            add(coin);
        }

        if witness > 0 {
            // Marker and flag weigh two bytes; witness data is discounted.
            Ok(base + (witness + 2 + 3) / 4)
        } else {
            Ok(base)
        }
    }

    // ---- signature hashing ----

    /// Computes the signature hash for one input. Midstates are recomputed
    /// on every call since the builder can change between calls.
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
                None,
            ),
            _ => Err(TransactionError::Signing(format!(
                "unknown sighash version {sigversion}"
            ))),
        }
    }

    // ---- templating ----

    /// Builds the unsigned scriptSig or witness template for one input:
    /// empty slots where signatures belong, with keys and redeem scripts
    /// already in place.
    ///
    /// # Returns
    /// `true` if the ring can satisfy the coin's script.
    pub fn script_input(
        &mut self,
        index: usize,
        coin: &Coin,
        ring: &KeyRing,
    ) -> Result<bool, TransactionError> {
        if index >= self.inputs.len() {
            return Err(TransactionError::IndexOutOfRange(index));
        }
        if !self.inputs[index].script.is_empty() || !self.inputs[index].witness.is_empty() {
            return Ok(true);
        }

        let prev = &coin.script;
        let (script_items, witness_items) = match prev.kind() {
            ScriptKind::Pubkey | ScriptKind::PubkeyHash | ScriptKind::Multisig { .. } => {
                match template_vector(prev, ring) {
                    Some(items) => (Some(items), None),
                    None => return Ok(false),
                }
            }
            ScriptKind::WitnessPubkeyHash => {
                if !ring.owns_output(prev) {
                    return Ok(false);
                }
                (None, Some(vec![Vec::new(), ring.public_key().to_vec()]))
            }
            ScriptKind::WitnessScripthash => {
                let Some(redeem) = owned_witness_redeem(prev, ring) else {
                    return Ok(false);
                };
                let Some(mut items) = template_vector(&redeem, ring) else {
                    return Ok(false);
                };
                items.push(redeem.as_bytes().to_vec());
                (None, Some(items))
            }
            ScriptKind::Scripthash => {
                let Some(payload) = prev.hash160_payload() else {
                    return Ok(false);
                };
                let Some(redeem) = ring.get_redeem(&payload) else {
                    return Ok(false);
                };
                match redeem.kind() {
                    ScriptKind::WitnessPubkeyHash => (
                        Some(vec![redeem.as_bytes().to_vec()]),
                        Some(vec![Vec::new(), ring.public_key().to_vec()]),
                    ),
                    ScriptKind::WitnessScripthash => {
                        let Some(inner) = owned_witness_redeem(&redeem, ring) else {
                            return Ok(false);
                        };
                        let Some(mut items) = template_vector(&inner, ring) else {
                            return Ok(false);
                        };
                        items.push(inner.as_bytes().to_vec());
                        (Some(vec![redeem.as_bytes().to_vec()]), Some(items))
                    }
                    _ => match template_vector(&redeem, ring) {
                        Some(mut items) => {
                            items.push(redeem.as_bytes().to_vec());
                            (Some(items), None)
                        }
                        None => return Ok(false),
                    },
                }
            }
            ScriptKind::Nulldata | ScriptKind::Unknown => return Ok(false),
        };

        if let Some(items) = script_items {
            self.inputs[index].script = items_to_script(&items)?;
        }
        if let Some(items) = witness_items {
            self.inputs[index].witness = Witness::from_items(items);
        }
        Ok(true)
    }

    /// Signs one input, inserting the signature into the slot the template
    /// reserved for it.
    ///
    /// # Returns
    /// `true` if a signature was produced or already present.
    pub fn sign_input(
        &mut self,
        index: usize,
        coin: &Coin,
        ring: &KeyRing,
        sighash_type: u32,
    ) -> Result<bool, TransactionError> {
        let Some(context) = self.signing_context(index, coin)? else {
            return Ok(false);
        };

        let hash = self.signature_hash(
            index,
            &context.code,
            coin.value,
            sighash_type,
            context.sigversion,
        )?;
        let mut sig = ring.sign(&hash)?.to_der();
        sig.push(sighash_type as u8);

        let mut items = context.items;
        let signed = sign_vector(&context.code, &mut items, sig, ring)?;
        if !signed {
            return Ok(false);
        }

        if let Some(tail) = context.tail {
            items.push(tail);
        }
        match context.container {
            Container::ScriptSig => self.inputs[index].script = items_to_script(&items)?,
            Container::Witness => self.inputs[index].witness = Witness::from_items(items),
        }
        Ok(true)
    }

    /// Whether one input carries all the signatures its script needs.
    pub fn is_input_signed(&self, index: usize, coin: &Coin) -> bool {
        match self.signing_context(index, coin) {
            Ok(Some(context)) => is_vector_signed(&context.code, &context.items),
            _ => false,
        }
    }

    /// Whether every input is fully signed. Inputs whose coins are missing
    /// from the view count as unsigned.
    pub fn is_signed(&self) -> bool {
        self.inputs.iter().enumerate().all(|(index, input)| {
            self.view
                .get_coin_for(input)
                .is_some_and(|coin| self.is_input_signed(index, coin))
        })
    }

    /// Templates every input the rings can satisfy.
    ///
    /// # Returns
    /// The number of inputs templated.
    pub fn template(&mut self, rings: &[KeyRing]) -> Result<usize, TransactionError> {
        let mut total = 0;
        for index in 0..self.inputs.len() {
            let Some(coin) = self.take_coin(index) else {
                continue;
            };
            for ring in rings {
                if ring.owns_output(&coin.script) && self.script_input(index, &coin, ring)? {
                    total += 1;
                    break;
                }
            }
            self.view.add(coin);
        }
        Ok(total)
    }

    /// Templates and signs every input the rings can satisfy.
    ///
    /// # Returns
    /// The number of inputs signed.
    pub fn sign(&mut self, rings: &[KeyRing], sighash_type: u32) -> Result<usize, TransactionError> {
        let mut total = 0;
        for index in 0..self.inputs.len() {
            let Some(coin) = self.take_coin(index) else {
                continue;
            };
            let mut signed = false;
            for ring in rings {
                if !ring.owns_output(&coin.script) {
                    continue;
                }
                self.script_input(index, &coin, ring)?;
                if self.sign_input(index, &coin, ring, sighash_type)? {
                    signed = true;
                }
            }
            if signed {
                total += 1;
            }
            self.view.add(coin);
        }
        Ok(total)
    }

    /// Signs every input with a single ring using SIGHASH_ALL.
    pub fn sign_all(&mut self, ring: &KeyRing) -> Result<usize, TransactionError> {
        self.sign(std::slice::from_ref(ring), SIGHASH_ALL)
    }

    // Temporarily removes an input's coin from the view so templating can
    // mutate the input without aliasing it.
    fn take_coin(&mut self, index: usize) -> Option<Coin> {
        let prevout = self.inputs[index].prevout;
        self.view.remove(&prevout)
    }

    /// Resolves the signing context for one input: the script code, sighash
    /// version, satisfaction items, and where they live. Returns `None` when
    /// the input has no template to sign into.
    fn signing_context(
        &self,
        index: usize,
        coin: &Coin,
    ) -> Result<Option<SigningContext>, TransactionError> {
        let input = self
            .inputs
            .get(index)
            .ok_or(TransactionError::IndexOutOfRange(index))?;
        let prev = &coin.script;

        let context = match prev.kind() {
            ScriptKind::Pubkey | ScriptKind::PubkeyHash | ScriptKind::Multisig { .. } => {
                if input.script.is_empty() {
                    return Ok(None);
                }
                SigningContext {
                    code: prev.clone(),
                    sigversion: SIGVERSION_BASE,
                    container: Container::ScriptSig,
                    items: script_to_items(&input.script)?,
                    tail: None,
                }
            }
            ScriptKind::WitnessPubkeyHash => {
                let Some((_, program)) = prev.witness_program() else {
                    return Ok(None);
                };
                let mut payload = [0u8; 20];
                payload.copy_from_slice(program);
                if input.witness.is_empty() {
                    return Ok(None);
                }
                SigningContext {
                    code: Script::p2pkh(&payload),
                    sigversion: SIGVERSION_WITNESS_V0,
                    container: Container::Witness,
                    items: input.witness.items().to_vec(),
                    tail: None,
                }
            }
            ScriptKind::WitnessScripthash => {
                let Some(redeem) = input.witness.last() else {
                    return Ok(None);
                };
                let redeem = Script::from_bytes(redeem);
                let mut items = input.witness.items().to_vec();
                let tail = items.pop();
                SigningContext {
                    code: redeem,
                    sigversion: SIGVERSION_WITNESS_V0,
                    container: Container::Witness,
                    items,
                    tail,
                }
            }
            ScriptKind::Scripthash => {
                let Some(redeem_bytes) = input.script.last_push() else {
                    return Ok(None);
                };
                let redeem = Script::from_vec(redeem_bytes);
                match redeem.witness_program() {
                    Some((0, program)) if program.len() == 20 => {
                        let mut payload = [0u8; 20];
                        payload.copy_from_slice(program);
                        if input.witness.is_empty() {
                            return Ok(None);
                        }
                        SigningContext {
                            code: Script::p2pkh(&payload),
                            sigversion: SIGVERSION_WITNESS_V0,
                            container: Container::Witness,
                            items: input.witness.items().to_vec(),
                            tail: None,
                        }
                    }
                    Some((0, program)) if program.len() == 32 => {
                        let Some(inner) = input.witness.last() else {
                            return Ok(None);
                        };
                        let inner = Script::from_bytes(inner);
                        let mut items = input.witness.items().to_vec();
                        let tail = items.pop();
                        SigningContext {
                            code: inner,
                            sigversion: SIGVERSION_WITNESS_V0,
                            container: Container::Witness,
                            items,
                            tail,
                        }
                    }
                    _ => {
                        let mut items = script_to_items(&input.script)?;
                        let tail = items.pop();
                        SigningContext {
                            code: redeem,
                            sigversion: SIGVERSION_BASE,
                            container: Container::ScriptSig,
                            items,
                            tail,
                        }
                    }
                }
            }
            ScriptKind::Nulldata | ScriptKind::Unknown => return Ok(None),
        };

        Ok(Some(context))
    }
}

enum Container {
    ScriptSig,
    Witness,
}

struct SigningContext {
    code: Script,
    sigversion: u32,
    container: Container,
    items: Vec<Vec<u8>>,
    tail: Option<Vec<u8>>,
}

/// Builds the empty-slot template for a direct (non-witness-wrapped) script.
fn template_vector(code: &Script, ring: &KeyRing) -> Option<Vec<Vec<u8>>> {
    match code.kind() {
        ScriptKind::Pubkey => {
            if code.last_push().as_deref() != Some(ring.public_key()) {
                return None;
            }
            Some(vec![Vec::new()])
        }
        ScriptKind::PubkeyHash => {
            if code.hash160_payload() != Some(ring.key_hash()) {
                return None;
            }
            Some(vec![Vec::new(), ring.public_key().to_vec()])
        }
        ScriptKind::Multisig { n, .. } => {
            let keys = code.multisig_keys()?;
            if !keys.iter().any(|key| key[..] == *ring.public_key()) {
                return None;
            }
            // Dummy element plus one slot per key; compacted to m slots
            // once enough signatures are present.
            Some(vec![Vec::new(); n + 1])
        }
        _ => None,
    }
}

/// Resolves the witness redeem script for a P2WSH output the ring owns.
fn owned_witness_redeem(prev: &Script, ring: &KeyRing) -> Option<Script> {
    let (version, program) = prev.witness_program()?;
    if version != 0 || program.len() != 32 {
        return None;
    }
    let redeem = ring.redeem.clone()?;
    if redeem.sha256().as_slice() != program {
        return None;
    }
    Some(redeem)
}

/// Inserts a signature into a satisfaction vector.
fn sign_vector(
    code: &Script,
    items: &mut Vec<Vec<u8>>,
    sig: Vec<u8>,
    ring: &KeyRing,
) -> Result<bool, TransactionError> {
    match code.kind() {
        ScriptKind::Pubkey => {
            if items.len() != 1 {
                return Err(TransactionError::Signing("bad p2pk template".into()));
            }
            items[0] = sig;
            Ok(true)
        }
        ScriptKind::PubkeyHash => {
            if items.len() != 2 {
                return Err(TransactionError::Signing("bad p2pkh template".into()));
            }
            items[0] = sig;
            items[1] = ring.public_key().to_vec();
            Ok(true)
        }
        ScriptKind::Multisig { m, n } => {
            let keys = code
                .multisig_keys()
                .ok_or_else(|| TransactionError::Signing("bad multisig script".into()))?;
            let Some(pos) = keys.iter().position(|key| key[..] == *ring.public_key()) else {
                return Ok(false);
            };

            if items.len() == m + 1 && items[1..].iter().all(|item| !item.is_empty()) {
                // Already compacted and fully signed.
                return Ok(true);
            }
            if items.len() != n + 1 {
                return Err(TransactionError::Signing("bad multisig template".into()));
            }

            items[1 + pos] = sig;

            let filled = items[1..].iter().filter(|item| !item.is_empty()).count();
            if filled >= m {
                // Keep the dummy and the first m signatures, in key order.
                let sigs: Vec<Vec<u8>> = items[1..]
                    .iter()
                    .filter(|item| !item.is_empty())
                    .take(m)
                    .cloned()
                    .collect();
                items.truncate(1);
                items.extend(sigs);
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Whether a satisfaction vector carries every signature it needs.
fn is_vector_signed(code: &Script, items: &[Vec<u8>]) -> bool {
    match code.kind() {
        ScriptKind::Pubkey => items.len() == 1 && !items[0].is_empty(),
        ScriptKind::PubkeyHash => items.len() == 2 && !items[0].is_empty() && !items[1].is_empty(),
        ScriptKind::Multisig { m, .. } => {
            items.len() == m + 1 && items[1..].iter().all(|item| !item.is_empty())
        }
        _ => false,
    }
}

/// Renders satisfaction items as a push-only scriptSig.
fn items_to_script(items: &[Vec<u8>]) -> Result<Script, TransactionError> {
    let mut script = Script::default();
    for item in items {
        script
            .append_push_data(item)
            .map_err(TransactionError::Script)?;
    }
    Ok(script)
}

/// Extracts the pushed items of a push-only scriptSig.
fn script_to_items(script: &Script) -> Result<Vec<Vec<u8>>, TransactionError> {
    let mut items = Vec::new();
    for chunk in script.chunks().map_err(TransactionError::Script)? {
        match chunk.data {
            Some(data) => items.push(data),
            None if chunk.op == btx_script::opcodes::OP_0 => items.push(Vec::new()),
            None => {
                return Err(TransactionError::Signing(
                    "scriptSig is not push-only".into(),
                ))
            }
        }
    }
    Ok(items)
}
