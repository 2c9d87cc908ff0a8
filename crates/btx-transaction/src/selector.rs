use btx_script::Script;
use rand::seq::SliceRandom;

use crate::coin::{Coin, MultisigAccount};
use crate::error::{FundingError, TransactionError};
use crate::mtx::{MutableTransaction, SubtractTarget};
use crate::outpoint::Outpoint;
use crate::policy;

/// Coin selection strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionType {
    /// Largest confirmed values first.
    #[default]
    Value,
    /// Oldest coins first.
    Age,
    /// Uniformly random order.
    Random,
    /// Consume every eligible coin.
    All,
}

/// Options controlling [`MutableTransaction::fund`].
pub struct FundOptions {
    /// Script the change output pays to.
    pub change_script: Script,
    /// Selection strategy.
    pub selection: SelectionType,
    /// Fee rate in satoshis per 1000 virtual bytes.
    pub rate: i64,
    /// Ceiling on the estimated fee.
    pub max_fee: i64,
    /// Fixed fee, skipping size estimation entirely.
    pub hard_fee: Option<i64>,
    /// Take the fee out of the outputs instead of adding it on top.
    pub subtract_fee: Option<SubtractTarget>,
    /// Round the fee up to the next whole kilobyte.
    pub round: bool,
    /// Current tip height, enabling maturity and depth checks.
    pub height: Option<u32>,
    /// Minimum confirmations for an eligible coin.
    pub depth: Option<u32>,
    /// Outpoints that must be spent, ahead of any strategy.
    pub inputs: Vec<Outpoint>,
    /// Resolver for the account shape behind script-hash coins, used for
    /// size estimation.
    #[allow(clippy::type_complexity)]
    pub account: Option<Box<dyn Fn(&Script) -> Option<MultisigAccount>>>,
}

impl FundOptions {
    /// Default options paying change to `change_script`.
    pub fn new(change_script: Script) -> Self {
        FundOptions {
            change_script,
            selection: SelectionType::Value,
            rate: policy::MIN_RELAY,
            max_fee: policy::MAX_FEE,
            hard_fee: None,
            subtract_fee: None,
            round: false,
            height: None,
            depth: None,
            inputs: Vec::new(),
            account: None,
        }
    }

    /// Sets the fee rate.
    pub fn rate(mut self, rate: i64) -> Self {
        self.rate = rate;
        self
    }

    /// Sets the selection strategy.
    pub fn selection(mut self, selection: SelectionType) -> Self {
        self.selection = selection;
        self
    }
}

impl std::fmt::Debug for FundOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundOptions")
            .field("change_script", &self.change_script)
            .field("selection", &self.selection)
            .field("rate", &self.rate)
            .field("max_fee", &self.max_fee)
            .field("hard_fee", &self.hard_fee)
            .field("round", &self.round)
            .field("height", &self.height)
            .field("depth", &self.depth)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// Result of funding a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Selection {
    /// Fee paid, in satoshis.
    pub fee: i64,
    /// Change returned, in satoshis. Zero when the change was dust and was
    /// folded into the fee.
    pub change: i64,
    /// Number of coins selected.
    pub inputs: usize,
}

/// Chooses coins to cover a transaction's outputs plus fee.
///
/// Selection never mutates the transaction: it reads the current outputs
/// and inputs, picks coins, and hands them back for the caller to attach.
pub struct CoinSelector<'a> {
    options: &'a FundOptions,
}

impl<'a> CoinSelector<'a> {
    /// Creates a selector over the given options.
    pub fn new(options: &'a FundOptions) -> Self {
        CoinSelector { options }
    }

    /// Selects coins for `mtx` out of `coins`.
    ///
    /// # Returns
    /// The chosen coins and the fee they were chosen against.
    pub fn select(
        &self,
        mtx: &MutableTransaction,
        coins: Vec<Coin>,
    ) -> Result<(Vec<Coin>, i64), TransactionError> {
        let (preferred, queue) = self.prepare(mtx, coins)?;

        let out_value = mtx.output_value();
        let existing = mtx.input_value();
        let available: i64 = existing
            + preferred.iter().map(|coin| coin.value).sum::<i64>()
            + queue.iter().map(|coin| coin.value).sum::<i64>();

        // Required inputs are consumed unconditionally.
        let mut chosen = preferred;
        let mut total = existing + chosen.iter().map(|coin| coin.value).sum::<i64>();
        let mut queue = queue.into_iter();

        let lookup = self.options.account.as_deref();
        let consume_all = self.options.selection == SelectionType::All;

        let mut fund = |chosen: &mut Vec<Coin>, total: &mut i64, needed: i64| {
            while (consume_all || *total < needed) && queue.len() > 0 {
                let Some(coin) = queue.next() else { break };
                *total += coin.value;
                chosen.push(coin);
            }
        };

        if let Some(hard_fee) = self.options.hard_fee {
            if hard_fee > self.options.max_fee {
                return Err(FundingError::FeeTooHigh {
                    fee: hard_fee,
                    max: self.options.max_fee,
                }
                .into());
            }
            let needed = self.needed(out_value, hard_fee);
            fund(&mut chosen, &mut total, needed);
            if total < needed {
                return Err(FundingError::InsufficientFunds {
                    available,
                    required: needed,
                }
                .into());
            }
            return Ok((chosen, hard_fee));
        }

        // Iterative estimation: fund at an assumed fee, re-estimate the
        // signed size with the chosen coins, and repeat until the fee is
        // stable. The chosen set only grows, so this terminates.
        let mut fee = policy::MIN_FEE;
        loop {
            let needed = self.needed(out_value, fee);
            fund(&mut chosen, &mut total, needed);
            if total < needed {
                return Err(FundingError::InsufficientFunds {
                    available,
                    required: needed,
                }
                .into());
            }

            let size =
                mtx.estimate_size_with(&chosen, Some(&self.options.change_script), lookup)?;
            let next = policy::get_fee(size, self.options.rate, self.options.round);
            if next > self.options.max_fee {
                return Err(FundingError::FeeTooHigh {
                    fee: next,
                    max: self.options.max_fee,
                }
                .into());
            }
            if next == fee {
                return Ok((chosen, fee));
            }
            fee = next;
        }
    }

    /// Output value plus fee, unless the fee comes out of the outputs.
    fn needed(&self, out_value: i64, fee: i64) -> i64 {
        if self.options.subtract_fee.is_some() {
            out_value
        } else {
            out_value + fee
        }
    }

    /// Splits required inputs out of the coin set, filters the rest for
    /// eligibility, and orders them by strategy.
    fn prepare(
        &self,
        mtx: &MutableTransaction,
        mut coins: Vec<Coin>,
    ) -> Result<(Vec<Coin>, Vec<Coin>), TransactionError> {
        let mut preferred = Vec::with_capacity(self.options.inputs.len());
        for outpoint in &self.options.inputs {
            let pos = coins
                .iter()
                .position(|coin| coin.outpoint() == *outpoint)
                .ok_or_else(|| FundingError::UnresolvedInput(outpoint.to_string()))?;
            preferred.push(coins.remove(pos));
        }

        coins.retain(|coin| self.is_eligible(mtx, coin));
        match self.options.selection {
            SelectionType::Value => {
                // Confirmed coins first, largest values first.
                coins.sort_by(|a, b| {
                    let a_unconfirmed = a.height < 0;
                    let b_unconfirmed = b.height < 0;
                    a_unconfirmed
                        .cmp(&b_unconfirmed)
                        .then(b.value.cmp(&a.value))
                });
            }
            SelectionType::Age => {
                // Oldest first; unconfirmed last.
                coins.sort_by_key(|coin| {
                    if coin.height < 0 {
                        u32::MAX
                    } else {
                        coin.height as u32
                    }
                });
            }
            SelectionType::Random => {
                coins.shuffle(&mut rand::thread_rng());
            }
            SelectionType::All => {}
        }

        Ok((preferred, coins))
    }

    fn is_eligible(&self, mtx: &MutableTransaction, coin: &Coin) -> bool {
        let outpoint = coin.outpoint();
        if mtx.view.contains(&outpoint) {
            return false;
        }
        if mtx.inputs.iter().any(|input| input.prevout == outpoint) {
            return false;
        }
        if coin.script.is_unspendable() {
            return false;
        }
        if let Some(height) = self.options.height {
            // Spending happens in the next block.
            if coin.coinbase && !coin.is_mature(height + 1) {
                return false;
            }
            if let Some(depth) = self.options.depth {
                if coin.depth(height) < depth {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(tag: u8, value: i64, height: i32) -> Coin {
        Coin {
            version: 1,
            height,
            value,
            script: Script::p2pkh(&[tag; 20]),
            coinbase: false,
            hash: [tag; 32],
            index: 0,
        }
    }

    fn mtx_paying(value: i64) -> MutableTransaction {
        let mut mtx = MutableTransaction::new();
        mtx.add_output(Script::p2pkh(&[0xaa; 20]), value);
        mtx
    }

    fn options() -> FundOptions {
        FundOptions::new(Script::p2pkh(&[0xbb; 20])).rate(10_000)
    }

    #[test]
    fn value_strategy_prefers_large_confirmed() {
        let mtx = mtx_paying(50_000);
        let opts = options();
        let selector = CoinSelector::new(&opts);

        let coins = vec![
            coin(1, 10_000, -1),
            coin(2, 100_000, 5),
            coin(3, 40_000, 5),
        ];
        let (chosen, fee) = selector.select(&mtx, coins).unwrap();
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].value, 100_000);
        // One P2PKH input, one output, one change output: well under a
        // kilobyte, so the fee lands below the starting assumption.
        assert!(fee > 0 && fee < policy::MIN_FEE);
    }

    #[test]
    fn age_strategy_prefers_old() {
        let mtx = mtx_paying(1_000);
        let mut opts = options();
        opts.selection = SelectionType::Age;
        opts.hard_fee = Some(1_000);
        let selector = CoinSelector::new(&opts);

        let coins = vec![coin(1, 50_000, 90), coin(2, 50_000, 10), coin(3, 50_000, -1)];
        let (chosen, _) = selector.select(&mtx, coins).unwrap();
        assert_eq!(chosen[0].height, 10);
    }

    #[test]
    fn all_strategy_consumes_everything() {
        let mtx = mtx_paying(1_000);
        let mut opts = options();
        opts.selection = SelectionType::All;
        opts.hard_fee = Some(1_000);
        let selector = CoinSelector::new(&opts);

        let coins = vec![coin(1, 50_000, 1), coin(2, 50_000, 2)];
        let (chosen, _) = selector.select(&mtx, coins).unwrap();
        assert_eq!(chosen.len(), 2);
    }

    #[test]
    fn insufficient_funds_reports_amounts() {
        let mtx = mtx_paying(100_000);
        let mut opts = options();
        opts.hard_fee = Some(1_000);
        let selector = CoinSelector::new(&opts);

        let err = selector.select(&mtx, vec![coin(1, 30_000, 1)]).unwrap_err();
        match err {
            TransactionError::Funding(FundingError::InsufficientFunds {
                available,
                required,
            }) => {
                assert_eq!(available, 30_000);
                assert_eq!(required, 101_000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn preferred_inputs_must_resolve() {
        let mtx = mtx_paying(1_000);
        let mut opts = options();
        opts.inputs = vec![Outpoint::new([0xde; 32], 3)];
        let selector = CoinSelector::new(&opts);

        let err = selector.select(&mtx, vec![coin(1, 50_000, 1)]).unwrap_err();
        assert!(matches!(
            err,
            TransactionError::Funding(FundingError::UnresolvedInput(_))
        ));
    }

    #[test]
    fn immature_coinbase_excluded() {
        let mtx = mtx_paying(10_000);
        let mut opts = options();
        opts.height = Some(150);
        opts.hard_fee = Some(1_000);
        let selector = CoinSelector::new(&opts);

        let mut cb = coin(1, 50_000, 100);
        cb.coinbase = true;
        // 51 < 100 confirmations: not mature, selection fails.
        assert!(selector.select(&mtx, vec![cb]).is_err());

        let mut cb = coin(1, 50_000, 40);
        cb.coinbase = true;
        // 111 confirmations at the spend height: mature.
        let (chosen, _) = selector.select(&mtx, vec![cb]).unwrap();
        assert_eq!(chosen.len(), 1);
    }

    #[test]
    fn already_spent_coins_excluded() {
        let mut mtx = mtx_paying(10_000);
        let spent = coin(1, 50_000, 1);
        let outpoint = spent.outpoint();
        mtx.view.add(spent);
        mtx.add_outpoint(outpoint);

        let mut opts = options();
        opts.hard_fee = Some(1_000);
        let selector = CoinSelector::new(&opts);

        // The same outpoint offered again must not be double-selected.
        let dup = coin(1, 50_000, 1);
        let other = coin(2, 50_000, 1);
        let (chosen, _) = selector.select(&mtx, vec![dup, other]).unwrap();
        assert_eq!(chosen.len(), 0, "existing input already covers the outputs");
    }
}
