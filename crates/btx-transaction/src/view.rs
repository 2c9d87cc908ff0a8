use std::collections::HashMap;

use btx_primitives::util::{TxReader, TxWriter};
use btx_script::Script;

use crate::coin::Coin;
use crate::error::TransactionError;
use crate::input::Input;
use crate::outpoint::Outpoint;
use crate::transaction::Transaction;

/// An in-memory map of outpoints to coins.
///
/// Serves as the UTXO context when checking or signing a transaction: every
/// input is resolved against the view to find the output it spends.
#[derive(Debug, Default)]
pub struct CoinView {
    map: HashMap<Outpoint, Coin>,
}

impl CoinView {
    /// Creates an empty view.
    pub fn new() -> Self {
        CoinView::default()
    }

    /// Adds a coin, keyed by its outpoint. Replaces any previous entry.
    pub fn add(&mut self, coin: Coin) {
        self.map.insert(coin.outpoint(), coin);
    }

    /// Lifts every output of `tx` into the view at the given height.
    pub fn add_tx(&mut self, tx: &Transaction, height: i32) -> Result<(), TransactionError> {
        for index in 0..tx.outputs().len() {
            self.add(Coin::from_tx(tx, index, height)?);
        }
        Ok(())
    }

    /// Looks up a coin by outpoint.
    pub fn get(&self, prevout: &Outpoint) -> Option<&Coin> {
        self.map.get(prevout)
    }

    /// Looks up the coin an input spends.
    pub fn get_coin_for(&self, input: &Input) -> Option<&Coin> {
        self.get(&input.prevout)
    }

    /// Looks up the locking script an input spends.
    pub fn get_output_for(&self, input: &Input) -> Option<&Script> {
        self.get_coin_for(input).map(|coin| &coin.script)
    }

    /// Removes and returns a coin.
    pub fn remove(&mut self, prevout: &Outpoint) -> Option<Coin> {
        self.map.remove(prevout)
    }

    /// Whether the view holds a coin at `prevout`.
    pub fn contains(&self, prevout: &Outpoint) -> bool {
        self.map.contains_key(prevout)
    }

    /// Number of coins in the view.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Writes the view entries relevant to `inputs` for the worker wire
    /// format: one presence byte per input, followed by the coin fields
    /// when present.
    pub fn write_for(&self, writer: &mut TxWriter, inputs: &[Input]) {
        for input in inputs {
            match self.get(&input.prevout) {
                Some(coin) => {
                    writer.write_u8(1);
                    coin.write_to(writer);
                }
                None => writer.write_u8(0),
            }
        }
    }

    /// Reads a view written by [`CoinView::write_for`] against the same
    /// input list.
    pub fn read_for(reader: &mut TxReader<'_>, inputs: &[Input]) -> Result<Self, TransactionError> {
        let mut view = CoinView::new();
        for input in inputs {
            let present = reader
                .read_u8()
                .map_err(|e| TransactionError::Serialization(e.to_string()))?;
            if present != 0 {
                view.add(Coin::read_from(reader, input.prevout)?);
            }
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(index: u32, value: i64) -> Coin {
        Coin {
            version: 1,
            height: 5,
            value,
            script: Script::p2pkh(&[index as u8; 20]),
            coinbase: false,
            hash: [0x11; 32],
            index,
        }
    }

    #[test]
    fn add_and_lookup() {
        let mut view = CoinView::new();
        view.add(coin(0, 1000));
        view.add(coin(1, 2000));

        let input = Input::from_outpoint(Outpoint::new([0x11; 32], 1));
        assert_eq!(view.get_coin_for(&input).unwrap().value, 2000);
        assert!(view.get_output_for(&input).is_some());
        assert!(view.remove(&input.prevout).is_some());
        assert!(view.get_coin_for(&input).is_none());
    }

    #[test]
    fn wire_roundtrip_with_missing_entry() {
        let mut view = CoinView::new();
        view.add(coin(0, 1000));

        let inputs = vec![
            Input::from_outpoint(Outpoint::new([0x11; 32], 0)),
            Input::from_outpoint(Outpoint::new([0x22; 32], 0)),
        ];

        let mut writer = TxWriter::new();
        view.write_for(&mut writer, &inputs);
        let bytes = writer.into_bytes();

        let mut reader = TxReader::new(&bytes);
        let back = CoinView::read_for(&mut reader, &inputs).unwrap();
        assert_eq!(back.len(), 1);
        assert!(back.contains(&inputs[0].prevout));
        assert!(!back.contains(&inputs[1].prevout));
    }
}
