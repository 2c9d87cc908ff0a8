use btx_primitives::consensus::COINBASE_MATURITY;
use btx_primitives::util::{TxReader, TxWriter};
use btx_script::{Script, ScriptKind};
use serde::{Deserialize, Serialize};

use crate::error::TransactionError;
use crate::outpoint::Outpoint;
use crate::transaction::Transaction;

/// Shape of a multisig account backing a script-hash output, used to
/// estimate spending sizes during coin selection.
#[derive(Clone, Copy, Debug)]
pub struct MultisigAccount {
    /// Required signatures.
    pub m: usize,
    /// Total keys.
    pub n: usize,
    /// Whether the nested script is a witness program.
    pub witness: bool,
}

/// Callback resolving a script-hash locking script to the account that can
/// spend it. Returns `None` when the script is not ours or unknown.
pub type AccountLookup<'a> = dyn Fn(&Script) -> Option<MultisigAccount> + 'a;

/// An unspent transaction output together with its chain context.
///
/// Deliberately not `Clone`: a coin represents the one spendable instance of
/// an output, and handing it to a transaction consumes it.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Version of the funding transaction.
    pub version: u32,
    /// Block height, or -1 if unconfirmed.
    pub height: i32,
    /// Value in satoshis.
    pub value: i64,
    /// Locking script.
    pub script: Script,
    /// Whether the funding transaction was a coinbase.
    pub coinbase: bool,
    /// Funding transaction hash in internal byte order.
    pub hash: [u8; 32],
    /// Output index within the funding transaction.
    pub index: u32,
}

impl Coin {
    /// Builds a coin from an output of a transaction.
    ///
    /// # Arguments
    /// * `tx` - The funding transaction.
    /// * `index` - Output index to lift into a coin.
    /// * `height` - Block height of the funding transaction, or -1.
    pub fn from_tx(tx: &Transaction, index: usize, height: i32) -> Result<Self, TransactionError> {
        let output = tx
            .outputs()
            .get(index)
            .ok_or(TransactionError::IndexOutOfRange(index))?;
        Ok(Coin {
            version: tx.version(),
            height,
            value: output.value,
            script: output.script.clone(),
            coinbase: tx.is_coinbase(),
            hash: tx.hash(),
            index: index as u32,
        })
    }

    /// The outpoint this coin sits at.
    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.hash, self.index)
    }

    /// Number of confirmations at the given tip height. Unconfirmed coins
    /// have depth 0.
    pub fn depth(&self, tip: u32) -> u32 {
        if self.height < 0 {
            return 0;
        }
        let height = self.height as u32;
        if height > tip {
            return 0;
        }
        tip - height + 1
    }

    /// Whether a coinbase coin has matured at the given spend height.
    pub fn is_mature(&self, spend_height: u32) -> bool {
        if !self.coinbase {
            return true;
        }
        if self.height < 0 {
            return false;
        }
        spend_height.saturating_sub(self.height as u32) >= COINBASE_MATURITY
    }

    /// Estimates the size of spending this coin, as
    /// `(script_sig_bytes, witness_bytes)`. The scriptSig figure includes
    /// its length varint; the witness figure includes the item count and
    /// item length prefixes.
    ///
    /// Script-hash coins consult `lookup` for the nested account shape and
    /// fall back to a conservative legacy P2PKH-sized guess when it is
    /// unavailable.
    pub fn estimate_spending(&self, lookup: Option<&AccountLookup<'_>>) -> (usize, usize) {
        // Worst-case element sizes including their push or length prefix:
        // 74 for a DER signature plus sighash byte, 34 for a compressed key.
        const SIG: usize = 74;
        const KEY: usize = 34;

        match self.script.kind() {
            ScriptKind::Pubkey => (1 + SIG, 0),
            ScriptKind::PubkeyHash => (1 + SIG + KEY, 0),
            ScriptKind::Multisig { m, .. } => {
                let script = 1 + m * SIG;
                (varint_size(script) + script, 0)
            }
            ScriptKind::WitnessPubkeyHash => (1, 1 + SIG + KEY),
            ScriptKind::WitnessScripthash => match lookup.and_then(|f| f(&self.script)) {
                Some(account) => {
                    let redeem = 3 + KEY * account.n;
                    (1, 1 + 1 + account.m * SIG + varint_size(redeem) + redeem)
                }
                None => (1, 1 + SIG + KEY),
            },
            ScriptKind::Scripthash => match lookup.and_then(|f| f(&self.script)) {
                Some(account) if account.witness => {
                    // Nested P2WSH: scriptSig pushes the 34-byte program.
                    let redeem = 3 + KEY * account.n;
                    let witness = 1 + 1 + account.m * SIG + varint_size(redeem) + redeem;
                    (1 + 1 + 34, witness)
                }
                Some(account) => {
                    let redeem = 3 + KEY * account.n;
                    let script = 1 + account.m * SIG + 2 + redeem;
                    (varint_size(script) + script, 0)
                }
                None => (1 + SIG + KEY, 0),
            },
            ScriptKind::Nulldata | ScriptKind::Unknown => (1 + SIG + KEY, 0),
        }
    }

    /// Writes the coin fields for the worker wire format. The outpoint is
    /// carried by the surrounding input and is not repeated here.
    pub fn write_to(&self, writer: &mut TxWriter) {
        writer.write_u32_le(self.version);
        let height = if self.height < 0 {
            u32::MAX
        } else {
            self.height as u32
        };
        writer.write_u32_le(height);
        writer.write_i64_le(self.value);
        writer.write_var_bytes(self.script.as_bytes());
        writer.write_u8(self.coinbase as u8);
    }

    /// Reads the coin fields written by [`Coin::write_to`], attaching the
    /// given outpoint.
    pub fn read_from(reader: &mut TxReader<'_>, prevout: Outpoint) -> Result<Self, TransactionError> {
        let err = |e: btx_primitives::PrimitivesError| TransactionError::Serialization(e.to_string());
        let version = reader.read_u32_le().map_err(err)?;
        let raw_height = reader.read_u32_le().map_err(err)?;
        let height = if raw_height == u32::MAX {
            -1
        } else {
            raw_height as i32
        };
        let value = reader.read_i64_le().map_err(err)?;
        let script = Script::from_bytes(reader.read_var_bytes().map_err(err)?);
        let coinbase = reader.read_u8().map_err(err)? != 0;
        Ok(Coin {
            version,
            height,
            value,
            script,
            coinbase,
            hash: prevout.hash,
            index: prevout.index,
        })
    }
}

fn varint_size(n: usize) -> usize {
    btx_primitives::util::VarInt::size_of(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(script: Script) -> Coin {
        Coin {
            version: 1,
            height: 100,
            value: 50_000,
            script,
            coinbase: false,
            hash: [9u8; 32],
            index: 0,
        }
    }

    #[test]
    fn depth_and_maturity() {
        let mut c = coin(Script::p2pkh(&[0u8; 20]));
        assert_eq!(c.depth(100), 1);
        assert_eq!(c.depth(150), 51);
        assert_eq!(c.depth(99), 0);

        c.height = -1;
        assert_eq!(c.depth(1000), 0);

        c.coinbase = true;
        assert!(!c.is_mature(10_000));
        c.height = 100;
        assert!(!c.is_mature(150));
        assert!(c.is_mature(200));
    }

    #[test]
    fn spending_estimates() {
        let (sig, wit) = coin(Script::p2pkh(&[0u8; 20])).estimate_spending(None);
        assert_eq!((sig, wit), (109, 0));

        let (sig, wit) = coin(Script::p2wpkh(&[0u8; 20])).estimate_spending(None);
        assert_eq!((sig, wit), (1, 109));

        let lookup = |_: &Script| {
            Some(MultisigAccount {
                m: 2,
                n: 3,
                witness: false,
            })
        };
        let (sig, wit) = coin(Script::p2sh(&[0u8; 20])).estimate_spending(Some(&lookup));
        assert_eq!(wit, 0);
        // OP_0 + two signatures + pushdata of a 2-of-3 redeem script.
        assert_eq!(sig, 3 + 1 + 2 * 74 + 2 + 105);
    }

    #[test]
    fn wire_roundtrip() {
        let c = coin(Script::p2wpkh(&[7u8; 20]));
        let mut writer = TxWriter::new();
        c.write_to(&mut writer);
        let bytes = writer.into_bytes();

        let mut reader = TxReader::new(&bytes);
        let back = Coin::read_from(&mut reader, c.outpoint()).unwrap();
        assert_eq!(back, c);

        let mut unconfirmed = coin(Script::p2pkh(&[1u8; 20]));
        unconfirmed.height = -1;
        let mut writer = TxWriter::new();
        unconfirmed.write_to(&mut writer);
        let mut reader = TxReader::new(writer.as_bytes());
        let back = Coin::read_from(&mut reader, unconfirmed.outpoint()).unwrap();
        assert_eq!(back.height, -1);
    }
}
