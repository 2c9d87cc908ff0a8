//! Transaction handling for the btx SDK.
//!
//! The crate is split along the mutable/immutable seam: [`Transaction`] is
//! a frozen value object with cached hashes, sizes, and sighash midstates,
//! while [`MutableTransaction`] is the builder that templates, signs, funds,
//! and sorts before committing to a `Transaction`. Coin selection lives in
//! [`CoinSelector`], driven by [`FundOptions`]. Script verification is a
//! trait seam ([`ScriptVerifier`]) with a template-driven implementation
//! ([`StandardVerifier`]) covering the standard script shapes.

pub mod policy;
pub mod sighash;
pub mod verify;

mod coin;
mod error;
mod input;
mod mtx;
mod outpoint;
mod output;
mod ring;
mod selector;
mod transaction;
mod view;

pub use coin::{AccountLookup, Coin, MultisigAccount};
pub use error::{FundingError, TransactionError};
pub use input::Input;
pub use mtx::{MutableTransaction, SubtractTarget};
pub use outpoint::Outpoint;
pub use output::Output;
pub use ring::KeyRing;
pub use selector::{CoinSelector, FundOptions, Selection, SelectionType};
pub use transaction::{Sizes, Transaction};
pub use verify::{ScriptVerifier, StandardVerifier};
pub use view::CoinView;

#[cfg(test)]
mod tests;
