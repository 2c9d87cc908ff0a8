//! Script handling for the btx SDK.
//!
//! Provides the `Script` byte-vector type with chunk-level parsing, the
//! `ScriptKind` classification used for templating and signing dispatch,
//! and the `Witness` stack carried by segwit inputs.
//!
//! Opcode *execution* is deliberately out of scope: a full interpreter is
//! an external collaborator consumed through the verifier seam in the
//! transaction crate.

pub mod opcodes;

mod error;
mod kind;
mod script;
mod witness;

pub use error::ScriptError;
pub use kind::ScriptKind;
pub use script::Script;
pub use witness::Witness;
