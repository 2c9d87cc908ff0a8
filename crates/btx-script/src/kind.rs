//! One-shot script classification.

/// The shape of an output script, determined once and then matched on for
/// templating, signing, sighash-version selection, and standardness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// `<pubkey> OP_CHECKSIG`
    Pubkey,
    /// `OP_DUP OP_HASH160 <20-byte hash> OP_EQUALVERIFY OP_CHECKSIG`
    PubkeyHash,
    /// `OP_HASH160 <20-byte hash> OP_EQUAL` (BIP16)
    Scripthash,
    /// `OP_0 <20-byte program>` (BIP141)
    WitnessPubkeyHash,
    /// `OP_0 <32-byte program>` (BIP141)
    WitnessScripthash,
    /// `OP_m <pubkey>... OP_n OP_CHECKMULTISIG`
    Multisig {
        /// Required signature count.
        m: usize,
        /// Total public key count.
        n: usize,
    },
    /// `OP_RETURN <data>...` data carrier.
    Nulldata,
    /// Anything else.
    Unknown,
}

impl ScriptKind {
    /// Whether this kind is accepted by standardness policy.
    pub fn is_standard(&self) -> bool {
        !matches!(self, ScriptKind::Unknown)
    }

    /// Whether this kind is a segwit program spent via a witness stack.
    pub fn is_witness_program(&self) -> bool {
        matches!(
            self,
            ScriptKind::WitnessPubkeyHash | ScriptKind::WitnessScripthash
        )
    }
}
