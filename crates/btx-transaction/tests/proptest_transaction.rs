//! Property tests for transaction serialization and arithmetic.

use btx_script::Script;
use btx_transaction::{Input, Outpoint, Output, Transaction};
use proptest::prelude::*;

fn arb_outpoint() -> impl Strategy<Value = Outpoint> {
    (any::<[u8; 32]>(), 0u32..1000).prop_map(|(hash, index)| Outpoint::new(hash, index))
}

fn arb_input() -> impl Strategy<Value = Input> {
    (
        arb_outpoint(),
        proptest::collection::vec(any::<u8>(), 0..64),
        any::<u32>(),
        proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..4),
    )
        .prop_map(|(prevout, script, sequence, witness)| {
            let mut input = Input::from_outpoint(prevout);
            input.script = Script::from_vec(script);
            input.sequence = sequence;
            for item in witness {
                input.witness.push(item);
            }
            input
        })
}

fn arb_output() -> impl Strategy<Value = Output> {
    (0i64..21_000_000 * 100_000_000, proptest::collection::vec(any::<u8>(), 0..64))
        .prop_map(|(value, script)| Output::new(value, Script::from_vec(script)))
}

fn arb_tx() -> impl Strategy<Value = Transaction> {
    (
        1u32..=2,
        proptest::collection::vec(arb_input(), 1..8),
        proptest::collection::vec(arb_output(), 1..8),
        any::<u32>(),
    )
        .prop_map(|(version, inputs, outputs, locktime)| {
            Transaction::new(version, inputs, outputs, locktime)
        })
}

proptest! {
    #[test]
    fn serialization_roundtrip(tx in arb_tx()) {
        let bytes = tx.to_bytes();
        prop_assert_eq!(bytes.len(), tx.sizes().total);

        // Witness detection can misfire only for empty-input transactions,
        // which arb_tx never produces.
        let back = Transaction::from_bytes(&bytes).unwrap();
        prop_assert_eq!(&back, &tx);
        prop_assert_eq!(back.hash(), tx.hash());
        prop_assert_eq!(back.witness_hash(), tx.witness_hash());
    }

    #[test]
    fn weight_is_consistent(tx in arb_tx()) {
        let sizes = tx.sizes();
        prop_assert!(sizes.base <= sizes.total);
        prop_assert_eq!(tx.weight(), sizes.base * 3 + sizes.total);
        prop_assert_eq!(tx.vsize(), (tx.weight() + 3) / 4);
        prop_assert!(tx.vsize() <= sizes.total);
    }

    #[test]
    fn txid_stable_under_witness(tx in arb_tx()) {
        // The txid never commits to witness data.
        let (version, mut inputs, outputs, locktime) = tx.clone().into_parts();
        for input in &mut inputs {
            input.witness = Default::default();
        }
        let stripped = Transaction::new(version, inputs, outputs, locktime);
        prop_assert_eq!(stripped.txid(), tx.txid());
    }

    #[test]
    fn truncated_bytes_never_panic(tx in arb_tx(), cut in 1usize..32) {
        let bytes = tx.to_bytes();
        let len = bytes.len().saturating_sub(cut);
        // Must error, never panic.
        prop_assert!(Transaction::from_bytes(&bytes[..len]).is_err());
    }
}
