//! Consensus constants.
//!
//! Fixed protocol parameters shared by the transaction and worker crates.
//! Values match the Bitcoin reference implementation.

/// One coin in satoshis.
pub const COIN: i64 = 100_000_000;

/// Maximum amount of money in satoshis (21 million coins).
pub const MAX_MONEY: i64 = 21_000_000 * COIN;

/// Number of confirmations before a coinbase output may be spent.
pub const COINBASE_MATURITY: u32 = 100;

/// Maximum serialized block size in bytes (excluding witness data).
pub const MAX_BLOCK_SIZE: usize = 1_000_000;

/// Maximum block weight (BIP141).
pub const MAX_BLOCK_WEIGHT: usize = 4_000_000;

/// Witness scale factor: weight = base * 3 + total.
pub const WITNESS_SCALE_FACTOR: usize = 4;

/// Locktime values below this threshold are block heights; values at or
/// above it are Unix timestamps.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Sequence number marking an input as final.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// Highest sequence value that still signals replace-by-fee (BIP125).
pub const SEQUENCE_RBF_THRESHOLD: u32 = 0xffff_fffe;

/// BIP68: sequence bit disabling relative lock-time for an input.
pub const SEQUENCE_DISABLE_FLAG: u32 = 1 << 31;

/// BIP68: sequence bit selecting time-based (512s granularity) relative
/// lock-time instead of height-based.
pub const SEQUENCE_TYPE_FLAG: u32 = 1 << 22;

/// BIP68: mask extracting the relative lock-time value from a sequence.
pub const SEQUENCE_MASK: u32 = 0x0000_ffff;

/// BIP68: shift converting seconds to 512-second granularity.
pub const SEQUENCE_GRANULARITY: u32 = 9;

/// Check that a satoshi amount is within the valid money range.
///
/// # Arguments
/// * `value` - The amount to check.
///
/// # Returns
/// `true` if `0 <= value <= MAX_MONEY`.
pub fn money_range(value: i64) -> bool {
    (0..=MAX_MONEY).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_range() {
        assert!(money_range(0));
        assert!(money_range(MAX_MONEY));
        assert!(!money_range(-1));
        assert!(!money_range(MAX_MONEY + 1));
    }
}
