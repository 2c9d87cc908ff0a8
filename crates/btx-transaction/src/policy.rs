//! Relay policy parameters.
//!
//! These are local node policy, not consensus: a transaction violating them
//! is still valid in a block but will not be relayed by default nodes.

/// Highest transaction version considered standard.
pub const MAX_TX_VERSION: u32 = 2;

/// Maximum weight of a standard transaction.
pub const MAX_TX_WEIGHT: usize = 400_000;

/// Maximum size of a standard scriptSig in bytes.
pub const MAX_SCRIPT_SIG_SIZE: usize = 1650;

/// Maximum number of witness stack items in a standard P2WSH spend.
pub const MAX_P2WSH_STACK: usize = 100;

/// Maximum size of a single P2WSH witness stack item.
pub const MAX_P2WSH_PUSH: usize = 80;

/// Minimum relay fee rate in satoshis per 1000 virtual bytes.
pub const MIN_RELAY: i64 = 1_000;

/// Dust relay rate in satoshis per 1000 virtual bytes.
pub const DUST_RELAY: i64 = 3_000;

/// Starting fee for iterative fee estimation, in satoshis.
pub const MIN_FEE: i64 = 10_000;

/// Default ceiling on an estimated fee, in satoshis.
pub const MAX_FEE: i64 = 10_000_000;

/// Virtual bytes charged per signature operation when computing sigop
/// adjusted size.
pub const BYTES_PER_SIGOP: usize = 20;

/// Maximum sigop cost of a standard transaction.
pub const MAX_TX_SIGOPS_COST: usize = 16_000;

/// Computes the fee for a given size at a rate in satoshis per 1000 virtual
/// bytes. Rounds the size up to the next kilobyte when `round` is set,
/// otherwise prorates and rounds the fee up to the next satoshi.
pub fn get_fee(size: usize, rate: i64, round: bool) -> i64 {
    let size = size as i64;
    if round {
        ((size + 999) / 1000) * rate
    } else {
        (size * rate + 999) / 1000
    }
}

/// Fee rate implied by a fee and size, in satoshis per 1000 virtual bytes.
pub fn get_rate(size: usize, fee: i64) -> i64 {
    if size == 0 {
        return 0;
    }
    fee * 1000 / size as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_computation() {
        assert_eq!(get_fee(250, 10_000, false), 2_500);
        assert_eq!(get_fee(1, 1_000, false), 1);
        assert_eq!(get_fee(250, 10_000, true), 10_000);
        assert_eq!(get_fee(1001, 10_000, true), 20_000);
        assert_eq!(get_rate(250, 2_500), 10_000);
    }
}
