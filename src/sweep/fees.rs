//! Sweep fee split
//!
//! The miner fee of a sweep is shared equally by its deposits. The division
//! remainder goes to the deposit spent by the last deposit input, so the
//! shares always add up to the fee.

/// Per-deposit fee shares, in deposit input order
pub fn split_sweep_fee(fee: u64, count: usize) -> Vec<u64> {
    if count == 0 {
        return Vec::new();
    }

    let n = count as u64;
    let per_deposit = fee / n;
    let remainder = fee % n;

    let mut shares = vec![per_deposit; count];
    if let Some(last) = shares.last_mut() {
        *last += remainder;
    }
    shares
}

/// Upper bound on a sweep fee: `max_per_deposit` for each deposit
pub fn max_sweep_fee(max_per_deposit: u64, count: usize) -> u64 {
    max_per_deposit.saturating_mul(count as u64)
}
