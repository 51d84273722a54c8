//! Deposit Sweeps
//!
//! Accepts SPV-proven sweep transactions and turns them into bank credits,
//! vault notifications and treasury fees.

pub mod fees;
pub mod processor;

pub use fees::{max_sweep_fee, split_sweep_fee};
pub use processor::{SweepProcessor, SweepSummary, SweptDeposit};
