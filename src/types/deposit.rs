//! Deposit Types
//!
//! A deposit is created by a reveal and changes exactly once afterwards, when
//! a sweep proof marks it swept. Keys are never reused or deleted.

use serde::{Deserialize, Serialize};

use super::identity::AccountId;

/// Data a depositor reveals so the locking script can be rebuilt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRevealInfo {
    /// Identity credited when the deposit is swept
    pub depositor: AccountId,
    /// Index of the funding output in the funding transaction
    pub funding_output_index: u32,
    #[serde(with = "hex::serde")]
    pub blinding_factor: [u8; 8],
    #[serde(with = "hex::serde")]
    pub wallet_pub_key_hash: [u8; 20],
    #[serde(with = "hex::serde")]
    pub refund_pub_key_hash: [u8; 20],
    /// 4-byte little-endian refund locktime
    #[serde(with = "hex::serde")]
    pub refund_locktime: [u8; 4],
    /// Vault the deposit is routed to; `None` credits the depositor directly
    pub vault: Option<AccountId>,
    /// Opaque data committed to by the script
    pub extra_data: Option<[u8; 32]>,
}

impl DepositRevealInfo {
    /// Refund locktime as a number
    pub fn refund_locktime_value(&self) -> u32 {
        u32::from_le_bytes(self.refund_locktime)
    }
}

/// A revealed deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub depositor: AccountId,
    #[serde(with = "hex::serde")]
    pub funding_tx_hash: [u8; 32],
    pub funding_output_index: u32,
    #[serde(with = "hex::serde")]
    pub wallet_pub_key_hash: [u8; 20],
    #[serde(with = "hex::serde")]
    pub refund_pub_key_hash: [u8; 20],
    #[serde(with = "hex::serde")]
    pub refund_locktime: [u8; 4],
    /// Funding output value in satoshis
    pub amount: u64,
    pub revealed_at: u64,
    /// Set once, by the sweep that consumes the deposit
    pub swept_at: Option<u64>,
    pub vault: Option<AccountId>,
    /// Treasury fee fixed at reveal time, in satoshis
    pub treasury_fee: u64,
    pub extra_data: Option<[u8; 32]>,
}

impl DepositRequest {
    pub fn is_swept(&self) -> bool {
        self.swept_at.is_some()
    }

    /// Amount left after the treasury fee
    pub fn amount_after_treasury_fee(&self) -> u64 {
        self.amount.saturating_sub(self.treasury_fee)
    }
}
