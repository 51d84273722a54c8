//! Deposit registry
//!
//! Append-only table of revealed deposits keyed by
//! `DepositKey::derive(fundingTxHash, fundingOutputIndex)`.

use std::collections::{BTreeSet, HashMap};

use super::script::{check_funding_script, deposit_script};
use crate::common::error::{BridgeError, Result};
use crate::governance::BridgeParameters;
use crate::types::{
    AccountId, BitcoinTx, BridgeEvent, DepositKey, DepositRequest, DepositRevealInfo, Wallet,
    WalletState,
};

/// Locktimes below this value are block heights, not timestamps
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Everything a reveal reads besides the registry itself
pub struct RevealContext<'a> {
    pub wallet: Option<&'a Wallet>,
    pub params: &'a BridgeParameters,
    pub trusted_vaults: &'a BTreeSet<AccountId>,
    pub now: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DepositRegistry {
    deposits: HashMap<DepositKey, DepositRequest>,
}

impl DepositRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted deposits
    pub fn from_deposits(deposits: impl IntoIterator<Item = (DepositKey, DepositRequest)>) -> Self {
        Self {
            deposits: deposits.into_iter().collect(),
        }
    }

    /// Validate a funding transaction against the revealed script data and
    /// record the deposit
    pub fn reveal(
        &mut self,
        funding_tx: &BitcoinTx,
        reveal: &DepositRevealInfo,
        ctx: &RevealContext<'_>,
    ) -> Result<(DepositKey, BridgeEvent)> {
        let state = ctx.wallet.map(|w| w.state).unwrap_or(WalletState::Unknown);
        if !state.accepts_deposits() {
            return Err(BridgeError::WalletNotLive(state));
        }

        if ctx.params.deposit_reveal_ahead_period > 0 {
            validate_refund_locktime(
                reveal.refund_locktime_value(),
                ctx.params.deposit_reveal_ahead_period,
                ctx.now,
            )?;
        }

        let outputs = funding_tx.outputs()?;
        let output = outputs
            .get(reveal.funding_output_index as usize)
            .ok_or(BridgeError::FundingOutputNotFound(reveal.funding_output_index))?;

        check_funding_script(&output.script_pubkey, &deposit_script(reveal))?;

        let amount = output.value.to_sat();
        if amount < ctx.params.deposit_dust_threshold {
            return Err(BridgeError::DustAmount {
                amount,
                threshold: ctx.params.deposit_dust_threshold,
            });
        }

        // The zero identity means no vault
        let vault = reveal.vault.filter(|v| !v.is_zero());
        if let Some(vault) = vault {
            if !ctx.trusted_vaults.contains(&vault) {
                return Err(BridgeError::UntrustedVault(vault));
            }
        }

        let treasury_fee = match ctx.params.deposit_treasury_fee_divisor {
            0 => 0,
            divisor => amount / divisor,
        };

        let funding_tx_hash = funding_tx.tx_hash();
        let key = DepositKey::derive(&funding_tx_hash, reveal.funding_output_index);
        if self.deposits.contains_key(&key) {
            return Err(BridgeError::AlreadyRevealed);
        }

        self.deposits.insert(
            key,
            DepositRequest {
                depositor: reveal.depositor,
                funding_tx_hash,
                funding_output_index: reveal.funding_output_index,
                wallet_pub_key_hash: reveal.wallet_pub_key_hash,
                refund_pub_key_hash: reveal.refund_pub_key_hash,
                refund_locktime: reveal.refund_locktime,
                amount,
                revealed_at: ctx.now,
                swept_at: None,
                vault,
                treasury_fee,
                extra_data: reveal.extra_data,
            },
        );

        let event = BridgeEvent::DepositRevealed {
            deposit_key: key,
            funding_tx_hash,
            funding_output_index: reveal.funding_output_index,
            depositor: reveal.depositor,
            amount,
            wallet_pub_key_hash: reveal.wallet_pub_key_hash,
            vault,
            treasury_fee,
        };

        Ok((key, event))
    }

    pub fn get(&self, key: &DepositKey) -> Option<&DepositRequest> {
        self.deposits.get(key)
    }

    pub fn len(&self) -> usize {
        self.deposits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DepositKey, &DepositRequest)> {
        self.deposits.iter()
    }

    /// One-way transition; callers validate that the deposits are unswept
    pub(crate) fn mark_swept(&mut self, keys: &[DepositKey], now: u64) {
        for key in keys {
            if let Some(deposit) = self.deposits.get_mut(key) {
                deposit.swept_at.get_or_insert(now);
            }
        }
    }
}

/// Refund locktime must be a timestamp at least `ahead_period` in the future
pub fn validate_refund_locktime(locktime: u32, ahead_period: u64, now: u64) -> Result<()> {
    if locktime < LOCKTIME_THRESHOLD {
        return Err(BridgeError::RefundLocktimeNotTimestamp(locktime));
    }

    match (locktime as u64).checked_sub(ahead_period) {
        Some(latest_reveal) if latest_reveal >= now => Ok(()),
        _ => Err(BridgeError::RefundLocktimeTooClose(locktime)),
    }
}
