//! Bridge tunables
//!
//! Every tunable is a `u64` described by a getter, a setter and a validator.
//! The validator sees the full current parameter set, so cross-parameter
//! rules hold no matter which side changes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::error::{BridgeError, Result};

/// Effective values of every tunable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeParameters {
    /// Minimum deposit amount in satoshis
    pub deposit_dust_threshold: u64,
    /// Treasury fee is `amount / divisor`; 0 disables it
    pub deposit_treasury_fee_divisor: u64,
    /// Maximum sweep miner fee per deposit, in satoshis
    pub deposit_tx_max_fee: u64,
    /// Seconds a refund locktime must lie beyond the reveal; 0 disables the check
    pub deposit_reveal_ahead_period: u64,
    /// Headers an SPV proof must carry, and the accumulated difficulty multiple
    pub tx_proof_difficulty_factor: u64,
    /// Optimistic minting fee is `amount / divisor`; 0 disables it
    pub optimistic_minting_fee_divisor: u64,
    /// Seconds between an optimistic minting request and its finalization
    pub optimistic_minting_delay: u64,
    /// Seconds between beginning and finalizing any parameter update
    pub governance_delay: u64,
}

/// Tunable selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKey {
    DepositDustThreshold,
    DepositTreasuryFeeDivisor,
    DepositTxMaxFee,
    DepositRevealAheadPeriod,
    TxProofDifficultyFactor,
    OptimisticMintingFeeDivisor,
    OptimisticMintingDelay,
    GovernanceDelay,
}

/// Accessors and validation for one tunable
#[derive(Clone, Copy)]
pub struct Tunable {
    pub get: fn(&BridgeParameters) -> u64,
    pub set: fn(&mut BridgeParameters, u64),
    pub validate: fn(&BridgeParameters, u64) -> Result<()>,
}

fn accept_any(_: &BridgeParameters, _: u64) -> Result<()> {
    Ok(())
}

fn require_positive(name: &'static str) -> impl Fn(u64) -> Result<()> {
    move |value| {
        if value == 0 {
            Err(BridgeError::invalid_parameter(name, "must be greater than zero"))
        } else {
            Ok(())
        }
    }
}

impl ParameterKey {
    pub const ALL: [ParameterKey; 8] = [
        ParameterKey::DepositDustThreshold,
        ParameterKey::DepositTreasuryFeeDivisor,
        ParameterKey::DepositTxMaxFee,
        ParameterKey::DepositRevealAheadPeriod,
        ParameterKey::TxProofDifficultyFactor,
        ParameterKey::OptimisticMintingFeeDivisor,
        ParameterKey::OptimisticMintingDelay,
        ParameterKey::GovernanceDelay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ParameterKey::DepositDustThreshold => "deposit_dust_threshold",
            ParameterKey::DepositTreasuryFeeDivisor => "deposit_treasury_fee_divisor",
            ParameterKey::DepositTxMaxFee => "deposit_tx_max_fee",
            ParameterKey::DepositRevealAheadPeriod => "deposit_reveal_ahead_period",
            ParameterKey::TxProofDifficultyFactor => "tx_proof_difficulty_factor",
            ParameterKey::OptimisticMintingFeeDivisor => "optimistic_minting_fee_divisor",
            ParameterKey::OptimisticMintingDelay => "optimistic_minting_delay",
            ParameterKey::GovernanceDelay => "governance_delay",
        }
    }

    pub fn tunable(&self) -> Tunable {
        match self {
            ParameterKey::DepositDustThreshold => Tunable {
                get: |p| p.deposit_dust_threshold,
                set: |p, v| p.deposit_dust_threshold = v,
                validate: |p, v| {
                    if v <= p.deposit_tx_max_fee {
                        return Err(BridgeError::invalid_parameter(
                            "deposit_dust_threshold",
                            "must be greater than deposit_tx_max_fee",
                        ));
                    }
                    Ok(())
                },
            },
            ParameterKey::DepositTreasuryFeeDivisor => Tunable {
                get: |p| p.deposit_treasury_fee_divisor,
                set: |p, v| p.deposit_treasury_fee_divisor = v,
                validate: accept_any,
            },
            ParameterKey::DepositTxMaxFee => Tunable {
                get: |p| p.deposit_tx_max_fee,
                set: |p, v| p.deposit_tx_max_fee = v,
                validate: |p, v| {
                    require_positive("deposit_tx_max_fee")(v)?;
                    if v >= p.deposit_dust_threshold {
                        return Err(BridgeError::invalid_parameter(
                            "deposit_tx_max_fee",
                            "must be less than deposit_dust_threshold",
                        ));
                    }
                    Ok(())
                },
            },
            ParameterKey::DepositRevealAheadPeriod => Tunable {
                get: |p| p.deposit_reveal_ahead_period,
                set: |p, v| p.deposit_reveal_ahead_period = v,
                validate: accept_any,
            },
            ParameterKey::TxProofDifficultyFactor => Tunable {
                get: |p| p.tx_proof_difficulty_factor,
                set: |p, v| p.tx_proof_difficulty_factor = v,
                validate: |_, v| require_positive("tx_proof_difficulty_factor")(v),
            },
            ParameterKey::OptimisticMintingFeeDivisor => Tunable {
                get: |p| p.optimistic_minting_fee_divisor,
                set: |p, v| p.optimistic_minting_fee_divisor = v,
                validate: accept_any,
            },
            ParameterKey::OptimisticMintingDelay => Tunable {
                get: |p| p.optimistic_minting_delay,
                set: |p, v| p.optimistic_minting_delay = v,
                validate: accept_any,
            },
            ParameterKey::GovernanceDelay => Tunable {
                get: |p| p.governance_delay,
                set: |p, v| p.governance_delay = v,
                validate: |_, v| require_positive("governance_delay")(v),
            },
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParameterKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ParameterKey::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| format!("unknown parameter: {}", s))
    }
}
