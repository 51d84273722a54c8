//! Domain Events
//!
//! Events are an observation channel: operations append them after their
//! state change commits and nothing inside the ledger reads them back.

use serde::Serialize;

use super::identity::{AccountId, DepositKey};
use super::units::u128_string;
use super::wallet::{PubKeyHash, WalletState};
use crate::common::logging::EventCategory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    DepositRevealed {
        deposit_key: DepositKey,
        #[serde(with = "hex::serde")]
        funding_tx_hash: [u8; 32],
        funding_output_index: u32,
        depositor: AccountId,
        amount: u64,
        #[serde(with = "hex::serde")]
        wallet_pub_key_hash: PubKeyHash,
        vault: Option<AccountId>,
        treasury_fee: u64,
    },
    DepositsSwept {
        #[serde(with = "hex::serde")]
        sweep_tx_hash: [u8; 32],
        #[serde(with = "hex::serde")]
        wallet_pub_key_hash: PubKeyHash,
        deposit_count: usize,
        sweep_fee: u64,
        treasury_fee: u64,
    },
    OptimisticMintingRequested {
        minter: AccountId,
        deposit_key: DepositKey,
        depositor: AccountId,
        amount: u64,
        #[serde(with = "hex::serde")]
        funding_tx_hash: [u8; 32],
        funding_output_index: u32,
    },
    OptimisticMintingFinalized {
        minter: AccountId,
        deposit_key: DepositKey,
        depositor: AccountId,
        #[serde(with = "u128_string")]
        optimistic_minting_debt: u128,
    },
    OptimisticMintingCancelled {
        guardian: AccountId,
        deposit_key: DepositKey,
    },
    OptimisticMintingDebtRepaid {
        depositor: AccountId,
        #[serde(with = "u128_string")]
        optimistic_minting_debt: u128,
    },
    OptimisticMintingPaused,
    OptimisticMintingUnpaused,
    MinterAdded {
        minter: AccountId,
    },
    MinterRemoved {
        minter: AccountId,
    },
    GuardianAdded {
        guardian: AccountId,
    },
    GuardianRemoved {
        guardian: AccountId,
    },
    ParameterUpdateStarted {
        parameter: String,
        value: String,
        initiated_at: u64,
    },
    ParameterUpdated {
        parameter: String,
        value: String,
    },
    VaultStatusUpdated {
        vault: AccountId,
        trusted: bool,
    },
    WalletStateUpdated {
        #[serde(with = "hex::serde")]
        wallet_pub_key_hash: PubKeyHash,
        state: WalletState,
    },
    EpochDifficultyUpdated {
        #[serde(with = "u128_string")]
        current: u128,
        #[serde(with = "u128_string")]
        previous: u128,
    },
    OwnershipTransferred {
        previous_owner: AccountId,
        new_owner: AccountId,
    },
}

impl BridgeEvent {
    /// Event name as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::DepositRevealed { .. } => "deposit_revealed",
            BridgeEvent::DepositsSwept { .. } => "deposits_swept",
            BridgeEvent::OptimisticMintingRequested { .. } => "optimistic_minting_requested",
            BridgeEvent::OptimisticMintingFinalized { .. } => "optimistic_minting_finalized",
            BridgeEvent::OptimisticMintingCancelled { .. } => "optimistic_minting_cancelled",
            BridgeEvent::OptimisticMintingDebtRepaid { .. } => "optimistic_minting_debt_repaid",
            BridgeEvent::OptimisticMintingPaused => "optimistic_minting_paused",
            BridgeEvent::OptimisticMintingUnpaused => "optimistic_minting_unpaused",
            BridgeEvent::MinterAdded { .. } => "minter_added",
            BridgeEvent::MinterRemoved { .. } => "minter_removed",
            BridgeEvent::GuardianAdded { .. } => "guardian_added",
            BridgeEvent::GuardianRemoved { .. } => "guardian_removed",
            BridgeEvent::ParameterUpdateStarted { .. } => "parameter_update_started",
            BridgeEvent::ParameterUpdated { .. } => "parameter_updated",
            BridgeEvent::VaultStatusUpdated { .. } => "vault_status_updated",
            BridgeEvent::WalletStateUpdated { .. } => "wallet_state_updated",
            BridgeEvent::EpochDifficultyUpdated { .. } => "epoch_difficulty_updated",
            BridgeEvent::OwnershipTransferred { .. } => "ownership_transferred",
        }
    }

    /// Log category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            BridgeEvent::DepositRevealed { .. } => EventCategory::Deposit,
            BridgeEvent::DepositsSwept { .. } => EventCategory::Sweep,
            BridgeEvent::OptimisticMintingRequested { .. }
            | BridgeEvent::OptimisticMintingFinalized { .. }
            | BridgeEvent::OptimisticMintingCancelled { .. }
            | BridgeEvent::OptimisticMintingDebtRepaid { .. } => EventCategory::Minting,
            _ => EventCategory::Governance,
        }
    }
}

/// Events kept by default before the oldest are discarded
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

/// Ordered record of emitted events
///
/// Bounded: once `capacity` events are held, the oldest half is dropped.
/// Observers that need every event must drain regularly; each event is also
/// written to the tracing log when emitted.
#[derive(Debug)]
pub struct EventLog {
    events: Vec<BridgeEvent>,
    capacity: usize,
    dropped: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Record and log an event
    pub fn emit(&mut self, event: BridgeEvent) {
        crate::common::logging::log_bridge_event(&event);
        if self.events.len() >= self.capacity {
            let overflow = (self.capacity / 2).max(1);
            self.events.drain(..overflow);
            self.dropped += overflow as u64;
            tracing::warn!(
                target: "bridge::system",
                dropped = overflow,
                total_dropped = self.dropped,
                "event log full; oldest undrained events discarded"
            );
        }
        self.events.push(event);
    }

    /// Events discarded because the log was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = BridgeEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn events(&self) -> &[BridgeEvent] {
        &self.events
    }

    /// Hand every recorded event to the caller
    pub fn drain(&mut self) -> Vec<BridgeEvent> {
        std::mem::take(&mut self.events)
    }
}
