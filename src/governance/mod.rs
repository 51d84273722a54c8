//! Governance
//!
//! Owner-controlled configuration. Every tunable moves through the same
//! two-phase delayed update; timers are independent per tunable.
//!
//! ```text
//! begin(value) ──► pending + initiated_at ──(governance delay)──► finalize ──► validate + apply
//! ```

pub mod delayed;
pub mod parameters;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::common::error::{BridgeError, Result};
use crate::types::{AccountId, BridgeEvent};

pub use delayed::{DelayedUpdate, PendingUpdate};
pub use parameters::{BridgeParameters, ParameterKey, Tunable};

/// Persisted governance state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceState {
    pub owner: AccountId,
    pub treasury: AccountId,
    pub parameters: BridgeParameters,
    pub pending: Vec<(ParameterKey, PendingUpdate<u64>)>,
    pub pending_treasury: Option<PendingUpdate<AccountId>>,
}

#[derive(Debug, Clone)]
pub struct Governance {
    owner: AccountId,
    treasury: AccountId,
    parameters: BridgeParameters,
    updates: BTreeMap<ParameterKey, DelayedUpdate<u64>>,
    treasury_update: DelayedUpdate<AccountId>,
}

impl Governance {
    pub fn new(owner: AccountId, treasury: AccountId, parameters: BridgeParameters) -> Self {
        Self {
            owner,
            treasury,
            parameters,
            updates: BTreeMap::new(),
            treasury_update: DelayedUpdate::new(),
        }
    }

    pub fn from_state(state: GovernanceState) -> Self {
        let updates = state
            .pending
            .into_iter()
            .map(|(key, pending)| (key, DelayedUpdate::from_pending(Some(pending))))
            .collect();

        Self {
            owner: state.owner,
            treasury: state.treasury,
            parameters: state.parameters,
            updates,
            treasury_update: DelayedUpdate::from_pending(state.pending_treasury),
        }
    }

    pub fn to_state(&self) -> GovernanceState {
        GovernanceState {
            owner: self.owner,
            treasury: self.treasury,
            parameters: self.parameters,
            pending: self
                .updates
                .iter()
                .filter_map(|(key, update)| update.pending().map(|p| (*key, p.clone())))
                .collect(),
            pending_treasury: self.treasury_update.pending().cloned(),
        }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn treasury(&self) -> AccountId {
        self.treasury
    }

    pub fn parameters(&self) -> &BridgeParameters {
        &self.parameters
    }

    pub fn ensure_owner(&self, caller: AccountId) -> Result<()> {
        if caller != self.owner {
            return Err(BridgeError::NotOwner(caller));
        }
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: AccountId, new_owner: AccountId) -> Result<BridgeEvent> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(BridgeError::invalid_parameter("owner", "must not be the zero identity"));
        }
        let previous_owner = std::mem::replace(&mut self.owner, new_owner);
        Ok(BridgeEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        })
    }

    // ========================================================================
    // Tunables
    // ========================================================================

    pub fn begin_parameter_update(
        &mut self,
        caller: AccountId,
        key: ParameterKey,
        value: u64,
        now: u64,
    ) -> Result<BridgeEvent> {
        self.ensure_owner(caller)?;
        self.updates.entry(key).or_default().begin(value, now);

        Ok(BridgeEvent::ParameterUpdateStarted {
            parameter: key.name().to_string(),
            value: value.to_string(),
            initiated_at: now,
        })
    }

    pub fn finalize_parameter_update(
        &mut self,
        caller: AccountId,
        key: ParameterKey,
        now: u64,
    ) -> Result<BridgeEvent> {
        self.ensure_owner(caller)?;

        let update = self.updates.get(&key).ok_or(BridgeError::ChangeNotInitiated)?;
        let value = update.ready_value(now, self.parameters.governance_delay)?;

        let tunable = key.tunable();
        (tunable.validate)(&self.parameters, value)?;
        (tunable.set)(&mut self.parameters, value);
        self.updates.remove(&key);

        Ok(BridgeEvent::ParameterUpdated {
            parameter: key.name().to_string(),
            value: value.to_string(),
        })
    }

    pub fn pending_update(&self, key: ParameterKey) -> Option<&PendingUpdate<u64>> {
        self.updates.get(&key).and_then(|u| u.pending())
    }

    // ========================================================================
    // Treasury
    // ========================================================================

    pub fn begin_treasury_update(
        &mut self,
        caller: AccountId,
        treasury: AccountId,
        now: u64,
    ) -> Result<BridgeEvent> {
        self.ensure_owner(caller)?;
        self.treasury_update.begin(treasury, now);

        Ok(BridgeEvent::ParameterUpdateStarted {
            parameter: "treasury".to_string(),
            value: treasury.to_string(),
            initiated_at: now,
        })
    }

    pub fn finalize_treasury_update(&mut self, caller: AccountId, now: u64) -> Result<BridgeEvent> {
        self.ensure_owner(caller)?;

        let treasury = self
            .treasury_update
            .ready_value(now, self.parameters.governance_delay)?;
        if treasury.is_zero() {
            return Err(BridgeError::invalid_parameter("treasury", "must not be the zero identity"));
        }

        self.treasury = treasury;
        self.treasury_update.clear();

        Ok(BridgeEvent::ParameterUpdated {
            parameter: "treasury".to_string(),
            value: treasury.to_string(),
        })
    }

    pub fn pending_treasury(&self) -> Option<&PendingUpdate<AccountId>> {
        self.treasury_update.pending()
    }
}
