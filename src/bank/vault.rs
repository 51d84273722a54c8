//! Vault capability
//!
//! A vault receives the net amounts of the deposits routed to it, as one
//! batch per sweep. The bank credits the vault's own balance with the batch
//! total; the vault decides what to do for each depositor.

use std::collections::{BTreeSet, HashMap};

use crate::common::error::Result;
use crate::types::{AccountId, BridgeEvent};

/// Receiver of batched balance increases
pub trait Vault: Send + Sync {
    fn id(&self) -> AccountId;

    /// Handle one batch; `depositors[i]` is owed `amounts[i]` satoshis
    ///
    /// Must leave the vault unchanged when it returns an error.
    fn receive_balance_increase(
        &mut self,
        depositors: &[AccountId],
        amounts: &[u64],
    ) -> Result<Vec<BridgeEvent>>;
}

/// Trust set plus externally supplied vault implementations
#[derive(Default)]
pub struct VaultRegistry {
    trusted: BTreeSet<AccountId>,
    external: HashMap<AccountId, Box<dyn Vault>>,
}

impl VaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_trusted(&self, vault: &AccountId) -> bool {
        self.trusted.contains(vault)
    }

    pub fn trusted(&self) -> &BTreeSet<AccountId> {
        &self.trusted
    }

    pub fn set_trusted(&mut self, vault: AccountId, trusted: bool) {
        if trusted {
            self.trusted.insert(vault);
        } else {
            self.trusted.remove(&vault);
        }
    }

    /// Register an implementation; trust is granted separately
    pub fn register(&mut self, vault: Box<dyn Vault>) {
        self.external.insert(vault.id(), vault);
    }
}

impl std::fmt::Debug for VaultRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultRegistry")
            .field("trusted", &self.trusted)
            .field("external", &self.external.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Every vault reachable during one sweep: the built-in one and the registry
pub struct VaultSet<'a> {
    pub builtin: &'a mut dyn Vault,
    pub registry: &'a mut VaultRegistry,
}

impl<'a> VaultSet<'a> {
    pub fn is_trusted(&self, vault: &AccountId) -> bool {
        self.registry.is_trusted(vault)
    }

    pub fn get_mut(&mut self, vault: &AccountId) -> Option<&mut dyn Vault> {
        if self.builtin.id() == *vault {
            let builtin: &mut dyn Vault = &mut *self.builtin;
            return Some(builtin);
        }
        if let Some(external) = self.registry.external.get_mut(vault) {
            let external: &mut dyn Vault = external.as_mut();
            return Some(external);
        }
        None
    }
}
