//! Bank
//!
//! Satoshi balances credited by sweeps. Credits are staged first and
//! committed in one step, so a batch either lands entirely or not at all.

pub mod vault;

use std::collections::HashMap;

use crate::common::error::{BridgeError, Result};
use crate::types::AccountId;

pub use vault::{Vault, VaultRegistry, VaultSet};

#[derive(Debug, Clone, Default)]
pub struct Bank {
    balances: HashMap<AccountId, u64>,
}

/// New balances computed by `Bank::stage`, not yet written
#[derive(Debug)]
#[must_use = "staged credits do nothing until committed"]
pub struct StagedCredits {
    balances: HashMap<AccountId, u64>,
}

impl Bank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_balances(balances: impl IntoIterator<Item = (AccountId, u64)>) -> Self {
        Self {
            balances: balances.into_iter().collect(),
        }
    }

    pub fn balance_of(&self, account: &AccountId) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn balances(&self) -> impl Iterator<Item = (&AccountId, &u64)> {
        self.balances.iter()
    }

    /// Compute the balances after `credits` without writing them
    ///
    /// Repeated accounts accumulate. Zero credits are skipped.
    pub fn stage(&self, credits: &[(AccountId, u64)]) -> Result<StagedCredits> {
        let mut balances: HashMap<AccountId, u64> = HashMap::new();

        for (account, amount) in credits {
            if *amount == 0 {
                continue;
            }
            let current = match balances.get(account) {
                Some(staged) => *staged,
                None => self.balance_of(account),
            };
            let updated = current
                .checked_add(*amount)
                .ok_or(BridgeError::ArithmeticOverflow)?;
            balances.insert(*account, updated);
        }

        Ok(StagedCredits { balances })
    }

    pub fn commit(&mut self, staged: StagedCredits) {
        self.balances.extend(staged.balances);
    }
}

impl StagedCredits {
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
