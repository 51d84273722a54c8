//! Token ledger
//!
//! 18-decimal token balances. Mints are checked against overflow of both the
//! holder balance and the total supply before anything is written.

use std::collections::HashMap;

use crate::common::error::{BridgeError, Result};
use crate::types::AccountId;

#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    balances: HashMap<AccountId, u128>,
    total_supply: u128,
}

/// Balances and supply computed by `TokenLedger::stage`, not yet written
#[derive(Debug)]
#[must_use = "staged mints do nothing until committed"]
pub struct StagedMints {
    balances: HashMap<AccountId, u128>,
    total_supply: u128,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted balances; the supply is their sum
    pub fn from_balances(balances: impl IntoIterator<Item = (AccountId, u128)>) -> Result<Self> {
        let balances: HashMap<AccountId, u128> = balances.into_iter().collect();
        let total_supply = balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
            .ok_or(BridgeError::ArithmeticOverflow)?;
        Ok(Self {
            balances,
            total_supply,
        })
    }

    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn balances(&self) -> impl Iterator<Item = (&AccountId, &u128)> {
        self.balances.iter()
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn stage(&self, mints: &[(AccountId, u128)]) -> Result<StagedMints> {
        let mut balances: HashMap<AccountId, u128> = HashMap::new();
        let mut total_supply = self.total_supply;

        for (account, amount) in mints {
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
            total_supply = total_supply
                .checked_add(*amount)
                .ok_or(BridgeError::ArithmeticOverflow)?;
            balances.insert(*account, updated);
        }

        Ok(StagedMints {
            balances,
            total_supply,
        })
    }

    pub fn commit(&mut self, staged: StagedMints) {
        self.balances.extend(staged.balances);
        self.total_supply = staged.total_supply;
    }
}
