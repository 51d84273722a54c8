//! Enumerable role sets
//!
//! Membership lives in a list for enumeration plus a position index, so both
//! lookups and removals are O(1): removal swaps the last member into the gap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::common::error::{BridgeError, Result};
use crate::types::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Minter,
    Guardian,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Minter => f.write_str("minter"),
            Role::Guardian => f.write_str("guardian"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoleSet {
    role: Role,
    members: Vec<AccountId>,
    positions: HashMap<AccountId, usize>,
}

impl RoleSet {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            members: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Rebuild from a persisted member list, keeping its order
    pub fn from_members(role: Role, members: Vec<AccountId>) -> Self {
        let positions = members.iter().enumerate().map(|(i, m)| (*m, i)).collect();
        Self {
            role,
            members,
            positions,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.positions.contains_key(account)
    }

    pub fn members(&self) -> &[AccountId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn add(&mut self, account: AccountId) -> Result<()> {
        if self.contains(&account) {
            return Err(BridgeError::AlreadyMember {
                role: self.role,
                account,
            });
        }
        self.positions.insert(account, self.members.len());
        self.members.push(account);
        Ok(())
    }

    pub fn remove(&mut self, account: AccountId) -> Result<()> {
        let index = self
            .positions
            .remove(&account)
            .ok_or(BridgeError::NotMember {
                role: self.role,
                account,
            })?;

        self.members.swap_remove(index);
        if let Some(moved) = self.members.get(index) {
            self.positions.insert(*moved, index);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> AccountId {
        AccountId::from_low_u64(n)
    }

    #[test]
    fn test_swap_remove_moves_last_member() {
        let mut set = RoleSet::new(Role::Minter);
        for n in 1..=4 {
            set.add(id(n)).unwrap();
        }

        set.remove(id(2)).unwrap();
        assert_eq!(set.members(), &[id(1), id(4), id(3)]);

        // Index of the moved member stays consistent
        set.remove(id(4)).unwrap();
        assert_eq!(set.members(), &[id(1), id(3)]);
        assert!(!set.contains(&id(4)));
    }

    #[test]
    fn test_remove_last_member() {
        let mut set = RoleSet::new(Role::Guardian);
        set.add(id(1)).unwrap();
        set.add(id(2)).unwrap();
        set.remove(id(2)).unwrap();
        assert_eq!(set.members(), &[id(1)]);
        set.add(id(2)).unwrap();
        assert_eq!(set.members(), &[id(1), id(2)]);
    }

    #[test]
    fn test_duplicate_and_absent() {
        let mut set = RoleSet::new(Role::Minter);
        set.add(id(1)).unwrap();
        assert!(matches!(
            set.add(id(1)),
            Err(BridgeError::AlreadyMember { role: Role::Minter, .. })
        ));
        assert!(matches!(
            set.remove(id(9)),
            Err(BridgeError::NotMember { role: Role::Minter, .. })
        ));
    }

    #[test]
    fn test_from_members_keeps_order() {
        let set = RoleSet::from_members(Role::Guardian, vec![id(3), id(1)]);
        assert_eq!(set.members(), &[id(3), id(1)]);
        assert!(set.contains(&id(1)));
        assert_eq!(set.role().to_string(), "guardian");
    }
}
