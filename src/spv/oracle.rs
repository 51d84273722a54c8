//! Difficulty oracle
//!
//! Supplies the difficulty of the current and previous retarget epochs. A
//! proof must be built entirely from headers of one of those two epochs.

use serde::{Deserialize, Serialize};

use crate::types::units::u128_string;

/// Source of epoch difficulties
#[cfg_attr(test, mockall::automock)]
pub trait DifficultyOracle: Send + Sync {
    fn current_epoch_difficulty(&self) -> u128;
    fn previous_epoch_difficulty(&self) -> u128;
}

/// Epoch difficulties maintained by governance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochDifficulty {
    #[serde(with = "u128_string")]
    pub current: u128,
    #[serde(with = "u128_string")]
    pub previous: u128,
}

impl EpochDifficulty {
    pub fn new(current: u128, previous: u128) -> Self {
        Self { current, previous }
    }
}

impl Default for EpochDifficulty {
    /// Minimum difficulty, as on regtest
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl DifficultyOracle for EpochDifficulty {
    fn current_epoch_difficulty(&self) -> u128 {
        self.current
    }

    fn previous_epoch_difficulty(&self) -> u128 {
        self.previous
    }
}
