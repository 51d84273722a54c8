//! Two-phase delayed updates
//!
//! `begin` stores a pending value and the time it was proposed; `finalize`
//! applies it once the governance delay has passed. The effective value never
//! changes in between.

use serde::{Deserialize, Serialize};

use crate::common::error::{BridgeError, Result};

/// A proposed value waiting out the governance delay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdate<T> {
    pub value: T,
    pub initiated_at: u64,
}

/// Timer for one tunable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedUpdate<T> {
    pending: Option<PendingUpdate<T>>,
}

impl<T> Default for DelayedUpdate<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T: Clone> DelayedUpdate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pending(pending: Option<PendingUpdate<T>>) -> Self {
        Self { pending }
    }

    /// Propose `value`; an earlier proposal is replaced and its timer restarted
    pub fn begin(&mut self, value: T, now: u64) {
        self.pending = Some(PendingUpdate {
            value,
            initiated_at: now,
        });
    }

    /// The proposed value, once `delay` seconds have passed since `begin`
    ///
    /// Does not clear the timer; call `clear` after applying the value.
    pub fn ready_value(&self, now: u64, delay: u64) -> Result<T> {
        let pending = self.pending.as_ref().ok_or(BridgeError::ChangeNotInitiated)?;
        if now.saturating_sub(pending.initiated_at) < delay {
            return Err(BridgeError::DelayNotElapsed);
        }
        Ok(pending.value.clone())
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<&PendingUpdate<T>> {
        self.pending.as_ref()
    }
}
