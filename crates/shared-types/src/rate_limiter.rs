//! # Rolling-Window Rate Limiter
//!
//! Bounds cumulative consumption (e.g. withdrawn wei) per time window.
//!
//! ## Algorithm
//!
//! - The window opens at `window_start` and lasts `window_secs`.
//! - Consumption accumulates into `consumed` and may never exceed `limit`.
//! - There is no scheduler: the first access at or past
//!   `window_start + window_secs` resets `consumed` and reopens the window at
//!   the access time.

use crate::errors::BudgetError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// A lazily rolled consumption budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingWindow {
    /// Maximum consumption per window.
    limit: U256,
    /// Unix seconds at which the current window opened.
    window_start: u64,
    /// Amount consumed in the current window.
    consumed: U256,
    /// Window length in seconds.
    window_secs: u64,
}

impl RollingWindow {
    /// Create a budget whose first window opens at `now`.
    #[must_use]
    pub fn new(limit: U256, window_secs: u64, now: u64) -> Self {
        Self {
            limit,
            window_start: now,
            consumed: U256::zero(),
            window_secs,
        }
    }

    /// Reset the window if `now` has crossed its boundary.
    ///
    /// Returns `true` if a reset happened.
    pub fn roll(&mut self, now: u64) -> bool {
        if now >= self.window_start.saturating_add(self.window_secs) {
            self.window_start = now;
            self.consumed = U256::zero();
            true
        } else {
            false
        }
    }

    /// Budget left in the current window.
    #[must_use]
    pub fn remaining(&self) -> U256 {
        self.limit.saturating_sub(self.consumed)
    }

    /// Returns true once the current window's budget is used up.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.consumed >= self.limit
    }

    /// Fail if the current window's budget is already used up.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::Exhausted`] if nothing remains.
    pub fn ensure_available(&self) -> Result<(), BudgetError> {
        if self.is_exhausted() {
            return Err(BudgetError::Exhausted {
                consumed: self.consumed,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// Check that `amount` fits without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::Exceeded`] if `amount` is larger than what remains.
    pub fn check(&self, amount: U256) -> Result<(), BudgetError> {
        let remaining = self.remaining();
        if amount > remaining {
            return Err(BudgetError::Exceeded {
                requested: amount,
                remaining,
            });
        }
        Ok(())
    }

    /// Consume `amount` from the current window.
    ///
    /// The window is left untouched on failure.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::Exceeded`] if `amount` does not fit.
    pub fn try_consume(&mut self, amount: U256) -> Result<(), BudgetError> {
        self.check(amount)?;
        self.consumed += amount;
        Ok(())
    }

    /// Replace the per-window limit. Consumption so far is kept.
    pub fn set_limit(&mut self, limit: U256) {
        self.limit = limit;
    }

    /// Per-window limit.
    #[must_use]
    pub fn limit(&self) -> U256 {
        self.limit
    }

    /// Amount consumed in the current window.
    #[must_use]
    pub fn consumed(&self) -> U256 {
        self.consumed
    }

    /// Unix seconds at which the current window opened.
    #[must_use]
    pub fn window_start(&self) -> u64 {
        self.window_start
    }

    /// Window length in seconds.
    #[must_use]
    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }
}
