//! # Withdrawal Budgets
//!
//! One global rolling window plus one window per user. User windows are
//! created on first access with the configured per-user limit.
//!
//! A withdrawal consumes both budgets or neither.

use crate::domain::value_objects::{Address, U256};
use crate::errors::RateLimitError;
use serde::{Deserialize, Serialize};
use shared_types::RollingWindow;
use std::collections::HashMap;

/// Point-in-time view of one budget, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    /// Per-window limit.
    pub limit: U256,
    /// Unix seconds at which the window opened.
    pub window_start: u64,
    /// Amount withdrawn in the window.
    pub withdrawn: U256,
}

impl WindowSnapshot {
    fn project(window: &RollingWindow, now: u64) -> Self {
        let mut window = window.clone();
        window.roll(now);
        Self {
            limit: window.limit(),
            window_start: window.window_start(),
            withdrawn: window.consumed(),
        }
    }
}

/// Global and per-user daily withdrawal budgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalLimits {
    global: RollingWindow,
    users: HashMap<Address, RollingWindow>,
    user_daily_limit: U256,
    window_secs: u64,
}

impl WithdrawalLimits {
    /// Fresh budgets; the global window opens at `now`.
    #[must_use]
    pub fn new(global_daily_limit: U256, user_daily_limit: U256, window_secs: u64, now: u64) -> Self {
        Self {
            global: RollingWindow::new(global_daily_limit, window_secs, now),
            users: HashMap::new(),
            user_daily_limit,
            window_secs,
        }
    }

    /// Lazily reset the global window and `user`'s window.
    pub fn roll(&mut self, user: Address, now: u64) {
        self.global.roll(now);
        let (limit, window_secs) = (self.user_daily_limit, self.window_secs);
        self.users
            .entry(user)
            .or_insert_with(|| RollingWindow::new(limit, window_secs, now))
            .roll(now);
    }

    /// Fail if either budget is already used up.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::UserLimitReached`] or
    /// [`RateLimitError::GlobalLimitReached`].
    pub fn ensure_available(&self, user: Address) -> Result<(), RateLimitError> {
        if let Some(window) = self.users.get(&user) {
            window
                .ensure_available()
                .map_err(|e| RateLimitError::for_user(user, e))?;
        } else if self.user_daily_limit.is_zero() {
            return Err(RateLimitError::UserLimitReached { user });
        }
        self.global
            .ensure_available()
            .map_err(RateLimitError::for_global)
    }

    /// Consume `amount` from both budgets.
    ///
    /// Both budgets are checked before either is touched.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::UserLimitExceeded`] or
    /// [`RateLimitError::GlobalLimitExceeded`]; nothing is consumed.
    pub fn consume(&mut self, user: Address, amount: U256, now: u64) -> Result<(), RateLimitError> {
        self.roll(user, now);
        let user_window = self
            .users
            .get_mut(&user)
            .ok_or(RateLimitError::UserLimitReached { user })?;

        user_window
            .check(amount)
            .map_err(|e| RateLimitError::for_user(user, e))?;
        self.global
            .check(amount)
            .map_err(RateLimitError::for_global)?;

        user_window
            .try_consume(amount)
            .map_err(|e| RateLimitError::for_user(user, e))?;
        self.global
            .try_consume(amount)
            .map_err(RateLimitError::for_global)
    }

    /// Replace the global per-window limit.
    pub fn set_global_limit(&mut self, limit: U256) {
        self.global.set_limit(limit);
    }

    /// Global budget as it would read at `now`.
    #[must_use]
    pub fn global_snapshot(&self, now: u64) -> WindowSnapshot {
        WindowSnapshot::project(&self.global, now)
    }

    /// `user`'s budget as it would read at `now`.
    #[must_use]
    pub fn user_snapshot(&self, user: Address, now: u64) -> WindowSnapshot {
        match self.users.get(&user) {
            Some(window) => WindowSnapshot::project(window, now),
            None => WindowSnapshot {
                limit: self.user_daily_limit,
                window_start: now,
                withdrawn: U256::zero(),
            },
        }
    }
}
