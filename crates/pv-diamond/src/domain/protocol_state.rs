//! # Protocol Pause State
//!
//! Pause levels and the one-way shutdown, modelled as a typestate:
//! [`ProtocolStatus::Live`] carries a [`LiveState`] whose level can change;
//! [`ProtocolStatus::Shutdown`] carries a [`ShutdownState`] that exposes no
//! setter at all, and nothing converts it back.

use crate::errors::ProtocolStateError;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// PAUSE LEVEL
// =============================================================================

/// Coarse pause level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PauseLevel {
    /// Everything allowed.
    FullyActive = 0,
    /// Only deposits allowed.
    DepositsOnly = 1,
    /// Only withdrawals allowed.
    WithdrawalsOnly = 2,
    /// Nothing allowed.
    FullyPaused = 3,
}

impl PauseLevel {
    fn allows(self, action: ProtocolAction) -> bool {
        match action {
            ProtocolAction::Deposit => matches!(self, Self::FullyActive | Self::DepositsOnly),
            ProtocolAction::Withdraw | ProtocolAction::EmergencyWithdraw => {
                matches!(self, Self::FullyActive | Self::WithdrawalsOnly)
            }
        }
    }
}

impl TryFrom<u8> for PauseLevel {
    type Error = ProtocolStateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::FullyActive),
            1 => Ok(Self::DepositsOnly),
            2 => Ok(Self::WithdrawalsOnly),
            3 => Ok(Self::FullyPaused),
            other => Err(ProtocolStateError::InvalidPauseLevel(other)),
        }
    }
}

impl fmt::Display for PauseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FullyActive => "fully active",
            Self::DepositsOnly => "deposits only",
            Self::WithdrawalsOnly => "withdrawals only",
            Self::FullyPaused => "fully paused",
        };
        f.write_str(name)
    }
}

// =============================================================================
// PROTOCOL ACTION
// =============================================================================

/// Actions gated by the pause level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProtocolAction {
    /// Savings deposits.
    Deposit = 0,
    /// Regular savings withdrawals.
    Withdraw = 1,
    /// Admin-driven rate-limited withdrawal out of custody.
    EmergencyWithdraw = 2,
}

impl TryFrom<u8> for ProtocolAction {
    type Error = ProtocolStateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Deposit),
            1 => Ok(Self::Withdraw),
            2 => Ok(Self::EmergencyWithdraw),
            other => Err(ProtocolStateError::InvalidAction(other)),
        }
    }
}

impl fmt::Display for ProtocolAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::EmergencyWithdraw => "emergency withdraw",
        };
        f.write_str(name)
    }
}

// =============================================================================
// TYPESTATE
// =============================================================================

/// A protocol that has not been shut down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveState {
    level: PauseLevel,
    changed_at: u64,
}

impl LiveState {
    /// Current pause level.
    #[must_use]
    pub fn level(&self) -> PauseLevel {
        self.level
    }

    /// Move to `level`, recording `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolStateError::Unchanged`] if `level` is already active.
    pub fn set_level(&mut self, level: PauseLevel, now: u64) -> Result<(), ProtocolStateError> {
        if self.level == level {
            return Err(ProtocolStateError::Unchanged(level));
        }
        self.level = level;
        self.changed_at = now;
        Ok(())
    }
}

/// A shut-down protocol: fully paused, withdrawals forced open, forever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownState {
    since: u64,
}

impl ShutdownState {
    /// Unix seconds at which shutdown happened.
    #[must_use]
    pub fn since(&self) -> u64 {
        self.since
    }
}

/// Pause state of the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolStatus {
    /// Pause level may still change.
    Live(LiveState),
    /// Terminal.
    Shutdown(ShutdownState),
}

impl ProtocolStatus {
    /// A fresh, fully active protocol.
    #[must_use]
    pub fn new(now: u64) -> Self {
        Self::Live(LiveState {
            level: PauseLevel::FullyActive,
            changed_at: now,
        })
    }

    /// Effective pause level; always fully paused after shutdown.
    #[must_use]
    pub fn level(&self) -> PauseLevel {
        match self {
            Self::Live(live) => live.level,
            Self::Shutdown(_) => PauseLevel::FullyPaused,
        }
    }

    /// Returns true once shut down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown(_))
    }

    /// Unix seconds of the last transition.
    #[must_use]
    pub fn changed_at(&self) -> u64 {
        match self {
            Self::Live(live) => live.changed_at,
            Self::Shutdown(shutdown) => shutdown.since,
        }
    }

    /// Whether `action` is currently permitted.
    ///
    /// After shutdown only withdrawals are permitted, whatever the level.
    #[must_use]
    pub fn is_allowed(&self, action: ProtocolAction) -> bool {
        match self {
            Self::Live(live) => live.level.allows(action),
            Self::Shutdown(_) => matches!(
                action,
                ProtocolAction::Withdraw | ProtocolAction::EmergencyWithdraw
            ),
        }
    }

    /// Fail unless `action` is currently permitted.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolStateError::ActionNotAllowed`].
    pub fn ensure_allowed(&self, action: ProtocolAction) -> Result<(), ProtocolStateError> {
        if self.is_allowed(action) {
            Ok(())
        } else {
            Err(ProtocolStateError::ActionNotAllowed {
                action,
                level: self.level(),
            })
        }
    }

    /// Mutable access to the live state.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolStateError::Shutdown`] after shutdown.
    pub fn live_mut(&mut self) -> Result<&mut LiveState, ProtocolStateError> {
        match self {
            Self::Live(live) => Ok(live),
            Self::Shutdown(_) => Err(ProtocolStateError::Shutdown),
        }
    }

    /// Enter the terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolStateError::Shutdown`] if already shut down.
    pub fn shut_down(&mut self, now: u64) -> Result<(), ProtocolStateError> {
        if self.is_shutdown() {
            return Err(ProtocolStateError::Shutdown);
        }
        *self = Self::Shutdown(ShutdownState { since: now });
        Ok(())
    }
}
