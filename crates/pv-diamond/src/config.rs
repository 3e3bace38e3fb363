//! Diamond configuration from defaults, environment variables or JSON.

use crate::domain::governance::ClassDelays;
use crate::domain::value_objects::U256;
use serde::{Deserialize, Serialize};
use std::env;

/// One ether in wei.
const ETHER: u64 = 1_000_000_000_000_000_000;

/// Governance and withdrawal parameters fixed at deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiamondConfig {
    /// Timelock delay of emergency actions, in seconds.
    pub emergency_delay_secs: u64,

    /// Timelock delay of every other operation class, in seconds.
    pub standard_delay_secs: u64,

    /// Quorum until `initializeAdmins` or a limits update changes it.
    pub initial_min_signatures: u64,

    /// Global withdrawal budget per window, in wei.
    pub global_daily_limit: U256,

    /// Per-user withdrawal budget per window, in wei.
    pub user_daily_limit: U256,

    /// Length of a withdrawal window, in seconds.
    pub withdrawal_window_secs: u64,
}

impl Default for DiamondConfig {
    fn default() -> Self {
        Self {
            emergency_delay_secs: 3_600,
            standard_delay_secs: 86_400,
            initial_min_signatures: 2,
            global_daily_limit: U256::from(ETHER) * U256::from(100),
            user_daily_limit: U256::from(ETHER) * U256::from(10),
            withdrawal_window_secs: 86_400,
        }
    }
}

impl DiamondConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PV_EMERGENCY_DELAY_SECS`: emergency timelock (default: 3600)
    /// - `PV_STANDARD_DELAY_SECS`: standard timelock (default: 86400)
    /// - `PV_MIN_SIGNATURES`: initial quorum (default: 2)
    /// - `PV_GLOBAL_DAILY_LIMIT`: global budget in wei, decimal (default: 100 ether)
    /// - `PV_USER_DAILY_LIMIT`: per-user budget in wei, decimal (default: 10 ether)
    /// - `PV_WITHDRAWAL_WINDOW_SECS`: budget window (default: 86400)
    ///
    /// Unparsable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            emergency_delay_secs: env_u64("PV_EMERGENCY_DELAY_SECS")
                .unwrap_or(defaults.emergency_delay_secs),

            standard_delay_secs: env_u64("PV_STANDARD_DELAY_SECS")
                .unwrap_or(defaults.standard_delay_secs),

            initial_min_signatures: env_u64("PV_MIN_SIGNATURES")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.initial_min_signatures),

            global_daily_limit: env_u256("PV_GLOBAL_DAILY_LIMIT")
                .unwrap_or(defaults.global_daily_limit),

            user_daily_limit: env_u256("PV_USER_DAILY_LIMIT")
                .unwrap_or(defaults.user_daily_limit),

            withdrawal_window_secs: env_u64("PV_WITHDRAWAL_WINDOW_SECS")
                .unwrap_or(defaults.withdrawal_window_secs),
        }
    }

    /// Parse configuration from JSON. Missing fields take their default.
    ///
    /// # Errors
    ///
    /// Returns the parser error for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Small budgets for tests; delays stay at their defaults.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            emergency_delay_secs: 3_600,
            standard_delay_secs: 86_400,
            initial_min_signatures: 2,
            global_daily_limit: U256::from(100),
            user_daily_limit: U256::from(100),
            withdrawal_window_secs: 86_400,
        }
    }

    /// Timelock delays per operation class.
    #[must_use]
    pub fn delays(&self) -> ClassDelays {
        ClassDelays {
            emergency_secs: self.emergency_delay_secs,
            standard_secs: self.standard_delay_secs,
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_u256(key: &str) -> Option<U256> {
    env::var(key)
        .ok()
        .and_then(|v| U256::from_dec_str(v.trim()).ok())
}
