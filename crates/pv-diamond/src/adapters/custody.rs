//! # Custody Adapter
//!
//! In-memory custody accounts for tests and local runs.
//! A production adapter would call the custody contracts.

use crate::domain::value_objects::{Address, U256};
use crate::errors::CustodyError;
use crate::ports::outbound::CustodyAccounts;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// In-memory balances keyed by account.
#[derive(Debug, Default)]
pub struct InMemoryCustody {
    balances: RwLock<HashMap<Address, U256>>,
    /// Accounts whose transfers fail.
    failing: RwLock<HashSet<Address>>,
}

impl InMemoryCustody {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `account`.
    pub fn fund(&self, account: Address, amount: U256) {
        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        let balance = balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Make transfers out of `account` fail (or succeed again).
    pub fn set_failing(&self, account: Address, failing: bool) {
        let mut set = self.failing.write().unwrap_or_else(PoisonError::into_inner);
        if failing {
            set.insert(account);
        } else {
            set.remove(&account);
        }
    }

    /// Current balance; zero for unknown accounts.
    #[must_use]
    pub fn balance(&self, account: Address) -> U256 {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&account)
            .copied()
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> CustodyError {
    CustodyError::Unavailable("custody ledger lock poisoned".to_string())
}

impl CustodyAccounts for InMemoryCustody {
    fn balance_of(&self, account: Address) -> Result<U256, CustodyError> {
        let balances = self.balances.read().map_err(poisoned)?;
        Ok(balances.get(&account).copied().unwrap_or_default())
    }

    fn transfer(&self, account: Address, to: Address, amount: U256) -> Result<(), CustodyError> {
        if self.failing.read().map_err(poisoned)?.contains(&account) {
            return Err(CustodyError::TransferFailed {
                account,
                reason: "transfer rejected".to_string(),
            });
        }

        let mut balances = self.balances.write().map_err(poisoned)?;
        let available = balances.get(&account).copied().unwrap_or_default();
        if available < amount {
            return Err(CustodyError::TransferFailed {
                account,
                reason: format!("insufficient balance: {available} < {amount}"),
            });
        }
        balances.insert(account, available - amount);
        let credited = balances.entry(to).or_default();
        *credited = credited.saturating_add(amount);

        debug!(%account, %to, %amount, "Custody transfer");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
