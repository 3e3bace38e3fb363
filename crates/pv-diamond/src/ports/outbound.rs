//! # Driven Ports (SPI - Outbound)
//!
//! External systems the diamond depends on.

use crate::domain::value_objects::{Address, U256};
use crate::errors::CustodyError;

// =============================================================================
// CUSTODY ACCOUNTS
// =============================================================================

/// Per-user custody accounts holding savings outside the diamond.
///
/// Calls are synchronous: a diamond call is one non-preemptible unit, and the
/// custody transfer is its final step.
///
/// ## Implementation Notes
///
/// A failed transfer must surface as `Err`. The diamond has already applied
/// its own effects when it transfers, and only an `Err` rolls them back.
pub trait CustodyAccounts: Send + Sync {
    /// Current balance of a custody account.
    ///
    /// # Errors
    ///
    /// Returns [`CustodyError::Unavailable`] if the account cannot be read.
    fn balance_of(&self, account: Address) -> Result<U256, CustodyError>;

    /// Move `amount` out of `account` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`CustodyError::TransferFailed`] if nothing was moved.
    fn transfer(&self, account: Address, to: Address, amount: U256) -> Result<(), CustodyError>;
}
