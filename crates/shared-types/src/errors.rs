//! # Error Types
//!
//! Errors raised by the shared building blocks.

use primitive_types::U256;
use thiserror::Error;

/// Errors from dense-list compaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    /// Index does not address a live entry.
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Errors from rolling-window budgets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetError {
    /// The window's budget is already fully consumed.
    #[error("budget exhausted: {consumed} of {limit} consumed")]
    Exhausted { consumed: U256, limit: U256 },

    /// Consuming the requested amount would overshoot the budget.
    #[error("budget exceeded: requested {requested}, remaining {remaining}")]
    Exceeded { requested: U256, remaining: U256 },
}
