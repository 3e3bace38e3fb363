//! # Shared Types Crate
//!
//! Building blocks shared by every PetVault crate that carry no protocol
//! semantics of their own.
//!
//! ## Contents
//!
//! - **Compaction**: [`swap_remove_reindex`] removes an entry from a dense
//!   list in O(1) by moving the last entry into the hole, and reports which
//!   entry moved so the caller can fix its recorded index.
//! - **Rolling budget**: [`RollingWindow`] bounds cumulative consumption per
//!   time window, resetting lazily on first access past the boundary.

pub mod compaction;
pub mod errors;
pub mod rate_limiter;

pub use compaction::{swap_remove_reindex, SwapRemoval};
pub use errors::*;
pub use rate_limiter::RollingWindow;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;
