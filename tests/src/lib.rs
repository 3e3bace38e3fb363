//! # PetVault Test Suite
//!
//! End-to-end scenarios driven through the diamond's calldata path.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── mod.rs          # Harness: deployed diamond, custody, clock
//!     ├── routing.rs      # Cuts, compaction, loupe views
//!     ├── governance.rs   # Propose/sign/execute, shutdown, upgrades
//!     └── withdrawal.rs   # Rolling budgets, custody rollback
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pv-tests
//! cargo test -p pv-tests integration::governance::
//! ```

#![allow(dead_code)]

pub mod integration;
