//! # PetVault Diamond - Modular Dispatch and Governance
//!
//! ## Purpose
//!
//! A single long-lived diamond (EIP-2535) that routes every call by its
//! 4-byte selector to a facet, runs the facet against the diamond's own
//! namespaced storage, and guards privileged changes behind a
//! multi-signature timelock.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Every routed selector resolves to exactly one facet with code | `domain/registry.rs` - `FacetRegistry::apply()` |
//! | Routing indices point back at their entries | `domain/registry.rs` - `verify_indices()` |
//! | A cut batch applies entirely or not at all | `domain/registry.rs` - `apply()` works on a copy |
//! | A failed call leaves no trace | `proxy.rs` - `Diamond::call()` restores the snapshot |
//! | Static calls never change state | `facets/mod.rs` - `Env::function()` |
//! | Nested execution depth is bounded | `facets/mod.rs` - `MAX_DELEGATE_DEPTH` |
//! | Operations execute once, after their timelock, with quorum | `domain/governance.rs` - `Timelock::execute()` |
//! | Shutdown is terminal | `domain/protocol_state.rs` - `ProtocolStatus` |
//! | Withdrawals never exceed either rolling budget | `domain/withdrawal.rs` - `WithdrawalLimits::consume()` |
//!
//! ## Facets
//!
//! | Facet | Location | Purpose |
//! |-------|----------|---------|
//! | DiamondCut | `facets/diamond_cut.rs` | Add, replace, remove selectors |
//! | DiamondLoupe | `facets/loupe.rs` | Introspection, ERC-165 |
//! | Ownership | `facets/ownership.rs` | ERC-173 owner |
//! | Admin | `facets/admin.rs` | Governance, pause, emergency withdrawal |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `CustodyAccounts` | Balances and transfers of per-user custody accounts |
//!
//! ## Usage Example
//!
//! ```ignore
//! use pv_diamond::prelude::*;
//!
//! let diamond = Diamond::deploy_standard(owner, &admins, &config, custody, now)?;
//! let service = DiamondService::new(diamond, ServiceConfig::default());
//!
//! let calldata = admin::Function::propose(&OperationParams::Emergency(EmergencyAction::Shutdown));
//! let receipt = service.call(CallRequest::new(owner, now, calldata)).await?;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod abi;
pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod facets;
pub mod ports;
pub mod proxy;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Value objects
    pub use crate::domain::value_objects::{Address, Bytes, Hash, Selector, U256};

    // Routing
    pub use crate::domain::cut::{DiamondCutArgs, FacetCut, FacetCutAction};
    pub use crate::domain::registry::FacetRegistry;

    // Governance and protocol state
    pub use crate::domain::governance::{
        EmergencyAction, OperationClass, OperationParams, PendingOperation, Timelock,
    };
    pub use crate::domain::protocol_state::{PauseLevel, ProtocolAction, ProtocolStatus};
    pub use crate::domain::withdrawal::{WindowSnapshot, WithdrawalLimits};

    // Facets
    pub use crate::facets::{
        admin, diamond_cut, loupe, ownership, CallContext, FacetDeployments, FacetFunction,
        FacetKind,
    };

    // Ports
    pub use crate::ports::inbound::{CallReceipt, CallRequest, DiamondApi};
    pub use crate::ports::outbound::CustodyAccounts;

    // Events
    pub use crate::events::DiamondEvent;

    // Errors
    pub use crate::errors::{DiamondError, ErrorKind};

    // Adapters
    pub use crate::adapters::InMemoryCustody;

    // Configuration
    pub use crate::config::DiamondConfig;

    // Proxy and service
    pub use crate::proxy::{CallOutcome, Diamond};
    pub use crate::service::{create_test_service, DiamondService, ServiceConfig, ServiceStats};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
