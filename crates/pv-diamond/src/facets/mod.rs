//! # Facets
//!
//! The closed set of facet kinds a diamond can route to, and the execution
//! environment they run in.
//!
//! A facet runs in the diamond's storage context: it reads and writes the
//! diamond's [`StorageArena`] and sees the original caller, the way a
//! `DELEGATECALL` would. [`FacetDeployments`] stands in for "code at
//! address": a facet address is executable only if a kind is deployed there.
//!
//! | Kind | Module | Interface |
//! |------|--------|-----------|
//! | `DiamondCut` | `diamond_cut.rs` | IDiamondCut |
//! | `DiamondLoupe` | `loupe.rs` | IDiamondLoupe, ERC-165 |
//! | `Ownership` | `ownership.rs` | ERC-173 |
//! | `Admin` | `admin.rs` | governance, pause, withdrawal |

pub mod admin;
pub mod diamond_cut;
pub mod loupe;
pub mod ownership;

use crate::abi::{self, Token};
use crate::domain::registry::CodeOracle;
use crate::domain::services::deployment_address;
use crate::domain::storage::StorageArena;
use crate::domain::value_objects::{Address, Bytes, Selector, U256};
use crate::errors::{AuthError, DiamondError, RoutingError};
use crate::events::DiamondEvent;
use crate::ports::outbound::CustodyAccounts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// Deepest allowed chain of nested facet executions (cut → init → ...).
pub const MAX_DELEGATE_DEPTH: u16 = 8;

// =============================================================================
// FACET FUNCTIONS
// =============================================================================

/// The external functions one facet exposes.
pub trait FacetFunction: Copy + Sized + 'static {
    /// Every function of the facet.
    const ALL: &'static [Self];

    /// Canonical signature, e.g. `owner()`.
    fn signature(self) -> &'static str;

    /// Returns true if the function never writes state.
    fn is_view(self) -> bool;

    /// 4-byte selector of the signature.
    fn selector(self) -> Selector {
        Selector::from_signature(self.signature())
    }

    /// Function for a selector, if this facet has one.
    fn from_selector(selector: Selector) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.selector() == selector)
    }

    /// Selectors of every function, in declaration order.
    #[must_use]
    fn selectors() -> Vec<Selector> {
        Self::ALL.iter().map(|f| f.selector()).collect()
    }

    /// Build call data for this function.
    fn encode_call(self, args: &[Token]) -> Bytes {
        abi::encode_call(self.selector(), args)
    }
}

// =============================================================================
// FACET KINDS & DEPLOYMENTS
// =============================================================================

/// A deployable facet implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacetKind {
    /// Routing updates.
    DiamondCut,
    /// Routing introspection.
    DiamondLoupe,
    /// ERC-173 ownership.
    Ownership,
    /// Governance, pause and withdrawal.
    Admin,
}

impl FacetKind {
    /// Every kind.
    pub const ALL: [FacetKind; 4] = [
        Self::DiamondCut,
        Self::DiamondLoupe,
        Self::Ownership,
        Self::Admin,
    ];

    /// Contract name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DiamondCut => "DiamondCutFacet",
            Self::DiamondLoupe => "DiamondLoupeFacet",
            Self::Ownership => "OwnershipFacet",
            Self::Admin => "AdminFacet",
        }
    }

    /// Selectors this kind implements.
    #[must_use]
    pub fn selectors(self) -> Vec<Selector> {
        match self {
            Self::DiamondCut => diamond_cut::Function::selectors(),
            Self::DiamondLoupe => loupe::Function::selectors(),
            Self::Ownership => ownership::Function::selectors(),
            Self::Admin => admin::Function::selectors(),
        }
    }

    /// Deterministic address of the standard deployment.
    #[must_use]
    pub fn default_address(self) -> Address {
        deployment_address(self.name())
    }

    /// Run `calldata` against this facet.
    ///
    /// # Errors
    ///
    /// Returns whatever the facet function fails with.
    pub fn invoke(self, env: &mut Env<'_>, calldata: &[u8]) -> Result<Bytes, DiamondError> {
        let selector = Selector::from_calldata(calldata)
            .ok_or(RoutingError::CalldataTooShort { len: calldata.len() })?;
        trace!(facet = self.name(), %selector, depth = env.depth, "Facet invoked");

        match self {
            Self::DiamondCut => {
                let function = env.function(selector)?;
                diamond_cut::invoke(env, function, calldata)
            }
            Self::DiamondLoupe => {
                let function = env.function(selector)?;
                loupe::invoke(env, function, calldata)
            }
            Self::Ownership => {
                let function = env.function(selector)?;
                ownership::invoke(env, function, calldata)
            }
            Self::Admin => {
                let function = env.function(selector)?;
                admin::invoke(env, function, calldata)
            }
        }
    }
}

/// Which facet kind is deployed at which address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetDeployments {
    deployed: HashMap<Address, FacetKind>,
}

impl FacetDeployments {
    /// No deployments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every kind at its default address.
    #[must_use]
    pub fn standard() -> Self {
        let mut deployments = Self::new();
        for kind in FacetKind::ALL {
            deployments.deploy(kind.default_address(), kind);
        }
        deployments
    }

    /// Record `kind` as deployed at `address`.
    pub fn deploy(&mut self, address: Address, kind: FacetKind) {
        self.deployed.insert(address, kind);
    }

    /// Kind deployed at `address`.
    #[must_use]
    pub fn kind_at(&self, address: Address) -> Option<FacetKind> {
        self.deployed.get(&address).copied()
    }
}

impl CodeOracle for FacetDeployments {
    fn has_code(&self, address: Address) -> bool {
        self.deployed.contains_key(&address)
    }
}

// =============================================================================
// EXECUTION ENVIRONMENT
// =============================================================================

/// Message-level context of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Original sender; preserved across nested facet execution.
    pub caller: Address,
    /// Attached value in wei.
    pub value: U256,
    /// Unix seconds.
    pub timestamp: u64,
    /// Refuse state-changing functions.
    pub is_static: bool,
}

impl CallContext {
    /// A state-changing call carrying no value.
    #[must_use]
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self {
            caller,
            value: U256::zero(),
            timestamp,
            is_static: false,
        }
    }

    /// The same context, read-only.
    #[must_use]
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }
}

/// What a facet function can see and touch.
pub struct Env<'a> {
    /// Message context.
    pub ctx: CallContext,
    /// The diamond's storage.
    pub storage: &'a mut StorageArena,
    /// Deployed facet code.
    pub deployments: &'a FacetDeployments,
    /// External custody accounts.
    pub custody: &'a dyn CustodyAccounts,
    /// Events emitted so far by this call.
    pub events: &'a mut Vec<DiamondEvent>,
    /// Address of the diamond itself.
    pub diamond: Address,
    /// Nesting depth; 0 for the routed call.
    pub depth: u16,
}

impl Env<'_> {
    /// Execute `calldata` against the facet deployed at `facet`, in this
    /// storage context and with this caller.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::NoFacetCode`] if nothing is deployed there,
    /// [`RoutingError::DelegateDepthExceeded`] past the nesting limit, or the
    /// facet's own error.
    pub fn delegate(&mut self, facet: Address, calldata: &[u8]) -> Result<Bytes, DiamondError> {
        let kind = self
            .deployments
            .kind_at(facet)
            .ok_or(RoutingError::NoFacetCode { facet })?;
        if self.depth >= MAX_DELEGATE_DEPTH {
            return Err(RoutingError::DelegateDepthExceeded {
                depth: self.depth + 1,
                max: MAX_DELEGATE_DEPTH,
            }
            .into());
        }

        let mut child = Env {
            ctx: self.ctx,
            storage: &mut *self.storage,
            deployments: self.deployments,
            custody: self.custody,
            events: &mut *self.events,
            diamond: self.diamond,
            depth: self.depth + 1,
        };
        kind.invoke(&mut child, calldata)
    }

    /// Caller of the current call.
    #[must_use]
    pub fn caller(&self) -> Address {
        self.ctx.caller
    }

    /// Timestamp of the current call.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.ctx.timestamp
    }

    /// Record an event.
    pub fn emit(&mut self, event: DiamondEvent) {
        self.events.push(event);
    }

    /// Fail unless the caller owns the diamond.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotOwner`].
    pub fn require_owner(&self) -> Result<(), AuthError> {
        if self.caller() == self.storage.owner() {
            Ok(())
        } else {
            Err(AuthError::NotOwner {
                caller: self.caller(),
            })
        }
    }

    /// Fail unless the caller is an admin (the owner included).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAdmin`].
    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.storage.is_admin(self.caller()) {
            Ok(())
        } else {
            Err(AuthError::NotAdmin {
                caller: self.caller(),
            })
        }
    }

    /// Resolve `selector` within facet `F`, refusing writes in static calls.
    fn function<F: FacetFunction>(&self, selector: Selector) -> Result<F, RoutingError> {
        let function = F::from_selector(selector).ok_or(RoutingError::FunctionNotFound(selector))?;
        if self.ctx.is_static && !function.is_view() {
            return Err(RoutingError::StaticCallViolation(selector));
        }
        Ok(function)
    }
}
