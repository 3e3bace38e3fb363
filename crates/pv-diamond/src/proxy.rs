//! # Diamond Proxy
//!
//! Single entry point that routes every call by selector to the facet bound
//! in the routing table, running the facet against the diamond's storage.
//!
//! ## Atomicity
//!
//! Storage is snapshotted before dispatch. On any error the snapshot is
//! restored and the call's events are dropped, so a failed call leaves no
//! trace. Custody transfers are the last step of the only call that makes
//! them, and a failed transfer is an error like any other.

use crate::config::DiamondConfig;
use crate::domain::cut::{DiamondCutArgs, FacetCut};
use crate::domain::services::deployment_address;
use crate::domain::storage::StorageArena;
use crate::domain::value_objects::{Address, Bytes, Selector};
use crate::errors::{DiamondError, GovernanceError, RoutingError};
use crate::events::DiamondEvent;
use crate::facets::{admin, diamond_cut, loupe, CallContext, Env, FacetDeployments, FacetKind};
use crate::ports::outbound::CustodyAccounts;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Output of a committed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    /// ABI-encoded return data.
    pub output: Bytes,
    /// Events emitted, in order.
    pub events: Vec<DiamondEvent>,
}

/// A diamond: routing table, storage and the facet code it can reach.
#[derive(Clone)]
pub struct Diamond {
    address: Address,
    storage: StorageArena,
    deployments: FacetDeployments,
    custody: Arc<dyn CustodyAccounts>,
}

impl std::fmt::Debug for Diamond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diamond")
            .field("address", &self.address)
            .field("owner", &self.storage.owner())
            .field("facets", &self.storage.diamond.registry.facet_addresses().len())
            .finish_non_exhaustive()
    }
}

impl Diamond {
    /// Construct a diamond that routes only `diamondCut`, to `cut_facet`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::NoFacetCode`] if nothing is deployed at
    /// `cut_facet`, or [`GovernanceError::ZeroOwner`] for a zero owner.
    pub fn new(
        address: Address,
        owner: Address,
        cut_facet: Address,
        deployments: FacetDeployments,
        custody: Arc<dyn CustodyAccounts>,
        config: &DiamondConfig,
        deployed_at: u64,
    ) -> Result<Self, DiamondError> {
        if owner.is_zero() {
            return Err(GovernanceError::ZeroOwner.into());
        }
        let mut storage = StorageArena::new(owner, config, deployed_at);
        storage.diamond.registry.apply(
            &[FacetCut::add(cut_facet, FacetKind::DiamondCut.selectors())],
            &deployments,
        )?;
        storage
            .diamond
            .supported_interfaces
            .extend(loupe::standard_interfaces());

        info!(%address, %owner, %cut_facet, "Diamond deployed");
        Ok(Self {
            address,
            storage,
            deployments,
            custody,
        })
    }

    /// Deploy every standard facet, cut loupe, ownership and admin in, and
    /// seed the admin set through the admin facet's initializer.
    ///
    /// # Errors
    ///
    /// Fails if the initializer rejects `admins` against the configured quorum.
    pub fn deploy_standard(
        owner: Address,
        admins: &[Address],
        config: &DiamondConfig,
        custody: Arc<dyn CustodyAccounts>,
        now: u64,
    ) -> Result<Self, DiamondError> {
        let deployments = FacetDeployments::standard();
        let mut diamond = Self::new(
            deployment_address("PetVaultDiamond"),
            owner,
            FacetKind::DiamondCut.default_address(),
            deployments,
            custody,
            config,
            now,
        )?;

        let cuts = [FacetKind::DiamondLoupe, FacetKind::Ownership, FacetKind::Admin]
            .into_iter()
            .map(|kind| FacetCut::add(kind.default_address(), kind.selectors()))
            .collect();
        let args = DiamondCutArgs::new(cuts).with_init(
            FacetKind::Admin.default_address(),
            admin::Function::initialize_admins(admins, config.initial_min_signatures),
        );
        diamond.call(CallContext::new(owner, now), diamond_cut::Function::call(&args).as_slice())?;

        Ok(diamond)
    }

    /// Address of the diamond.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current storage, for inspection.
    #[must_use]
    pub fn storage(&self) -> &StorageArena {
        &self.storage
    }

    /// Deployed facet code.
    #[must_use]
    pub fn deployments(&self) -> &FacetDeployments {
        &self.deployments
    }

    /// Make another facet kind available at `address`.
    pub fn deploy_facet(&mut self, address: Address, kind: FacetKind) {
        self.deployments.deploy(address, kind);
    }

    /// Facet bound to `selector`.
    #[must_use]
    pub fn resolve(&self, selector: Selector) -> Option<Address> {
        self.storage.diamond.registry.resolve(selector)
    }

    /// Route and execute `calldata`, committing on success only.
    ///
    /// # Errors
    ///
    /// Returns the routing or facet error; storage is then unchanged.
    pub fn call(&mut self, ctx: CallContext, calldata: &[u8]) -> Result<CallOutcome, DiamondError> {
        let snapshot = self.storage.clone();
        let mut events = Vec::new();

        match self.dispatch(ctx, calldata, &mut events) {
            Ok(output) => {
                debug!(caller = %ctx.caller, events = events.len(), "Call committed");
                Ok(CallOutcome { output, events })
            }
            Err(err) => {
                self.storage = snapshot;
                warn!(caller = %ctx.caller, error = %err, "Call reverted");
                Err(err)
            }
        }
    }

    /// Route and execute `calldata` read-only; nothing is ever committed.
    ///
    /// # Errors
    ///
    /// Returns the routing or facet error, or
    /// [`RoutingError::StaticCallViolation`] for a state-changing function.
    pub fn static_call(&self, ctx: CallContext, calldata: &[u8]) -> Result<Bytes, DiamondError> {
        let mut scratch = self.clone();
        let mut events = Vec::new();
        scratch.dispatch(ctx.into_static(), calldata, &mut events)
    }

    fn dispatch(
        &mut self,
        ctx: CallContext,
        calldata: &[u8],
        events: &mut Vec<DiamondEvent>,
    ) -> Result<Bytes, DiamondError> {
        let selector = Selector::from_calldata(calldata)
            .ok_or(RoutingError::CalldataTooShort { len: calldata.len() })?;
        let facet = self
            .storage
            .diamond
            .registry
            .resolve(selector)
            .ok_or(RoutingError::FunctionNotFound(selector))?;

        debug!(%selector, %facet, caller = %ctx.caller, "Dispatching");
        let kind = self
            .deployments
            .kind_at(facet)
            .ok_or(RoutingError::NoFacetCode { facet })?;
        let mut env = Env {
            ctx,
            storage: &mut self.storage,
            deployments: &self.deployments,
            custody: self.custody.as_ref(),
            events,
            diamond: self.address,
            depth: 0,
        };
        kind.invoke(&mut env, calldata)
    }
}
