//! # Namespaced Storage Regions
//!
//! Facets share one storage space. Each concern owns a region addressed by
//! `keccak256(namespace)`, so regions never overlap and adding a facet never
//! shifts another facet's state.
//!
//! The whole arena is `Clone`: the proxy snapshots it before a call and
//! restores the snapshot if the call fails.

use crate::config::DiamondConfig;
use crate::domain::governance::Timelock;
use crate::domain::protocol_state::ProtocolStatus;
use crate::domain::registry::FacetRegistry;
use crate::domain::services::storage_slot;
use crate::domain::value_objects::{Address, Hash, Selector};
use crate::domain::withdrawal::WithdrawalLimits;
use crate::errors::GovernanceError;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Routing table, ownership and ERC-165 flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiamondStorage {
    /// Selector routing.
    pub registry: FacetRegistry,
    /// Interface ids answered `true` by `supportsInterface`.
    pub supported_interfaces: HashSet<Selector>,
    /// ERC-173 owner; implicitly an admin.
    pub owner: Address,
}

impl DiamondStorage {
    /// Region namespace.
    pub const NAMESPACE: &'static str = "diamond.standard.diamond.storage";

    /// Region slot.
    #[must_use]
    pub fn slot() -> Hash {
        storage_slot(Self::NAMESPACE)
    }
}

/// Governance state: admins, timelock, pause status, withdrawal budgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminStorage {
    /// Explicit admins. The owner is an admin without being listed.
    pub admins: BTreeSet<Address>,
    /// Set once by `initializeAdmins`.
    pub initialized: bool,
    /// Pending and executed operations.
    pub timelock: Timelock,
    /// Pause level and shutdown flag.
    pub status: ProtocolStatus,
    /// Withdrawal budgets.
    pub limits: WithdrawalLimits,
}

impl AdminStorage {
    /// Region namespace.
    pub const NAMESPACE: &'static str = "petvault.admin.storage";

    /// Region slot.
    #[must_use]
    pub fn slot() -> Hash {
        storage_slot(Self::NAMESPACE)
    }
}

/// User to custody account links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavingsStorage {
    /// Custody account holding each user's funds.
    pub custody_accounts: HashMap<Address, Address>,
}

impl SavingsStorage {
    /// Region namespace.
    pub const NAMESPACE: &'static str = "petvault.savings.storage";

    /// Region slot.
    #[must_use]
    pub fn slot() -> Hash {
        storage_slot(Self::NAMESPACE)
    }
}

/// All storage regions of one diamond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageArena {
    /// Diamond region.
    pub diamond: DiamondStorage,
    /// Admin region.
    pub admin: AdminStorage,
    /// Savings region.
    pub savings: SavingsStorage,
}

impl StorageArena {
    /// Fresh storage for a diamond deployed at `now`.
    #[must_use]
    pub fn new(owner: Address, config: &DiamondConfig, now: u64) -> Self {
        Self {
            diamond: DiamondStorage {
                registry: FacetRegistry::new(),
                supported_interfaces: HashSet::new(),
                owner,
            },
            admin: AdminStorage {
                admins: BTreeSet::new(),
                initialized: false,
                timelock: Timelock::new(config.initial_min_signatures, config.delays()),
                status: ProtocolStatus::new(now),
                limits: WithdrawalLimits::new(
                    config.global_daily_limit,
                    config.user_daily_limit,
                    config.withdrawal_window_secs,
                    now,
                ),
            },
            savings: SavingsStorage::default(),
        }
    }

    /// Namespace and slot of every region.
    #[must_use]
    pub fn slots() -> [(&'static str, Hash); 3] {
        [
            (DiamondStorage::NAMESPACE, DiamondStorage::slot()),
            (AdminStorage::NAMESPACE, AdminStorage::slot()),
            (SavingsStorage::NAMESPACE, SavingsStorage::slot()),
        ]
    }

    /// Current owner.
    #[must_use]
    pub fn owner(&self) -> Address {
        self.diamond.owner
    }

    /// Owner or listed admin. The zero address never is.
    #[must_use]
    pub fn is_admin(&self, account: Address) -> bool {
        !account.is_zero()
            && (account == self.diamond.owner || self.admin.admins.contains(&account))
    }

    /// Distinct accounts able to sign, owner included.
    #[must_use]
    pub fn admin_count(&self) -> u64 {
        let owner = self.diamond.owner;
        let listed = self.admin.admins.len() as u64;
        if owner.is_zero() || self.admin.admins.contains(&owner) {
            listed
        } else {
            listed + 1
        }
    }

    /// Fail if the admin set cannot produce `required` signatures.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::QuorumUnreachable`].
    pub fn ensure_quorum_reachable(&self, required: u64) -> Result<(), GovernanceError> {
        let admins = self.admin_count();
        if required > admins {
            return Err(GovernanceError::QuorumUnreachable { required, admins });
        }
        Ok(())
    }
}
