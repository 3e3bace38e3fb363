//! # Diamond Events
//!
//! Records emitted by facets during a call. A failed call emits nothing: the
//! proxy drops the call's events together with its storage changes.

use crate::domain::cut::FacetCut;
use crate::domain::governance::{EmergencyAction, OperationClass};
use crate::domain::protocol_state::PauseLevel;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use serde::{Deserialize, Serialize};

/// Something a facet did that observers may care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiamondEvent {
    /// Routing changed (EIP-2535 `DiamondCut`).
    DiamondCut {
        /// Cuts applied, in order.
        cuts: Vec<FacetCut>,
        /// Initializer facet, zero for none.
        init: Address,
        /// Initializer call data.
        calldata: Bytes,
    },

    /// ERC-173 ownership transfer.
    OwnershipTransferred {
        /// Previous owner.
        previous: Address,
        /// New owner.
        new: Address,
    },

    /// Admin set and quorum seeded.
    AdminsInitialized {
        /// Listed admins.
        admins: Vec<Address>,
        /// Quorum.
        min_signatures: u64,
    },

    /// A governance operation entered the pending set.
    OperationProposed {
        /// Operation id.
        id: Hash,
        /// Class.
        class: OperationClass,
        /// Proposer.
        proposer: Address,
        /// Earliest execution time.
        unlock_time: u64,
    },

    /// A governance operation received a signature.
    OperationSigned {
        /// Operation id.
        id: Hash,
        /// Signer.
        signer: Address,
        /// Signature count after this one.
        signatures: u64,
    },

    /// A governance operation was executed.
    OperationExecuted {
        /// Operation id.
        id: Hash,
        /// Class.
        class: OperationClass,
    },

    /// Pause level changed.
    PauseStateChanged {
        /// Previous level.
        previous: PauseLevel,
        /// New level.
        level: PauseLevel,
        /// When.
        timestamp: u64,
    },

    /// Emergency action applied.
    EmergencyActionApplied {
        /// Action.
        action: EmergencyAction,
        /// When.
        timestamp: u64,
    },

    /// Admin membership changed.
    AdminUpdated {
        /// Account.
        account: Address,
        /// True if added, false if removed.
        added: bool,
    },

    /// Global limit and quorum changed.
    LimitsUpdated {
        /// New global per-window limit.
        global_daily_limit: U256,
        /// New quorum.
        min_signatures: u64,
    },

    /// Custody account linked to a user.
    CustodyLinked {
        /// User.
        user: Address,
        /// Custody account.
        account: Address,
    },

    /// Funds moved out of a custody account by the emergency path.
    EmergencyWithdrawal {
        /// Recipient user.
        user: Address,
        /// Source custody account.
        account: Address,
        /// Amount in wei.
        amount: U256,
        /// Admin that triggered it.
        admin: Address,
    },
}

impl DiamondEvent {
    /// Short event name, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DiamondCut { .. } => "DiamondCut",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
            Self::AdminsInitialized { .. } => "AdminsInitialized",
            Self::OperationProposed { .. } => "OperationProposed",
            Self::OperationSigned { .. } => "OperationSigned",
            Self::OperationExecuted { .. } => "OperationExecuted",
            Self::PauseStateChanged { .. } => "PauseStateChanged",
            Self::EmergencyActionApplied { .. } => "EmergencyActionApplied",
            Self::AdminUpdated { .. } => "AdminUpdated",
            Self::LimitsUpdated { .. } => "LimitsUpdated",
            Self::CustodyLinked { .. } => "CustodyLinked",
            Self::EmergencyWithdrawal { .. } => "EmergencyWithdrawal",
        }
    }
}
