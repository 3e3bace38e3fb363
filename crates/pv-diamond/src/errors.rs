//! # Error Types
//!
//! All error types for diamond dispatch and governance.
//!
//! Every error is fatal to the call that raised it: the proxy restores the
//! storage snapshot taken before dispatch, so no partial state survives.

use crate::domain::protocol_state::{PauseLevel, ProtocolAction};
use crate::domain::value_objects::{Address, Hash, Selector, U256};
use shared_types::BudgetError;
use thiserror::Error;

// =============================================================================
// ROUTING ERRORS
// =============================================================================

/// Errors from selector routing and facet cuts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// No facet is bound to the called selector.
    #[error("function does not exist: {0}")]
    FunctionNotFound(Selector),

    /// Call data too short to carry a selector.
    #[error("calldata too short: {len} bytes")]
    CalldataTooShort {
        /// Bytes received.
        len: usize,
    },

    /// A cut carried no selectors.
    #[error("no selectors in facet cut for {facet}")]
    EmptySelectorBatch {
        /// Facet the cut targeted.
        facet: Address,
    },

    /// Add or replace targeted the zero address.
    #[error("facet address can't be zero for add/replace")]
    ZeroFacetAddress,

    /// Remove targeted a non-zero address.
    #[error("remove facet address must be zero, got {facet}")]
    NonZeroRemoveAddress {
        /// Address the remove cut carried.
        facet: Address,
    },

    /// Add targeted a selector that is already routed.
    #[error("selector {selector} already bound to {facet}")]
    SelectorAlreadyBound {
        /// Selector being added.
        selector: Selector,
        /// Facet it is already routed to.
        facet: Address,
    },

    /// Replace or remove targeted a selector that is not routed.
    #[error("selector {0} is not bound")]
    SelectorNotBound(Selector),

    /// The facet address has no deployed code.
    #[error("facet {facet} has no code")]
    NoFacetCode {
        /// Address without code.
        facet: Address,
    },

    /// Unknown cut action discriminant.
    #[error("invalid facet cut action: {0}")]
    InvalidCutAction(u8),

    /// Initializer address and calldata disagree.
    #[error("invalid diamond initializer: {0}")]
    InvalidInit(&'static str),

    /// A recorded selector position does not point back at the selector.
    #[error("routing index inconsistent for selector {0}")]
    SelectorIndexInconsistent(Selector),

    /// A recorded facet position does not point back at the facet.
    #[error("routing index inconsistent for facet {0}")]
    FacetIndexInconsistent(Address),

    /// A state-changing function was reached through a static call.
    #[error("state change in static call: {0}")]
    StaticCallViolation(Selector),

    /// Nested delegated execution went too deep.
    #[error("delegate depth exceeded: {depth} > {max}")]
    DelegateDepthExceeded {
        /// Depth the call would reach.
        depth: u16,
        /// Deepest nesting allowed.
        max: u16,
    },
}

// =============================================================================
// AUTHORIZATION ERRORS
// =============================================================================

/// Caller lacks the required role.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Owner-only entry point.
    #[error("caller {caller} is not the contract owner")]
    NotOwner {
        /// Rejected caller.
        caller: Address,
    },

    /// Admin-only entry point.
    #[error("caller {caller} is not an admin")]
    NotAdmin {
        /// Rejected caller.
        caller: Address,
    },
}

// =============================================================================
// GOVERNANCE ERRORS
// =============================================================================

/// Errors from the propose/sign/execute state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    /// No pending operation with this id.
    #[error("unknown operation {0}")]
    UnknownOperation(Hash),

    /// An operation with the same content hash already exists.
    #[error("operation {0} already exists")]
    OperationExists(Hash),

    /// The operation has already been executed.
    #[error("operation {0} already executed")]
    AlreadyExecuted(Hash),

    /// The signer has already signed this operation.
    #[error("{signer} already signed operation {id}")]
    AlreadySigned {
        /// Operation id.
        id: Hash,
        /// Repeat signer.
        signer: Address,
    },

    /// The timelock has not elapsed.
    #[error("operation {id} locked until {unlock_time}, now {now}")]
    NotUnlocked {
        /// Operation id.
        id: Hash,
        /// Earliest execution time.
        unlock_time: u64,
        /// Time of the attempt.
        now: u64,
    },

    /// Not enough distinct signatures.
    #[error("insufficient signatures for {id}: {received} of {required}")]
    InsufficientSignatures {
        /// Operation id.
        id: Hash,
        /// Signatures collected.
        received: u64,
        /// Quorum snapshotted at proposal.
        required: u64,
    },

    /// Unknown operation class discriminant.
    #[error("invalid operation class: {0}")]
    InvalidClass(u8),

    /// Unknown emergency action discriminant.
    #[error("invalid emergency action: {0}")]
    InvalidEmergencyAction(u8),

    /// Quorum must be at least one signature.
    #[error("minimum signatures must be at least 1")]
    ZeroQuorum,

    /// Quorum cannot be met by the current admin set.
    #[error("quorum unreachable: {required} signatures required, {admins} admins")]
    QuorumUnreachable {
        /// Quorum asked for.
        required: u64,
        /// Accounts able to sign.
        admins: u64,
    },

    /// The contract owner cannot be removed from the admin set.
    #[error("owner {0} is always an admin")]
    OwnerIsAdmin(Address),

    /// The zero address cannot be an admin.
    #[error("zero address can't be an admin")]
    ZeroAdmin,

    /// The zero address cannot own the diamond.
    #[error("zero address can't be the owner")]
    ZeroOwner,

    /// The admin set has already been initialized.
    #[error("admin set already initialized")]
    AlreadyInitialized,
}

// =============================================================================
// PROTOCOL STATE ERRORS
// =============================================================================

/// Errors from the pause/shutdown state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolStateError {
    /// The protocol is shut down; no transitions remain.
    #[error("protocol is shut down")]
    Shutdown,

    /// The requested pause level is already active.
    #[error("pause state already {0}")]
    Unchanged(PauseLevel),

    /// Unknown pause level discriminant.
    #[error("invalid pause level: {0}")]
    InvalidPauseLevel(u8),

    /// Unknown protocol action discriminant.
    #[error("invalid protocol action: {0}")]
    InvalidAction(u8),

    /// The action is not permitted at the current pause level.
    #[error("{action} not allowed while {level}")]
    ActionNotAllowed {
        /// Refused action.
        action: ProtocolAction,
        /// Current pause level.
        level: PauseLevel,
    },
}

// =============================================================================
// RATE LIMIT ERRORS
// =============================================================================

/// Errors from the rolling daily withdrawal budgets.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// The user's budget for this window is used up.
    #[error("daily withdrawal limit reached for {user}")]
    UserLimitReached {
        /// User whose window is spent.
        user: Address,
    },

    /// The global budget for this window is used up.
    #[error("global daily withdrawal limit reached")]
    GlobalLimitReached,

    /// The withdrawal would overshoot the user's budget.
    #[error("withdrawal of {requested} exceeds {user}'s remaining {remaining}")]
    UserLimitExceeded {
        /// User being withdrawn for.
        user: Address,
        /// Amount in the custody account.
        requested: U256,
        /// Budget left in the window.
        remaining: U256,
    },

    /// The withdrawal would overshoot the global budget.
    #[error("withdrawal of {requested} exceeds global remaining {remaining}")]
    GlobalLimitExceeded {
        /// Amount in the custody account.
        requested: U256,
        /// Budget left in the window.
        remaining: U256,
    },
}

impl RateLimitError {
    /// Attribute a shared budget error to a user's window.
    #[must_use]
    pub fn for_user(user: Address, err: BudgetError) -> Self {
        match err {
            BudgetError::Exhausted { .. } => Self::UserLimitReached { user },
            BudgetError::Exceeded {
                requested,
                remaining,
            } => Self::UserLimitExceeded {
                user,
                requested,
                remaining,
            },
        }
    }

    /// Attribute a shared budget error to the global window.
    #[must_use]
    pub fn for_global(err: BudgetError) -> Self {
        match err {
            BudgetError::Exhausted { .. } => Self::GlobalLimitReached,
            BudgetError::Exceeded {
                requested,
                remaining,
            } => Self::GlobalLimitExceeded {
                requested,
                remaining,
            },
        }
    }
}

// =============================================================================
// CUSTODY ERRORS
// =============================================================================

/// Errors from the external custody accounts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustodyError {
    /// The user has no linked custody account.
    #[error("no custody account linked for {user}")]
    NoCustodyAccount {
        /// User without a link.
        user: Address,
    },

    /// Linking the zero address as a custody account.
    #[error("custody account can't be zero")]
    ZeroAccount,

    /// The custody account holds nothing to withdraw.
    #[error("custody account {account} is empty")]
    EmptyBalance {
        /// Empty custody account.
        account: Address,
    },

    /// The transfer out of the custody account failed.
    #[error("transfer from {account} failed: {reason}")]
    TransferFailed {
        /// Custody account debited.
        account: Address,
        /// Reason given by the custody integration.
        reason: String,
    },

    /// The custody integration could not be reached.
    #[error("custody unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// ABI ERRORS
// =============================================================================

/// Errors decoding ABI-encoded call data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// Read past the end of the buffer.
    #[error("abi data too short: need {needed} bytes at offset {offset}, have {len}")]
    OutOfBounds {
        /// Read offset.
        offset: usize,
        /// Bytes the read needs.
        needed: usize,
        /// Buffer length.
        len: usize,
    },

    /// An offset or length word does not fit in memory.
    #[error("abi offset or length overflows: {0}")]
    Overflow(U256),

    /// An address word has non-zero high bytes.
    #[error("invalid abi address word")]
    InvalidAddress,

    /// A bool word is neither 0 nor 1.
    #[error("invalid abi bool word")]
    InvalidBool,

    /// A value does not fit the declared integer width.
    #[error("value {value} does not fit in {bits} bits")]
    IntegerTooLarge {
        /// Decoded value.
        value: U256,
        /// Declared width.
        bits: u16,
    },

    /// The payload decodes to more tokens than its size allows.
    #[error("abi payload expands past {limit} tokens")]
    TooManyTokens {
        /// Budget for this payload.
        limit: usize,
    },

    /// Decoded token did not have the expected shape.
    #[error("unexpected abi token: expected {0}")]
    UnexpectedToken(&'static str),
}

// =============================================================================
// TOP-LEVEL ERROR
// =============================================================================

/// Coarse classification of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unresolved operation or invalid registration.
    Routing,
    /// Non-owner or non-admin caller.
    Authorization,
    /// Proposal state does not allow the transition.
    Governance,
    /// Pause/shutdown state forbids the action.
    ProtocolState,
    /// Daily withdrawal budget exhausted.
    RateLimit,
    /// External custody call failed.
    External,
    /// Malformed call data.
    Encoding,
}

/// Any failure of a diamond call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiamondError {
    /// Routing failure.
    #[error("routing: {0}")]
    Routing(#[from] RoutingError),

    /// Authorization failure.
    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    /// Governance failure.
    #[error("governance: {0}")]
    Governance(#[from] GovernanceError),

    /// Pause/shutdown failure.
    #[error("protocol state: {0}")]
    ProtocolState(#[from] ProtocolStateError),

    /// Rate limit failure.
    #[error("rate limit: {0}")]
    RateLimit(#[from] RateLimitError),

    /// External custody failure.
    #[error("custody: {0}")]
    Custody(#[from] CustodyError),

    /// Call data failure.
    #[error("abi: {0}")]
    Abi(#[from] AbiError),
}

impl DiamondError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Routing(_) => ErrorKind::Routing,
            Self::Auth(_) => ErrorKind::Authorization,
            Self::Governance(_) => ErrorKind::Governance,
            Self::ProtocolState(_) => ErrorKind::ProtocolState,
            Self::RateLimit(_) => ErrorKind::RateLimit,
            Self::Custody(_) => ErrorKind::External,
            Self::Abi(_) => ErrorKind::Encoding,
        }
    }

    /// Returns true if retrying the same call later can succeed without any
    /// other state change (timelocks and daily budgets resolve themselves).
    #[must_use]
    pub fn is_time_resolvable(&self) -> bool {
        matches!(
            self,
            Self::Governance(GovernanceError::NotUnlocked { .. }) | Self::RateLimit(_)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
