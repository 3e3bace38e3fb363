//! # Governance / Timelock Engine
//!
//! Propose → sign → execute state machine for sensitive operations.
//!
//! ## Lifecycle
//!
//! | Step | Guard | Effect |
//! |------|-------|--------|
//! | propose | id not taken | quorum snapshotted, proposer counted, unlock = now + class delay |
//! | sign | known, not executed, signer new | signer recorded, count + 1 |
//! | execute | known, not executed, now ≥ unlock, count ≥ quorum | executed forever |
//!
//! There is no cancellation: an operation that meets its guards stays
//! executable until someone executes it.

use crate::abi::{self, to_u64, ArgReader, ParamType, Token};
use crate::domain::cut::DiamondCutArgs;
use crate::domain::services::operation_id;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::{DiamondError, GovernanceError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

// =============================================================================
// OPERATION CLASSES
// =============================================================================

/// Kind of governed operation; selects the timelock delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperationClass {
    /// Add or remove an admin.
    AdminChange = 0,
    /// Change the global daily withdrawal limit and the quorum.
    LimitsUpdate = 1,
    /// Shutdown or freeze.
    EmergencyAction = 2,
    /// Apply a facet cut.
    ProtocolUpgrade = 3,
}

impl OperationClass {
    /// Timelock delay for this class.
    #[must_use]
    pub fn delay(self, delays: &ClassDelays) -> u64 {
        match self {
            Self::EmergencyAction => delays.emergency_secs,
            Self::AdminChange | Self::LimitsUpdate | Self::ProtocolUpgrade => delays.standard_secs,
        }
    }
}

impl TryFrom<u8> for OperationClass {
    type Error = GovernanceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AdminChange),
            1 => Ok(Self::LimitsUpdate),
            2 => Ok(Self::EmergencyAction),
            3 => Ok(Self::ProtocolUpgrade),
            other => Err(GovernanceError::InvalidClass(other)),
        }
    }
}

/// Timelock delays per class, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDelays {
    /// Delay for emergency actions.
    pub emergency_secs: u64,
    /// Delay for every other class.
    pub standard_secs: u64,
}

/// Emergency action requested by an `EmergencyAction` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EmergencyAction {
    /// Terminal shutdown: fully paused, withdrawals forced open.
    Shutdown = 0,
    /// Force fully paused without shutting down.
    Freeze = 1,
}

impl TryFrom<u8> for EmergencyAction {
    type Error = GovernanceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Shutdown),
            1 => Ok(Self::Freeze),
            other => Err(GovernanceError::InvalidEmergencyAction(other)),
        }
    }
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// Typed parameter payload of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationParams {
    /// `(address account, bool add)`
    AdminChange { account: Address, add: bool },
    /// `(uint256 globalDailyLimit, uint256 minSignatures)`
    LimitsUpdate {
        global_daily_limit: U256,
        min_signatures: u64,
    },
    /// `(uint8 action)`
    Emergency(EmergencyAction),
    /// `((address,uint8,bytes4[])[] cuts, address init, bytes calldata)`
    ProtocolUpgrade(DiamondCutArgs),
}

impl OperationParams {
    /// Class this payload belongs to.
    #[must_use]
    pub fn class(&self) -> OperationClass {
        match self {
            Self::AdminChange { .. } => OperationClass::AdminChange,
            Self::LimitsUpdate { .. } => OperationClass::LimitsUpdate,
            Self::Emergency(_) => OperationClass::EmergencyAction,
            Self::ProtocolUpgrade(_) => OperationClass::ProtocolUpgrade,
        }
    }

    /// ABI-encode the payload.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let encoded = match self {
            Self::AdminChange { account, add } => {
                abi::encode(&[Token::Address(*account), Token::Bool(*add)])
            }
            Self::LimitsUpdate {
                global_daily_limit,
                min_signatures,
            } => abi::encode(&[Token::Uint(*global_daily_limit), Token::uint(*min_signatures)]),
            Self::Emergency(action) => abi::encode(&[Token::uint(*action as u8)]),
            Self::ProtocolUpgrade(args) => args.encode(),
        };
        Bytes(encoded)
    }

    /// Decode a payload of the given class.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed payloads, an unknown emergency action
    /// or a zero quorum.
    pub fn decode(class: OperationClass, payload: &[u8]) -> Result<Self, DiamondError> {
        match class {
            OperationClass::AdminChange => {
                let mut args = read(&[ParamType::Address, ParamType::Bool], payload)?;
                Ok(Self::AdminChange {
                    account: args.address()?,
                    add: args.boolean()?,
                })
            }
            OperationClass::LimitsUpdate => {
                let mut args = read(&[ParamType::Uint(256), ParamType::Uint(256)], payload)?;
                let global_daily_limit = args.uint()?;
                let min_signatures = to_u64(args.uint()?)?;
                if min_signatures == 0 {
                    return Err(GovernanceError::ZeroQuorum.into());
                }
                Ok(Self::LimitsUpdate {
                    global_daily_limit,
                    min_signatures,
                })
            }
            OperationClass::EmergencyAction => {
                let mut args = read(&[ParamType::Uint(8)], payload)?;
                Ok(Self::Emergency(EmergencyAction::try_from(args.uint8()?)?))
            }
            OperationClass::ProtocolUpgrade => {
                let args = DiamondCutArgs::decode(payload)?;
                args.validate_init()?;
                Ok(Self::ProtocolUpgrade(args))
            }
        }
    }
}

fn read(types: &[ParamType], payload: &[u8]) -> Result<ArgReader, DiamondError> {
    Ok(ArgReader::new(abi::decode(types, payload)?))
}

// =============================================================================
// PENDING OPERATION
// =============================================================================

/// A proposed operation and its signature state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Content-derived identifier.
    pub id: Hash,
    /// Admin that proposed it.
    pub proposer: Address,
    /// Operation class.
    pub class: OperationClass,
    /// ABI-encoded parameters.
    pub params: Bytes,
    /// Unix seconds of the proposal.
    pub proposed_at: u64,
    /// Earliest executable time.
    pub unlock_time: u64,
    /// Quorum snapshotted at proposal time.
    pub required_signatures: u64,
    /// Distinct signatures received.
    pub signatures: u64,
    /// Who signed.
    pub signers: BTreeSet<Address>,
    /// Set once; never cleared.
    pub executed: bool,
}

impl PendingOperation {
    /// Returns true if the quorum is met.
    #[must_use]
    pub fn has_quorum(&self) -> bool {
        self.signatures >= self.required_signatures
    }

    /// Returns true if the timelock has elapsed at `now`.
    #[must_use]
    pub fn is_unlocked(&self, now: u64) -> bool {
        now >= self.unlock_time
    }
}

// =============================================================================
// TIMELOCK
// =============================================================================

/// Pending operations plus the quorum and delay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timelock {
    operations: HashMap<Hash, PendingOperation>,
    min_signatures: u64,
    delays: ClassDelays,
}

impl Timelock {
    /// Empty timelock.
    #[must_use]
    pub fn new(min_signatures: u64, delays: ClassDelays) -> Self {
        Self {
            operations: HashMap::new(),
            min_signatures,
            delays,
        }
    }

    /// Quorum applied to new proposals.
    #[must_use]
    pub fn min_signatures(&self) -> u64 {
        self.min_signatures
    }

    /// Replace the quorum for future proposals.
    pub fn set_min_signatures(&mut self, min_signatures: u64) {
        self.min_signatures = min_signatures;
    }

    /// Delay configuration.
    #[must_use]
    pub fn delays(&self) -> &ClassDelays {
        &self.delays
    }

    /// Operation by id.
    #[must_use]
    pub fn get(&self, id: &Hash) -> Option<&PendingOperation> {
        self.operations.get(id)
    }

    /// Whether `signer` has signed `id`.
    #[must_use]
    pub fn has_signed(&self, id: &Hash, signer: Address) -> bool {
        self.operations
            .get(id)
            .is_some_and(|op| op.signers.contains(&signer))
    }

    /// Operations not yet executed, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<&PendingOperation> {
        let mut pending: Vec<_> = self.operations.values().filter(|op| !op.executed).collect();
        pending.sort_by_key(|op| (op.proposed_at, op.id));
        pending
    }

    /// Record a new proposal; the proposer's signature is counted.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::OperationExists`] if the content hash is taken.
    pub fn propose(
        &mut self,
        proposer: Address,
        now: u64,
        class: OperationClass,
        params: Bytes,
    ) -> Result<Hash, GovernanceError> {
        let id = operation_id(proposer, now, class as u8, params.as_slice());
        if self.operations.contains_key(&id) {
            return Err(GovernanceError::OperationExists(id));
        }

        let unlock_time = now.saturating_add(class.delay(&self.delays));
        let operation = PendingOperation {
            id,
            proposer,
            class,
            params,
            proposed_at: now,
            unlock_time,
            required_signatures: self.min_signatures,
            signatures: 1,
            signers: BTreeSet::from([proposer]),
            executed: false,
        };
        self.operations.insert(id, operation);

        info!(%id, ?class, %proposer, unlock_time, "Operation proposed");
        Ok(id)
    }

    /// Add a distinct signature. Returns the new signature count.
    ///
    /// # Errors
    ///
    /// Fails if the operation is unknown, executed, or already signed by `signer`.
    pub fn sign(&mut self, id: Hash, signer: Address) -> Result<u64, GovernanceError> {
        let operation = self
            .operations
            .get_mut(&id)
            .ok_or(GovernanceError::UnknownOperation(id))?;
        if operation.executed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        if !operation.signers.insert(signer) {
            return Err(GovernanceError::AlreadySigned { id, signer });
        }
        operation.signatures += 1;

        debug!(%id, %signer, signatures = operation.signatures, "Operation signed");
        Ok(operation.signatures)
    }

    /// Consume the operation: mark it executed and hand it back for dispatch.
    ///
    /// # Errors
    ///
    /// Fails if the operation is unknown, executed, still locked, or short of quorum.
    pub fn execute(&mut self, id: Hash, now: u64) -> Result<PendingOperation, GovernanceError> {
        let operation = self
            .operations
            .get_mut(&id)
            .ok_or(GovernanceError::UnknownOperation(id))?;
        if operation.executed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        if !operation.is_unlocked(now) {
            return Err(GovernanceError::NotUnlocked {
                id,
                unlock_time: operation.unlock_time,
                now,
            });
        }
        if !operation.has_quorum() {
            return Err(GovernanceError::InsufficientSignatures {
                id,
                received: operation.signatures,
                required: operation.required_signatures,
            });
        }

        operation.executed = true;
        info!(%id, class = ?operation.class, "Operation executed");
        Ok(operation.clone())
    }
}
