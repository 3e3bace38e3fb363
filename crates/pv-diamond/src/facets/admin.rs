//! # Admin Facet
//!
//! Multi-signature timelock governance, pause control and the rate-limited
//! emergency withdrawal.
//!
//! ## Entry Points
//!
//! | Function | Who | Effect |
//! |----------|-----|--------|
//! | `initializeAdmins` | owner, once | seed admin set and quorum |
//! | `proposeOperation` | admin | new pending operation, proposer signed |
//! | `signOperation` | admin | one more distinct signature |
//! | `executeOperation` | admin | apply once unlocked and at quorum |
//! | `setPauseState` | admin | change pause level unless shut down |
//! | `emergencyWithdraw` | admin | drain a user's custody account to the user |
//! | `linkCustodyAccount` | admin | record a user's custody account |
//!
//! Everything else is a view open to any caller.

use super::{diamond_cut, Env, FacetFunction};
use crate::abi::{decode, decode_call_args, encode, to_u64, ArgReader, ParamType, Token};
use crate::domain::governance::{EmergencyAction, OperationClass, OperationParams};
use crate::domain::protocol_state::{PauseLevel, ProtocolAction};
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::domain::withdrawal::WindowSnapshot;
use crate::errors::{AbiError, CustodyError, DiamondError, GovernanceError};
use crate::events::DiamondEvent;
use tracing::{info, warn};

// =============================================================================
// FUNCTIONS
// =============================================================================

/// Functions of the admin facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `initializeAdmins(address[],uint256)`
    InitializeAdmins,
    /// `proposeOperation(uint8,bytes)`
    ProposeOperation,
    /// `signOperation(bytes32)`
    SignOperation,
    /// `executeOperation(bytes32)`
    ExecuteOperation,
    /// `setPauseState(uint8)`
    SetPauseState,
    /// `emergencyWithdraw(address)`
    EmergencyWithdraw,
    /// `linkCustodyAccount(address,address)`
    LinkCustodyAccount,
    /// `getPauseState()`
    GetPauseState,
    /// `isActionAllowed(uint8)`
    IsActionAllowed,
    /// `getOperation(bytes32)`
    GetOperation,
    /// `hasSigned(bytes32,address)`
    HasSigned,
    /// `getUserWithdrawalLimit(address)`
    GetUserWithdrawalLimit,
    /// `getGlobalWithdrawalLimit()`
    GetGlobalWithdrawalLimit,
    /// `isAdmin(address)`
    IsAdmin,
    /// `minSignatures()`
    MinSignatures,
}

impl FacetFunction for Function {
    const ALL: &'static [Self] = &[
        Self::InitializeAdmins,
        Self::ProposeOperation,
        Self::SignOperation,
        Self::ExecuteOperation,
        Self::SetPauseState,
        Self::EmergencyWithdraw,
        Self::LinkCustodyAccount,
        Self::GetPauseState,
        Self::IsActionAllowed,
        Self::GetOperation,
        Self::HasSigned,
        Self::GetUserWithdrawalLimit,
        Self::GetGlobalWithdrawalLimit,
        Self::IsAdmin,
        Self::MinSignatures,
    ];

    fn signature(self) -> &'static str {
        match self {
            Self::InitializeAdmins => "initializeAdmins(address[],uint256)",
            Self::ProposeOperation => "proposeOperation(uint8,bytes)",
            Self::SignOperation => "signOperation(bytes32)",
            Self::ExecuteOperation => "executeOperation(bytes32)",
            Self::SetPauseState => "setPauseState(uint8)",
            Self::EmergencyWithdraw => "emergencyWithdraw(address)",
            Self::LinkCustodyAccount => "linkCustodyAccount(address,address)",
            Self::GetPauseState => "getPauseState()",
            Self::IsActionAllowed => "isActionAllowed(uint8)",
            Self::GetOperation => "getOperation(bytes32)",
            Self::HasSigned => "hasSigned(bytes32,address)",
            Self::GetUserWithdrawalLimit => "getUserWithdrawalLimit(address)",
            Self::GetGlobalWithdrawalLimit => "getGlobalWithdrawalLimit()",
            Self::IsAdmin => "isAdmin(address)",
            Self::MinSignatures => "minSignatures()",
        }
    }

    fn is_view(self) -> bool {
        matches!(
            self,
            Self::GetPauseState
                | Self::IsActionAllowed
                | Self::GetOperation
                | Self::HasSigned
                | Self::GetUserWithdrawalLimit
                | Self::GetGlobalWithdrawalLimit
                | Self::IsAdmin
                | Self::MinSignatures
        )
    }
}

/// Call data builders.
impl Function {
    /// `initializeAdmins(admins, minSignatures)`
    #[must_use]
    pub fn initialize_admins(admins: &[Address], min_signatures: u64) -> Bytes {
        let admins = admins.iter().copied().map(Token::Address).collect();
        Self::InitializeAdmins.encode_call(&[Token::Array(admins), Token::uint(min_signatures)])
    }

    /// `proposeOperation(class, params)` from typed parameters.
    #[must_use]
    pub fn propose(params: &OperationParams) -> Bytes {
        Self::propose_raw(params.class() as u8, params.encode().as_slice())
    }

    /// `proposeOperation(class, params)` from raw parts.
    #[must_use]
    pub fn propose_raw(class: u8, params: &[u8]) -> Bytes {
        Self::ProposeOperation.encode_call(&[Token::uint(class), Token::Bytes(params.to_vec())])
    }

    /// `signOperation(id)`
    #[must_use]
    pub fn sign(id: Hash) -> Bytes {
        Self::SignOperation.encode_call(&[Token::hash(id)])
    }

    /// `executeOperation(id)`
    #[must_use]
    pub fn execute(id: Hash) -> Bytes {
        Self::ExecuteOperation.encode_call(&[Token::hash(id)])
    }

    /// `setPauseState(level)`
    #[must_use]
    pub fn set_pause_state(level: u8) -> Bytes {
        Self::SetPauseState.encode_call(&[Token::uint(level)])
    }

    /// `emergencyWithdraw(user)`
    #[must_use]
    pub fn emergency_withdraw(user: Address) -> Bytes {
        Self::EmergencyWithdraw.encode_call(&[Token::Address(user)])
    }

    /// `linkCustodyAccount(user, account)`
    #[must_use]
    pub fn link_custody_account(user: Address, account: Address) -> Bytes {
        Self::LinkCustodyAccount.encode_call(&[Token::Address(user), Token::Address(account)])
    }

    /// `isActionAllowed(action)`
    #[must_use]
    pub fn is_action_allowed(action: u8) -> Bytes {
        Self::IsActionAllowed.encode_call(&[Token::uint(action)])
    }

    /// `getOperation(id)`
    #[must_use]
    pub fn get_operation(id: Hash) -> Bytes {
        Self::GetOperation.encode_call(&[Token::hash(id)])
    }

    /// `hasSigned(id, signer)`
    #[must_use]
    pub fn has_signed(id: Hash, signer: Address) -> Bytes {
        Self::HasSigned.encode_call(&[Token::hash(id), Token::Address(signer)])
    }

    /// `getUserWithdrawalLimit(user)`
    #[must_use]
    pub fn get_user_withdrawal_limit(user: Address) -> Bytes {
        Self::GetUserWithdrawalLimit.encode_call(&[Token::Address(user)])
    }

    /// `isAdmin(account)`
    #[must_use]
    pub fn is_admin(account: Address) -> Bytes {
        Self::IsAdmin.encode_call(&[Token::Address(account)])
    }

    /// Call data of a function that takes no arguments.
    #[must_use]
    pub fn no_args(self) -> Bytes {
        self.encode_call(&[])
    }
}

// =============================================================================
// VIEW OUTPUTS
// =============================================================================

/// Decoded `getPauseState()` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseStateView {
    /// Effective pause level.
    pub level: u8,
    /// Terminal shutdown flag.
    pub shutdown: bool,
    /// Unix seconds of the last transition.
    pub changed_at: u64,
}

impl PauseStateView {
    /// Decode return data.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] on malformed output.
    pub fn decode(output: &[u8]) -> Result<Self, AbiError> {
        let mut fields = ArgReader::new(decode(
            &[ParamType::Uint(8), ParamType::Bool, ParamType::Uint(64)],
            output,
        )?);
        Ok(Self {
            level: fields.uint8()?,
            shutdown: fields.boolean()?,
            changed_at: to_u64(fields.uint()?)?,
        })
    }
}

/// Decoded `getOperation(bytes32)` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationView {
    /// Operation class discriminant.
    pub class: u8,
    /// Earliest execution time.
    pub unlock_time: u64,
    /// Quorum snapshotted at proposal.
    pub required_signatures: u64,
    /// Signatures received.
    pub signatures: u64,
    /// Executed flag.
    pub executed: bool,
    /// Proposer.
    pub proposer: Address,
    /// ABI-encoded parameters.
    pub params: Bytes,
}

impl OperationView {
    fn param_types() -> [ParamType; 7] {
        [
            ParamType::Uint(8),
            ParamType::Uint(64),
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Bool,
            ParamType::Address,
            ParamType::Bytes,
        ]
    }

    /// Decode return data.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] on malformed output.
    pub fn decode(output: &[u8]) -> Result<Self, AbiError> {
        let mut fields = ArgReader::new(decode(&Self::param_types(), output)?);
        Ok(Self {
            class: fields.uint8()?,
            unlock_time: to_u64(fields.uint()?)?,
            required_signatures: to_u64(fields.uint()?)?,
            signatures: to_u64(fields.uint()?)?,
            executed: fields.boolean()?,
            proposer: fields.address()?,
            params: Bytes(fields.bytes()?),
        })
    }
}

fn window_tokens(window: WindowSnapshot) -> Vec<u8> {
    encode(&[
        Token::Uint(window.limit),
        Token::uint(window.window_start),
        Token::Uint(window.withdrawn),
    ])
}

/// Decode `getUserWithdrawalLimit` / `getGlobalWithdrawalLimit` output.
///
/// # Errors
///
/// Returns [`AbiError`] on malformed output.
pub fn decode_window(output: &[u8]) -> Result<WindowSnapshot, AbiError> {
    let mut fields = ArgReader::new(decode(
        &[ParamType::Uint(256), ParamType::Uint(64), ParamType::Uint(256)],
        output,
    )?);
    Ok(WindowSnapshot {
        limit: fields.uint()?,
        window_start: to_u64(fields.uint()?)?,
        withdrawn: fields.uint()?,
    })
}

// =============================================================================
// DISPATCH
// =============================================================================

pub(super) fn invoke(env: &mut Env<'_>, function: Function, calldata: &[u8]) -> Result<Bytes, DiamondError> {
    let output = match function {
        Function::InitializeAdmins => {
            let mut args = decode_call_args(
                &[
                    ParamType::Array(Box::new(ParamType::Address)),
                    ParamType::Uint(256),
                ],
                calldata,
            )?;
            let admins = args
                .array()?
                .into_iter()
                .map(Token::into_address)
                .collect::<Result<Vec<_>, AbiError>>()?;
            let min_signatures = to_u64(args.uint()?)?;
            initialize_admins(env, admins, min_signatures)?;
            Vec::new()
        }
        Function::ProposeOperation => {
            let mut args = decode_call_args(&[ParamType::Uint(8), ParamType::Bytes], calldata)?;
            let class = args.uint8()?;
            let params = args.bytes()?;
            let id = propose(env, class, params)?;
            encode(&[Token::hash(id)])
        }
        Function::SignOperation => {
            let id = decode_call_args(&[ParamType::FixedBytes(32)], calldata)?.hash()?;
            sign(env, id)?;
            Vec::new()
        }
        Function::ExecuteOperation => {
            let id = decode_call_args(&[ParamType::FixedBytes(32)], calldata)?.hash()?;
            execute(env, id)?;
            Vec::new()
        }
        Function::SetPauseState => {
            let level = decode_call_args(&[ParamType::Uint(8)], calldata)?.uint8()?;
            set_pause_state(env, level)?;
            Vec::new()
        }
        Function::EmergencyWithdraw => {
            let user = decode_call_args(&[ParamType::Address], calldata)?.address()?;
            let amount = emergency_withdraw(env, user)?;
            encode(&[Token::Uint(amount)])
        }
        Function::LinkCustodyAccount => {
            let mut args = decode_call_args(&[ParamType::Address, ParamType::Address], calldata)?;
            let user = args.address()?;
            let account = args.address()?;
            link_custody_account(env, user, account)?;
            Vec::new()
        }
        Function::GetPauseState => {
            let status = &env.storage.admin.status;
            encode(&[
                Token::uint(status.level() as u8),
                Token::Bool(status.is_shutdown()),
                Token::uint(status.changed_at()),
            ])
        }
        Function::IsActionAllowed => {
            let raw = decode_call_args(&[ParamType::Uint(8)], calldata)?.uint8()?;
            let action = ProtocolAction::try_from(raw)?;
            encode(&[Token::Bool(env.storage.admin.status.is_allowed(action))])
        }
        Function::GetOperation => {
            let id = decode_call_args(&[ParamType::FixedBytes(32)], calldata)?.hash()?;
            let op = env
                .storage
                .admin
                .timelock
                .get(&id)
                .ok_or(GovernanceError::UnknownOperation(id))?;
            encode(&[
                Token::uint(op.class as u8),
                Token::uint(op.unlock_time),
                Token::uint(op.required_signatures),
                Token::uint(op.signatures),
                Token::Bool(op.executed),
                Token::Address(op.proposer),
                Token::Bytes(op.params.0.clone()),
            ])
        }
        Function::HasSigned => {
            let mut args =
                decode_call_args(&[ParamType::FixedBytes(32), ParamType::Address], calldata)?;
            let id = args.hash()?;
            let signer = args.address()?;
            encode(&[Token::Bool(env.storage.admin.timelock.has_signed(&id, signer))])
        }
        Function::GetUserWithdrawalLimit => {
            let user = decode_call_args(&[ParamType::Address], calldata)?.address()?;
            let now = env.now();
            window_tokens(env.storage.admin.limits.user_snapshot(user, now))
        }
        Function::GetGlobalWithdrawalLimit => {
            let now = env.now();
            window_tokens(env.storage.admin.limits.global_snapshot(now))
        }
        Function::IsAdmin => {
            let account = decode_call_args(&[ParamType::Address], calldata)?.address()?;
            encode(&[Token::Bool(env.storage.is_admin(account))])
        }
        Function::MinSignatures => {
            encode(&[Token::uint(env.storage.admin.timelock.min_signatures())])
        }
    };

    Ok(Bytes(output))
}

// =============================================================================
// GOVERNANCE
// =============================================================================

fn initialize_admins(
    env: &mut Env<'_>,
    admins: Vec<Address>,
    min_signatures: u64,
) -> Result<(), DiamondError> {
    env.require_owner()?;
    if env.storage.admin.initialized {
        return Err(GovernanceError::AlreadyInitialized.into());
    }
    if admins.iter().any(Address::is_zero) {
        return Err(GovernanceError::ZeroAdmin.into());
    }
    if min_signatures == 0 {
        return Err(GovernanceError::ZeroQuorum.into());
    }

    env.storage.admin.admins.extend(admins.iter().copied());
    env.storage.ensure_quorum_reachable(min_signatures)?;
    env.storage.admin.timelock.set_min_signatures(min_signatures);
    env.storage.admin.initialized = true;

    info!(admins = admins.len(), min_signatures, "Admins initialized");
    env.emit(DiamondEvent::AdminsInitialized {
        admins,
        min_signatures,
    });
    Ok(())
}

fn propose(env: &mut Env<'_>, class: u8, params: Vec<u8>) -> Result<Hash, DiamondError> {
    env.require_admin()?;
    let class = OperationClass::try_from(class)?;
    let decoded = OperationParams::decode(class, &params)?;
    if let OperationParams::AdminChange { account, add } = decoded {
        if account.is_zero() {
            return Err(GovernanceError::ZeroAdmin.into());
        }
        if !add && account == env.storage.owner() {
            return Err(GovernanceError::OwnerIsAdmin(account).into());
        }
    }

    let (proposer, now) = (env.caller(), env.now());
    let timelock = &mut env.storage.admin.timelock;
    let id = timelock.propose(proposer, now, class, Bytes(params))?;
    let unlock_time = now.saturating_add(class.delay(timelock.delays()));

    env.emit(DiamondEvent::OperationProposed {
        id,
        class,
        proposer,
        unlock_time,
    });
    Ok(id)
}

fn sign(env: &mut Env<'_>, id: Hash) -> Result<(), DiamondError> {
    env.require_admin()?;
    let signer = env.caller();
    let signatures = env.storage.admin.timelock.sign(id, signer)?;
    env.emit(DiamondEvent::OperationSigned {
        id,
        signer,
        signatures,
    });
    Ok(())
}

fn execute(env: &mut Env<'_>, id: Hash) -> Result<(), DiamondError> {
    env.require_admin()?;
    let now = env.now();
    let operation = env.storage.admin.timelock.execute(id, now)?;
    let params = OperationParams::decode(operation.class, operation.params.as_slice())?;

    apply_operation(env, params)?;

    env.emit(DiamondEvent::OperationExecuted {
        id,
        class: operation.class,
    });
    Ok(())
}

fn apply_operation(env: &mut Env<'_>, params: OperationParams) -> Result<(), DiamondError> {
    let now = env.now();

    match params {
        OperationParams::AdminChange { account, add } => {
            if account.is_zero() {
                return Err(GovernanceError::ZeroAdmin.into());
            }
            if add {
                env.storage.admin.admins.insert(account);
            } else {
                if account == env.storage.owner() {
                    return Err(GovernanceError::OwnerIsAdmin(account).into());
                }
                env.storage.admin.admins.remove(&account);
                let required = env.storage.admin.timelock.min_signatures();
                env.storage.ensure_quorum_reachable(required)?;
            }
            info!(%account, add, "Admin set updated");
            env.emit(DiamondEvent::AdminUpdated {
                account,
                added: add,
            });
        }
        OperationParams::LimitsUpdate {
            global_daily_limit,
            min_signatures,
        } => {
            if min_signatures == 0 {
                return Err(GovernanceError::ZeroQuorum.into());
            }
            env.storage.ensure_quorum_reachable(min_signatures)?;
            env.storage.admin.limits.set_global_limit(global_daily_limit);
            env.storage.admin.timelock.set_min_signatures(min_signatures);

            info!(%global_daily_limit, min_signatures, "Limits updated");
            env.emit(DiamondEvent::LimitsUpdated {
                global_daily_limit,
                min_signatures,
            });
        }
        OperationParams::Emergency(action) => {
            match action {
                EmergencyAction::Shutdown => {
                    env.storage.admin.status.shut_down(now)?;
                    warn!(timestamp = now, "Protocol shut down");
                }
                EmergencyAction::Freeze => {
                    let live = env.storage.admin.status.live_mut()?;
                    let previous = live.level();
                    if previous != PauseLevel::FullyPaused {
                        live.set_level(PauseLevel::FullyPaused, now)?;
                        env.emit(DiamondEvent::PauseStateChanged {
                            previous,
                            level: PauseLevel::FullyPaused,
                            timestamp: now,
                        });
                    }
                    warn!(timestamp = now, "Protocol frozen");
                }
            }
            env.emit(DiamondEvent::EmergencyActionApplied {
                action,
                timestamp: now,
            });
        }
        OperationParams::ProtocolUpgrade(args) => diamond_cut::apply(env, args)?,
    }
    Ok(())
}

// =============================================================================
// PAUSE & WITHDRAWAL
// =============================================================================

fn set_pause_state(env: &mut Env<'_>, level: u8) -> Result<(), DiamondError> {
    env.require_admin()?;
    let level = PauseLevel::try_from(level)?;
    let now = env.now();

    let live = env.storage.admin.status.live_mut()?;
    let previous = live.level();
    live.set_level(level, now)?;

    info!(%previous, %level, "Pause state changed");
    env.emit(DiamondEvent::PauseStateChanged {
        previous,
        level,
        timestamp: now,
    });
    Ok(())
}

/// Checks, then effects, then the custody transfer.
fn emergency_withdraw(env: &mut Env<'_>, user: Address) -> Result<U256, DiamondError> {
    env.require_admin()?;
    let (caller, now) = (env.caller(), env.now());

    let admin = &mut env.storage.admin;
    admin.status.ensure_allowed(ProtocolAction::EmergencyWithdraw)?;
    admin.limits.roll(user, now);
    admin.limits.ensure_available(user)?;

    let account = env
        .storage
        .savings
        .custody_accounts
        .get(&user)
        .copied()
        .ok_or(CustodyError::NoCustodyAccount { user })?;
    let amount = env.custody.balance_of(account)?;
    if amount.is_zero() {
        return Err(CustodyError::EmptyBalance { account }.into());
    }

    env.storage.admin.limits.consume(user, amount, now)?;
    env.emit(DiamondEvent::EmergencyWithdrawal {
        user,
        account,
        amount,
        admin: caller,
    });

    env.custody.transfer(account, user, amount)?;
    warn!(%user, %account, %amount, admin = %caller, "Emergency withdrawal");
    Ok(amount)
}

fn link_custody_account(env: &mut Env<'_>, user: Address, account: Address) -> Result<(), DiamondError> {
    env.require_admin()?;
    if account.is_zero() {
        return Err(CustodyError::ZeroAccount.into());
    }
    env.storage.savings.custody_accounts.insert(user, account);

    info!(%user, %account, "Custody account linked");
    env.emit(DiamondEvent::CustodyLinked { user, account });
    Ok(())
}
