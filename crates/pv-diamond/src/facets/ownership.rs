//! # Ownership Facet
//!
//! ERC-173 contract ownership.

use super::{Env, FacetFunction};
use crate::abi::{decode_call_args, encode, ParamType, Token};
use crate::domain::value_objects::Bytes;
use crate::errors::{DiamondError, GovernanceError};
use crate::events::DiamondEvent;
use tracing::info;

/// Functions of the ownership facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `owner()`
    Owner,
    /// `transferOwnership(address)`
    TransferOwnership,
}

impl FacetFunction for Function {
    const ALL: &'static [Self] = &[Self::Owner, Self::TransferOwnership];

    fn signature(self) -> &'static str {
        match self {
            Self::Owner => "owner()",
            Self::TransferOwnership => "transferOwnership(address)",
        }
    }

    fn is_view(self) -> bool {
        matches!(self, Self::Owner)
    }
}

pub(super) fn invoke(env: &mut Env<'_>, function: Function, calldata: &[u8]) -> Result<Bytes, DiamondError> {
    match function {
        Function::Owner => Ok(Bytes(encode(&[Token::Address(env.storage.owner())]))),
        Function::TransferOwnership => {
            env.require_owner()?;
            let new = decode_call_args(&[ParamType::Address], calldata)?.address()?;
            if new.is_zero() {
                return Err(GovernanceError::ZeroOwner.into());
            }
            let previous = env.storage.owner();
            env.storage.diamond.owner = new;
            // The owner counts as an admin, so handing ownership to a listed
            // admin shrinks the signer set.
            if env.storage.admin.initialized {
                let required = env.storage.admin.timelock.min_signatures();
                env.storage.ensure_quorum_reachable(required)?;
            }

            info!(%previous, %new, "Ownership transferred");
            env.emit(DiamondEvent::OwnershipTransferred { previous, new });
            Ok(Bytes::new())
        }
    }
}
