//! # Diamond Cut Facet
//!
//! `diamondCut((address,uint8,bytes4[])[],address,bytes)`: owner-only routing
//! update followed by an optional initializer call run in the diamond's
//! storage context.

use super::{Env, FacetFunction};
use crate::abi::decode_call_args;
use crate::domain::cut::DiamondCutArgs;
use crate::domain::value_objects::Bytes;
use crate::errors::DiamondError;
use crate::events::DiamondEvent;
use tracing::info;

/// Functions of the cut facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `diamondCut((address,uint8,bytes4[])[],address,bytes)`
    DiamondCut,
}

impl FacetFunction for Function {
    const ALL: &'static [Self] = &[Self::DiamondCut];

    fn signature(self) -> &'static str {
        match self {
            Self::DiamondCut => "diamondCut((address,uint8,bytes4[])[],address,bytes)",
        }
    }

    fn is_view(self) -> bool {
        false
    }
}

impl Function {
    /// Call data for `diamondCut(args)`.
    #[must_use]
    pub fn call(args: &DiamondCutArgs) -> Bytes {
        Self::DiamondCut.encode_call(&args.to_tokens())
    }
}

pub(super) fn invoke(env: &mut Env<'_>, function: Function, calldata: &[u8]) -> Result<Bytes, DiamondError> {
    match function {
        Function::DiamondCut => {
            env.require_owner()?;
            let mut reader = decode_call_args(&DiamondCutArgs::param_types(), calldata)?;
            let args = DiamondCutArgs::read(&mut reader)?;
            apply(env, args)?;
            Ok(Bytes::new())
        }
    }
}

/// Apply a cut with the environment's authority; callers check who may cut.
///
/// Routing changes land first, then the initializer runs against the new
/// routing. Any failure fails the whole cut.
///
/// # Errors
///
/// Returns routing errors for an invalid cut or initializer, or the
/// initializer's own error.
pub fn apply(env: &mut Env<'_>, args: DiamondCutArgs) -> Result<(), DiamondError> {
    args.validate_init()?;
    env.storage.diamond.registry.apply(&args.cuts, env.deployments)?;

    info!(
        cuts = args.cuts.len(),
        init = %args.init,
        caller = %env.caller(),
        "Diamond cut applied"
    );

    let DiamondCutArgs {
        cuts,
        init,
        calldata,
    } = args;
    if !init.is_zero() {
        env.delegate(init, calldata.as_slice())?;
    }

    env.emit(DiamondEvent::DiamondCut {
        cuts,
        init,
        calldata,
    });
    Ok(())
}
