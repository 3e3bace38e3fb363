//! # Facet Cuts
//!
//! A cut is one batch of routing changes for one facet address:
//! add, replace or remove a list of selectors.

use crate::abi::{self, ArgReader, ParamType, Token};
use crate::domain::value_objects::{Address, Bytes, Selector};
use crate::errors::{AbiError, DiamondError, RoutingError};
use serde::{Deserialize, Serialize};

/// What a cut does with its selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FacetCutAction {
    /// Bind unbound selectors to the facet.
    Add = 0,
    /// Rebind bound selectors to the facet.
    Replace = 1,
    /// Unbind selectors; the facet address must be zero.
    Remove = 2,
}

impl TryFrom<u8> for FacetCutAction {
    type Error = RoutingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Add),
            1 => Ok(Self::Replace),
            2 => Ok(Self::Remove),
            other => Err(RoutingError::InvalidCutAction(other)),
        }
    }
}

/// One routing change batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCut {
    /// Target facet; zero for removal.
    pub facet_address: Address,
    /// Operation.
    pub action: FacetCutAction,
    /// Selectors affected.
    pub selectors: Vec<Selector>,
}

impl FacetCut {
    /// Add `selectors` to `facet`.
    #[must_use]
    pub fn add(facet: Address, selectors: Vec<Selector>) -> Self {
        Self {
            facet_address: facet,
            action: FacetCutAction::Add,
            selectors,
        }
    }

    /// Move `selectors` to `facet`.
    #[must_use]
    pub fn replace(facet: Address, selectors: Vec<Selector>) -> Self {
        Self {
            facet_address: facet,
            action: FacetCutAction::Replace,
            selectors,
        }
    }

    /// Remove `selectors`.
    #[must_use]
    pub fn remove(selectors: Vec<Selector>) -> Self {
        Self {
            facet_address: Address::ZERO,
            action: FacetCutAction::Remove,
            selectors,
        }
    }

    /// ABI schema of one cut: `(address,uint8,bytes4[])`.
    #[must_use]
    pub fn param_type() -> ParamType {
        ParamType::Tuple(vec![
            ParamType::Address,
            ParamType::Uint(8),
            ParamType::selector_array(),
        ])
    }

    /// Encode as an ABI tuple.
    #[must_use]
    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Address(self.facet_address),
            Token::uint(self.action as u8),
            Token::Array(self.selectors.iter().copied().map(Token::selector).collect()),
        ])
    }

    /// Decode from an ABI tuple.
    ///
    /// # Errors
    ///
    /// Returns an error on a malformed tuple or unknown action.
    pub fn from_token(token: Token) -> Result<Self, DiamondError> {
        let mut fields = ArgReader::new(token.into_tuple()?);
        let facet_address = fields.address()?;
        let action = FacetCutAction::try_from(fields.uint8()?)?;
        let selectors = fields
            .array()?
            .into_iter()
            .map(Token::into_selector)
            .collect::<Result<Vec<_>, AbiError>>()?;
        Ok(Self {
            facet_address,
            action,
            selectors,
        })
    }
}

/// Arguments of a `diamondCut` call (also the protocol-upgrade payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiamondCutArgs {
    /// Cuts applied in order.
    pub cuts: Vec<FacetCut>,
    /// Facet run after the cuts; zero for none.
    pub init: Address,
    /// Call data for `init`.
    pub calldata: Bytes,
}

impl DiamondCutArgs {
    /// Cuts with no initializer.
    #[must_use]
    pub fn new(cuts: Vec<FacetCut>) -> Self {
        Self {
            cuts,
            init: Address::ZERO,
            calldata: Bytes::new(),
        }
    }

    /// Attach an initializer call.
    #[must_use]
    pub fn with_init(mut self, init: Address, calldata: Bytes) -> Self {
        self.init = init;
        self.calldata = calldata;
        self
    }

    /// ABI schema: `((address,uint8,bytes4[])[],address,bytes)`.
    #[must_use]
    pub fn param_types() -> Vec<ParamType> {
        vec![
            ParamType::Array(Box::new(FacetCut::param_type())),
            ParamType::Address,
            ParamType::Bytes,
        ]
    }

    /// Encode as the argument list.
    #[must_use]
    pub fn to_tokens(&self) -> Vec<Token> {
        vec![
            Token::Array(self.cuts.iter().map(FacetCut::to_token).collect()),
            Token::Address(self.init),
            Token::Bytes(self.calldata.0.clone()),
        ]
    }

    /// Encode without a selector (governance payload form).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        abi::encode(&self.to_tokens())
    }

    /// Decode from an argument reader positioned at the cut list.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed input.
    pub fn read(args: &mut ArgReader) -> Result<Self, DiamondError> {
        let cuts = args
            .array()?
            .into_iter()
            .map(FacetCut::from_token)
            .collect::<Result<Vec<_>, _>>()?;
        let init = args.address()?;
        let calldata = Bytes(args.bytes()?);
        Ok(Self {
            cuts,
            init,
            calldata,
        })
    }

    /// Decode from a selector-less payload.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed input.
    pub fn decode(payload: &[u8]) -> Result<Self, DiamondError> {
        let mut args = ArgReader::new(abi::decode(&Self::param_types(), payload)?);
        Self::read(&mut args)
    }

    /// Check initializer consistency: both set or both empty.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidInit`].
    pub fn validate_init(&self) -> Result<(), RoutingError> {
        match (self.init.is_zero(), self.calldata.is_empty()) {
            (true, false) => Err(RoutingError::InvalidInit(
                "init address is zero but calldata is not empty",
            )),
            (false, true) => Err(RoutingError::InvalidInit(
                "calldata is empty but init is not the zero address",
            )),
            _ => Ok(()),
        }
    }
}
