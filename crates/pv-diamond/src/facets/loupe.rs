//! # Diamond Loupe Facet
//!
//! EIP-2535 introspection over the routing table, plus ERC-165.

use super::{ownership, Env, FacetFunction};
use crate::abi::{decode_call_args, encode, ParamType, Token};
use crate::domain::value_objects::{Bytes, Selector};
use crate::errors::DiamondError;

/// Functions of the loupe facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `facets()`
    Facets,
    /// `facetFunctionSelectors(address)`
    FacetFunctionSelectors,
    /// `facetAddresses()`
    FacetAddresses,
    /// `facetAddress(bytes4)`
    FacetAddress,
    /// `supportsInterface(bytes4)`
    SupportsInterface,
}

impl FacetFunction for Function {
    const ALL: &'static [Self] = &[
        Self::Facets,
        Self::FacetFunctionSelectors,
        Self::FacetAddresses,
        Self::FacetAddress,
        Self::SupportsInterface,
    ];

    fn signature(self) -> &'static str {
        match self {
            Self::Facets => "facets()",
            Self::FacetFunctionSelectors => "facetFunctionSelectors(address)",
            Self::FacetAddresses => "facetAddresses()",
            Self::FacetAddress => "facetAddress(bytes4)",
            Self::SupportsInterface => "supportsInterface(bytes4)",
        }
    }

    fn is_view(self) -> bool {
        true
    }
}

/// Interface ids a standard diamond answers `true` for: ERC-165,
/// IDiamondCut, IDiamondLoupe and ERC-173.
#[must_use]
pub fn standard_interfaces() -> Vec<Selector> {
    let loupe = [
        Function::Facets,
        Function::FacetFunctionSelectors,
        Function::FacetAddresses,
        Function::FacetAddress,
    ]
    .map(FacetFunction::selector);

    vec![
        Function::SupportsInterface.selector(),
        Selector::interface_id(&super::diamond_cut::Function::selectors()),
        Selector::interface_id(&loupe),
        Selector::interface_id(&ownership::Function::selectors()),
    ]
}

fn selector_array(selectors: &[Selector]) -> Token {
    Token::Array(selectors.iter().copied().map(Token::selector).collect())
}

pub(super) fn invoke(env: &mut Env<'_>, function: Function, calldata: &[u8]) -> Result<Bytes, DiamondError> {
    let registry = &env.storage.diamond.registry;

    let output = match function {
        Function::Facets => {
            let facets = registry
                .facets()
                .into_iter()
                .map(|(facet, selectors)| {
                    Token::Tuple(vec![Token::Address(facet), selector_array(&selectors)])
                })
                .collect();
            encode(&[Token::Array(facets)])
        }
        Function::FacetFunctionSelectors => {
            let facet = decode_call_args(&[ParamType::Address], calldata)?.address()?;
            encode(&[selector_array(registry.selectors_of(facet))])
        }
        Function::FacetAddresses => {
            let addresses = registry
                .facet_addresses()
                .iter()
                .copied()
                .map(Token::Address)
                .collect();
            encode(&[Token::Array(addresses)])
        }
        Function::FacetAddress => {
            let selector = decode_call_args(&[ParamType::FixedBytes(4)], calldata)?.selector()?;
            let facet = registry.resolve(selector).unwrap_or_default();
            encode(&[Token::Address(facet)])
        }
        Function::SupportsInterface => {
            let interface = decode_call_args(&[ParamType::FixedBytes(4)], calldata)?.selector()?;
            let supported = env.storage.diamond.supported_interfaces.contains(&interface);
            encode(&[Token::Bool(supported)])
        }
    };

    Ok(Bytes(output))
}
