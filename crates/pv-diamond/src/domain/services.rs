//! # Domain Services
//!
//! Pure derivation functions: hashing, storage slot locations, operation
//! identifiers. Deterministic, no side effects.

use crate::abi::{self, Token};
use crate::domain::value_objects::{Address, Hash};
use sha3::{Digest, Keccak256};

/// Compute Keccak-256.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    Hash::new(hasher.finalize().into())
}

/// Storage location of a namespaced region: `keccak256(namespace)`.
#[must_use]
pub fn storage_slot(namespace: &str) -> Hash {
    keccak256(namespace.as_bytes())
}

/// Content-derived identifier of a governance proposal.
///
/// `keccak256(abi.encode(proposer, timestamp, class, params))`. Two proposals
/// from the same proposer in the same second with the same class and
/// parameters collide; the second one is rejected rather than merged.
#[must_use]
pub fn operation_id(proposer: Address, timestamp: u64, class: u8, params: &[u8]) -> Hash {
    keccak256(&abi::encode(&[
        Token::Address(proposer),
        Token::uint(timestamp),
        Token::uint(class),
        Token::Bytes(params.to_vec()),
    ]))
}

/// Deterministic deployment address for a named contract.
#[must_use]
pub fn deployment_address(name: &str) -> Address {
    Address::from_hash(&keccak256(format!("petvault.deploy.{name}").as_bytes()))
}
