//! # Driving Ports (API - Inbound)
//!
//! The interface callers use to reach the diamond.

use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::DiamondError;
use crate::events::DiamondEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One external call into the diamond.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Message sender.
    pub caller: Address,
    /// Attached value in wei.
    pub value: U256,
    /// Unix seconds the call executes at.
    pub timestamp: u64,
    /// Selector plus ABI-encoded arguments.
    pub data: Bytes,
}

impl CallRequest {
    /// A call carrying no value.
    #[must_use]
    pub fn new(caller: Address, timestamp: u64, data: Bytes) -> Self {
        Self {
            caller,
            value: U256::zero(),
            timestamp,
            data,
        }
    }
}

/// Result of a committed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReceipt {
    /// Identifier carried through the call's log lines.
    pub correlation_id: Uuid,
    /// ABI-encoded return data.
    pub output: Bytes,
    /// Events the call emitted.
    pub events: Vec<DiamondEvent>,
}

/// Primary API of the diamond.
///
/// ## Usage
///
/// ```ignore
/// let receipt = api.call(CallRequest::new(owner, now, calldata)).await?;
/// ```
#[async_trait]
pub trait DiamondApi: Send + Sync {
    /// Dispatch a call and commit its effects, or roll everything back.
    async fn call(&self, request: CallRequest) -> Result<CallReceipt, DiamondError>;

    /// Dispatch a read-only call. Nothing is ever committed; functions
    /// that change state are refused.
    async fn static_call(&self, request: CallRequest) -> Result<Bytes, DiamondError>;
}
