//! # Diamond Service
//!
//! Async wrapper that serializes calls into one [`Diamond`].
//!
//! - Each call holds the write lock for its whole dispatch, so calls never
//!   interleave.
//! - Every call gets a correlation id carried through its log lines and
//!   returned in the receipt.
//! - Committed events are kept in a bounded log.

use crate::adapters::InMemoryCustody;
use crate::config::DiamondConfig;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::{DiamondError, ErrorKind};
use crate::events::DiamondEvent;
use crate::facets::CallContext;
use crate::ports::inbound::{CallReceipt, CallRequest, DiamondApi};
use crate::proxy::Diamond;

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Diamond service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Events retained in the log; oldest are dropped first.
    pub max_recorded_events: usize,
    /// Record call statistics.
    pub enable_stats: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_recorded_events: 1024,
            enable_stats: true,
        }
    }
}

/// Statistics for the diamond service.
#[derive(Debug, Default, Clone)]
pub struct ServiceStats {
    /// Calls received, static calls included.
    pub calls: u64,
    /// Calls that committed.
    pub successful_calls: u64,
    /// Calls that reverted.
    pub failed_calls: u64,
    /// Reverts by error kind.
    pub failures_by_kind: HashMap<ErrorKind, u64>,
    /// Events committed.
    pub events_emitted: u64,
}

/// The diamond service.
pub struct DiamondService {
    /// Service configuration.
    config: ServiceConfig,
    /// The diamond; the write lock is held for a whole call.
    diamond: Arc<RwLock<Diamond>>,
    /// Committed events, oldest first.
    event_log: Arc<RwLock<VecDeque<DiamondEvent>>>,
    /// Service statistics.
    stats: Arc<RwLock<ServiceStats>>,
}

impl DiamondService {
    /// Wrap a deployed diamond.
    #[must_use]
    pub fn new(diamond: Diamond, config: ServiceConfig) -> Self {
        Self {
            config,
            diamond: Arc::new(RwLock::new(diamond)),
            event_log: Arc::new(RwLock::new(VecDeque::new())),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// Committed events, oldest first.
    pub async fn events(&self) -> Vec<DiamondEvent> {
        self.event_log.read().await.iter().cloned().collect()
    }

    /// Run `f` against the diamond under the read lock.
    pub async fn inspect<R>(&self, f: impl FnOnce(&Diamond) -> R) -> R {
        f(&*self.diamond.read().await)
    }

    #[instrument(skip(self, request), fields(correlation_id = %correlation_id, caller = %request.caller))]
    async fn call_internal(
        &self,
        correlation_id: Uuid,
        request: CallRequest,
    ) -> Result<CallReceipt, DiamondError> {
        let ctx = CallContext {
            caller: request.caller,
            value: request.value,
            timestamp: request.timestamp,
            is_static: false,
        };

        let result = {
            let mut diamond = self.diamond.write().await;
            diamond.call(ctx, request.data.as_slice())
        };

        match result {
            Ok(outcome) => {
                info!(events = outcome.events.len(), "Call committed");
                self.record(&outcome.events).await;
                self.record_success(outcome.events.len()).await;
                Ok(CallReceipt {
                    correlation_id,
                    output: outcome.output,
                    events: outcome.events,
                })
            }
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), "Call failed");
                self.record_failure(err.kind()).await;
                Err(err)
            }
        }
    }

    async fn record(&self, events: &[DiamondEvent]) {
        if self.config.max_recorded_events == 0 {
            return;
        }
        let mut log = self.event_log.write().await;
        for event in events {
            if log.len() == self.config.max_recorded_events {
                log.pop_front();
            }
            log.push_back(event.clone());
        }
    }

    async fn record_success(&self, events: usize) {
        if !self.config.enable_stats {
            return;
        }
        let mut stats = self.stats.write().await;
        stats.calls += 1;
        stats.successful_calls += 1;
        stats.events_emitted += events as u64;
    }

    async fn record_failure(&self, kind: ErrorKind) {
        if !self.config.enable_stats {
            return;
        }
        let mut stats = self.stats.write().await;
        stats.calls += 1;
        stats.failed_calls += 1;
        *stats.failures_by_kind.entry(kind).or_default() += 1;
    }
}

#[async_trait]
impl DiamondApi for DiamondService {
    async fn call(&self, request: CallRequest) -> Result<CallReceipt, DiamondError> {
        self.call_internal(Uuid::new_v4(), request).await
    }

    async fn static_call(&self, request: CallRequest) -> Result<Bytes, DiamondError> {
        let ctx = CallContext {
            caller: request.caller,
            value: request.value,
            timestamp: request.timestamp,
            is_static: true,
        };
        debug!(caller = %request.caller, "Static call");
        let result = self
            .diamond
            .read()
            .await
            .static_call(ctx, request.data.as_slice());

        match &result {
            Ok(_) => self.record_success(0).await,
            Err(err) => self.record_failure(err.kind()).await,
        }
        result
    }
}

/// Create a service over a standard diamond for testing.
///
/// The owner is `0x0a..0a`, the extra admin `0x0b..0b`, and the quorum 2.
///
/// # Errors
///
/// Propagates deployment failure.
pub fn create_test_service(
    custody: Arc<InMemoryCustody>,
    now: u64,
) -> Result<DiamondService, DiamondError> {
    let diamond = Diamond::deploy_standard(
        Address::repeat_byte(0x0A),
        &[Address::repeat_byte(0x0B)],
        &DiamondConfig::for_testing(),
        custody,
        now,
    )?;
    Ok(DiamondService::new(diamond, ServiceConfig::default()))
}

// =============================================================================
// TESTS
// =============================================================================
