//! # Integration Scenarios
//!
//! Every scenario drives a standard diamond through [`DiamondService`], the
//! same calldata path an external caller uses. Nothing reaches into storage
//! except to check invariants after the fact.

pub mod governance;
pub mod routing;
pub mod withdrawal;

use pv_diamond::abi::{decode, ArgReader, ParamType};
use pv_diamond::prelude::*;
use std::sync::Arc;

/// Deployment time of every harness diamond.
pub const GENESIS: u64 = 1_700_000_000;

/// One hour, the default emergency delay.
pub const HOUR: u64 = 3_600;

/// One day, the default standard delay and withdrawal window.
pub const DAY: u64 = 86_400;

/// Diamond owner; always an admin.
pub fn owner() -> Address {
    Address::repeat_byte(0xA1)
}

/// Second admin.
pub fn admin_b() -> Address {
    Address::repeat_byte(0xB2)
}

/// Third admin.
pub fn admin_c() -> Address {
    Address::repeat_byte(0xC3)
}

/// Someone with no role at all.
pub fn outsider() -> Address {
    Address::repeat_byte(0xEE)
}

/// A deployed diamond behind the async service, plus its custody ledger.
pub struct Harness {
    /// The service under test.
    pub service: DiamondService,
    /// Custody balances the admin facet withdraws from.
    pub custody: Arc<InMemoryCustody>,
}

impl Harness {
    /// Owner plus `admins`, with `config`.
    pub fn with_config(admins: &[Address], config: &DiamondConfig) -> Self {
        let custody = Arc::new(InMemoryCustody::new());
        let diamond =
            Diamond::deploy_standard(owner(), admins, config, custody.clone(), GENESIS)
                .expect("standard deployment");
        Self {
            service: DiamondService::new(diamond, ServiceConfig::default()),
            custody,
        }
    }

    /// Owner, B and C with the test configuration (quorum 2).
    pub fn three_admins() -> Self {
        Self::with_config(&[admin_b(), admin_c()], &DiamondConfig::for_testing())
    }

    /// Owner and B with the test configuration (quorum 2).
    pub fn two_admins() -> Self {
        Self::with_config(&[admin_b()], &DiamondConfig::for_testing())
    }

    /// State-changing call at `timestamp`.
    pub async fn call(
        &self,
        caller: Address,
        timestamp: u64,
        data: Bytes,
    ) -> Result<CallReceipt, DiamondError> {
        self.service
            .call(CallRequest::new(caller, timestamp, data))
            .await
    }

    /// Read-only call at `timestamp`.
    pub async fn view(&self, timestamp: u64, data: Bytes) -> Result<Bytes, DiamondError> {
        self.service
            .static_call(CallRequest::new(outsider(), timestamp, data))
            .await
    }

    /// Propose `params` as `proposer` and return the operation id.
    pub async fn propose(
        &self,
        proposer: Address,
        timestamp: u64,
        params: &OperationParams,
    ) -> Result<Hash, DiamondError> {
        let receipt = self
            .call(proposer, timestamp, admin::Function::propose(params))
            .await?;
        let id = ArgReader::new(decode(
            &[ParamType::FixedBytes(32)],
            receipt.output.as_slice(),
        )?)
        .hash()?;
        Ok(id)
    }

    /// `getOperation(id)`, decoded.
    pub async fn operation(&self, timestamp: u64, id: Hash) -> admin::OperationView {
        let output = self
            .view(timestamp, admin::Function::get_operation(id))
            .await
            .expect("getOperation");
        admin::OperationView::decode(output.as_slice()).expect("operation view")
    }

    /// `getPauseState()`, decoded.
    pub async fn pause_state(&self, timestamp: u64) -> admin::PauseStateView {
        let output = self
            .view(timestamp, admin::Function::GetPauseState.no_args())
            .await
            .expect("getPauseState");
        admin::PauseStateView::decode(output.as_slice()).expect("pause view")
    }

    /// Single boolean returned by a view.
    pub async fn view_bool(&self, timestamp: u64, data: Bytes) -> bool {
        let output = self.view(timestamp, data).await.expect("bool view");
        ArgReader::new(decode(&[ParamType::Bool], output.as_slice()).expect("bool word"))
            .boolean()
            .expect("bool")
    }
}

/// Install a log subscriber for a test run; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
