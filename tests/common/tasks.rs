//! Task builders and a fully wired executor over the mocks.

use super::{MockDomainCache, MockHistoryEngine, MockNdcResender, MockRereplicator};
use history_replication::task::{
    HistoryTaskAttributes, HistoryTaskV2Attributes, ReplicationTask, SyncActivityTaskAttributes,
    EMPTY_VERSION,
};
use history_replication::ReplicationTaskExecutor;
use std::sync::Arc;

/// Cluster name the test executor runs as.
pub const CURRENT_CLUSTER: &str = "test";

pub type MockExecutor =
    ReplicationTaskExecutor<MockHistoryEngine, MockDomainCache, MockRereplicator, MockNdcResender>;

/// Executor plus handles to every mock it talks to.
pub struct Harness {
    pub executor: MockExecutor,
    pub engine: Arc<MockHistoryEngine>,
    pub domains: Arc<MockDomainCache>,
    pub rereplicator: Arc<MockRereplicator>,
    pub ndc_resender: Arc<MockNdcResender>,
}

impl Harness {
    pub fn new(
        engine: MockHistoryEngine,
        domains: MockDomainCache,
        rereplicator: MockRereplicator,
        ndc_resender: MockNdcResender,
    ) -> Self {
        let engine = Arc::new(engine);
        let domains = Arc::new(domains);
        let rereplicator = Arc::new(rereplicator);
        let ndc_resender = Arc::new(ndc_resender);
        let executor = ReplicationTaskExecutor::new(
            CURRENT_CLUSTER,
            Arc::clone(&domains),
            Arc::clone(&ndc_resender),
            Arc::clone(&rereplicator),
            Arc::clone(&engine),
        );
        Self {
            executor,
            engine,
            domains,
            rereplicator,
            ndc_resender,
        }
    }

    /// All mocks in their default (succeeding) state.
    pub fn default_mocks() -> Self {
        Self::new(
            MockHistoryEngine::new(),
            MockDomainCache::new(),
            MockRereplicator::new(),
            MockNdcResender::new(),
        )
    }

    /// Custom engine; every other mock succeeds.
    pub fn with_engine(engine: MockHistoryEngine) -> Self {
        Self::new(
            engine,
            MockDomainCache::new(),
            MockRereplicator::new(),
            MockNdcResender::new(),
        )
    }
}

pub fn sync_activity_task(domain_id: &str, workflow_id: &str, run_id: &str) -> ReplicationTask {
    ReplicationTask::sync_activity(SyncActivityTaskAttributes {
        domain_id: domain_id.to_string(),
        workflow_id: workflow_id.to_string(),
        run_id: run_id.to_string(),
        ..Default::default()
    })
}

pub fn history_task(
    domain_id: &str,
    workflow_id: &str,
    run_id: &str,
    first_event_id: i64,
    next_event_id: i64,
) -> ReplicationTask {
    ReplicationTask::history(HistoryTaskAttributes {
        domain_id: domain_id.to_string(),
        workflow_id: workflow_id.to_string(),
        run_id: run_id.to_string(),
        first_event_id,
        next_event_id,
        version: EMPTY_VERSION,
        ..Default::default()
    })
}

pub fn history_v2_task(domain_id: &str, workflow_id: &str, run_id: &str) -> ReplicationTask {
    ReplicationTask::history_v2(HistoryTaskV2Attributes {
        domain_id: domain_id.to_string(),
        workflow_id: workflow_id.to_string(),
        run_id: run_id.to_string(),
        ..Default::default()
    })
}
