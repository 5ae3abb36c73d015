//! Mock HistoryEngine for testing.
//!
//! Records every apply call with its request for assertions.
//! Responses are scripted: queued results are returned in order, then the
//! default (success) for everything after.

use history_replication::engine::{
    EngineError, EngineFuture, HistoryEngine, ReplicateEventsRequest, ReplicateEventsV2Request,
    SyncActivityRequest,
};
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// A recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    SyncActivity(SyncActivityRequest),
    ReplicateEvents(ReplicateEventsRequest),
    ReplicateEventsV2(ReplicateEventsV2Request),
}

/// Mock implementation of HistoryEngine that records all calls.
///
/// # Example
/// ```rust,ignore
/// let engine = MockHistoryEngine::new();
/// engine.push_result(Err(EngineError::Timeout)).await;
///
/// // Use in tests...
///
/// assert_eq!(engine.calls().await.len(), 1);
/// ```
#[derive(Default)]
pub struct MockHistoryEngine {
    calls: Mutex<Vec<EngineCall>>,
    results: Mutex<VecDeque<Result<(), EngineError>>>,
}

impl MockHistoryEngine {
    /// Create a mock that accepts every apply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose first apply fails with `err`.
    pub fn failing_once(err: EngineError) -> Self {
        Self {
            results: Mutex::new(VecDeque::from([Err(err)])),
            ..Self::default()
        }
    }

    /// Queue a result for the next unanswered call.
    pub async fn push_result(&self, result: Result<(), EngineError>) {
        self.results.lock().await.push_back(result);
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().await.clone()
    }

    /// Get count of recorded calls.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn record(&self, call: EngineCall) -> Result<(), EngineError> {
        self.calls.lock().await.push(call);
        self.results.lock().await.pop_front().unwrap_or(Ok(()))
    }
}

impl HistoryEngine for MockHistoryEngine {
    fn sync_activity(&self, request: SyncActivityRequest) -> EngineFuture<'_> {
        Box::pin(async move { self.record(EngineCall::SyncActivity(request)).await })
    }

    fn replicate_events(&self, request: ReplicateEventsRequest) -> EngineFuture<'_> {
        Box::pin(async move { self.record(EngineCall::ReplicateEvents(request)).await })
    }

    fn replicate_events_v2(&self, request: ReplicateEventsV2Request) -> EngineFuture<'_> {
        Box::pin(async move { self.record(EngineCall::ReplicateEventsV2(request)).await })
    }
}
