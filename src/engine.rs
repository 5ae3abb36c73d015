// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Local history engine integration.
//!
//! Defines the three apply operations the executor drives and the request
//! shapes they take. The engine is whatever owns this shard's workflow
//! state; the executor never touches storage directly.
//!
//! # Example
//!
//! ```rust,no_run
//! use history_replication::engine::{
//!     EngineFuture, HistoryEngine, ReplicateEventsRequest, ReplicateEventsV2Request,
//!     SyncActivityRequest,
//! };
//!
//! struct MyEngine;
//!
//! impl HistoryEngine for MyEngine {
//!     fn sync_activity(&self, _request: SyncActivityRequest) -> EngineFuture<'_> {
//!         Box::pin(async { Ok(()) })
//!     }
//!
//!     fn replicate_events(&self, _request: ReplicateEventsRequest) -> EngineFuture<'_> {
//!         Box::pin(async { Ok(()) })
//!     }
//!
//!     fn replicate_events_v2(&self, _request: ReplicateEventsV2Request) -> EngineFuture<'_> {
//!         Box::pin(async { Ok(()) })
//!     }
//! }
//! ```

use crate::task::{DataBlob, ReplicationInfo, VersionHistory, VersionHistoryItem};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by every engine operation.
pub type EngineFuture<'a> = Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;

/// Identifies one run of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub run_id: String,
}

/// Engine-side form of a sync-activity task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncActivityRequest {
    pub domain_id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub version: i64,
    pub scheduled_id: i64,
    pub scheduled_time: i64,
    pub started_id: i64,
    pub started_time: i64,
    pub last_heartbeat_time: i64,
    pub details: Vec<u8>,
    pub attempt: i32,
    pub last_failure_reason: String,
    pub last_worker_identity: String,
    pub last_failure_details: Vec<u8>,
    pub version_history: Option<VersionHistory>,
}

/// Engine-side form of a legacy history task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplicateEventsRequest {
    pub domain_uuid: String,
    pub workflow_execution: WorkflowExecution,
    /// Cluster the task was delivered from.
    pub source_cluster: String,
    pub force_buffer_events: bool,
    pub first_event_id: i64,
    pub next_event_id: i64,
    pub version: i64,
    pub replication_info: HashMap<String, ReplicationInfo>,
    pub history: Option<DataBlob>,
    pub new_run_history: Option<DataBlob>,
    pub reset_workflow: bool,
    pub new_run_ndc: bool,
}

/// Engine-side form of a versioned history task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplicateEventsV2Request {
    pub domain_uuid: String,
    pub workflow_execution: WorkflowExecution,
    pub version_history_items: Vec<VersionHistoryItem>,
    pub events: Option<DataBlob>,
    pub new_run_events: Option<DataBlob>,
}

/// Local history is missing events before a legacy-format task.
///
/// `run_id`/`next_event_id` point at where local history for the workflow
/// currently ends.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("retry task: {message}")]
pub struct RetryTaskError {
    pub message: String,
    pub domain_id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub next_event_id: Option<i64>,
}

/// Local history is missing events on a versioned branch.
///
/// The missing range is exclusive on both ends:
/// `(start_event_id@start_event_version, end_event_id@end_event_version)`.
/// An absent start means "from the beginning", an absent end means "to the
/// current tip".
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("retry task v2: {message}")]
pub struct RetryTaskV2Error {
    pub message: String,
    pub domain_id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub start_event_id: Option<i64>,
    pub start_event_version: Option<i64>,
    pub end_event_id: Option<i64>,
    pub end_event_version: Option<i64>,
}

/// Errors returned by the local history engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Legacy-format history gap.
    #[error(transparent)]
    RetryTask(RetryTaskError),

    /// Versioned-format history gap.
    #[error(transparent)]
    RetryTaskV2(RetryTaskV2Error),

    /// The workflow or run does not exist locally.
    #[error("entity not exists: {0}")]
    EntityNotExists(String),

    /// Request rejected as invalid by the engine.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Shard moved or engine overloaded.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Transport gave up waiting for the engine.
    #[error("engine call timed out")]
    Timeout,

    #[error("engine internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Check if the caller may retry after this error.
    ///
    /// Gap errors count as retryable: if they reach the caller, the resend
    /// did not happen (no run id to resend from), and the gap may be filled
    /// by a later task.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RetryTask(_) | Self::RetryTaskV2(_) => true,
            Self::Unavailable(_) | Self::Timeout => true,
            Self::EntityNotExists(_) | Self::BadRequest(_) | Self::Internal(_) => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RetryTask(_) => "retry_task",
            Self::RetryTaskV2(_) => "retry_task_v2",
            Self::EntityNotExists(_) => "entity_not_exists",
            Self::BadRequest(_) => "bad_request",
            Self::Unavailable(_) => "unavailable",
            Self::Timeout => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<RetryTaskError> for EngineError {
    fn from(e: RetryTaskError) -> Self {
        Self::RetryTask(e)
    }
}

impl From<RetryTaskV2Error> for EngineError {
    fn from(e: RetryTaskV2Error) -> Self {
        Self::RetryTaskV2(e)
    }
}

/// The apply operations we need from the local history engine.
///
/// Implementations own their own timeouts; the executor waits for whatever
/// the returned future resolves to.
pub trait HistoryEngine: Send + Sync + 'static {
    /// Apply an activity heartbeat/progress snapshot.
    fn sync_activity(&self, request: SyncActivityRequest) -> EngineFuture<'_>;

    /// Apply a legacy-format event range.
    fn replicate_events(&self, request: ReplicateEventsRequest) -> EngineFuture<'_>;

    /// Apply a versioned-format events blob.
    fn replicate_events_v2(&self, request: ReplicateEventsV2Request) -> EngineFuture<'_>;
}

impl<E: HistoryEngine> HistoryEngine for std::sync::Arc<E> {
    fn sync_activity(&self, request: SyncActivityRequest) -> EngineFuture<'_> {
        (**self).sync_activity(request)
    }

    fn replicate_events(&self, request: ReplicateEventsRequest) -> EngineFuture<'_> {
        (**self).replicate_events(request)
    }

    fn replicate_events_v2(&self, request: ReplicateEventsV2Request) -> EngineFuture<'_> {
        (**self).replicate_events_v2(request)
    }
}

/// An engine that accepts everything and stores nothing.
///
/// Useful for dry runs and standalone mode.
#[derive(Debug, Clone, Default)]
pub struct NoOpHistoryEngine;

impl HistoryEngine for NoOpHistoryEngine {
    fn sync_activity(&self, request: SyncActivityRequest) -> EngineFuture<'_> {
        Box::pin(async move {
            tracing::debug!(
                domain_id = %request.domain_id,
                workflow_id = %request.workflow_id,
                run_id = %request.run_id,
                scheduled_id = request.scheduled_id,
                "NoOp: would sync activity"
            );
            Ok(())
        })
    }

    fn replicate_events(&self, request: ReplicateEventsRequest) -> EngineFuture<'_> {
        Box::pin(async move {
            tracing::debug!(
                domain_id = %request.domain_uuid,
                workflow_id = %request.workflow_execution.workflow_id,
                run_id = %request.workflow_execution.run_id,
                first_event_id = request.first_event_id,
                next_event_id = request.next_event_id,
                "NoOp: would replicate events"
            );
            Ok(())
        })
    }

    fn replicate_events_v2(&self, request: ReplicateEventsV2Request) -> EngineFuture<'_> {
        Box::pin(async move {
            tracing::debug!(
                domain_id = %request.domain_uuid,
                workflow_id = %request.workflow_execution.workflow_id,
                run_id = %request.workflow_execution.run_id,
                items = request.version_history_items.len(),
                "NoOp: would replicate events v2"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_engine_accepts_everything() {
        let engine = NoOpHistoryEngine;
        assert!(engine.sync_activity(SyncActivityRequest::default()).await.is_ok());
        assert!(engine.replicate_events(ReplicateEventsRequest::default()).await.is_ok());
        assert!(engine
            .replicate_events_v2(ReplicateEventsV2Request::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_arc_engine_delegates() {
        let engine = std::sync::Arc::new(NoOpHistoryEngine);
        assert!(engine.sync_activity(SyncActivityRequest::default()).await.is_ok());
    }

    #[test]
    fn test_engine_error_retryable() {
        assert!(EngineError::Unavailable("shard moved".into()).is_retryable());
        assert!(EngineError::Timeout.is_retryable());
        assert!(EngineError::from(RetryTaskError::default()).is_retryable());
        assert!(!EngineError::BadRequest("bad".into()).is_retryable());
        assert!(!EngineError::EntityNotExists("gone".into()).is_retryable());
        assert!(!EngineError::Internal("boom".into()).is_retryable());
    }

    #[test]
    fn test_gap_error_display_is_transparent() {
        let err = EngineError::from(RetryTaskV2Error {
            message: "missing events".into(),
            ..Default::default()
        });
        assert_eq!(err.to_string(), "retry task v2: missing events");
        assert_eq!(err.kind(), "retry_task_v2");
    }
}
