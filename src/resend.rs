// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! History resend (gap-fill) coordinators.
//!
//! When the local engine reports that history is missing before a task, the
//! executor asks one of these to fetch the missing range from the source
//! cluster and replay it locally. Two protocols exist, one per history
//! format:
//!
//! - [`HistoryRereplicator`]: legacy single-branch history, addressed by
//!   `(run_id, event_id)` positions that may span runs.
//! - [`NdcHistoryResender`]: versioned multi-branch history, addressed by
//!   `(event_id, version)` bounds on one run.
//!
//! Both must be idempotent: resending a range that is already present
//! locally is harmless.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by resend operations.
pub type ResendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ResendError>> + Send + 'a>>;

/// A position in legacy history: an event within a specific run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventPosition {
    pub run_id: String,
    pub event_id: i64,
}

impl EventPosition {
    pub fn new(run_id: impl Into<String>, event_id: i64) -> Self {
        Self {
            run_id: run_id.into(),
            event_id,
        }
    }
}

/// Legacy resend request: fetch `[begin, end)` from `source_cluster`.
///
/// `begin` is where local history stops, `end` is where the task that
/// failed starts. The two may be in different runs of the same workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryResendRequest {
    pub domain_id: String,
    pub workflow_id: String,
    pub source_cluster: String,
    pub begin: EventPosition,
    pub end: EventPosition,
}

/// Versioned resend request for one run.
///
/// Bounds are exclusive. `None` on the start means from the first event,
/// `None` on the end means up to the source's current tip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NdcResendRequest {
    pub domain_id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub source_cluster: String,
    pub start_event_id: Option<i64>,
    pub start_event_version: Option<i64>,
    pub end_event_id: Option<i64>,
    pub end_event_version: Option<i64>,
}

/// Errors from a resend attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResendError {
    /// The source cluster could not serve the history.
    #[error("remote history fetch failed: {0}")]
    Remote(String),

    /// The fetched history could not be applied locally.
    #[error("replaying fetched history failed: {0}")]
    Apply(String),

    /// The source no longer has the workflow.
    #[error("workflow not found on source cluster: {0}")]
    NotFound(String),
}

/// Legacy history gap-fill.
pub trait HistoryRereplicator: Send + Sync + 'static {
    fn send_multi_workflow_history(&self, request: HistoryResendRequest) -> ResendFuture<'_>;
}

/// Versioned history gap-fill.
pub trait NdcHistoryResender: Send + Sync + 'static {
    fn send_single_workflow_history(&self, request: NdcResendRequest) -> ResendFuture<'_>;
}

impl<R: HistoryRereplicator> HistoryRereplicator for std::sync::Arc<R> {
    fn send_multi_workflow_history(&self, request: HistoryResendRequest) -> ResendFuture<'_> {
        (**self).send_multi_workflow_history(request)
    }
}

impl<R: NdcHistoryResender> NdcHistoryResender for std::sync::Arc<R> {
    fn send_single_workflow_history(&self, request: NdcResendRequest) -> ResendFuture<'_> {
        (**self).send_single_workflow_history(request)
    }
}

/// Resender that does nothing and reports success.
///
/// Suitable when the local engine already tolerates gaps, e.g. in dry runs.
#[derive(Debug, Clone, Default)]
pub struct NoOpResender;

impl HistoryRereplicator for NoOpResender {
    fn send_multi_workflow_history(&self, request: HistoryResendRequest) -> ResendFuture<'_> {
        Box::pin(async move {
            tracing::debug!(
                domain_id = %request.domain_id,
                workflow_id = %request.workflow_id,
                begin_run_id = %request.begin.run_id,
                begin_event_id = request.begin.event_id,
                end_run_id = %request.end.run_id,
                end_event_id = request.end.event_id,
                "NoOp: would resend history"
            );
            Ok(())
        })
    }
}

impl NdcHistoryResender for NoOpResender {
    fn send_single_workflow_history(&self, request: NdcResendRequest) -> ResendFuture<'_> {
        Box::pin(async move {
            tracing::debug!(
                domain_id = %request.domain_id,
                workflow_id = %request.workflow_id,
                run_id = %request.run_id,
                start_event_id = ?request.start_event_id,
                end_event_id = ?request.end_event_id,
                "NoOp: would resend history v2"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_resender() {
        let resender = NoOpResender;
        assert!(resender
            .send_multi_workflow_history(HistoryResendRequest::default())
            .await
            .is_ok());
        assert!(resender
            .send_single_workflow_history(NdcResendRequest::default())
            .await
            .is_ok());
    }

    #[test]
    fn test_resend_error_display() {
        let err = ResendError::Remote("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_event_position() {
        let pos = EventPosition::new("run-1", 7);
        assert_eq!(pos.run_id, "run-1");
        assert_eq!(pos.event_id, 7);
    }
}
