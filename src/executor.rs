// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication task executor.
//!
//! Takes one task delivered from a remote cluster and:
//! 1. Checks the task's domain replicates to this cluster ([`DomainFilter`])
//! 2. Translates the payload into the matching engine request and applies it
//! 3. If the engine reports a history gap, backfills it through the resend
//!    coordinator for that history format and asks the caller to re-submit
//!
//! ```text
//! task ──▶ payload check ──▶ DomainFilter ──▶ engine apply ──▶ Applied
//!               │                 │                │
//!               ▼                 ▼                ▼ gap error
//!         Unknown/Malformed    Filtered      classify ──▶ resend ──▶ ResendCompleted
//!                                                 │ other
//!                                                 ▼
//!                                           Err(Engine)
//! ```
//!
//! # Retry Contract
//!
//! The executor never loops. A single call performs at most one resend and
//! reports [`TaskOutcome::ResendCompleted`]; the caller must then submit the
//! identical task again. Backoff, attempt limits and poison-task handling
//! belong to the caller (see [`TaskProcessor`](crate::processor::TaskProcessor)).
//!
//! # Concurrency
//!
//! The executor holds no per-task state and is cheap to clone; clones share
//! the same collaborators. Timeouts are the collaborators' business: a
//! timed-out engine call comes back as an ordinary engine error.

use crate::classify::{
    classify, legacy_resend_request, ndc_resend_request, GapError, HistoryGeneration, TaskIdentity,
};
use crate::config::ReplicationConfig;
use crate::domain::DomainCache;
use crate::engine::{
    EngineError, HistoryEngine, ReplicateEventsRequest, ReplicateEventsV2Request,
    SyncActivityRequest, WorkflowExecution,
};
use crate::error::{ReplicationError, Result};
use crate::filter::DomainFilter;
use crate::metrics;
use crate::resend::{
    HistoryRereplicator, HistoryResendRequest, NdcHistoryResender, NdcResendRequest,
};
use crate::task::{
    HistoryTaskAttributes, HistoryTaskV2Attributes, ReplicationTask, ReplicationTaskType,
    SyncActivityTaskAttributes, TaskPayload, TaskShapeError,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// What happened to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The engine applied the task.
    Applied,

    /// The task's domain does not replicate to this cluster. Acknowledge
    /// without applying.
    Filtered,

    /// The task type carries nothing to apply here.
    Skipped,

    /// A history gap was backfilled. Submit the same task again.
    ResendCompleted { generation: HistoryGeneration },
}

impl TaskOutcome {
    /// Whether the caller must re-submit the identical task.
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::ResendCompleted { .. })
    }

    /// Label for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Filtered => "filtered",
            Self::Skipped => "skipped",
            Self::ResendCompleted { .. } => "retry",
        }
    }
}

/// Which gap shapes an apply operation can resolve.
#[derive(Debug, Clone, Copy)]
enum GapPolicy {
    /// Activity sync: either format; a legacy gap ends at `end_event_id`.
    Any { end_event_id: i64 },
    /// Legacy history: only the legacy shape.
    LegacyOnly { end_event_id: i64 },
    /// Versioned history: only the versioned shape.
    VersionedOnly,
}

impl GapPolicy {
    fn legacy_end(&self) -> Option<i64> {
        match self {
            Self::Any { end_event_id } | Self::LegacyOnly { end_event_id } => Some(*end_event_id),
            Self::VersionedOnly => None,
        }
    }

    fn accepts_versioned(&self) -> bool {
        matches!(self, Self::Any { .. } | Self::VersionedOnly)
    }
}

/// Build the engine request for an activity sync. Every field is copied as-is.
pub fn sync_activity_request(attr: &SyncActivityTaskAttributes) -> SyncActivityRequest {
    SyncActivityRequest {
        domain_id: attr.domain_id.clone(),
        workflow_id: attr.workflow_id.clone(),
        run_id: attr.run_id.clone(),
        version: attr.version,
        scheduled_id: attr.scheduled_id,
        scheduled_time: attr.scheduled_time,
        started_id: attr.started_id,
        started_time: attr.started_time,
        last_heartbeat_time: attr.last_heartbeat_time,
        details: attr.details.clone(),
        attempt: attr.attempt,
        last_failure_reason: attr.last_failure_reason.clone(),
        last_worker_identity: attr.last_worker_identity.clone(),
        last_failure_details: attr.last_failure_details.clone(),
        version_history: attr.version_history.clone(),
    }
}

/// Build the engine request for a legacy history task.
///
/// `source_cluster` is the cluster the task was delivered from. Buffering,
/// reset and new-run-NDC are always off for replicated legacy events.
pub fn replicate_events_request(
    source_cluster: &str,
    attr: &HistoryTaskAttributes,
) -> ReplicateEventsRequest {
    ReplicateEventsRequest {
        domain_uuid: attr.domain_id.clone(),
        workflow_execution: WorkflowExecution {
            workflow_id: attr.workflow_id.clone(),
            run_id: attr.run_id.clone(),
        },
        source_cluster: source_cluster.to_string(),
        force_buffer_events: false,
        first_event_id: attr.first_event_id,
        next_event_id: attr.next_event_id,
        version: attr.version,
        replication_info: attr.replication_info.clone(),
        history: attr.history.clone(),
        new_run_history: attr.new_run_history.clone(),
        reset_workflow: false,
        new_run_ndc: false,
    }
}

/// Build the engine request for a versioned history task.
pub fn replicate_events_v2_request(attr: &HistoryTaskV2Attributes) -> ReplicateEventsV2Request {
    ReplicateEventsV2Request {
        domain_uuid: attr.domain_id.clone(),
        workflow_execution: WorkflowExecution {
            workflow_id: attr.workflow_id.clone(),
            run_id: attr.run_id.clone(),
        },
        version_history_items: attr.version_history_items.clone(),
        events: attr.events.clone(),
        new_run_events: attr.new_run_events.clone(),
    }
}

/// Applies replication tasks from remote clusters to the local engine.
pub struct ReplicationTaskExecutor<E, D, R, N>
where
    E: HistoryEngine,
    D: DomainCache,
    R: HistoryRereplicator,
    N: NdcHistoryResender,
{
    filter: DomainFilter<D>,
    ndc_resender: Arc<N>,
    rereplicator: Arc<R>,
    engine: Arc<E>,
}

impl<E, D, R, N> Clone for ReplicationTaskExecutor<E, D, R, N>
where
    E: HistoryEngine,
    D: DomainCache,
    R: HistoryRereplicator,
    N: NdcHistoryResender,
{
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            ndc_resender: Arc::clone(&self.ndc_resender),
            rereplicator: Arc::clone(&self.rereplicator),
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<E, D, R, N> ReplicationTaskExecutor<E, D, R, N>
where
    E: HistoryEngine,
    D: DomainCache,
    R: HistoryRereplicator,
    N: NdcHistoryResender,
{
    /// Create an executor for the cluster named `current_cluster`.
    pub fn new(
        current_cluster: impl Into<String>,
        domain_cache: Arc<D>,
        ndc_resender: Arc<N>,
        rereplicator: Arc<R>,
        engine: Arc<E>,
    ) -> Self {
        Self {
            filter: DomainFilter::new(current_cluster, domain_cache),
            ndc_resender,
            rereplicator,
            engine,
        }
    }

    /// Create an executor from validated configuration.
    pub fn from_config(
        config: &ReplicationConfig,
        domain_cache: Arc<D>,
        ndc_resender: Arc<N>,
        rereplicator: Arc<R>,
        engine: Arc<E>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config.current_cluster_name.clone(),
            domain_cache,
            ndc_resender,
            rereplicator,
            engine,
        ))
    }

    pub fn current_cluster(&self) -> &str {
        self.filter.current_cluster()
    }

    /// See [`DomainFilter::filter_task`].
    pub async fn filter_task(&self, domain_id: &str, enforce_apply: bool) -> Result<bool> {
        self.filter.filter_task(domain_id, enforce_apply).await
    }

    /// Execute one task delivered from `source_cluster`.
    ///
    /// `enforce_apply` bypasses the domain filter (admin-triggered resends).
    /// If the outcome's [`should_retry`](TaskOutcome::should_retry) is true,
    /// the caller must submit the same task again; otherwise it must not.
    #[instrument(
        skip(self, task),
        fields(task_type = %task.task_type, source_task_id = task.source_task_id)
    )]
    pub async fn execute(
        &self,
        source_cluster: &str,
        task: &ReplicationTask,
        enforce_apply: bool,
    ) -> Result<TaskOutcome> {
        let result = self.dispatch(source_cluster, task, enforce_apply).await;
        match &result {
            Ok(outcome) => metrics::record_task(task.task_type.as_str(), outcome.as_str()),
            Err(_) => metrics::record_task(task.task_type.as_str(), "error"),
        }
        result
    }

    async fn dispatch(
        &self,
        source_cluster: &str,
        task: &ReplicationTask,
        enforce_apply: bool,
    ) -> Result<TaskOutcome> {
        let payload = match task.payload() {
            Ok(payload) => payload,
            Err(TaskShapeError::UnknownType) => {
                error!(source_task_id = task.source_task_id, "Unknown replication task type");
                return Err(ReplicationError::UnknownTaskType(format!(
                    "source task {} from {}",
                    task.source_task_id, source_cluster
                )));
            }
            Err(e) => {
                error!(
                    error = %e,
                    source_task_id = task.source_task_id,
                    "Malformed replication task"
                );
                return Err(ReplicationError::MalformedTask(e.to_string()));
            }
        };

        match payload {
            TaskPayload::NoOp => {
                debug!("Task type carries nothing to apply, skipping");
                Ok(TaskOutcome::Skipped)
            }
            TaskPayload::SyncActivity(attr) => {
                self.handle_sync_activity(source_cluster, attr, enforce_apply).await
            }
            TaskPayload::History(attr) => {
                self.handle_history(source_cluster, attr, enforce_apply).await
            }
            TaskPayload::HistoryV2(attr) => {
                self.handle_history_v2(source_cluster, attr, enforce_apply).await
            }
        }
    }

    async fn handle_sync_activity(
        &self,
        source_cluster: &str,
        attr: &SyncActivityTaskAttributes,
        enforce_apply: bool,
    ) -> Result<TaskOutcome> {
        if !self.filter.filter_task(&attr.domain_id, enforce_apply).await? {
            return Ok(TaskOutcome::Filtered);
        }

        let task_type = ReplicationTaskType::SyncActivity;
        let start = Instant::now();
        let result = self.engine.sync_activity(sync_activity_request(attr)).await;
        metrics::record_apply_latency(task_type.as_str(), start.elapsed());

        match result {
            Ok(()) => Ok(TaskOutcome::Applied),
            Err(err) => {
                let identity = TaskIdentity {
                    domain_id: &attr.domain_id,
                    workflow_id: &attr.workflow_id,
                    run_id: &attr.run_id,
                };
                // History up to and including the activity's scheduled event is needed.
                // No legacy range ends past i64::MAX; only a versioned gap can be resent then.
                let policy = match attr.scheduled_id.checked_add(1) {
                    Some(end_event_id) => GapPolicy::Any { end_event_id },
                    None => GapPolicy::VersionedOnly,
                };
                self.resolve_gap(task_type, err, identity, source_cluster, policy)
                    .await
            }
        }
    }

    async fn handle_history(
        &self,
        source_cluster: &str,
        attr: &HistoryTaskAttributes,
        enforce_apply: bool,
    ) -> Result<TaskOutcome> {
        if !self.filter.filter_task(&attr.domain_id, enforce_apply).await? {
            return Ok(TaskOutcome::Filtered);
        }

        let task_type = ReplicationTaskType::History;
        let start = Instant::now();
        let result = self
            .engine
            .replicate_events(replicate_events_request(source_cluster, attr))
            .await;
        metrics::record_apply_latency(task_type.as_str(), start.elapsed());

        match result {
            Ok(()) => Ok(TaskOutcome::Applied),
            Err(err) => {
                let identity = TaskIdentity {
                    domain_id: &attr.domain_id,
                    workflow_id: &attr.workflow_id,
                    run_id: &attr.run_id,
                };
                let policy = GapPolicy::LegacyOnly {
                    end_event_id: attr.first_event_id,
                };
                self.resolve_gap(task_type, err, identity, source_cluster, policy)
                    .await
            }
        }
    }

    async fn handle_history_v2(
        &self,
        source_cluster: &str,
        attr: &HistoryTaskV2Attributes,
        enforce_apply: bool,
    ) -> Result<TaskOutcome> {
        if !self.filter.filter_task(&attr.domain_id, enforce_apply).await? {
            return Ok(TaskOutcome::Filtered);
        }

        let task_type = ReplicationTaskType::HistoryV2;
        let start = Instant::now();
        let result = self
            .engine
            .replicate_events_v2(replicate_events_v2_request(attr))
            .await;
        metrics::record_apply_latency(task_type.as_str(), start.elapsed());

        match result {
            Ok(()) => Ok(TaskOutcome::Applied),
            Err(err) => {
                let identity = TaskIdentity {
                    domain_id: &attr.domain_id,
                    workflow_id: &attr.workflow_id,
                    run_id: &attr.run_id,
                };
                self.resolve_gap(task_type, err, identity, source_cluster, GapPolicy::VersionedOnly)
                    .await
            }
        }
    }

    /// Turn an apply failure into a resend, or pass it through unchanged.
    async fn resolve_gap(
        &self,
        trigger: ReplicationTaskType,
        err: EngineError,
        identity: TaskIdentity<'_>,
        source_cluster: &str,
        policy: GapPolicy,
    ) -> Result<TaskOutcome> {
        match classify(&err) {
            Some(GapError::V2(retry)) if policy.accepts_versioned() => {
                let request = ndc_resend_request(&retry, identity, source_cluster);
                self.resend_versioned(trigger, request).await
            }
            Some(GapError::V1(retry)) => {
                let Some(end_event_id) = policy.legacy_end() else {
                    return Err(err.into());
                };
                match legacy_resend_request(&retry, identity, end_event_id, source_cluster) {
                    Some(request) => self.resend_legacy(trigger, request).await,
                    None => {
                        warn!(
                            domain_id = %identity.domain_id,
                            workflow_id = %identity.workflow_id,
                            run_id = %identity.run_id,
                            "Legacy gap error carries no run id, cannot resend"
                        );
                        Err(err.into())
                    }
                }
            }
            _ => Err(err.into()),
        }
    }

    async fn resend_legacy(
        &self,
        trigger: ReplicationTaskType,
        request: HistoryResendRequest,
    ) -> Result<TaskOutcome> {
        let generation = HistoryGeneration::V1;
        info!(
            domain_id = %request.domain_id,
            workflow_id = %request.workflow_id,
            source_cluster = %request.source_cluster,
            begin_run_id = %request.begin.run_id,
            begin_event_id = request.begin.event_id,
            end_run_id = %request.end.run_id,
            end_event_id = request.end.event_id,
            "Resending missing history"
        );

        let domain_id = request.domain_id.clone();
        let workflow_id = request.workflow_id.clone();
        let run_id = request.end.run_id.clone();

        let start = Instant::now();
        let result = self.rereplicator.send_multi_workflow_history(request).await;
        metrics::record_resend_latency(generation.as_str(), start.elapsed());
        metrics::record_resend(generation.as_str(), trigger.as_str(), result.is_ok());

        match result {
            Ok(()) => Ok(TaskOutcome::ResendCompleted { generation }),
            Err(source) => {
                warn!(
                    error = %source,
                    domain_id = %domain_id,
                    workflow_id = %workflow_id,
                    run_id = %run_id,
                    "History resend failed"
                );
                Err(ReplicationError::Resend {
                    domain_id,
                    workflow_id,
                    run_id,
                    source,
                })
            }
        }
    }

    async fn resend_versioned(
        &self,
        trigger: ReplicationTaskType,
        request: NdcResendRequest,
    ) -> Result<TaskOutcome> {
        let generation = HistoryGeneration::V2;
        info!(
            domain_id = %request.domain_id,
            workflow_id = %request.workflow_id,
            run_id = %request.run_id,
            source_cluster = %request.source_cluster,
            start_event_id = ?request.start_event_id,
            start_event_version = ?request.start_event_version,
            end_event_id = ?request.end_event_id,
            end_event_version = ?request.end_event_version,
            "Resending missing history v2"
        );

        let domain_id = request.domain_id.clone();
        let workflow_id = request.workflow_id.clone();
        let run_id = request.run_id.clone();

        let start = Instant::now();
        let result = self.ndc_resender.send_single_workflow_history(request).await;
        metrics::record_resend_latency(generation.as_str(), start.elapsed());
        metrics::record_resend(generation.as_str(), trigger.as_str(), result.is_ok());

        match result {
            Ok(()) => Ok(TaskOutcome::ResendCompleted { generation }),
            Err(source) => {
                warn!(
                    error = %source,
                    domain_id = %domain_id,
                    workflow_id = %workflow_id,
                    run_id = %run_id,
                    "History v2 resend failed"
                );
                Err(ReplicationError::Resend {
                    domain_id,
                    workflow_id,
                    run_id,
                    source,
                })
            }
        }
    }
}
