// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication task wire model.
//!
//! A [`ReplicationTask`] is what a remote cluster's outbound replication
//! queue hands us: a discriminant ([`ReplicationTaskType`]) plus exactly one
//! payload variant ([`ReplicationTaskAttributes`]). The two are carried
//! separately on the wire, so they can disagree; [`ReplicationTask::payload`]
//! is the single place that checks they match.
//!
//! # Variants
//!
//! | Discriminant | Payload | Handled by |
//! |--------------|---------|------------|
//! | `SyncActivity` | [`SyncActivityTaskAttributes`] | engine `sync_activity` |
//! | `History` | [`HistoryTaskAttributes`] | engine `replicate_events` (legacy) |
//! | `HistoryV2` | [`HistoryTaskV2Attributes`] | engine `replicate_events_v2` |
//! | `SyncShardStatus` | none | acknowledged, not applied |
//! | `HistoryMetadata` | none | acknowledged, not applied |
//! | anything else | - | fatal |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Event id of the first event in every run's history.
pub const FIRST_EVENT_ID: i64 = 1;

/// Version used by histories written before failover versions existed.
pub const EMPTY_VERSION: i64 = -24;

/// Task-type discriminant as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationTaskType {
    SyncShardStatus,
    SyncActivity,
    History,
    HistoryMetadata,
    HistoryV2,
    /// Any discriminant this build does not know about.
    #[serde(other)]
    Unknown,
}

impl ReplicationTaskType {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyncShardStatus => "sync_shard_status",
            Self::SyncActivity => "sync_activity",
            Self::History => "history",
            Self::HistoryMetadata => "history_metadata",
            Self::HistoryV2 => "history_v2",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ReplicationTaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialization format of a [`DataBlob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingType {
    #[default]
    Proto3,
    Json,
    ThriftRw,
}

/// Opaque serialized history events. Never decoded by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataBlob {
    #[serde(default)]
    pub encoding: EncodingType,
    #[serde(default)]
    pub data: Vec<u8>,
}

/// One `(event_id, version)` entry of a version history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionHistoryItem {
    pub event_id: i64,
    pub version: i64,
}

/// Version history of a single branch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionHistory {
    #[serde(default)]
    pub branch_token: Vec<u8>,
    #[serde(default)]
    pub items: Vec<VersionHistoryItem>,
}

/// Per-cluster replication watermark used by the legacy format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplicationInfo {
    pub version: i64,
    pub last_event_id: i64,
}

/// Heartbeat/progress snapshot of one activity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncActivityTaskAttributes {
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

/// Legacy (single-branch) history range `[first_event_id, next_event_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryTaskAttributes {
    pub target_clusters: Vec<String>,
    pub domain_id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub first_event_id: i64,
    pub next_event_id: i64,
    pub version: i64,
    pub replication_info: HashMap<String, ReplicationInfo>,
    pub history: Option<DataBlob>,
    pub new_run_history: Option<DataBlob>,
}

/// Versioned (multi-branch) history events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryTaskV2Attributes {
    pub task_id: i64,
    pub domain_id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub version_history_items: Vec<VersionHistoryItem>,
    pub events: Option<DataBlob>,
    pub new_run_events: Option<DataBlob>,
}

/// Payload of a replication task. Exactly one is populated per task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationTaskAttributes {
    SyncActivity(SyncActivityTaskAttributes),
    History(HistoryTaskAttributes),
    HistoryV2(HistoryTaskV2Attributes),
}

impl ReplicationTaskAttributes {
    /// The discriminant this payload belongs under.
    pub fn task_type(&self) -> ReplicationTaskType {
        match self {
            Self::SyncActivity(_) => ReplicationTaskType::SyncActivity,
            Self::History(_) => ReplicationTaskType::History,
            Self::HistoryV2(_) => ReplicationTaskType::HistoryV2,
        }
    }

    /// Tenant the payload belongs to.
    pub fn domain_id(&self) -> &str {
        match self {
            Self::SyncActivity(attr) => &attr.domain_id,
            Self::History(attr) => &attr.domain_id,
            Self::HistoryV2(attr) => &attr.domain_id,
        }
    }

    pub fn workflow_id(&self) -> &str {
        match self {
            Self::SyncActivity(attr) => &attr.workflow_id,
            Self::History(attr) => &attr.workflow_id,
            Self::HistoryV2(attr) => &attr.workflow_id,
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            Self::SyncActivity(attr) => &attr.run_id,
            Self::History(attr) => &attr.run_id,
            Self::HistoryV2(attr) => &attr.run_id,
        }
    }
}

/// A replication task as delivered from a remote cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationTask {
    pub task_type: ReplicationTaskType,
    /// Position of this task in the source cluster's replication queue.
    #[serde(default)]
    pub source_task_id: i64,
    #[serde(default)]
    pub attributes: Option<ReplicationTaskAttributes>,
}

/// Result of checking a task's discriminant against its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPayload<'a> {
    SyncActivity(&'a SyncActivityTaskAttributes),
    History(&'a HistoryTaskAttributes),
    HistoryV2(&'a HistoryTaskV2Attributes),
    /// Known discriminant that carries nothing to apply.
    NoOp,
}

/// Why a task's discriminant and payload could not be matched up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskShapeError {
    #[error("unknown replication task type")]
    UnknownType,

    #[error("{task_type} task has no attributes")]
    MissingAttributes { task_type: ReplicationTaskType },

    #[error("{task_type} task carries {payload} attributes")]
    Mismatch {
        task_type: ReplicationTaskType,
        payload: ReplicationTaskType,
    },
}

impl ReplicationTask {
    pub fn sync_activity(attributes: SyncActivityTaskAttributes) -> Self {
        Self {
            task_type: ReplicationTaskType::SyncActivity,
            source_task_id: 0,
            attributes: Some(ReplicationTaskAttributes::SyncActivity(attributes)),
        }
    }

    pub fn history(attributes: HistoryTaskAttributes) -> Self {
        Self {
            task_type: ReplicationTaskType::History,
            source_task_id: 0,
            attributes: Some(ReplicationTaskAttributes::History(attributes)),
        }
    }

    pub fn history_v2(attributes: HistoryTaskV2Attributes) -> Self {
        Self {
            task_type: ReplicationTaskType::HistoryV2,
            source_task_id: 0,
            attributes: Some(ReplicationTaskAttributes::HistoryV2(attributes)),
        }
    }

    /// Tenant id from the payload, if there is one.
    pub fn domain_id(&self) -> Option<&str> {
        self.attributes.as_ref().map(|a| a.domain_id())
    }

    /// Match the discriminant against the payload.
    ///
    /// Payload-less discriminants (`SyncShardStatus`, `HistoryMetadata`)
    /// yield [`TaskPayload::NoOp`] whatever the attributes hold.
    pub fn payload(&self) -> Result<TaskPayload<'_>, TaskShapeError> {
        use ReplicationTaskAttributes as A;
        use ReplicationTaskType as T;

        match (self.task_type, self.attributes.as_ref()) {
            (T::Unknown, _) => Err(TaskShapeError::UnknownType),
            (T::SyncShardStatus | T::HistoryMetadata, _) => Ok(TaskPayload::NoOp),
            (T::SyncActivity, Some(A::SyncActivity(attr))) => Ok(TaskPayload::SyncActivity(attr)),
            (T::History, Some(A::History(attr))) => Ok(TaskPayload::History(attr)),
            (T::HistoryV2, Some(A::HistoryV2(attr))) => Ok(TaskPayload::HistoryV2(attr)),
            (task_type, None) => Err(TaskShapeError::MissingAttributes { task_type }),
            (task_type, Some(other)) => Err(TaskShapeError::Mismatch {
                task_type,
                payload: other.task_type(),
            }),
        }
    }
}
