// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Apply-failure classification.
//!
//! Recognizes the two "local history has a gap" error shapes and turns them
//! into resend requests. The shapes are distinct [`EngineError`] variants,
//! so a legacy gap can never be read as a versioned one or the other way
//! round.

use crate::engine::{EngineError, RetryTaskError, RetryTaskV2Error};
use crate::resend::{EventPosition, HistoryResendRequest, NdcResendRequest};
use crate::task::FIRST_EVENT_ID;

/// History format a gap belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryGeneration {
    /// Legacy single-branch history.
    V1,
    /// Versioned multi-branch history.
    V2,
}

impl HistoryGeneration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

/// A recognized history gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapError {
    V1(RetryTaskError),
    V2(RetryTaskV2Error),
}

impl GapError {
    pub fn generation(&self) -> HistoryGeneration {
        match self {
            Self::V1(_) => HistoryGeneration::V1,
            Self::V2(_) => HistoryGeneration::V2,
        }
    }
}

/// Recognize a legacy gap error.
pub fn convert_retry_task_error(err: &EngineError) -> Option<&RetryTaskError> {
    match err {
        EngineError::RetryTask(e) => Some(e),
        _ => None,
    }
}

/// Recognize a versioned gap error.
pub fn convert_retry_task_v2_error(err: &EngineError) -> Option<&RetryTaskV2Error> {
    match err {
        EngineError::RetryTaskV2(e) => Some(e),
        _ => None,
    }
}

/// Classify an engine error as a gap, if it is one.
pub fn classify(err: &EngineError) -> Option<GapError> {
    convert_retry_task_v2_error(err)
        .cloned()
        .map(GapError::V2)
        .or_else(|| convert_retry_task_error(err).cloned().map(GapError::V1))
}

/// Ids of the run whose task failed, used where the error leaves them blank.
#[derive(Debug, Clone, Copy)]
pub struct TaskIdentity<'a> {
    pub domain_id: &'a str,
    pub workflow_id: &'a str,
    pub run_id: &'a str,
}

fn or_task<'a>(from_error: &'a str, from_task: &'a str) -> &'a str {
    if from_error.is_empty() {
        from_task
    } else {
        from_error
    }
}

/// Build the legacy resend request for a gap ending at `end`.
///
/// Returns `None` when the error does not say which run local history ends
/// in; there is nothing to resend from.
pub fn legacy_resend_request(
    err: &RetryTaskError,
    task: TaskIdentity<'_>,
    end_event_id: i64,
    source_cluster: &str,
) -> Option<HistoryResendRequest> {
    if err.run_id.is_empty() {
        return None;
    }
    Some(HistoryResendRequest {
        domain_id: or_task(&err.domain_id, task.domain_id).to_string(),
        workflow_id: or_task(&err.workflow_id, task.workflow_id).to_string(),
        source_cluster: source_cluster.to_string(),
        begin: EventPosition::new(
            err.run_id.clone(),
            err.next_event_id.unwrap_or(FIRST_EVENT_ID),
        ),
        end: EventPosition::new(task.run_id, end_event_id),
    })
}

/// Build the versioned resend request for a gap.
pub fn ndc_resend_request(
    err: &RetryTaskV2Error,
    task: TaskIdentity<'_>,
    source_cluster: &str,
) -> NdcResendRequest {
    NdcResendRequest {
        domain_id: or_task(&err.domain_id, task.domain_id).to_string(),
        workflow_id: or_task(&err.workflow_id, task.workflow_id).to_string(),
        run_id: or_task(&err.run_id, task.run_id).to_string(),
        source_cluster: source_cluster.to_string(),
        start_event_id: err.start_event_id,
        start_event_version: err.start_event_version,
        end_event_id: err.end_event_id,
        end_event_version: err.end_event_version,
    }
}
