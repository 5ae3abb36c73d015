// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for replication task execution.
//!
//! Errors are categorized by their source (domain cache, task shape, local
//! engine, resend) and keep the collaborator's error as `#[source]` so
//! callers can still inspect it.
//!
//! A domain that does not replicate to this cluster is **not** an error:
//! the executor reports it as [`TaskOutcome::Filtered`](crate::TaskOutcome::Filtered).
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `DomainLookup` | If unavailable | Domain metadata could not be read |
//! | `UnknownTaskType` | No | Discriminant this build does not know |
//! | `MalformedTask` | No | Discriminant and payload disagree |
//! | `Engine` | If transient | Apply failed; engine error passed through unchanged |
//! | `Resend` | Yes | Backfilling a history gap failed |
//! | `RetriesExhausted` | No | Processor gave up re-submitting a task |
//! | `Config` | No | Configuration invalid |
//!
//! # Retry Behavior
//!
//! The executor never retries on its own. Use
//! [`ReplicationError::is_retryable()`] in the calling loop to decide whether
//! to back off and re-submit.

use crate::domain::DomainCacheError;
use crate::engine::EngineError;
use crate::resend::ResendError;
use thiserror::Error;

/// Result type alias for replication operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Errors that can occur while executing a replication task.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// Domain metadata lookup failed.
    ///
    /// Not-found and unavailable are kept apart in `source`; only the
    /// latter is worth retrying.
    #[error("Domain lookup error ({domain_id}): {source}")]
    DomainLookup {
        domain_id: String,
        #[source]
        source: DomainCacheError,
    },

    /// Task discriminant is not one we know how to handle.
    ///
    /// Not retryable - the task will never become applicable.
    #[error("Unknown replication task type: {0}")]
    UnknownTaskType(String),

    /// Task discriminant and payload disagree, or the payload is missing.
    ///
    /// Not retryable - the task is malformed at the source.
    #[error("Malformed replication task: {0}")]
    MalformedTask(String),

    /// The local engine rejected the apply.
    ///
    /// The engine error is passed through unchanged.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Fetching a missing history range from the source cluster failed.
    ///
    /// Retryable - the source may be reachable on the next attempt.
    #[error("Resend error ({domain_id}/{workflow_id}/{run_id}): {source}")]
    Resend {
        domain_id: String,
        workflow_id: String,
        run_id: String,
        #[source]
        source: ResendError,
    },

    /// The processor ran out of attempts while the executor still asked
    /// for the task to be re-submitted.
    #[error("Retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: usize },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReplicationError {
    /// Create a domain lookup error.
    pub fn domain_lookup(domain_id: impl Into<String>, source: DomainCacheError) -> Self {
        Self::DomainLookup {
            domain_id: domain_id.into(),
            source,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DomainLookup { source, .. } => !source.is_not_found(),
            Self::UnknownTaskType(_) => false,
            Self::MalformedTask(_) => false,
            Self::Engine(e) => e.is_retryable(),
            Self::Resend { .. } => true,
            Self::RetriesExhausted { .. } => false,
            Self::Config(_) => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DomainLookup { .. } => "domain_lookup",
            Self::UnknownTaskType(_) => "unknown_task_type",
            Self::MalformedTask(_) => "malformed_task",
            Self::Engine(_) => "engine",
            Self::Resend { .. } => "resend",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::Config(_) => "config",
        }
    }

    /// The engine error, if this is an apply failure.
    pub fn as_engine_error(&self) -> Option<&EngineError> {
        match self {
            Self::Engine(e) => Some(e),
            _ => None,
        }
    }
}
