// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Task processing loop around the executor.
//!
//! The executor answers one question per call. This loop owns what happens
//! next:
//!
//! - `ResendCompleted`: the gap is filled, submit the same task again at once
//! - retryable error: back off per [`RetryConfig`] and submit again
//! - anything else: hand the result back to the queue owner
//!
//! Attempts are bounded by `max_attempts`. What to do with a task that still
//! fails (dead-lettering, alerting) is up to whoever owns the queue.

use crate::domain::DomainCache;
use crate::engine::HistoryEngine;
use crate::error::{ReplicationError, Result};
use crate::executor::{ReplicationTaskExecutor, TaskOutcome};
use crate::metrics;
use crate::resend::{HistoryRereplicator, NdcHistoryResender};
use crate::resilience::RetryConfig;
use crate::task::ReplicationTask;
use tracing::{debug, info_span, warn, Instrument};

/// Drives [`ReplicationTaskExecutor::execute`] until a task settles.
pub struct TaskProcessor<E, D, R, N>
where
    E: HistoryEngine,
    D: DomainCache,
    R: HistoryRereplicator,
    N: NdcHistoryResender,
{
    executor: ReplicationTaskExecutor<E, D, R, N>,
    retry: RetryConfig,
}

impl<E, D, R, N> TaskProcessor<E, D, R, N>
where
    E: HistoryEngine,
    D: DomainCache,
    R: HistoryRereplicator,
    N: NdcHistoryResender,
{
    pub fn new(executor: ReplicationTaskExecutor<E, D, R, N>, retry: RetryConfig) -> Self {
        Self { executor, retry }
    }

    pub fn executor(&self) -> &ReplicationTaskExecutor<E, D, R, N> {
        &self.executor
    }

    /// Process one task delivered from `source_cluster`.
    ///
    /// Never returns an outcome that asks for a retry: those are consumed
    /// here, and running out of attempts on one becomes
    /// [`ReplicationError::RetriesExhausted`].
    pub async fn process(
        &self,
        source_cluster: &str,
        task: &ReplicationTask,
    ) -> Result<TaskOutcome> {
        let span = info_span!(
            "replication_task",
            source_cluster = %source_cluster,
            task_type = %task.task_type,
            source_task_id = task.source_task_id
        );
        self.process_inner(source_cluster, task).instrument(span).await
    }

    async fn process_inner(
        &self,
        source_cluster: &str,
        task: &ReplicationTask,
    ) -> Result<TaskOutcome> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let result = self.executor.execute(source_cluster, task, false).await;

            match result {
                Ok(outcome) if !outcome.should_retry() => {
                    metrics::record_task_attempts(attempt);
                    return Ok(outcome);
                }
                Ok(outcome) => {
                    if attempt >= max_attempts {
                        warn!(attempt, "Gap resolved but no attempts left");
                        metrics::record_task_attempts(attempt);
                        let err = ReplicationError::RetriesExhausted { attempts: attempt };
                        metrics::record_task_failure(err.kind());
                        return Err(err);
                    }
                    debug!(attempt, outcome = outcome.as_str(), "Re-submitting task after resend");
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        delay = ?delay,
                        "Retryable replication error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(error = %e, attempt, "Replication task failed");
                    metrics::record_task_attempts(attempt);
                    metrics::record_task_failure(e.kind());
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainCacheEntry, InMemoryDomainCache};
    use crate::engine::NoOpHistoryEngine;
    use crate::resend::NoOpResender;
    use crate::task::{HistoryTaskAttributes, ReplicationTaskType};
    use std::sync::Arc;
    use std::time::Duration;

    fn processor(
        cache: Arc<InMemoryDomainCache>,
    ) -> TaskProcessor<NoOpHistoryEngine, InMemoryDomainCache, NoOpResender, NoOpResender> {
        let executor = ReplicationTaskExecutor::new(
            "test",
            cache,
            Arc::new(NoOpResender),
            Arc::new(NoOpResender),
            Arc::new(NoOpHistoryEngine),
        );
        TaskProcessor::new(executor, RetryConfig::testing())
    }

    #[tokio::test]
    async fn test_process_applies_once() {
        let cache = Arc::new(InMemoryDomainCache::new());
        cache.insert(DomainCacheEntry::local("d")).await;
        let processor = processor(cache);

        let task = ReplicationTask::history(HistoryTaskAttributes {
            domain_id: "d".into(),
            ..Default::default()
        });
        let outcome = processor.process("remote", &task).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Applied);
        assert_eq!(processor.executor().current_cluster(), "test");
    }

    #[tokio::test]
    async fn test_process_fatal_error_not_retried() {
        let processor = processor(Arc::new(InMemoryDomainCache::new()));
        let task = ReplicationTask {
            task_type: ReplicationTaskType::Unknown,
            source_task_id: 9,
            attributes: None,
        };
        let err = processor.process("remote", &task).await.unwrap_err();
        assert!(matches!(err, ReplicationError::UnknownTaskType(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_retryable_error_gives_up() {
        let cache = Arc::new(InMemoryDomainCache::new());
        cache.set_unavailable(true);
        let processor = processor(cache);

        let task = ReplicationTask::history(HistoryTaskAttributes {
            domain_id: "d".into(),
            ..Default::default()
        });
        let err = processor.process("remote", &task).await.unwrap_err();
        assert!(matches!(err, ReplicationError::DomainLookup { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_backs_off_past_u64_millis() {
        let cache = Arc::new(InMemoryDomainCache::new());
        cache.set_unavailable(true);
        let huge = Duration::from_secs(u64::MAX / 2);
        let executor = ReplicationTaskExecutor::new(
            "test",
            cache,
            Arc::new(NoOpResender),
            Arc::new(NoOpResender),
            Arc::new(NoOpHistoryEngine),
        );
        let processor = TaskProcessor::new(
            executor,
            RetryConfig {
                max_attempts: 2,
                initial_delay: huge,
                max_delay: huge,
                backoff_factor: 2.0,
            },
        );

        let task = ReplicationTask::history(HistoryTaskAttributes {
            domain_id: "d".into(),
            ..Default::default()
        });
        let err = processor.process("remote", &task).await.unwrap_err();
        assert!(matches!(err, ReplicationError::DomainLookup { .. }));
    }
}
