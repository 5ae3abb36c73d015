// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # History Replication
//!
//! Consumer side of cross-cluster workflow history replication: applies
//! replication tasks pulled from a remote cluster to the local history
//! engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                         history-replication                              │
//! │                                                                          │
//! │  ┌───────────────┐   ┌──────────────┐   ┌─────────────────────────────┐  │
//! │  │ TaskProcessor │──►│ DomainFilter │──►│ ReplicationTaskExecutor     │  │
//! │  │ (retry loop)  │   │ (DomainCache)│   │ (route by task type)        │  │
//! │  └───────────────┘   └──────────────┘   └─────────────────────────────┘  │
//! │          ▲                                     │               │         │
//! │          │ re-submit                           ▼               ▼ gap     │
//! │          │                          ┌───────────────┐  ┌──────────────┐  │
//! │          └──────────────────────────│ HistoryEngine │  │ classify →   │  │
//! │                                     │ (apply)       │  │ resend v1/v2 │  │
//! │                                     └───────────────┘  └──────────────┘  │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Task Flow
//!
//! 1. **Filter**: skip tasks whose domain does not replicate to this cluster
//! 2. **Apply**: `SyncActivity`, `History` (legacy) and `HistoryV2` tasks go
//!    to the matching engine operation
//! 3. **Gap fill**: if the engine reports missing history, fetch it through
//!    the legacy or versioned resender and ask the caller to re-submit
//!
//! ## Usage
//!
//! ```rust,no_run
//! use history_replication::{
//!     InMemoryDomainCache, NoOpHistoryEngine, NoOpResender, ReplicationTask,
//!     ReplicationTaskExecutor,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(task: ReplicationTask) -> history_replication::Result<()> {
//! let executor = ReplicationTaskExecutor::new(
//!     "cluster-a",
//!     Arc::new(InMemoryDomainCache::new()),
//!     Arc::new(NoOpResender),
//!     Arc::new(NoOpResender),
//!     Arc::new(NoOpHistoryEngine),
//! );
//!
//! let outcome = executor.execute("cluster-b", &task, false).await?;
//! if outcome.should_retry() {
//!     // submit the same task again
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod executor;
pub mod filter;
pub mod metrics;
pub mod processor;
pub mod resend;
pub mod resilience;
pub mod task;

// Re-exports for convenience
pub use classify::{GapError, HistoryGeneration};
pub use config::{ProcessorConfig, ReplicationConfig};
pub use domain::{
    DomainCache, DomainCacheEntry, DomainCacheError, DomainReplicationConfig, InMemoryDomainCache,
};
pub use engine::{EngineError, HistoryEngine, NoOpHistoryEngine, RetryTaskError, RetryTaskV2Error};
pub use error::{ReplicationError, Result};
pub use executor::{ReplicationTaskExecutor, TaskOutcome};
pub use filter::DomainFilter;
pub use processor::TaskProcessor;
pub use resend::{HistoryRereplicator, NdcHistoryResender, NoOpResender, ResendError};
pub use resilience::RetryConfig;
pub use task::{ReplicationTask, ReplicationTaskAttributes, ReplicationTaskType};
