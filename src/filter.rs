// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Domain applicability filter.
//!
//! Decides whether this cluster is a replication target for a domain.
//! Domains with no (or an empty) replication config are treated as
//! replicating everywhere, so tasks for domains not yet given explicit
//! topology are applied rather than dropped.

use crate::domain::DomainCache;
use crate::error::{ReplicationError, Result};
use crate::metrics;
use std::sync::Arc;
use tracing::debug;

/// Read-through filter over a [`DomainCache`].
pub struct DomainFilter<D: DomainCache> {
    current_cluster: String,
    domain_cache: Arc<D>,
}

impl<D: DomainCache> Clone for DomainFilter<D> {
    fn clone(&self) -> Self {
        Self {
            current_cluster: self.current_cluster.clone(),
            domain_cache: Arc::clone(&self.domain_cache),
        }
    }
}

impl<D: DomainCache> DomainFilter<D> {
    pub fn new(current_cluster: impl Into<String>, domain_cache: Arc<D>) -> Self {
        Self {
            current_cluster: current_cluster.into(),
            domain_cache,
        }
    }

    pub fn current_cluster(&self) -> &str {
        &self.current_cluster
    }

    /// Should a task for `domain_id` be applied on this cluster?
    ///
    /// `enforce_apply` skips the lookup entirely and answers yes.
    pub async fn filter_task(&self, domain_id: &str, enforce_apply: bool) -> Result<bool> {
        if enforce_apply {
            metrics::record_domain_filter("enforced");
            return Ok(true);
        }

        let entry = match self.domain_cache.get_domain_by_id(domain_id).await {
            Ok(entry) => entry,
            Err(e) => {
                metrics::record_domain_filter("error");
                return Err(ReplicationError::domain_lookup(domain_id, e));
            }
        };

        let applicable = match entry.replication_config.as_ref() {
            Some(config) if !config.clusters.is_empty() => {
                config.contains_cluster(&self.current_cluster)
            }
            _ => true,
        };

        if applicable {
            metrics::record_domain_filter("applicable");
        } else {
            metrics::record_domain_filter("not_applicable");
            debug!(
                domain_id = %domain_id,
                current_cluster = %self.current_cluster,
                "Domain does not replicate to this cluster"
            );
        }
        Ok(applicable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainCacheEntry, DomainReplicationConfig, InMemoryDomainCache};

    async fn filter_with(entry: DomainCacheEntry) -> DomainFilter<InMemoryDomainCache> {
        let cache = Arc::new(InMemoryDomainCache::new());
        cache.insert(entry).await;
        DomainFilter::new("test", cache)
    }

    #[tokio::test]
    async fn test_filter_task_cluster_listed() {
        let filter = filter_with(DomainCacheEntry::global("d1", ["test"])).await;
        assert!(filter.filter_task("d1", false).await.unwrap());
    }

    #[tokio::test]
    async fn test_filter_task_cluster_not_listed() {
        let filter = filter_with(DomainCacheEntry::global("d1", ["other", "another"])).await;
        assert!(!filter.filter_task("d1", false).await.unwrap());
    }

    #[tokio::test]
    async fn test_filter_task_no_config_is_applicable() {
        let filter = filter_with(DomainCacheEntry::local("d1")).await;
        assert!(filter.filter_task("d1", false).await.unwrap());
    }

    #[tokio::test]
    async fn test_filter_task_empty_config_is_applicable() {
        let mut entry = DomainCacheEntry::global("d1", ["x"]);
        entry.replication_config = Some(DomainReplicationConfig::default());
        let filter = filter_with(entry).await;
        assert!(filter.filter_task("d1", false).await.unwrap());
    }

    #[tokio::test]
    async fn test_filter_task_not_found() {
        let filter = DomainFilter::new("test", Arc::new(InMemoryDomainCache::new()));
        let err = filter.filter_task("missing", false).await.unwrap_err();
        assert!(matches!(err, ReplicationError::DomainLookup { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_filter_task_unavailable() {
        let cache = Arc::new(InMemoryDomainCache::new());
        cache.set_unavailable(true);
        let filter = DomainFilter::new("test", cache);
        let err = filter.filter_task("d1", false).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_filter_task_enforce_apply() {
        let cache = Arc::new(InMemoryDomainCache::new());
        cache.set_unavailable(true);
        let filter = DomainFilter::new("test", cache);
        assert!(filter.filter_task("anything", true).await.unwrap());
    }
}
