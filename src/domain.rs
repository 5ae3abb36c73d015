// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Domain (tenant) metadata lookup.
//!
//! The executor only needs one thing from domain metadata: the list of
//! clusters a domain replicates to. The real cache lives elsewhere and is
//! eventually consistent, so an entry may lag behind a topology change.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

/// Boxed future returned by [`DomainCache`] lookups.
pub type DomainFuture<'a> =
    Pin<Box<dyn Future<Output = Result<DomainCacheEntry, DomainCacheError>> + Send + 'a>>;

/// A cluster that a domain replicates to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterReplicationConfig {
    pub cluster_name: String,
}

impl ClusterReplicationConfig {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
        }
    }
}

/// Replication topology of a domain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainReplicationConfig {
    pub active_cluster_name: String,
    pub clusters: Vec<ClusterReplicationConfig>,
}

impl DomainReplicationConfig {
    /// Config replicating to the given clusters, the first one active.
    pub fn for_clusters<I, S>(clusters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let clusters: Vec<_> = clusters
            .into_iter()
            .map(ClusterReplicationConfig::new)
            .collect();
        Self {
            active_cluster_name: clusters
                .first()
                .map(|c| c.cluster_name.clone())
                .unwrap_or_default(),
            clusters,
        }
    }

    pub fn contains_cluster(&self, cluster_name: &str) -> bool {
        self.clusters.iter().any(|c| c.cluster_name == cluster_name)
    }
}

/// Cached metadata for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainCacheEntry {
    pub id: String,
    pub name: String,
    pub is_global: bool,
    /// `None` for domains that predate explicit replication config.
    pub replication_config: Option<DomainReplicationConfig>,
}

impl DomainCacheEntry {
    /// A global domain replicating to `clusters`.
    pub fn global<I, S>(id: impl Into<String>, clusters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            is_global: true,
            replication_config: Some(DomainReplicationConfig::for_clusters(clusters)),
        }
    }

    /// A local domain with no replication config.
    pub fn local(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            is_global: false,
            replication_config: None,
        }
    }
}

/// Errors from a domain metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainCacheError {
    /// No such domain.
    #[error("domain not found: {0}")]
    NotFound(String),

    /// Metadata store could not be reached.
    #[error("domain cache unavailable: {0}")]
    Unavailable(String),
}

impl DomainCacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Read access to cached domain metadata.
pub trait DomainCache: Send + Sync + 'static {
    fn get_domain_by_id(&self, domain_id: &str) -> DomainFuture<'_>;
}

impl<D: DomainCache> DomainCache for std::sync::Arc<D> {
    fn get_domain_by_id(&self, domain_id: &str) -> DomainFuture<'_> {
        (**self).get_domain_by_id(domain_id)
    }
}

/// A [`DomainCache`] backed by a map.
///
/// Used in standalone mode and by tests. [`set_unavailable`](Self::set_unavailable)
/// makes every lookup fail as if the backing store were down.
#[derive(Debug, Default)]
pub struct InMemoryDomainCache {
    entries: RwLock<HashMap<String, DomainCacheEntry>>,
    unavailable: AtomicBool,
}

impl InMemoryDomainCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, entry: DomainCacheEntry) {
        self.entries.write().await.insert(entry.id.clone(), entry);
    }

    pub async fn remove(&self, domain_id: &str) -> Option<DomainCacheEntry> {
        self.entries.write().await.remove(domain_id)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl DomainCache for InMemoryDomainCache {
    fn get_domain_by_id(&self, domain_id: &str) -> DomainFuture<'_> {
        let domain_id = domain_id.to_string();
        Box::pin(async move {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(DomainCacheError::Unavailable(
                    "domain cache marked unavailable".to_string(),
                ));
            }
            self.entries
                .read()
                .await
                .get(&domain_id)
                .cloned()
                .ok_or(DomainCacheError::NotFound(domain_id))
        })
    }
}
