//! Mock DomainCache for testing.
//!
//! Counts lookups so tests can assert that a lookup did (or did not) happen.
//! Configurable per-domain entries and a forced error for every lookup.

use history_replication::domain::{DomainCache, DomainCacheEntry, DomainCacheError, DomainFuture};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MockDomainCache {
    entries: RwLock<HashMap<String, DomainCacheEntry>>,
    forced_error: RwLock<Option<DomainCacheError>>,
    lookups: AtomicUsize,
}

impl MockDomainCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding a single entry.
    pub async fn with_entry(entry: DomainCacheEntry) -> Self {
        let cache = Self::new();
        cache.insert(entry).await;
        cache
    }

    /// A cache whose every lookup fails with `err`.
    pub async fn failing(err: DomainCacheError) -> Self {
        let cache = Self::new();
        *cache.forced_error.write().await = Some(err);
        cache
    }

    pub async fn insert(&self, entry: DomainCacheEntry) {
        self.entries.write().await.insert(entry.id.clone(), entry);
    }

    /// Number of `get_domain_by_id` calls so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl DomainCache for MockDomainCache {
    fn get_domain_by_id(&self, domain_id: &str) -> DomainFuture<'_> {
        let domain_id = domain_id.to_string();
        Box::pin(async move {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.forced_error.read().await.clone() {
                return Err(err);
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
