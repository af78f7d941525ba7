//! In-process query cache for the demonstration service.
//!
//! Stands in for a storage client's per-connection query cache so the
//! observer has a real entry count to sample.

use dashmap::DashMap;
use std::sync::Arc;

use crate::sampling::QueryCacheProbe;

/// Query text → cached result.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    inner: Arc<DashMap<String, String>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `query`, computing and storing it on a miss.
    pub fn fetch(&self, query: &str, load: impl FnOnce() -> String) -> String {
        if let Some(hit) = self.inner.get(query) {
            return hit.value().clone();
        }
        self.inner
            .entry(query.to_string())
            .or_insert_with(load)
            .value()
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}

impl QueryCacheProbe for QueryCache {
    fn entry_count(&self) -> Option<usize> {
        Some(self.len())
    }
}
