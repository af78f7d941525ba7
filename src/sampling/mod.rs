//! State capture subsystem.
//!
//! # Data Flow
//! ```text
//! Sampler::capture()
//!     → runtime.rs (allocator counters, heap census)
//!     → process.rs (one process table scan → RSS of current pid)
//!     → query_cache.rs (entry count of the active cache)
//!     → Sample
//! ```
//!
//! # Design Decisions
//! - Each sub-query is independent; a failing one yields its default
//!   (0 or an empty map) and never aborts the capture
//! - Capture is blocking; the observer runs it on the blocking pool

pub mod alloc;
pub mod process;
pub mod query_cache;
pub mod runtime;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use alloc::{AllocationStats, CountingAllocator};
pub use process::{resident_memory_bytes, ProcessEntry, ProcessTable, SysinfoProcessTable};
pub use query_cache::{NoQueryCache, QueryCacheProbe};
pub use runtime::{AllocatorIntrospector, Counters, NoIntrospection, RuntimeIntrospector};

/// Snapshot of process and runtime resource counters at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub gc_stats: Counters,
    pub memory_bytes: u64,
    pub object_counts: Counters,
    pub query_cache_size: usize,
}

/// Captures `Sample`s for the current process.
#[derive(Clone)]
pub struct Sampler {
    process_table: Arc<dyn ProcessTable>,
    runtime: Arc<dyn RuntimeIntrospector>,
    query_cache: Arc<dyn QueryCacheProbe>,
    pid: u32,
}

impl Sampler {
    /// Sampler over `process_table` with no runtime counters and no query
    /// cache.
    pub fn new(process_table: Arc<dyn ProcessTable>) -> Self {
        Self {
            process_table,
            runtime: Arc::new(NoIntrospection),
            query_cache: Arc::new(NoQueryCache),
            pid: std::process::id(),
        }
    }

    /// OS process table via `sysinfo` plus allocator counters.
    pub fn system() -> Self {
        Self::new(Arc::new(SysinfoProcessTable::new()))
            .with_runtime(Arc::new(AllocatorIntrospector))
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn RuntimeIntrospector>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_query_cache(mut self, query_cache: Arc<dyn QueryCacheProbe>) -> Self {
        self.query_cache = query_cache;
        self
    }

    /// Override the process looked up in the table.
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Capture a sample. Blocking: scans the process table exactly once.
    pub fn capture(&self) -> Sample {
        let gc_stats = self.runtime.gc_stats().unwrap_or_default();
        let memory_bytes = resident_memory_bytes(self.process_table.as_ref(), self.pid);
        let object_counts = self.runtime.object_counts().unwrap_or_default();
        let query_cache_size = self.query_cache.entry_count().unwrap_or(0);

        Sample {
            gc_stats,
            memory_bytes,
            object_counts,
            query_cache_size,
        }
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler").field("pid", &self.pid).finish_non_exhaustive()
    }
}
