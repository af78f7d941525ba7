//! Runtime introspection counters.
//!
//! Payloads are opaque name → integer maps forwarded verbatim into the
//! telemetry record; no schema is imposed across runtimes.

use std::collections::BTreeMap;

use super::alloc::CountingAllocator;

/// Opaque counter mapping.
pub type Counters = BTreeMap<String, i64>;

/// Source of collector statistics and heap census.
pub trait RuntimeIntrospector: Send + Sync {
    /// Collector/allocator counters. `None` when unavailable.
    fn gc_stats(&self) -> Option<Counters>;

    /// Heap object census by category. `None` when unsupported.
    fn object_counts(&self) -> Option<Counters>;
}

/// Reports nothing; used where the runtime exposes no counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIntrospection;

impl RuntimeIntrospector for NoIntrospection {
    fn gc_stats(&self) -> Option<Counters> {
        None
    }

    fn object_counts(&self) -> Option<Counters> {
        None
    }
}

/// Reads the process-wide `CountingAllocator` counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocatorIntrospector;

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl RuntimeIntrospector for AllocatorIntrospector {
    fn gc_stats(&self) -> Option<Counters> {
        let stats = CountingAllocator::stats();
        if !stats.is_active() {
            return None;
        }
        Some(Counters::from([
            ("allocations".to_string(), clamp(stats.allocations)),
            ("deallocations".to_string(), clamp(stats.deallocations)),
            ("reallocations".to_string(), clamp(stats.reallocations)),
            ("allocated_bytes".to_string(), clamp(stats.allocated_bytes)),
            ("freed_bytes".to_string(), clamp(stats.freed_bytes)),
        ]))
    }

    fn object_counts(&self) -> Option<Counters> {
        let stats = CountingAllocator::stats();
        if !stats.is_active() {
            return None;
        }
        Some(Counters::from([
            ("live_allocations".to_string(), clamp(stats.live_allocations())),
            ("live_bytes".to_string(), clamp(stats.live_bytes())),
        ]))
    }
}
