//! Query cache size probe.

/// Read-only view of the active database query cache.
pub trait QueryCacheProbe: Send + Sync {
    /// Current entry count, `None` when no cache is in scope.
    fn entry_count(&self) -> Option<usize>;
}

/// No query cache in this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQueryCache;

impl QueryCacheProbe for NoQueryCache {
    fn entry_count(&self) -> Option<usize> {
        None
    }
}

impl<F> QueryCacheProbe for F
where
    F: Fn() -> Option<usize> + Send + Sync,
{
    fn entry_count(&self) -> Option<usize> {
        self()
    }
}
