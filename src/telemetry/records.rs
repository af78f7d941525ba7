//! Record shapes written to the telemetry sink.

use serde::{Deserialize, Serialize};

use crate::sampling::{Counters, Sample};

/// Placeholder for routing context that is unknown or intentionally absent.
pub const NOT_AVAILABLE: &str = "N/A";

/// Severity of an emitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warn,
}

/// One per observed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogRecord {
    pub request_id: String,
    pub method: String,
    pub url: String,
    pub controller: String,
    pub action: String,
    pub gc_stats_before: Counters,
    pub gc_stats_after: Counters,
    pub memory_before: u64,
    pub memory_after: u64,
    pub objects_before: Counters,
    pub objects_after: Counters,
    pub query_cache_before: usize,
    pub query_cache_after: usize,
    /// Seconds, millisecond precision.
    pub request_time: f64,
    pub status: u16,
    /// Display form of the wrapped service's error, when it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestLogRecord {
    /// Spread a before/after pair of samples into a record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        request_id: String,
        method: String,
        url: String,
        controller: String,
        action: String,
        before: Sample,
        after: Sample,
        request_time: f64,
        status: u16,
    ) -> Self {
        Self {
            request_id,
            method,
            url,
            controller,
            action,
            gc_stats_before: before.gc_stats,
            gc_stats_after: after.gc_stats,
            memory_before: before.memory_bytes,
            memory_after: after.memory_bytes,
            objects_before: before.object_counts,
            objects_after: after.object_counts,
            query_cache_before: before.query_cache_size,
            query_cache_after: after.query_cache_size,
            request_time,
            status,
            error: None,
        }
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    /// Signed RSS growth across the request.
    pub fn memory_growth(&self) -> i64 {
        memory_delta(self.memory_before, self.memory_after)
    }
}

/// Emitted when per-request memory growth exceeds the threshold. Carries no
/// routing context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdAlertRecord {
    pub request_id: String,
    pub method: String,
    pub url: String,
    pub controller: String,
    pub action: String,
    pub memory_growth: i64,
}

impl ThresholdAlertRecord {
    pub fn new(request_id: String, memory_growth: i64) -> Self {
        Self {
            request_id,
            method: NOT_AVAILABLE.to_string(),
            url: NOT_AVAILABLE.to_string(),
            controller: NOT_AVAILABLE.to_string(),
            action: NOT_AVAILABLE.to_string(),
            memory_growth,
        }
    }
}

/// `after - before` as a signed value.
pub fn memory_delta(before: u64, after: u64) -> i64 {
    if after >= before {
        i64::try_from(after - before).unwrap_or(i64::MAX)
    } else {
        i64::try_from(before - after).map(|d| -d).unwrap_or(i64::MIN)
    }
}

/// Round elapsed seconds to three decimal places.
pub fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}
