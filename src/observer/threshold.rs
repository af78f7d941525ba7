//! Memory growth threshold policy.

use serde::{Deserialize, Serialize};

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Unit the configured threshold is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdUnit {
    /// Threshold × 1024 × 1024 bytes, matching the KB × 1024 RSS conversion.
    #[default]
    Megabytes,
    /// Threshold compared directly against the byte delta (legacy).
    Bytes,
}

/// Decides whether a request's memory growth warrants an alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    limit_bytes: f64,
}

impl ThresholdPolicy {
    pub fn new(threshold: f64, unit: ThresholdUnit) -> Self {
        let limit_bytes = match unit {
            ThresholdUnit::Megabytes => threshold * BYTES_PER_MEGABYTE,
            ThresholdUnit::Bytes => threshold,
        };
        Self { limit_bytes }
    }

    pub fn limit_bytes(&self) -> f64 {
        self.limit_bytes
    }

    /// `Some(growth)` when growth strictly exceeds the limit.
    pub fn exceeded(&self, growth: i64) -> Option<i64> {
        if growth as f64 > self.limit_bytes {
            Some(growth)
        } else {
            None
        }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::new(10.0, ThresholdUnit::Megabytes)
    }
}
