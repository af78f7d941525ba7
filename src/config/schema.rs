//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section carries `#[serde(default)]` so a minimal file (or none)
//! yields a working observer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::observer::ThresholdUnit;

/// Root configuration for the observer and its demonstration service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration for the demonstration service.
    pub listener: ListenerConfig,

    /// Settings of the request resource observer itself.
    pub observer: ObserverConfig,

    /// Diagnostics logging for the process.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Where telemetry records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Append JSON lines to `log_destination`.
    #[default]
    File,
    /// Forward lines as `tracing` events on target `memory_observer`.
    Tracing,
}

/// Request resource observer configuration. Fixed at construction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Memory growth per request above which a warning record is emitted.
    pub threshold_mb: f64,

    /// Unit `threshold_mb` is compared in. `bytes` keeps the legacy
    /// unconverted comparison.
    pub threshold_unit: ThresholdUnit,

    /// File the JSON records are appended to.
    pub log_destination: PathBuf,

    /// Sink selection.
    pub sink: SinkKind,

    /// External application log whose last line may carry `[request-id]`.
    /// `None` skips log scraping entirely.
    pub identity_log: Option<PathBuf>,

    /// Inbound header consulted for a pre-assigned request ID.
    /// Empty string disables header correlation. The default matches the
    /// header the demo server stamps on every request, which takes
    /// precedence over `identity_log`.
    pub request_id_header: String,

    /// Emit a record (status 500) when the wrapped service returns an error
    /// or the call is dropped before it resolves.
    pub record_failures: bool,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            threshold_mb: 10.0,
            threshold_unit: ThresholdUnit::Megabytes,
            log_destination: PathBuf::from("log/memory_tracker.log"),
            sink: SinkKind::File,
            identity_log: Some(PathBuf::from("log/development.log")),
            request_id_header: "x-request-id".to_string(),
            record_failures: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG`
    /// is not set.
    pub log_level: String,

    /// Emit diagnostics as JSON instead of the human-readable format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
