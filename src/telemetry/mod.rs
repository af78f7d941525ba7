//! Telemetry records and sinks.
//!
//! # Data Flow
//! ```text
//! observer
//!     → records.rs (RequestLogRecord, ThresholdAlertRecord)
//!     → sink.rs (envelope + JSON line)
//!     → file / tracing / memory destination
//! ```

pub mod records;
pub mod sink;

use std::sync::Arc;

use crate::config::{ObserverConfig, SinkKind};

pub use records::{
    memory_delta, round_millis, Level, RequestLogRecord, ThresholdAlertRecord, NOT_AVAILABLE,
};
pub use sink::{encode_line, JsonFileSink, LogSink, MemorySink, SinkError, TracingSink};

/// Build the sink selected by configuration.
pub fn sink_from_config(config: &ObserverConfig) -> Result<Arc<dyn LogSink>, SinkError> {
    Ok(match config.sink {
        SinkKind::File => Arc::new(JsonFileSink::open(&config.log_destination)?),
        SinkKind::Tracing => Arc::new(TracingSink),
    })
}
