//! Structured log sinks.
//!
//! # Responsibilities
//! - Serialize records into one JSON object per line
//! - Append lines to a destination opened once for the process lifetime
//! - Serialize concurrent appends so lines never interleave
//!
//! # Design Decisions
//! - Each line is a single `write_all` under the sink mutex, then flushed
//! - Envelope fields (`timestamp`, `level`) are flattened next to the
//!   record's own keys

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use super::records::Level;

/// Target used by `TracingSink` events.
pub const TRACING_TARGET: &str = "memory_observer";

/// Errors raised while emitting telemetry.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open log destination {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write log line: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Envelope<'a, R: Serialize> {
    timestamp: String,
    level: Level,
    #[serde(flatten)]
    record: &'a R,
}

/// Render `record` as a single JSON line (no trailing newline).
pub fn encode_line<R: Serialize>(level: Level, record: &R) -> Result<String, SinkError> {
    let envelope = Envelope {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        level,
        record,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Append-only destination for telemetry lines.
pub trait LogSink: Send + Sync {
    /// Append one already-encoded line.
    fn write_line(&self, level: Level, line: &str) -> Result<(), SinkError>;

    /// Push buffered output to the destination.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl dyn LogSink {
    /// Encode and append a record.
    pub fn emit<R: Serialize>(&self, level: Level, record: &R) -> Result<(), SinkError> {
        let line = encode_line(level, record)?;
        self.write_line(level, &line)
    }
}

/// Appends JSON lines to a file.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonFileSink {
    /// Open (creating parent directories and the file) in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| SinkError::Open {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_err)?;

        tracing::info!(path = %path.display(), "Telemetry sink opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for JsonFileSink {
    fn write_line(&self, _level: Level, line: &str) -> Result<(), SinkError> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let mut file = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        file.write_all(&buf)?;
        file.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let file = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        file.sync_data()?;
        Ok(())
    }
}

/// Forwards lines as `tracing` events; the host's subscriber decides where
/// they go.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_line(&self, level: Level, line: &str) -> Result<(), SinkError> {
        match level {
            Level::Info => tracing::info!(target: TRACING_TARGET, "{}", line),
            Level::Warn => tracing::warn!(target: TRACING_TARGET, "{}", line),
        }
        Ok(())
    }
}

/// Keeps lines in memory. Useful for tests and for hosts that ship records
/// elsewhere themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines emitted so far, in order.
    pub fn lines(&self) -> Vec<(Level, String)> {
        match self.lines.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Lines parsed back into JSON values.
    pub fn records(&self) -> Vec<(Level, serde_json::Value)> {
        self.lines()
            .into_iter()
            .filter_map(|(level, line)| serde_json::from_str(&line).ok().map(|v| (level, v)))
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, level: Level, line: &str) -> Result<(), SinkError> {
        let mut lines = match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push((level, line.to_string()));
        Ok(())
    }
}
