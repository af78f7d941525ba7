//! Request identity resolution.
//!
//! # Resolution order
//! ```text
//! inbound header (e.g. x-request-id, set upstream by SetRequestIdLayer)
//!     → last line of the external application log, `[id]` token
//!     → fresh UUID v4
//! ```
//!
//! The header lookup is cheap and happens on the async path. The log read is
//! blocking and is expected to run on the blocking pool.

pub mod log_tail;

use axum::http::{HeaderMap, HeaderName};
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::ObserverConfig;

pub use log_tail::{extract_request_id, read_last_line};

/// Resolves the correlation identifier attached to each telemetry record.
#[derive(Debug, Clone, Default)]
pub struct RequestIdResolver {
    header: Option<HeaderName>,
    log_path: Option<PathBuf>,
}

impl RequestIdResolver {
    /// Create a resolver. Either source may be disabled with `None`.
    pub fn new(header: Option<HeaderName>, log_path: Option<PathBuf>) -> Self {
        Self { header, log_path }
    }

    /// Build a resolver from observer configuration. An empty or invalid
    /// header name disables header correlation.
    pub fn from_config(config: &ObserverConfig) -> Self {
        let header = if config.request_id_header.is_empty() {
            None
        } else {
            HeaderName::from_bytes(config.request_id_header.as_bytes()).ok()
        };
        Self::new(header, config.identity_log.clone())
    }

    /// Pre-assigned identifier carried on the request, if any.
    pub fn from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let name = self.header.as_ref()?;
        let value = headers.get(name)?.to_str().ok()?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Identifier scraped from the last line of the external log.
    pub fn from_log_tail(&self) -> Option<String> {
        let path = self.log_path.as_ref()?;
        match read_last_line(path) {
            Ok(Some(line)) => extract_request_id(&line).map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Identity log unreadable");
                None
            }
        }
    }

    /// Finish resolution given an optional header-derived identifier.
    /// Always returns a non-empty string.
    pub fn resolve_with(&self, from_header: Option<String>) -> String {
        from_header
            .or_else(|| self.from_log_tail())
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// Full resolution against a request's headers. Blocking.
    pub fn resolve(&self, headers: &HeaderMap) -> String {
        self.resolve_with(self.from_headers(headers))
    }
}
