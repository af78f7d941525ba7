//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields, request_id where known)
//!     → logging.rs subscriber (stdout, text or JSON)
//! ```

pub mod logging;

pub use logging::init_logging;
