//! Per-request resource observer for HTTP services.
//!
//! `MemoryObserverLayer` wraps any tower service that speaks
//! `http::Request` / `http::Response`, samples process memory and runtime
//! counters before and after each request, and writes one JSON record per
//! request plus a warning record when memory growth crosses a threshold.
//!
//! ```rust,ignore
//! let observer = MemoryObserverLayer::from_config(&config.observer)?;
//! let app = Router::new().route("/", get(index)).layer(observer);
//! ```

pub mod config;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod observability;
pub mod observer;
pub mod sampling;
pub mod telemetry;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observer::{HandlerInfo, MemoryObserverLayer};
pub use sampling::{CountingAllocator, Sample, Sampler};
