//! Demonstration HTTP service.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, observer)
//!     → handlers.rs (demo endpoints, query cache, retained allocations)
//!     → response unchanged by the observer
//! ```

pub mod cache;
pub mod handlers;
pub mod server;

pub use cache::QueryCache;
pub use handlers::AppState;
pub use server::HttpServer;
