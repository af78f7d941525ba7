//! Lifecycle management.
//!
//! ```text
//! Startup (main.rs):
//!     Load config → init logging → open sink → build router → bind
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C or trigger → stop accepting → drain → flush sinks → exit
//! ```

pub mod shutdown;

pub use shutdown::{shutdown_signal, Shutdown};
