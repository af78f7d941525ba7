//! Observer and demo-service configuration.
//!
//! ```text
//! TOML file (optional)
//!     → loader.rs      deserialize, defaults fill missing keys
//!     → validation.rs  threshold, destination, header, bind address
//!     → AppConfig
//!     → ObserverConfig, read once when the layer is built
//! ```
//!
//! Every key has a default, so an empty file is a valid config.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AppConfig, ListenerConfig, ObservabilityConfig, ObserverConfig, SinkKind};
pub use validation::ValidationError;
