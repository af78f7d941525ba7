//! Request resource observer.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → layer.rs (MemoryObserver: identity, before-sample)
//!     → wrapped service
//!     → handler.rs (HandlerInfo read from the response)
//!     → layer.rs (after-sample, request record)
//!     → threshold.rs (alert decision)
//!     → response returned unchanged
//! ```
//!
//! # Design Decisions
//! - Pure observer: never alters the response or the error
//! - Exactly one request record per observed request; alerts only for
//!   requests whose wrapped service returned a response
//! - Sink failures are logged and swallowed

pub mod handler;
pub mod layer;
pub mod threshold;

pub use handler::{tag_handler, HandlerInfo, HandlerTag, HandlerTagLayer};
pub use layer::{MemoryObserver, MemoryObserverLayer, ObserverBuilder};
pub use threshold::{ThresholdPolicy, ThresholdUnit};
