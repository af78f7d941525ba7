//! HTTP server setup for the demonstration service.
//!
//! # Responsibilities
//! - Create the Axum Router with the demo handlers
//! - Wire up middleware (request ID, tracing, memory observer)
//! - Serve until shutdown is signalled

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ObserverConfig;
use crate::http::cache::QueryCache;
use crate::http::handlers::{self, AppState};
use crate::lifecycle::shutdown_signal;
use crate::observer::{tag_handler, MemoryObserverLayer};
use crate::sampling::Sampler;
use crate::telemetry::{self, LogSink, SinkError};

/// Demonstration HTTP server with every route observed.
///
/// `SetRequestIdLayer` runs before the observer and always stamps
/// `x-request-id`, so with the default `request_id_header` every record
/// carries that id and the identity-log fallback is never consulted. Set
/// `request_id_header = ""` to resolve identity from the log tail instead.
pub struct HttpServer {
    router: Router,
    sink: Arc<dyn LogSink>,
}

impl HttpServer {
    /// Wrap the demo routes with `observer`.
    pub fn new(observer: MemoryObserverLayer, state: AppState) -> Self {
        let sink = observer.sink();
        let router = Self::build_router(observer, state);
        Self { router, sink }
    }

    /// OS sampler with the demo query cache as its cache probe, sink and
    /// policy from configuration.
    pub fn from_config(config: &ObserverConfig) -> Result<Self, SinkError> {
        let cache = QueryCache::new();
        let sampler = Sampler::system().with_query_cache(Arc::new(cache.clone()));
        let sink = telemetry::sink_from_config(config)?;
        let observer = MemoryObserverLayer::from_config_with(config, sampler, sink);
        Ok(Self::new(observer, AppState::new(cache)))
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(observer: MemoryObserverLayer, state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::index))
            .route("/health", get(handlers::health))
            .route(
                "/items/{id}",
                get(handlers::show_item).route_layer(tag_handler("ItemsController", "show")),
            )
            .route(
                "/cache",
                delete(handlers::clear_cache).route_layer(tag_handler("CacheController", "destroy")),
            )
            .route(
                "/allocations/{kib}",
                post(handlers::allocate).route_layer(tag_handler("AllocationsController", "create")),
            )
            .route(
                "/allocations",
                delete(handlers::release)
                    .route_layer(tag_handler("AllocationsController", "destroy")),
            )
            .route("/fail", get(handlers::fail))
            .with_state(state)
            // applied bottom-up: the request ID is set before the observer runs
            .layer(observer)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The configured router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Sink shared by the observer; flush it at shutdown.
    pub fn sink(&self) -> Arc<dyn LogSink> {
        self.sink.clone()
    }

    /// Serve on `listener` until `shutdown` fires or Ctrl+C.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
