//! Demonstration handlers wrapped by the observer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::http::cache::QueryCache;
use crate::observer::HandlerInfo;

/// Largest single allocation the demo accepts, in KiB.
pub const MAX_ALLOCATION_KIB: usize = 512 * 1024;

/// State shared by the demo handlers.
#[derive(Clone, Default)]
pub struct AppState {
    pub cache: QueryCache,
    /// Buffers kept alive on purpose so resident memory grows.
    pub retained: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl AppState {
    pub fn new(cache: QueryCache) -> Self {
        Self {
            cache,
            retained: Arc::default(),
        }
    }

    fn retained_bytes(&self) -> usize {
        match self.retained.lock() {
            Ok(buffers) => buffers.iter().map(Vec::len).sum(),
            Err(poisoned) => poisoned.into_inner().iter().map(Vec::len).sum(),
        }
    }
}

#[derive(Serialize)]
pub struct Item {
    pub id: u64,
    pub row: String,
    pub cached_queries: usize,
}

#[derive(Serialize)]
pub struct AllocationSummary {
    pub retained_bytes: usize,
}

pub async fn index() -> impl IntoResponse {
    (Extension(HandlerInfo::new("HomeController", "index")), "ok")
}

pub async fn health() -> &'static str {
    "healthy"
}

pub async fn show_item(State(state): State<AppState>, Path(id): Path<u64>) -> Json<Item> {
    let query = format!("SELECT * FROM items WHERE id = {id}");
    let row = state.cache.fetch(&query, || format!("item-{id}"));
    Json(Item {
        id,
        row,
        cached_queries: state.cache.len(),
    })
}

pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.cache.clear();
    StatusCode::NO_CONTENT
}

/// Allocate and retain `kib` KiB of touched memory.
pub async fn allocate(
    State(state): State<AppState>,
    Path(kib): Path<usize>,
) -> Result<Json<AllocationSummary>, (StatusCode, String)> {
    if kib > MAX_ALLOCATION_KIB {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("allocation limited to {MAX_ALLOCATION_KIB} KiB"),
        ));
    }

    // non-zero fill so the pages are actually resident
    let buffer = vec![0xA5u8; kib * 1024];
    {
        let mut retained = match state.retained.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        retained.push(buffer);
    }
    Ok(Json(AllocationSummary {
        retained_bytes: state.retained_bytes(),
    }))
}

pub async fn release(State(state): State<AppState>) -> StatusCode {
    let mut retained = match state.retained.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    retained.clear();
    retained.shrink_to_fit();
    StatusCode::NO_CONTENT
}

pub async fn fail() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Extension(HandlerInfo::new("ErrorsController", "show")),
        "simulated failure",
    )
}
