//! # API REST
//!
//! HTTP surface for pinfile.
//!
//! Handles:
//! - one `GET <endpoint>?hash=<revision>` file endpoint per configured route
//! - the `/ready` liveness probe
//! - mapping retrieval failures to status codes
//! - bridging the blocking libgit2 pipeline onto a streaming response body
//!
//! Uses `pinfile-core` for everything repository related.

#![warn(rust_2018_idioms)]

pub mod files;
pub mod health;

use axum::{routing::get, Router};
use pinfile_core::constants::READY_ENDPOINT;
use pinfile_core::{RetrievalService, RouteTable};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
///
/// The route table is built once at startup and never mutated, so handlers share it without
/// locking.
#[derive(Clone)]
pub struct AppState {
    routes: Arc<RouteTable>,
    service: Arc<RetrievalService>,
    redact_errors: bool,
}

impl AppState {
    pub fn new(routes: RouteTable) -> Self {
        Self {
            routes: Arc::new(routes),
            service: Arc::new(RetrievalService::new()),
            redact_errors: false,
        }
    }

    /// Replace the retrieval service, e.g. to change how repositories are opened.
    pub fn with_service(mut self, service: RetrievalService) -> Self {
        self.service = Arc::new(service);
        self
    }

    /// When set, 500 responses carry a generic message instead of the failure detail.
    pub fn with_redacted_errors(mut self, redact: bool) -> Self {
        self.redact_errors = redact;
        self
    }
}

/// Build the HTTP router.
///
/// `/ready` is routed explicitly; every other path goes through the route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(READY_ENDPOINT, get(health::ready))
        .fallback(files::serve_file)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
