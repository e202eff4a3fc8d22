//! HTTP front-end: the input form, the result page and a JSON API.
//!
//! This is the only presentation shell. It validates form input, hands
//! records to the shared [`InferenceEngine`] and renders what comes back.

pub mod handlers;
pub mod render;

use crate::metrics::PredictionMetrics;
use crate::models::inference::InferenceEngine;
use crate::types::prediction::InsightThresholds;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state accessible by all handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub metrics: Arc<PredictionMetrics>,
    pub insight: Arc<InsightThresholds>,
}

impl AppState {
    pub fn new(engine: Arc<InferenceEngine>, metrics: Arc<PredictionMetrics>, insight: InsightThresholds) -> Self {
        Self {
            engine,
            metrics,
            insight: Arc::new(insight),
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    handlers::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
