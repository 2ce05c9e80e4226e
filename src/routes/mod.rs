//! HTTP routes and middleware layering.

pub mod health;
pub mod report;

use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Build the application router.
///
/// CORS is wide open and answers OPTIONS preflight with 200 and no body;
/// the function host has no notion of trusted origins.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/cost-report",
            get(report::cost_report).post(report::cost_report),
        )
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
