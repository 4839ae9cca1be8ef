//! HTTP route handlers for the Spotfinder API.
//!
//! - `categories`: the fixed category list
//! - `health`: health, readiness, metrics and version endpoints
//! - `locations`: search, radius search and location CRUD

pub mod categories;
pub mod health;
pub mod locations;

use axum::{
    middleware::from_fn_with_state,
    routing::get,
    Router,
};

use crate::middleware::security_headers::security_headers_middleware;
use crate::state::AppState;

/// All API routes with state applied and security headers layered on.
///
/// Transport concerns (tracing, compression, CORS, body limit, global rate
/// limit) are added by the binary.
pub fn router(state: AppState) -> Router {
    let cfg = state.config.clone();

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .route("/categories", get(categories::list_categories))
        .route("/locations", get(locations::search_locations).post(locations::create_location))
        .route(
            "/locations/{id}",
            get(locations::get_location).put(locations::update_location).delete(locations::delete_location),
        )
        .route("/nearby-locations", get(locations::nearby_locations))
        .with_state(state)
        .layer(from_fn_with_state(cfg, security_headers_middleware))
}
