use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

// Health check endpoint - lightweight, no store access
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness probe: pings the store with timeout protection
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::time::timeout(std::time::Duration::from_secs(5), state.engine.ping()).await {
        Ok(Ok(())) => (StatusCode::OK, "ready").into_response(),
        Ok(Err(e)) => {
            tracing::warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "not ready: store unavailable").into_response()
        }
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.get_snapshot())
}

// Prometheus-compatible text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let body = format!(
        "# HELP spotfinder_searches Location searches served\n# TYPE spotfinder_searches counter\nspotfinder_searches {}\n\
# HELP spotfinder_nearby_searches Radius searches served\n# TYPE spotfinder_nearby_searches counter\nspotfinder_nearby_searches {}\n\
# HELP spotfinder_locations_created Locations created\n# TYPE spotfinder_locations_created counter\nspotfinder_locations_created {}\n\
# HELP spotfinder_locations_updated Locations updated\n# TYPE spotfinder_locations_updated counter\nspotfinder_locations_updated {}\n\
# HELP spotfinder_locations_deleted Locations deleted\n# TYPE spotfinder_locations_deleted counter\nspotfinder_locations_deleted {}\n\
# HELP spotfinder_store_errors Store failures\n# TYPE spotfinder_store_errors counter\nspotfinder_store_errors {}\n\
# HELP spotfinder_uptime_seconds Uptime seconds\n# TYPE spotfinder_uptime_seconds gauge\nspotfinder_uptime_seconds {}\n",
        m.searches,
        m.nearby_searches,
        m.locations_created,
        m.locations_updated,
        m.locations_deleted,
        m.store_errors,
        m.uptime_seconds,
    );
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// Version/Build info endpoint (JSON)
pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
