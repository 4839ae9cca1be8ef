use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::LocationEngine;
use crate::metrics::Metrics;
use crate::middleware::EndpointRateLimiter;
use crate::store::LocationStore;

/// Per-endpoint keys used with [`EndpointRateLimiter`].
pub const CREATE_LOCATION_ENDPOINT: &str = "POST /locations";
pub const NEARBY_ENDPOINT: &str = "/nearby-locations";

/// The shared application state.
///
/// Cloned into every handler by axum. Nothing in here is mutated per request
/// apart from the metric counters and rate limiter windows.
#[derive(Clone)]
pub struct AppState {
    /// The location query engine, wrapping the injected store.
    pub engine: Arc<LocationEngine>,
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Request counters.
    pub metrics: Metrics,
    /// The per-endpoint rate limiter.
    pub rate_limiter: EndpointRateLimiter,
}

impl AppState {
    /// Creates a new `AppState` around an explicitly constructed store.
    ///
    /// Default endpoint limits:
    ///   - 30 location creations per minute
    ///   - 300 nearby searches per minute
    pub fn new(store: Arc<dyn LocationStore>, config: AppConfig) -> Self {
        let rate_limiter = EndpointRateLimiter::new().with_limits(vec![
            (CREATE_LOCATION_ENDPOINT, 30, 60),
            (NEARBY_ENDPOINT, 300, 60),
        ]);
        let metrics = Metrics::new();
        let engine = LocationEngine::new(store, config.search.clone(), config.nearby.clone(), metrics.clone());

        Self { engine: Arc::new(engine), config: Arc::new(config), metrics, rate_limiter }
    }
}
