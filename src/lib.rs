//! # Spotfinder Backend Library
//!
//! Core library for Spotfinder, a service for discovering photography locations.
//! Users browse and filter locations, look up what is close to a point, and
//! curate the locations they created.
//!
//! ## Architecture
//!
//! - **Axum**: HTTP server and routing
//! - **SQLx**: asynchronous PostgreSQL access (PostGIS for geography)
//! - **Tokio**: async runtime
//! - **Serde**: JSON (de)serialization
//!
//! Dependency order, leaf first: store (connection pool) → [`engine`] → [`routes`].
//!
//! ## Core Components
//!
//! - [`auth`]: bearer token verification and the `AuthUser` extractor
//! - [`config`]: layered configuration (embedded defaults, file, environment)
//! - [`db`]: pool construction and schema bootstrap
//! - [`engine`]: the location query engine (search, nearby, CRUD, ownership)
//! - [`error`]: centralized error handling and JSON error responses
//! - [`geo`]: great-circle distance and bounding boxes
//! - [`metrics`]: request counters
//! - [`middleware`]: client IP, rate limiting and security headers
//! - [`query`]: typed filter predicate, paging and radius query parsing
//! - [`routes`]: HTTP handlers and the router
//! - [`state`]: shared application state
//! - [`store`]: the `LocationStore` trait with PostgreSQL and in-memory backends
//! - [`types`]: domain types and request bodies

pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod geo;
pub mod metrics;
pub mod middleware;
pub mod query;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;
