//! Integration and unit tests for the Spotfinder service.
//!
//! ## Test Modules
//!
//! - **fixtures**: shared builders for stores, users and locations
//! - **api_tests**: the HTTP surface driven through the router
//! - **engine_tests**: search, nearby and CRUD semantics against the in-memory store
//! - **error_tests**: error mapping and JSON error bodies
//! - **config_tests**: configuration loading and validation
//!
//! Tests that need PostGIS live next to `store::postgres` and are `#[ignore]`d;
//! run them with `DATABASE_URL=postgres://... cargo test -- --ignored`.

pub mod config_tests;
pub mod engine_tests;
