//! Middleware components for HTTP request processing.
//!
//! Client identification, rate limiting and security headers, layered onto the
//! router in `main.rs`.

pub mod ip;
pub mod rate_limit;
pub mod security_headers;

pub use rate_limit::EndpointRateLimiter;
