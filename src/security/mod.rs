//! Request-hardening layer: rate limiting, security response headers, and
//! input sanitization. All of it is wired at the router boundary; handlers
//! only see already-validated input.

pub mod headers;
pub mod rate_limit;
pub mod sanitize;

pub use rate_limit::RateLimiter;
