//! Middleware
//!
//! Tower middleware for request processing.

pub mod auth;
pub mod cors;
pub mod metrics;
pub mod rate_limit;
pub mod security;

pub use auth::{optional_auth, protect, require_admin, require_staff, AuthUser, TOKEN_COOKIE};
pub use cors::create_cors_layer;
pub use metrics::track_metrics;
pub use rate_limit::{rate_limit, RateLimitInfo, RateLimiter};
pub use security::SecurityHeadersLayer;
