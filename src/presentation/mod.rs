//! Presentation Layer
//!
//! HTTP routes, middleware and the realtime WebSocket gateway.

pub mod http;
pub mod middleware;
pub mod realtime;
