//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database pool and repositories (PostgreSQL)
//! - Outgoing email (SMTP)
//! - Prometheus metrics

pub mod database;
pub mod email;
pub mod metrics;
pub mod repositories;
