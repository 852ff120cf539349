//! # RiverForo Library
//!
//! Backend for a bilingual (Spanish/English) River Plate fan forum:
//! - RESTful HTTP API under `/api`
//! - WebSocket channels for realtime thread and notification events
//! - PostgreSQL for persistent storage
//! - Redis (optional) for the shared rate limiter
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities, value objects, access rules and repository traits
//! - **Application Layer**: Business logic services and DTOs
//! - **Infrastructure Layer**: Database, email and metrics implementations
//! - **Presentation Layer**: HTTP handlers, middleware and the realtime gateway
//!
//! ## Module Structure
//!
//! ```text
//! riverforo/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities, value objects, and traits
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ Database, email and metrics implementations
//! +-- presentation/   HTTP routes, middleware and realtime handlers
//! +-- shared/         Common utilities (errors, snowflake IDs, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Initial data for a fresh database
pub mod seed;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
