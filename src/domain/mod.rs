//! # Domain Layer
//!
//! The forum's core business rules, independent of HTTP and storage.
//!
//! ## Structure
//!
//! - **entities**: Users, categories, threads, posts, notifications, ads
//! - **value_objects**: Roles, languages, slugs, pagination, embedded snapshots
//! - **services**: Access rules and the outbound ports (events, mail)
//!
//! Repository traits define data access contracts. The infrastructure layer
//! implements them against PostgreSQL.

pub mod entities;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;
