//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **Role**: account role (user, moderator, admin)
//! - **Language / LocalizedText**: Spanish and English content
//! - **Slug**: URL slugs derived from names and titles
//! - **Mentions**: `@username` extraction from post content
//! - **Page**: offset pagination and the `pagination` links object
//! - **Snapshots**: denormalized author, category and thread copies

mod language;
mod mentions;
mod page;
mod role;
mod slug;
mod snapshot;

pub use language::*;
pub use mentions::*;
pub use page::*;
pub use role::*;
pub use slug::*;
pub use snapshot::*;
