//! # Domain Services
//!
//! Rules that span several entities, plus the ports the application layer
//! talks to for side effects.
//!
//! - **AccessPolicy**: who may read, post in and modify forum content
//! - **EventPublisher**: best-effort realtime fan-out
//! - **Mailer**: outgoing transactional email

mod access_policy;
mod events;
mod mailer;

pub use access_policy::*;
pub use events::*;
pub use mailer::*;
