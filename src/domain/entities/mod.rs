//! # Domain Entities
//!
//! Core domain entities representing the forum's business objects.
//! All entities map directly to their corresponding database tables.
//!
//! - **User**: account with credentials, profile and counters
//! - **Category**: bilingual forum section
//! - **Thread**: discussion with denormalized author and category snapshots
//! - **Post**: reply inside a thread, with likes, mentions and edit history
//! - **Notification**: per-user inbox entry
//! - **AdPlacement**: stored ad code with impression and click counters
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod ad_placement;
mod category;
mod notification;
mod post;
mod thread;
mod user;

pub use ad_placement::{AdLocation, AdPlacement, AdRepository, AdStats, LocationStats};
pub use category::{Category, CategoryRepository, DEFAULT_COLOR, DEFAULT_ICON};
pub use notification::{
    Notification, NotificationKind, NotificationRepository, Reference, ReferenceModel,
};
pub use post::{Attachment, EditEntry, Like, LikeToggle, Mention, Post, PostRepository};
pub use thread::{Thread, ThreadFlag, ThreadRepository, MAX_TAGS};
pub use user::{NotificationPreferences, SocialProvider, User, UserRepository, DEFAULT_AVATAR};

#[cfg(test)]
pub use ad_placement::MockAdRepository;
#[cfg(test)]
pub use category::MockCategoryRepository;
#[cfg(test)]
pub use notification::MockNotificationRepository;
#[cfg(test)]
pub use post::MockPostRepository;
#[cfg(test)]
pub use thread::MockThreadRepository;
#[cfg(test)]
pub use user::MockUserRepository;

#[cfg(test)]
pub(crate) mod fixtures {
    pub use super::post::fixtures::post;
    pub use super::thread::fixtures::thread;
}
