//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Registration, login, JWT tokens, password and email flows
//! - **UserService**: Profiles and account administration
//! - **CategoryService**: Forum sections and private-category access
//! - **ThreadService**: Threads, views and moderation flags
//! - **PostService**: Replies, edits and likes
//! - **NotificationService**: The caller's inbox
//! - **AdService**: Ad placements and their counters

pub mod ad_service;
pub mod auth_service;
pub mod category_service;
pub mod notification_service;
pub mod post_service;
pub mod thread_service;
pub mod user_service;

pub use ad_service::{AdError, AdService, AdServiceImpl};
pub use auth_service::{
    hash_password, hash_token, AuthError, AuthService, AuthServiceImpl, Claims, TokenIssuer,
};
pub use category_service::{CategoryError, CategoryService, CategoryServiceImpl};
pub use notification_service::{
    NewNotification, NotificationError, NotificationService, NotificationServiceImpl, Notifier,
};
pub use post_service::{PostError, PostService, PostServiceImpl};
pub use thread_service::{ThreadError, ThreadService, ThreadServiceImpl};
pub use user_service::{UserError, UserService, UserServiceImpl};
