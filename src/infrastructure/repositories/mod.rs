//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **PgUserRepository** - accounts, credentials and tokens
//! - **PgCategoryRepository** - bilingual categories and ordering
//! - **PgThreadRepository** - threads, created and deleted with their posts
//! - **PgPostRepository** - replies, likes and edit history
//! - **PgNotificationRepository** - per-user inbox
//! - **PgAdRepository** - ad placements and their counters
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use riverforo::infrastructure::repositories::{PgThreadRepository, PgUserRepository};
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let user_repo = PgUserRepository::new(pool.clone());
//!     let thread_repo = PgThreadRepository::new(pool.clone());
//! }
//! ```

pub mod ad_repository;
pub mod category_repository;
pub mod notification_repository;
pub mod post_repository;
pub mod thread_repository;
pub mod user_repository;

pub use ad_repository::PgAdRepository;
pub use category_repository::PgCategoryRepository;
pub use notification_repository::PgNotificationRepository;
pub use post_repository::PgPostRepository;
pub use thread_repository::PgThreadRepository;
pub use user_repository::PgUserRepository;
