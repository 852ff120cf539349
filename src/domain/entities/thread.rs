//! Thread entity and repository trait.
//!
//! Maps to the `threads` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::post::Post;
use crate::domain::value_objects::{
    CategorySnapshot, LastPost, Page, PageRequest, ThreadSnapshot, UserSnapshot,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::as_string;

pub const MAX_TAGS: usize = 10;

/// A discussion inside a category.
///
/// Maps to the `threads` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - title: VARCHAR(100) NOT NULL
/// - slug: TEXT NOT NULL UNIQUE
/// - content: TEXT NOT NULL
/// - author_id / author_username / author_avatar: author snapshot
/// - category_id / category_name_es / category_name_en / category_slug: category snapshot
/// - tags: TEXT[] NOT NULL
/// - last_post: JSONB NULL
/// - view_count / post_count / like_count: INTEGER NOT NULL DEFAULT 0
/// - is_sticky / is_locked / is_announcement: BOOLEAN NOT NULL DEFAULT FALSE
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    #[serde(rename = "_id", with = "as_string")]
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub user: UserSnapshot,
    pub category: CategorySnapshot,
    pub tags: Vec<String>,
    pub last_post: Option<LastPost>,
    pub view_count: i32,
    pub post_count: i32,
    pub like_count: i32,
    pub is_sticky: bool,
    pub is_locked: bool,
    pub is_announcement: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user.id == user_id
    }

    /// Snapshot embedded in posts.
    pub fn snapshot(&self) -> ThreadSnapshot {
        ThreadSnapshot {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
        }
    }
}

/// Moderation flags toggled by staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadFlag {
    Sticky,
    Locked,
}

impl ThreadFlag {
    pub(crate) fn column(self) -> &'static str {
        match self {
            ThreadFlag::Sticky => "is_sticky",
            ThreadFlag::Locked => "is_locked",
        }
    }
}

/// Repository trait for Thread data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Sticky first, then most recently updated.
    async fn list(&self, page: PageRequest) -> Result<Page<Thread>, AppError>;

    /// Threads of one category, sticky first, then most recently updated.
    async fn list_by_category(
        &self,
        category_id: i64,
        page: PageRequest,
    ) -> Result<Page<Thread>, AppError>;

    /// Threads started by one user, newest first.
    async fn list_by_author(&self, user_id: i64, page: PageRequest)
        -> Result<Page<Thread>, AppError>;

    /// Case-insensitive substring match on title or content, most recently updated first.
    async fn search(&self, term: &str, page: PageRequest) -> Result<Page<Thread>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Thread>, AppError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Thread>, AppError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError>;

    async fn count_by_category(&self, category_id: i64) -> Result<i64, AppError>;

    /// Atomically bump `view_count` and return the updated row.
    async fn increment_views(&self, id: i64) -> Result<Option<Thread>, AppError>;

    /// Insert a thread and its opening post in one transaction, updating the
    /// category counters, its `last_thread` and the author's counters.
    async fn create_with_opening_post(
        &self,
        thread: &Thread,
        opening_post: &Post,
    ) -> Result<Thread, AppError>;

    /// Persist title, content, tags and `is_announcement`. Sticky and lock
    /// state only change through `toggle_flag`.
    async fn update(&self, thread: &Thread) -> Result<Thread, AppError>;

    /// Flip a moderation flag in place. `None` when the thread is gone.
    async fn toggle_flag(&self, id: i64, flag: ThreadFlag) -> Result<Option<Thread>, AppError>;

    /// Delete the thread and all of its posts in one transaction, adjusting
    /// the category counters. Returns the number of posts removed.
    async fn delete_with_posts(&self, thread: &Thread) -> Result<u64, AppError>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::domain::value_objects::LocalizedText;

    pub fn thread(id: i64, author_id: i64, category_id: i64) -> Thread {
        let now = Utc::now();
        Thread {
            id,
            title: "Superclásico en el Monumental".into(),
            slug: "superclasico-en-el-monumental".into(),
            content: "¿Qué equipo ponen?".into(),
            user: UserSnapshot {
                id: author_id,
                username: "gallardo".into(),
                avatar: "default-avatar.png".into(),
            },
            category: CategorySnapshot {
                id: category_id,
                name: LocalizedText::new("Partidos y Eventos", "Matches and Events"),
                slug: "partidos-y-eventos".into(),
            },
            tags: vec![],
            last_post: None,
            view_count: 0,
            post_count: 1,
            like_count: 0,
            is_sticky: false,
            is_locked: false,
            is_announcement: false,
            created_at: now,
            updated_at: now,
        }
    }
}
