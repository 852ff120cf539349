//! Post entity and repository trait.
//!
//! Maps to the `posts` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, PageRequest, ThreadSnapshot, UserSnapshot};
use crate::shared::error::AppError;
use crate::shared::snowflake::{as_string, option_as_string};

/// A user's like on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(with = "as_string")]
    pub user: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// `@username` found in the content. `user` is set once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    #[serde(default, with = "option_as_string", skip_serializing_if = "Option::is_none")]
    pub user: Option<i64>,
    pub username: String,
}

/// File metadata attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub originalname: String,
    pub mimetype: String,
    pub size: i64,
    pub url: String,
}

/// Previous content kept on edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEntry {
    pub content: String,
    pub edited_at: DateTime<Utc>,
}

/// A reply inside a thread. The oldest post of a thread is its opening post.
///
/// Maps to the `posts` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - content: TEXT NOT NULL
/// - author_id / author_username / author_avatar: author snapshot
/// - thread_id / thread_title / thread_slug: thread snapshot
/// - likes / mentions / attachments / edit_history: JSONB NOT NULL
/// - is_edited: BOOLEAN NOT NULL DEFAULT FALSE
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", with = "as_string")]
    pub id: i64,
    pub content: String,
    pub user: UserSnapshot,
    pub thread: ThreadSnapshot,
    pub likes: Vec<Like>,
    pub mentions: Vec<Mention>,
    pub attachments: Vec<Attachment>,
    pub is_edited: bool,
    pub edit_history: Vec<EditEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user.id == user_id
    }

    pub fn liked_by(&self, user_id: i64) -> bool {
        self.likes.iter().any(|like| like.user == user_id)
    }

    /// Add or remove `user`'s like. Returns true when a like was added.
    pub fn toggle_like(&mut self, user: &UserSnapshot, at: DateTime<Utc>) -> bool {
        if let Some(index) = self.likes.iter().position(|like| like.user == user.id) {
            self.likes.remove(index);
            false
        } else {
            self.likes.push(Like {
                user: user.id,
                username: user.username.clone(),
                created_at: at,
            });
            true
        }
    }

    /// Replace the content, recording the previous version.
    pub fn edit(&mut self, content: String, mentions: Vec<Mention>, at: DateTime<Utc>) {
        let previous = std::mem::replace(&mut self.content, content);
        self.edit_history.push(EditEntry {
            content: previous,
            edited_at: at,
        });
        self.is_edited = true;
        self.mentions = mentions;
        self.updated_at = at;
    }
}

/// Outcome of a like toggle.
#[derive(Debug, Clone)]
pub struct LikeToggle {
    pub post: Post,
    /// True when the like was added, false when it was removed.
    pub liked: bool,
    pub thread_like_count: i64,
}

/// Repository trait for Post data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Newest first.
    async fn list(&self, page: PageRequest) -> Result<Page<Post>, AppError>;

    /// Case-insensitive substring match on content, newest first.
    async fn search(&self, term: &str, page: PageRequest) -> Result<Page<Post>, AppError>;

    /// Posts of one thread, oldest first.
    async fn list_by_thread(&self, thread_id: i64, page: PageRequest)
        -> Result<Page<Post>, AppError>;

    /// Posts written by one user, newest first.
    async fn list_by_author(&self, user_id: i64, page: PageRequest)
        -> Result<Page<Post>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, AppError>;

    /// Id of the oldest post of a thread (ties broken by id).
    async fn opening_post_id(&self, thread_id: i64) -> Result<Option<i64>, AppError>;

    /// Insert a reply in one transaction: the thread gets its `last_post`
    /// and `post_count` bumped, the category and author their `post_count`.
    async fn create_reply(&self, post: &Post, category_id: i64) -> Result<Post, AppError>;

    /// Persist content, mentions and edit history. Likes are left as stored.
    async fn update(&self, post: &Post) -> Result<Post, AppError>;

    /// Add or remove `user`'s like under the post's row lock and recount the
    /// thread's `like_count` in the same transaction. `None` when the post
    /// is gone.
    async fn toggle_like(
        &self,
        post_id: i64,
        user: &UserSnapshot,
        at: DateTime<Utc>,
    ) -> Result<Option<LikeToggle>, AppError>;

    /// Delete a reply in one transaction, decrementing the thread and category
    /// counters and recomputing the thread's `last_post`.
    async fn delete_reply(&self, post: &Post, category_id: i64) -> Result<(), AppError>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn post(id: i64, author_id: i64, thread_id: i64) -> Post {
        let now = Utc::now();
        Post {
            id,
            content: "Vamos River".into(),
            user: UserSnapshot {
                id: author_id,
                username: format!("hincha{}", author_id),
                avatar: "default-avatar.png".into(),
            },
            thread: ThreadSnapshot {
                id: thread_id,
                title: "Superclásico en el Monumental".into(),
                slug: "superclasico-en-el-monumental".into(),
            },
            likes: vec![],
            mentions: vec![],
            attachments: vec![],
            is_edited: false,
            edit_history: vec![],
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn liker(id: i64) -> UserSnapshot {
        UserSnapshot {
            id,
            username: format!("u{}", id),
            avatar: String::new(),
        }
    }

    #[test]
    fn test_toggle_like_adds_then_removes() {
        let mut post = fixtures::post(1, 2, 3);
        assert!(post.toggle_like(&liker(9), Utc::now()));
        assert!(post.liked_by(9));
        assert!(!post.toggle_like(&liker(9), Utc::now()));
        assert!(post.likes.is_empty());
    }

    #[test]
    fn test_one_like_per_user() {
        let mut post = fixtures::post(1, 2, 3);
        post.toggle_like(&liker(9), Utc::now());
        post.toggle_like(&liker(10), Utc::now());
        post.toggle_like(&liker(9), Utc::now());
        assert_eq!(post.likes.len(), 1);
        assert_eq!(post.likes[0].user, 10);
    }

    #[test]
    fn test_edit_appends_history() {
        let mut post = fixtures::post(1, 2, 3);
        post.edit("Nuevo texto".into(), vec![], Utc::now());
        post.edit("Otro texto".into(), vec![], Utc::now());

        assert!(post.is_edited);
        assert_eq!(post.content, "Otro texto");
        assert_eq!(post.edit_history.len(), 2);
        assert_eq!(post.edit_history[0].content, "Vamos River");
        assert_eq!(post.edit_history[1].content, "Nuevo texto");
    }

    #[test]
    fn test_unresolved_mention_omits_user() {
        let mention = Mention {
            user: None,
            username: "enzo".into(),
        };
        let json = serde_json::to_value(&mention).unwrap();
        assert!(json.get("user").is_none());

        let back: Mention = serde_json::from_value(serde_json::json!({"username": "enzo"})).unwrap();
        assert_eq!(back, mention);
    }
}
