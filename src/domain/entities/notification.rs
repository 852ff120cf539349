//! Notification entity and repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, PageRequest, UserSnapshot};
use crate::shared::error::AppError;
use crate::shared::snowflake::{as_string, option_as_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Mention,
    Like,
    Reply,
    Thread,
    Follow,
    Admin,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mention => "mention",
            Self::Like => "like",
            Self::Reply => "reply",
            Self::Thread => "thread",
            Self::Follow => "follow",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mention" => Some(Self::Mention),
            "like" => Some(Self::Like),
            "reply" => Some(Self::Reply),
            "thread" => Some(Self::Thread),
            "follow" => Some(Self::Follow),
            "admin" => Some(Self::Admin),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// What a notification points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceModel {
    Thread,
    Post,
    User,
    Category,
}

impl ReferenceModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thread => "Thread",
            Self::Post => "Post",
            Self::User => "User",
            Self::Category => "Category",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Thread" => Some(Self::Thread),
            "Post" => Some(Self::Post),
            "User" => Some(Self::User),
            "Category" => Some(Self::Category),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub model: Option<ReferenceModel>,
    #[serde(with = "option_as_string")]
    pub id: Option<i64>,
}

impl Reference {
    pub fn post(id: i64) -> Self {
        Self {
            model: Some(ReferenceModel::Post),
            id: Some(id),
        }
    }
}

/// Maps to the `notifications` table. Rows are removed with their recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id", with = "as_string")]
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(with = "as_string")]
    pub recipient: i64,
    pub sender: Option<UserSnapshot>,
    pub reference: Reference,
    pub url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Repository trait for Notification data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError>;

    /// Newest first.
    async fn list_for_recipient(
        &self,
        recipient: i64,
        page: PageRequest,
    ) -> Result<Page<Notification>, AppError>;

    async fn count_unread(&self, recipient: i64) -> Result<i64, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>, AppError>;

    async fn mark_read(&self, id: i64) -> Result<Option<Notification>, AppError>;

    /// Returns the number of rows flipped.
    async fn mark_all_read(&self, recipient: i64) -> Result<u64, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;

    async fn delete_all_for(&self, recipient: i64) -> Result<u64, AppError>;
}
