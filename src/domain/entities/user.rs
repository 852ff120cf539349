//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Language, Page, PageRequest, Role, UserSnapshot};
use crate::shared::error::AppError;

/// Avatar assigned to new accounts.
pub const DEFAULT_AVATAR: &str = "default-avatar.png";

/// Per-user notification switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub email: bool,
    pub mentions: bool,
    pub replies: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            mentions: true,
            replies: true,
        }
    }
}

/// Supported social login providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialProvider {
    Google,
    Facebook,
}

impl SocialProvider {
    /// Parse the `{provider}` path segment.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "google" => Some(Self::Google),
            "facebook" => Some(Self::Facebook),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }
}

/// Represents a forum account.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - username: VARCHAR(20) NOT NULL UNIQUE
/// - email: VARCHAR(255) NOT NULL UNIQUE
/// - password_hash: TEXT NOT NULL
/// - role: VARCHAR(16) NOT NULL DEFAULT 'user'
/// - preferred_language: VARCHAR(2) NOT NULL DEFAULT 'es'
/// - notifications: JSONB NOT NULL
/// - email_verification_token / reset_password_token: SHA-256 hex digests
/// - google_id / facebook_id: provider account ids
///
/// Not `Serialize`. Responses go through `UserResponse`.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Username (3-20 word characters, unique)
    pub username: String,

    /// Email address (unique)
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    pub avatar: String,
    pub role: Role,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub preferred_language: Language,
    pub notifications: NotificationPreferences,

    pub email_verified: bool,
    pub email_verification_token: Option<String>,
    pub reset_password_token: Option<String>,
    pub reset_password_expire: Option<DateTime<Utc>>,

    pub google_id: Option<String>,
    pub facebook_id: Option<String>,

    pub post_count: i32,
    pub thread_count: i32,

    pub join_date: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Author snapshot embedded in threads, posts and notifications.
    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.id,
            username: self.username.clone(),
            avatar: self.avatar.clone(),
        }
    }

    /// Provider account id for `provider`, if linked.
    pub fn social_id(&self, provider: SocialProvider) -> Option<&str> {
        match provider {
            SocialProvider::Google => self.google_id.as_deref(),
            SocialProvider::Facebook => self.facebook_id.as_deref(),
        }
    }

    /// Link a provider account.
    pub fn link_social(&mut self, provider: SocialProvider, provider_id: String) {
        match provider {
            SocialProvider::Google => self.google_id = Some(provider_id),
            SocialProvider::Facebook => self.facebook_id = Some(provider_id),
        }
    }
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username: String::new(),
            email: String::new(),
            password_hash: String::new(),
            avatar: DEFAULT_AVATAR.to_string(),
            role: Role::User,
            bio: None,
            location: None,
            preferred_language: Language::Es,
            notifications: NotificationPreferences::default(),
            email_verified: false,
            email_verification_token: None,
            reset_password_token: None,
            reset_password_expire: None,
            google_id: None,
            facebook_id: None,
            post_count: 0,
            thread_count: 0,
            join_date: now,
            last_active: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository trait for User data access operations.
///
/// Implementations of this trait handle the actual database interactions.
/// The trait is defined in the domain layer to maintain dependency inversion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Find a user by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Find the account linked to a social provider id.
    async fn find_by_social_id(
        &self,
        provider: SocialProvider,
        provider_id: &str,
    ) -> Result<Option<User>, AppError>;

    /// Find the account holding this hashed verification token.
    async fn find_by_verification_token(&self, token_hash: &str)
        -> Result<Option<User>, AppError>;

    /// Find the account holding this hashed reset token, if it expires after `now`.
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError>;

    /// Check if a username is already taken.
    async fn username_exists(&self, username: &str) -> Result<bool, AppError>;

    /// Check if an email address is already registered.
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// Newest accounts first.
    async fn list(&self, page: PageRequest) -> Result<Page<User>, AppError>;

    /// Create a new user in the database.
    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Persist every mutable column of `user`.
    async fn update(&self, user: &User) -> Result<User, AppError>;

    /// Stamp `last_active`.
    async fn touch_last_active(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Delete a user by ID. Their notifications go with them.
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}
