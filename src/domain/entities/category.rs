//! Category entity and repository trait.
//!
//! Maps to the `categories` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::{CategorySnapshot, LastThread, LocalizedText, Role};
use crate::shared::error::AppError;
use crate::shared::snowflake::{as_string, option_as_string};

pub const DEFAULT_ICON: &str = "comments";
pub const DEFAULT_COLOR: &str = "#FF0000";

/// A forum section holding threads.
///
/// Maps to the `categories` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name_es / name_en: VARCHAR(50) NOT NULL
/// - description_es / description_en: VARCHAR(500) NOT NULL
/// - slug: TEXT NOT NULL UNIQUE (from the Spanish name)
/// - sort_order: INTEGER NOT NULL DEFAULT 0
/// - is_private: BOOLEAN NOT NULL DEFAULT FALSE
/// - allowed_roles: TEXT[] NOT NULL
/// - parent_id: BIGINT NULL REFERENCES categories(id)
/// - thread_count / post_count: INTEGER NOT NULL DEFAULT 0
/// - last_thread: JSONB NULL
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id", with = "as_string")]
    pub id: i64,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub slug: String,
    pub icon: String,
    pub color: String,
    pub order: i32,
    pub is_private: bool,
    pub allowed_roles: Vec<Role>,
    #[serde(with = "option_as_string")]
    pub parent_category: Option<i64>,
    pub thread_count: i32,
    pub post_count: i32,
    pub last_thread: Option<LastThread>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Whether `role` is listed in `allowed_roles`.
    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }

    /// Snapshot embedded in threads.
    pub fn snapshot(&self) -> CategorySnapshot {
        CategorySnapshot {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: LocalizedText::default(),
            description: LocalizedText::default(),
            slug: String::new(),
            icon: DEFAULT_ICON.to_string(),
            color: DEFAULT_COLOR.to_string(),
            order: 0,
            is_private: false,
            allowed_roles: Role::ALL.to_vec(),
            parent_category: None,
            thread_count: 0,
            post_count: 0,
            last_thread: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository trait for Category data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Every category, `order` ascending.
    async fn list_all(&self) -> Result<Vec<Category>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, AppError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError>;

    async fn create(&self, category: &Category) -> Result<Category, AppError>;

    /// Persist the editable columns of `category`.
    async fn update(&self, category: &Category) -> Result<Category, AppError>;

    /// Fails with a bad request while threads still reference the category.
    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Apply `(id, order)` pairs in one transaction.
    async fn reorder(&self, orders: &[(i64, i32)]) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let category = Category::default();
        assert_eq!(category.icon, "comments");
        assert_eq!(category.color, "#FF0000");
        assert!(!category.is_private);
        assert_eq!(category.allowed_roles, vec![Role::User, Role::Moderator, Role::Admin]);
    }

    #[test]
    fn test_allows() {
        let category = Category {
            is_private: true,
            allowed_roles: vec![Role::Moderator, Role::Admin],
            ..Default::default()
        };
        assert!(!category.allows(Role::User));
        assert!(category.allows(Role::Admin));
    }

    #[test]
    fn test_serializes_order_and_string_ids() {
        let category = Category {
            id: 5,
            order: 3,
            parent_category: Some(2),
            ..Default::default()
        };
        let json = serde_json::to_value(&category).unwrap();
        assert_eq!(json["_id"], "5");
        assert_eq!(json["order"], 3);
        assert_eq!(json["parentCategory"], "2");
        assert_eq!(json["allowedRoles"][0], "user");
        assert!(json["lastThread"].is_null());
    }
}
