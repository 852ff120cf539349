//! Denormalized copies of related records embedded in rows and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::language::LocalizedText;
use crate::shared::snowflake::as_string;

/// Author snapshot `{_id, username, avatar}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    #[serde(rename = "_id", with = "as_string")]
    pub id: i64,
    pub username: String,
    pub avatar: String,
}

/// Category snapshot carried by threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    #[serde(rename = "_id", with = "as_string")]
    pub id: i64,
    pub name: LocalizedText,
    pub slug: String,
}

/// Thread snapshot carried by posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    #[serde(rename = "_id", with = "as_string")]
    pub id: i64,
    pub title: String,
    pub slug: String,
}

impl ThreadSnapshot {
    /// Client URL of a post inside this thread.
    pub fn post_url(&self, post_id: i64) -> String {
        format!("/forums/thread/{}#post-{}", self.slug, post_id)
    }
}

/// Most recent post of a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastPost {
    #[serde(rename = "_id", with = "as_string")]
    pub id: i64,
    pub user: UserSnapshot,
    pub created_at: DateTime<Utc>,
}

/// Most recent thread of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastThread {
    #[serde(with = "as_string")]
    pub thread_id: i64,
    pub title: String,
    pub user: UserSnapshot,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_snapshot_uses_underscore_id_string() {
        let snapshot = UserSnapshot {
            id: 99,
            username: "enzo".into(),
            avatar: "default-avatar.png".into(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["_id"], "99");
        assert_eq!(json["username"], "enzo");
    }

    #[test]
    fn test_last_thread_roundtrips_through_jsonb() {
        let last = LastThread {
            thread_id: 7,
            title: "Superclásico".into(),
            user: UserSnapshot {
                id: 1,
                username: "admin".into(),
                avatar: "a.png".into(),
            },
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&last).unwrap();
        assert_eq!(value["threadId"], "7");
        let back: LastThread = serde_json::from_value(value).unwrap();
        assert_eq!(back, last);
    }
}
