//! Response DTOs
//!
//! Every successful body carries `"success": true`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    AdStats, Language, LocationStats, NotificationPreferences, Page, PageLinks, PageRequest,
    Role, User,
};
use crate::shared::snowflake::as_string;

/// `{success, data}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `{success, data: {}}`
pub type EmptyData = DataResponse<serde_json::Map<String, serde_json::Value>>;

pub fn empty_data() -> EmptyData {
    DataResponse::new(serde_json::Map::new())
}

/// `{success, count, pagination?, data}`
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageLinks>,
    pub data: Vec<T>,
}

impl<T: Serialize> ListResponse<T> {
    /// A full collection without pagination.
    pub fn all(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            pagination: None,
            data,
        }
    }

    /// One page of a larger collection.
    pub fn paged(page: Page<T>, request: PageRequest) -> Self {
        Self {
            success: true,
            count: page.items.len(),
            pagination: Some(request.links(page.total)),
            data: page.items,
        }
    }
}

/// `{success, token}`
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}

impl TokenResponse {
    pub fn new(token: String) -> Self {
        Self {
            success: true,
            token,
        }
    }
}

/// `{success, message}`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// Public view of an account. Credentials and tokens never leave the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id", with = "as_string")]
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub avatar: String,
    pub role: Role,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub preferred_language: Language,
    pub notifications: NotificationPreferences,
    pub email_verified: bool,
    pub post_count: i32,
    pub thread_count: i32,
    pub join_date: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: User, include_email: bool) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: if include_email { Some(user.email) } else { None },
            avatar: user.avatar,
            role: user.role,
            bio: user.bio,
            location: user.location,
            preferred_language: user.preferred_language,
            notifications: user.notifications,
            email_verified: user.email_verified,
            post_count: user.post_count,
            thread_count: user.thread_count,
            join_date: user.join_date,
            last_active: user.last_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdTotals {
    pub impressions: i64,
    pub clicks: i64,
    pub ctr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdStatsResponse {
    pub total: AdTotals,
    pub by_location: Vec<LocationStats>,
}

impl From<AdStats> for AdStatsResponse {
    fn from(stats: AdStats) -> Self {
        Self {
            total: AdTotals {
                impressions: stats.impressions,
                clicks: stats.clicks,
                ctr: stats.ctr(),
            },
            by_location: stats.by_location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AdLocation;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_user_response_hides_secrets() {
        let user = User {
            id: 12,
            username: "enzo".into(),
            email: "enzo@riverforo.com".into(),
            password_hash: "argon2-hash".into(),
            email_verification_token: Some("digest".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(UserResponse::from_user(user, false)).unwrap();

        assert_eq!(json["_id"], "12");
        assert!(json.get("email").is_none());
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("emailVerificationToken").is_none());
        assert_eq!(json["preferredLanguage"], "es");
    }

    #[test]
    fn test_user_response_email_for_owner() {
        let user = User {
            email: "enzo@riverforo.com".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(UserResponse::from_user(user, true)).unwrap();
        assert_eq!(json["email"], "enzo@riverforo.com");
    }

    #[test]
    fn test_paged_list_shape() {
        let request = PageRequest::new(1, 2);
        let body = ListResponse::paged(Page::new(vec![1, 2], 5), request);
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(
            json,
            json!({
                "success": true,
                "count": 2,
                "pagination": {"next": {"page": 2, "limit": 2}},
                "data": [1, 2]
            })
        );
    }

    #[test]
    fn test_unpaged_list_omits_pagination() {
        let json = serde_json::to_value(ListResponse::all(vec!["a"])).unwrap();
        assert!(json.get("pagination").is_none());
        assert_eq!(json["count"], 1);
    }

    #[test]
    fn test_ad_stats_shape() {
        let stats = AdStats {
            impressions: 400,
            clicks: 6,
            by_location: vec![LocationStats {
                location: AdLocation::Header,
                impressions: 400,
                clicks: 6,
                count: 1,
            }],
        };
        let json = serde_json::to_value(AdStatsResponse::from(stats)).unwrap();
        assert_eq!(json["total"]["ctr"], "1.50");
        assert_eq!(json["byLocation"][0]["_id"], "header");
    }
}
