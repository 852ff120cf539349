//! Request DTOs
//!
//! Data structures for API request bodies. Field names follow the
//! client's camelCase JSON.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::domain::{AdLocation, Attachment, NotificationPreferences, Role};

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w+$").expect("username pattern is valid"));

static COLOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{3,8}$").expect("color pattern is valid"));

fn validate_language(value: &str) -> Result<(), ValidationError> {
    match value {
        "es" | "en" => Ok(()),
        _ => Err(ValidationError::new("language")
            .with_message("Preferred language must be es or en".into())),
    }
}

/// Registration request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 20, message = "Username must be between 3 and 20 characters"),
        regex(
            path = *USERNAME_PATTERN,
            message = "Username can only contain letters, numbers and underscores"
        )
    )]
    pub username: String,

    #[validate(email(message = "Please add a valid email"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(custom(function = "validate_language"))]
    pub preferred_language: Option<String>,
}

/// Login request. Both fields are checked by hand so a missing one yields
/// a single message.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Partial profile update for the current user
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDetailsRequest {
    #[validate(
        length(min = 3, max = 20, message = "Username must be between 3 and 20 characters"),
        regex(
            path = *USERNAME_PATTERN,
            message = "Username can only contain letters, numbers and underscores"
        )
    )]
    pub username: Option<String>,

    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,

    #[validate(length(max = 500, message = "Bio cannot be more than 500 characters"))]
    pub bio: Option<String>,

    #[validate(length(max = 100, message = "Location cannot be more than 100 characters"))]
    pub location: Option<String>,

    #[validate(custom(function = "validate_language"))]
    pub preferred_language: Option<String>,

    pub notifications: Option<NotificationPreferences>,
}

/// Profile update through `/users/{id}`. Admins may also change the role.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(nested)]
    #[serde(flatten)]
    pub details: UpdateDetailsRequest,

    #[validate(length(min = 1, message = "Avatar cannot be empty"))]
    pub avatar: Option<String>,

    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please add a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Profile data handed over by the client after a social login.
#[derive(Debug, Deserialize, Validate)]
pub struct SocialAuthRequest {
    #[validate(length(min = 1, message = "Provider account id is required"))]
    pub id: String,

    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryNameInput {
    #[validate(length(min = 1, max = 50, message = "Spanish name must be 1-50 characters"))]
    pub es: String,

    #[validate(length(min = 1, max = 50, message = "English name must be 1-50 characters"))]
    pub en: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryDescriptionInput {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Spanish description must be 1-500 characters"
    ))]
    pub es: String,

    #[validate(length(
        min = 1,
        max = 500,
        message = "English description must be 1-500 characters"
    ))]
    pub en: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(nested)]
    pub name: CategoryNameInput,

    #[validate(nested)]
    pub description: CategoryDescriptionInput,

    pub icon: Option<String>,

    #[validate(regex(path = *COLOR_PATTERN, message = "Color must be a hex value"))]
    pub color: Option<String>,

    pub order: Option<i32>,
    pub is_private: Option<bool>,
    pub allowed_roles: Option<Vec<Role>>,
    pub parent_category: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[validate(nested)]
    pub name: Option<CategoryNameInput>,

    #[validate(nested)]
    pub description: Option<CategoryDescriptionInput>,

    pub icon: Option<String>,

    #[validate(regex(path = *COLOR_PATTERN, message = "Color must be a hex value"))]
    pub color: Option<String>,

    pub order: Option<i32>,
    pub is_private: Option<bool>,
    pub allowed_roles: Option<Vec<Role>>,
    pub parent_category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryOrder {
    pub id: String,
    pub order: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderCategoriesRequest {
    pub category_orders: Option<Vec<CategoryOrder>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: String,

    #[validate(length(min = 1, message = "Please add a category"))]
    pub category_id: String,

    #[serde(default)]
    #[validate(length(max = 10, message = "A thread can have at most 10 tags"))]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateThreadRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: Option<String>,

    #[validate(length(max = 10, message = "A thread can have at most 10 tags"))]
    pub tags: Option<Vec<String>>,

    pub is_announcement: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(min = 1, message = "Please add a thread"))]
    pub thread_id: String,

    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: String,

    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    pub location: AdLocation,

    #[validate(length(min = 1, message = "Please add ad code"))]
    pub ad_code: String,

    pub is_active: Option<bool>,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
    pub target_pages: Option<Vec<String>>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: Option<String>,

    pub location: Option<AdLocation>,

    #[validate(length(min = 1, message = "Please add ad code"))]
    pub ad_code: Option<String>,

    pub is_active: Option<bool>,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<chrono::DateTime<chrono::Utc>>>,
    pub target_pages: Option<Vec<String>>,
    pub display_order: Option<i32>,
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::validation::validate;
    use test_case::test_case;

    fn register(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            preferred_language: None,
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(validate(&register("el_pibe", "pibe@riverforo.com", "secret1")).is_ok());
    }

    #[test_case("ab", "pibe@riverforo.com", "secret1"; "short username")]
    #[test_case("el pibe", "pibe@riverforo.com", "secret1"; "username with space")]
    #[test_case("el_pibe", "not-an-email", "secret1"; "bad email")]
    #[test_case("el_pibe", "pibe@riverforo.com", "12345"; "short password")]
    fn test_invalid_registration(username: &str, email: &str, password: &str) {
        assert!(validate(&register(username, email, password)).is_err());
    }

    #[test]
    fn test_language_must_be_supported() {
        let mut req = register("el_pibe", "pibe@riverforo.com", "secret1");
        req.preferred_language = Some("fr".into());
        assert!(validate(&req).is_err());
        req.preferred_language = Some("en".into());
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn test_update_user_flattens_details() {
        let req: UpdateUserRequest = serde_json::from_value(serde_json::json!({
            "username": "nuevo_nombre",
            "preferredLanguage": "en",
            "role": "moderator"
        }))
        .unwrap();
        assert_eq!(req.details.username.as_deref(), Some("nuevo_nombre"));
        assert_eq!(req.details.preferred_language.as_deref(), Some("en"));
        assert_eq!(req.role, Some(Role::Moderator));
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn test_thread_tag_limit() {
        let req = CreateThreadRequest {
            title: "Hola".into(),
            content: "Contenido".into(),
            category_id: "1".into(),
            tags: (0..11).map(|i| format!("tag{}", i)).collect(),
        };
        assert!(validate(&req).is_err());
    }

    #[test]
    fn test_ad_end_date_null_is_explicit() {
        let cleared: UpdateAdRequest =
            serde_json::from_value(serde_json::json!({ "endDate": null })).unwrap();
        assert_eq!(cleared.end_date, Some(None));

        let untouched: UpdateAdRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(untouched.end_date, None);
    }

    #[test]
    fn test_category_name_is_required() {
        let req: CreateCategoryRequest = serde_json::from_value(serde_json::json!({
            "name": {"es": "", "en": "News"},
            "description": {"es": "Noticias", "en": "News"}
        }))
        .unwrap();
        assert!(validate(&req).is_err());
    }
}
