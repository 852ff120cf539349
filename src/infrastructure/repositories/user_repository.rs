//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait.
//! Maps between the database schema and domain User entity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{
    Language, NotificationPreferences, Page, PageRequest, Role, SocialProvider, User,
    UserRepository,
};
use crate::shared::error::AppError;

const USER_COLUMNS: &str = r#"
    id, username, email, password_hash, avatar, role, bio, location,
    preferred_language, notifications, email_verified, email_verification_token,
    reset_password_token, reset_password_expire, google_id, facebook_id,
    post_count, thread_count, join_date, last_active, created_at, updated_at
"#;

/// Database row representation matching the users table schema.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    avatar: String,
    role: String,
    bio: Option<String>,
    location: Option<String>,
    preferred_language: String,
    notifications: Json<NotificationPreferences>,
    email_verified: bool,
    email_verification_token: Option<String>,
    reset_password_token: Option<String>,
    reset_password_expire: Option<DateTime<Utc>>,
    google_id: Option<String>,
    facebook_id: Option<String>,
    post_count: i32,
    thread_count: i32,
    join_date: DateTime<Utc>,
    last_active: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert database row to domain User entity.
    fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            avatar: self.avatar,
            role: self.role.parse().unwrap_or_default(),
            bio: self.bio,
            location: self.location,
            preferred_language: Language::from_str(&self.preferred_language),
            notifications: self.notifications.0,
            email_verified: self.email_verified,
            email_verification_token: self.email_verification_token,
            reset_password_token: self.reset_password_token,
            reset_password_expire: self.reset_password_expire,
            google_id: self.google_id,
            facebook_id: self.facebook_id,
            post_count: self.post_count,
            thread_count: self.thread_count,
            join_date: self.join_date,
            last_active: self.last_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn map_conflict(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("User with this email or username already exists".to_string())
        }
        _ => AppError::Database(e),
    }
}

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, predicate);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(UserRow::into_user))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_where("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.find_where("username", username).await
    }

    async fn find_by_social_id(
        &self,
        provider: SocialProvider,
        provider_id: &str,
    ) -> Result<Option<User>, AppError> {
        let column = match provider {
            SocialProvider::Google => "google_id",
            SocialProvider::Facebook => "facebook_id",
        };
        self.find_where(column, provider_id).await
    }

    async fn find_by_verification_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, AppError> {
        self.find_where("email_verification_token", token_hash).await
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT {} FROM users WHERE reset_password_token = $1 AND reset_password_expire > $2",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn list(&self, page: PageRequest) -> Result<Page<User>, AppError> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY join_date DESC, id DESC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(UserRow::into_user).collect(),
            total,
        ))
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, avatar, role, bio, location,
                               preferred_language, notifications, email_verified,
                               email_verification_token, google_id, facebook_id,
                               join_date, last_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.avatar)
            .bind(user.role.as_str())
            .bind(&user.bio)
            .bind(&user.location)
            .bind(user.preferred_language.as_str())
            .bind(Json(user.notifications))
            .bind(user.email_verified)
            .bind(&user.email_verification_token)
            .bind(&user.google_id)
            .bind(&user.facebook_id)
            .bind(user.join_date)
            .bind(user.last_active)
            .fetch_one(&self.pool)
            .await
            .map_err(map_conflict)?;

        Ok(row.into_user())
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let sql = format!(
            r#"
            UPDATE users
            SET username = $2,
                email = $3,
                password_hash = $4,
                avatar = $5,
                role = $6,
                bio = $7,
                location = $8,
                preferred_language = $9,
                notifications = $10,
                email_verified = $11,
                email_verification_token = $12,
                reset_password_token = $13,
                reset_password_expire = $14,
                google_id = $15,
                facebook_id = $16,
                last_active = $17,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.avatar)
            .bind(user.role.as_str())
            .bind(&user.bio)
            .bind(&user.location)
            .bind(user.preferred_language.as_str())
            .bind(Json(user.notifications))
            .bind(user.email_verified)
            .bind(&user.email_verification_token)
            .bind(&user.reset_password_token)
            .bind(user.reset_password_expire)
            .bind(&user.google_id)
            .bind(&user.facebook_id)
            .bind(user.last_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_conflict)?
            .ok_or_else(|| AppError::NotFound(format!("User not found with id of {}", user.id)))?;

        Ok(row.into_user())
    }

    async fn touch_last_active(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_active = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User not found with id of {}", id)));
        }

        Ok(())
    }
}
