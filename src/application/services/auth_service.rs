//! Authentication Service
//!
//! Registration, login, password management, email verification and
//! social sign-in. Tokens are stateless HS256 JWTs.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::user_service::apply_details;
use crate::application::dto::request::{
    RegisterRequest, SocialAuthRequest, UpdateDetailsRequest,
};
use crate::config::{JwtSettings, ServerSettings};
use crate::domain::services::Mailer;
use crate::domain::{Language, Role, SocialProvider, User, UserRepository};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Reset tokens stay valid for this many minutes.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

const MAX_USERNAME_LEN: usize = 20;
const MAX_USERNAME_ATTEMPTS: u32 = 10;

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and mail its verification link. Returns a JWT.
    async fn register(&self, request: RegisterRequest) -> Result<String, AuthError>;

    /// Check credentials and return a JWT.
    async fn login(&self, email: Option<&str>, password: Option<&str>)
        -> Result<String, AuthError>;

    async fn current_user(&self, user_id: i64) -> Result<User, AuthError>;

    async fn update_details(
        &self,
        user_id: i64,
        details: UpdateDetailsRequest,
    ) -> Result<User, AuthError>;

    /// Change the password and return a fresh JWT.
    async fn update_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<String, AuthError>;

    /// Store a reset token digest and mail the raw token.
    async fn forgot_password(&self, email: &str) -> Result<(), AuthError>;

    async fn reset_password(&self, reset_token: &str, password: &str)
        -> Result<String, AuthError>;

    async fn verify_email(&self, verification_token: &str) -> Result<(), AuthError>;

    /// Find, link or create the account behind a provider profile. Returns a JWT.
    async fn social_login(
        &self,
        provider: &str,
        profile: SocialAuthRequest,
    ) -> Result<String, AuthError>;
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Unique token id
    pub jti: String,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Please provide an email and password")]
    MissingCredentials,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password is incorrect")]
    IncorrectPassword,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Email already exists")]
    EmailExists,

    #[error("Username already exists")]
    UsernameExists,

    #[error("User not found with id of {0}")]
    UserNotFound(i64),

    #[error("There is no user with that email")]
    NoUserWithEmail,

    #[error("Provider {0} is not supported")]
    UnsupportedProvider(String),

    #[error("Email is required to create an account")]
    EmailRequired,

    #[error("Email could not be sent")]
    EmailNotSent,

    #[error(transparent)]
    Repository(#[from] AppError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials
            | AuthError::InvalidToken
            | AuthError::UnsupportedProvider(_)
            | AuthError::EmailRequired => AppError::BadRequest(err.to_string()),
            AuthError::InvalidCredentials | AuthError::IncorrectPassword => {
                AppError::Unauthorized(err.to_string())
            }
            AuthError::EmailExists | AuthError::UsernameExists => {
                AppError::Conflict(err.to_string())
            }
            AuthError::UserNotFound(_) | AuthError::NoUserWithEmail => {
                AppError::NotFound(err.to_string())
            }
            AuthError::EmailNotSent => AppError::EmailNotSent,
            AuthError::Repository(inner) => inner,
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    expiry_days: i64,
}

impl TokenIssuer {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            secret: settings.secret.clone(),
            expiry_days: settings.expiry_days,
        }
    }

    /// Sign a token for `user_id`.
    pub fn issue(&self, user_id: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::days(self.expiry_days)).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Validate signature and expiry, returning the user id.
    pub fn verify(&self, token: &str) -> Result<i64, AuthError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidToken)?;

        token_data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken)
    }
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Random hex token of 20 bytes. Only its digest is stored.
fn random_token() -> String {
    let bytes: [u8; 20] = rand::random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// SHA-256 hex digest of a mailed token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Lower-cased display name with whitespace and symbols removed.
fn username_from_name(name: &str) -> String {
    let base: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .take(MAX_USERNAME_LEN)
        .collect();
    if base.chars().count() < 3 {
        format!("{}user", base)
    } else {
        base
    }
}

/// AuthService implementation
pub struct AuthServiceImpl<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    mailer: Arc<dyn Mailer>,
    id_generator: Arc<SnowflakeGenerator>,
    tokens: TokenIssuer,
    server: ServerSettings,
}

impl<U> AuthServiceImpl<U>
where
    U: UserRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        mailer: Arc<dyn Mailer>,
        id_generator: Arc<SnowflakeGenerator>,
        tokens: TokenIssuer,
        server: ServerSettings,
    ) -> Self {
        Self {
            user_repo,
            mailer,
            id_generator,
            tokens,
            server,
        }
    }

    async fn load_user(&self, user_id: i64) -> Result<User, AuthError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound(user_id))
    }

    /// `base`, or `base` with a random numeric suffix when it is taken.
    async fn free_username(&self, base: &str) -> Result<String, AuthError> {
        if !self.user_repo.username_exists(base).await? {
            return Ok(base.to_string());
        }
        let stem: String = base.chars().take(MAX_USERNAME_LEN - 4).collect();
        for _ in 0..MAX_USERNAME_ATTEMPTS {
            let suffix: u32 = rand::rng().random_range(0..10000);
            let candidate = format!("{}{}", stem, suffix);
            if !self.user_repo.username_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        tracing::warn!(base, "No free username left for social sign-in");
        Err(AuthError::UsernameExists)
    }
}

#[async_trait]
impl<U> AuthService for AuthServiceImpl<U>
where
    U: UserRepository + 'static,
{
    async fn register(&self, request: RegisterRequest) -> Result<String, AuthError> {
        if self.user_repo.email_exists(&request.email).await? {
            return Err(AuthError::EmailExists);
        }
        if self.user_repo.username_exists(&request.username).await? {
            return Err(AuthError::UsernameExists);
        }

        let verification_token = random_token();
        let now = Utc::now();
        let user = User {
            id: self.id_generator.generate(),
            username: request.username,
            email: request.email,
            password_hash: hash_password(&request.password)?,
            role: Role::User,
            preferred_language: request
                .preferred_language
                .as_deref()
                .map(Language::from_str)
                .unwrap_or_default(),
            email_verification_token: Some(hash_token(&verification_token)),
            join_date: now,
            last_active: now,
            created_at: now,
            updated_at: now,
            ..Default::default()
        };
        let mut user = self.user_repo.create(&user).await?;

        let link = self
            .server
            .public_link(&format!("/api/auth/verify-email/{}", verification_token));
        let message = format!(
            "You are receiving this email because you need to verify your email address. \
             Please make a GET request to: \n\n {}",
            link
        );

        if let Err(e) = self
            .mailer
            .send(&user.email, "Email Verification", &message)
            .await
        {
            tracing::error!(user_id = user.id, error = %e, "Verification email failed");
            user.email_verification_token = None;
            self.user_repo.update(&user).await?;
            return Err(AuthError::EmailNotSent);
        }

        tracing::info!(user_id = user.id, username = %user.username, "User registered");

        self.tokens.issue(user.id)
    }

    async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<String, AuthError> {
        let (email, password) = match (email, password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                (email, password)
            }
            _ => return Err(AuthError::MissingCredentials),
        };

        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        self.user_repo.touch_last_active(user.id, Utc::now()).await?;

        tracing::info!(user_id = user.id, "User logged in");

        self.tokens.issue(user.id)
    }

    async fn current_user(&self, user_id: i64) -> Result<User, AuthError> {
        self.load_user(user_id).await
    }

    async fn update_details(
        &self,
        user_id: i64,
        details: UpdateDetailsRequest,
    ) -> Result<User, AuthError> {
        let mut user = self.load_user(user_id).await?;
        apply_details(self.user_repo.as_ref(), &mut user, details).await?;
        let user = self.user_repo.update(&user).await?;

        tracing::info!(user_id, "User details updated");

        Ok(user)
    }

    async fn update_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<String, AuthError> {
        let mut user = self.load_user(user_id).await?;

        if !verify_password(current_password, &user.password_hash)? {
            return Err(AuthError::IncorrectPassword);
        }

        user.password_hash = hash_password(new_password)?;
        self.user_repo.update(&user).await?;

        tracing::info!(user_id, "Password updated");

        self.tokens.issue(user.id)
    }

    async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let mut user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AuthError::NoUserWithEmail)?;

        let reset_token = random_token();
        user.reset_password_token = Some(hash_token(&reset_token));
        user.reset_password_expire = Some(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES));
        let mut user = self.user_repo.update(&user).await?;

        let link = self
            .server
            .public_link(&format!("/api/auth/resetpassword/{}", reset_token));
        let message = format!(
            "You are receiving this email because you (or someone else) has requested the \
             reset of a password. Please make a PUT request to: \n\n {}",
            link
        );

        if let Err(e) = self
            .mailer
            .send(&user.email, "Password reset token", &message)
            .await
        {
            tracing::error!(user_id = user.id, error = %e, "Reset email failed");
            user.reset_password_token = None;
            user.reset_password_expire = None;
            self.user_repo.update(&user).await?;
            return Err(AuthError::EmailNotSent);
        }

        tracing::info!(user_id = user.id, "Password reset requested");

        Ok(())
    }

    async fn reset_password(
        &self,
        reset_token: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        let mut user = self
            .user_repo
            .find_by_reset_token(&hash_token(reset_token), Utc::now())
            .await?
            .ok_or(AuthError::InvalidToken)?;

        user.password_hash = hash_password(password)?;
        user.reset_password_token = None;
        user.reset_password_expire = None;
        self.user_repo.update(&user).await?;

        tracing::info!(user_id = user.id, "Password reset");

        self.tokens.issue(user.id)
    }

    async fn verify_email(&self, verification_token: &str) -> Result<(), AuthError> {
        let mut user = self
            .user_repo
            .find_by_verification_token(&hash_token(verification_token))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        user.email_verified = true;
        user.email_verification_token = None;
        self.user_repo.update(&user).await?;

        tracing::info!(user_id = user.id, "Email verified");

        Ok(())
    }

    async fn social_login(
        &self,
        provider: &str,
        profile: SocialAuthRequest,
    ) -> Result<String, AuthError> {
        let provider = SocialProvider::parse(provider)
            .ok_or_else(|| AuthError::UnsupportedProvider(provider.to_string()))?;

        let mut user = self
            .user_repo
            .find_by_social_id(provider, &profile.id)
            .await?;

        if user.is_none() {
            if let Some(email) = profile.email.as_deref() {
                if let Some(mut existing) = self.user_repo.find_by_email(email).await? {
                    existing.link_social(provider, profile.id.clone());
                    let linked = self.user_repo.update(&existing).await?;
                    tracing::info!(
                        user_id = linked.id,
                        provider = provider.as_str(),
                        "Social account linked"
                    );
                    user = Some(linked);
                }
            }
        }

        let user = match user {
            Some(user) => user,
            None => {
                let email = profile.email.clone().ok_or(AuthError::EmailRequired)?;
                let username = self.free_username(&username_from_name(&profile.name)).await?;
                let now = Utc::now();
                let mut new_user = User {
                    id: self.id_generator.generate(),
                    username,
                    email,
                    password_hash: hash_password(&random_token())?,
                    email_verified: true,
                    join_date: now,
                    last_active: now,
                    created_at: now,
                    updated_at: now,
                    ..Default::default()
                };
                new_user.link_social(provider, profile.id.clone());
                let created = self.user_repo.create(&new_user).await?;
                tracing::info!(
                    user_id = created.id,
                    provider = provider.as_str(),
                    "User registered through social login"
                );
                created
            }
        };

        self.user_repo.touch_last_active(user.id, Utc::now()).await?;

        self.tokens.issue(user.id)
    }
}
