//! Authentication Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::application::dto::request::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, SocialAuthRequest,
    UpdateDetailsRequest, UpdatePasswordRequest,
};
use crate::application::dto::response::{
    empty_data, DataResponse, MessageResponse, TokenResponse, UserResponse,
};
use crate::application::services::{AuthService, AuthServiceImpl};
use crate::infrastructure::repositories::PgUserRepository;
use crate::presentation::http::extractors::{JsonBody, ValidatedJson};
use crate::presentation::middleware::{AuthUser, TOKEN_COOKIE};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Seconds a logged-out cookie lingers.
const LOGOUT_COOKIE_SECONDS: i64 = 10;

fn auth_service(state: &AppState) -> AuthServiceImpl<PgUserRepository> {
    AuthServiceImpl::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        state.mailer.clone(),
        state.snowflake.clone(),
        state.tokens.clone(),
        state.settings.server.clone(),
    )
}

/// httpOnly session cookie, `Secure` when configured.
fn session_cookie(value: &str, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    let mut raw = format!(
        "{}={}; Path=/; HttpOnly; Max-Age={}",
        TOKEN_COOKIE, value, max_age_seconds
    );
    if secure {
        raw.push_str("; Secure");
    }
    Cookie::parse(raw).unwrap_or_else(|_| Cookie::new(TOKEN_COOKIE, value.to_string()))
}

/// Token envelope plus the matching cookie.
fn token_response(
    state: &AppState,
    jar: CookieJar,
    token: String,
) -> (CookieJar, Json<TokenResponse>) {
    let jwt = &state.settings.jwt;
    let cookie = session_cookie(&token, jwt.cookie_expiry_days * 24 * 60 * 60, jwt.secure_cookie);
    (jar.add(cookie), Json(TokenResponse::new(token)))
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let token = auth_service(&state).register(body).await?;
    Ok(token_response(&state, jar, token))
}

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let token = auth_service(&state)
        .login(body.email.as_deref(), body.password.as_deref())
        .await?;
    Ok(token_response(&state, jar, token))
}

/// Replace the session cookie with a short-lived placeholder
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let cookie = session_cookie("none", LOGOUT_COOKIE_SECONDS, state.settings.jwt.secure_cookie);
    (jar.add(cookie), Json(empty_data()))
}

/// Current user, email included
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DataResponse<UserResponse>>, AppError> {
    let user = auth_service(&state).current_user(auth.id).await?;
    Ok(Json(DataResponse::new(UserResponse::from_user(user, true))))
}

pub async fn update_details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<UpdateDetailsRequest>,
) -> Result<Json<DataResponse<UserResponse>>, AppError> {
    let user = auth_service(&state).update_details(auth.id, body).await?;
    Ok(Json(DataResponse::new(UserResponse::from_user(user, true))))
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<UpdatePasswordRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let token = auth_service(&state)
        .update_password(auth.id, &body.current_password, &body.new_password)
        .await?;
    Ok(token_response(&state, jar, token))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<DataResponse<&'static str>>, AppError> {
    auth_service(&state).forgot_password(&body.email).await?;
    Ok(Json(DataResponse::new("Email sent")))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<ResetPasswordRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let token = auth_service(&state)
        .reset_password(&reset_token, &body.password)
        .await?;
    Ok(token_response(&state, jar, token))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Path(verification_token): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_service(&state).verify_email(&verification_token).await?;
    Ok(Json(MessageResponse::new("Email verified successfully")))
}

/// Sign in with a Google or Facebook profile
pub async fn social_login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<SocialAuthRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let token = auth_service(&state).social_login(&provider, body).await?;
    Ok(token_response(&state, jar, token))
}
