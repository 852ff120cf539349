//! Authentication Middleware
//!
//! JWT validation for protected routes plus the admin and staff role gates.
//! The token comes from `Authorization: Bearer` or, failing that, from the
//! `token` cookie set at login.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::domain::services::Actor;
use crate::domain::{Role, User, UserRepository};
use crate::infrastructure::repositories::PgUserRepository;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Name of the session cookie.
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated user extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub avatar: String,
    pub role: Role,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            username: self.username.clone(),
            avatar: self.avatar.clone(),
            role: self.role,
        }
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
        }
    }
}

fn not_authorized() -> AppError {
    AppError::Unauthorized("Not authorized to access this route".into())
}

/// Bearer token first, then the session cookie. A logged-out cookie holds `none`.
fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty() && v != "none")
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = token_from_headers(headers).ok_or_else(not_authorized)?;
    let user_id = state.tokens.verify(&token).map_err(|_| not_authorized())?;

    let user = PgUserRepository::new(state.db.clone())
        .find_by_id(user_id)
        .await?
        .ok_or_else(not_authorized)?;

    Ok(AuthUser::from(&user))
}

/// Reject the request unless it carries a valid token for an existing user.
pub async fn protect(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Attach the user when a valid token is present, otherwise continue anonymously.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if token_from_headers(request.headers()).is_some() {
        match authenticate(&state, request.headers()).await {
            Ok(user) => {
                request.extensions_mut().insert(user);
            }
            Err(AppError::Unauthorized(_)) => {}
            Err(e) => tracing::warn!(error = %e, "Optional authentication failed"),
        }
    }

    next.run(request).await
}

fn authorize(request: &Request, allowed: &[Role]) -> Result<(), AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(not_authorized)?;

    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "User role {} is not authorized to access this route",
            user.role
        )))
    }
}

/// Admins only. Must run after [`protect`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    authorize(&request, &[Role::Admin])?;
    Ok(next.run(request).await)
}

/// Moderators and admins. Must run after [`protect`].
pub async fn require_staff(request: Request, next: Next) -> Result<Response, AppError> {
    authorize(&request, &[Role::Moderator, Role::Admin])?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, HeaderValue, StatusCode},
        middleware::from_fn,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_bearer_wins_over_cookie() {
        let map = headers(&[
            (AUTHORIZATION, "Bearer abc.def.ghi"),
            (header::COOKIE, "token=cookie.token"),
        ]);
        assert_eq!(token_from_headers(&map).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_cookie_fallback() {
        let map = headers(&[(header::COOKIE, "lang=es; token=cookie.token")]);
        assert_eq!(token_from_headers(&map).as_deref(), Some("cookie.token"));
    }

    #[test]
    fn test_logged_out_cookie_ignored() {
        let map = headers(&[(header::COOKIE, "token=none")]);
        assert!(token_from_headers(&map).is_none());
        assert!(token_from_headers(&HeaderMap::new()).is_none());
    }

    fn gated(role: Option<Role>) -> Router {
        let router = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn(require_staff));
        match role {
            Some(role) => router.layer(Extension(AuthUser {
                id: 1,
                username: "hincha".into(),
                avatar: "default-avatar.png".into(),
                role,
            })),
            None => router,
        }
    }

    async fn status_for(role: Option<Role>) -> StatusCode {
        gated(role)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_staff_gate() {
        assert_eq!(status_for(Some(Role::Moderator)).await, StatusCode::OK);
        assert_eq!(status_for(Some(Role::User)).await, StatusCode::FORBIDDEN);
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }
}
