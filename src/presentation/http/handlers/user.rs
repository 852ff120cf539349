//! User Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::application::dto::request::UpdateUserRequest;
use crate::application::dto::response::{
    empty_data, DataResponse, EmptyData, ListResponse, UserResponse,
};
use crate::application::services::{UserService, UserServiceImpl};
use crate::domain::{Post, Thread, DEFAULT_LIMIT};
use crate::infrastructure::repositories::{PgPostRepository, PgThreadRepository, PgUserRepository};
use crate::presentation::http::extractors::{path_id, MaybeAuthUser, QueryParams, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

type Service = UserServiceImpl<PgUserRepository, PgThreadRepository, PgPostRepository>;

fn user_service(state: &AppState) -> Service {
    UserServiceImpl::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgThreadRepository::new(state.db.clone())),
        Arc::new(PgPostRepository::new(state.db.clone())),
    )
}

/// Emails are shown to their owner and to admins.
fn can_see_email(viewer: Option<&AuthUser>, user_id: i64) -> bool {
    viewer.is_some_and(|v| v.id == user_id || v.role.is_admin())
}

fn user_id(raw: &str) -> Result<i64, AppError> {
    path_id(raw, "User")
}

/// List users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    query: QueryParams,
) -> Result<Json<ListResponse<UserResponse>>, AppError> {
    let page = query.page(DEFAULT_LIMIT);
    let users = user_service(&state).list(page).await?;
    Ok(Json(ListResponse::paged(
        users.map(|u| UserResponse::from_user(u, true)),
        page,
    )))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    MaybeAuthUser(viewer): MaybeAuthUser,
) -> Result<Json<DataResponse<UserResponse>>, AppError> {
    let user = user_service(&state).get_by_id(user_id(&raw_id)?).await?;
    let include_email = can_see_email(viewer.as_ref(), user.id);
    Ok(Json(DataResponse::new(UserResponse::from_user(
        user,
        include_email,
    ))))
}

pub async fn get_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
    MaybeAuthUser(viewer): MaybeAuthUser,
) -> Result<Json<DataResponse<UserResponse>>, AppError> {
    let user = user_service(&state).get_by_username(&username).await?;
    let include_email = can_see_email(viewer.as_ref(), user.id);
    Ok(Json(DataResponse::new(UserResponse::from_user(
        user,
        include_email,
    ))))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<DataResponse<UserResponse>>, AppError> {
    let user = user_service(&state)
        .update(&auth.actor(), user_id(&raw_id)?, body)
        .await?;
    let include_email = can_see_email(Some(&auth), user.id);
    Ok(Json(DataResponse::new(UserResponse::from_user(
        user,
        include_email,
    ))))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<EmptyData>, AppError> {
    user_service(&state)
        .delete(&auth.actor(), user_id(&raw_id)?)
        .await?;
    Ok(Json(empty_data()))
}

pub async fn get_user_threads(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: QueryParams,
) -> Result<Json<ListResponse<Thread>>, AppError> {
    let page = query.page(DEFAULT_LIMIT);
    let threads = user_service(&state)
        .threads_of(user_id(&raw_id)?, page)
        .await?;
    Ok(Json(ListResponse::paged(threads, page)))
}

pub async fn get_user_posts(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: QueryParams,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let page = query.page(DEFAULT_LIMIT);
    let posts = user_service(&state).posts_of(user_id(&raw_id)?, page).await?;
    Ok(Json(ListResponse::paged(posts, page)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn viewer(id: i64, role: Role) -> AuthUser {
        AuthUser {
            id,
            username: format!("user{}", id),
            avatar: "default-avatar.png".into(),
            role,
        }
    }

    #[test]
    fn test_email_visibility() {
        assert!(can_see_email(Some(&viewer(7, Role::User)), 7));
        assert!(can_see_email(Some(&viewer(1, Role::Admin)), 7));
        assert!(!can_see_email(Some(&viewer(2, Role::Moderator)), 7));
        assert!(!can_see_email(None, 7));
    }
}
