//! Post Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::notifier;
use crate::application::dto::request::{CreatePostRequest, UpdatePostRequest};
use crate::application::dto::response::{empty_data, DataResponse, EmptyData, ListResponse};
use crate::application::services::{PostService, PostServiceImpl};
use crate::domain::{Post, DEFAULT_LIMIT};
use crate::infrastructure::repositories::{
    PgCategoryRepository, PgNotificationRepository, PgPostRepository, PgThreadRepository,
    PgUserRepository,
};
use crate::presentation::http::extractors::{path_id, MaybeAuthUser, QueryParams, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

type Service = PostServiceImpl<
    PgPostRepository,
    PgThreadRepository,
    PgCategoryRepository,
    PgUserRepository,
    PgNotificationRepository,
>;

fn post_service(state: &AppState) -> Service {
    PostServiceImpl::new(
        Arc::new(PgPostRepository::new(state.db.clone())),
        Arc::new(PgThreadRepository::new(state.db.clone())),
        Arc::new(PgCategoryRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        notifier(state),
        state.publisher(),
        state.snowflake.clone(),
    )
}

fn post_id(raw: &str) -> Result<i64, AppError> {
    path_id(raw, "Post")
}

pub async fn list_posts(
    State(state): State<AppState>,
    query: QueryParams,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let page = query.page(DEFAULT_LIMIT);
    let posts = post_service(&state).list(page).await?;
    Ok(Json(ListResponse::paged(posts, page)))
}

pub async fn search_posts(
    State(state): State<AppState>,
    query: QueryParams,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let page = query.page(DEFAULT_LIMIT);
    let posts = post_service(&state)
        .search(query.search_query(), page)
        .await?;
    Ok(Json(ListResponse::paged(posts, page)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    viewer: MaybeAuthUser,
) -> Result<Json<DataResponse<Post>>, AppError> {
    let post = post_service(&state)
        .get(post_id(&raw_id)?, viewer.actor().as_ref())
        .await?;
    Ok(Json(DataResponse::new(post)))
}

/// Reply to a thread
pub async fn create_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<DataResponse<Post>>), AppError> {
    let post = post_service(&state).create(&auth.actor(), body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(post))))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdatePostRequest>,
) -> Result<Json<DataResponse<Post>>, AppError> {
    let post = post_service(&state)
        .update(&auth.actor(), post_id(&raw_id)?, body.content)
        .await?;
    Ok(Json(DataResponse::new(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<EmptyData>, AppError> {
    post_service(&state)
        .delete(&auth.actor(), post_id(&raw_id)?)
        .await?;
    Ok(Json(empty_data()))
}

/// Add or remove the caller's like
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<DataResponse<Post>>, AppError> {
    let post = post_service(&state)
        .toggle_like(&auth.actor(), post_id(&raw_id)?)
        .await?;
    Ok(Json(DataResponse::new(post)))
}
