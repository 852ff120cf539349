//! Thread Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::notifier;
use crate::application::dto::request::{CreateThreadRequest, UpdateThreadRequest};
use crate::application::dto::response::{empty_data, DataResponse, EmptyData, ListResponse};
use crate::application::services::{ThreadService, ThreadServiceImpl};
use crate::domain::{Post, Thread, DEFAULT_LIMIT};
use crate::infrastructure::repositories::{
    PgCategoryRepository, PgNotificationRepository, PgPostRepository, PgThreadRepository,
    PgUserRepository,
};
use crate::presentation::http::extractors::{path_id, MaybeAuthUser, QueryParams, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

type Service = ThreadServiceImpl<
    PgThreadRepository,
    PgPostRepository,
    PgCategoryRepository,
    PgUserRepository,
    PgNotificationRepository,
>;

fn thread_service(state: &AppState) -> Service {
    ThreadServiceImpl::new(
        Arc::new(PgThreadRepository::new(state.db.clone())),
        Arc::new(PgPostRepository::new(state.db.clone())),
        Arc::new(PgCategoryRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        notifier(state),
        state.publisher(),
        state.snowflake.clone(),
    )
}

fn thread_id(raw: &str) -> Result<i64, AppError> {
    path_id(raw, "Thread")
}

pub async fn list_threads(
    State(state): State<AppState>,
    query: QueryParams,
) -> Result<Json<ListResponse<Thread>>, AppError> {
    let page = query.page(DEFAULT_LIMIT);
    let threads = thread_service(&state).list(page).await?;
    Ok(Json(ListResponse::paged(threads, page)))
}

/// Substring search on title and content
pub async fn search_threads(
    State(state): State<AppState>,
    query: QueryParams,
) -> Result<Json<ListResponse<Thread>>, AppError> {
    let page = query.page(DEFAULT_LIMIT);
    let threads = thread_service(&state)
        .search(query.search_query(), page)
        .await?;
    Ok(Json(ListResponse::paged(threads, page)))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    viewer: MaybeAuthUser,
) -> Result<Json<DataResponse<Thread>>, AppError> {
    let thread = thread_service(&state)
        .get(thread_id(&raw_id)?, viewer.actor().as_ref())
        .await?;
    Ok(Json(DataResponse::new(thread)))
}

pub async fn get_thread_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    viewer: MaybeAuthUser,
) -> Result<Json<DataResponse<Thread>>, AppError> {
    let thread = thread_service(&state)
        .get_by_slug(&slug, viewer.actor().as_ref())
        .await?;
    Ok(Json(DataResponse::new(thread)))
}

pub async fn get_thread_posts(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    viewer: MaybeAuthUser,
    query: QueryParams,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let page = query.page(DEFAULT_LIMIT);
    let posts = thread_service(&state)
        .posts_of(thread_id(&raw_id)?, viewer.actor().as_ref(), page)
        .await?;
    Ok(Json(ListResponse::paged(posts, page)))
}

/// Start a thread together with its opening post
pub async fn create_thread(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateThreadRequest>,
) -> Result<(StatusCode, Json<DataResponse<Thread>>), AppError> {
    let thread = thread_service(&state).create(&auth.actor(), body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(thread))))
}

pub async fn update_thread(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateThreadRequest>,
) -> Result<Json<DataResponse<Thread>>, AppError> {
    let thread = thread_service(&state)
        .update(&auth.actor(), thread_id(&raw_id)?, body)
        .await?;
    Ok(Json(DataResponse::new(thread)))
}

pub async fn delete_thread(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<EmptyData>, AppError> {
    thread_service(&state)
        .delete(&auth.actor(), thread_id(&raw_id)?)
        .await?;
    Ok(Json(empty_data()))
}

/// Toggle `isSticky` (staff)
pub async fn toggle_sticky(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<DataResponse<Thread>>, AppError> {
    let thread = thread_service(&state)
        .toggle_sticky(&auth.actor(), thread_id(&raw_id)?)
        .await?;
    Ok(Json(DataResponse::new(thread)))
}

/// Toggle `isLocked` (staff)
pub async fn toggle_lock(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<DataResponse<Thread>>, AppError> {
    let thread = thread_service(&state)
        .toggle_lock(&auth.actor(), thread_id(&raw_id)?)
        .await?;
    Ok(Json(DataResponse::new(thread)))
}
