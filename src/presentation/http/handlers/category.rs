//! Category Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    CreateCategoryRequest, ReorderCategoriesRequest, UpdateCategoryRequest,
};
use crate::application::dto::response::{empty_data, DataResponse, EmptyData, ListResponse};
use crate::application::services::{CategoryService, CategoryServiceImpl};
use crate::domain::{Category, Thread, DEFAULT_LIMIT};
use crate::infrastructure::repositories::{PgCategoryRepository, PgThreadRepository};
use crate::presentation::http::extractors::{
    path_id, JsonBody, MaybeAuthUser, QueryParams, ValidatedJson,
};
use crate::shared::error::AppError;
use crate::startup::AppState;

fn category_service(state: &AppState) -> CategoryServiceImpl<PgCategoryRepository, PgThreadRepository> {
    CategoryServiceImpl::new(
        Arc::new(PgCategoryRepository::new(state.db.clone())),
        Arc::new(PgThreadRepository::new(state.db.clone())),
        state.snowflake.clone(),
    )
}

fn category_id(raw: &str) -> Result<i64, AppError> {
    path_id(raw, "Category")
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Category>>, AppError> {
    let categories = category_service(&state).list().await?;
    Ok(Json(ListResponse::all(categories)))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<DataResponse<Category>>, AppError> {
    let category = category_service(&state).get(category_id(&raw_id)?).await?;
    Ok(Json(DataResponse::new(category)))
}

/// Private categories need a caller with an allowed role
pub async fn get_category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    viewer: MaybeAuthUser,
) -> Result<Json<DataResponse<Category>>, AppError> {
    let category = category_service(&state)
        .get_by_slug(&slug, viewer.actor().as_ref())
        .await?;
    Ok(Json(DataResponse::new(category)))
}

pub async fn get_category_threads(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    viewer: MaybeAuthUser,
    query: QueryParams,
) -> Result<Json<ListResponse<Thread>>, AppError> {
    let page = query.page(DEFAULT_LIMIT);
    let threads = category_service(&state)
        .threads_of(category_id(&raw_id)?, viewer.actor().as_ref(), page)
        .await?;
    Ok(Json(ListResponse::paged(threads, page)))
}

/// Create category (admin)
pub async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<DataResponse<Category>>), AppError> {
    let category = category_service(&state).create(body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(category))))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateCategoryRequest>,
) -> Result<Json<DataResponse<Category>>, AppError> {
    let category = category_service(&state)
        .update(category_id(&raw_id)?, body)
        .await?;
    Ok(Json(DataResponse::new(category)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<EmptyData>, AppError> {
    category_service(&state)
        .delete(category_id(&raw_id)?)
        .await?;
    Ok(Json(empty_data()))
}

/// Apply a new ordering in one transaction (admin)
pub async fn reorder_categories(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ReorderCategoriesRequest>,
) -> Result<Json<ListResponse<Category>>, AppError> {
    let categories = category_service(&state).reorder(body).await?;
    Ok(Json(ListResponse::all(categories)))
}
