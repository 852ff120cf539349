//! Notification Handlers
//!
//! Every route works on the caller's own inbox.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::application::dto::response::{
    empty_data, CountResponse, DataResponse, EmptyData, ListResponse,
};
use crate::application::services::{NotificationService, NotificationServiceImpl};
use crate::domain::{Notification, NOTIFICATION_LIMIT};
use crate::infrastructure::repositories::PgNotificationRepository;
use crate::presentation::http::extractors::{path_id, QueryParams};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

fn notification_service(state: &AppState) -> NotificationServiceImpl<PgNotificationRepository> {
    NotificationServiceImpl::new(Arc::new(PgNotificationRepository::new(state.db.clone())))
}

fn notification_id(raw: &str) -> Result<i64, AppError> {
    path_id(raw, "Notification")
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    query: QueryParams,
) -> Result<Json<ListResponse<Notification>>, AppError> {
    let page = query.page(NOTIFICATION_LIMIT);
    let notifications = notification_service(&state)
        .list(&auth.actor(), page)
        .await?;
    Ok(Json(ListResponse::paged(notifications, page)))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DataResponse<CountResponse>>, AppError> {
    let count = notification_service(&state)
        .unread_count(&auth.actor())
        .await?;
    Ok(Json(DataResponse::new(CountResponse { count })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<DataResponse<Notification>>, AppError> {
    let notification = notification_service(&state)
        .mark_read(&auth.actor(), notification_id(&raw_id)?)
        .await?;
    Ok(Json(DataResponse::new(notification)))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<EmptyData>, AppError> {
    notification_service(&state)
        .mark_all_read(&auth.actor())
        .await?;
    Ok(Json(empty_data()))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<EmptyData>, AppError> {
    notification_service(&state)
        .delete(&auth.actor(), notification_id(&raw_id)?)
        .await?;
    Ok(Json(empty_data()))
}

pub async fn delete_all_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<EmptyData>, AppError> {
    notification_service(&state)
        .delete_all(&auth.actor())
        .await?;
    Ok(Json(empty_data()))
}
