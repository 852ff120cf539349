//! Ad Placement Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{CreateAdRequest, UpdateAdRequest};
use crate::application::dto::response::{
    empty_data, AdStatsResponse, DataResponse, EmptyData, ListResponse,
};
use crate::application::services::{AdService, AdServiceImpl};
use crate::domain::AdPlacement;
use crate::infrastructure::repositories::PgAdRepository;
use crate::presentation::http::extractors::{path_id, ValidatedJson};
use crate::shared::error::AppError;
use crate::startup::AppState;

fn ad_service(state: &AppState) -> AdServiceImpl<PgAdRepository> {
    AdServiceImpl::new(
        Arc::new(PgAdRepository::new(state.db.clone())),
        state.snowflake.clone(),
    )
}

fn ad_id(raw: &str) -> Result<i64, AppError> {
    path_id(raw, "Ad")
}

/// Ads currently live
pub async fn list_active_ads(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<AdPlacement>>, AppError> {
    let ads = ad_service(&state).list_active(None).await?;
    Ok(Json(ListResponse::all(ads)))
}

pub async fn list_ads_by_location(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<Json<ListResponse<AdPlacement>>, AppError> {
    let ads = ad_service(&state).list_active(Some(&location)).await?;
    Ok(Json(ListResponse::all(ads)))
}

pub async fn record_impression(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<EmptyData>, AppError> {
    ad_service(&state).record_impression(ad_id(&raw_id)?).await?;
    Ok(Json(empty_data()))
}

pub async fn record_click(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<EmptyData>, AppError> {
    ad_service(&state).record_click(ad_id(&raw_id)?).await?;
    Ok(Json(empty_data()))
}

/// Totals and per-location breakdown (admin)
pub async fn ad_stats(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<AdStatsResponse>>, AppError> {
    let stats = ad_service(&state).stats().await?;
    Ok(Json(DataResponse::new(stats.into())))
}

pub async fn get_ad(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<DataResponse<AdPlacement>>, AppError> {
    let ad = ad_service(&state).get(ad_id(&raw_id)?).await?;
    Ok(Json(DataResponse::new(ad)))
}

pub async fn create_ad(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CreateAdRequest>,
) -> Result<(StatusCode, Json<DataResponse<AdPlacement>>), AppError> {
    let ad = ad_service(&state).create(body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(ad))))
}

pub async fn update_ad(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateAdRequest>,
) -> Result<Json<DataResponse<AdPlacement>>, AppError> {
    let ad = ad_service(&state).update(ad_id(&raw_id)?, body).await?;
    Ok(Json(DataResponse::new(ad)))
}

pub async fn delete_ad(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<EmptyData>, AppError> {
    ad_service(&state).delete(ad_id(&raw_id)?).await?;
    Ok(Json(empty_data()))
}
