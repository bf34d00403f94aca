//! Advertisement management and broadcast.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use onandhome_core::AdvertisementId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::ApiResponse;
use crate::models::advertisement::{Advertisement, AdvertisementInput};
use crate::services::advertisements::AdvertisementService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub recipient_count: u64,
}

/// GET /api/admin/advertisements
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Advertisement>>> {
    let ads = AdvertisementService::new(state.pool(), state.hub())
        .list()
        .await?;
    Ok(Json(ads))
}

/// GET /api/admin/advertisements/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<AdvertisementId>,
) -> Result<Json<Advertisement>> {
    let ad = AdvertisementService::new(state.pool(), state.hub())
        .get(id)
        .await?;
    Ok(Json(ad))
}

/// POST /api/admin/advertisements
#[instrument(skip(state, admin, input), fields(admin = %admin.login_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<AdvertisementInput>,
) -> Result<Json<ApiResponse<Advertisement>>> {
    let ad = AdvertisementService::new(state.pool(), state.hub())
        .create(&input)
        .await?;
    Ok(Json(ApiResponse::ok("광고가 등록되었습니다.", ad)))
}

/// PUT /api/admin/advertisements/{id}
#[instrument(skip(state, admin, input), fields(admin = %admin.login_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<AdvertisementId>,
    Json(input): Json<AdvertisementInput>,
) -> Result<Json<ApiResponse<Advertisement>>> {
    let ad = AdvertisementService::new(state.pool(), state.hub())
        .update(id, &input)
        .await?;
    Ok(Json(ApiResponse::ok("광고가 수정되었습니다.", ad)))
}

/// DELETE /api/admin/advertisements/{id}
#[instrument(skip(state, admin), fields(admin = %admin.login_id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<AdvertisementId>,
) -> Result<Json<ApiResponse<()>>> {
    AdvertisementService::new(state.pool(), state.hub())
        .delete(id)
        .await?;
    Ok(Json(ApiResponse::message("광고가 삭제되었습니다.")))
}

/// Push an advertisement to every member who consented to marketing.
///
/// POST /api/admin/advertisements/{id}/send
#[instrument(skip(state, admin), fields(admin = %admin.login_id))]
pub async fn send(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<AdvertisementId>,
) -> Result<Json<ApiResponse<SendResult>>> {
    let recipient_count = AdvertisementService::new(state.pool(), state.hub())
        .send(id)
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("{recipient_count}명에게 광고를 발송했습니다."),
        SendResult { recipient_count },
    )))
}
