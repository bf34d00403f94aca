//! Withdrawn-account archive.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use onandhome_core::InactiveUserId;

use super::users::KeywordQuery;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::ApiResponse;
use crate::models::user::InactiveUser;
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    #[serde(default)]
    pub ids: Vec<InactiveUserId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResult {
    pub deleted_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub success: bool,
    pub count: i64,
}

/// Archived accounts matching a keyword on login id, name or email.
///
/// GET /api/admin/inactive-users?kw=
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<KeywordQuery>,
) -> Result<Json<Vec<InactiveUser>>> {
    let users = AuthService::new(state.pool())
        .inactive_users(query.kw.as_deref())
        .await?;
    Ok(Json(users))
}

/// GET /api/admin/inactive-users/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<InactiveUserId>,
) -> Result<Json<InactiveUser>> {
    Ok(Json(AuthService::new(state.pool()).inactive_user(id).await?))
}

/// GET /api/admin/inactive-users/count
pub async fn count(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<CountResponse>> {
    let count = AuthService::new(state.pool())
        .count_inactive_users()
        .await?;
    Ok(Json(CountResponse {
        success: true,
        count,
    }))
}

/// Permanently delete one archived account.
///
/// DELETE /api/admin/inactive-users/{id}
#[instrument(skip(state, admin), fields(admin = %admin.login_id))]
pub async fn purge(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<InactiveUserId>,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::new(state.pool())
        .purge_inactive_user(id)
        .await?;
    Ok(Json(ApiResponse::message("탈퇴 회원이 영구 삭제되었습니다.")))
}

/// Permanently delete several archived accounts.
///
/// POST /api/admin/inactive-users/delete
#[instrument(skip(state, admin, request), fields(admin = %admin.login_id, count = request.ids.len()))]
pub async fn purge_many(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<PurgeRequest>,
) -> Result<Json<ApiResponse<PurgeResult>>> {
    if request.ids.is_empty() {
        return Err(AppError::BadRequest("삭제할 회원을 선택해주세요.".to_string()));
    }

    let deleted_count = AuthService::new(state.pool())
        .purge_inactive_users(&request.ids)
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("{deleted_count}명의 탈퇴 회원이 영구 삭제되었습니다."),
        PurgeResult { deleted_count },
    )))
}
