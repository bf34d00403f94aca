//! Member management.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use onandhome_core::UserId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::ApiResponse;
use crate::models::user::User;
use crate::services::BulkResult;
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    pub kw: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDelete {
    pub ids: Vec<UserId>,
}

/// Members matching a keyword on login id, name or email.
///
/// GET /api/admin/users?kw=
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<KeywordQuery>,
) -> Result<Json<Vec<User>>> {
    let users = AuthService::new(state.pool())
        .search_users(query.kw.as_deref())
        .await?;
    Ok(Json(users))
}

/// GET /api/admin/users/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<User>> {
    Ok(Json(AuthService::new(state.pool()).get_user(id).await?))
}

/// Withdraw a member, archiving the account.
///
/// DELETE /api/admin/users/{id}
#[instrument(skip(state, admin), fields(admin = %admin.login_id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::new(state.pool()).withdraw(id).await?;
    state.products().invalidate_all().await;
    Ok(Json(ApiResponse::message("회원이 탈퇴 처리되었습니다.")))
}

/// Withdraw several members. Failures are counted, not fatal.
///
/// POST /api/admin/users/delete
#[instrument(skip(state, admin, request), fields(admin = %admin.login_id, count = request.ids.len()))]
pub async fn delete_many(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<BulkDelete>,
) -> Result<Json<ApiResponse<BulkResult>>> {
    let result = AuthService::new(state.pool())
        .withdraw_many(&request.ids)
        .await;
    state.products().invalidate_all().await;
    Ok(Json(ApiResponse::ok(
        format!("{}명 탈퇴 처리, {}명 실패", result.success_count, result.fail_count),
        result,
    )))
}
