//! Notice board routes. Reads are public, writes are admin only.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use onandhome_core::NoticeId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::ApiResponse;
use crate::models::notice::Notice;
use crate::services::notices::{NoticeRequest, NoticeService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    pub kw: Option<String>,
}

const DEFAULT_RECENT: i64 = 5;

/// Every notice, newest first.
///
/// GET /api/notices
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Notice>>> {
    Ok(Json(NoticeService::new(state.pool(), state.hub()).list().await?))
}

/// One notice.
///
/// GET /api/notices/{id}
pub async fn show(State(state): State<AppState>, Path(id): Path<NoticeId>) -> Result<Json<Notice>> {
    Ok(Json(NoticeService::new(state.pool(), state.hub()).get(id).await?))
}

/// Latest notices for the home page.
///
/// GET /api/notices/recent?limit=
pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<Notice>>> {
    let notices = NoticeService::new(state.pool(), state.hub())
        .recent(query.limit.unwrap_or(DEFAULT_RECENT))
        .await?;
    Ok(Json(notices))
}

/// Keyword search over title and content.
///
/// GET /api/notices/search?kw=
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> Result<Json<Vec<Notice>>> {
    let notices = NoticeService::new(state.pool(), state.hub())
        .search(query.kw.as_deref())
        .await?;
    Ok(Json(notices))
}

/// Publish a notice and notify every eligible user.
///
/// POST /api/notices
#[instrument(skip(state, admin, request), fields(admin = %admin.login_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<NoticeRequest>,
) -> Result<Json<ApiResponse<Notice>>> {
    let notice = NoticeService::new(state.pool(), state.hub())
        .create(admin.id, &request)
        .await?;
    Ok(Json(ApiResponse::ok("공지사항이 등록되었습니다.", notice)))
}

/// Edit a notice.
///
/// PUT /api/notices/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<NoticeId>,
    Json(request): Json<NoticeRequest>,
) -> Result<Json<ApiResponse<Notice>>> {
    let notice = NoticeService::new(state.pool(), state.hub())
        .update(id, &request)
        .await?;
    Ok(Json(ApiResponse::ok("공지사항이 수정되었습니다.", notice)))
}

/// Delete a notice and its notifications.
///
/// DELETE /api/notices/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<NoticeId>,
) -> Result<Json<ApiResponse<()>>> {
    NoticeService::new(state.pool(), state.hub())
        .delete(id)
        .await?;
    Ok(Json(ApiResponse::message("공지사항이 삭제되었습니다.")))
}
