//! Notification inbox routes and the admin bulk send.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use onandhome_core::{NotificationId, NotificationType};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::ApiResponse;
use crate::models::notification::{NewNotification, Notification};
use crate::services::notifications::NotificationService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub count: i64,
}

/// Body of `POST /api/notifications/admin/bulk`.
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
}

/// The caller's notifications, newest first.
///
/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>> {
    let notifications = NotificationService::new(state.pool(), state.hub())
        .list(user.id, query.unread_only)
        .await?;
    Ok(Json(notifications))
}

/// Number of unread notifications.
///
/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UnreadCount>> {
    let count = NotificationService::new(state.pool(), state.hub())
        .unread_count(user.id)
        .await?;
    Ok(Json(UnreadCount { count }))
}

/// Mark one notification read.
///
/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NotificationId>,
) -> Result<Json<ApiResponse<()>>> {
    NotificationService::new(state.pool(), state.hub())
        .mark_read(user.id, id)
        .await?;
    Ok(Json(ApiResponse::message("읽음 처리되었습니다.")))
}

/// Mark every notification read.
///
/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<u64>>> {
    let updated = NotificationService::new(state.pool(), state.hub())
        .mark_all_read(user.id)
        .await?;
    Ok(Json(ApiResponse::ok("모두 읽음 처리되었습니다.", updated)))
}

/// Delete one of the caller's notifications.
///
/// DELETE /api/notifications/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NotificationId>,
) -> Result<Json<ApiResponse<()>>> {
    NotificationService::new(state.pool(), state.hub())
        .delete(user.id, id)
        .await?;
    Ok(Json(ApiResponse::message("알림이 삭제되었습니다.")))
}

/// Send a notification to the bulk audience of its type. Admin-feed kinds
/// go to the admins instead.
///
/// POST /api/notifications/admin/bulk
#[instrument(skip(state, admin, request), fields(admin = %admin.login_id, kind = %request.kind))]
pub async fn bulk(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<BulkRequest>,
) -> Result<Json<ApiResponse<u64>>> {
    if request.title.trim().is_empty() {
        return Err(AppError::BadRequest("알림 제목을 입력해주세요.".to_string()));
    }

    let notification = NewNotification::new(request.kind, request.title.trim(), request.content);
    let service = NotificationService::new(state.pool(), state.hub());
    let sent = if request.kind.is_admin_feed() {
        service.notify_admins(notification, None).await?
    } else {
        service.notify_audience(notification).await?
    };
    Ok(Json(ApiResponse::ok(
        format!("{sent}명에게 알림을 발송했습니다."),
        sent,
    )))
}
