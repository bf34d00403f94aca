//! Product question routes. Private questions are masked for other viewers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use onandhome_core::{ProductId, QnaId, UserId, UserRole};

use crate::error::Result;
use crate::middleware::{AuthUser, OptionalAuth, RequireAdmin, RequireAuth};
use crate::models::ApiResponse;
use crate::models::qna::{QnaDetail, QnaReply};
use crate::services::qna::{QnaRequest, QnaService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    pub kw: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub content: String,
}

const DEFAULT_RECENT: i64 = 10;

fn viewer(user: Option<AuthUser>) -> Option<(UserId, UserRole)> {
    user.map(|u| (u.id, u.role))
}

/// Questions about a product.
///
/// GET /api/qna/product/{productId}
pub async fn for_product(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Vec<QnaDetail>>> {
    let questions = QnaService::new(state.pool(), state.hub())
        .for_product(product_id, viewer(user))
        .await?;
    Ok(Json(questions))
}

/// One question.
///
/// GET /api/qna/{id}
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<QnaId>,
) -> Result<Json<QnaDetail>> {
    let question = QnaService::new(state.pool(), state.hub())
        .get(id, viewer(user))
        .await?;
    Ok(Json(question))
}

/// Newest questions.
///
/// GET /api/qna/recent?limit=
pub async fn recent(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<QnaDetail>>> {
    let questions = QnaService::new(state.pool(), state.hub())
        .recent(query.limit.unwrap_or(DEFAULT_RECENT), viewer(user))
        .await?;
    Ok(Json(questions))
}

/// The caller's questions.
///
/// GET /api/qna/my
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<QnaDetail>>> {
    let questions = QnaService::new(state.pool(), state.hub())
        .mine(user.id, user.role)
        .await?;
    Ok(Json(questions))
}

/// Keyword search over title, question and writer.
///
/// GET /api/qna/search?kw=
pub async fn search(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<KeywordQuery>,
) -> Result<Json<Vec<QnaDetail>>> {
    let questions = QnaService::new(state.pool(), state.hub())
        .search(query.kw.as_deref(), viewer(user))
        .await?;
    Ok(Json(questions))
}

/// Ask a question.
///
/// POST /api/qna
#[instrument(skip(state, user, request), fields(user_id = %user.login_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<QnaRequest>,
) -> Result<Json<ApiResponse<QnaDetail>>> {
    let question = QnaService::new(state.pool(), state.hub())
        .create(user.id, &request)
        .await?;
    Ok(Json(ApiResponse::ok("문의가 등록되었습니다.", question)))
}

/// Edit a question as its writer or an admin.
///
/// PUT /api/qna/{id}
#[instrument(skip(state, user, request), fields(user_id = %user.login_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<QnaId>,
    Json(request): Json<QnaRequest>,
) -> Result<Json<ApiResponse<QnaDetail>>> {
    let question = QnaService::new(state.pool(), state.hub())
        .update(user.actor(), id, &request)
        .await?;
    Ok(Json(ApiResponse::ok("문의가 수정되었습니다.", question)))
}

/// Delete a question as its writer or an admin.
///
/// DELETE /api/qna/{id}
#[instrument(skip(state, user), fields(user_id = %user.login_id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<QnaId>,
) -> Result<Json<ApiResponse<()>>> {
    QnaService::new(state.pool(), state.hub())
        .delete(user.actor(), id)
        .await?;
    Ok(Json(ApiResponse::message("문의가 삭제되었습니다.")))
}

/// Answer a question.
///
/// POST /api/qna/{id}/replies
#[instrument(skip(state, admin, request), fields(admin = %admin.login_id))]
pub async fn add_reply(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<QnaId>,
    Json(request): Json<ReplyRequest>,
) -> Result<Json<ApiResponse<QnaReply>>> {
    let reply = QnaService::new(state.pool(), state.hub())
        .add_reply(admin.id, id, &request.content)
        .await?;
    Ok(Json(ApiResponse::ok("답변이 등록되었습니다.", reply)))
}
