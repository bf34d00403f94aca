//! Review routes. Reads are public, writes need a login, replies need an admin.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use onandhome_core::{ProductId, ReviewId, ReviewReplyId};

use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAdmin, RequireAuth};
use crate::models::ApiResponse;
use crate::models::review::{LikeToggle, ReviewDetail, ReviewReply};
use crate::services::reviews::{ReviewRequest, ReviewService};
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

/// Reviews of a product, with `likedByMe` for a logged-in viewer.
///
/// GET /api/reviews/product/{productId}
pub async fn for_product(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Vec<ReviewDetail>>> {
    let reviews = ReviewService::new(state.pool(), state.hub())
        .for_product(product_id, viewer.map(|v| v.id))
        .await?;
    Ok(Json(reviews))
}

/// One review.
///
/// GET /api/reviews/{id}
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<ReviewId>,
) -> Result<Json<ReviewDetail>> {
    let review = ReviewService::new(state.pool(), state.hub())
        .get(id, viewer.map(|v| v.id))
        .await?;
    Ok(Json(review))
}

/// Newest reviews across the catalog.
///
/// GET /api/reviews/recent?limit=
pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<ReviewDetail>>> {
    let reviews = ReviewService::new(state.pool(), state.hub())
        .recent(query.limit.unwrap_or(DEFAULT_RECENT))
        .await?;
    Ok(Json(reviews))
}

/// The caller's reviews.
///
/// GET /api/reviews/my
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ReviewDetail>>> {
    let reviews = ReviewService::new(state.pool(), state.hub())
        .mine(user.id)
        .await?;
    Ok(Json(reviews))
}

/// Keyword search over content, author and product name.
///
/// GET /api/reviews/search?kw=
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> Result<Json<Vec<ReviewDetail>>> {
    let reviews = ReviewService::new(state.pool(), state.hub())
        .search(query.kw.as_deref())
        .await?;
    Ok(Json(reviews))
}

/// Write a review.
///
/// POST /api/reviews
#[instrument(skip(state, user, request), fields(user_id = %user.login_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<ReviewDetail>>> {
    let review = ReviewService::new(state.pool(), state.hub())
        .create(user.id, &request)
        .await?;
    state.products().invalidate(review.review.product_id).await;
    Ok(Json(ApiResponse::ok("리뷰가 등록되었습니다.", review)))
}

/// Edit the caller's review.
///
/// PUT /api/reviews/{id}
#[instrument(skip(state, user, request), fields(user_id = %user.login_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ReviewId>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<ReviewDetail>>> {
    let review = ReviewService::new(state.pool(), state.hub())
        .update(user.id, id, &request)
        .await?;
    state.products().invalidate(review.review.product_id).await;
    Ok(Json(ApiResponse::ok("리뷰가 수정되었습니다.", review)))
}

/// Delete a review as its author or an admin.
///
/// DELETE /api/reviews/{id}
#[instrument(skip(state, user), fields(user_id = %user.login_id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ReviewId>,
) -> Result<Json<ApiResponse<()>>> {
    ReviewService::new(state.pool(), state.hub())
        .delete(user.actor(), id)
        .await?;
    state.products().invalidate_all().await;
    Ok(Json(ApiResponse::message("리뷰가 삭제되었습니다.")))
}

/// Like or unlike a review.
///
/// POST /api/reviews/{id}/like
pub async fn toggle_like(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ReviewId>,
) -> Result<Json<LikeToggle>> {
    let toggle = ReviewService::new(state.pool(), state.hub())
        .toggle_like(user.id, id)
        .await?;
    Ok(Json(toggle))
}

/// Answer a review.
///
/// POST /api/reviews/{id}/replies
#[instrument(skip(state, admin, request), fields(admin = %admin.login_id))]
pub async fn add_reply(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReviewId>,
    Json(request): Json<ReplyRequest>,
) -> Result<Json<ApiResponse<ReviewReply>>> {
    let reply = ReviewService::new(state.pool(), state.hub())
        .add_reply(admin.id, id, &request.content)
        .await?;
    Ok(Json(ApiResponse::ok("답글이 등록되었습니다.", reply)))
}

/// Delete a reply.
///
/// DELETE /api/reviews/replies/{replyId}
pub async fn delete_reply(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ReviewReplyId>,
) -> Result<Json<ApiResponse<()>>> {
    ReviewService::new(state.pool(), state.hub())
        .delete_reply(id)
        .await?;
    Ok(Json(ApiResponse::message("답글이 삭제되었습니다.")))
}
