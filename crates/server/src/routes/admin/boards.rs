//! Review and Q&A moderation lists.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::qna::QnaDetail;
use crate::models::review::ReviewDetail;
use crate::services::qna::QnaService;
use crate::services::reviews::ReviewService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    pub kw: Option<String>,
}

/// GET /api/admin/reviews?kw=
pub async fn reviews(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<KeywordQuery>,
) -> Result<Json<Vec<ReviewDetail>>> {
    let reviews = ReviewService::new(state.pool(), state.hub())
        .search(query.kw.as_deref())
        .await?;
    Ok(Json(reviews))
}

/// Every question, secret ones included.
///
/// GET /api/admin/qna?kw=
pub async fn qna(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<KeywordQuery>,
) -> Result<Json<Vec<QnaDetail>>> {
    let qnas = QnaService::new(state.pool(), state.hub())
        .search(query.kw.as_deref(), Some((admin.id, admin.role)))
        .await?;
    Ok(Json(qnas))
}
