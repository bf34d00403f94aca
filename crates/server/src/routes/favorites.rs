//! Wishlist routes. Product counts are public, everything else needs a login.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use onandhome_core::ProductId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::ApiResponse;
use crate::models::favorite::{Favorite, FavoriteToggle};
use crate::services::favorites::FavoriteService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteCheck {
    pub favorited: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub count: i64,
}

/// The caller's favorites with product fields.
///
/// GET /api/favorites
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Favorite>>> {
    Ok(Json(FavoriteService::new(state.pool()).list(user.id).await?))
}

/// Add or remove a favorite.
///
/// POST /api/favorites/toggle
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<FavoriteToggle>> {
    let toggle = FavoriteService::new(state.pool())
        .toggle(user.id, request.product_id)
        .await?;
    Ok(Json(toggle))
}

/// Whether the caller has favorited a product.
///
/// GET /api/favorites/check/{productId}
pub async fn check(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<FavoriteCheck>> {
    let favorited = FavoriteService::new(state.pool())
        .is_favorite(user.id, product_id)
        .await?;
    Ok(Json(FavoriteCheck { favorited }))
}

/// How many users favorited a product.
///
/// GET /api/favorites/count/product/{productId}
pub async fn count_for_product(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CountResponse>> {
    let count = FavoriteService::new(state.pool())
        .count_for_product(product_id)
        .await?;
    Ok(Json(CountResponse { count }))
}

/// Size of the caller's wishlist.
///
/// GET /api/favorites/count
pub async fn count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CountResponse>> {
    let count = FavoriteService::new(state.pool()).count(user.id).await?;
    Ok(Json(CountResponse { count }))
}

/// Remove a product from the wishlist.
///
/// DELETE /api/favorites/product/{productId}
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ApiResponse<()>>> {
    FavoriteService::new(state.pool())
        .remove(user.id, product_id)
        .await?;
    Ok(Json(ApiResponse::message("관심상품에서 삭제되었습니다.")))
}
