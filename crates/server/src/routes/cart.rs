//! Cart routes. Every route requires a logged-in user.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use onandhome_core::cart::CartSummary;
use onandhome_core::{CartItemId, ProductId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::ApiResponse;
use crate::models::cart::CartView;
use crate::services::cart::CartService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

const fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    #[serde(default)]
    pub selected_ids: Vec<CartItemId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Added {
    pub cart_item_id: CartItemId,
}

/// Cart lines with every line selected.
///
/// GET /api/cart
pub async fn show(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<CartView>> {
    Ok(Json(CartService::new(state.pool()).view(user.id).await?))
}

/// Number of lines in the cart.
///
/// GET /api/cart/count
pub async fn count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CountResponse>> {
    let count = CartService::new(state.pool()).count(user.id).await?;
    Ok(Json(CountResponse { count }))
}

/// Add a product, merging into an existing line.
///
/// POST /api/cart/add
#[instrument(skip(state, user), fields(user_id = %user.login_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<AddRequest>,
) -> Result<Json<ApiResponse<Added>>> {
    let cart_item_id = CartService::new(state.pool())
        .add(user.id, request.product_id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::ok(
        "장바구니에 추가되었습니다.",
        Added { cart_item_id },
    )))
}

/// Set a line's quantity.
///
/// PUT /api/cart/{cartItemId}
#[instrument(skip(state, user), fields(user_id = %user.login_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CartItemId>,
    Json(request): Json<QuantityRequest>,
) -> Result<Json<ApiResponse<()>>> {
    CartService::new(state.pool())
        .update_quantity(user.id, id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::message("수량이 변경되었습니다.")))
}

/// Remove one line.
///
/// DELETE /api/cart/{cartItemId}
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CartItemId>,
) -> Result<Json<ApiResponse<()>>> {
    CartService::new(state.pool()).remove(user.id, id).await?;
    Ok(Json(ApiResponse::message("삭제되었습니다.")))
}

/// Empty the cart.
///
/// DELETE /api/cart/clear/all
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<u64>>> {
    let removed = CartService::new(state.pool()).clear(user.id).await?;
    Ok(Json(ApiResponse::ok("장바구니를 비웠습니다.", removed)))
}

/// Totals for an explicit selection.
///
/// POST /api/cart/summary
pub async fn summary(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<CartSummary>> {
    let summary = CartService::new(state.pool())
        .summary(user.id, &request.selected_ids)
        .await?;
    Ok(Json(summary))
}
