//! Shopper order routes. Every route requires a logged-in user.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use onandhome_core::{CartItemId, OrderId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::ApiResponse;
use crate::models::order::{OrderDetail, OrderTracking};
use crate::services::cart::CartService;
use crate::services::orders::{CheckoutDetails, CreateOrderRequest, OrderService};
use crate::state::AppState;

/// Body of `POST /api/orders/cart/create`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartOrderRequest {
    /// Lines to order. Empty means the whole cart.
    #[serde(default)]
    pub cart_item_ids: Vec<CartItemId>,
    #[serde(flatten)]
    pub details: CheckoutDetails,
}

/// Place an order for explicit lines.
///
/// POST /api/orders/create
#[instrument(skip(state, user, request), fields(user_id = %user.login_id, lines = request.order_items.len()))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    let order = OrderService::new(state.pool(), state.hub())
        .create(user.id, &request)
        .await?;
    state.products().invalidate_all().await;
    Ok(Json(ApiResponse::ok("주문이 완료되었습니다.", order)))
}

/// Order the selected cart lines and remove them from the cart.
///
/// POST /api/orders/cart/create
#[instrument(skip(state, user, request), fields(user_id = %user.login_id))]
pub async fn create_from_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CartOrderRequest>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    let checkout = CartService::new(state.pool())
        .checkout(user.id, &request.cart_item_ids)
        .await?;
    let order = OrderService::new(state.pool(), state.hub())
        .create_from_cart(
            user.id,
            &checkout.items,
            &request.details,
            &checkout.cart_item_ids,
        )
        .await?;
    state.products().invalidate_all().await;
    Ok(Json(ApiResponse::ok("주문이 완료되었습니다.", order)))
}

/// The caller's visible orders, newest first.
///
/// GET /api/orders/my
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderDetail>>> {
    let orders = OrderService::new(state.pool(), state.hub())
        .list_for_user(user.actor(), user.id)
        .await?;
    Ok(Json(orders))
}

/// Orders of one user, for that user or an admin.
///
/// GET /api/orders/user/{userId}
pub async fn for_user(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(owner): Path<UserId>,
) -> Result<Json<Vec<OrderDetail>>> {
    let orders = OrderService::new(state.pool(), state.hub())
        .list_for_user(user.actor(), owner)
        .await?;
    Ok(Json(orders))
}

/// One order, for its owner or an admin.
///
/// GET /api/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let order = OrderService::new(state.pool(), state.hub())
        .get(user.actor(), id)
        .await?;
    Ok(Json(order))
}

/// Status label of an order.
///
/// GET /api/orders/{id}/track
pub async fn track(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderTracking>> {
    let tracking = OrderService::new(state.pool(), state.hub())
        .track(user.actor(), id)
        .await?;
    Ok(Json(tracking))
}

/// Settle a bank-transfer order.
///
/// POST /api/orders/{id}/pay
#[instrument(skip(state, user), fields(user_id = %user.login_id))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    let order = OrderService::new(state.pool(), state.hub())
        .pay(user.actor(), id)
        .await?;
    Ok(Json(ApiResponse::ok("결제가 완료되었습니다.", order)))
}

/// Cancel an order and restore its stock.
///
/// POST /api/orders/{id}/cancel
#[instrument(skip(state, user), fields(user_id = %user.login_id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    let order = OrderService::new(state.pool(), state.hub())
        .cancel(user.actor(), id)
        .await?;
    state.products().invalidate_all().await;
    Ok(Json(ApiResponse::ok("주문이 취소되었습니다.", order)))
}

/// Hide an order from the owner's history.
///
/// POST /api/orders/{id}/hide
pub async fn hide(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<ApiResponse<()>>> {
    OrderService::new(state.pool(), state.hub())
        .set_hidden(user.actor(), id, true)
        .await?;
    Ok(Json(ApiResponse::message("주문 내역이 숨겨졌습니다.")))
}

/// Show a hidden order again.
///
/// POST /api/orders/{id}/unhide
pub async fn unhide(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<ApiResponse<()>>> {
    OrderService::new(state.pool(), state.hub())
        .set_hidden(user.actor(), id, false)
        .await?;
    Ok(Json(ApiResponse::message("주문 내역이 다시 표시됩니다.")))
}
