//! Order management.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use onandhome_core::{OrderId, OrderStatus};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::ApiResponse;
use crate::models::order::OrderDetail;
use crate::services::orders::OrderService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    pub kw: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
}

/// Orders matching a keyword on order number, orderer or recipient.
///
/// GET /api/admin/orders?kw=
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<KeywordQuery>,
) -> Result<Json<Vec<OrderDetail>>> {
    let orders = OrderService::new(state.pool(), state.hub())
        .search(query.kw.as_deref())
        .await?;
    Ok(Json(orders))
}

/// GET /api/admin/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let order = OrderService::new(state.pool(), state.hub())
        .get_any(id)
        .await?;
    Ok(Json(order))
}

/// Move an order along its lifecycle. Canceling restores stock.
///
/// PUT /api/admin/orders/{id}/status
#[instrument(skip(state, admin, change), fields(admin = %admin.login_id, status = %change.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(change): Json<StatusChange>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    let order = OrderService::new(state.pool(), state.hub())
        .update_status(id, change.status)
        .await?;
    if change.status == OrderStatus::Canceled {
        state.products().invalidate_all().await;
    }
    Ok(Json(ApiResponse::ok("주문 상태가 변경되었습니다.", order)))
}

/// Confirm a bank-transfer deposit.
///
/// POST /api/admin/orders/{id}/confirm-payment
#[instrument(skip(state, admin), fields(admin = %admin.login_id))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    let order = OrderService::new(state.pool(), state.hub())
        .confirm_payment(id)
        .await?;
    Ok(Json(ApiResponse::ok("입금이 확인되었습니다.", order)))
}
