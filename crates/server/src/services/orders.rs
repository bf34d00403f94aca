//! Order service.
//!
//! Creation, payment, cancellation and admin status changes all run in one
//! `OrderTx`, so stock and order status always move together. Notifications
//! are sent after commit and never fail the request.

use std::collections::HashMap;

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use onandhome_core::cart::{CheckoutItem, effective_price};
use onandhome_core::order::{PricedLine, order_number, order_total, summarize_product_names};
use onandhome_core::{
    CartItemId, NotificationType, OrderId, OrderStatus, PaymentMethod, ProductId, ProductStatus,
    UserId,
};

use super::notifications::NotificationService;
use super::{Actor, ServiceError, or_not_found};
use crate::db::orders::{LockedOrder, LockedProduct, NewOrder, OrderRepository, OrderTx};
use crate::db::users::UserRepository;
use crate::models::notification::NewNotification;
use crate::models::order::{Order, OrderDetail, OrderItem, OrderTracking, ShippingInfo};
use crate::models::user::User;
use crate::realtime::{NotificationHub, PushMessage};

const ORDER_NOT_FOUND: &str = "주문을 찾을 수 없습니다.";

/// One requested line. Quantity is signed so bad input reaches validation.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Shipping and payment fields shared by both checkout paths.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDetails {
    pub payment_method: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_request: Option<String>,
}

impl CheckoutDetails {
    fn shipping(&self) -> ShippingInfo {
        ShippingInfo {
            recipient_name: self.recipient_name.clone(),
            recipient_phone: self.recipient_phone.clone(),
            shipping_address: self.shipping_address.clone(),
            shipping_request: self.shipping_request.clone(),
        }
    }
}

/// Body of `POST /api/orders/create`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_items: Vec<OrderLineRequest>,
    #[serde(flatten)]
    pub details: CheckoutDetails,
}

/// Validate requested lines and merge repeated products.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` for no lines or a quantity below one.
pub fn validate_lines(lines: &[OrderLineRequest]) -> Result<Vec<CheckoutItem>, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::invalid("주문할 상품이 없습니다."));
    }

    let mut merged: Vec<CheckoutItem> = Vec::with_capacity(lines.len());
    for line in lines {
        let quantity = u32::try_from(line.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| ServiceError::invalid("주문 수량은 1개 이상이어야 합니다."))?;

        if let Some(existing) = merged
            .iter_mut()
            .find(|item| item.product_id == line.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            merged.push(CheckoutItem {
                product_id: line.product_id,
                quantity,
            });
        }
    }
    Ok(merged)
}

/// Price checkout items against locked product rows.
///
/// # Errors
///
/// Returns `ServiceError::NotFound` for a missing product and
/// `ServiceError::Invalid` for a suspended product or a stock shortfall.
pub fn price_lines(
    items: &[CheckoutItem],
    products: &[LockedProduct],
) -> Result<Vec<PricedLine>, ServiceError> {
    let by_id: HashMap<ProductId, &LockedProduct> =
        products.iter().map(|product| (product.id, product)).collect();

    items
        .iter()
        .map(|item| {
            let product = by_id
                .get(&item.product_id)
                .ok_or_else(|| {
                    ServiceError::not_found(format!(
                        "상품을 찾을 수 없습니다. (ID: {})",
                        item.product_id
                    ))
                })?;

            if product.status == ProductStatus::Suspended {
                return Err(ServiceError::invalid(format!(
                    "판매가 중지된 상품입니다: {}",
                    product.name
                )));
            }

            let available = u32::try_from(product.stock).unwrap_or(0);
            if available < item.quantity {
                return Err(ServiceError::invalid(format!(
                    "재고가 부족합니다: {} (남은 수량 {available}개)",
                    product.name
                )));
            }

            Ok(PricedLine {
                product_id: product.id,
                product_name: product.name.clone(),
                order_price: effective_price(product.price, product.sale_price),
                count: item.quantity,
            })
        })
        .collect()
}

/// Check a status change against the transition table.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` when the move is not allowed.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        return Ok(());
    }
    if from.is_terminal() {
        return Err(ServiceError::invalid(format!(
            "이미 {} 상태인 주문은 변경할 수 없습니다.",
            from.label()
        )));
    }
    Err(ServiceError::invalid(format!(
        "{}에서 {}(으)로 변경할 수 없습니다.",
        from.label(),
        to.label()
    )))
}

/// Order service.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
    users: UserRepository<'a>,
    notifications: NotificationService<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, hub: &'a NotificationHub) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            users: UserRepository::new(pool),
            notifications: NotificationService::new(pool, hub),
        }
    }

    /// Place an order for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for bad lines or insufficient stock and
    /// `ServiceError::NotFound` for an unknown product.
    #[instrument(skip(self, request), fields(lines = request.order_items.len()))]
    pub async fn create(
        &self,
        user_id: UserId,
        request: &CreateOrderRequest,
    ) -> Result<OrderDetail, ServiceError> {
        let items = validate_lines(&request.order_items)?;
        self.place(user_id, &items, &request.details, &[]).await
    }

    /// Order selected cart lines and remove them from the cart.
    ///
    /// # Errors
    ///
    /// Same as [`OrderService::create`].
    #[instrument(skip(self, items, details, cart_item_ids))]
    pub async fn create_from_cart(
        &self,
        user_id: UserId,
        items: &[CheckoutItem],
        details: &CheckoutDetails,
        cart_item_ids: &[CartItemId],
    ) -> Result<OrderDetail, ServiceError> {
        self.place(user_id, items, details, cart_item_ids).await
    }

    async fn place(
        &self,
        user_id: UserId,
        items: &[CheckoutItem],
        details: &CheckoutDetails,
        cart_item_ids: &[CartItemId],
    ) -> Result<OrderDetail, ServiceError> {
        let buyer = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("사용자를 찾을 수 없습니다."))?;

        let payment_method = PaymentMethod::parse_lenient(details.payment_method.as_deref());
        let shipping = details.shipping();

        let mut tx = self.orders.begin().await?;
        let product_ids: Vec<ProductId> = items.iter().map(|item| item.product_id).collect();
        let locked = tx.lock_products(&product_ids).await?;
        let lines = price_lines(items, &locked)?;

        for line in &lines {
            tx.decrement_stock(line.product_id, i32::try_from(line.count).unwrap_or(i32::MAX))
                .await?;
        }

        let number = order_number();
        let order_id = tx
            .insert_order(&NewOrder {
                order_number: &number,
                user_id,
                status: payment_method.initial_status(),
                payment_method,
                total_price: order_total(&lines),
                shipping: &shipping,
            })
            .await?;

        for line in &lines {
            tx.insert_item(order_id, line).await?;
        }

        if !cart_item_ids.is_empty() {
            tx.remove_cart_items(user_id, cart_item_ids).await?;
        }

        tx.commit().await?;
        tracing::info!(order_id = %order_id, order_number = %number, %payment_method, "Order created");

        let names: Vec<&str> = lines.iter().map(|line| line.product_name.as_str()).collect();
        let summary = summarize_product_names(&names);
        self.announce_order(&buyer, order_id, &summary).await;

        self.detail(order_id).await
    }

    /// Store and push the buyer and admin notifications for a new order.
    async fn announce_order(&self, buyer: &User, order_id: OrderId, summary: &str) {
        let reference = order_id.as_i32();

        let title = "주문 완료";
        let message = format!("주문이 정상적으로 완료되었습니다. ({summary})");
        let notification = NewNotification::new(NotificationType::Order, title, message.clone())
            .reference(reference);
        let push = PushMessage::new(NotificationType::Order, title, message).order(order_id);
        if let Err(e) = self
            .notifications
            .notify_user(buyer, notification, Some(push))
            .await
        {
            tracing::warn!(error = %e, order_id = %order_id, "Failed to send order notification");
        }

        let title = "새 주문 등록";
        let message = format!(
            "새로운 주문이 등록되었습니다. 구매자: {} ({summary})",
            buyer.username
        );
        let notification =
            NewNotification::new(NotificationType::AdminOrder, title, message.clone())
                .reference(reference);
        let push = PushMessage::new(NotificationType::AdminOrder, title, message).order(order_id);
        if let Err(e) = self.notifications.notify_admins(notification, Some(push)).await {
            tracing::warn!(error = %e, order_id = %order_id, "Failed to send admin order notification");
        }
    }

    async fn detail(&self, id: OrderId) -> Result<OrderDetail, ServiceError> {
        let order = self
            .orders
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ORDER_NOT_FOUND))?;
        let items = self.orders.items_for(&[id]).await?;
        Ok(OrderDetail::new(order, items))
    }

    async fn with_items(&self, orders: Vec<Order>) -> Result<Vec<OrderDetail>, ServiceError> {
        let ids: Vec<OrderId> = orders.iter().map(|order| order.id).collect();
        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in self.orders.items_for(&ids).await? {
            items_by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                OrderDetail::new(order, items)
            })
            .collect())
    }

    /// An order, for its owner or an admin.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden`.
    pub async fn get(&self, actor: Actor, id: OrderId) -> Result<OrderDetail, ServiceError> {
        let detail = self.detail(id).await?;
        if !actor.may_manage(detail.order.user_id) {
            return Err(ServiceError::forbidden("본인의 주문만 조회할 수 있습니다."));
        }
        Ok(detail)
    }

    /// An order for the admin screens.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown order.
    pub async fn get_any(&self, id: OrderId) -> Result<OrderDetail, ServiceError> {
        self.detail(id).await
    }

    /// Tracking label for an order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden`.
    pub async fn track(&self, actor: Actor, id: OrderId) -> Result<OrderTracking, ServiceError> {
        let order = self
            .orders
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ORDER_NOT_FOUND))?;
        if !actor.may_manage(order.user_id) {
            return Err(ServiceError::forbidden("본인의 주문만 조회할 수 있습니다."));
        }
        Ok(OrderTracking {
            order_id: order.id,
            order_number: order.order_number,
            status: order.status,
            track: order.status.label(),
        })
    }

    /// Visible orders of `owner`, for the owner or an admin.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` when looking at someone else's orders.
    pub async fn list_for_user(
        &self,
        actor: Actor,
        owner: UserId,
    ) -> Result<Vec<OrderDetail>, ServiceError> {
        if !actor.may_manage(owner) {
            return Err(ServiceError::forbidden("본인의 주문만 조회할 수 있습니다."));
        }
        let orders = self.orders.list_for_user(owner, false).await?;
        self.with_items(orders).await
    }

    /// Admin order search.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn search(&self, keyword: Option<&str>) -> Result<Vec<OrderDetail>, ServiceError> {
        let orders = self.orders.search(keyword).await?;
        self.with_items(orders).await
    }

    /// Hide or unhide an order in its owner's history.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden`.
    pub async fn set_hidden(&self, actor: Actor, id: OrderId, hidden: bool) -> Result<(), ServiceError> {
        let order = self
            .orders
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ORDER_NOT_FOUND))?;
        if !actor.may_manage(order.user_id) {
            return Err(ServiceError::forbidden("본인의 주문만 변경할 수 있습니다."));
        }
        self.orders
            .set_hidden(id, hidden)
            .await
            .map_err(or_not_found(ORDER_NOT_FOUND))
    }

    /// Pay for a bank-transfer order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` unless the order awaits payment.
    #[instrument(skip(self))]
    pub async fn pay(&self, actor: Actor, id: OrderId) -> Result<OrderDetail, ServiceError> {
        self.move_order(Some(actor), id, OrderStatus::Ordered, true).await
    }

    /// Cancel an order and restore its stock.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for a delivered or canceled order.
    #[instrument(skip(self))]
    pub async fn cancel(&self, actor: Actor, id: OrderId) -> Result<OrderDetail, ServiceError> {
        self.move_order(Some(actor), id, OrderStatus::Canceled, false)
            .await
    }

    /// Admin status change, validated against the transition table.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for a disallowed transition.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<OrderDetail, ServiceError> {
        self.move_order(None, id, status, false).await
    }

    /// Admin confirmation of a bank-transfer deposit.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` unless the order awaits payment.
    #[instrument(skip(self))]
    pub async fn confirm_payment(&self, id: OrderId) -> Result<OrderDetail, ServiceError> {
        self.move_order(None, id, OrderStatus::Ordered, true).await
    }

    /// Lock, check and apply a status change.
    ///
    /// `actor` is `None` for admin routes. `payment_only` restricts the move
    /// to `PAYMENT_PENDING → ORDERED`.
    async fn move_order(
        &self,
        actor: Option<Actor>,
        id: OrderId,
        next: OrderStatus,
        payment_only: bool,
    ) -> Result<OrderDetail, ServiceError> {
        let mut tx = self.orders.begin().await?;
        let order = tx.lock_order(id).await.map_err(or_not_found(ORDER_NOT_FOUND))?;

        if let Some(actor) = actor
            && !actor.may_manage(order.user_id)
        {
            return Err(ServiceError::forbidden("본인의 주문만 변경할 수 있습니다."));
        }
        if payment_only && order.status != OrderStatus::PaymentPending {
            return Err(ServiceError::invalid("입금대기 상태의 주문이 아닙니다."));
        }

        apply_transition(&mut tx, &order, next).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, from = %order.status, to = %next, "Order status changed");
        self.detail(id).await
    }
}

async fn apply_transition(
    tx: &mut OrderTx,
    order: &LockedOrder,
    next: OrderStatus,
) -> Result<(), ServiceError> {
    check_transition(order.status, next)?;

    if next == OrderStatus::Canceled {
        let restored = tx.restore_stock(order.id).await?;
        tracing::debug!(order_id = %order.id, products = restored, "Stock restored");
    }

    let mark_paid = order.status == OrderStatus::PaymentPending && next == OrderStatus::Ordered;
    tx.set_status(order.id, next, mark_paid).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use onandhome_core::Won;

    fn product(id: i32, price: i64, sale: Option<i64>, stock: i32) -> LockedProduct {
        LockedProduct {
            id: ProductId::new(id),
            name: format!("product-{id}"),
            price: Won::new(price),
            sale_price: sale.map(Won::new),
            stock,
            status: ProductStatus::OnSale,
        }
    }

    fn request(product_id: i32, quantity: i64) -> OrderLineRequest {
        OrderLineRequest {
            product_id: ProductId::new(product_id),
            quantity,
        }
    }

    #[test]
    fn test_validate_rejects_empty_and_zero_quantity() {
        assert!(matches!(validate_lines(&[]), Err(ServiceError::Invalid(_))));
        assert!(matches!(
            validate_lines(&[request(1, 0)]),
            Err(ServiceError::Invalid(_))
        ));
        assert!(matches!(
            validate_lines(&[request(1, -2)]),
            Err(ServiceError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_merges_repeated_products() {
        let items = validate_lines(&[request(1, 2), request(2, 1), request(1, 3)]).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_id, ProductId::new(1));
        assert_eq!(items[0].quantity, 5);
    }

    #[test]
    fn test_price_lines_uses_sale_price() {
        let items = validate_lines(&[request(1, 2), request(2, 1)]).unwrap();
        let lines = price_lines(
            &items,
            &[product(1, 10_000, Some(8_000), 5), product(2, 3_000, Some(0), 5)],
        )
        .unwrap();

        assert_eq!(lines[0].order_price, Won::new(8_000));
        assert_eq!(lines[1].order_price, Won::new(3_000));
        assert_eq!(order_total(&lines), Won::new(19_000));
    }

    #[test]
    fn test_price_lines_rejects_shortfall_and_unknown() {
        let items = validate_lines(&[request(1, 6)]).unwrap();
        assert!(matches!(
            price_lines(&items, &[product(1, 1_000, None, 5)]),
            Err(ServiceError::Invalid(_))
        ));
        assert!(matches!(
            price_lines(&items, &[]),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_price_lines_rejects_suspended_product() {
        let items = validate_lines(&[request(1, 1)]).unwrap();
        let mut suspended = product(1, 1_000, None, 5);
        suspended.status = ProductStatus::Suspended;
        assert!(price_lines(&items, &[suspended]).is_err());
    }

    #[test]
    fn test_transition_check() {
        assert!(check_transition(OrderStatus::PaymentPending, OrderStatus::Ordered).is_ok());
        assert!(check_transition(OrderStatus::Ordered, OrderStatus::Canceled).is_ok());
        assert!(check_transition(OrderStatus::Canceled, OrderStatus::Canceled).is_err());
        assert!(check_transition(OrderStatus::Delivered, OrderStatus::Canceled).is_err());
        assert!(check_transition(OrderStatus::Delivering, OrderStatus::Preparing).is_err());
    }

    #[test]
    fn test_create_request_accepts_flat_shipping_fields() {
        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "orderItems": [{"productId": 3, "quantity": 2}],
            "paymentMethod": "BANK_TRANSFER",
            "recipientName": "홍길동",
            "shippingAddress": "서울시 강남구"
        }))
        .unwrap();

        assert_eq!(request.order_items.len(), 1);
        assert_eq!(
            PaymentMethod::parse_lenient(request.details.payment_method.as_deref()),
            PaymentMethod::BankTransfer
        );
        assert_eq!(request.details.recipient_name.as_deref(), Some("홍길동"));
    }
}
