//! Order repository.
//!
//! Reads go through `OrderRepository`. Writes that touch stock run inside an
//! `OrderTx`, which holds row locks on the products and orders involved until
//! it is committed or dropped.

use sqlx::{PgPool, Postgres, Transaction};

use onandhome_core::order::PricedLine;
use onandhome_core::{
    CartItemId, OrderId, OrderStatus, PaymentMethod, ProductId, ProductStatus, UserId, Won,
};

use super::{RepositoryError, conflict_on_unique, like_pattern};
use crate::models::order::{Order, OrderItem, ShippingInfo};

const ORDER_SELECT: &str = r"
    SELECT o.id, o.order_number, o.user_id, u.user_id AS user_login_id, u.username,
           o.status, o.payment_method, o.total_price, o.recipient_name, o.recipient_phone,
           o.shipping_address, o.shipping_request, o.hidden, o.paid_at,
           o.created_at, o.updated_at
    FROM orders o
    JOIN users u ON u.id = o.user_id
";

/// Repository for order reads and simple updates.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Start a stock-affecting transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction cannot begin.
    pub async fn begin(&self) -> Result<OrderTx, RepositoryError> {
        Ok(OrderTx {
            tx: self.pool.begin().await?,
        })
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(order)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        include_hidden: bool,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 AND ($2 OR NOT o.hidden) ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .bind(include_hidden)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Admin order search on the first item's product name, buyer name or login id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, keyword: Option<&str>) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            {ORDER_SELECT}
            WHERE $1::TEXT IS NULL
               OR u.username ILIKE $1
               OR u.user_id ILIKE $1
               OR o.order_number ILIKE $1
               OR (SELECT oi.product_name FROM order_items oi
                   WHERE oi.order_id = o.id ORDER BY oi.id LIMIT 1) ILIKE $1
            ORDER BY o.created_at DESC, o.id DESC
            "
        ))
        .bind(like_pattern(keyword))
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Items for a set of orders, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, oi.product_name, oi.order_price, oi.count,
                   p.thumbnail_image
            FROM order_items oi
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_id, oi.id
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Hide or unhide an order from its owner's history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_hidden(&self, id: OrderId, hidden: bool) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE orders SET hidden = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(hidden)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Stock snapshot of a locked product row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Won,
    pub sale_price: Option<Won>,
    pub stock: i32,
    pub status: ProductStatus,
}

/// Status snapshot of a locked order row.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct LockedOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
}

/// Fields of an order header about to be written.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total_price: Won,
    pub shipping: &'a ShippingInfo,
}

/// A transaction over orders and product stock.
pub struct OrderTx {
    tx: Transaction<'static, Postgres>,
}

impl OrderTx {
    /// Lock product rows for update, in ID order to avoid deadlocks.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_products(
        &mut self,
        ids: &[ProductId],
    ) -> Result<Vec<LockedProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, LockedProduct>(
            r"
            SELECT id, name, price, sale_price, stock, status
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            ",
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    /// Lock one order row for update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn lock_order(&mut self, id: OrderId) -> Result<LockedOrder, RepositoryError> {
        sqlx::query_as::<_, LockedOrder>(
            "SELECT id, user_id, status, payment_method FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Subtract stock. The `stock >= 0` check constraint guards against overselling.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn decrement_stock(
        &mut self,
        id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    /// Add every item of an order back to its product's stock.
    ///
    /// Items whose product was deleted are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn restore_stock(&mut self, order_id: OrderId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE products p
            SET stock = p.stock + totals.count, updated_at = NOW()
            FROM (
                SELECT product_id, SUM(count)::INTEGER AS count
                FROM order_items
                WHERE order_id = $1 AND product_id IS NOT NULL
                GROUP BY product_id
            ) totals
            WHERE p.id = totals.product_id
            ",
        )
        .bind(order_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Insert the order header.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on an order number collision.
    pub async fn insert_order(&mut self, order: &NewOrder<'_>) -> Result<OrderId, RepositoryError> {
        let id: OrderId = sqlx::query_scalar(
            r"
            INSERT INTO orders (order_number, user_id, status, payment_method, total_price,
                                recipient_name, recipient_phone, shipping_address,
                                shipping_request, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                    CASE WHEN $10 THEN NOW() ELSE NULL END)
            RETURNING id
            ",
        )
        .bind(order.order_number)
        .bind(order.user_id)
        .bind(order.status)
        .bind(order.payment_method)
        .bind(order.total_price)
        .bind(&order.shipping.recipient_name)
        .bind(&order.shipping.recipient_phone)
        .bind(&order.shipping.shipping_address)
        .bind(&order.shipping.shipping_request)
        .bind(order.payment_method.settles_at_checkout())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(conflict_on_unique("order number already exists"))?;
        Ok(id)
    }

    /// Insert one order line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_item(
        &mut self,
        order_id: OrderId,
        line: &PricedLine,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO order_items (order_id, product_id, product_name, order_price, count)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.order_price)
        .bind(i32::try_from(line.count).unwrap_or(i32::MAX))
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Move an order to a new status. `mark_paid` stamps `paid_at` once.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        mark_paid: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE orders
            SET status = $2,
                paid_at = CASE WHEN $3 THEN COALESCE(paid_at, NOW()) ELSE paid_at END,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status)
        .bind(mark_paid)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Delete ordered lines from the buyer's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove_cart_items(
        &mut self,
        user_id: UserId,
        ids: &[CartItemId],
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    /// Commit the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the commit fails.
    pub async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
