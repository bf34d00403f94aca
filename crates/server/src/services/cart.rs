//! Cart service.

use sqlx::PgPool;
use tracing::instrument;

use onandhome_core::cart::{
    CartError, CartLine, CartSelection, CartSummary, CheckoutItem, checkout_items,
    normalize_quantity,
};
use onandhome_core::{CartItemId, ProductId, UserId};

use super::{ServiceError, or_not_found};
use crate::db::cart::CartRepository;
use crate::db::products::ProductRepository;
use crate::models::cart::{CartItemView, CartView};

impl From<CartError> for ServiceError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Empty => Self::Invalid("장바구니가 비어 있습니다.".to_string()),
            CartError::NothingSelected => Self::Invalid("주문할 상품을 선택해주세요.".to_string()),
        }
    }
}

/// Selected cart lines ready to become an order.
#[derive(Debug, Clone)]
pub struct CartCheckout {
    /// Cart lines being ordered, removed after the order commits.
    pub cart_item_ids: Vec<CartItemId>,
    /// Products and quantities to order.
    pub items: Vec<CheckoutItem>,
}

/// Cart service.
pub struct CartService<'a> {
    cart: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            cart: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    async fn lines(&self, user_id: UserId) -> Result<(Vec<CartItemView>, Vec<CartLine>), ServiceError> {
        let rows = self.cart.list(user_id).await?;
        let views = rows.iter().map(CartItemView::from).collect();
        let lines = rows.iter().map(|row| row.to_line()).collect();
        Ok((views, lines))
    }

    /// The cart with every line selected.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    #[instrument(skip(self))]
    pub async fn view(&self, user_id: UserId) -> Result<CartView, ServiceError> {
        let (items, lines) = self.lines(user_id).await?;
        let summary = CartSummary::compute(&lines, &CartSelection::all(&lines));
        Ok(CartView { items, summary })
    }

    /// Totals for an explicit selection. Unknown IDs are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    #[instrument(skip(self, selected))]
    pub async fn summary(
        &self,
        user_id: UserId,
        selected: &[CartItemId],
    ) -> Result<CartSummary, ServiceError> {
        let (_, lines) = self.lines(user_id).await?;
        let mut selection = CartSelection::from_ids(selected.iter().copied());
        selection.retain_existing(&lines);
        Ok(CartSummary::compute(&lines, &selection))
    }

    /// Number of lines.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, ServiceError> {
        Ok(self.cart.count(user_id).await?)
    }

    /// Add a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown product.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItemId, ServiceError> {
        if self.products.get(product_id).await?.is_none() {
            return Err(ServiceError::not_found("상품을 찾을 수 없습니다."));
        }

        let quantity = to_db_quantity(quantity);
        let id = self.cart.add(user_id, product_id, quantity).await?;
        tracing::debug!(cart_item_id = %id, quantity, "Added to cart");
        Ok(id)
    }

    /// Set a line's quantity, clamped to at least one.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown line and
    /// `ServiceError::Forbidden` for another user's line.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        quantity: i64,
    ) -> Result<(), ServiceError> {
        let Some((owner, _)) = self.cart.get(id).await? else {
            return Err(ServiceError::not_found("장바구니 항목을 찾을 수 없습니다."));
        };
        if owner != user_id {
            return Err(ServiceError::forbidden("본인의 장바구니만 수정할 수 있습니다."));
        }

        self.cart
            .set_quantity(id, to_db_quantity(quantity))
            .await
            .map_err(or_not_found("장바구니 항목을 찾을 수 없습니다."))
    }

    /// Remove one line.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` unless the user owns the line.
    pub async fn remove(&self, user_id: UserId, id: CartItemId) -> Result<(), ServiceError> {
        self.cart
            .remove(user_id, id)
            .await
            .map_err(or_not_found("장바구니 항목을 찾을 수 없습니다."))
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, ServiceError> {
        Ok(self.cart.clear(user_id).await?)
    }

    /// Collect the lines to order. An empty `selected` means every line.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for an empty cart or an empty selection.
    pub async fn checkout(
        &self,
        user_id: UserId,
        selected: &[CartItemId],
    ) -> Result<CartCheckout, ServiceError> {
        let (_, lines) = self.lines(user_id).await?;
        let selection = if selected.is_empty() {
            CartSelection::all(&lines)
        } else {
            CartSelection::from_ids(selected.iter().copied())
        };

        let items = checkout_items(&lines, &selection)?;
        let cart_item_ids = lines
            .iter()
            .map(|line| line.cart_item_id)
            .filter(|id| selection.contains(*id))
            .collect();

        Ok(CartCheckout {
            cart_item_ids,
            items,
        })
    }
}

fn to_db_quantity(requested: i64) -> i32 {
    i32::try_from(normalize_quantity(requested)).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_quantity_is_at_least_one() {
        assert_eq!(to_db_quantity(0), 1);
        assert_eq!(to_db_quantity(-5), 1);
        assert_eq!(to_db_quantity(3), 3);
        assert_eq!(to_db_quantity(i64::MAX), i32::MAX);
    }

    #[test]
    fn test_cart_errors_map_to_invalid() {
        assert!(matches!(
            ServiceError::from(CartError::Empty),
            ServiceError::Invalid(_)
        ));
        assert!(matches!(
            ServiceError::from(CartError::NothingSelected),
            ServiceError::Invalid(_)
        ));
    }
}
