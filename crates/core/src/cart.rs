//! Cart selection state and totals.
//!
//! The cart page shows every line with a checkbox. Selection starts as "all
//! selected", survives quantity changes, and only selected lines count toward
//! the total and the checkout handoff.
//!
//! ```
//! use onandhome_core::cart::{CartLine, CartSelection, CartSummary};
//! use onandhome_core::{CartItemId, ProductId, Won};
//!
//! let lines = vec![
//!     CartLine::new(CartItemId::new(1), ProductId::new(10), "TV", Won::new(900_000), Some(Won::new(850_000)), 1),
//!     CartLine::new(CartItemId::new(2), ProductId::new(11), "Fan", Won::new(40_000), None, 2),
//! ];
//!
//! let mut selection = CartSelection::all(&lines);
//! assert_eq!(CartSummary::compute(&lines, &selection).total, Won::new(930_000));
//!
//! selection.toggle(CartItemId::new(1));
//! assert_eq!(CartSummary::compute(&lines, &selection).total, Won::new(80_000));
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{CartItemId, ProductId, Won};

/// Errors raised while preparing a checkout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// The cart has no lines at all.
    #[error("cart is empty")]
    Empty,
    /// Lines exist but none is selected.
    #[error("no cart items selected")]
    NothingSelected,
}

/// Clamp a requested quantity to the minimum of one.
#[must_use]
pub fn normalize_quantity(requested: i64) -> u32 {
    u32::try_from(requested.max(1)).unwrap_or(u32::MAX)
}

/// One line of a user's cart joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Cart item ID.
    pub cart_item_id: CartItemId,
    /// Product in the line.
    pub product_id: ProductId,
    /// Product name at the time of reading.
    pub name: String,
    /// List price.
    pub price: Won,
    /// Sale price, if any.
    pub sale_price: Option<Won>,
    /// Quantity (always at least one).
    pub quantity: u32,
    /// Units in stock when the cart was read.
    #[serde(default)]
    pub stock: u32,
}

impl CartLine {
    /// Build a line, normalizing the quantity.
    #[must_use]
    pub fn new(
        cart_item_id: CartItemId,
        product_id: ProductId,
        name: impl Into<String>,
        price: Won,
        sale_price: Option<Won>,
        quantity: u32,
    ) -> Self {
        Self {
            cart_item_id,
            product_id,
            name: name.into(),
            price,
            sale_price,
            quantity: quantity.max(1),
            stock: 0,
        }
    }

    /// Attach the product's current stock.
    #[must_use]
    pub const fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    /// Whether the line asks for more units than are in stock.
    #[must_use]
    pub const fn exceeds_stock(&self) -> bool {
        self.quantity > self.stock
    }

    /// Price charged per unit: the sale price when set and non-zero, else the list price.
    #[must_use]
    pub fn unit_price(&self) -> Won {
        effective_price(self.price, self.sale_price)
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Won {
        self.unit_price().times(self.quantity)
    }
}

/// Price a product sells for given its list and sale prices.
#[must_use]
pub fn effective_price(price: Won, sale_price: Option<Won>) -> Won {
    match sale_price {
        Some(sale) if !sale.is_zero() => sale,
        _ => price,
    }
}

/// The set of selected cart item IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSelection(BTreeSet<CartItemId>);

impl CartSelection {
    /// Select every line (the state after loading the cart).
    #[must_use]
    pub fn all(lines: &[CartLine]) -> Self {
        Self(lines.iter().map(|line| line.cart_item_id).collect())
    }

    /// Build a selection from explicit IDs.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = CartItemId>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// Flip one line in or out of the selection.
    pub fn toggle(&mut self, id: CartItemId) {
        if !self.0.remove(&id) {
            self.0.insert(id);
        }
    }

    /// Select every line in `lines`.
    pub fn select_all(&mut self, lines: &[CartLine]) {
        self.0.extend(lines.iter().map(|line| line.cart_item_id));
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Drop IDs whose lines no longer exist (after a refetch).
    pub fn retain_existing(&mut self, lines: &[CartLine]) {
        self.0
            .retain(|id| lines.iter().any(|line| line.cart_item_id == *id));
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn contains(&self, id: CartItemId) -> bool {
        self.0.contains(&id)
    }

    /// Whether every line in `lines` is selected. An empty cart is never "all selected".
    #[must_use]
    pub fn is_all_selected(&self, lines: &[CartLine]) -> bool {
        !lines.is_empty() && lines.iter().all(|line| self.contains(line.cart_item_id))
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Selected IDs in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = CartItemId> + '_ {
        self.0.iter().copied()
    }
}

/// Totals for the selected part of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    /// Number of lines in the cart.
    pub line_count: usize,
    /// Number of selected lines.
    pub selected_count: usize,
    /// Sum of quantities across selected lines.
    pub selected_quantity: u64,
    /// Σ unit price × quantity over selected lines.
    pub total: Won,
    /// Whether every line is selected.
    pub all_selected: bool,
}

impl CartSummary {
    /// Compute totals for `selection` over `lines`. IDs not present in `lines` are ignored.
    #[must_use]
    pub fn compute(lines: &[CartLine], selection: &CartSelection) -> Self {
        let selected: Vec<&CartLine> = lines
            .iter()
            .filter(|line| selection.contains(line.cart_item_id))
            .collect();

        Self {
            line_count: lines.len(),
            selected_count: selected.len(),
            selected_quantity: selected.iter().map(|line| u64::from(line.quantity)).sum(),
            total: selected.iter().map(|line| line.line_total()).sum(),
            all_selected: selection.is_all_selected(lines),
        }
    }
}

/// A product and quantity handed from the cart to order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    /// Product to order.
    pub product_id: ProductId,
    /// Quantity to order.
    pub quantity: u32,
}

/// Turn the selected lines into checkout items, preserving cart order.
///
/// # Errors
///
/// Returns `CartError::Empty` for an empty cart and `CartError::NothingSelected`
/// when no existing line is selected.
pub fn checkout_items(
    lines: &[CartLine],
    selection: &CartSelection,
) -> Result<Vec<CheckoutItem>, CartError> {
    if lines.is_empty() {
        return Err(CartError::Empty);
    }

    let items: Vec<CheckoutItem> = lines
        .iter()
        .filter(|line| selection.contains(line.cart_item_id))
        .map(|line| CheckoutItem {
            product_id: line.product_id,
            quantity: line.quantity,
        })
        .collect();

    if items.is_empty() {
        return Err(CartError::NothingSelected);
    }

    Ok(items)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, price: i64, sale: Option<i64>, quantity: u32) -> CartLine {
        CartLine::new(
            CartItemId::new(id),
            ProductId::new(id * 10),
            format!("product-{id}"),
            Won::new(price),
            sale.map(Won::new),
            quantity,
        )
    }

    #[test]
    fn test_normalize_quantity() {
        assert_eq!(normalize_quantity(-3), 1);
        assert_eq!(normalize_quantity(0), 1);
        assert_eq!(normalize_quantity(4), 4);
        assert_eq!(normalize_quantity(i64::MAX), u32::MAX);
    }

    #[test]
    fn test_unit_price_prefers_nonzero_sale_price() {
        assert_eq!(line(1, 10_000, Some(8_000), 1).unit_price(), Won::new(8_000));
        assert_eq!(line(1, 10_000, Some(0), 1).unit_price(), Won::new(10_000));
        assert_eq!(line(1, 10_000, None, 1).unit_price(), Won::new(10_000));
    }

    #[test]
    fn test_new_line_never_has_zero_quantity() {
        assert_eq!(line(1, 1_000, None, 0).quantity, 1);
    }

    #[test]
    fn test_exceeds_stock() {
        assert!(line(1, 1_000, None, 3).with_stock(2).exceeds_stock());
        assert!(!line(1, 1_000, None, 2).with_stock(2).exceeds_stock());
    }

    #[test]
    fn test_default_selection_is_everything() {
        let lines = vec![line(1, 10_000, None, 2), line(2, 5_000, Some(4_000), 3)];
        let summary = CartSummary::compute(&lines, &CartSelection::all(&lines));

        assert!(summary.all_selected);
        assert_eq!(summary.selected_count, 2);
        assert_eq!(summary.selected_quantity, 5);
        assert_eq!(summary.total, Won::new(32_000));
    }

    #[test]
    fn test_unselected_lines_do_not_count() {
        let lines = vec![line(1, 10_000, None, 2), line(2, 5_000, None, 1)];
        let mut selection = CartSelection::all(&lines);
        selection.toggle(CartItemId::new(1));

        let summary = CartSummary::compute(&lines, &selection);
        assert!(!summary.all_selected);
        assert_eq!(summary.total, Won::new(5_000));

        selection.toggle(CartItemId::new(1));
        assert_eq!(CartSummary::compute(&lines, &selection).total, Won::new(25_000));
    }

    #[test]
    fn test_refetch_drops_removed_lines_from_selection() {
        let before = vec![line(1, 1_000, None, 1), line(2, 2_000, None, 1)];
        let mut selection = CartSelection::all(&before);

        let after = vec![line(2, 2_000, None, 1)];
        selection.retain_existing(&after);

        assert!(!selection.contains(CartItemId::new(1)));
        assert!(selection.is_all_selected(&after));
    }

    #[test]
    fn test_empty_cart_is_not_all_selected() {
        let summary = CartSummary::compute(&[], &CartSelection::default());
        assert!(!summary.all_selected);
        assert_eq!(summary.total, Won::ZERO);
    }

    #[test]
    fn test_stale_ids_are_ignored_in_totals() {
        let lines = vec![line(1, 3_000, None, 1)];
        let selection = CartSelection::from_ids([CartItemId::new(1), CartItemId::new(99)]);
        let summary = CartSummary::compute(&lines, &selection);
        assert_eq!(summary.selected_count, 1);
        assert_eq!(summary.total, Won::new(3_000));
    }

    #[test]
    fn test_checkout_items() {
        let lines = vec![line(1, 1_000, None, 2), line(2, 2_000, None, 1)];
        let selection = CartSelection::from_ids([CartItemId::new(2)]);

        let items = checkout_items(&lines, &selection).unwrap();
        assert_eq!(
            items,
            vec![CheckoutItem {
                product_id: ProductId::new(20),
                quantity: 1
            }]
        );
    }

    #[test]
    fn test_checkout_errors() {
        assert_eq!(
            checkout_items(&[], &CartSelection::default()),
            Err(CartError::Empty)
        );

        let lines = vec![line(1, 1_000, None, 1)];
        assert_eq!(
            checkout_items(&lines, &CartSelection::default()),
            Err(CartError::NothingSelected)
        );
    }

    #[test]
    fn test_select_all_and_clear() {
        let lines = vec![line(1, 1_000, None, 1), line(2, 1_000, None, 1)];
        let mut selection = CartSelection::default();
        selection.select_all(&lines);
        assert!(selection.is_all_selected(&lines));
        selection.clear();
        assert!(selection.is_empty());
    }
}
