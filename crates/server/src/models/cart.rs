//! Cart types.

use serde::Serialize;

use onandhome_core::cart::{CartLine, CartSummary};
use onandhome_core::{CartItemId, ProductId, Won};

/// A cart item joined with its product.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItemRow {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Won,
    pub sale_price: Option<Won>,
    pub quantity: i32,
    pub stock: i32,
    pub thumbnail_image: Option<String>,
    pub category: Option<String>,
}

impl CartItemRow {
    /// Convert to the core line used for totals.
    #[must_use]
    pub fn to_line(&self) -> CartLine {
        CartLine::new(
            self.id,
            self.product_id,
            self.name.clone(),
            self.price,
            self.sale_price,
            u32::try_from(self.quantity).unwrap_or(1),
        )
        .with_stock(u32::try_from(self.stock).unwrap_or(0))
    }
}

/// One cart line as the client sees it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub thumbnail_image: Option<String>,
    pub category: Option<String>,
    pub price: Won,
    pub sale_price: Option<Won>,
    pub unit_price: Won,
    pub quantity: u32,
    pub line_total: Won,
    pub stock: u32,
    pub exceeds_stock: bool,
}

impl From<&CartItemRow> for CartItemView {
    fn from(row: &CartItemRow) -> Self {
        let line = row.to_line();
        Self {
            cart_item_id: row.id,
            product_id: row.product_id,
            product_name: row.name.clone(),
            thumbnail_image: row.thumbnail_image.clone(),
            category: row.category.clone(),
            price: row.price,
            sale_price: row.sale_price,
            unit_price: line.unit_price(),
            quantity: line.quantity,
            line_total: line.line_total(),
            stock: line.stock,
            exceeds_stock: line.exceeds_stock(),
        }
    }
}

/// The cart page payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub summary: CartSummary,
}
