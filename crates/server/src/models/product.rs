//! Catalog types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use onandhome_core::cart::effective_price;
use onandhome_core::{ProductId, ProductStatus, Won};

/// A product row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub product_code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price: Won,
    pub sale_price: Option<Won>,
    pub stock: i32,
    pub thumbnail_image: Option<String>,
    pub detail_image: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub country: Option<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Price charged per unit.
    #[must_use]
    pub fn unit_price(&self) -> Won {
        effective_price(self.price, self.sale_price)
    }
}

/// Product detail with review statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub average_rating: f64,
    pub review_count: i64,
}

/// Review statistics for one product.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct RatingStats {
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// Admin-entered product fields.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub name: String,
    pub product_code: Option<String>,
    pub description: Option<String>,
    pub price: Won,
    pub sale_price: Option<Won>,
    pub stock: i32,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub country: Option<String>,
    pub status: ProductStatus,
    pub thumbnail_image: Option<String>,
    pub detail_image: Option<String>,
}
