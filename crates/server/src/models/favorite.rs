//! Favorite (wishlist) types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use onandhome_core::{FavoriteId, ProductId, ProductStatus, UserId, Won};

/// A favorite joined with the product fields the list page shows.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: FavoriteId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Won,
    pub sale_price: Option<Won>,
    pub thumbnail_image: Option<String>,
    pub category: Option<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

/// Result of a toggle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteToggle {
    pub favorited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<Favorite>,
}
