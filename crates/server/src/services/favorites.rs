//! Wishlist service.

use sqlx::PgPool;

use onandhome_core::{ProductId, UserId};

use super::{ServiceError, or_not_found};
use crate::db::favorites::FavoriteRepository;
use crate::db::products::ProductRepository;
use crate::models::favorite::{Favorite, FavoriteToggle};

/// Favorite service.
pub struct FavoriteService<'a> {
    favorites: FavoriteRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> FavoriteService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            favorites: FavoriteRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// The user's favorites with product fields.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Favorite>, ServiceError> {
        Ok(self.favorites.list(user_id).await?)
    }

    /// Add or remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown product.
    pub async fn toggle(&self, user_id: UserId, product_id: ProductId) -> Result<FavoriteToggle, ServiceError> {
        if self.products.get(product_id).await?.is_none() {
            return Err(ServiceError::not_found("상품을 찾을 수 없습니다."));
        }

        let Some(id) = self.favorites.toggle(user_id, product_id).await? else {
            return Ok(FavoriteToggle {
                favorited: false,
                favorite: None,
            });
        };

        Ok(FavoriteToggle {
            favorited: true,
            favorite: self.favorites.get(id).await?,
        })
    }

    /// Whether the product is in the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn is_favorite(&self, user_id: UserId, product_id: ProductId) -> Result<bool, ServiceError> {
        Ok(self.favorites.exists(user_id, product_id).await?)
    }

    /// How many users favorited a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn count_for_product(&self, product_id: ProductId) -> Result<i64, ServiceError> {
        Ok(self.favorites.count_for_product(product_id).await?)
    }

    /// Size of the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, ServiceError> {
        Ok(self.favorites.count(user_id).await?)
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product isn't favorited.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), ServiceError> {
        self.favorites
            .remove_product(user_id, product_id)
            .await
            .map_err(or_not_found("찜한 상품이 아닙니다."))
    }
}
