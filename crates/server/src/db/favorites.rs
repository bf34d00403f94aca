//! Favorite (wishlist) repository.

use sqlx::PgPool;

use onandhome_core::{FavoriteId, ProductId, UserId};

use super::RepositoryError;
use crate::models::favorite::Favorite;

const FAVORITE_SELECT: &str = r"
    SELECT f.id, f.user_id, f.product_id, p.name AS product_name, p.price, p.sale_price,
           p.thumbnail_image, p.category, p.status, f.created_at
    FROM favorites f
    JOIN products p ON p.id = f.product_id
";

/// Repository for favorite database operations.
pub struct FavoriteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FavoriteRepository<'a> {
    /// Create a new favorite repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's favorites, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Favorite>, RepositoryError> {
        let rows = sqlx::query_as::<_, Favorite>(&format!(
            "{FAVORITE_SELECT} WHERE f.user_id = $1 ORDER BY f.created_at DESC, f.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// One favorite by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: FavoriteId) -> Result<Option<Favorite>, RepositoryError> {
        let row = sqlx::query_as::<_, Favorite>(&format!("{FAVORITE_SELECT} WHERE f.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Whether the user has favorited the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = $1 AND product_id = $2)",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Add the favorite if absent, remove it if present.
    ///
    /// Returns the new favorite ID when one was added, `None` when removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn toggle(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<FavoriteId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        let added = if removed {
            None
        } else {
            let id: Option<FavoriteId> = sqlx::query_scalar(
                r"
                INSERT INTO favorites (user_id, product_id) VALUES ($1, $2)
                ON CONFLICT (user_id, product_id) DO NOTHING
                RETURNING id
                ",
            )
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
            id
        };

        tx.commit().await?;
        Ok(added)
    }

    /// Remove a favorite owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such favorite.
    pub async fn remove(&self, user_id: UserId, id: FavoriteId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM favorites WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove the user's favorite for a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product isn't favorited.
    pub async fn remove_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// How many users favorited a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_product(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Number of favorites a user holds.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
