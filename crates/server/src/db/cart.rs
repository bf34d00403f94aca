//! Cart repository.

use sqlx::PgPool;

use onandhome_core::{CartItemId, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::CartItemRow;

const CART_SELECT: &str = r"
    SELECT c.id, c.product_id, p.name, p.price, p.sale_price, c.quantity, p.stock,
           p.thumbnail_image, p.category
    FROM cart_items c
    JOIN products p ON p.id = c.product_id
";

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's cart lines, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartItemRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            "{CART_SELECT} WHERE c.user_id = $1 ORDER BY c.id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// One cart line with its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: CartItemId,
    ) -> Result<Option<(UserId, CartItemRow)>, RepositoryError> {
        let owner: Option<UserId> =
            sqlx::query_scalar("SELECT user_id FROM cart_items WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        let Some(owner) = owner else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, CartItemRow>(&format!("{CART_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|row| (owner, row)))
    }

    /// Number of lines in a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Add a product, merging into an existing line for the same product.
    /// A merged quantity saturates at `i32::MAX`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItemId, RepositoryError> {
        let id: CartItemId = sqlx::query_scalar(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET
                quantity = LEAST(cart_items.quantity::BIGINT + EXCLUDED.quantity, $4)::INTEGER,
                updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(i64::from(i32::MAX))
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist.
    pub async fn set_quantity(&self, id: CartItemId, quantity: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove one line owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such line.
    pub async fn remove(&self, user_id: UserId, id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Empty a user's cart. Returns the number of removed lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
