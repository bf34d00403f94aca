//! Product repository.

use sqlx::PgPool;

use onandhome_core::{ProductId, ProductStatus};

use super::{RepositoryError, conflict_on_unique, like_pattern};
use crate::models::product::{Product, ProductInput, RatingStats};

const PRODUCT_COLUMNS: &str = "id, product_code, name, description, price, sale_price, stock, \
     thumbnail_image, detail_image, category, manufacturer, country, status, created_at, updated_at";

/// Filters for product listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductFilter<'a> {
    /// Sub-categories to include. Empty means every category.
    pub categories: &'a [&'a str],
    /// Free-text keyword matched against name, code and manufacturer.
    pub keyword: Option<&'a str>,
    /// Only products with stock > 0.
    pub in_stock_only: bool,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// List products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: ProductFilter<'_>) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE (cardinality($1::TEXT[]) = 0 OR category = ANY($1))
              AND ($2::TEXT IS NULL OR name ILIKE $2 OR product_code ILIKE $2
                   OR manufacturer ILIKE $2)
              AND (NOT $3 OR stock > 0)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(filter.categories)
        .bind(like_pattern(filter.keyword))
        .bind(filter.in_stock_only)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Average rating and review count for a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn rating_stats(&self, id: ProductId) -> Result<RatingStats, RepositoryError> {
        let stats = sqlx::query_as::<_, RatingStats>(
            r"
            SELECT AVG(rating)::FLOAT8 AS average_rating, COUNT(*) AS review_count
            FROM reviews WHERE product_id = $1
            ",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product code is taken.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO products (name, product_code, description, price, sale_price, stock,
                                  category, manufacturer, country, status,
                                  thumbnail_image, detail_image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(&input.product_code)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.sale_price)
        .bind(input.stock)
        .bind(&input.category)
        .bind(&input.manufacturer)
        .bind(&input.country)
        .bind(input.status)
        .bind(&input.thumbnail_image)
        .bind(&input.detail_image)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("product code already exists"))?;

        Ok(product)
    }

    /// Update a product. Image columns keep their value when the input has none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE products SET
                name = $2, product_code = $3, description = $4, price = $5, sale_price = $6,
                stock = $7, category = $8, manufacturer = $9, country = $10, status = $11,
                thumbnail_image = COALESCE($12, thumbnail_image),
                detail_image = COALESCE($13, detail_image),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.product_code)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.sale_price)
        .bind(input.stock)
        .bind(&input.category)
        .bind(&input.manufacturer)
        .bind(&input.country)
        .bind(input.status)
        .bind(&input.thumbnail_image)
        .bind(&input.detail_image)
        .fetch_optional(self.pool)
        .await
        .map_err(conflict_on_unique("product code already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Change a product's sales status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_status(
        &self,
        id: ProductId,
        status: ProductStatus,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product.
    ///
    /// Cart lines, favorites, reviews and questions go with it (FK cascade);
    /// order items keep their name snapshot with a null product reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Whether a product code is already in use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn code_exists(&self, code: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE product_code = $1)")
                .bind(code)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }
}
