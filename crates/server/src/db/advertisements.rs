//! Advertisement repository.

use sqlx::PgPool;

use onandhome_core::AdvertisementId;

use super::RepositoryError;
use crate::models::advertisement::{Advertisement, AdvertisementInput};

const AD_COLUMNS: &str =
    "id, title, content, image_url, link_url, active, sent_at, created_at, updated_at";

/// Repository for advertisement database operations.
pub struct AdvertisementRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdvertisementRepository<'a> {
    /// Create a new advertisement repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All advertisements, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Advertisement>, RepositoryError> {
        let rows = sqlx::query_as::<_, Advertisement>(&format!(
            "SELECT {AD_COLUMNS} FROM advertisements ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get an advertisement by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AdvertisementId) -> Result<Option<Advertisement>, RepositoryError> {
        let row = sqlx::query_as::<_, Advertisement>(&format!(
            "SELECT {AD_COLUMNS} FROM advertisements WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Create an advertisement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &AdvertisementInput) -> Result<Advertisement, RepositoryError> {
        let row = sqlx::query_as::<_, Advertisement>(&format!(
            r"
            INSERT INTO advertisements (title, content, image_url, link_url, active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {AD_COLUMNS}
            "
        ))
        .bind(&input.title)
        .bind(&input.content)
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(input.active)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Replace an advertisement's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the advertisement doesn't exist.
    pub async fn update(
        &self,
        id: AdvertisementId,
        input: &AdvertisementInput,
    ) -> Result<Advertisement, RepositoryError> {
        sqlx::query_as::<_, Advertisement>(&format!(
            r"
            UPDATE advertisements
            SET title = $2, content = $3, image_url = $4, link_url = $5, active = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {AD_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(input.active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete an advertisement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the advertisement doesn't exist.
    pub async fn delete(&self, id: AdvertisementId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM advertisements WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record that the advertisement was pushed to users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_sent(&self, id: AdvertisementId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE advertisements SET sent_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
