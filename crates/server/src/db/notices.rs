//! Notice repository.

use sqlx::PgPool;

use onandhome_core::NoticeId;

use super::{RepositoryError, like_pattern};
use crate::models::notice::Notice;

const NOTICE_COLUMNS: &str = "id, title, writer, content, created_at, updated_at";

/// Repository for notice database operations.
pub struct NoticeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NoticeRepository<'a> {
    /// Create a new notice repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a notice by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: NoticeId) -> Result<Option<Notice>, RepositoryError> {
        let notice = sqlx::query_as::<_, Notice>(&format!(
            "SELECT {NOTICE_COLUMNS} FROM notices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(notice)
    }

    /// Notices matching a keyword (or all), newest first, optionally limited.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        keyword: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<Notice>, RepositoryError> {
        let notices = sqlx::query_as::<_, Notice>(&format!(
            r"
            SELECT {NOTICE_COLUMNS} FROM notices
            WHERE $1::TEXT IS NULL OR title ILIKE $1 OR content ILIKE $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "
        ))
        .bind(like_pattern(keyword))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(notices)
    }

    /// Create a notice.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        title: &str,
        writer: &str,
        content: &str,
    ) -> Result<Notice, RepositoryError> {
        let notice = sqlx::query_as::<_, Notice>(&format!(
            "INSERT INTO notices (title, writer, content) VALUES ($1, $2, $3) RETURNING {NOTICE_COLUMNS}"
        ))
        .bind(title)
        .bind(writer)
        .bind(content)
        .fetch_one(self.pool)
        .await?;
        Ok(notice)
    }

    /// Update a notice.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notice doesn't exist.
    pub async fn update(
        &self,
        id: NoticeId,
        title: &str,
        content: &str,
    ) -> Result<Notice, RepositoryError> {
        sqlx::query_as::<_, Notice>(&format!(
            r"
            UPDATE notices SET title = $2, content = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {NOTICE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(title)
        .bind(content)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a notice.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notice doesn't exist.
    pub async fn delete(&self, id: NoticeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM notices WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
