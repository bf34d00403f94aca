//! Withdrawn-account archive.

use sqlx::PgPool;

use onandhome_core::InactiveUserId;

use super::{RepositoryError, like_pattern};
use crate::models::user::InactiveUser;

const INACTIVE_COLUMNS: &str =
    "id, user_id, email, username, phone, gender, birth_date, address, created_at, deleted_at";

/// Repository for `inactive_users`.
pub struct InactiveUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InactiveUserRepository<'a> {
    /// Create a new archive repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Archived accounts matching a keyword on login id, name or email,
    /// most recently withdrawn first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, keyword: Option<&str>) -> Result<Vec<InactiveUser>, RepositoryError> {
        let users = sqlx::query_as::<_, InactiveUser>(&format!(
            r"
            SELECT {INACTIVE_COLUMNS} FROM inactive_users
            WHERE $1::TEXT IS NULL
               OR user_id ILIKE $1 OR username ILIKE $1 OR email ILIKE $1
            ORDER BY deleted_at DESC, id DESC
            "
        ))
        .bind(like_pattern(keyword))
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// One archived account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: InactiveUserId) -> Result<Option<InactiveUser>, RepositoryError> {
        let user = sqlx::query_as::<_, InactiveUser>(&format!(
            "SELECT {INACTIVE_COLUMNS} FROM inactive_users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Number of archived accounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inactive_users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Permanently delete archived accounts. Unknown ids are skipped.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purge(&self, ids: &[InactiveUserId]) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM inactive_users WHERE id = ANY($1)")
            .bind(ids)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
