//! Password-reset code repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use onandhome_core::{Email, UserId};

use super::RepositoryError;
use crate::models::user::EmailVerification;

const VERIFICATION_COLUMNS: &str =
    "id, email, code, attempts, verified, consumed, created_at, expires_at";

/// Repository for `email_verifications`.
pub struct VerificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VerificationRepository<'a> {
    /// Create a new verification repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a fresh code for `email`.
    ///
    /// Drops any unspent code for the address, along with rows of any address
    /// that expired more than a day ago.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn issue(
        &self,
        email: &Email,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<EmailVerification, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            DELETE FROM email_verifications
            WHERE (email = $1 AND NOT consumed)
               OR expires_at < NOW() - INTERVAL '1 day'
            ",
        )
        .bind(email)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, EmailVerification>(&format!(
            r"
            INSERT INTO email_verifications (email, code, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {VERIFICATION_COLUMNS}
            "
        ))
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// The newest unspent code for `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(&self, email: &Email) -> Result<Option<EmailVerification>, RepositoryError> {
        let row = sqlx::query_as::<_, EmailVerification>(&format!(
            r"
            SELECT {VERIFICATION_COLUMNS} FROM email_verifications
            WHERE email = $1 AND NOT consumed
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Count a wrong guess against a code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_miss(&self, id: i32) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE email_verifications SET attempts = attempts + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Mark a code as typed back by the owner of the address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_verified(&self, id: i32) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE email_verifications SET verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Spend a verified code and set the account password in one transaction.
    ///
    /// Returns `false` without touching the password when the code was
    /// already spent, never verified, or has expired.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user row is gone.
    pub async fn redeem_for_password(
        &self,
        id: i32,
        user: UserId,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            r"
            UPDATE email_verifications SET consumed = TRUE
            WHERE id = $1 AND verified AND NOT consumed AND expires_at > NOW()
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            return Ok(false);
        }

        let updated =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(user)
                .bind(password_hash)
                .execute(&mut *tx)
                .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(true)
    }
}
