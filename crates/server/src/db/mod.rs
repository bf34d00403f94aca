//! Database operations for `PostgreSQL`.
//!
//! # Database: `onandhome`
//!
//! ## Tables
//!
//! - `users`, `inactive_users` - Accounts and the withdrawal archive
//! - `products` - Catalog with stock and sales status
//! - `cart_items` - One row per (user, product)
//! - `orders`, `order_items` - Orders with product name/price snapshots
//! - `reviews`, `review_images`, `review_likes`, `review_replies`
//! - `qnas`, `qna_images`, `qna_replies`
//! - `notices`, `notifications`, `favorites`, `advertisements`
//! - `company_info` - Single row shown in the storefront footer
//! - `email_verifications` - Password-reset codes
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p onandhome-cli -- migrate
//! ```

pub mod advertisements;
pub mod cart;
pub mod company;
pub mod dashboard;
pub mod favorites;
pub mod inactive_users;
pub mod notices;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod qna;
pub mod reviews;
pub mod users;
pub mod verifications;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message.to_owned());
        }
        RepositoryError::Database(e)
    }
}

/// Build an `ILIKE` pattern from a free-text keyword, escaping wildcards.
///
/// Returns `None` for a missing or blank keyword so callers can skip the filter.
#[must_use]
pub fn like_pattern(keyword: Option<&str>) -> Option<String> {
    let keyword = keyword.map(str::trim).filter(|k| !k.is_empty())?;
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern(Some("냉장고")).as_deref(), Some("%냉장고%"));
        assert_eq!(like_pattern(Some("  ")), None);
        assert_eq!(like_pattern(None), None);
        assert_eq!(like_pattern(Some("50%_off")).as_deref(), Some("%50\\%\\_off%"));
    }

    #[test]
    fn test_repository_error_display() {
        assert_eq!(RepositoryError::NotFound.to_string(), "not found");
        assert_eq!(
            RepositoryError::Conflict("email already exists".into()).to_string(),
            "conflict: email already exists"
        );
    }
}
