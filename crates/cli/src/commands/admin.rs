//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! oh-cli admin create -u admin01 -e admin@onandhome.kr -n "관리자" -p 'long-password'
//! ```
//!
//! # Environment Variables
//!
//! - `ONANDHOME_DATABASE_URL` - `PostgreSQL` connection string

use onandhome_core::{UserId, UserRole};
use onandhome_server::services::auth::{AuthError, AuthService, Registration};
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Validation or uniqueness failure from the account service.
    #[error("Cannot create admin: {0}")]
    Account(#[from] AuthError),
}

/// Create a new admin account.
///
/// # Arguments
///
/// * `user_id` - Login id
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `password` - Initial password, at least 8 characters
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns `AdminError::Account` for an invalid or taken login id or email.
pub async fn create_user(
    user_id: &str,
    email: &str,
    name: &str,
    password: &str,
) -> Result<UserId, AdminError> {
    let database_url =
        super::database_url().ok_or(AdminError::MissingEnvVar("ONANDHOME_DATABASE_URL"))?;
    let pool = onandhome_server::db::create_pool(&database_url).await?;

    tracing::info!("Creating admin account: {} ({})", user_id, email);

    let registration = Registration {
        user_id: user_id.to_owned(),
        password: password.to_owned(),
        email: email.to_owned(),
        username: name.to_owned(),
        phone: None,
        gender: None,
        birth_date: None,
        address: None,
        marketing_consent: false,
        privacy_consent: true,
    };
    let user = AuthService::new(&pool)
        .create_account(registration, UserRole::Admin)
        .await?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Login: {}",
        user.id,
        user.user_id
    );
    Ok(user.id)
}
