//! Authentication service.
//!
//! Password accounts with argon2id hashes, plus the HS256 tokens handed to
//! clients after login.

mod error;
pub mod token;

pub use error::{AuthError, TokenError};
pub use token::{Claims, TokenKind, TokenPair, TokenService};

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{NaiveDate, TimeDelta, Utc};
use regex::Regex;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use onandhome_core::{Email, InactiveUserId, UserId, UserRole};

use super::BulkResult;
use super::mail::{CODE_TTL_SECONDS, CodeSender, generate_verification_code};
use crate::db::RepositoryError;
use crate::db::inactive_users::InactiveUserRepository;
use crate::db::users::UserRepository;
use crate::db::verifications::VerificationRepository;
use crate::models::user::{CodeCheck, InactiveUser, NewUser, ProfileUpdate, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

static LOGIN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{4,20}$").expect("Invalid regex"));

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user_id: String,
    pub password: String,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    #[serde(default)]
    pub marketing_consent: bool,
    #[serde(default = "default_privacy_consent")]
    pub privacy_consent: bool,
}

const fn default_privacy_consent() -> bool {
    true
}

/// Authentication service.
///
/// Handles registration, login and password changes.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    archive: InactiveUserRepository<'a>,
    codes: VerificationRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            archive: InactiveUserRepository::new(pool),
            codes: VerificationRepository::new(pool),
        }
    }

    /// Register a shopper account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUserId`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` for bad input, and `AuthError::UserIdTaken`
    /// or `AuthError::EmailTaken` when either is already registered.
    #[instrument(skip(self, registration), fields(login_id = %registration.user_id))]
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        self.create_account(registration, UserRole::User).await
    }

    /// Create an account with an explicit role.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    pub async fn create_account(
        &self,
        registration: Registration,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let login_id = registration.user_id.trim().to_string();
        validate_login_id(&login_id)?;
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;

        if self.users.login_id_exists(&login_id).await? {
            return Err(AuthError::UserIdTaken);
        }
        if self.users.email_exists(&email).await? {
            return Err(AuthError::EmailTaken);
        }

        let new_user = NewUser {
            user_id: login_id,
            password_hash: hash_password(&registration.password)?,
            email,
            username: registration.username.trim().to_string(),
            phone: registration.phone,
            gender: registration.gender,
            birth_date: registration.birth_date,
            address: registration.address,
            role,
            marketing_consent: registration.marketing_consent,
            privacy_consent: registration.privacy_consent,
        };

        // Unique constraints catch a concurrent sign-up with the same id.
        self.users.create(&new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserIdTaken,
            other => AuthError::Repository(other),
        })
    }

    /// Log in with login id and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown id or wrong
    /// password, and `AuthError::Inactive` for a deactivated account.
    #[instrument(skip(self, password))]
    pub async fn login(&self, login_id: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .users
            .get_by_login_id(login_id.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        if !user.active {
            return Err(AuthError::Inactive);
        }
        Ok(user)
    }

    /// Load a user by primary key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn get_user(&self, id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update profile fields. Blank strings are stored as given.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed email and
    /// `AuthError::EmailTaken` if another account already uses it.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, id: UserId, update: &ProfileUpdate) -> Result<User, AuthError> {
        let email = update.email.as_deref().map(Email::parse).transpose()?;
        self.users
            .update_profile(id, update, email.as_ref())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })
    }

    /// Withdraw an account: archive it and delete everything it owns.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    #[instrument(skip(self))]
    pub async fn withdraw(&self, id: UserId) -> Result<(), AuthError> {
        self.users.withdraw(id).await.map_err(|e| match e {
            RepositoryError::NotFound => AuthError::UserNotFound,
            other => AuthError::Repository(other),
        })?;
        tracing::info!(user_id = %id, "Account withdrawn");
        Ok(())
    }

    /// Withdraw several accounts, counting successes and failures.
    pub async fn withdraw_many(&self, ids: &[UserId]) -> BulkResult {
        let mut result = BulkResult::default();
        for &id in ids {
            match self.withdraw(id).await {
                Ok(()) => result.success_count += 1,
                Err(e) => {
                    tracing::warn!(user_id = %id, error = %e, "Bulk withdrawal failed");
                    result.fail_count += 1;
                }
            }
        }
        result
    }

    /// Accounts matching a login id, name or email keyword.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn search_users(&self, keyword: Option<&str>) -> Result<Vec<User>, AuthError> {
        Ok(self.users.search(keyword).await?)
    }

    /// The withdrawn-account archive, optionally filtered by keyword.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn inactive_users(&self, keyword: Option<&str>) -> Result<Vec<InactiveUser>, AuthError> {
        Ok(self.archive.search(keyword).await?)
    }

    /// One archived account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the id is not in the archive.
    pub async fn inactive_user(&self, id: InactiveUserId) -> Result<InactiveUser, AuthError> {
        self.archive.get(id).await?.ok_or(AuthError::UserNotFound)
    }

    /// Number of archived accounts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn count_inactive_users(&self) -> Result<i64, AuthError> {
        Ok(self.archive.count().await?)
    }

    /// Permanently delete one archived account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the id is not in the archive.
    #[instrument(skip(self))]
    pub async fn purge_inactive_user(&self, id: InactiveUserId) -> Result<(), AuthError> {
        if self.archive.purge(&[id]).await? == 0 {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(inactive_user_id = %id, "Archived account purged");
        Ok(())
    }

    /// Permanently delete several archived accounts, returning how many went.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the delete fails.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn purge_inactive_users(&self, ids: &[InactiveUserId]) -> Result<u64, AuthError> {
        let deleted = self.archive.purge(ids).await?;
        tracing::info!(deleted, "Archived accounts purged");
        Ok(deleted)
    }

    /// Change a password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong and
    /// `AuthError::WeakPassword` if `new_password` is too short.
    #[instrument(skip(self, current, new_password))]
    pub async fn change_password(
        &self,
        id: UserId,
        current: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self.get_user(id).await?;
        verify_password(current, &user.password_hash)?;
        validate_password(new_password)?;

        self.users
            .update_password(id, &hash_password(new_password)?)
            .await?;
        Ok(())
    }

    /// Mail a password-reset code to `email`.
    ///
    /// Unknown addresses get no code but the same answer, so the endpoint
    /// does not reveal which addresses hold accounts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address.
    #[instrument(skip(self, email, sender))]
    pub async fn send_reset_code(
        &self,
        email: &str,
        sender: &dyn CodeSender,
    ) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        if self.users.get_by_email(&email).await?.is_none() {
            tracing::info!(to = %email.masked(), "Reset code requested for unknown address");
            return Ok(());
        }

        let code = generate_verification_code();
        let expires_at = Utc::now() + TimeDelta::seconds(CODE_TTL_SECONDS);
        self.codes.issue(&email, &code, expires_at).await?;
        sender.send_password_reset_code(&email, &code);
        Ok(())
    }

    /// Confirm that the caller received the code mailed to `email`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` if the code is wrong, expired,
    /// already spent or out of attempts.
    #[instrument(skip(self, email, code))]
    pub async fn verify_reset_code(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let row = self
            .codes
            .latest(&email)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        match row.check(code, Utc::now()) {
            CodeCheck::Accepted => {
                self.codes.mark_verified(row.id).await?;
                Ok(())
            }
            CodeCheck::Mismatch => {
                self.codes.record_miss(row.id).await?;
                Err(AuthError::InvalidCode)
            }
            CodeCheck::Stale => Err(AuthError::InvalidCode),
        }
    }

    /// Set a new password for the account registered under `email`.
    ///
    /// `code` must be the verified, unexpired code last mailed to the
    /// address. It is spent together with the password change.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` without a verified live code and
    /// `AuthError::UserNotFound` if no account uses the email.
    #[instrument(skip(self, email, code, new_password))]
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        validate_password(new_password)?;

        let row = self
            .codes
            .latest(&email)
            .await?
            .ok_or(AuthError::InvalidCode)?;
        match row.check(code, Utc::now()) {
            CodeCheck::Accepted if row.verified => {}
            CodeCheck::Mismatch => {
                self.codes.record_miss(row.id).await?;
                return Err(AuthError::InvalidCode);
            }
            _ => return Err(AuthError::InvalidCode),
        }

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let redeemed = self
            .codes
            .redeem_for_password(row.id, user.id, &hash_password(new_password)?)
            .await?;
        if !redeemed {
            return Err(AuthError::InvalidCode);
        }

        tracing::info!(user_id = %user.id, "Password reset with mailed code");
        Ok(())
    }
}

/// Check the login id shape.
fn validate_login_id(login_id: &str) -> Result<(), AuthError> {
    if LOGIN_ID.is_match(login_id) {
        Ok(())
    } else {
        Err(AuthError::InvalidUserId)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "비밀번호는 최소 {MIN_PASSWORD_LENGTH}자 이상이어야 합니다."
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_id_shape() {
        assert!(validate_login_id("shop_01").is_ok());
        assert!(validate_login_id("abcd").is_ok());
        assert!(validate_login_id("abc").is_err());
        assert!(validate_login_id("a".repeat(21).as_str()).is_err());
        assert!(validate_login_id("bad-id").is_err());
        assert!(validate_login_id("한글아이디").is_err());
    }

    #[test]
    fn test_password_minimum_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long-enough").is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_registration_defaults() {
        let registration: Registration = serde_json::from_value(serde_json::json!({
            "userId": "shopper_01",
            "password": "password123",
            "email": "shopper@onandhome.kr",
            "username": "김철수"
        }))
        .unwrap();
        assert!(!registration.marketing_consent);
        assert!(registration.privacy_consent);
    }
}
