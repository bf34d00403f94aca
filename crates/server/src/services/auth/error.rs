//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] onandhome_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account is deactivated.
    #[error("account is inactive")]
    Inactive,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Login id already registered.
    #[error("login id already exists")]
    UserIdTaken,

    /// Email already registered.
    #[error("email already exists")]
    EmailTaken,

    /// Login id has the wrong shape.
    #[error("invalid login id")]
    InvalidUserId,

    /// Reset code wrong, expired, spent or never verified.
    #[error("invalid or expired verification code")]
    InvalidCode,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// Reasons a bearer token is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No token was presented.
    #[error("Authentication required")]
    Missing,

    /// Not three base64url segments or undecodable claims.
    #[error("Malformed token")]
    Malformed,

    /// Signature does not match.
    #[error("Invalid token signature")]
    BadSignature,

    /// `exp` is in the past.
    #[error("Token expired")]
    Expired,

    /// A refresh token was used where an access token is required, or vice versa.
    #[error("Wrong token type")]
    WrongType,
}
