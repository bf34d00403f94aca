//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password accounts and JWT issue/verify
//! - `cart` - Cart lines, quantities and selection totals
//! - `orders` - Checkout, payment, cancellation and admin status changes
//! - `notifications` - Stored notifications plus WebSocket push
//! - `reviews`, `qna`, `notices` - Boards
//! - `favorites` - Wishlist
//! - `advertisements` - Admin ads and their push
//! - `catalog` - Cached product reads
//! - `uploads` - Image files under the upload directory
//! - `mail` - Verification code delivery
//!
//! Services borrow the pool (and the hub where they push) for one request.

pub mod advertisements;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod favorites;
pub mod mail;
pub mod notices;
pub mod notifications;
pub mod orders;
pub mod qna;
pub mod reviews;
pub mod uploads;

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors raised by domain services. The message is shown to the client.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Caller may not act on the entity.
    #[error("{0}")]
    Forbidden(String),

    /// Request violates a domain rule.
    #[error("{0}")]
    Invalid(String),

    /// Request conflicts with current state.
    #[error("{0}")]
    Conflict(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(what: impl Into<String>) -> Self {
        Self::Forbidden(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        Self::Invalid(what.into())
    }
}

/// Map a repository `NotFound` to a service `NotFound` with a message.
pub(crate) fn or_not_found(
    message: &'static str,
) -> impl FnOnce(RepositoryError) -> ServiceError {
    move |err| match err {
        RepositoryError::NotFound => ServiceError::NotFound(message.to_string()),
        other => ServiceError::Repository(other),
    }
}

/// Outcome of a bulk admin action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    pub success_count: usize,
    pub fail_count: usize,
}

/// Who is acting, as far as ownership checks care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: onandhome_core::UserId,
    pub role: onandhome_core::UserRole,
}

impl Actor {
    /// Whether the actor owns `owner`'s data or is an admin.
    #[must_use]
    pub fn may_manage(&self, owner: onandhome_core::UserId) -> bool {
        self.role.is_admin() || self.id == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onandhome_core::{UserId, UserRole};

    #[test]
    fn test_service_error_messages_are_public() {
        assert_eq!(
            ServiceError::invalid("재고가 부족합니다.").to_string(),
            "재고가 부족합니다."
        );
    }

    #[test]
    fn test_repository_not_found_maps_to_message() {
        let err = or_not_found("order not found")(RepositoryError::NotFound);
        assert!(matches!(err, ServiceError::NotFound(msg) if msg == "order not found"));
    }

    #[test]
    fn test_actor_ownership() {
        let owner = UserId::new(1);
        let user = Actor {
            id: owner,
            role: UserRole::User,
        };
        let stranger = Actor {
            id: UserId::new(2),
            role: UserRole::User,
        };
        let admin = Actor {
            id: UserId::new(3),
            role: UserRole::Admin,
        };

        assert!(user.may_manage(owner));
        assert!(!stranger.may_manage(owner));
        assert!(admin.may_manage(owner));
    }
}
