//! Account types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use onandhome_core::{Email, InactiveUserId, RecipientProfile, UserId, UserRole};

/// An account row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Primary key.
    pub id: UserId,
    /// Login id (unique).
    pub user_id: String,
    /// Argon2id PHC string.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Email,
    pub username: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    /// Social login origin, if any.
    pub provider: Option<String>,
    #[serde(skip_serializing)]
    pub provider_id: Option<String>,
    pub role: UserRole,
    pub active: bool,
    pub marketing_consent: bool,
    pub privacy_consent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Eligibility inputs for notifications.
    #[must_use]
    pub const fn recipient_profile(&self) -> RecipientProfile {
        RecipientProfile {
            role: self.role,
            active: self.active,
            marketing_consent: self.marketing_consent,
        }
    }
}

/// A withdrawn account kept in the archive.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InactiveUser {
    pub id: InactiveUserId,
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: DateTime<Utc>,
}

/// Wrong guesses allowed before a code stops being accepted.
pub const MAX_CODE_ATTEMPTS: i32 = 5;

/// A password-reset code mailed to an address.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailVerification {
    pub id: i32,
    pub email: String,
    pub code: String,
    pub attempts: i32,
    /// Set once the owner typed the code back.
    pub verified: bool,
    /// Set when a reset spent the code.
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of matching a typed code against the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Accepted,
    Mismatch,
    /// Expired, spent, or out of attempts.
    Stale,
}

impl EmailVerification {
    /// Whether the code can still be redeemed at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && self.attempts < MAX_CODE_ATTEMPTS && now < self.expires_at
    }

    /// Match `code` against this row.
    #[must_use]
    pub fn check(&self, code: &str, now: DateTime<Utc>) -> CodeCheck {
        if !self.is_live(now) {
            CodeCheck::Stale
        } else if self.code.trim() == code.trim() {
            CodeCheck::Accepted
        } else {
            CodeCheck::Mismatch
        }
    }
}

/// Fields for a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: String,
    pub password_hash: String,
    pub email: Email,
    pub username: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub role: UserRole,
    pub marketing_consent: bool,
    pub privacy_consent: bool,
}

/// Editable profile fields. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub marketing_consent: Option<bool>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_json_hides_credentials() {
        let now = Utc::now();
        let user = User {
            id: UserId::new(7),
            user_id: "shopper_01".into(),
            password_hash: "$argon2id$v=19$...".into(),
            email: Email::parse("shopper@onandhome.kr").unwrap(),
            username: "김철수".into(),
            phone: None,
            gender: None,
            birth_date: None,
            address: None,
            provider: Some("kakao".into()),
            provider_id: Some("123".into()),
            role: UserRole::User,
            active: true,
            marketing_consent: false,
            privacy_consent: true,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userId"], "shopper_01");
        assert_eq!(json["role"], 1);
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("providerId").is_none());
    }

    fn verification(code: &str, expires_in: chrono::Duration) -> EmailVerification {
        let now = Utc::now();
        EmailVerification {
            id: 1,
            email: "shopper@onandhome.kr".into(),
            code: code.into(),
            attempts: 0,
            verified: false,
            consumed: false,
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn test_code_check_accepts_matching_code() {
        let row = verification("042917", chrono::Duration::minutes(5));
        assert_eq!(row.check("042917", Utc::now()), CodeCheck::Accepted);
        assert_eq!(row.check(" 042917 ", Utc::now()), CodeCheck::Accepted);
        assert_eq!(row.check("042918", Utc::now()), CodeCheck::Mismatch);
    }

    #[test]
    fn test_code_check_refuses_expired_spent_or_exhausted_codes() {
        let expired = verification("123456", chrono::Duration::seconds(-1));
        assert_eq!(expired.check("123456", Utc::now()), CodeCheck::Stale);

        let mut spent = verification("123456", chrono::Duration::minutes(5));
        spent.consumed = true;
        assert_eq!(spent.check("123456", Utc::now()), CodeCheck::Stale);

        let mut exhausted = verification("123456", chrono::Duration::minutes(5));
        exhausted.attempts = MAX_CODE_ATTEMPTS;
        assert_eq!(exhausted.check("123456", Utc::now()), CodeCheck::Stale);
    }
}
