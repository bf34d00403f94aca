//! Account roles.

use serde::{Deserialize, Serialize};

/// Role of an account.
///
/// Stored and serialized as a numeric code (`0` admin, `1` user) because the
/// web client and the JWT claims compare against the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(into = "i16", try_from = "i16")]
pub enum UserRole {
    /// Back-office administrator.
    Admin,
    /// Regular shopper.
    #[default]
    User,
}

impl UserRole {
    /// Numeric code of the role.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Admin => 0,
            Self::User => 1,
        }
    }

    /// Whether this is the admin role.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl From<UserRole> for i16 {
    fn from(role: UserRole) -> Self {
        role.code()
    }
}

impl TryFrom<i16> for UserRole {
    type Error = String;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Admin),
            1 => Ok(Self::User),
            other => Err(format!("invalid role code: {other}")),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" | "0" => Ok(Self::Admin),
            "user" | "1" => Ok(Self::User),
            other => Err(format!("invalid role: {other}")),
        }
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for UserRole {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for UserRole {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let code = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::try_from(code)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for UserRole {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.code(), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_code() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "0");
        assert_eq!(serde_json::to_string(&UserRole::User).unwrap(), "1");
    }

    #[test]
    fn test_deserialize_rejects_unknown_code() {
        assert_eq!(serde_json::from_str::<UserRole>("0").unwrap(), UserRole::Admin);
        assert!(serde_json::from_str::<UserRole>("7").is_err());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("1".parse::<UserRole>().unwrap(), UserRole::User);
        assert!("root".parse::<UserRole>().is_err());
    }
}
