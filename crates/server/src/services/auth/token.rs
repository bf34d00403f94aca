//! HS256 JSON Web Tokens.
//!
//! Signing and verification go through `jsonwebtoken`. Expiry is checked
//! with no leeway, and the `typ` claim separates access from refresh tokens.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use onandhome_core::{UserId, UserRole};

use super::TokenError;
use crate::config::JwtConfig;
use crate::models::user::User;

/// Which of the pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Primary key of the account.
    pub id: UserId,
    /// Login id.
    pub user_id: String,
    pub role: UserRole,
    pub marketing_consent: bool,
    pub typ: TokenKind,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// An access/refresh pair handed out at login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies tokens with the configured secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("key", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenService {
    /// Key a token service with the configured secret.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    /// Issue an access and a refresh token for `user`.
    #[must_use]
    pub fn issue_pair(&self, user: &User) -> TokenPair {
        TokenPair {
            access_token: self.issue(user, TokenKind::Access),
            refresh_token: self.issue(user, TokenKind::Refresh),
        }
    }

    /// Issue one token of the given kind.
    #[must_use]
    pub fn issue(&self, user: &User, kind: TokenKind) -> String {
        let now = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            id: user.id,
            user_id: user.user_id.clone(),
            role: user.role,
            marketing_consent: user.marketing_consent,
            typ: kind,
            iat: now,
            exp: now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
        };
        self.sign(&claims)
    }

    /// Sign arbitrary claims.
    #[must_use]
    pub fn sign(&self, claims: &Claims) -> String {
        // HMAC signing of plain serde claims has no failure path.
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .unwrap_or_default()
    }

    /// Verify a token and check that it is of the `expected` kind.
    ///
    /// # Errors
    ///
    /// Returns the matching `TokenError` for malformed, forged, expired or
    /// wrong-kind tokens.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = jsonwebtoken::decode::<Claims>(token.trim(), &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })?
            .claims;

        if claims.typ != expected {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use secrecy::SecretString;

    fn service() -> TokenService {
        TokenService::new(&test_config().jwt)
    }

    fn claims(typ: TokenKind, exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            id: UserId::new(42),
            user_id: "shopper_01".to_string(),
            role: UserRole::User,
            marketing_consent: true,
            typ,
            iat: now,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn test_round_trip_preserves_claims() {
        let tokens = service();
        let original = claims(TokenKind::Access, 600);
        let token = tokens.sign(&original);

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(tokens.verify(&token, TokenKind::Access).unwrap(), original);
    }

    #[test]
    fn test_claims_use_camel_case_and_numeric_role() {
        let json = serde_json::to_value(claims(TokenKind::Refresh, 60)).unwrap();
        assert_eq!(json["userId"], "shopper_01");
        assert_eq!(json["role"], 1);
        assert_eq!(json["marketingConsent"], true);
        assert_eq!(json["typ"], "refresh");
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let tokens = service();
        let token = tokens.sign(&claims(TokenKind::Access, 600));

        let mut forged = claims(TokenKind::Access, 600);
        forged.role = UserRole::Admin;
        let mut config = test_config().jwt;
        config.secret = SecretString::from("Zr8Ty3Lp0Qw5Vn2Xk7Mb4Hs9Dc6Fg1Ja@");
        let forged_token = TokenService::new(&config).sign(&forged);

        // Admin claims spliced under the genuine signature.
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged_token.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert_eq!(
            tokens.verify(&tampered, TokenKind::Access),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_token_just_past_expiry_is_rejected() {
        let tokens = service();
        let token = tokens.sign(&claims(TokenKind::Access, -1));
        assert_eq!(
            tokens.verify(&token, TokenKind::Access),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let mut config = test_config().jwt;
        config.secret = SecretString::from("Zr8Ty3Lp0Qw5Vn2Xk7Mb4Hs9Dc6Fg1Ja@");
        let other = TokenService::new(&config);
        let token = other.sign(&claims(TokenKind::Access, 600));

        assert_eq!(
            service().verify(&token, TokenKind::Access),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = service();
        let token = tokens.sign(&claims(TokenKind::Access, -5));
        assert_eq!(
            tokens.verify(&token, TokenKind::Access),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_refresh_token_cannot_be_used_as_access() {
        let tokens = service();
        let token = tokens.sign(&claims(TokenKind::Refresh, 600));
        assert_eq!(
            tokens.verify(&token, TokenKind::Access),
            Err(TokenError::WrongType)
        );
        assert!(tokens.verify(&token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_malformed_tokens() {
        let tokens = service();
        for token in ["", "abc", "a.b", "a.b.!!!", "not.a.jwt"] {
            assert_eq!(
                tokens.verify(token, TokenKind::Access),
                Err(TokenError::Malformed),
                "{token}"
            );
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", service());
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("access_ttl"));
    }
}
