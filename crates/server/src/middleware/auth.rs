//! JWT authentication extractors.
//!
//! Tokens come from `Authorization: Bearer <jwt>`, or from the `token` query
//! parameter (the WebSocket handshake cannot set headers from a browser).
//!
//! # Example
//!
//! ```rust,ignore
//! async fn handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
//!     format!("Hello, {}!", user.login_id)
//! }
//! ```

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;

use onandhome_core::{UserId, UserRole};

use crate::error::AppError;
use crate::services::Actor;
use crate::services::auth::{Claims, TokenError, TokenKind};
use crate::state::AppState;

/// The authenticated caller, decoded from an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub login_id: String,
    pub role: UserRole,
    pub marketing_consent: bool,
}

impl AuthUser {
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            login_id: claims.user_id,
            role: claims.role,
            marketing_consent: claims.marketing_consent,
        }
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// The raw token presented with a request, if any.
#[must_use]
pub fn presented_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from);

    from_header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.token)
            .filter(|token| !token.is_empty())
    })
}

/// Verify the presented token as `kind`.
///
/// # Errors
///
/// Returns `TokenError::Missing` when no token is presented, otherwise the
/// verification failure.
pub fn verify_presented(parts: &Parts, state: &AppState, kind: TokenKind) -> Result<Claims, TokenError> {
    let token = presented_token(parts).ok_or(TokenError::Missing)?;
    state.tokens().verify(&token, kind)
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthUser, AppError> {
    let claims = verify_presented(parts, state, TokenKind::Access).inspect_err(|e| {
        tracing::debug!(error = %e, path = %parts.uri.path(), "Token rejected");
    })?;
    let user = AuthUser::from(claims);
    tracing::Span::current().record("user_id", user.login_id.as_str());
    Ok(user)
}

/// Full claims of a valid access token.
pub struct AccessClaims(pub Claims);

impl FromRequestParts<AppState> for AccessClaims {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(verify_presented(parts, state, TokenKind::Access)?))
    }
}

/// Claims of a valid refresh token, presented as the bearer.
pub struct RefreshClaims(pub Claims);

impl FromRequestParts<AppState> for RefreshClaims {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(verify_presented(parts, state, TokenKind::Refresh)?))
    }
}

/// Extractor that requires a valid access token. Rejects with 401.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(Self)
    }
}

/// Extractor that requires an admin access token. Rejects with 401 or 403.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state)?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.login_id, path = %parts.uri.path(), "Admin route refused");
            return Err(AppError::Forbidden("관리자 권한이 필요합니다.".to_string()));
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the caller. Invalid tokens count as anonymous.
pub struct OptionalAuth(pub Option<AuthUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticate(parts, state).ok()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_bearer_header_wins_over_query() {
        let parts = parts(
            Request::builder()
                .uri("/ws?token=from-query")
                .header(AUTHORIZATION, "Bearer from-header")
                .body(())
                .unwrap(),
        );
        assert_eq!(presented_token(&parts).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_query_token_fallback() {
        let parts = parts(Request::builder().uri("/ws?token=abc.def.ghi").body(()).unwrap());
        assert_eq!(presented_token(&parts).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_non_bearer_schemes_ignored() {
        let parts = parts(
            Request::builder()
                .uri("/api/cart")
                .header(AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(())
                .unwrap(),
        );
        assert_eq!(presented_token(&parts), None);

        let empty = self::parts(Request::builder().uri("/api/cart?token=").body(()).unwrap());
        assert_eq!(presented_token(&empty), None);
    }
}
