//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span, echoed in the response)
//! 4. Security headers
//! 5. CORS
//! 6. Rate limiting (governor), per route group
//!
//! Authentication is not a layer: handlers opt in through the `RequireAuth`,
//! `RequireAdmin` and `OptionalAuth` extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{AccessClaims, AuthUser, OptionalAuth, RefreshClaims, RequireAdmin, RequireAuth};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
