//! Request ID middleware for request tracing and correlation.
//!
//! Reuses an upstream `x-request-id` when it is short and printable,
//! otherwise generates a UUID v4. The ID is recorded in the tracing span,
//! tagged on the Sentry scope and echoed in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_UPSTREAM_ID_LEN: usize = 128;

/// Pick the upstream ID if it is usable, else mint one.
fn resolve_request_id(upstream: Option<&str>) -> String {
    upstream
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_UPSTREAM_ID_LEN
                && id.chars().all(|c| c.is_ascii_graphic())
        })
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = resolve_request_id(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok()),
    );

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_reused() {
        assert_eq!(resolve_request_id(Some(" abc-123 ")), "abc-123");
    }

    #[test]
    fn test_unusable_ids_replaced() {
        let minted = resolve_request_id(None);
        assert!(Uuid::parse_str(&minted).is_ok());

        let long = "x".repeat(MAX_UPSTREAM_ID_LEN + 1);
        assert_ne!(resolve_request_id(Some(&long)), long);
        assert_ne!(resolve_request_id(Some("has space")), "has space");
        assert!(Uuid::parse_str(&resolve_request_id(Some(""))).is_ok());
    }
}
