//! HTTP route handlers for the OnAndHome API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database)
//! GET  /ws                              - STOMP over WebSocket
//! GET  /uploads/*                       - Uploaded images
//!
//! # Users (/api/user)
//! POST /register, /login, /refresh, /reset-password   (auth rate limit)
//! GET|PUT /info, PUT /password, DELETE /account
//! GET  /{id}, /username/{userId}, /session-info, /advertisements/{id}
//!
//! # Password reset codes (/api/email, auth rate limit)
//! POST /send-password-reset-code, /verify-password-reset-code
//!
//! # Catalog (/api/products)
//! GET  /list, /search, /category/{category}, /categories, /{id}
//!
//! # Cart (/api/cart)
//! GET  /, /count   POST /add, /summary   PUT|DELETE /{id}   DELETE /clear/all
//!
//! # Orders (/api/orders)
//! POST /create, /cart/create   GET /my, /user/{userId}, /{id}, /{id}/track
//! POST /{id}/pay, /{id}/cancel, /{id}/hide, /{id}/unhide
//!
//! # Boards (/api/reviews, /api/qna, /api/notices)
//! GET  /, /{id}, /recent, /my, /search, /product/{productId}
//! POST /, /{id}/replies, /{id}/like   PUT|DELETE /{id}
//!
//! # Notifications, favorites, company, uploads
//! /api/notifications, /api/favorites, /api/company/info, /api/upload/image
//!
//! # Back office (/api/admin, admin only)
//! /dashboard, /users, /inactive-users, /products, /orders, /advertisements,
//! /reviews, /qna
//! ```

pub mod admin;
pub mod cart;
pub mod company;
pub mod email;
pub mod favorites;
pub mod notices;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod qna;
pub mod reviews;
pub mod uploads;
pub mod users;
pub mod ws;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{
        HeaderName, HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::request_id::REQUEST_ID_HEADER;
use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/refresh", post(users::refresh))
        .route("/reset-password", post(users::reset_password))
        .route_layer(auth_rate_limiter())
        .route("/info", get(users::info).put(users::update_info))
        .route("/password", put(users::change_password))
        .route("/account", delete(users::withdraw))
        .route("/session-info", get(users::session_info))
        .route("/advertisements/{id}", get(users::advertisement))
        .route("/username/{userId}", get(users::get_by_login_id))
        .route("/{id}", get(users::get_by_id))
}

/// Create the e-mail verification routes router.
pub fn email_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/send-password-reset-code",
            post(email::send_password_reset_code),
        )
        .route(
            "/verify-password-reset-code",
            post(email::verify_password_reset_code),
        )
        .route_layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(products::list))
        .route("/search", get(products::search))
        .route("/categories", get(products::categories))
        .route("/category/{category}", get(products::by_category))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/summary", post(cart::summary))
        .route("/clear/all", delete(cart::clear))
        .route("/{id}", put(cart::update).delete(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(orders::create))
        .route("/cart/create", post(orders::create_from_cart))
        .route("/my", get(orders::mine))
        .route("/user/{userId}", get(orders::for_user))
        .route("/{id}", get(orders::show))
        .route("/{id}/track", get(orders::track))
        .route("/{id}/pay", post(orders::pay))
        .route("/{id}/cancel", post(orders::cancel))
        .route("/{id}/hide", post(orders::hide))
        .route("/{id}/unhide", post(orders::unhide))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(reviews::create))
        .route("/recent", get(reviews::recent))
        .route("/my", get(reviews::mine))
        .route("/search", get(reviews::search))
        .route("/product/{productId}", get(reviews::for_product))
        .route("/replies/{replyId}", delete(reviews::delete_reply))
        .route(
            "/{id}",
            get(reviews::show)
                .put(reviews::update)
                .delete(reviews::delete),
        )
        .route("/{id}/like", post(reviews::toggle_like))
        .route("/{id}/replies", post(reviews::add_reply))
}

/// Create the Q&A routes router.
pub fn qna_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(qna::create))
        .route("/recent", get(qna::recent))
        .route("/my", get(qna::mine))
        .route("/search", get(qna::search))
        .route("/product/{productId}", get(qna::for_product))
        .route("/{id}", get(qna::show).put(qna::update).delete(qna::delete))
        .route("/{id}/replies", post(qna::add_reply))
}

/// Create the notice routes router.
pub fn notice_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notices::list).post(notices::create))
        .route("/recent", get(notices::recent))
        .route("/search", get(notices::search))
        .route(
            "/{id}",
            get(notices::show)
                .put(notices::update)
                .delete(notices::delete),
        )
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list))
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", put(notifications::mark_all_read))
        .route("/admin/bulk", post(notifications::bulk))
        .route("/{id}", delete(notifications::delete))
        .route("/{id}/read", put(notifications::mark_read))
}

/// Create the favorite routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::list))
        .route("/toggle", post(favorites::toggle))
        .route("/count", get(favorites::count))
        .route("/check/{productId}", get(favorites::check))
        .route("/count/product/{productId}", get(favorites::count_for_product))
        .route("/product/{productId}", delete(favorites::remove))
}

/// Create the `/api` router. Multipart endpoints accept up to
/// `max_upload_bytes`.
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .nest("/user", user_routes())
        .nest("/email", email_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/reviews", review_routes())
        .nest("/qna", qna_routes())
        .nest("/notices", notice_routes())
        .nest("/notifications", notification_routes())
        .nest("/favorites", favorite_routes())
        .route("/company/info", get(company::show).post(company::upsert))
        .route(
            "/upload/image",
            post(uploads::upload)
                .delete(uploads::delete)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .nest(
            "/admin",
            admin::routes().layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .layer(api_rate_limiter())
}

/// CORS for the configured storefront origins, credentials included.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Build the full application, minus the Sentry layers added in `main`.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let cors = cors_layer(&config.cors_origins);
    let uploads = ServeDir::new(&config.upload_dir);
    let max_upload_bytes = config.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/ws", get(ws::upgrade))
        .nest("/api", api_routes(max_upload_bytes))
        .nest_service("/uploads", uploads)
        .layer(cors)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::config::test_config;

    fn test_app() -> Router {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/onandhome_test")
            .unwrap();
        app(AppState::new(config, pool))
    }

    fn api_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_carries_security_headers_and_request_id() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(REQUEST_ID_HEADER, "req-health-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-health-1");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_protected_route_without_token_is_unauthorized() {
        let response = test_app()
            .oneshot(api_request(Method::GET, "/api/cart"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "로그인이 필요합니다.");
    }

    #[tokio::test]
    async fn test_admin_route_rejects_anonymous() {
        let response = test_app()
            .oneshot(api_request(Method::GET, "/api/admin/dashboard"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_password_reset_without_code_is_rejected() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/user/reset-password")
                    .header("x-forwarded-for", "203.0.113.8")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"email":"victim@onandhome.kr","newPassword":"taken-over-1"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_inactive_user_archive_rejects_anonymous() {
        for (method, uri) in [
            (Method::GET, "/api/admin/inactive-users"),
            (Method::GET, "/api/admin/inactive-users/count"),
            (Method::GET, "/api/admin/inactive-users/3"),
            (Method::DELETE, "/api/admin/inactive-users/3"),
            (Method::POST, "/api/admin/inactive-users/delete"),
        ] {
            let response = test_app().oneshot(api_request(method, uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_category_tree_needs_no_database() {
        let response = test_app()
            .oneshot(api_request(Method::GET, "/api/products/categories"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json.as_array().is_some_and(|groups| !groups.is_empty()));
        assert!(json[0]["parentCategory"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = test_app()
            .oneshot(api_request(Method::GET, "/api/nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
