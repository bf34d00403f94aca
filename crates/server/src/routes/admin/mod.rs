//! Back-office JSON API, mounted under `/api/admin`.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin), so
//! shoppers get 403 and anonymous callers 401.

pub mod advertisements;
pub mod boards;
pub mod dashboard;
pub mod inactive_users;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::state::AppState;

/// Create the admin routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::stats))
        // Members
        .route("/users", get(users::list))
        .route("/users/delete", post(users::delete_many))
        .route("/users/inactive", get(inactive_users::list))
        .route("/users/{id}", get(users::show).delete(users::delete))
        // Withdrawn-account archive
        .route("/inactive-users", get(inactive_users::list))
        .route("/inactive-users/count", get(inactive_users::count))
        .route("/inactive-users/delete", post(inactive_users::purge_many))
        .route(
            "/inactive-users/{id}",
            get(inactive_users::show).delete(inactive_users::purge),
        )
        // Catalog
        .route("/products", get(products::list).post(products::create))
        .route("/products/delete", post(products::delete_many))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/products/{id}/status", patch(products::set_status))
        // Orders
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", put(orders::update_status))
        .route("/orders/{id}/confirm-payment", post(orders::confirm_payment))
        // Advertisements
        .route(
            "/advertisements",
            get(advertisements::list).post(advertisements::create),
        )
        .route(
            "/advertisements/{id}",
            get(advertisements::show)
                .put(advertisements::update)
                .delete(advertisements::delete),
        )
        .route("/advertisements/{id}/send", post(advertisements::send))
        // Boards
        .route("/reviews", get(boards::reviews))
        .route("/qna", get(boards::qna))
}
