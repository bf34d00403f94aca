//! Services driven straight against a migrated database.
//!
//! Requires a database migrated with `oh-cli migrate`, reachable through
//! `ONANDHOME_DATABASE_URL` or `DATABASE_URL`.
//!
//! Run with `cargo test -p onandhome-integration-tests -- --ignored`.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Mutex;

use onandhome_core::Email;
use onandhome_integration_tests::{create_product, create_shopper, database};
use onandhome_server::db::cart::CartRepository;
use onandhome_server::db::products::ProductRepository;
use onandhome_server::db::reviews::ReviewRepository;
use onandhome_server::realtime::NotificationHub;
use onandhome_server::services::auth::{AuthError, AuthService};
use onandhome_server::services::cart::CartService;
use onandhome_server::services::mail::CodeSender;
use onandhome_server::services::orders::{
    CheckoutDetails, CreateOrderRequest, OrderLineRequest, OrderService,
};
use onandhome_server::services::reviews::{ReviewRequest, ReviewService};

/// Keeps mailed codes in memory.
#[derive(Default)]
struct Outbox(Mutex<Vec<(String, String)>>);

impl CodeSender for Outbox {
    fn send_password_reset_code(&self, to: &Email, code: &str) {
        self.0
            .lock()
            .unwrap()
            .push((to.to_string(), code.to_string()));
    }
}

impl Outbox {
    fn sent(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    fn last_code(&self) -> String {
        self.0.lock().unwrap().last().unwrap().1.clone()
    }
}

fn other_code(code: &str) -> &'static str {
    if code == "000000" { "000001" } else { "000000" }
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_password_reset_requires_verified_mailed_code() {
    let pool = database().await.unwrap();
    let auth = AuthService::new(&pool);
    let user = create_shopper(&pool, "original-pass-1").await.unwrap();
    let email = user.email.to_string();

    // No code was ever issued.
    assert!(matches!(
        auth.reset_password(&email, "123456", "taken-over-1").await,
        Err(AuthError::InvalidCode)
    ));

    let outbox = Outbox::default();
    auth.send_reset_code(&email, &outbox).await.unwrap();
    let code = outbox.last_code();
    assert_eq!(code.len(), 6);

    // Issued but not yet verified.
    assert!(matches!(
        auth.reset_password(&email, &code, "new-pass-123").await,
        Err(AuthError::InvalidCode)
    ));
    assert!(matches!(
        auth.verify_reset_code(&email, other_code(&code)).await,
        Err(AuthError::InvalidCode)
    ));

    auth.verify_reset_code(&email, &code).await.unwrap();
    assert!(matches!(
        auth.reset_password(&email, other_code(&code), "new-pass-123").await,
        Err(AuthError::InvalidCode)
    ));
    auth.reset_password(&email, &code, "new-pass-123").await.unwrap();

    assert!(auth.login(&user.user_id, "new-pass-123").await.is_ok());
    assert!(matches!(
        auth.login(&user.user_id, "original-pass-1").await,
        Err(AuthError::InvalidCredentials)
    ));

    // Spent.
    assert!(matches!(
        auth.reset_password(&email, &code, "second-pass-1").await,
        Err(AuthError::InvalidCode)
    ));
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_reset_code_locks_after_repeated_misses() {
    let pool = database().await.unwrap();
    let auth = AuthService::new(&pool);
    let user = create_shopper(&pool, "original-pass-1").await.unwrap();
    let email = user.email.to_string();

    let outbox = Outbox::default();
    auth.send_reset_code(&email, &outbox).await.unwrap();
    let code = outbox.last_code();

    for _ in 0..5 {
        assert!(auth.verify_reset_code(&email, other_code(&code)).await.is_err());
    }
    assert!(matches!(
        auth.verify_reset_code(&email, &code).await,
        Err(AuthError::InvalidCode)
    ));
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_unknown_address_gets_no_code() {
    let pool = database().await.unwrap();
    let outbox = Outbox::default();

    AuthService::new(&pool)
        .send_reset_code("nobody-here@example.com", &outbox)
        .await
        .unwrap();
    assert_eq!(outbox.sent(), 0);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_withdrawal_takes_likes_off_reviews() {
    let pool = database().await.unwrap();
    let hub = NotificationHub::new();
    let reviews = ReviewService::new(&pool, &hub);
    let author = create_shopper(&pool, "author-pass-1").await.unwrap();
    let liker = create_shopper(&pool, "liker-pass-12").await.unwrap();
    let product = create_product(&pool, 10).await.unwrap();

    let review = reviews
        .create(
            author.id,
            &ReviewRequest {
                product_id: Some(product.id),
                content: "조용하고 시원해요".to_string(),
                rating: 5,
                images: None,
            },
        )
        .await
        .unwrap();
    let toggled = reviews.toggle_like(liker.id, review.review.id).await.unwrap();
    assert!(toggled.liked);
    assert_eq!(toggled.like_count, 1);

    AuthService::new(&pool).withdraw(liker.id).await.unwrap();

    let stored = ReviewRepository::new(&pool)
        .get(review.review.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.like_count, 0);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_withdrawal_returns_stock_of_open_orders() {
    let pool = database().await.unwrap();
    let hub = NotificationHub::new();
    let shopper = create_shopper(&pool, "shopper-pass-1").await.unwrap();
    let product = create_product(&pool, 10).await.unwrap();

    OrderService::new(&pool, &hub)
        .create(
            shopper.id,
            &CreateOrderRequest {
                order_items: vec![OrderLineRequest {
                    product_id: product.id,
                    quantity: 3,
                }],
                details: CheckoutDetails::default(),
            },
        )
        .await
        .unwrap();

    let products = ProductRepository::new(&pool);
    assert_eq!(products.get(product.id).await.unwrap().unwrap().stock, 7);

    AuthService::new(&pool).withdraw(shopper.id).await.unwrap();
    assert_eq!(products.get(product.id).await.unwrap().unwrap().stock, 10);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_inactive_archive_lookup_and_purge() {
    let pool = database().await.unwrap();
    let auth = AuthService::new(&pool);
    let user = create_shopper(&pool, "leaving-pass-1").await.unwrap();

    auth.withdraw(user.id).await.unwrap();
    let archived = auth.inactive_users(Some(user.user_id.as_str())).await.unwrap();
    assert_eq!(archived.len(), 1);
    let entry = &archived[0];
    assert_eq!(entry.email, user.email.to_string());
    assert!(auth.count_inactive_users().await.unwrap() >= 1);
    assert_eq!(auth.inactive_user(entry.id).await.unwrap().user_id, user.user_id);

    auth.purge_inactive_user(entry.id).await.unwrap();
    assert!(matches!(
        auth.inactive_user(entry.id).await,
        Err(AuthError::UserNotFound)
    ));
    assert!(matches!(
        auth.purge_inactive_user(entry.id).await,
        Err(AuthError::UserNotFound)
    ));
    assert_eq!(auth.purge_inactive_users(&[entry.id]).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_cart_merge_saturates_quantity() {
    let pool = database().await.unwrap();
    let shopper = create_shopper(&pool, "bulk-buyer-1").await.unwrap();
    let product = create_product(&pool, 5).await.unwrap();
    let cart = CartService::new(&pool);

    cart.add(shopper.id, product.id, i64::from(i32::MAX)).await.unwrap();
    cart.add(shopper.id, product.id, i64::from(i32::MAX)).await.unwrap();

    let lines = CartRepository::new(&pool).list(shopper.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, i32::MAX);
}
