//! End-to-end HTTP flows against a running server.
//!
//! Requires:
//! - A migrated and seeded database (`oh-cli migrate && oh-cli seed demo`)
//! - The server listening at `ONANDHOME_BASE_URL` (default `http://localhost:8080`)
//! - For admin flows, `ONANDHOME_ADMIN_ID` and `ONANDHOME_ADMIN_PASSWORD`
//!
//! Run with `cargo test -p onandhome-integration-tests -- --ignored`.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use onandhome_integration_tests::{
    admin_login, api, base_url, first_in_stock_product, register_and_login,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_health_check() {
    let client = Client::new();
    let response = client
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_login_refresh_and_session_info() {
    let client = Client::new();
    let session = register_and_login(&client).await.unwrap();

    let info: Value = client
        .get(api("/api/user/session-info"))
        .header("Authorization", session.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["typ"], "access");
    assert_eq!(info["role"], 1);

    // An access token is not a refresh token.
    let wrong = client
        .post(api("/api/user/refresh"))
        .header("Authorization", session.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let refreshed: Value = client
        .post(api("/api/user/refresh"))
        .header("Authorization", format!("Bearer {}", session.refresh_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(refreshed["success"], true);
    assert!(refreshed["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_password_reset_needs_mailed_code() {
    let client = Client::new();
    let session = register_and_login(&client).await.unwrap();
    let email = session.user["email"].as_str().unwrap().to_string();

    let without_code = client
        .post(api("/api/user/reset-password"))
        .json(&json!({ "email": email, "newPassword": "taken-over-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(without_code.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let sent: Value = client
        .post(api("/api/email/send-password-reset-code"))
        .json(&json!({ "email": email }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sent["success"], true);

    let guessed = client
        .post(api("/api/user/reset-password"))
        .json(&json!({ "email": email, "code": "000000", "newPassword": "taken-over-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(guessed.status(), StatusCode::BAD_REQUEST);

    let relogin = client
        .post(api("/api/user/login"))
        .json(&json!({ "userId": session.user["userId"], "password": "integration-pass-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(relogin.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_duplicate_registration_rejected() {
    let client = Client::new();
    let session = register_and_login(&client).await.unwrap();
    let login_id = session.user["userId"].as_str().unwrap();

    let response = client
        .post(api("/api/user/register"))
        .json(&json!({
            "userId": login_id,
            "password": "integration-pass-1",
            "email": format!("other_{login_id}@example.com"),
            "username": "중복",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cart_checkout_decrements_stock_and_notifies() {
    let client = Client::new();
    let session = register_and_login(&client).await.unwrap();
    let product = first_in_stock_product(&client).await.unwrap();
    let product_id = product["id"].as_i64().unwrap();
    let stock_before = product["stock"].as_i64().unwrap();

    // Adding twice merges into one line.
    for _ in 0..2 {
        let added = client
            .post(api("/api/cart/add"))
            .header("Authorization", session.bearer())
            .json(&json!({ "productId": product_id, "quantity": 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(added.status(), StatusCode::OK);
    }

    let count: Value = client
        .get(api("/api/cart/count"))
        .header("Authorization", session.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 1);

    let order: Value = client
        .post(api("/api/orders/cart/create"))
        .header("Authorization", session.bearer())
        .json(&json!({
            "paymentMethod": "CARD",
            "recipientName": "홍길동",
            "recipientPhone": "010-1234-5678",
            "shippingAddress": "서울시 강남구",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(order["success"], true);
    assert_eq!(order["data"]["status"], "ORDERED");
    assert_eq!(order["data"]["orderItems"][0]["count"], 2);

    let after: Value = client
        .get(api(&format!("/api/products/{product_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after["stock"].as_i64().unwrap(), stock_before - 2);

    let count: Value = client
        .get(api("/api/cart/count"))
        .header("Authorization", session.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 0);

    let unread: Value = client
        .get(api("/api/notifications/unread-count"))
        .header("Authorization", session.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(unread["count"].as_i64().unwrap() >= 1);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cancel_restores_stock() {
    let client = Client::new();
    let session = register_and_login(&client).await.unwrap();
    let product = first_in_stock_product(&client).await.unwrap();
    let product_id = product["id"].as_i64().unwrap();

    let order: Value = client
        .post(api("/api/orders/create"))
        .header("Authorization", session.bearer())
        .json(&json!({
            "orderItems": [{ "productId": product_id, "quantity": 1 }],
            "paymentMethod": "BANK_TRANSFER",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(order["data"]["status"], "PAYMENT_PENDING");
    let order_id = order["data"]["id"].as_i64().unwrap();

    let stock_mid: Value = client
        .get(api(&format!("/api/products/{product_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let canceled = client
        .post(api(&format!("/api/orders/{order_id}/cancel")))
        .header("Authorization", session.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(canceled.status(), StatusCode::OK);

    let stock_after: Value = client
        .get(api(&format!("/api/products/{product_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        stock_after["stock"].as_i64().unwrap(),
        stock_mid["stock"].as_i64().unwrap() + 1
    );

    // A canceled order cannot be canceled again.
    let again = client
        .post(api(&format!("/api/orders/{order_id}/cancel")))
        .header("Authorization", session.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_other_users_order_is_hidden() {
    let client = Client::new();
    let owner = register_and_login(&client).await.unwrap();
    let stranger = register_and_login(&client).await.unwrap();
    let product = first_in_stock_product(&client).await.unwrap();

    let order: Value = client
        .post(api("/api/orders/create"))
        .header("Authorization", owner.bearer())
        .json(&json!({ "orderItems": [{ "productId": product["id"], "quantity": 1 }] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = order["data"]["id"].as_i64().unwrap();

    let response = client
        .get(api(&format!("/api/orders/{order_id}")))
        .header("Authorization", stranger.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_shopper_cannot_reach_admin_api() {
    let client = Client::new();
    let session = register_and_login(&client).await.unwrap();

    let response = client
        .get(api("/api/admin/dashboard"))
        .header("Authorization", session.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_dashboard_and_payment_confirmation() {
    let client = Client::new();
    let admin = admin_login(&client).await.unwrap();
    let shopper = register_and_login(&client).await.unwrap();
    let product = first_in_stock_product(&client).await.unwrap();

    let dashboard: Value = client
        .get(api("/api/admin/dashboard"))
        .header("Authorization", admin.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(dashboard["totalUsers"].as_i64().unwrap() >= 1);

    let order: Value = client
        .post(api("/api/orders/create"))
        .header("Authorization", shopper.bearer())
        .json(&json!({
            "orderItems": [{ "productId": product["id"], "quantity": 1 }],
            "paymentMethod": "BANK_TRANSFER",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = order["data"]["id"].as_i64().unwrap();

    let confirmed: Value = client
        .post(api(&format!("/api/admin/orders/{order_id}/confirm-payment")))
        .header("Authorization", admin.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(confirmed["success"], true);
    assert_eq!(confirmed["data"]["status"], "ORDERED");
    assert!(confirmed["data"]["paidAt"].is_string());
}
