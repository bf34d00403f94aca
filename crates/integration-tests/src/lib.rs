//! Integration tests for OnAndHome.
//!
//! # Running Tests
//!
//! ```bash
//! # Domain and protocol tests, no services needed
//! cargo test -p onandhome-integration-tests
//!
//! # Full HTTP flows against a migrated database and a running server
//! oh-cli migrate && oh-cli seed demo
//! cargo run -p onandhome-server &
//! cargo test -p onandhome-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `domain_rules` - Cart, order and notification rules across crates
//! - `stomp_protocol` - STOMP sessions driven through real tokens and the hub
//! - `api_flows` - `reqwest` flows against a running server (ignored by default)
//! - `storage_rules` - Services driven straight against a migrated database
//!   (ignored by default)
//!
//! The helpers below are shared by the HTTP flows and the storage tests.

use reqwest::{Client, StatusCode};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::PgPool;

use onandhome_core::{ProductStatus, Won};
use onandhome_server::db::products::ProductRepository;
use onandhome_server::models::product::{Product, ProductInput};
use onandhome_server::models::user::User;
use onandhome_server::services::auth::{AuthService, Registration};

/// Base URL of the running server (`ONANDHOME_BASE_URL`).
#[must_use]
pub fn base_url() -> String {
    std::env::var("ONANDHOME_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// Absolute URL for an API path such as `/api/cart`.
#[must_use]
pub fn api(path: &str) -> String {
    format!("{}{path}", base_url())
}

/// A login id unlikely to collide across runs (4-20 word characters).
#[must_use]
pub fn unique_login_id(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let mut id = format!("{prefix}_{suffix}");
    id.truncate(20);
    id
}

/// Tokens and identity of a logged-in test account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Value,
}

impl Session {
    /// Primary key of the logged-in account.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.user["id"].as_i64().unwrap_or_default()
    }

    /// `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Failure in a test helper, carrying the response status and body.
#[derive(Debug)]
pub struct FlowError {
    pub status: StatusCode,
    pub body: String,
}

impl std::fmt::Display for FlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.body)
    }
}

impl std::error::Error for FlowError {}

async fn expect_success(response: reqwest::Response) -> Result<Value, Box<dyn std::error::Error>> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Box::new(FlowError { status, body }));
    }
    Ok(response.json().await?)
}

/// Register a fresh shopper and log in.
///
/// # Errors
///
/// Returns an error if either request fails or is rejected.
pub async fn register_and_login(client: &Client) -> Result<Session, Box<dyn std::error::Error>> {
    let login_id = unique_login_id("it");
    let password = "integration-pass-1";

    expect_success(
        client
            .post(api("/api/user/register"))
            .json(&json!({
                "userId": login_id,
                "password": password,
                "email": format!("{login_id}@example.com"),
                "username": "통합테스트",
                "marketingConsent": true,
            }))
            .send()
            .await?,
    )
    .await?;

    let session = expect_success(
        client
            .post(api("/api/user/login"))
            .json(&json!({ "userId": login_id, "password": password }))
            .send()
            .await?,
    )
    .await?;
    Ok(serde_json::from_value(session)?)
}

/// Log in with the admin credentials in `ONANDHOME_ADMIN_ID` and
/// `ONANDHOME_ADMIN_PASSWORD` (created with `oh-cli admin create`).
///
/// # Errors
///
/// Returns an error if the variables are unset or the login is rejected.
pub async fn admin_login(client: &Client) -> Result<Session, Box<dyn std::error::Error>> {
    let login_id = std::env::var("ONANDHOME_ADMIN_ID")?;
    let password = std::env::var("ONANDHOME_ADMIN_PASSWORD")?;
    let session = expect_success(
        client
            .post(api("/api/user/login"))
            .json(&json!({ "userId": login_id, "password": password }))
            .send()
            .await?,
    )
    .await?;
    Ok(serde_json::from_value(session)?)
}

/// First in-stock product in the catalog, as JSON.
///
/// # Errors
///
/// Returns an error if the listing fails or the catalog has no stock.
pub async fn first_in_stock_product(client: &Client) -> Result<Value, Box<dyn std::error::Error>> {
    let products = expect_success(client.get(api("/api/products/search")).send().await?).await?;
    products
        .as_array()
        .and_then(|list| list.iter().find(|p| p["stock"].as_i64().unwrap_or(0) > 1))
        .cloned()
        .ok_or_else(|| "no product in stock; run `oh-cli seed demo`".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_login_id_fits_rules() {
        let id = unique_login_id("it");
        assert!(id.len() <= 20);
        assert!(id.len() >= 4);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        assert_ne!(id, unique_login_id("it"));
    }
}

/// Pool on the migrated test database (`ONANDHOME_DATABASE_URL`, then `DATABASE_URL`).
///
/// # Errors
///
/// Returns an error if neither variable is set or the connection fails.
pub async fn database() -> Result<PgPool, Box<dyn std::error::Error>> {
    let url = std::env::var("ONANDHOME_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL"))?;
    Ok(onandhome_server::db::create_pool(&SecretString::from(url)).await?)
}

/// Register a fresh shopper directly through the service.
///
/// # Errors
///
/// Returns an error if registration is rejected.
pub async fn create_shopper(pool: &PgPool, password: &str) -> Result<User, Box<dyn std::error::Error>> {
    let login_id = unique_login_id("db");
    let user = AuthService::new(pool)
        .register(Registration {
            user_id: login_id.clone(),
            password: password.to_string(),
            email: format!("{login_id}@example.com"),
            username: "테스트".to_string(),
            phone: None,
            gender: None,
            birth_date: None,
            address: None,
            marketing_consent: false,
            privacy_consent: true,
        })
        .await?;
    Ok(user)
}

/// Insert an on-sale product with `stock` units.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn create_product(pool: &PgPool, stock: i32) -> Result<Product, Box<dyn std::error::Error>> {
    let product = ProductRepository::new(pool)
        .create(&ProductInput {
            name: format!("테스트 상품 {}", uuid::Uuid::new_v4().simple()),
            product_code: None,
            description: None,
            price: Won::new(10_000),
            sale_price: None,
            stock,
            category: Some("TV".to_string()),
            manufacturer: None,
            country: None,
            status: ProductStatus::OnSale,
            thumbnail_image: None,
            detail_image: None,
        })
        .await?;
    Ok(product)
}
