//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// The server's database URL, `ONANDHOME_DATABASE_URL` first.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();
    std::env::var("ONANDHOME_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Connect with the server's pool settings.
///
/// # Errors
///
/// Returns an error if the URL is missing or the connection fails.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let url = database_url().ok_or("ONANDHOME_DATABASE_URL not set")?;
    tracing::info!("Connecting to database...");
    Ok(onandhome_server::db::create_pool(&url).await?)
}
