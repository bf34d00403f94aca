//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! oh-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ONANDHOME_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Embedded from `crates/server/migrations/` at compile time:
//! ```text
//! migrations/
//! ├── 20261001000001_create_users.sql
//! ├── 20261001000002_create_catalog.sql
//! └── ...
//! ```

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
