//! Dashboard aggregate queries.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::dashboard::DashboardStats;

/// Repository for back-office counters.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    /// Create a new dashboard repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Compute every dashboard counter in one round trip.
    ///
    /// Days and months are bounded in the database session's time zone.
    /// Canceled orders never count toward order totals or revenue.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<DashboardStats, RepositoryError> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            r"
            SELECT
                (SELECT COUNT(*) FROM orders
                 WHERE status <> 'CANCELED' AND created_at >= date_trunc('day', NOW()))
                    AS today_order_count,
                (SELECT COALESCE(SUM(total_price), 0)::BIGINT FROM orders
                 WHERE status <> 'CANCELED' AND created_at >= date_trunc('day', NOW()))
                    AS today_revenue,
                (SELECT COALESCE(SUM(total_price), 0)::BIGINT FROM orders
                 WHERE status <> 'CANCELED' AND created_at >= date_trunc('month', NOW()))
                    AS month_revenue,
                (SELECT COUNT(*) FROM products) AS total_products,
                (SELECT COUNT(*) FROM products WHERE stock <= 0) AS out_of_stock_products,
                (SELECT COUNT(*) FROM users WHERE created_at >= date_trunc('day', NOW()))
                    AS today_new_users,
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM inactive_users) AS inactive_users,
                (SELECT COUNT(*) FROM notices) AS total_notices,
                (SELECT COUNT(*) FROM reviews) AS total_reviews,
                (SELECT COUNT(*) FROM qnas) AS total_qnas
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }
}
