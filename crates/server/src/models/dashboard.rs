//! Back-office dashboard figures.

use serde::Serialize;

use onandhome_core::Won;

/// Counters shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub today_order_count: i64,
    pub today_revenue: Won,
    pub month_revenue: Won,
    pub total_products: i64,
    pub out_of_stock_products: i64,
    pub today_new_users: i64,
    pub total_users: i64,
    pub inactive_users: i64,
    pub total_notices: i64,
    pub total_reviews: i64,
    pub total_qnas: i64,
}
