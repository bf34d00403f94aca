//! Admin dashboard.

use axum::{Json, extract::State};

use crate::db::dashboard::DashboardRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::dashboard::DashboardStats;
use crate::state::AppState;

/// Today's orders and revenue plus catalog and member counters.
///
/// GET /api/admin/dashboard
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    let stats = DashboardRepository::new(state.pool()).stats().await?;
    Ok(Json(stats))
}
