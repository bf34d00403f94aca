//! Company information shown in the storefront footer.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::company::CompanyRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::ApiResponse;
use crate::models::company::{CompanyInfo, CompanyInfoInput};
use crate::state::AppState;

/// The company row.
///
/// GET /api/company/info
pub async fn show(State(state): State<AppState>) -> Result<Json<CompanyInfo>> {
    let info = CompanyRepository::new(state.pool())
        .get()
        .await?
        .ok_or_else(|| AppError::NotFound("회사 정보가 없습니다.".to_string()))?;
    Ok(Json(info))
}

/// Create or replace the company row.
///
/// POST /api/company/info
#[instrument(skip(state, admin, input), fields(admin = %admin.login_id))]
pub async fn upsert(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CompanyInfoInput>,
) -> Result<Json<ApiResponse<CompanyInfo>>> {
    if input.company_name.trim().is_empty() {
        return Err(AppError::BadRequest("회사명을 입력해주세요.".to_string()));
    }
    let info = CompanyRepository::new(state.pool()).upsert(&input).await?;
    Ok(Json(ApiResponse::ok("회사 정보가 저장되었습니다.", info)))
}
