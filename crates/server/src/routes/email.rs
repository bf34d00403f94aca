//! E-mail verification codes for password resets.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::models::ApiResponse;
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeVerification {
    pub email: String,
    pub code: String,
}

/// Mail a password-reset code.
///
/// POST /api/email/send-password-reset-code
#[instrument(skip(state, request))]
pub async fn send_password_reset_code(
    State(state): State<AppState>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::new(state.pool())
        .send_reset_code(&request.email, state.mailer())
        .await?;
    Ok(Json(ApiResponse::message(
        "비밀번호 재설정 코드가 이메일로 전송되었습니다.",
    )))
}

/// Confirm a mailed password-reset code.
///
/// POST /api/email/verify-password-reset-code
#[instrument(skip(state, request))]
pub async fn verify_password_reset_code(
    State(state): State<AppState>,
    Json(request): Json<CodeVerification>,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::new(state.pool())
        .verify_reset_code(&request.email, &request.code)
        .await?;
    Ok(Json(ApiResponse::message("인증 완료되었습니다.")))
}
