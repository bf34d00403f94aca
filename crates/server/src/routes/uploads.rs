//! Image upload routes (admin only).

use axum::{
    Json,
    extract::{Multipart, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Uploaded {
    pub file_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    pub file_url: String,
}

/// Store the multipart `file` field and return its public URL.
///
/// POST /api/upload/image
#[instrument(skip(state, admin, multipart), fields(admin = %admin.login_id))]
pub async fn upload(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Uploaded>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("잘못된 업로드 요청입니다: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("파일을 읽을 수 없습니다: {e}")))?;

        let file_url = state.uploads().save(&file_name, &bytes).await?;
        return Ok(Json(ApiResponse::ok(
            "이미지가 업로드되었습니다.",
            Uploaded { file_url },
        )));
    }

    Err(AppError::BadRequest("업로드할 파일이 없습니다.".to_string()))
}

/// Delete an uploaded file by its public URL.
///
/// DELETE /api/upload/image?fileUrl=
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<ApiResponse<()>>> {
    state.uploads().delete(&query.file_url).await?;
    Ok(Json(ApiResponse::message("이미지가 삭제되었습니다.")))
}
