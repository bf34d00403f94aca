//! Account routes: registration, login, token refresh and profile.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use onandhome_core::{AdvertisementId, UserId};

use crate::db::users::UserRepository;
use crate::error::{AppError, Result, add_breadcrumb, set_sentry_user};
use crate::middleware::{AccessClaims, RefreshClaims, RequireAuth};
use crate::models::ApiResponse;
use crate::models::advertisement::Advertisement;
use crate::models::user::{ProfileUpdate, User};
use crate::services::advertisements::AdvertisementService;
use crate::services::auth::{AuthService, Claims, Registration, TokenKind};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

/// Login answer carrying both tokens.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub message: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// Create a shopper account.
///
/// POST /api/user/register
#[instrument(skip(state, registration), fields(login_id = %registration.user_id))]
pub async fn register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Result<Json<ApiResponse<User>>> {
    let user = AuthService::new(state.pool()).register(registration).await?;
    tracing::info!(user_id = %user.id, "Account registered");
    Ok(Json(ApiResponse::ok("회원가입이 완료되었습니다.", user)))
}

/// Exchange credentials for an access/refresh pair.
///
/// POST /api/user/login
#[instrument(skip(state, request), fields(login_id = %request.user_id))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = AuthService::new(state.pool())
        .login(&request.user_id, &request.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Login rejected"))?;

    let tokens = state.tokens().issue_pair(&user);
    set_sentry_user(&user.id, &user.user_id);
    add_breadcrumb("auth", "login", Some(&[("login_id", user.user_id.as_str())]));

    Ok(Json(LoginResponse {
        success: true,
        message: "로그인 성공".to_string(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user,
    }))
}

/// Issue a new access token for a refresh token.
///
/// POST /api/user/refresh
#[instrument(skip(state, claims))]
pub async fn refresh(
    State(state): State<AppState>,
    RefreshClaims(claims): RefreshClaims,
) -> Result<Json<RefreshResponse>> {
    let user = AuthService::new(state.pool()).get_user(claims.id).await?;
    if !user.active {
        return Err(AppError::Unauthorized("비활성화된 계정입니다.".to_string()));
    }

    Ok(Json(RefreshResponse {
        success: true,
        message: "토큰이 갱신되었습니다.".to_string(),
        access_token: state.tokens().issue(&user, TokenKind::Access),
    }))
}

/// The caller's profile.
///
/// GET /api/user/info
pub async fn info(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<User>> {
    Ok(Json(AuthService::new(state.pool()).get_user(user.id).await?))
}

/// Update the caller's profile.
///
/// PUT /api/user/info
#[instrument(skip(state, user, update), fields(user_id = %user.login_id))]
pub async fn update_info(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ApiResponse<User>>> {
    let updated = AuthService::new(state.pool())
        .update_profile(user.id, &update)
        .await?;
    Ok(Json(ApiResponse::ok("회원정보가 수정되었습니다.", updated)))
}

/// Change the caller's password.
///
/// PUT /api/user/password
#[instrument(skip(state, user, change), fields(user_id = %user.login_id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(change): Json<PasswordChange>,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::new(state.pool())
        .change_password(user.id, &change.current_password, &change.new_password)
        .await?;
    Ok(Json(ApiResponse::message("비밀번호가 변경되었습니다.")))
}

/// Withdraw the caller's account.
///
/// DELETE /api/user/account
#[instrument(skip(state, user), fields(user_id = %user.login_id))]
pub async fn withdraw(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::new(state.pool()).withdraw(user.id).await?;
    state.products().invalidate_all().await;
    Ok(Json(ApiResponse::message("회원탈퇴가 완료되었습니다.")))
}

/// Set a new password for the account registered under an email, spending
/// the verified code mailed to it.
///
/// POST /api/user/reset-password
#[instrument(skip(state, reset))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(reset): Json<PasswordReset>,
) -> Result<Json<ApiResponse<()>>> {
    AuthService::new(state.pool())
        .reset_password(&reset.email, &reset.code, &reset.new_password)
        .await?;
    Ok(Json(ApiResponse::message("비밀번호가 재설정되었습니다.")))
}

/// A user by primary key. Callers see themselves, admins see anyone.
///
/// GET /api/user/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<UserId>,
) -> Result<Json<User>> {
    if !user.actor().may_manage(id) {
        return Err(AppError::Forbidden("다른 회원의 정보는 조회할 수 없습니다.".to_string()));
    }
    Ok(Json(AuthService::new(state.pool()).get_user(id).await?))
}

/// A user by login id.
///
/// GET /api/user/username/{userId}
pub async fn get_by_login_id(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(login_id): Path<String>,
) -> Result<Json<User>> {
    if !user.is_admin() && user.login_id != login_id {
        return Err(AppError::Forbidden("다른 회원의 정보는 조회할 수 없습니다.".to_string()));
    }
    let found = UserRepository::new(state.pool())
        .get_by_login_id(&login_id)
        .await?
        .ok_or_else(|| AppError::NotFound("사용자를 찾을 수 없습니다.".to_string()))?;
    Ok(Json(found))
}

/// Decoded claims of the presented access token.
///
/// GET /api/user/session-info
pub async fn session_info(AccessClaims(claims): AccessClaims) -> Json<Claims> {
    Json(claims)
}

/// Advertisement detail opened from a notification.
///
/// GET /api/user/advertisements/{id}
pub async fn advertisement(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<AdvertisementId>,
) -> Result<Json<Advertisement>> {
    let ad = AdvertisementService::new(state.pool(), state.hub())
        .get(id)
        .await?;
    Ok(Json(ad))
}
