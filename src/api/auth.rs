use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{HeaderMap, StatusCode, request::Parts},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{validate_email, validate_password, validate_username};
use super::{ApiError, ApiResponse, AppState, MessageResponse, UserDto};
use crate::db::ProfileUpdate;
use crate::domain::Role;
use crate::services::{RegisterInput, TokenPair};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(serde::Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    /// Absent leaves the avatar untouched; an explicit `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub avatar: Option<Option<String>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub uidb64: String,
    pub token: String,
    pub password: String,
}

// ============================================================================
// Extractors
// ============================================================================

/// Identity derived from a valid bearer access token. Handlers take this
/// as an argument to require authentication; no database lookup happens
/// here because the claims carry the role.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(ApiError::unauthenticated)?;

        let claims = state
            .tokens()
            .decode_access(&token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        tracing::Span::current().record("user_id", claims.sub);

        Ok(Self {
            id: claims.sub,
            username: claims.username,
            role,
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?;
    Some(token.trim().to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /register
/// Open to unauthenticated callers; the role in the body is honored and
/// defaults to student.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    let username = validate_username(&payload.username)?.to_string();
    let email = validate_email(&payload.email)?.to_string();
    validate_password(&payload.password)?;

    let role = match payload.role.as_deref() {
        None | Some("") => Role::default(),
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|_| ApiError::validation(format!("\"{raw}\" is not a valid role")))?,
    };

    let user = state
        .auth()
        .register(RegisterInput {
            username,
            email,
            password: payload.password,
            role,
        })
        .await?;

    tracing::info!("Registered user: {} ({})", user.username, user.role);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user.into())),
    ))
}

/// POST /login
/// Verifies credentials, issues an access/refresh token pair. The failure
/// response is identical whether or not the username exists.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let pair = state.auth().login(&payload.username, &payload.password).await?;

    Ok(Json(ApiResponse::success(pair)))
}

/// POST /token/refresh
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<AccessTokenResponse>>, ApiError> {
    let access = state.auth().refresh(&payload.refresh).await?;

    Ok(Json(ApiResponse::success(AccessTokenResponse { access })))
}

/// GET /profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let profile = state.auth().get_profile(user.id).await?;

    Ok(Json(ApiResponse::success(profile.into())))
}

/// PUT /profile
/// Partial update of the caller's own record.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let username = payload
        .username
        .as_deref()
        .map(|u| validate_username(u).map(str::to_string))
        .transpose()?;
    let email = payload
        .email
        .as_deref()
        .map(|e| validate_email(e).map(str::to_string))
        .transpose()?;

    let updated = state
        .auth()
        .update_profile(
            user.id,
            ProfileUpdate {
                username,
                email,
                avatar: payload.avatar,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(updated.into())))
}

/// POST /password-reset
/// Always answers with the same generic message, whether or not the email
/// belongs to an account.
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_email(&payload.email)?;

    state.auth().request_password_reset(&payload.email).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "We have sent you a link to reset your password".to_string(),
    })))
}

/// PATCH /password-reset-confirm
pub async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetConfirmRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_password(&payload.password)?;

    state
        .auth()
        .confirm_password_reset(&payload.uidb64, &payload.token, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password reset success".to_string(),
    })))
}
