use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse, UserDto};

/// GET /users
/// Admin only: list all users.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    if !user.role.is_admin() {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    let users = state
        .store()
        .list_users()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

/// DELETE /users/{id}
/// Admin only.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if !user.role.is_admin() {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    let id = validate_id(id)?;

    let deleted = state
        .store()
        .delete_user(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    if !deleted {
        return Err(ApiError::not_found("User", id));
    }

    tracing::info!("User {} deleted by admin {}", id, user.username);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "User deleted".to_string(),
    })))
}
