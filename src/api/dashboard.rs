use axum::{Json, extract::State};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, DashboardStatsDto, RoleCount};

/// GET /dashboard/stats
/// Platform-wide aggregate counts, available to any authenticated caller.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Result<Json<ApiResponse<DashboardStatsDto>>, ApiError> {
    let store = state.store();

    let total_users = store
        .count_users()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let total_courses = store
        .count_courses()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let total_enrollments = store
        .count_enrollments()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let role_distribution = store
        .count_users_by_role()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .into_iter()
        .map(|(role, count)| RoleCount { role, count })
        .collect();

    Ok(Json(ApiResponse::success(DashboardStatsDto {
        total_users,
        total_courses,
        total_enrollments,
        role_distribution,
    })))
}
