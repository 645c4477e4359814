use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, EnrollmentDto, MessageResponse};
use crate::domain::Role;

#[derive(Debug, Deserialize)]
pub struct CreateEnrollmentRequest {
    pub course: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEnrollmentRequest {
    pub course: i32,
}

/// GET /enrollments
/// Instructors see the enrollments of courses they own; everyone else,
/// admins included, sees only their own.
pub async fn list_enrollments(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<EnrollmentDto>>>, ApiError> {
    let rows = match user.role {
        Role::Instructor => state.store().list_enrollments_for_instructor(user.id).await,
        Role::Admin | Role::Student => state.store().list_enrollments_for_student(user.id).await,
    }
    .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        rows.into_iter().map(EnrollmentDto::from).collect(),
    )))
}

/// POST /enrollments
/// Open to any authenticated caller; the student field is always the
/// caller regardless of the request body.
pub async fn create_enrollment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<CreateEnrollmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EnrollmentDto>>), ApiError> {
    let course_id = validate_id(payload.course)?;

    if state
        .store()
        .get_course_model(course_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .is_none()
    {
        return Err(ApiError::not_found("Course", course_id));
    }

    if state
        .store()
        .enrollment_exists(course_id, user.id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
    {
        return Err(ApiError::validation("Already enrolled in this course"));
    }

    let enrollment = state
        .store()
        .create_enrollment(course_id, user.id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!(
        "User {} enrolled in course {}",
        user.username,
        course_id
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(enrollment.into())),
    ))
}

/// GET /enrollments/{id}
/// Visible only within the caller's listing scope.
pub async fn get_enrollment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EnrollmentDto>>, ApiError> {
    let id = validate_id(id)?;

    let detail = state
        .store()
        .get_enrollment(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Enrollment", id))?;

    let visible = match user.role {
        Role::Instructor => detail.course.course.instructor_id == user.id,
        Role::Admin | Role::Student => detail.enrollment.student_id == user.id,
    };

    if !visible {
        return Err(ApiError::not_found("Enrollment", id));
    }

    Ok(Json(ApiResponse::success(detail.into())))
}

/// PUT/PATCH /enrollments/{id}
/// Repoints the enrollment at another course; only the owning student or
/// an admin. The student field is immutable.
pub async fn update_enrollment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateEnrollmentRequest>,
) -> Result<Json<ApiResponse<EnrollmentDto>>, ApiError> {
    let id = validate_id(id)?;
    let course_id = validate_id(payload.course)?;

    let existing = state
        .store()
        .get_enrollment_model(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Enrollment", id))?;

    if !user.role.may_mutate_enrollment(user.id, existing.student_id) {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    if state
        .store()
        .get_course_model(course_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .is_none()
    {
        return Err(ApiError::not_found("Course", course_id));
    }

    if course_id != existing.course_id
        && state
            .store()
            .enrollment_exists(course_id, existing.student_id)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?
    {
        return Err(ApiError::validation("Already enrolled in this course"));
    }

    let updated = state
        .store()
        .update_enrollment_course(id, course_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Enrollment", id))?;

    Ok(Json(ApiResponse::success(updated.into())))
}

/// DELETE /enrollments/{id}
/// Only the owning student or an admin.
pub async fn delete_enrollment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id)?;

    let existing = state
        .store()
        .get_enrollment_model(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Enrollment", id))?;

    if !user.role.may_mutate_enrollment(user.id, existing.student_id) {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    state
        .store()
        .delete_enrollment(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Enrollment deleted".to_string(),
    })))
}
