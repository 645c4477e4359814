use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_id, validate_title};
use super::{ApiError, ApiResponse, AppState, CourseDto, MessageResponse};
use crate::db::CourseUpdate;

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<i32>,
}

/// GET /courses (public)
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CourseDto>>>, ApiError> {
    let courses = state
        .store()
        .list_courses()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        courses.into_iter().map(CourseDto::from).collect(),
    )))
}

/// GET /courses/{id} (public)
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CourseDto>>, ApiError> {
    let id = validate_id(id)?;

    let course = state
        .store()
        .get_course(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Course", id))?;

    Ok(Json(ApiResponse::success(course.into())))
}

/// POST /courses
/// Instructor/admin only; the stored instructor is always the caller, no
/// matter what the request body claims.
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CourseDto>>), ApiError> {
    if !user.role.can_create_course() {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    let title = validate_title(&payload.title)?.to_string();
    let category_id = validate_id(payload.category)?;

    if state
        .store()
        .get_category(category_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .is_none()
    {
        return Err(ApiError::validation(format!(
            "Invalid category: {category_id}"
        )));
    }

    let course = state
        .store()
        .create_course(title, payload.description, category_id, user.id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!("Course {} created by {}", course.course.id, user.username);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(course.into())),
    ))
}

/// PUT/PATCH /courses/{id}
/// Admin, or the owning instructor.
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<Json<ApiResponse<CourseDto>>, ApiError> {
    let id = validate_id(id)?;

    let existing = state
        .store()
        .get_course_model(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Course", id))?;

    if !user.role.may_mutate_course(user.id, existing.instructor_id) {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    let title = payload
        .title
        .as_deref()
        .map(|t| validate_title(t).map(str::to_string))
        .transpose()?;

    if let Some(category_id) = payload.category {
        let category_id = validate_id(category_id)?;
        if state
            .store()
            .get_category(category_id)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?
            .is_none()
        {
            return Err(ApiError::validation(format!(
                "Invalid category: {category_id}"
            )));
        }
    }

    let course = state
        .store()
        .update_course(
            id,
            CourseUpdate {
                title,
                description: payload.description,
                category_id: payload.category,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Course", id))?;

    Ok(Json(ApiResponse::success(course.into())))
}

/// DELETE /courses/{id}
/// Admin, or the owning instructor.
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id)?;

    let existing = state
        .store()
        .get_course_model(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Course", id))?;

    if !user.role.may_mutate_course(user.id, existing.instructor_id) {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    state
        .store()
        .delete_course(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!("Course {} deleted by {}", id, user.username);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Course deleted".to_string(),
    })))
}
