use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_id, validate_name};
use super::{ApiError, ApiResponse, AppState, CategoryDto, MessageResponse};

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// GET /categories (public)
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CategoryDto>>>, ApiError> {
    let categories = state
        .store()
        .list_categories()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        categories.into_iter().map(CategoryDto::from).collect(),
    )))
}

/// GET /categories/{id} (public)
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CategoryDto>>, ApiError> {
    let id = validate_id(id)?;

    let category = state
        .store()
        .get_category(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Category", id))?;

    Ok(Json(ApiResponse::success(category.into())))
}

/// POST /categories
/// Any authenticated user may create a category; categories are a shared
/// taxonomy with no ownership model.
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryDto>>), ApiError> {
    let name = validate_name(&payload.name)?.to_string();

    if state
        .store()
        .get_category_by_name(&name)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .is_some()
    {
        return Err(ApiError::validation(
            "A category with that name already exists",
        ));
    }

    let category = state
        .store()
        .create_category(name, payload.description)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(category.into())),
    ))
}

/// PUT/PATCH /categories/{id}
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryDto>>, ApiError> {
    let id = validate_id(id)?;

    let name = payload
        .name
        .as_deref()
        .map(|n| validate_name(n).map(str::to_string))
        .transpose()?;

    if let Some(name) = &name
        && let Some(existing) = state
            .store()
            .get_category_by_name(name)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?
        && existing.id != id
    {
        return Err(ApiError::validation(
            "A category with that name already exists",
        ));
    }

    let category = state
        .store()
        .update_category(id, name, payload.description.map(Some))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Category", id))?;

    Ok(Json(ApiResponse::success(category.into())))
}

/// DELETE /categories/{id}
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id)?;

    let deleted = state
        .store()
        .delete_category(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    if !deleted {
        return Err(ApiError::not_found("Category", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Category deleted".to_string(),
    })))
}
