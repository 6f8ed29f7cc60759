//! Department handlers
//!
//! Read-only queries against the department forest

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::directory::{DepartmentForest, DepartmentRef};
use crate::error::{AppError, AppResult, OptionExt};
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Query parameters for lookup
#[derive(Debug, Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub name: String,
}

/// GET /api/departments
pub async fn get_departments(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<DepartmentForest>>> {
    let forest = state.forest().await?;
    tracing::debug!("Serving department forest with {} nodes", forest.len());
    Ok(Json(ApiResponse::success(forest)))
}

/// GET /api/departments/:id/path
pub async fn get_department_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<DepartmentRef>>>> {
    let path = state.forest().await?.find_path(&id);
    if path.is_empty() {
        return Err(AppError::NotFound(format!("department {}", id)));
    }
    Ok(Json(ApiResponse::success(path)))
}

/// GET /api/departments/:id/subtree
pub async fn get_department_subtree(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<DepartmentRef>>>> {
    let subtree = state.forest().await?.find_subtree(&id);
    if subtree.is_empty() {
        return Err(AppError::NotFound(format!("department {}", id)));
    }
    Ok(Json(ApiResponse::success(subtree)))
}

/// GET /api/departments/lookup?name=
pub async fn lookup_department(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> AppResult<Json<ApiResponse<DepartmentRef>>> {
    let name = query.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }

    let department = state
        .forest()
        .await?
        .find_by_name(name)
        .ok_or_not_found(format!("department named {}", name))?;
    Ok(Json(ApiResponse::success(department)))
}
