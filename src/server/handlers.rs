//! Request handlers, owner extraction, and error responses.

use axum::{
    Json,
    extract::{FromRequestParts, Path, State, rejection::JsonRejection},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

use super::router::AppState;
use crate::auth::{LoginRequest, RegisterRequest, TokenResponse};
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::query::FilterRequest;
use crate::types::{PagedTasks, Task, TaskInput, TaskStats, User};

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        if self.code.is_validation() {
            return StatusCode::BAD_REQUEST;
        }
        match self.code {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::TaskNotFound => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists => StatusCode::CONFLICT,
            ErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = ?self.code, details = ?self.details, "{}", self.message);
        } else {
            debug!(code = ?self.code, "{}", self.message);
        }
        (status, Json(self)).into_response()
    }
}

/// Owner id resolved from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct CurrentOwner(pub i64);

impl FromRequestParts<AppState> for CurrentOwner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Expected a Bearer token"))?;
        state.auth.resolve_owner(token).map(CurrentOwner)
    }
}

/// Unwrap a JSON body, reporting malformed input as a validation error.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid_value("body", rejection.body_text()))
}

#[derive(Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(super) async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.auth.register(body(payload)?)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(super) async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    Ok(Json(state.auth.login(body(payload)?)?))
}

pub(super) async fn list_tasks(
    State(state): State<AppState>,
    CurrentOwner(owner_id): CurrentOwner,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.queries.list_all(owner_id)?))
}

pub(super) async fn filter_tasks(
    State(state): State<AppState>,
    CurrentOwner(owner_id): CurrentOwner,
    payload: Result<Json<FilterRequest>, JsonRejection>,
) -> ApiResult<Json<PagedTasks>> {
    let request = body(payload)?;
    Ok(Json(state.queries.filter(owner_id, &request)?))
}

pub(super) async fn task_stats(
    State(state): State<AppState>,
    CurrentOwner(owner_id): CurrentOwner,
) -> ApiResult<Json<TaskStats>> {
    Ok(Json(state.stats.stats(owner_id)?))
}

pub(super) async fn create_task(
    State(state): State<AppState>,
    CurrentOwner(owner_id): CurrentOwner,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state.lifecycle.create(owner_id, body(payload)?)?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub(super) async fn update_task(
    State(state): State<AppState>,
    CurrentOwner(owner_id): CurrentOwner,
    Path(id): Path<i64>,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.lifecycle.update(owner_id, id, body(payload)?)?))
}

pub(super) async fn delete_task(
    State(state): State<AppState>,
    CurrentOwner(owner_id): CurrentOwner,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.lifecycle.soft_delete(owner_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
