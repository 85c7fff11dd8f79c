// src/handlers/leave_types.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermLeaveTypeManage, RequirePermission},
    },
    models::leave::{CreateLeaveTypePayload, LeaveType, LeaveTypeOption},
};

#[utoipa::path(
    get,
    path = "/api/leave-types",
    tag = "Leave types",
    responses((status = 200, description = "Bookable leave types", body = [LeaveTypeOption]))
)]
pub async fn list_leave_types(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<Json<Vec<LeaveTypeOption>>, ApiError> {
    let options = app_state
        .leave_service
        .leave_types()
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(options))
}

#[utoipa::path(
    post,
    path = "/api/leave-types",
    tag = "Leave types",
    request_body = CreateLeaveTypePayload,
    responses(
        (status = 201, description = "Leave type created", body = LeaveType),
        (status = 409, description = "Title already exists")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_leave_type(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermLeaveTypeManage>,
    Json(payload): Json<CreateLeaveTypePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let leave_type = app_state
        .leave_service
        .create_leave_type(&payload.title, payload.parent_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(leave_type)))
}
