// src/handlers/leave_requests.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        today,
    },
    config::AppState,
    middleware::{
        auth::ActingEmployee,
        i18n::Locale,
        rbac::{PermLeaveDecide, RequirePermission},
    },
    models::leave::{
        DateRange, DecidePayload, LeaveRequest, LeaveRequestPayload, OverlapQuery, OverlapResponse,
    },
};

#[utoipa::path(
    get,
    path = "/api/leave-requests",
    tag = "Leave requests",
    responses((status = 200, description = "The acting employee's requests, latest first", body = [LeaveRequest])),
    security(("api_jwt" = []))
)]
pub async fn list_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    ActingEmployee(employee): ActingEmployee,
) -> Result<Json<Vec<LeaveRequest>>, ApiError> {
    let requests = app_state
        .leave_service
        .list_for(&employee)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(requests))
}

#[utoipa::path(
    post,
    path = "/api/leave-requests",
    tag = "Leave requests",
    request_body = LeaveRequestPayload,
    responses(
        (status = 201, description = "Request saved", body = LeaveRequest),
        (status = 400, description = "Dates, leave type or overlap rejected")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_request(
    State(app_state): State<AppState>,
    locale: Locale,
    ActingEmployee(employee): ActingEmployee,
    Json(payload): Json<LeaveRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let request = app_state
        .leave_service
        .create(&employee, payload.into(), today())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/api/leave-requests/check-overlap",
    tag = "Leave requests",
    params(OverlapQuery),
    responses((status = 200, description = "Live requests intersecting the range", body = OverlapResponse)),
    security(("api_jwt" = []))
)]
pub async fn check_overlap(
    State(app_state): State<AppState>,
    locale: Locale,
    ActingEmployee(employee): ActingEmployee,
    Query(query): Query<OverlapQuery>,
) -> Result<Json<OverlapResponse>, ApiError> {
    let response = app_state
        .leave_service
        .check_overlap(&employee, DateRange::new(query.start_date, query.end_date))
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/leave-requests/pending",
    tag = "Leave requests",
    responses((status = 200, description = "Requests awaiting a decision", body = [LeaveRequest])),
    security(("api_jwt" = []))
)]
pub async fn pending_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermLeaveDecide>,
) -> Result<Json<Vec<LeaveRequest>>, ApiError> {
    let requests = app_state
        .leave_service
        .pending()
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(requests))
}

#[utoipa::path(
    get,
    path = "/api/leave-requests/{id}",
    tag = "Leave requests",
    params(("id" = i64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "The request", body = LeaveRequest),
        (status = 404, description = "No such request for this employee")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_request(
    State(app_state): State<AppState>,
    locale: Locale,
    ActingEmployee(employee): ActingEmployee,
    Path(id): Path<i64>,
) -> Result<Json<LeaveRequest>, ApiError> {
    let request = app_state
        .leave_service
        .get_for(&employee, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave-requests/{id}",
    tag = "Leave requests",
    params(("id" = i64, Path, description = "Leave request id")),
    request_body = LeaveRequestPayload,
    responses(
        (status = 200, description = "Request updated", body = LeaveRequest),
        (status = 409, description = "Request is no longer saved")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_request(
    State(app_state): State<AppState>,
    locale: Locale,
    ActingEmployee(employee): ActingEmployee,
    Path(id): Path<i64>,
    Json(payload): Json<LeaveRequestPayload>,
) -> Result<Json<LeaveRequest>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let request = app_state
        .leave_service
        .update(&employee, id, payload.into(), today())
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(request))
}

#[utoipa::path(
    delete,
    path = "/api/leave-requests/{id}",
    tag = "Leave requests",
    params(("id" = i64, Path, description = "Leave request id")),
    responses(
        (status = 204, description = "Request deleted"),
        (status = 409, description = "Request is no longer saved")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_request(
    State(app_state): State<AppState>,
    locale: Locale,
    ActingEmployee(employee): ActingEmployee,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    app_state
        .leave_service
        .delete(&employee, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/leave-requests/{id}/submit",
    tag = "Leave requests",
    params(("id" = i64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Request sent for approval", body = LeaveRequest),
        (status = 400, description = "Start date has already passed"),
        (status = 409, description = "Request is no longer saved")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_request(
    State(app_state): State<AppState>,
    locale: Locale,
    ActingEmployee(employee): ActingEmployee,
    Path(id): Path<i64>,
) -> Result<Json<LeaveRequest>, ApiError> {
    let request = app_state
        .leave_service
        .submit(&employee, id, today())
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(request))
}

#[utoipa::path(
    post,
    path = "/api/leave-requests/{id}/decide",
    tag = "Leave requests",
    params(("id" = i64, Path, description = "Leave request id")),
    request_body = DecidePayload,
    responses(
        (status = 200, description = "Request approved or rejected", body = LeaveRequest),
        (status = 409, description = "Request is not pending")
    ),
    security(("api_jwt" = []))
)]
pub async fn decide_request(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermLeaveDecide>,
    Path(id): Path<i64>,
    Json(payload): Json<DecidePayload>,
) -> Result<Json<LeaveRequest>, ApiError> {
    let request = app_state
        .leave_service
        .decide(guard.employee(), id, payload.outcome)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(request))
}
