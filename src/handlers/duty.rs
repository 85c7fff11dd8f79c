// src/handlers/duty.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::{error::ApiError, today},
    config::AppState,
    middleware::{
        auth::ActingEmployee,
        i18n::Locale,
        rbac::{PermDutyManage, RequirePermission},
    },
    models::duty::{CurrentDuty, DutyHistoryQuery, DutyRoster},
};

const DEFAULT_HISTORY_LIMIT: i64 = 20;

#[utoipa::path(
    get,
    path = "/api/duty/current",
    tag = "Duty",
    responses((status = 200, description = "Latest weekend assignment, null before the first rotation", body = CurrentDuty)),
    security(("api_jwt" = []))
)]
pub async fn current_duty(
    State(app_state): State<AppState>,
    locale: Locale,
    _employee: ActingEmployee,
) -> Result<Json<Option<CurrentDuty>>, ApiError> {
    let current = app_state
        .duty_service
        .current(today())
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(current))
}

#[utoipa::path(
    get,
    path = "/api/duty",
    tag = "Duty",
    params(DutyHistoryQuery),
    responses((status = 200, description = "Past assignments, newest first", body = [DutyRoster])),
    security(("api_jwt" = []))
)]
pub async fn duty_history(
    State(app_state): State<AppState>,
    locale: Locale,
    _employee: ActingEmployee,
    Query(query): Query<DutyHistoryQuery>,
) -> Result<Json<Vec<DutyRoster>>, ApiError> {
    let rows = app_state
        .duty_service
        .history(query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(rows))
}

/// Runs one rotation step now, outside the schedule.
#[utoipa::path(
    post,
    path = "/api/duty/advance",
    tag = "Duty",
    responses(
        (status = 201, description = "Next employee assigned", body = DutyRoster),
        (status = 409, description = "Nobody is eligible for duty")
    ),
    security(("api_jwt" = []))
)]
pub async fn advance_duty(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermDutyManage>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = app_state
        .duty_service
        .advance(today())
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    tracing::info!(requested_by = guard.employee().id, "Manual duty rotation");
    Ok((StatusCode::CREATED, Json(entry)))
}
