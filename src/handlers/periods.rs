// src/handlers/periods.rs

use axum::{extract::State, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermPeriodReset, RequirePermission},
    },
    models::duty::{ResetOutcome, ResetPeriodPayload},
};

#[utoipa::path(
    post,
    path = "/api/periods/reset",
    tag = "Periods",
    request_body = ResetPeriodPayload,
    responses((status = 200, description = "Balances zeroed, approved requests expired", body = ResetOutcome)),
    security(("api_jwt" = []))
)]
pub async fn reset_period(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermPeriodReset>,
    Json(payload): Json<ResetPeriodPayload>,
) -> Result<Json<ResetOutcome>, ApiError> {
    let outcome = app_state
        .period_service
        .reset(payload.period_start)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    tracing::info!(requested_by = guard.employee().id, "Manual period reset");
    Ok(Json(outcome))
}
