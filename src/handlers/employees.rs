// src/handlers/employees.rs

use axum::{extract::State, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::ActingEmployee, i18n::Locale},
    models::{employee::Employee, leave::VacationUsed},
};

#[utoipa::path(
    get,
    path = "/api/employees/me",
    tag = "Employees",
    responses((status = 200, description = "The acting employee", body = Employee)),
    security(("api_jwt" = []))
)]
pub async fn get_me(ActingEmployee(employee): ActingEmployee) -> Json<Employee> {
    Json(employee)
}

#[utoipa::path(
    get,
    path = "/api/employees/me/vacation-used",
    tag = "Employees",
    responses((status = 200, description = "Vacation days used in the current period", body = VacationUsed)),
    security(("api_jwt" = []))
)]
pub async fn vacation_used(
    State(app_state): State<AppState>,
    locale: Locale,
    ActingEmployee(employee): ActingEmployee,
) -> Result<Json<VacationUsed>, ApiError> {
    let balance = app_state
        .balance_service
        .balance(employee.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    Ok(Json(balance))
}
