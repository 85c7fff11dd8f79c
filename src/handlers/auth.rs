// src/handlers/auth.rs

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::employee::{AuthResponse, IsEmployeeResponse, LoginPayload},
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let token = app_state
        .auth_service
        .login(&payload.username, &payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(AuthResponse { token }))
}

/// Signs in with a chat identity, onboarding the employee on first use.
#[utoipa::path(
    post,
    path = "/api/auth/telegram",
    tag = "Auth",
    params(
        ("telegram_id" = i64, Query, description = "Chat id vouched for by the bot"),
        ("auth_date" = i64, Query, description = "Unix time the payload was signed"),
        ("hash" = String, Query, description = "HMAC-SHA256 signature, hex")
    ),
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 401, description = "Signature missing, invalid or expired")
    )
)]
pub async fn telegram_login(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(fields): Query<BTreeMap<String, String>>,
) -> Result<Json<AuthResponse>, ApiError> {
    let auth = &app_state.auth_service;
    let profile = auth
        .verify_chat_payload(&fields, Utc::now())
        .map_err(|e| e.to_api_error(&locale))?;
    let employee = auth
        .link_chat_identity(&profile)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    let token = auth.create_token(employee.id).map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(AuthResponse { token }))
}

#[utoipa::path(
    get,
    path = "/api/auth/telegram/is-employee",
    tag = "Auth",
    params(
        ("telegram_id" = i64, Query, description = "Chat id vouched for by the bot"),
        ("auth_date" = i64, Query, description = "Unix time the payload was signed"),
        ("hash" = String, Query, description = "HMAC-SHA256 signature, hex")
    ),
    responses(
        (status = 200, description = "Whether the chat identity belongs to an active employee", body = IsEmployeeResponse)
    )
)]
pub async fn is_employee(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(fields): Query<BTreeMap<String, String>>,
) -> Result<Json<IsEmployeeResponse>, ApiError> {
    let status = app_state
        .auth_service
        .is_employee(&fields, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(IsEmployeeResponse { status }))
}
