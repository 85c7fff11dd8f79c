// src/middleware/auth.rs

use std::collections::BTreeMap;

use axum::{
    extract::{FromRef, FromRequestParts, Query},
    http::{header, request::Parts},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::Utc;

use crate::{
    common::{
        error::{ApiError, AppError},
        signature::HASH_FIELD,
    },
    config::AppState,
    middleware::i18n::Locale,
    models::employee::Employee,
};

/// Who is calling, resolved once per request from a bearer token or a
/// signed chat query string. `None` for anonymous callers.
#[derive(Debug, Clone)]
pub struct ActingIdentity(pub Option<Employee>);

impl<S> FromRequestParts<S> for ActingIdentity
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<ActingIdentity>() {
            return Ok(resolved.clone());
        }

        let locale = Locale::from_headers(&parts.headers);
        let app_state = AppState::from_ref(state);

        let bearer = if parts.headers.contains_key(header::AUTHORIZATION) {
            let TypedHeader(Authorization(bearer)) =
                TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                    .await
                    .map_err(|_| AppError::InvalidToken.to_api_error(&locale))?;
            Some(bearer)
        } else {
            None
        };

        let chat_fields = Query::<BTreeMap<String, String>>::try_from_uri(&parts.uri)
            .ok()
            .map(|Query(fields)| fields)
            .filter(|fields| fields.contains_key(HASH_FIELD));

        let employee = app_state
            .auth_service
            .resolve(bearer.as_ref().map(|b| b.token()), chat_fields.as_ref(), Utc::now())
            .await
            .map_err(|e| e.to_api_error(&locale))?;

        let identity = ActingIdentity(employee);
        parts.extensions.insert(identity.clone());
        Ok(identity)
    }
}

/// An identified employee; anonymous callers get 401.
#[derive(Debug, Clone)]
pub struct ActingEmployee(pub Employee);

impl<S> FromRequestParts<S> for ActingEmployee
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ActingIdentity(employee) = ActingIdentity::from_request_parts(parts, state).await?;
        employee
            .map(ActingEmployee)
            .ok_or_else(|| AppError::Unauthenticated.to_api_error(&Locale::from_headers(&parts.headers)))
    }
}
