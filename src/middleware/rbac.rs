// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::ActingEmployee, i18n::Locale},
    models::employee::Employee,
};

/// A named permission granted through group membership.
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// Guard extractor: the acting employee, proven to hold `T`.
pub struct RequirePermission<T>(pub Employee, PhantomData<T>);

impl<T> RequirePermission<T> {
    pub fn employee(&self) -> &Employee {
        &self.0
    }
}

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ActingEmployee(employee) = ActingEmployee::from_request_parts(parts, state).await?;
        let locale = Locale::from_headers(&parts.headers);
        let app_state = AppState::from_ref(state);

        let required_perm = T::slug();
        let allowed = app_state
            .auth_service
            .has_permission(employee.id, required_perm)
            .await
            .map_err(|e| e.to_api_error(&locale))?;

        if !allowed {
            tracing::warn!(employee_id = employee.id, permission = required_perm, "Permission denied");
            return Err(AppError::Forbidden(required_perm).to_api_error(&locale));
        }

        Ok(RequirePermission(employee, PhantomData))
    }
}

// ---
// Permissions
// ---

pub struct PermLeaveDecide;
impl PermissionDef for PermLeaveDecide {
    fn slug() -> &'static str { "leave:decide" }
}

pub struct PermDutyManage;
impl PermissionDef for PermDutyManage {
    fn slug() -> &'static str { "duty:manage" }
}

pub struct PermPeriodReset;
impl PermissionDef for PermPeriodReset {
    fn slug() -> &'static str { "period:reset" }
}

pub struct PermLeaveTypeManage;
impl PermissionDef for PermLeaveTypeManage {
    fn slug() -> &'static str { "leave_type:manage" }
}
