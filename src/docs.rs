// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::telegram_login,
        handlers::auth::is_employee,

        // --- Employees ---
        handlers::employees::get_me,
        handlers::employees::vacation_used,

        // --- Leave types ---
        handlers::leave_types::list_leave_types,
        handlers::leave_types::create_leave_type,

        // --- Leave requests ---
        handlers::leave_requests::list_requests,
        handlers::leave_requests::create_request,
        handlers::leave_requests::check_overlap,
        handlers::leave_requests::pending_requests,
        handlers::leave_requests::get_request,
        handlers::leave_requests::update_request,
        handlers::leave_requests::delete_request,
        handlers::leave_requests::submit_request,
        handlers::leave_requests::decide_request,

        // --- Duty ---
        handlers::duty::current_duty,
        handlers::duty::duty_history,
        handlers::duty::advance_duty,

        // --- Periods ---
        handlers::periods::reset_period,
    ),
    components(
        schemas(
            // --- Employees / Auth ---
            models::employee::Employee,
            models::employee::LoginPayload,
            models::employee::AuthResponse,
            models::employee::IsEmployeeResponse,

            // --- Leave ---
            models::leave::LeaveStatus,
            models::leave::Decision,
            models::leave::LeaveType,
            models::leave::LeaveTypeOption,
            models::leave::CreateLeaveTypePayload,
            models::leave::LeaveRequest,
            models::leave::LeaveRequestPayload,
            models::leave::DecidePayload,
            models::leave::ConflictingRange,
            models::leave::OverlapResponse,
            models::leave::VacationUsed,

            // --- Duty / Periods ---
            models::duty::DutyRoster,
            models::duty::CurrentDuty,
            models::duty::ResetPeriodPayload,
            models::duty::ResetOutcome,
        )
    ),
    tags(
        (name = "Auth", description = "Password and chat sign-in"),
        (name = "Employees", description = "The acting employee"),
        (name = "Leave types", description = "Leave categories"),
        (name = "Leave requests", description = "Leave request lifecycle and approvals"),
        (name = "Duty", description = "Weekend duty rotation"),
        (name = "Periods", description = "Vacation period reset")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("api_jwt", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}
