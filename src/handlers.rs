pub mod auth;
pub mod duty;
pub mod employees;
pub mod leave_requests;
pub mod leave_types;
pub mod periods;
