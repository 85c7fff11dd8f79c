pub mod auth;
pub mod balance_service;
pub mod duty_service;
pub mod leave_policy;
pub mod leave_service;
pub mod notifier;
pub mod period_service;
pub mod scheduler;
pub mod store;
