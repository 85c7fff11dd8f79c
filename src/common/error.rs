use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{
    common::{i18n, signature::SignatureError},
    middleware::i18n::Locale,
    models::leave::{ConflictingRange, LeaveStatus},
};

// Rules a leave request must satisfy on create/update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaveRuleViolation {
    #[error("leave type {0} does not exist")]
    UnknownLeaveType(i64),

    #[error("leave type '{0}' has subtypes, pick one of them")]
    LeafTypeRequired(String),

    #[error("end date {end} must be after start date {start}")]
    EndNotAfterStart {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("start date {start} is earlier than today ({today})")]
    StartInPast {
        start: chrono::NaiveDate,
        today: chrono::NaiveDate,
    },

    #[error("dates overlap with other leave requests: {}", format_conflicts(.0))]
    Overlap(Vec<ConflictingRange>),
}

pub(crate) fn format_conflicts(conflicts: &[ConflictingRange]) -> String {
    conflicts
        .iter()
        .map(|c| format!("#{}: {} - {}", c.id, c.start_date, c.end_date))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveAction {
    Update,
    Delete,
    Submit,
    Decide,
}

impl std::fmt::Display for LeaveAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LeaveAction::Update => "edit",
            LeaveAction::Delete => "delete",
            LeaveAction::Submit => "submit",
            LeaveAction::Decide => "decide",
        })
    }
}

// An operation attempted from a status that forbids it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} leave request #{request_id} while it is {status}")]
pub struct StateViolation {
    pub request_id: i64,
    pub status: LeaveStatus,
    pub action: LeaveAction,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("payload validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error(transparent)]
    LeaveRule(#[from] LeaveRuleViolation),

    #[error(transparent)]
    InvalidState(#[from] StateViolation),

    #[error("no employees are eligible for weekend duty")]
    EmptyRoster,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("leave type title already exists: {0}")]
    LeaveTypeTitleTaken(String),

    #[error("username already exists: {0}")]
    UsernameTaken(String),

    #[error("chat account {0} is already linked to an employee")]
    ChatIdentityTaken(i64),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("authentication required")]
    Unauthenticated,

    #[error("missing permission '{0}'")]
    Forbidden(&'static str),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::LeaveRule(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidState(_)
            | AppError::EmptyRoster
            | AppError::LeaveTypeTitleTaken(_)
            | AppError::UsernameTaken(_)
            | AppError::ChatIdentityTaken(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::Unauthenticated
            | AppError::Signature(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Localized response body for this error.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "internal server error");
        }

        let lang = i18n::Lang::from_tag(&locale.0);
        let details = match self {
            AppError::ValidationError(errors) => {
                let mut fields = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let codes: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    fields.insert(field.to_string(), json!(codes));
                }
                Some(serde_json::Value::Object(fields))
            }
            AppError::LeaveRule(LeaveRuleViolation::Overlap(conflicts)) => {
                Some(json!({ "conflicts": conflicts }))
            }
            _ => None,
        };

        ApiError {
            status,
            error: i18n::describe(lang, self),
            details,
        }
    }
}

// The error body every handler answers with.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Extractor rejections carry no locale; they answer in English.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}
