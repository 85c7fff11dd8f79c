// src/models/employee.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// An employee row. The username is the natural key, `telegram_id` the chat identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[schema(example = 7)]
    pub id: i64,
    #[schema(example = "o.shevchenko")]
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[schema(example = "Backend developer")]
    pub job_title: String,
    pub telegram_id: Option<i64>,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: Option<String>,

    pub can_duty: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    /// "First Last" when both names are known, the username otherwise.
    pub fn display_name(&self) -> String {
        if self.first_name.is_empty() || self.last_name.is_empty() {
            self.username.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

// Input for onboarding and chat-identity linking
#[derive(Debug, Clone, Default)]
pub struct NewEmployee {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub telegram_id: Option<i64>,
    pub password_hash: Option<String>,
    pub can_duty: bool,
    pub is_staff: bool,
    pub is_active: bool,
}

impl NewEmployee {
    pub fn active(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_active: true,
            ..Self::default()
        }
    }
}

// Identity fields carried by a signed chat payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatProfile {
    pub telegram_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

// --- Auth ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(length(min = 1, max = 150, message = "required"))]
    #[schema(example = "o.shevchenko")]
    pub username: String,
    #[validate(length(min = 1, message = "required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IsEmployeeResponse {
    pub status: bool,
}

// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,   // employee id
    pub exp: usize, // expires at
    pub iat: usize, // issued at
}
