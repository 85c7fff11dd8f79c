// src/models/duty.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// One weekend-duty assignment. Rows are append-only; the highest id is the latest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DutyRoster {
    pub id: i64,
    pub employee_id: i64,
    #[schema(example = "2024-08-17")]
    pub start_date: NaiveDate,
    #[schema(example = "2024-08-18")]
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentDuty {
    #[serde(flatten)]
    pub entry: DutyRoster,
    pub employee_name: String,
    /// The latest assignment already ended: the rotation job missed a run.
    pub stale: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPeriodPayload {
    #[schema(example = "2025-01-01")]
    pub period_start: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetOutcome {
    pub period_start: NaiveDate,
    pub balances_reset: u64,
    pub requests_expired: u64,
}

impl ResetOutcome {
    /// A run that changed nothing.
    pub fn none(period_start: NaiveDate) -> Self {
        Self {
            period_start,
            balances_reset: 0,
            requests_expired: 0,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DutyHistoryQuery {
    /// Rows to return, newest first (default 20).
    pub limit: Option<i64>,
}
