// src/models/leave.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "leave_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Saved,
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaveStatus::Saved => "saved",
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }

    /// Rejected requests no longer hold their dates.
    pub fn is_live(self) -> bool {
        self != LeaveStatus::Rejected
    }
}

impl std::fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Manager outcome for a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn status(self) -> LeaveStatus {
        match self {
            Decision::Approved => LeaveStatus::Approved,
            Decision::Rejected => LeaveStatus::Rejected,
        }
    }
}

// --- Catalog ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveType {
    pub id: i64,
    #[schema(example = "Home")]
    pub title: String,
    pub parent_id: Option<i64>,
    #[schema(example = "Sick")]
    pub parent_title: Option<String>,
}

impl LeaveType {
    /// `Sick (Home)` for a child node, the bare title for a root.
    pub fn display_title(&self) -> String {
        match &self.parent_title {
            Some(parent) => format!("{} ({})", parent, self.title),
            None => self.title.clone(),
        }
    }
}

// Selectable (leaf) leave type as offered to the front-ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveTypeOption {
    pub id: i64,
    #[schema(example = "Sick (Home)")]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaveTypePayload {
    #[validate(length(min = 1, max = 150, message = "required"))]
    #[schema(example = "Hospital")]
    pub title: String,
    pub parent_id: Option<i64>,
}

// --- Requests ---

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    // Ranges that only touch at a boundary do not overlap.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: i64,
    pub employee_id: i64,
    pub leave_type_id: i64,
    #[schema(example = "2024-08-15")]
    pub start_date: NaiveDate,
    #[schema(example = "2024-08-20")]
    pub end_date: NaiveDate,
    #[schema(example = 5)]
    pub number_of_days: i32,
    pub comment: Option<String>,
    pub status: LeaveStatus,
    pub expired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn counts_toward_balance(&self) -> bool {
        self.status == LeaveStatus::Approved && !self.expired
    }
}

// User-editable part of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequestDraft {
    pub leave_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub comment: Option<String>,
}

impl LeaveRequestDraft {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

// Row to insert; `number_of_days` is derived by the lifecycle, never taken from input
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: i64,
    pub leave_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_days: i32,
    pub comment: Option<String>,
    pub status: LeaveStatus,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestPayload {
    #[schema(example = 3)]
    pub leave_type_id: i64,
    #[schema(example = "2024-08-15")]
    pub start_date: NaiveDate,
    #[schema(example = "2024-08-20")]
    pub end_date: NaiveDate,
    #[validate(length(max = 1000, message = "too_long"))]
    #[schema(example = "Family trip")]
    pub comment: Option<String>,
}

impl From<LeaveRequestPayload> for LeaveRequestDraft {
    fn from(payload: LeaveRequestPayload) -> Self {
        Self {
            leave_type_id: payload.leave_type_id,
            start_date: payload.start_date,
            end_date: payload.end_date,
            comment: payload
                .comment
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DecidePayload {
    pub outcome: Decision,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OverlapQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictingRange {
    pub id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<&LeaveRequest> for ConflictingRange {
    fn from(request: &LeaveRequest) -> Self {
        Self {
            id: request.id,
            start_date: request.start_date,
            end_date: request.end_date,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverlapResponse {
    pub overlap: bool,
    pub conflicts: Vec<ConflictingRange>,
}

// --- Balance ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VacationUsed {
    pub employee_id: i64,
    #[schema(example = 12)]
    pub days: i32,
    pub updated_at: DateTime<Utc>,
}

impl VacationUsed {
    pub fn empty(employee_id: i64) -> Self {
        Self {
            employee_id,
            days: 0,
            updated_at: Utc::now(),
        }
    }
}
