//! Storage seam between the services and the database.
//!
//! Every service operation opens one transaction with [`LeaveStore::begin`],
//! performs its reads and writes through [`StoreTx`], and commits. Dropping a
//! transaction without committing rolls it back. `PgStore` is the production
//! implementation; tests use the in-memory store.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    common::error::AppError,
    models::{
        duty::{DutyRoster, ResetOutcome},
        employee::{Employee, NewEmployee},
        leave::{DateRange, LeaveRequest, LeaveType, NewLeaveRequest, VacationUsed},
    },
};

#[async_trait]
pub trait LeaveStore: Clone + Send + Sync + 'static {
    type Tx: StoreTx;

    async fn begin(&self) -> Result<Self::Tx, AppError>;
}

#[async_trait]
pub trait StoreTx: Send + Sized {
    // --- Employees ---

    async fn employee(&mut self, id: i64) -> Result<Option<Employee>, AppError>;

    async fn employee_by_telegram_id(&mut self, telegram_id: i64) -> Result<Option<Employee>, AppError>;

    async fn employee_by_username(&mut self, username: &str) -> Result<Option<Employee>, AppError>;

    /// Fails with `UsernameTaken` on a username collision and
    /// `ChatIdentityTaken` when the telegram id is already linked.
    async fn insert_employee(&mut self, new: &NewEmployee) -> Result<Employee, AppError>;

    async fn update_employee_names(
        &mut self,
        id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<Employee, AppError>;

    /// `can_duty` employees ordered by id.
    async fn duty_candidates(&mut self) -> Result<Vec<Employee>, AppError>;

    /// Active staff with a chat identity who belong to at least one group.
    async fn approvers(&mut self) -> Result<Vec<Employee>, AppError>;

    async fn has_permission(&mut self, employee_id: i64, permission: &str) -> Result<bool, AppError>;

    // --- Leave catalog ---

    async fn leave_type(&mut self, id: i64) -> Result<Option<LeaveType>, AppError>;

    async fn leave_type_has_children(&mut self, id: i64) -> Result<bool, AppError>;

    /// The whole tree ordered by id.
    async fn leave_types(&mut self) -> Result<Vec<LeaveType>, AppError>;

    /// Fails with `LeaveTypeTitleTaken` on a duplicate title.
    async fn insert_leave_type(&mut self, title: &str, parent_id: Option<i64>) -> Result<LeaveType, AppError>;

    // --- Leave requests ---

    async fn request(&mut self, id: i64) -> Result<Option<LeaveRequest>, AppError>;

    /// Reads the row and locks it until the transaction ends.
    async fn request_for_update(&mut self, id: i64) -> Result<Option<LeaveRequest>, AppError>;

    async fn requests_for(&mut self, employee_id: i64) -> Result<Vec<LeaveRequest>, AppError>;

    async fn pending_requests(&mut self) -> Result<Vec<LeaveRequest>, AppError>;

    /// Non-rejected requests of `employee_id` whose `[start, end)` intersects `range`.
    async fn overlapping_requests(
        &mut self,
        employee_id: i64,
        range: DateRange,
        exclude_id: Option<i64>,
    ) -> Result<Vec<LeaveRequest>, AppError>;

    async fn insert_request(&mut self, new: &NewLeaveRequest) -> Result<LeaveRequest, AppError>;

    /// Persists every mutable column of `request`.
    async fn save_request(&mut self, request: &LeaveRequest) -> Result<LeaveRequest, AppError>;

    async fn delete_request(&mut self, id: i64) -> Result<(), AppError>;

    // --- Vacation balance ---

    /// Creates the balance row if missing and locks it until the transaction ends.
    async fn lock_balance(&mut self, employee_id: i64) -> Result<VacationUsed, AppError>;

    /// Σ number_of_days over approved, non-expired requests.
    async fn approved_unexpired_days(&mut self, employee_id: i64) -> Result<i64, AppError>;

    async fn set_balance(&mut self, employee_id: i64, days: i32) -> Result<VacationUsed, AppError>;

    async fn balance(&mut self, employee_id: i64) -> Result<Option<VacationUsed>, AppError>;

    async fn reset_balances(&mut self) -> Result<u64, AppError>;

    /// Marks approved requests expired; returns how many changed.
    async fn expire_approved(&mut self) -> Result<u64, AppError>;

    /// Inserts the run row for `period_start`; `false` when another run already holds it.
    async fn claim_period_reset(&mut self, period_start: NaiveDate) -> Result<bool, AppError>;

    async fn record_period_reset(&mut self, outcome: &ResetOutcome) -> Result<(), AppError>;

    async fn period_reset_recorded(&mut self, period_start: NaiveDate) -> Result<bool, AppError>;

    // --- Duty roster ---

    /// Highest-id row.
    async fn last_duty(&mut self) -> Result<Option<DutyRoster>, AppError>;

    async fn insert_duty(
        &mut self,
        employee_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DutyRoster, AppError>;

    /// Newest first.
    async fn duty_history(&mut self, limit: i64) -> Result<Vec<DutyRoster>, AppError>;

    async fn commit(self) -> Result<(), AppError>;
}
