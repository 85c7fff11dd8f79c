// src/db/pg_store.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    common::error::AppError,
    db::{BalanceRepository, DutyRepository, EmployeeRepository, LeaveRepository},
    models::{
        duty::{DutyRoster, ResetOutcome},
        employee::{Employee, NewEmployee},
        leave::{DateRange, LeaveRequest, LeaveType, NewLeaveRequest, VacationUsed},
    },
    services::store::{LeaveStore, StoreTx},
};

// The Postgres-backed store: repositories plus the pool transactions start from
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    employees: EmployeeRepository,
    leave: LeaveRepository,
    balances: BalanceRepository,
    duty: DutyRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            employees: EmployeeRepository::new(),
            leave: LeaveRepository::new(),
            balances: BalanceRepository::new(),
            duty: DutyRepository::new(),
        }
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
    store: PgStore,
}

#[async_trait]
impl LeaveStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, AppError> {
        let tx = self.pool.begin().await?;
        Ok(PgTx {
            tx,
            store: self.clone(),
        })
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn employee(&mut self, id: i64) -> Result<Option<Employee>, AppError> {
        self.store.employees.find_by_id(&mut *self.tx, id).await
    }

    async fn employee_by_telegram_id(&mut self, telegram_id: i64) -> Result<Option<Employee>, AppError> {
        self.store.employees.find_by_telegram_id(&mut *self.tx, telegram_id).await
    }

    async fn employee_by_username(&mut self, username: &str) -> Result<Option<Employee>, AppError> {
        self.store.employees.find_by_username(&mut *self.tx, username).await
    }

    async fn insert_employee(&mut self, new: &NewEmployee) -> Result<Employee, AppError> {
        self.store.employees.create(&mut *self.tx, new).await
    }

    async fn update_employee_names(
        &mut self,
        id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<Employee, AppError> {
        self.store
            .employees
            .update_names(&mut *self.tx, id, first_name, last_name)
            .await
    }

    async fn duty_candidates(&mut self) -> Result<Vec<Employee>, AppError> {
        self.store.employees.list_duty_candidates(&mut *self.tx).await
    }

    async fn approvers(&mut self) -> Result<Vec<Employee>, AppError> {
        self.store.employees.list_approvers(&mut *self.tx).await
    }

    async fn has_permission(&mut self, employee_id: i64, permission: &str) -> Result<bool, AppError> {
        self.store
            .employees
            .has_permission(&mut *self.tx, employee_id, permission)
            .await
    }

    async fn leave_type(&mut self, id: i64) -> Result<Option<LeaveType>, AppError> {
        self.store.leave.find_type(&mut *self.tx, id).await
    }

    async fn leave_type_has_children(&mut self, id: i64) -> Result<bool, AppError> {
        self.store.leave.type_has_children(&mut *self.tx, id).await
    }

    async fn leave_types(&mut self) -> Result<Vec<LeaveType>, AppError> {
        self.store.leave.list_types(&mut *self.tx).await
    }

    async fn insert_leave_type(&mut self, title: &str, parent_id: Option<i64>) -> Result<LeaveType, AppError> {
        self.store.leave.create_type(&mut *self.tx, title, parent_id).await
    }

    async fn request(&mut self, id: i64) -> Result<Option<LeaveRequest>, AppError> {
        self.store.leave.find_by_id(&mut *self.tx, id).await
    }

    async fn request_for_update(&mut self, id: i64) -> Result<Option<LeaveRequest>, AppError> {
        self.store.leave.find_for_update(&mut *self.tx, id).await
    }

    async fn requests_for(&mut self, employee_id: i64) -> Result<Vec<LeaveRequest>, AppError> {
        self.store.leave.list_for_employee(&mut *self.tx, employee_id).await
    }

    async fn pending_requests(&mut self) -> Result<Vec<LeaveRequest>, AppError> {
        self.store.leave.list_pending(&mut *self.tx).await
    }

    async fn overlapping_requests(
        &mut self,
        employee_id: i64,
        range: DateRange,
        exclude_id: Option<i64>,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        self.store
            .leave
            .find_overlapping(&mut *self.tx, employee_id, range, exclude_id)
            .await
    }

    async fn insert_request(&mut self, new: &NewLeaveRequest) -> Result<LeaveRequest, AppError> {
        self.store.leave.create(&mut *self.tx, new).await
    }

    async fn save_request(&mut self, request: &LeaveRequest) -> Result<LeaveRequest, AppError> {
        self.store.leave.save(&mut *self.tx, request).await
    }

    async fn delete_request(&mut self, id: i64) -> Result<(), AppError> {
        self.store.leave.delete(&mut *self.tx, id).await
    }

    async fn lock_balance(&mut self, employee_id: i64) -> Result<VacationUsed, AppError> {
        self.store.balances.lock(&mut *self.tx, employee_id).await
    }

    async fn approved_unexpired_days(&mut self, employee_id: i64) -> Result<i64, AppError> {
        self.store
            .balances
            .approved_unexpired_days(&mut *self.tx, employee_id)
            .await
    }

    async fn set_balance(&mut self, employee_id: i64, days: i32) -> Result<VacationUsed, AppError> {
        self.store.balances.upsert(&mut *self.tx, employee_id, days).await
    }

    async fn balance(&mut self, employee_id: i64) -> Result<Option<VacationUsed>, AppError> {
        self.store.balances.find(&mut *self.tx, employee_id).await
    }

    async fn reset_balances(&mut self) -> Result<u64, AppError> {
        self.store.balances.reset_all(&mut *self.tx).await
    }

    async fn expire_approved(&mut self) -> Result<u64, AppError> {
        self.store.leave.expire_approved(&mut *self.tx).await
    }

    async fn claim_period_reset(&mut self, period_start: NaiveDate) -> Result<bool, AppError> {
        self.store.balances.claim_reset(&mut *self.tx, period_start).await
    }

    async fn record_period_reset(&mut self, outcome: &ResetOutcome) -> Result<(), AppError> {
        self.store.balances.record_reset(&mut *self.tx, outcome).await
    }

    async fn period_reset_recorded(&mut self, period_start: NaiveDate) -> Result<bool, AppError> {
        self.store.balances.reset_recorded(&mut *self.tx, period_start).await
    }

    async fn last_duty(&mut self) -> Result<Option<DutyRoster>, AppError> {
        self.store.duty.last(&mut *self.tx).await
    }

    async fn insert_duty(
        &mut self,
        employee_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DutyRoster, AppError> {
        self.store
            .duty
            .create(&mut *self.tx, employee_id, start_date, end_date)
            .await
    }

    async fn duty_history(&mut self, limit: i64) -> Result<Vec<DutyRoster>, AppError> {
        self.store.duty.history(&mut *self.tx, limit).await
    }

    async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
