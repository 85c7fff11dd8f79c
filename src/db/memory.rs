// In-memory store for unit tests.
//
// A transaction works on a private copy of the state and publishes it on
// commit, so a dropped transaction leaves nothing behind.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::{
    common::error::AppError,
    models::{
        duty::{DutyRoster, ResetOutcome},
        employee::{Employee, NewEmployee},
        leave::{DateRange, LeaveRequest, LeaveStatus, LeaveType, NewLeaveRequest, VacationUsed},
    },
    services::store::{LeaveStore, StoreTx},
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub employees: Vec<Employee>,
    /// employee id -> permissions granted through group membership
    pub groups: BTreeMap<i64, BTreeSet<String>>,
    pub leave_types: Vec<LeaveType>,
    pub requests: Vec<LeaveRequest>,
    pub balances: BTreeMap<i64, VacationUsed>,
    pub duty: Vec<DutyRoster>,
    pub resets: BTreeMap<NaiveDate, ResetOutcome>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A row lock taken by a transaction, in the order it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    Balance(i64),
    Request(i64),
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    locks: Arc<Mutex<Vec<RowLock>>>,
    chat_misses: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MemoryState {
        self.state.lock().expect("memory store poisoned").clone()
    }

    /// Row locks taken since the last call, across every transaction.
    pub fn take_locks(&self) -> Vec<RowLock> {
        std::mem::take(&mut *self.locks.lock().expect("lock log poisoned"))
    }

    /// The next chat-id lookup reports no employee, as if another request
    /// linked the account after this one looked.
    pub fn miss_next_chat_lookup(&self) {
        self.chat_misses.fetch_add(1, Ordering::SeqCst);
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut state = self.state.lock().expect("memory store poisoned");
        f(&mut state)
    }

    pub fn add_employee(&self, new: NewEmployee) -> Employee {
        self.with_state(|state| insert_employee(state, &new)).expect("seed employee")
    }

    pub fn add_leave_type(&self, title: &str, parent_id: Option<i64>) -> LeaveType {
        self.with_state(|state| insert_leave_type(state, title, parent_id))
            .expect("seed leave type")
    }

    pub fn grant(&self, employee_id: i64, permissions: &[&str]) {
        self.with_state(|state| {
            state
                .groups
                .entry(employee_id)
                .or_default()
                .extend(permissions.iter().map(|p| p.to_string()));
        });
    }

    pub fn set_can_duty(&self, employee_id: i64, can_duty: bool) {
        self.with_state(|state| {
            if let Some(e) = state.employees.iter_mut().find(|e| e.id == employee_id) {
                e.can_duty = can_duty;
            }
        });
    }

    /// Writes a request row as-is, bypassing the lifecycle.
    pub fn put_request(&self, request: LeaveRequest) {
        self.with_state(|state| {
            state.requests.retain(|r| r.id != request.id);
            state.next_id = state.next_id.max(request.id);
            state.requests.push(request);
        });
    }
}

fn insert_employee(state: &mut MemoryState, new: &NewEmployee) -> Result<Employee, AppError> {
    if state.employees.iter().any(|e| e.username == new.username) {
        return Err(AppError::UsernameTaken(new.username.clone()));
    }
    if let Some(telegram_id) = new.telegram_id {
        if state.employees.iter().any(|e| e.telegram_id == Some(telegram_id)) {
            return Err(AppError::ChatIdentityTaken(telegram_id));
        }
    }
    let employee = Employee {
        id: state.next_id(),
        username: new.username.clone(),
        first_name: new.first_name.clone(),
        last_name: new.last_name.clone(),
        job_title: new.job_title.clone(),
        telegram_id: new.telegram_id,
        password_hash: new.password_hash.clone(),
        can_duty: new.can_duty,
        is_staff: new.is_staff,
        is_superuser: false,
        is_active: new.is_active,
        created_at: Utc::now(),
    };
    state.employees.push(employee.clone());
    Ok(employee)
}

fn insert_leave_type(state: &mut MemoryState, title: &str, parent_id: Option<i64>) -> Result<LeaveType, AppError> {
    if state.leave_types.iter().any(|t| t.title == title) {
        return Err(AppError::LeaveTypeTitleTaken(title.to_string()));
    }
    let parent_title = match parent_id {
        Some(id) => Some(
            state
                .leave_types
                .iter()
                .find(|t| t.id == id)
                .map(|t| t.title.clone())
                .ok_or(AppError::NotFound("parent leave type"))?,
        ),
        None => None,
    };
    let leave_type = LeaveType {
        id: state.next_id(),
        title: title.to_string(),
        parent_id,
        parent_title,
    };
    state.leave_types.push(leave_type.clone());
    Ok(leave_type)
}

pub struct MemoryTx {
    shared: Arc<Mutex<MemoryState>>,
    locks: Arc<Mutex<Vec<RowLock>>>,
    chat_misses: Arc<AtomicUsize>,
    state: MemoryState,
}

impl MemoryTx {
    fn record(&self, lock: RowLock) {
        self.locks.lock().expect("lock log poisoned").push(lock);
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, AppError> {
        Ok(MemoryTx {
            shared: Arc::clone(&self.state),
            locks: Arc::clone(&self.locks),
            chat_misses: Arc::clone(&self.chat_misses),
            state: self.snapshot(),
        })
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn employee(&mut self, id: i64) -> Result<Option<Employee>, AppError> {
        Ok(self.state.employees.iter().find(|e| e.id == id).cloned())
    }

    async fn employee_by_telegram_id(&mut self, telegram_id: i64) -> Result<Option<Employee>, AppError> {
        let missed = self
            .chat_misses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if missed {
            return Ok(None);
        }
        Ok(self
            .state
            .employees
            .iter()
            .find(|e| e.telegram_id == Some(telegram_id))
            .cloned())
    }

    async fn employee_by_username(&mut self, username: &str) -> Result<Option<Employee>, AppError> {
        Ok(self.state.employees.iter().find(|e| e.username == username).cloned())
    }

    async fn insert_employee(&mut self, new: &NewEmployee) -> Result<Employee, AppError> {
        insert_employee(&mut self.state, new)
    }

    async fn update_employee_names(
        &mut self,
        id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<Employee, AppError> {
        let employee = self
            .state
            .employees
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(AppError::NotFound("employee"))?;
        employee.first_name = first_name.to_string();
        employee.last_name = last_name.to_string();
        Ok(employee.clone())
    }

    async fn duty_candidates(&mut self) -> Result<Vec<Employee>, AppError> {
        let mut roster: Vec<Employee> = self.state.employees.iter().filter(|e| e.can_duty).cloned().collect();
        roster.sort_by_key(|e| e.id);
        Ok(roster)
    }

    async fn approvers(&mut self) -> Result<Vec<Employee>, AppError> {
        Ok(self
            .state
            .employees
            .iter()
            .filter(|e| {
                e.is_staff && e.is_active && e.telegram_id.is_some() && self.state.groups.contains_key(&e.id)
            })
            .cloned()
            .collect())
    }

    async fn has_permission(&mut self, employee_id: i64, permission: &str) -> Result<bool, AppError> {
        let Some(employee) = self.state.employees.iter().find(|e| e.id == employee_id) else {
            return Ok(false);
        };
        Ok(employee.is_active
            && (employee.is_superuser
                || self
                    .state
                    .groups
                    .get(&employee_id)
                    .is_some_and(|perms| perms.contains(permission))))
    }

    async fn leave_type(&mut self, id: i64) -> Result<Option<LeaveType>, AppError> {
        Ok(self.state.leave_types.iter().find(|t| t.id == id).cloned())
    }

    async fn leave_type_has_children(&mut self, id: i64) -> Result<bool, AppError> {
        Ok(self.state.leave_types.iter().any(|t| t.parent_id == Some(id)))
    }

    async fn leave_types(&mut self) -> Result<Vec<LeaveType>, AppError> {
        Ok(self.state.leave_types.clone())
    }

    async fn insert_leave_type(&mut self, title: &str, parent_id: Option<i64>) -> Result<LeaveType, AppError> {
        insert_leave_type(&mut self.state, title, parent_id)
    }

    async fn request(&mut self, id: i64) -> Result<Option<LeaveRequest>, AppError> {
        Ok(self.state.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn request_for_update(&mut self, id: i64) -> Result<Option<LeaveRequest>, AppError> {
        self.record(RowLock::Request(id));
        Ok(self.state.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn requests_for(&mut self, employee_id: i64) -> Result<Vec<LeaveRequest>, AppError> {
        let mut requests: Vec<LeaveRequest> = self
            .state
            .requests
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn pending_requests(&mut self) -> Result<Vec<LeaveRequest>, AppError> {
        Ok(self
            .state
            .requests
            .iter()
            .filter(|r| r.status == LeaveStatus::Pending)
            .cloned()
            .collect())
    }

    async fn overlapping_requests(
        &mut self,
        employee_id: i64,
        range: DateRange,
        exclude_id: Option<i64>,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        let mut found: Vec<LeaveRequest> = self
            .state
            .requests
            .iter()
            .filter(|r| {
                r.employee_id == employee_id
                    && r.status.is_live()
                    && Some(r.id) != exclude_id
                    && r.range().overlaps(&range)
            })
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.start_date, r.id));
        Ok(found)
    }

    async fn insert_request(&mut self, new: &NewLeaveRequest) -> Result<LeaveRequest, AppError> {
        let now = Utc::now();
        let request = LeaveRequest {
            id: self.state.next_id(),
            employee_id: new.employee_id,
            leave_type_id: new.leave_type_id,
            start_date: new.start_date,
            end_date: new.end_date,
            number_of_days: new.number_of_days,
            comment: new.comment.clone(),
            status: new.status,
            expired: false,
            created_at: now,
            updated_at: now,
        };
        self.state.requests.push(request.clone());
        Ok(request)
    }

    async fn save_request(&mut self, request: &LeaveRequest) -> Result<LeaveRequest, AppError> {
        let row = self
            .state
            .requests
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or(AppError::NotFound("leave request"))?;
        *row = LeaveRequest {
            updated_at: Utc::now(),
            ..request.clone()
        };
        Ok(row.clone())
    }

    async fn delete_request(&mut self, id: i64) -> Result<(), AppError> {
        self.state.requests.retain(|r| r.id != id);
        Ok(())
    }

    async fn lock_balance(&mut self, employee_id: i64) -> Result<VacationUsed, AppError> {
        self.record(RowLock::Balance(employee_id));
        Ok(self
            .state
            .balances
            .entry(employee_id)
            .or_insert_with(|| VacationUsed::empty(employee_id))
            .clone())
    }

    async fn approved_unexpired_days(&mut self, employee_id: i64) -> Result<i64, AppError> {
        Ok(self
            .state
            .requests
            .iter()
            .filter(|r| r.employee_id == employee_id && r.counts_toward_balance())
            .map(|r| i64::from(r.number_of_days))
            .sum())
    }

    async fn set_balance(&mut self, employee_id: i64, days: i32) -> Result<VacationUsed, AppError> {
        let row = VacationUsed {
            employee_id,
            days,
            updated_at: Utc::now(),
        };
        self.state.balances.insert(employee_id, row.clone());
        Ok(row)
    }

    async fn balance(&mut self, employee_id: i64) -> Result<Option<VacationUsed>, AppError> {
        Ok(self.state.balances.get(&employee_id).cloned())
    }

    async fn reset_balances(&mut self) -> Result<u64, AppError> {
        for row in self.state.balances.values_mut() {
            row.days = 0;
        }
        Ok(self.state.balances.len() as u64)
    }

    async fn expire_approved(&mut self) -> Result<u64, AppError> {
        let mut changed = 0;
        for request in self
            .state
            .requests
            .iter_mut()
            .filter(|r| r.status == LeaveStatus::Approved && !r.expired)
        {
            request.expired = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn claim_period_reset(&mut self, period_start: NaiveDate) -> Result<bool, AppError> {
        if self.state.resets.contains_key(&period_start) {
            return Ok(false);
        }
        self.state.resets.insert(period_start, ResetOutcome::none(period_start));
        Ok(true)
    }

    async fn record_period_reset(&mut self, outcome: &ResetOutcome) -> Result<(), AppError> {
        self.state.resets.insert(outcome.period_start, outcome.clone());
        Ok(())
    }

    async fn period_reset_recorded(&mut self, period_start: NaiveDate) -> Result<bool, AppError> {
        Ok(self.state.resets.contains_key(&period_start))
    }

    async fn last_duty(&mut self) -> Result<Option<DutyRoster>, AppError> {
        Ok(self.state.duty.iter().max_by_key(|d| d.id).cloned())
    }

    async fn insert_duty(
        &mut self,
        employee_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DutyRoster, AppError> {
        let duty = DutyRoster {
            id: self.state.next_id(),
            employee_id,
            start_date,
            end_date,
            created_at: Utc::now(),
        };
        self.state.duty.push(duty.clone());
        Ok(duty)
    }

    async fn duty_history(&mut self, limit: i64) -> Result<Vec<DutyRoster>, AppError> {
        let mut rows = self.state.duty.clone();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn commit(self) -> Result<(), AppError> {
        *self.shared.lock().expect("memory store poisoned") = self.state;
        Ok(())
    }
}
