// src/services/leave_service.rs

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::{
    common::error::{AppError, LeaveAction, LeaveRuleViolation},
    models::{
        employee::Employee,
        leave::{
            ConflictingRange, DateRange, Decision, LeaveRequest, LeaveRequestDraft, LeaveStatus, LeaveType,
            LeaveTypeOption, NewLeaveRequest, OverlapResponse,
        },
    },
    services::{
        balance_service::recompute,
        leave_policy,
        notifier::{approval_message, ApprovalNotifier},
        store::{LeaveStore, StoreTx},
    },
};

// Leave request lifecycle: Saved -> Pending -> Approved | Rejected.
// Every mutation recomputes the owner's balance in the same transaction.
#[derive(Clone)]
pub struct LeaveService<S> {
    store: S,
    notifier: ApprovalNotifier,
}

impl<S: LeaveStore> LeaveService<S> {
    pub fn new(store: S, notifier: ApprovalNotifier) -> Self {
        Self { store, notifier }
    }

    // --- CATALOG ---

    /// Bookable (leaf) types, titled `Parent (Child)` below a root.
    pub async fn leave_types(&self) -> Result<Vec<LeaveTypeOption>, AppError> {
        let mut tx = self.store.begin().await?;
        let all = tx.leave_types().await?;
        tx.commit().await?;
        Ok(selectable(&all))
    }

    pub async fn create_leave_type(&self, title: &str, parent_id: Option<i64>) -> Result<LeaveType, AppError> {
        let mut tx = self.store.begin().await?;
        let leave_type = tx.insert_leave_type(title.trim(), parent_id).await?;
        tx.commit().await?;
        tracing::info!(leave_type_id = leave_type.id, title = %leave_type.title, "Leave type created");
        Ok(leave_type)
    }

    // --- LIFECYCLE ---

    pub async fn create(
        &self,
        owner: &Employee,
        draft: LeaveRequestDraft,
        today: NaiveDate,
    ) -> Result<LeaveRequest, AppError> {
        let mut tx = self.store.begin().await?;
        // Serializes this employee's mutations so overlap checks see each other.
        tx.lock_balance(owner.id).await?;

        let number_of_days = validate(&mut tx, owner.id, &draft, today, None).await?;
        let request = tx
            .insert_request(&NewLeaveRequest {
                employee_id: owner.id,
                leave_type_id: draft.leave_type_id,
                start_date: draft.start_date,
                end_date: draft.end_date,
                number_of_days,
                comment: draft.comment,
                status: LeaveStatus::Saved,
            })
            .await?;
        recompute(&mut tx, owner.id).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = request.id,
            employee_id = owner.id,
            days = number_of_days,
            "Leave request created"
        );
        Ok(request)
    }

    pub async fn update(
        &self,
        owner: &Employee,
        id: i64,
        draft: LeaveRequestDraft,
        today: NaiveDate,
    ) -> Result<LeaveRequest, AppError> {
        let mut tx = self.store.begin().await?;
        tx.lock_balance(owner.id).await?;

        let mut request = owned_for_update(&mut tx, owner.id, id).await?;
        leave_policy::ensure_transition(&request, LeaveAction::Update)?;

        request.number_of_days = validate(&mut tx, owner.id, &draft, today, Some(id)).await?;
        request.leave_type_id = draft.leave_type_id;
        request.start_date = draft.start_date;
        request.end_date = draft.end_date;
        request.comment = draft.comment;

        let request = tx.save_request(&request).await?;
        recompute(&mut tx, owner.id).await?;
        tx.commit().await?;

        tracing::info!(request_id = id, employee_id = owner.id, "Leave request updated");
        Ok(request)
    }

    pub async fn delete(&self, owner: &Employee, id: i64) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        tx.lock_balance(owner.id).await?;
        let request = owned_for_update(&mut tx, owner.id, id).await?;
        leave_policy::ensure_transition(&request, LeaveAction::Delete)?;

        tx.delete_request(id).await?;
        recompute(&mut tx, owner.id).await?;
        tx.commit().await?;

        tracing::info!(request_id = id, employee_id = owner.id, "Leave request deleted");
        Ok(())
    }

    /// Moves a saved request to `Pending` and notifies the approvers.
    ///
    /// A request whose start date has already passed cannot be submitted.
    /// The notification goes out after the commit and is never awaited: a
    /// failed or slow delivery leaves the request pending.
    pub async fn submit(&self, owner: &Employee, id: i64, today: NaiveDate) -> Result<LeaveRequest, AppError> {
        let mut tx = self.store.begin().await?;
        tx.lock_balance(owner.id).await?;
        let mut request = owned_for_update(&mut tx, owner.id, id).await?;
        leave_policy::ensure_transition(&request, LeaveAction::Submit)?;
        leave_policy::check_dates(request.range(), today)?;

        request.status = LeaveStatus::Pending;
        let request = tx.save_request(&request).await?;
        recompute(&mut tx, owner.id).await?;

        let leave_type = tx
            .leave_type(request.leave_type_id)
            .await?
            .ok_or(AppError::NotFound("leave type"))?;
        let approvers = tx.approvers().await?;
        tx.commit().await?;

        tracing::info!(
            request_id = id,
            employee_id = owner.id,
            approvers = approvers.len(),
            "Leave request submitted for approval"
        );
        self.notifier
            .dispatch(approvers, approval_message(&request, owner, &leave_type));
        Ok(request)
    }

    pub async fn decide(&self, decider: &Employee, id: i64, decision: Decision) -> Result<LeaveRequest, AppError> {
        let mut tx = self.store.begin().await?;
        // Balance row before request row, the same order as the owner's own mutations.
        let owner_id = tx
            .request(id)
            .await?
            .ok_or(AppError::NotFound("leave request"))?
            .employee_id;
        tx.lock_balance(owner_id).await?;
        let mut request = tx
            .request_for_update(id)
            .await?
            .ok_or(AppError::NotFound("leave request"))?;
        leave_policy::ensure_transition(&request, LeaveAction::Decide)?;

        request.status = decision.status();
        let request = tx.save_request(&request).await?;
        let balance = recompute(&mut tx, request.employee_id).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = id,
            employee_id = request.employee_id,
            decided_by = decider.id,
            status = %request.status,
            vacation_used = balance.days,
            "Leave request decided"
        );
        Ok(request)
    }

    // --- QUERIES ---

    pub async fn list_for(&self, owner: &Employee) -> Result<Vec<LeaveRequest>, AppError> {
        let mut tx = self.store.begin().await?;
        let requests = tx.requests_for(owner.id).await?;
        tx.commit().await?;
        Ok(requests)
    }

    pub async fn get_for(&self, owner: &Employee, id: i64) -> Result<LeaveRequest, AppError> {
        let mut tx = self.store.begin().await?;
        let request = owned_for_update(&mut tx, owner.id, id).await?;
        tx.commit().await?;
        Ok(request)
    }

    pub async fn pending(&self) -> Result<Vec<LeaveRequest>, AppError> {
        let mut tx = self.store.begin().await?;
        let requests = tx.pending_requests().await?;
        tx.commit().await?;
        Ok(requests)
    }

    /// Which of the owner's live requests intersect `range`.
    pub async fn check_overlap(&self, owner: &Employee, range: DateRange) -> Result<OverlapResponse, AppError> {
        if range.end <= range.start {
            return Err(LeaveRuleViolation::EndNotAfterStart {
                start: range.start,
                end: range.end,
            }
            .into());
        }

        let mut tx = self.store.begin().await?;
        let conflicts = tx.overlapping_requests(owner.id, range, None).await?;
        tx.commit().await?;

        Ok(OverlapResponse {
            overlap: !conflicts.is_empty(),
            conflicts: conflicts.iter().map(ConflictingRange::from).collect(),
        })
    }
}

fn selectable(all: &[LeaveType]) -> Vec<LeaveTypeOption> {
    let parents: HashSet<i64> = all.iter().filter_map(|t| t.parent_id).collect();
    all.iter()
        .filter(|t| !parents.contains(&t.id))
        .map(|t| LeaveTypeOption {
            id: t.id,
            title: t.display_title(),
        })
        .collect()
}

// Another employee's request is reported as missing.
async fn owned_for_update<T: StoreTx>(tx: &mut T, owner_id: i64, id: i64) -> Result<LeaveRequest, AppError> {
    tx.request_for_update(id)
        .await?
        .filter(|request| request.employee_id == owner_id)
        .ok_or(AppError::NotFound("leave request"))
}

/// Runs every creation rule and returns the derived day count.
async fn validate<T: StoreTx>(
    tx: &mut T,
    owner_id: i64,
    draft: &LeaveRequestDraft,
    today: NaiveDate,
    exclude_id: Option<i64>,
) -> Result<i32, AppError> {
    let leave_type = tx.leave_type(draft.leave_type_id).await?;
    let has_children = match &leave_type {
        Some(t) => tx.leave_type_has_children(t.id).await?,
        None => false,
    };
    leave_policy::check_leave_type(draft.leave_type_id, leave_type.as_ref(), has_children)?;

    let range = draft.range();
    leave_policy::check_dates(range, today)?;

    let conflicts = tx.overlapping_requests(owner_id, range, exclude_id).await?;
    leave_policy::check_overlaps(&conflicts)?;

    leave_policy::number_of_days(range)
}
