// src/services/leave_policy.rs
//
// Pure request rules. The lifecycle feeds them what it read from the store.

use chrono::NaiveDate;

use crate::{
    common::error::{AppError, LeaveAction, LeaveRuleViolation, StateViolation},
    models::leave::{ConflictingRange, DateRange, LeaveRequest, LeaveStatus, LeaveType},
};

/// Only childless types can be booked.
pub fn check_leave_type(
    leave_type_id: i64,
    leave_type: Option<&LeaveType>,
    has_children: bool,
) -> Result<(), LeaveRuleViolation> {
    let leave_type = leave_type.ok_or(LeaveRuleViolation::UnknownLeaveType(leave_type_id))?;
    if has_children {
        return Err(LeaveRuleViolation::LeafTypeRequired(leave_type.title.clone()));
    }
    Ok(())
}

pub fn check_dates(range: DateRange, today: NaiveDate) -> Result<(), LeaveRuleViolation> {
    if range.end <= range.start {
        return Err(LeaveRuleViolation::EndNotAfterStart {
            start: range.start,
            end: range.end,
        });
    }
    if range.start < today {
        return Err(LeaveRuleViolation::StartInPast {
            start: range.start,
            today,
        });
    }
    Ok(())
}

pub fn check_overlaps(conflicts: &[LeaveRequest]) -> Result<(), LeaveRuleViolation> {
    if conflicts.is_empty() {
        return Ok(());
    }
    Err(LeaveRuleViolation::Overlap(
        conflicts.iter().map(ConflictingRange::from).collect(),
    ))
}

/// Calendar days in `[start, end)`.
pub fn number_of_days(range: DateRange) -> Result<i32, AppError> {
    i32::try_from(range.days())
        .map_err(|_| anyhow::anyhow!("leave range {} - {} is too long", range.start, range.end).into())
}

fn allowed_from(action: LeaveAction) -> LeaveStatus {
    match action {
        LeaveAction::Update | LeaveAction::Delete | LeaveAction::Submit => LeaveStatus::Saved,
        LeaveAction::Decide => LeaveStatus::Pending,
    }
}

pub fn ensure_transition(request: &LeaveRequest, action: LeaveAction) -> Result<(), StateViolation> {
    if request.status == allowed_from(action) {
        Ok(())
    } else {
        Err(StateViolation {
            request_id: request.id,
            status: request.status,
            action,
        })
    }
}
