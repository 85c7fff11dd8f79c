// src/services/duty_service.rs

use chrono::{Datelike, Duration, NaiveDate};

use crate::{
    common::error::AppError,
    models::{
        duty::{CurrentDuty, DutyRoster},
        employee::Employee,
    },
    services::store::{LeaveStore, StoreTx},
};

/// Saturday on or after `today`, and the Sunday after it.
pub fn upcoming_weekend(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = (5 - i64::from(today.weekday().num_days_from_monday())).rem_euclid(7);
    let saturday = today + Duration::days(offset);
    (saturday, saturday + Duration::days(1))
}

/// Round-robin successor of the last assignee, wrapping at the end of the
/// roster. Starts over at the head when there is no previous assignee or
/// they are no longer eligible.
pub fn pick_next(roster: &[Employee], last_employee_id: Option<i64>) -> Option<&Employee> {
    let position = last_employee_id.and_then(|id| roster.iter().position(|e| e.id == id));
    match position {
        Some(i) => roster.get((i + 1) % roster.len()),
        None => roster.first(),
    }
}

#[derive(Clone)]
pub struct DutyService<S> {
    store: S,
}

impl<S: LeaveStore> DutyService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Appends the next weekend assignment. Every call advances the rotation.
    pub async fn advance(&self, today: NaiveDate) -> Result<DutyRoster, AppError> {
        let mut tx = self.store.begin().await?;
        let roster = tx.duty_candidates().await?;
        let last = tx.last_duty().await?;

        let Some(next) = pick_next(&roster, last.as_ref().map(|d| d.employee_id)) else {
            tracing::warn!("No employees are eligible for weekend duty, rotation skipped");
            return Err(AppError::EmptyRoster);
        };

        let (saturday, sunday) = upcoming_weekend(today);
        let entry = tx.insert_duty(next.id, saturday, sunday).await?;
        tx.commit().await?;

        tracing::info!(
            employee_id = entry.employee_id,
            start_date = %entry.start_date,
            end_date = %entry.end_date,
            "Weekend duty assigned"
        );
        Ok(entry)
    }

    /// Latest assignment, flagged stale once its weekend has passed.
    pub async fn current(&self, today: NaiveDate) -> Result<Option<CurrentDuty>, AppError> {
        let mut tx = self.store.begin().await?;
        let Some(entry) = tx.last_duty().await? else {
            return Ok(None);
        };
        let employee_name = tx
            .employee(entry.employee_id)
            .await?
            .map(|e| e.display_name())
            .unwrap_or_default();
        tx.commit().await?;

        Ok(Some(CurrentDuty {
            stale: today > entry.end_date,
            entry,
            employee_name,
        }))
    }

    pub async fn history(&self, limit: i64) -> Result<Vec<DutyRoster>, AppError> {
        let mut tx = self.store.begin().await?;
        let rows = tx.duty_history(limit.clamp(1, 500)).await?;
        tx.commit().await?;
        Ok(rows)
    }

    /// Whether the latest row already covers the weekend after `today`.
    pub async fn covers_upcoming_weekend(&self, today: NaiveDate) -> Result<bool, AppError> {
        let (saturday, _) = upcoming_weekend(today);
        let mut tx = self.store.begin().await?;
        let last = tx.last_duty().await?;
        tx.commit().await?;
        Ok(last.is_some_and(|d| d.start_date == saturday))
    }
}
