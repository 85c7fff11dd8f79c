// src/services/period_service.rs

use chrono::NaiveDate;

use crate::{
    common::error::AppError,
    models::duty::ResetOutcome,
    services::store::{LeaveStore, StoreTx},
};

#[derive(Clone)]
pub struct PeriodService<S> {
    store: S,
}

impl<S: LeaveStore> PeriodService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Closes the accounting period that ends at `period_start`.
    ///
    /// Zeroes every balance and expires every approved request in one
    /// transaction; either both land or neither does. A boundary that was
    /// already reset is left alone and reported as a run that changed nothing.
    pub async fn reset(&self, period_start: NaiveDate) -> Result<ResetOutcome, AppError> {
        let mut tx = self.store.begin().await?;
        if !tx.claim_period_reset(period_start).await? {
            tracing::info!(period_start = %period_start, "Vacation period already reset, skipping");
            return Ok(ResetOutcome::none(period_start));
        }
        let balances_reset = tx.reset_balances().await?;
        let requests_expired = tx.expire_approved().await?;
        let outcome = ResetOutcome {
            period_start,
            balances_reset,
            requests_expired,
        };
        tx.record_period_reset(&outcome).await?;
        tx.commit().await?;

        tracing::info!(
            period_start = %period_start,
            balances_reset,
            requests_expired,
            "Vacation period reset"
        );
        Ok(outcome)
    }

    pub async fn reset_recorded(&self, period_start: NaiveDate) -> Result<bool, AppError> {
        let mut tx = self.store.begin().await?;
        let recorded = tx.period_reset_recorded(period_start).await?;
        tx.commit().await?;
        Ok(recorded)
    }
}
