// src/services/balance_service.rs

use crate::{
    common::error::AppError,
    models::leave::VacationUsed,
    services::store::{LeaveStore, StoreTx},
};

#[derive(Clone)]
pub struct BalanceService<S> {
    store: S,
}

impl<S: LeaveStore> BalanceService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Days used so far; zero for an employee without a balance row.
    pub async fn balance(&self, employee_id: i64) -> Result<VacationUsed, AppError> {
        let mut tx = self.store.begin().await?;
        let balance = tx
            .balance(employee_id)
            .await?
            .unwrap_or_else(|| VacationUsed::empty(employee_id));
        tx.commit().await?;
        Ok(balance)
    }
}

/// Rebuilds the balance from the approved, unexpired requests inside `tx`.
///
/// The balance row stays locked until `tx` ends, so concurrent recomputes for
/// one employee run one after another and the last writer sees every commit.
pub async fn recompute<T: StoreTx>(tx: &mut T, employee_id: i64) -> Result<VacationUsed, AppError> {
    tx.lock_balance(employee_id).await?;
    let total = tx.approved_unexpired_days(employee_id).await?;
    let days = i32::try_from(total)
        .map_err(|_| anyhow::anyhow!("vacation total {total} for employee {employee_id} overflows"))?;
    let balance = tx.set_balance(employee_id, days).await?;
    tracing::debug!(employee_id, days, "Vacation balance recomputed");
    Ok(balance)
}
