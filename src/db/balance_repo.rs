// src/db/balance_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgConnection, Postgres};

use crate::{
    common::error::AppError,
    models::{duty::ResetOutcome, leave::VacationUsed},
};

#[derive(Clone, Default)]
pub struct BalanceRepository;

impl BalanceRepository {
    pub fn new() -> Self {
        Self
    }

    // Two statements on the same connection: make sure the row exists, then lock it.
    pub async fn lock(&self, conn: &mut PgConnection, employee_id: i64) -> Result<VacationUsed, AppError> {
        sqlx::query(
            "INSERT INTO vacation_used (employee_id, days) VALUES ($1, 0) ON CONFLICT (employee_id) DO NOTHING",
        )
        .bind(employee_id)
        .execute(&mut *conn)
        .await?;

        let row = sqlx::query_as::<_, VacationUsed>(
            "SELECT employee_id, days, updated_at FROM vacation_used WHERE employee_id = $1 FOR UPDATE",
        )
        .bind(employee_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn approved_unexpired_days<'e, E>(&self, executor: E, employee_id: i64) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(number_of_days), 0)::BIGINT
            FROM leave_requests
            WHERE employee_id = $1 AND status = 'approved' AND NOT expired
            "#,
        )
        .bind(employee_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    pub async fn upsert<'e, E>(&self, executor: E, employee_id: i64, days: i32) -> Result<VacationUsed, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, VacationUsed>(
            r#"
            INSERT INTO vacation_used (employee_id, days)
            VALUES ($1, $2)
            ON CONFLICT (employee_id) DO UPDATE SET days = EXCLUDED.days, updated_at = NOW()
            RETURNING employee_id, days, updated_at
            "#,
        )
        .bind(employee_id)
        .bind(days)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn find<'e, E>(&self, executor: E, employee_id: i64) -> Result<Option<VacationUsed>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, VacationUsed>(
            "SELECT employee_id, days, updated_at FROM vacation_used WHERE employee_id = $1",
        )
        .bind(employee_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    pub async fn reset_all<'e, E>(&self, executor: E) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE vacation_used SET days = 0, updated_at = NOW()")
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // A concurrent claim for the same period waits on the primary key, then sees the conflict.
    pub async fn claim_reset<'e, E>(&self, executor: E, period_start: NaiveDate) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "INSERT INTO period_resets (period_start) VALUES ($1) ON CONFLICT (period_start) DO NOTHING",
        )
        .bind(period_start)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn record_reset<'e, E>(&self, executor: E, outcome: &ResetOutcome) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE period_resets
            SET balances_reset = $2, requests_expired = $3, ran_at = NOW()
            WHERE period_start = $1
            "#,
        )
        .bind(outcome.period_start)
        .bind(outcome.balances_reset as i64)
        .bind(outcome.requests_expired as i64)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn reset_recorded<'e, E>(&self, executor: E, period_start: NaiveDate) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let recorded = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM period_resets WHERE period_start = $1)",
        )
        .bind(period_start)
        .fetch_one(executor)
        .await?;
        Ok(recorded)
    }
}
