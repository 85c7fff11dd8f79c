// src/db/duty_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};

use crate::{common::error::AppError, models::duty::DutyRoster};

#[derive(Clone, Default)]
pub struct DutyRepository;

impl DutyRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn last<'e, E>(&self, executor: E) -> Result<Option<DutyRoster>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let duty = sqlx::query_as::<_, DutyRoster>(
            "SELECT id, employee_id, start_date, end_date, created_at FROM duty_roster ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(executor)
        .await?;
        Ok(duty)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        employee_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DutyRoster, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let duty = sqlx::query_as::<_, DutyRoster>(
            r#"
            INSERT INTO duty_roster (employee_id, start_date, end_date)
            VALUES ($1, $2, $3)
            RETURNING id, employee_id, start_date, end_date, created_at
            "#,
        )
        .bind(employee_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(executor)
        .await?;
        Ok(duty)
    }

    pub async fn history<'e, E>(&self, executor: E, limit: i64) -> Result<Vec<DutyRoster>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, DutyRoster>(
            "SELECT id, employee_id, start_date, end_date, created_at FROM duty_roster ORDER BY id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}
