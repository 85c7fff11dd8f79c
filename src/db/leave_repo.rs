// src/db/leave_repo.rs

use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    models::leave::{DateRange, LeaveRequest, LeaveType, NewLeaveRequest},
};

const REQUEST_COLUMNS: &str = "id, employee_id, leave_type_id, start_date, end_date, number_of_days, \
     comment, status, expired, created_at, updated_at";

#[derive(Clone, Default)]
pub struct LeaveRepository;

impl LeaveRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  LEAVE TYPES
    // =========================================================================

    pub async fn find_type<'e, E>(&self, executor: E, id: i64) -> Result<Option<LeaveType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let leave_type = sqlx::query_as::<_, LeaveType>(
            r#"
            SELECT t.id, t.title, t.parent_id, p.title AS parent_title
            FROM leave_types t
            LEFT JOIN leave_types p ON p.id = t.parent_id
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(leave_type)
    }

    pub async fn type_has_children<'e, E>(&self, executor: E, id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let has_children = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM leave_types WHERE parent_id = $1)",
        )
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(has_children)
    }

    pub async fn list_types<'e, E>(&self, executor: E) -> Result<Vec<LeaveType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let types = sqlx::query_as::<_, LeaveType>(
            r#"
            SELECT t.id, t.title, t.parent_id, p.title AS parent_title
            FROM leave_types t
            LEFT JOIN leave_types p ON p.id = t.parent_id
            ORDER BY t.id
            "#,
        )
        .fetch_all(executor)
        .await?;
        Ok(types)
    }

    pub async fn create_type<'e, E>(
        &self,
        executor: E,
        title: &str,
        parent_id: Option<i64>,
    ) -> Result<LeaveType, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, LeaveType>(
            r#"
            WITH inserted AS (
                INSERT INTO leave_types (title, parent_id)
                VALUES ($1, $2)
                RETURNING id, title, parent_id
            )
            SELECT i.id, i.title, i.parent_id, p.title AS parent_title
            FROM inserted i
            LEFT JOIN leave_types p ON p.id = i.parent_id
            "#,
        )
        .bind(title)
        .bind(parent_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::LeaveTypeTitleTaken(title.to_string());
                }
                if db_err.is_foreign_key_violation() {
                    return AppError::NotFound("parent leave type");
                }
            }
            e.into()
        })
    }

    // =========================================================================
    //  LEAVE REQUESTS
    // =========================================================================

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<LeaveRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = $1");
        let request = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(request)
    }

    pub async fn find_for_update<'e, E>(&self, executor: E, id: i64) -> Result<Option<LeaveRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = $1 FOR UPDATE");
        let request = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(request)
    }

    pub async fn list_for_employee<'e, E>(
        &self,
        executor: E,
        employee_id: i64,
    ) -> Result<Vec<LeaveRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE employee_id = $1 ORDER BY start_date DESC, id DESC"
        );
        let requests = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(employee_id)
            .fetch_all(executor)
            .await?;
        Ok(requests)
    }

    pub async fn list_pending<'e, E>(&self, executor: E) -> Result<Vec<LeaveRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE status = 'pending' ORDER BY created_at, id"
        );
        let requests = sqlx::query_as::<_, LeaveRequest>(&sql).fetch_all(executor).await?;
        Ok(requests)
    }

    // Half-open ranges: [a, b) and [c, d) intersect when a < d and c < b.
    pub async fn find_overlapping<'e, E>(
        &self,
        executor: E,
        employee_id: i64,
        range: DateRange,
        exclude_id: Option<i64>,
    ) -> Result<Vec<LeaveRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM leave_requests
            WHERE employee_id = $1
              AND status <> 'rejected'
              AND start_date < $3
              AND $2 < end_date
              AND ($4::BIGINT IS NULL OR id <> $4)
            ORDER BY start_date, id
            "#
        );
        let requests = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(employee_id)
            .bind(range.start)
            .bind(range.end)
            .bind(exclude_id)
            .fetch_all(executor)
            .await?;
        Ok(requests)
    }

    pub async fn create<'e, E>(&self, executor: E, new: &NewLeaveRequest) -> Result<LeaveRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO leave_requests (
                employee_id, leave_type_id, start_date, end_date, number_of_days, comment, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let request = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(new.employee_id)
            .bind(new.leave_type_id)
            .bind(new.start_date)
            .bind(new.end_date)
            .bind(new.number_of_days)
            .bind(&new.comment)
            .bind(new.status)
            .fetch_one(executor)
            .await?;
        Ok(request)
    }

    pub async fn save<'e, E>(&self, executor: E, request: &LeaveRequest) -> Result<LeaveRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE leave_requests
            SET leave_type_id = $2,
                start_date = $3,
                end_date = $4,
                number_of_days = $5,
                comment = $6,
                status = $7,
                expired = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let saved = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(request.id)
            .bind(request.leave_type_id)
            .bind(request.start_date)
            .bind(request.end_date)
            .bind(request.number_of_days)
            .bind(&request.comment)
            .bind(request.status)
            .bind(request.expired)
            .fetch_one(executor)
            .await?;
        Ok(saved)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM leave_requests WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn expire_approved<'e, E>(&self, executor: E) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE leave_requests SET expired = TRUE, updated_at = NOW() WHERE status = 'approved' AND NOT expired",
        )
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
