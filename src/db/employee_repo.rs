// src/db/employee_repo.rs

use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    models::employee::{Employee, NewEmployee},
};

const EMPLOYEE_COLUMNS: &str = "id, username, first_name, last_name, job_title, telegram_id, \
     password_hash, can_duty, is_staff, is_superuser, is_active, created_at";

// All access to the 'employees' table and the permission-group tables
#[derive(Clone, Default)]
pub struct EmployeeRepository;

impl EmployeeRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1");
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(employee)
    }

    pub async fn find_by_telegram_id<'e, E>(
        &self,
        executor: E,
        telegram_id: i64,
    ) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE telegram_id = $1");
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(telegram_id)
            .fetch_optional(executor)
            .await?;
        Ok(employee)
    }

    pub async fn find_by_username<'e, E>(
        &self,
        executor: E,
        username: &str,
    ) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE username = $1");
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(username)
            .fetch_optional(executor)
            .await?;
        Ok(employee)
    }

    pub async fn create<'e, E>(&self, executor: E, new: &NewEmployee) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO employees (
                username, first_name, last_name, job_title, telegram_id,
                password_hash, can_duty, is_staff, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {EMPLOYEE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Employee>(&sql)
            .bind(&new.username)
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(&new.job_title)
            .bind(new.telegram_id)
            .bind(&new.password_hash)
            .bind(new.can_duty)
            .bind(new.is_staff)
            .bind(new.is_active)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                // Both collisions are recoverable by the caller
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        match db_err.constraint() {
                            Some(c) if c.contains("username") => {
                                return AppError::UsernameTaken(new.username.clone());
                            }
                            Some(c) if c.contains("telegram_id") => {
                                if let Some(telegram_id) = new.telegram_id {
                                    return AppError::ChatIdentityTaken(telegram_id);
                                }
                            }
                            _ => {}
                        }
                    }
                }
                e.into()
            })
    }

    pub async fn update_names<'e, E>(
        &self,
        executor: E,
        id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE employees SET first_name = $2, last_name = $3 WHERE id = $1 RETURNING {EMPLOYEE_COLUMNS}"
        );
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .bind(first_name)
            .bind(last_name)
            .fetch_one(executor)
            .await?;
        Ok(employee)
    }

    pub async fn list_duty_candidates<'e, E>(&self, executor: E) -> Result<Vec<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE can_duty ORDER BY id");
        let employees = sqlx::query_as::<_, Employee>(&sql).fetch_all(executor).await?;
        Ok(employees)
    }

    pub async fn list_approvers<'e, E>(&self, executor: E) -> Result<Vec<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {EMPLOYEE_COLUMNS}
            FROM employees e
            WHERE e.is_staff
              AND e.is_active
              AND e.telegram_id IS NOT NULL
              AND EXISTS (SELECT 1 FROM employee_groups eg WHERE eg.employee_id = e.id)
            ORDER BY e.id
            "#
        );
        let employees = sqlx::query_as::<_, Employee>(&sql).fetch_all(executor).await?;
        Ok(employees)
    }

    // Superusers hold every permission; everyone else gets them through groups.
    pub async fn has_permission<'e, E>(
        &self,
        executor: E,
        employee_id: i64,
        permission: &str,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let allowed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM employees e
                WHERE e.id = $1
                  AND e.is_active
                  AND (
                      e.is_superuser
                      OR EXISTS (
                          SELECT 1
                          FROM employee_groups eg
                          JOIN group_permissions gp ON gp.group_id = eg.group_id
                          WHERE eg.employee_id = e.id AND gp.permission = $2
                      )
                  )
            )
            "#,
        )
        .bind(employee_id)
        .bind(permission)
        .fetch_one(executor)
        .await?;
        Ok(allowed)
    }
}
