//! # Task Store
//!
//! Durable, transactional CRUD for tasks and their headers. Multi-row
//! operations run in one repeatable-read transaction: a reader never sees a
//! terminal task without its headers, nor header rows orphaned from their
//! task update. Every error is wrapped with the operation that produced it;
//! a rollback failure is reported instead of the original error, not
//! swallowed.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use std::str::FromStr;

use crate::error::{Result, TaskError};
use crate::models::{Header, HeaderDirection, NewTask, Task, TaskState};

/// Store operations required by the orchestrator and the executor.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert the task row and all supplied headers atomically, returning
    /// the task with its assigned id and status `new`.
    async fn create(&self, new_task: NewTask) -> Result<Task>;

    /// Read the task row joined with only its output headers.
    async fn get_by_id_with_output_headers(&self, id: i64) -> Result<Task>;

    /// Unconditionally set the status. `NotFound` when no row matches.
    async fn update_status(&self, id: i64, status: TaskState) -> Result<()>;

    /// Guarded transition to `in_process`: only non-terminal rows move.
    /// Returns `Ok(false)` when the task exists but is already terminal
    /// (a redelivered message), `NotFound` when the row is missing.
    async fn mark_in_process(&self, id: i64) -> Result<bool>;

    /// Transactionally update status + result fields and insert the task's
    /// output headers. All-or-nothing.
    async fn update_result(&self, task: &Task) -> Result<()>;

    /// Remove a task row; compensation for a failed queue hand-off.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// PostgreSQL-backed task store.
#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

/// Row shape for the task + output-header join.
#[derive(Debug, FromRow)]
struct TaskWithHeaderRow {
    id: i64,
    method: String,
    url: String,
    status: String,
    response_status_code: Option<i64>,
    response_length: Option<i64>,
    header_name: Option<String>,
    header_value: Option<String>,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin_repeatable_read(
        &self,
        operation: &str,
    ) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TaskError::wrap_db(format!("{operation}.begin"), e))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(|e| TaskError::wrap_db(format!("{operation}.set_isolation"), e))?;
        Ok(tx)
    }
}

/// Roll back explicitly so a failing rollback is visible to the caller.
async fn rollback(tx: Transaction<'static, Postgres>, operation: &str, err: TaskError) -> TaskError {
    if let Err(rollback_err) = tx.rollback().await {
        return TaskError::Database {
            operation: format!("{operation}.rollback"),
            message: rollback_err.to_string(),
        };
    }
    err
}

/// Bulk-insert headers tagged to `task_id` as one multi-row statement.
/// An empty slice performs no insert.
async fn insert_headers(
    tx: &mut Transaction<'static, Postgres>,
    task_id: i64,
    headers: &[Header],
) -> std::result::Result<(), sqlx::Error> {
    if headers.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO headers (name, value, input, task_id) ");
    builder.push_values(headers, |mut row, header| {
        row.push_bind(&header.name)
            .push_bind(&header.value)
            .push_bind(header.direction.is_input())
            .push_bind(task_id);
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create(&self, new_task: NewTask) -> Result<Task> {
        const OP: &str = "PgTaskStore.create";

        let mut tx = self.begin_repeatable_read(OP).await?;

        let id: i64 = match sqlx::query_scalar(
            "INSERT INTO task (method, url, status) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&new_task.method)
        .bind(&new_task.url)
        .bind(TaskState::New.to_string())
        .fetch_one(&mut *tx)
        .await
        {
            Ok(id) => id,
            Err(e) => {
                return Err(rollback(tx, OP, TaskError::wrap_db(format!("{OP}.insert_task"), e)).await)
            }
        };

        if let Err(e) = insert_headers(&mut tx, id, &new_task.headers).await {
            return Err(rollback(tx, OP, TaskError::wrap_db(format!("{OP}.insert_headers"), e)).await);
        }

        tx.commit()
            .await
            .map_err(|e| TaskError::wrap_db(format!("{OP}.commit"), e))?;

        Ok(Task {
            id,
            method: new_task.method,
            url: new_task.url,
            status: TaskState::New,
            response_status_code: None,
            response_length: None,
            headers: new_task.headers,
        })
    }

    async fn get_by_id_with_output_headers(&self, id: i64) -> Result<Task> {
        const OP: &str = "PgTaskStore.get_by_id_with_output_headers";

        let rows: Vec<TaskWithHeaderRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.method, t.url, t.status,
                   t.response_status_code, t.response_length,
                   h.name AS header_name, h.value AS header_value
            FROM task t
            LEFT JOIN headers h ON h.task_id = t.id AND h.input = false
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TaskError::wrap_db(format!("{OP}.query"), e))?;

        let Some(first) = rows.first() else {
            return Err(TaskError::NotFound { id });
        };

        let status = TaskState::from_str(&first.status).map_err(|e| TaskError::Database {
            operation: format!("{OP}.parse_status"),
            message: e,
        })?;

        let mut task = Task {
            id: first.id,
            method: first.method.clone(),
            url: first.url.clone(),
            status,
            response_status_code: first.response_status_code,
            response_length: first.response_length,
            headers: Vec::new(),
        };

        for row in &rows {
            if let (Some(name), Some(value)) = (&row.header_name, &row.header_value) {
                task.headers.push(Header {
                    name: name.clone(),
                    value: value.clone(),
                    direction: HeaderDirection::Output,
                });
            }
        }

        Ok(task)
    }

    async fn update_status(&self, id: i64, status: TaskState) -> Result<()> {
        const OP: &str = "PgTaskStore.update_status";

        let result = sqlx::query("UPDATE task SET status = $1 WHERE id = $2")
            .bind(status.to_string())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TaskError::wrap_db(format!("{OP}.execute"), e))?;

        if result.rows_affected() == 0 {
            return Err(TaskError::NotFound { id });
        }
        Ok(())
    }

    async fn mark_in_process(&self, id: i64) -> Result<bool> {
        const OP: &str = "PgTaskStore.mark_in_process";

        let result = sqlx::query(
            "UPDATE task SET status = $1 WHERE id = $2 AND status NOT IN ($3, $4)",
        )
        .bind(TaskState::InProcess.to_string())
        .bind(id)
        .bind(TaskState::Done.to_string())
        .bind(TaskState::Error.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| TaskError::wrap_db(format!("{OP}.execute"), e))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Zero rows: either the task is gone or it already reached a
        // terminal state (queue redelivery).
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM task WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TaskError::wrap_db(format!("{OP}.exists"), e))?;

        match exists {
            Some(_) => Ok(false),
            None => Err(TaskError::NotFound { id }),
        }
    }

    async fn update_result(&self, task: &Task) -> Result<()> {
        const OP: &str = "PgTaskStore.update_result";

        let mut tx = self.begin_repeatable_read(OP).await?;

        let result = match sqlx::query(
            "UPDATE task SET status = $1, response_status_code = $2, response_length = $3 WHERE id = $4",
        )
        .bind(task.status.to_string())
        .bind(task.response_status_code)
        .bind(task.response_length)
        .bind(task.id)
        .execute(&mut *tx)
        .await
        {
            Ok(result) => result,
            Err(e) => {
                return Err(rollback(tx, OP, TaskError::wrap_db(format!("{OP}.update_task"), e)).await)
            }
        };

        if result.rows_affected() == 0 {
            return Err(rollback(tx, OP, TaskError::NotFound { id: task.id }).await);
        }

        let output_headers: Vec<Header> = task.output_headers().cloned().collect();
        if let Err(e) = insert_headers(&mut tx, task.id, &output_headers).await {
            return Err(rollback(tx, OP, TaskError::wrap_db(format!("{OP}.insert_headers"), e)).await);
        }

        tx.commit()
            .await
            .map_err(|e| TaskError::wrap_db(format!("{OP}.commit"), e))?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        const OP: &str = "PgTaskStore.delete";

        let result = sqlx::query("DELETE FROM task WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TaskError::wrap_db(format!("{OP}.execute"), e))?;

        if result.rows_affected() == 0 {
            return Err(TaskError::NotFound { id });
        }
        Ok(())
    }
}
