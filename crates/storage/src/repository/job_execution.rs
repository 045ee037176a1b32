use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{JobExecution, NewJobExecution};

const JOB_COLUMNS: &str = "execution_id, job_name, started_at, finished_at, status, context, error";

pub struct JobExecutionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> JobExecutionRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, execution: &NewJobExecution) -> Result<JobExecution> {
        let row = sqlx::query_as::<_, JobExecution>(&format!(
            r#"
            INSERT INTO job_executions (execution_id, job_name, started_at, finished_at, status, context, error)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&execution.job_name)
        .bind(execution.started_at)
        .bind(execution.finished_at)
        .bind(execution.status.as_str())
        .bind(&execution.context)
        .bind(&execution.error)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Most recent runs first, optionally filtered by job name.
    pub async fn list_recent(
        &self,
        job_name: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<JobExecution>, i64)> {
        let rows = sqlx::query_as::<_, JobExecution>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM job_executions
            WHERE $1::TEXT IS NULL OR job_name = $1
            ORDER BY started_at DESC, execution_id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(job_name)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_executions WHERE $1::TEXT IS NULL OR job_name = $1",
        )
        .bind(job_name)
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }
}
