use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::JobExecution;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobExecutionResponse {
    pub execution_id: Uuid,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub status: String,
    pub context: serde_json::Value,
    pub error: Option<String>,
}

impl From<JobExecution> for JobExecutionResponse {
    fn from(job: JobExecution) -> Self {
        Self {
            duration_ms: (job.finished_at - job.started_at).num_milliseconds(),
            execution_id: job.execution_id,
            job_name: job.job_name,
            started_at: job.started_at,
            finished_at: job.finished_at,
            status: job.status,
            context: job.context,
            error: job.error,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobHistoryQuery {
    pub job_name: Option<String>,
}

/// Optional overrides for a manually triggered run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TriggerJobRequest {
    /// Stats date to ingest; defaults to yesterday in the feed's timezone.
    pub date: Option<NaiveDate>,
    pub season_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobRunResponse {
    pub job_name: String,
    pub status: String,
    pub context: serde_json::Value,
    pub error: Option<String>,
}
