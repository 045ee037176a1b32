//! lock -> ingest (with retry) -> conditional rebuild -> cache invalidation
//! -> audit record, alerting the administrator on failure.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info, warn};

use importer::daily::default_stats_date;
use importer::{DailyStatsIngestor, ImporterError};
use storage::error::StorageError;
use storage::models::{JobStatus, LeaderboardScope, NewJobExecution};
use storage::repository::job_execution::JobExecutionRepository;
use storage::services::leaderboard::{LeaderboardRun, calculate_leaderboard, scope_for_date};

use super::alert::{AdminAlerter, JobAlert};
use super::lock::JobLocks;
use super::retry::{RetryPolicy, retry_with_backoff};
use super::{JobName, JobParams};
use crate::cache::{EtagGeneration, QueryCache};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("job '{0}' is already running")]
    AlreadyRunning(JobName),

    #[error("stats ingestion failed")]
    Ingestion(#[from] ImporterError),

    #[error("leaderboard rebuild failed")]
    Leaderboard(#[from] StorageError),
}

#[async_trait::async_trait]
pub trait LeaderboardRebuilder: Send + Sync {
    async fn rebuild(
        &self,
        season_year: i32,
        scope: LeaderboardScope,
    ) -> storage::error::Result<LeaderboardRun>;
}

/// Fire-and-forget: implementations log their own failures.
#[async_trait::async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self);
}

#[async_trait::async_trait]
pub trait JobRecorder: Send + Sync {
    async fn record(&self, execution: NewJobExecution) -> storage::error::Result<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub job: JobName,
    pub status: JobStatus,
    pub context: serde_json::Value,
}

pub struct RecalculationPipeline {
    locks: JobLocks,
    retry: RetryPolicy,
    utc_offset_hours: i32,
    ingestor: Arc<dyn DailyStatsIngestor>,
    leaderboards: Arc<dyn LeaderboardRebuilder>,
    caches: Arc<dyn CacheInvalidator>,
    recorder: Arc<dyn JobRecorder>,
    alerter: Arc<dyn AdminAlerter>,
}

impl RecalculationPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        locks: JobLocks,
        retry: RetryPolicy,
        utc_offset_hours: i32,
        ingestor: Arc<dyn DailyStatsIngestor>,
        leaderboards: Arc<dyn LeaderboardRebuilder>,
        caches: Arc<dyn CacheInvalidator>,
        recorder: Arc<dyn JobRecorder>,
        alerter: Arc<dyn AdminAlerter>,
    ) -> Self {
        Self {
            locks,
            retry,
            utc_offset_hours,
            ingestor,
            leaderboards,
            caches,
            recorder,
            alerter,
        }
    }

    /// Runs `job` to completion. A run that finds the job already in
    /// progress returns immediately and is recorded as skipped.
    pub async fn run(&self, job: JobName, params: JobParams) -> Result<JobOutcome, PipelineError> {
        let started_at = Utc::now();
        let date = params
            .date
            .unwrap_or_else(|| default_stats_date(started_at, self.utc_offset_hours));
        let season_year = params.season_year.unwrap_or(date.year());
        let mut context = json!({ "season_year": season_year, "date": date });

        let Some(_guard) = self.locks.try_acquire(job) else {
            warn!(%job, "Job already running, skipping");
            let err = PipelineError::AlreadyRunning(job);
            self.record(job, started_at, JobStatus::Skipped, &context, Some(err.to_string()))
                .await;
            return Err(err);
        };

        info!(%job, season_year, %date, "Job started");

        let result = match job {
            JobName::UpdateStats => self.update_stats(season_year, date, &mut context).await,
            JobName::CalculateLeaderboard => {
                self.rebuild_leaderboards(season_year, date, &mut context).await
            }
        };

        match result {
            Ok(()) => {
                info!(%job, "Job finished");
                self.record(job, started_at, JobStatus::Success, &context, None)
                    .await;
                Ok(JobOutcome {
                    job,
                    status: JobStatus::Success,
                    context,
                })
            }
            Err(e) => {
                error!(%job, "Job failed: {}", e);
                self.record(job, started_at, JobStatus::Failed, &context, Some(error_chain(&e)))
                    .await;

                let alert = JobAlert::new(job.as_str(), &e, context);
                if let Err(alert_err) = self.alerter.alert(&alert).await {
                    error!(%job, "Failed to alert administrator: {}", alert_err);
                }
                Err(e)
            }
        }
    }

    async fn update_stats(
        &self,
        season_year: i32,
        date: NaiveDate,
        context: &mut serde_json::Value,
    ) -> Result<(), PipelineError> {
        let mut attempts = 0u32;
        let result = retry_with_backoff(self.retry, ImporterError::is_retryable, || {
            attempts += 1;
            self.ingestor.ingest(season_year, date)
        })
        .await;
        context["attempts"] = json!(attempts);

        let (summary, _) = result?;
        context["ingestion"] = json!(summary);

        if !summary.changed() {
            info!(%date, "No stats changed; leaderboards left as they are");
            context["rebuilt"] = json!(false);
            return Ok(());
        }

        self.rebuild_leaderboards(season_year, date, context).await
    }

    /// Rebuilds the overall board and the board for `date`'s month, then
    /// invalidates read caches.
    async fn rebuild_leaderboards(
        &self,
        season_year: i32,
        date: NaiveDate,
        context: &mut serde_json::Value,
    ) -> Result<(), PipelineError> {
        let mut runs = Vec::new();
        let mut failure = None;

        for scope in [LeaderboardScope::Overall, scope_for_date(date)] {
            match self.leaderboards.rebuild(season_year, scope).await {
                Ok(run) => runs.push(json!({
                    "scope": scope.to_string(),
                    "teams_ranked": run.teams_ranked,
                    "calculated_at": run.calculated_at,
                })),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let rebuilt = !runs.is_empty();
        context["leaderboards"] = json!(runs);
        context["rebuilt"] = json!(rebuilt);

        // Whatever committed must become visible.
        if rebuilt {
            self.caches.invalidate().await;
        }

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    async fn record(
        &self,
        job: JobName,
        started_at: DateTime<Utc>,
        status: JobStatus,
        context: &serde_json::Value,
        error: Option<String>,
    ) {
        let execution = NewJobExecution {
            job_name: job.as_str().to_string(),
            started_at,
            finished_at: Utc::now(),
            status,
            context: context.clone(),
            error,
        };

        if let Err(e) = self.recorder.record(execution).await {
            error!(%job, "Failed to record job execution: {}", e);
        }
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub struct PgLeaderboardRebuilder {
    pool: PgPool,
}

impl PgLeaderboardRebuilder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LeaderboardRebuilder for PgLeaderboardRebuilder {
    async fn rebuild(
        &self,
        season_year: i32,
        scope: LeaderboardScope,
    ) -> storage::error::Result<LeaderboardRun> {
        calculate_leaderboard(&self.pool, season_year, scope).await
    }
}

pub struct PgJobRecorder {
    pool: PgPool,
}

impl PgJobRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl JobRecorder for PgJobRecorder {
    async fn record(&self, execution: NewJobExecution) -> storage::error::Result<()> {
        JobExecutionRepository::new(&self.pool)
            .record(&execution)
            .await
            .map(|_| ())
    }
}

/// Bumps the ETag generation and clears the query cache.
pub struct ReadCacheInvalidator {
    etags: EtagGeneration,
    queries: QueryCache,
}

impl ReadCacheInvalidator {
    pub fn new(etags: EtagGeneration, queries: QueryCache) -> Self {
        Self { etags, queries }
    }
}

#[async_trait::async_trait]
impl CacheInvalidator for ReadCacheInvalidator {
    async fn invalidate(&self) {
        let generation = self.etags.bump();
        let removed = self.queries.invalidate_all().await;
        info!(generation, removed, "Read caches invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use importer::IngestionSummary;

    use super::super::alert::AlertError;

    type Events = Arc<Mutex<Vec<String>>>;

    fn push(events: &Events, event: impl Into<String>) {
        events.lock().unwrap().push(event.into());
    }

    struct FakeIngestor {
        results: Mutex<VecDeque<importer::Result<IngestionSummary>>>,
        events: Events,
    }

    #[async_trait::async_trait]
    impl DailyStatsIngestor for FakeIngestor {
        async fn ingest(
            &self,
            _season_year: i32,
            _date: NaiveDate,
        ) -> importer::Result<IngestionSummary> {
            push(&self.events, "ingest");
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(IngestionSummary::default()))
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    struct FakeRebuilder {
        fail_monthly: bool,
        events: Events,
    }

    #[async_trait::async_trait]
    impl LeaderboardRebuilder for FakeRebuilder {
        async fn rebuild(
            &self,
            season_year: i32,
            scope: LeaderboardScope,
        ) -> storage::error::Result<LeaderboardRun> {
            if self.fail_monthly && scope != LeaderboardScope::Overall {
                return Err(StorageError::InvalidState("snapshot failed".to_string()));
            }
            push(&self.events, format!("rebuild {scope}"));
            Ok(LeaderboardRun {
                season_year,
                scope,
                teams_ranked: 3,
                calculated_at: Utc::now(),
            })
        }
    }

    struct FakeCaches {
        events: Events,
    }

    #[async_trait::async_trait]
    impl CacheInvalidator for FakeCaches {
        async fn invalidate(&self) {
            push(&self.events, "invalidate");
        }
    }

    #[derive(Default)]
    struct FakeRecorder {
        records: Mutex<Vec<NewJobExecution>>,
    }

    #[async_trait::async_trait]
    impl JobRecorder for FakeRecorder {
        async fn record(&self, execution: NewJobExecution) -> storage::error::Result<()> {
            self.records.lock().unwrap().push(execution);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeAlerter {
        alerts: Mutex<Vec<JobAlert>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl AdminAlerter for FakeAlerter {
        async fn alert(&self, alert: &JobAlert) -> Result<(), AlertError> {
            self.alerts.lock().unwrap().push(alert.clone());
            if self.fail {
                return Err(AlertError::Status(500));
            }
            Ok(())
        }
    }

    struct Harness {
        pipeline: RecalculationPipeline,
        locks: JobLocks,
        events: Events,
        recorder: Arc<FakeRecorder>,
        alerter: Arc<FakeAlerter>,
    }

    fn harness(results: Vec<importer::Result<IngestionSummary>>) -> Harness {
        build(results, false, false)
    }

    fn build(
        results: Vec<importer::Result<IngestionSummary>>,
        fail_monthly: bool,
        fail_alert: bool,
    ) -> Harness {
        let events: Events = Arc::default();
        let locks = JobLocks::new();
        let recorder = Arc::new(FakeRecorder::default());
        let alerter = Arc::new(FakeAlerter {
            fail: fail_alert,
            ..Default::default()
        });

        let pipeline = RecalculationPipeline::new(
            locks.clone(),
            RetryPolicy::new(3, Duration::from_millis(1)),
            -4,
            Arc::new(FakeIngestor {
                results: Mutex::new(results.into()),
                events: events.clone(),
            }),
            Arc::new(FakeRebuilder {
                fail_monthly,
                events: events.clone(),
            }),
            Arc::new(FakeCaches {
                events: events.clone(),
            }),
            recorder.clone(),
            alerter.clone(),
        );

        Harness {
            pipeline,
            locks,
            events,
            recorder,
            alerter,
        }
    }

    fn june_10() -> JobParams {
        JobParams {
            season_year: Some(2025),
            date: NaiveDate::from_ymd_opt(2025, 6, 10),
        }
    }

    fn changed(created: usize) -> importer::Result<IngestionSummary> {
        Ok(IngestionSummary {
            created,
            games: 15,
            ..Default::default()
        })
    }

    fn events(h: &Harness) -> Vec<String> {
        h.events.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn unchanged_ingestion_skips_rebuild_and_invalidation() {
        let h = harness(vec![Ok(IngestionSummary {
            unchanged: 12,
            ..Default::default()
        })]);

        let outcome = h.pipeline.run(JobName::UpdateStats, june_10()).await.unwrap();

        assert_eq!(outcome.status, JobStatus::Success);
        assert_eq!(outcome.context["rebuilt"], false);
        assert_eq!(events(&h), vec!["ingest"]);
        assert_eq!(h.recorder.records.lock().unwrap()[0].status, JobStatus::Success);
    }

    #[tokio::test]
    async fn changes_rebuild_both_boards_then_invalidate() {
        let h = harness(vec![changed(4)]);

        let outcome = h.pipeline.run(JobName::UpdateStats, june_10()).await.unwrap();

        assert_eq!(
            events(&h),
            vec!["ingest", "rebuild overall", "rebuild monthly:06", "invalidate"]
        );
        assert_eq!(outcome.context["ingestion"]["created"], 4);
        assert_eq!(outcome.context["leaderboards"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn transient_ingestion_failures_are_retried() {
        let h = harness(vec![
            Err(ImporterError::UpstreamStatus {
                status: 503,
                url: "schedule".to_string(),
            }),
            changed(1),
        ]);

        let outcome = h.pipeline.run(JobName::UpdateStats, june_10()).await.unwrap();

        assert_eq!(outcome.context["attempts"], 2);
        assert_eq!(events(&h).iter().filter(|e| *e == "ingest").count(), 2);
    }

    #[tokio::test]
    async fn permanent_failure_records_and_alerts() {
        let h = harness(vec![Err(ImporterError::InvalidResponse("no dates".to_string()))]);

        let err = h.pipeline.run(JobName::UpdateStats, june_10()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Ingestion(_)));
        assert_eq!(events(&h), vec!["ingest"]);

        let records = h.recorder.records.lock().unwrap();
        assert_eq!(records[0].status, JobStatus::Failed);
        assert!(records[0].error.as_deref().unwrap().contains("no dates"));

        let alerts = h.alerter.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].job_name, "update_stats");
        assert_eq!(alerts[0].context["date"], "2025-06-10");
    }

    #[tokio::test]
    async fn failing_alert_does_not_mask_job_error() {
        let h = build(vec![Err(ImporterError::ValidationError("bad".to_string()))], false, true);

        let err = h.pipeline.run(JobName::UpdateStats, june_10()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Ingestion(_)));
        assert_eq!(h.alerter.alerts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn held_lock_is_recorded_as_skipped() {
        let h = harness(vec![changed(1)]);
        let _held = h.locks.try_acquire(JobName::UpdateStats).unwrap();

        let err = h.pipeline.run(JobName::UpdateStats, june_10()).await.unwrap_err();

        assert!(matches!(err, PipelineError::AlreadyRunning(JobName::UpdateStats)));
        assert!(events(&h).is_empty());
        assert_eq!(h.recorder.records.lock().unwrap()[0].status, JobStatus::Skipped);
        assert!(h.alerter.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lock_is_released_after_failure() {
        let h = harness(vec![
            Err(ImporterError::ValidationError("bad".to_string())),
            changed(1),
        ]);

        assert!(h.pipeline.run(JobName::UpdateStats, june_10()).await.is_err());
        assert!(!h.locks.is_held(JobName::UpdateStats));
        assert!(h.pipeline.run(JobName::UpdateStats, june_10()).await.is_ok());
    }

    #[tokio::test]
    async fn calculate_leaderboard_rebuilds_unconditionally() {
        let h = harness(vec![]);

        h.pipeline
            .run(JobName::CalculateLeaderboard, june_10())
            .await
            .unwrap();

        assert_eq!(
            events(&h),
            vec!["rebuild overall", "rebuild monthly:06", "invalidate"]
        );
    }

    #[tokio::test]
    async fn partial_rebuild_still_invalidates_committed_board() {
        let h = build(vec![changed(2)], true, false);

        let err = h.pipeline.run(JobName::UpdateStats, june_10()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Leaderboard(_)));
        assert_eq!(events(&h), vec!["ingest", "rebuild overall", "invalidate"]);
    }

    #[tokio::test]
    async fn season_defaults_to_the_date_year() {
        let h = harness(vec![]);
        let params = JobParams {
            season_year: None,
            date: NaiveDate::from_ymd_opt(2024, 9, 1),
        };

        let outcome = h.pipeline.run(JobName::CalculateLeaderboard, params).await.unwrap();
        assert_eq!(outcome.context["season_year"], 2024);
    }
}
