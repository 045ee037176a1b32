use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use storage::{
    dto::{
        PaginatedResponse, PaginationParams,
        job::{JobExecutionResponse, JobHistoryQuery, JobRunResponse, TriggerJobRequest},
        season::{OverridePhaseRequest, UpsertSeasonRequest},
        team::LockTeamsResponse,
    },
    models::SeasonConfig,
    repository::{job_execution::JobExecutionRepository, season::SeasonRepository},
};
use tracing::{info, warn};
use validator::Validate;

use crate::error::WebError;
use crate::features::teams::services::lock_entered_teams;
use crate::jobs::{JobName, JobParams};
use crate::middleware::season::CurrentSeason;
use crate::state::AppState;

#[utoipa::path(
    put,
    path = "/api/admin/seasons",
    request_body = UpsertSeasonRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Season calendar saved", body = SeasonConfig),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "admin"
)]
pub async fn upsert_season(
    State(state): State<AppState>,
    Json(req): Json<UpsertSeasonRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let season = SeasonRepository::new(state.db.pool())
        .upsert(req.season_year, &req.dates())
        .await?;
    state.read_caches.invalidate().await;

    info!(season_year = season.season_year, "Season calendar saved");
    Ok(Json(season).into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/seasons/{season_year}/current",
    params(("season_year" = i32, Path, description = "Season year")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Season is now current", body = SeasonConfig),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Season not found")
    ),
    tag = "admin"
)]
pub async fn set_current_season(
    State(state): State<AppState>,
    Path(season_year): Path<i32>,
) -> Result<Response, WebError> {
    let season = SeasonRepository::new(state.db.pool())
        .set_current(season_year)
        .await?;
    // Leaderboard reads without a season resolve to the current one.
    state.read_caches.invalidate().await;

    info!(season_year, "Current season switched");
    Ok(Json(season).into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/seasons/{season_year}/advance",
    params(("season_year" = i32, Path, description = "Season year")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Season moved to its next phase", body = SeasonConfig),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Season not found"),
        (status = 409, description = "Season already completed, or moved concurrently")
    ),
    tag = "admin"
)]
pub async fn advance_season_phase(
    State(state): State<AppState>,
    Path(season_year): Path<i32>,
) -> Result<Response, WebError> {
    let repo = SeasonRepository::new(state.db.pool());
    let season = repo.get(season_year).await?;
    let next = season.advanced_phase()?;

    let updated = repo.set_phase(season_year, season.phase, next).await?;
    state.read_caches.invalidate().await;

    info!(season_year, from = %season.phase, to = %next, "Season phase advanced");
    Ok(Json(updated).into_response())
}

#[utoipa::path(
    put,
    path = "/api/admin/seasons/{season_year}/phase",
    request_body = OverridePhaseRequest,
    params(("season_year" = i32, Path, description = "Season year")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Phase overridden", body = SeasonConfig),
        (status = 400, description = "Missing reason"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Season not found"),
        (status = 409, description = "Season moved concurrently")
    ),
    tag = "admin"
)]
pub async fn override_season_phase(
    State(state): State<AppState>,
    Path(season_year): Path<i32>,
    Json(req): Json<OverridePhaseRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let repo = SeasonRepository::new(state.db.pool());
    let season = repo.get(season_year).await?;
    let updated = repo.set_phase(season_year, season.phase, req.phase).await?;
    state.read_caches.invalidate().await;

    warn!(
        season_year,
        from = %season.phase,
        to = %req.phase,
        reason = %req.reason,
        "Season phase overridden"
    );
    Ok(Json(updated).into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/teams/lock",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Entered teams locked", body = LockTeamsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Season is not active")
    ),
    tag = "admin"
)]
pub async fn lock_teams(
    State(state): State<AppState>,
    Extension(CurrentSeason(season)): Extension<CurrentSeason>,
) -> Result<Response, WebError> {
    let teams_locked = lock_entered_teams(state.db.pool(), season.season_year).await?;

    Ok(Json(LockTeamsResponse {
        season_year: season.season_year,
        teams_locked,
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/jobs/{job_name}",
    request_body(content = TriggerJobRequest, description = "Optional date and season overrides"),
    params(("job_name" = String, Path, description = "update_stats or calculate_leaderboard")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Job finished", body = JobRunResponse),
        (status = 400, description = "Unknown job"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Job already running"),
        (status = 502, description = "Stats feed failed after retries")
    ),
    tag = "admin"
)]
pub async fn trigger_job(
    State(state): State<AppState>,
    Path(job_name): Path<String>,
    body: Option<Json<TriggerJobRequest>>,
) -> Result<Response, WebError> {
    let job: JobName = job_name.parse().map_err(WebError::BadRequest)?;
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let outcome = state
        .pipeline
        .run(
            job,
            JobParams {
                season_year: req.season_year,
                date: req.date,
            },
        )
        .await?;

    Ok(Json(JobRunResponse {
        job_name: outcome.job.to_string(),
        status: outcome.status.as_str().to_string(),
        context: outcome.context,
        error: None,
    })
    .into_response())
}

#[utoipa::path(
    get,
    path = "/api/admin/jobs",
    params(PaginationParams, JobHistoryQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Recent job runs, newest first", body = PaginatedResponse<JobExecutionResponse>),
        (status = 400, description = "Invalid pagination parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "admin"
)]
pub async fn list_job_executions(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<JobHistoryQuery>,
) -> Result<Response, WebError> {
    params.validate().map_err(WebError::BadRequest)?;

    let (runs, total) = JobExecutionRepository::new(state.db.pool())
        .list_recent(filter.job_name.as_deref(), params.limit(), params.offset())
        .await?;

    let data: Vec<JobExecutionResponse> =
        runs.into_iter().map(JobExecutionResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, params.page, params.page_size, total)).into_response())
}
