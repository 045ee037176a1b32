use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use storage::{
    dto::leaderboard::{LeaderboardResponse, SeasonQuery},
    models::LeaderboardScope,
};

use crate::error::{ApiResult, WebError};
use crate::middleware::season::CurrentSeason;
use crate::state::AppState;

use super::services;

/// Explicit `season_year` wins; otherwise the current season.
pub(crate) fn resolve_season(
    query: &SeasonQuery,
    current: Option<&Extension<CurrentSeason>>,
) -> ApiResult<i32> {
    query
        .season_year
        .or_else(|| current.map(|Extension(CurrentSeason(season))| season.season_year))
        .ok_or_else(|| WebError::ServiceUnavailable("no season configured".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/leaderboards/overall",
    params(SeasonQuery),
    responses(
        (status = 200, description = "Overall leaderboard, best rank first", body = LeaderboardResponse),
        (status = 304, description = "Not modified since the supplied ETag"),
        (status = 503, description = "No season configured and none requested")
    ),
    tag = "leaderboards"
)]
pub async fn get_overall(
    State(state): State<AppState>,
    Query(query): Query<SeasonQuery>,
    current: Option<Extension<CurrentSeason>>,
) -> Result<Response, WebError> {
    let season_year = resolve_season(&query, current.as_ref())?;
    let board = services::get_leaderboard(
        state.db.pool(),
        &state.queries,
        state.etags.current(),
        season_year,
        LeaderboardScope::Overall,
    )
    .await?;

    Ok(Json(board).into_response())
}

#[utoipa::path(
    get,
    path = "/api/leaderboards/monthly/{month}",
    params(
        ("month" = u32, Path, description = "Calendar month, 1-12"),
        SeasonQuery
    ),
    responses(
        (status = 200, description = "Monthly leaderboard (regular season only), best rank first", body = LeaderboardResponse),
        (status = 304, description = "Not modified since the supplied ETag"),
        (status = 400, description = "Invalid month"),
        (status = 503, description = "No season configured and none requested")
    ),
    tag = "leaderboards"
)]
pub async fn get_monthly(
    State(state): State<AppState>,
    Path(month): Path<u32>,
    Query(query): Query<SeasonQuery>,
    current: Option<Extension<CurrentSeason>>,
) -> Result<Response, WebError> {
    let scope = LeaderboardScope::monthly(month)?;
    let season_year = resolve_season(&query, current.as_ref())?;
    let board = services::get_leaderboard(
        state.db.pool(),
        &state.queries,
        state.etags.current(),
        season_year,
        scope,
    )
    .await?;

    Ok(Json(board).into_response())
}
