use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::dto::{
    leaderboard::SeasonQuery,
    team::{
        CreateTeamRequest, TeamResponse, TeamScoreResponse, UpdateEntryStatusRequest,
        UpdatePaymentStatusRequest, UpdateTeamRequest,
    },
};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::features::leaderboard::handlers::resolve_season;
use crate::middleware::auth::ActingOwner;
use crate::middleware::season::CurrentSeason;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    post,
    path = "/api/teams",
    request_body = CreateTeamRequest,
    params(("x-owner-id" = Uuid, Header, description = "Acting user")),
    responses(
        (status = 201, description = "Team created", body = TeamResponse),
        (status = 400, description = "Roster invalid (size, duplicates, eligibility or cap)"),
        (status = 403, description = "Registration is not open"),
        (status = 503, description = "No season configured")
    ),
    tag = "teams"
)]
pub async fn create_team(
    State(state): State<AppState>,
    Extension(CurrentSeason(season)): Extension<CurrentSeason>,
    ActingOwner(owner_id): ActingOwner,
    Json(req): Json<CreateTeamRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let team = services::create_team(state.db.pool(), &season, owner_id, &req).await?;

    Ok((StatusCode::CREATED, Json(TeamResponse::from(team))).into_response())
}

#[utoipa::path(
    put,
    path = "/api/teams/{team_id}",
    request_body = UpdateTeamRequest,
    params(
        ("team_id" = Uuid, Path, description = "Team id"),
        ("x-owner-id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Team updated", body = TeamResponse),
        (status = 400, description = "Roster invalid"),
        (status = 403, description = "Not the owner, or registration is not open"),
        (status = 404, description = "Team not found"),
        (status = 409, description = "Team is locked")
    ),
    tag = "teams"
)]
pub async fn update_team(
    State(state): State<AppState>,
    Extension(CurrentSeason(season)): Extension<CurrentSeason>,
    ActingOwner(owner_id): ActingOwner,
    Path(team_id): Path<Uuid>,
    Json(req): Json<UpdateTeamRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let team = services::update_team(state.db.pool(), &season, owner_id, team_id, &req).await?;

    Ok(Json(TeamResponse::from(team)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/teams/{team_id}",
    params(
        ("team_id" = Uuid, Path, description = "Team id"),
        ("x-owner-id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 204, description = "Team withdrawn"),
        (status = 403, description = "Not the owner, or registration is not open"),
        (status = 404, description = "Team not found"),
        (status = 409, description = "Team is locked")
    ),
    tag = "teams"
)]
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(CurrentSeason(season)): Extension<CurrentSeason>,
    ActingOwner(owner_id): ActingOwner,
    Path(team_id): Path<Uuid>,
) -> Result<Response, WebError> {
    services::delete_team(state.db.pool(), &season, owner_id, team_id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[utoipa::path(
    put,
    path = "/api/teams/{team_id}/entry",
    request_body = UpdateEntryStatusRequest,
    params(
        ("team_id" = Uuid, Path, description = "Team id"),
        ("x-owner-id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Entry status changed", body = TeamResponse),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Not the owner, or entries are closed"),
        (status = 409, description = "Status changed concurrently")
    ),
    tag = "teams"
)]
pub async fn update_entry_status(
    State(state): State<AppState>,
    Extension(CurrentSeason(season)): Extension<CurrentSeason>,
    ActingOwner(owner_id): ActingOwner,
    Path(team_id): Path<Uuid>,
    Json(req): Json<UpdateEntryStatusRequest>,
) -> Result<Response, WebError> {
    let team = services::update_entry_status(
        state.db.pool(),
        &season,
        owner_id,
        team_id,
        req.entry_status,
    )
    .await?;

    Ok(Json(TeamResponse::from(team)).into_response())
}

#[utoipa::path(
    put,
    path = "/api/teams/{team_id}/payment",
    request_body = UpdatePaymentStatusRequest,
    params(("team_id" = Uuid, Path, description = "Team id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payment status changed", body = TeamResponse),
        (status = 400, description = "Transition not allowed"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Status changed concurrently")
    ),
    tag = "teams"
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<UpdatePaymentStatusRequest>,
) -> Result<Response, WebError> {
    let team = services::update_payment_status(state.db.pool(), team_id, req.payment_status).await?;

    Ok(Json(TeamResponse::from(team)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/teams/{team_id}",
    params(("team_id" = Uuid, Path, description = "Team id")),
    responses(
        (status = 200, description = "Team found", body = TeamResponse),
        (status = 404, description = "Team not found")
    ),
    tag = "teams"
)]
pub async fn get_team(
    State(state): State<AppState>,
    Path(team_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let team = services::get_team(state.db.pool(), team_id).await?;

    Ok(Json(TeamResponse::from(team)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/teams/mine",
    params(
        SeasonQuery,
        ("x-owner-id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "The caller's teams for the season", body = Vec<TeamResponse>)
    ),
    tag = "teams"
)]
pub async fn list_my_teams(
    State(state): State<AppState>,
    ActingOwner(owner_id): ActingOwner,
    Query(query): Query<SeasonQuery>,
    current: Option<Extension<CurrentSeason>>,
) -> Result<Response, WebError> {
    let season_year = resolve_season(&query, current.as_ref())?;
    let teams = services::list_owner_teams(state.db.pool(), owner_id, season_year).await?;

    let response: Vec<TeamResponse> = teams.into_iter().map(TeamResponse::from).collect();

    Ok(Json(response).into_response())
}

#[utoipa::path(
    get,
    path = "/api/teams/{team_id}/score",
    params(("team_id" = Uuid, Path, description = "Team id")),
    responses(
        (status = 200, description = "Best 7 of 8 score computed from the latest stats", body = TeamScoreResponse),
        (status = 404, description = "Team not found")
    ),
    tag = "teams"
)]
pub async fn get_team_score(
    State(state): State<AppState>,
    Path(team_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let score = services::team_score(state.db.pool(), team_id).await?;

    Ok(Json(TeamScoreResponse::from(score)).into_response())
}
