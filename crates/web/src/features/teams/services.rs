use chrono::Utc;
use sqlx::PgPool;
use storage::{
    dto::team::{CreateTeamRequest, UpdateTeamRequest},
    error::StorageError,
    models::{EntryStatus, PaymentStatus, SeasonConfig, Team},
    repository::{stats::StatsRepository, team::TeamRepository},
    services::{
        roster::validate_roster,
        scoring::{TeamRoster, TeamScore, compute_team_score},
    },
};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiResult, WebError};

/// Checks a roster against the previous season's totals.
async fn check_roster(pool: &PgPool, season_year: i32, player_ids: &[Uuid]) -> ApiResult<i32> {
    let prior = StatsRepository::new(pool)
        .season_totals(season_year - 1, player_ids)
        .await?;
    Ok(validate_roster(player_ids, &prior)?)
}

/// Loads a team the caller owns in the current season.
async fn owned_team(
    pool: &PgPool,
    season: &SeasonConfig,
    owner_id: Uuid,
    team_id: Uuid,
) -> ApiResult<Team> {
    let team = TeamRepository::new(pool).find_by_id(team_id).await?;

    if team.owner_id != owner_id {
        return Err(WebError::NotOwner);
    }
    if team.season_year != season.season_year {
        return Err(StorageError::InvalidState(format!(
            "team belongs to season {}, not the current season {}",
            team.season_year, season.season_year
        ))
        .into());
    }
    Ok(team)
}

pub async fn create_team(
    pool: &PgPool,
    season: &SeasonConfig,
    owner_id: Uuid,
    request: &CreateTeamRequest,
) -> ApiResult<Team> {
    let preseason_hrs = check_roster(pool, season.season_year, &request.player_ids).await?;

    let team = TeamRepository::new(pool)
        .create(owner_id, season.season_year, request.name.trim(), &request.player_ids)
        .await?;

    info!(team_id = %team.team_id, season_year = season.season_year, preseason_hrs, "Team created");
    Ok(team)
}

pub async fn update_team(
    pool: &PgPool,
    season: &SeasonConfig,
    owner_id: Uuid,
    team_id: Uuid,
    request: &UpdateTeamRequest,
) -> ApiResult<Team> {
    let team = owned_team(pool, season, owner_id, team_id).await?;
    team.ensure_editable()?;

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .unwrap_or(&team.name);
    let player_ids = request.player_ids.as_deref().unwrap_or(&team.player_ids);

    // The cap is rechecked on every edit, even a rename.
    check_roster(pool, season.season_year, player_ids).await?;

    Ok(TeamRepository::new(pool)
        .update(team_id, name, player_ids)
        .await?)
}

pub async fn delete_team(
    pool: &PgPool,
    season: &SeasonConfig,
    owner_id: Uuid,
    team_id: Uuid,
) -> ApiResult<()> {
    let team = owned_team(pool, season, owner_id, team_id).await?;
    team.ensure_editable()?;
    Ok(TeamRepository::new(pool).soft_delete(team_id).await?)
}

/// Owner-driven entry moves. Locking is reserved for the season start.
pub async fn update_entry_status(
    pool: &PgPool,
    season: &SeasonConfig,
    owner_id: Uuid,
    team_id: Uuid,
    next: EntryStatus,
) -> ApiResult<Team> {
    if next == EntryStatus::Locked {
        return Err(WebError::BadRequest(
            "teams are locked for everyone when the season starts".to_string(),
        ));
    }

    let team = owned_team(pool, season, owner_id, team_id).await?;
    let next = team.next_entry_status(next)?;

    Ok(TeamRepository::new(pool)
        .set_entry_status(team_id, team.entry_status, next)
        .await?)
}

pub async fn update_payment_status(
    pool: &PgPool,
    team_id: Uuid,
    next: PaymentStatus,
) -> ApiResult<Team> {
    let repo = TeamRepository::new(pool);
    let team = repo.find_by_id(team_id).await?;
    let next = team.next_payment_status(next)?;

    Ok(repo
        .set_payment_status(team_id, team.payment_status, next)
        .await?)
}

pub async fn lock_entered_teams(pool: &PgPool, season_year: i32) -> ApiResult<u64> {
    let locked = TeamRepository::new(pool).lock_entered(season_year).await?;
    info!(season_year, locked, "Locked entered teams");
    Ok(locked)
}

pub async fn get_team(pool: &PgPool, team_id: Uuid) -> ApiResult<Team> {
    Ok(TeamRepository::new(pool).find_by_id(team_id).await?)
}

pub async fn list_owner_teams(
    pool: &PgPool,
    owner_id: Uuid,
    season_year: i32,
) -> ApiResult<Vec<Team>> {
    Ok(TeamRepository::new(pool)
        .list_by_owner(owner_id, season_year)
        .await?)
}

/// Live season score for one team, postseason included.
pub async fn team_score(pool: &PgPool, team_id: Uuid) -> ApiResult<TeamScore> {
    let team = TeamRepository::new(pool).find_by_id(team_id).await?;
    let stats = StatsRepository::new(pool)
        .latest_totals(team.season_year, &team.player_ids)
        .await?;

    Ok(compute_team_score(
        &TeamRoster::from(&team),
        &stats,
        true,
        Utc::now(),
    )?)
}
