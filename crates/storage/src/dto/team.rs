use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{EntryStatus, PaymentStatus, Team};
use crate::services::scoring::{PlayerScore, TeamScore};

/// Request payload for creating a team
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 100, message = "Team name must be between 1 and 100 characters"))]
    pub name: String,

    /// Exactly eight distinct eligible players, in pick order.
    #[validate(length(equal = 8, message = "A roster must contain exactly 8 players"))]
    pub player_ids: Vec<Uuid>,
}

/// Request payload for replacing a team's name and roster
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTeamRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(equal = 8, message = "A roster must contain exactly 8 players"))]
    pub player_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateEntryStatusRequest {
    pub entry_status: EntryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamResponse {
    pub team_id: Uuid,
    pub owner_id: Uuid,
    pub season_year: i32,
    pub name: String,
    pub payment_status: PaymentStatus,
    pub entry_status: EntryStatus,
    pub locked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub player_ids: Vec<Uuid>,
}

impl From<Team> for TeamResponse {
    fn from(team: Team) -> Self {
        Self {
            team_id: team.team_id,
            owner_id: team.owner_id,
            season_year: team.season_year,
            name: team.name,
            payment_status: team.payment_status,
            entry_status: team.entry_status,
            locked_at: team.locked_at,
            created_at: team.created_at,
            player_ids: team.player_ids,
        }
    }
}

/// Live score for a single team, computed on request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamScoreResponse {
    pub team_id: Uuid,
    pub total_hrs: i32,
    pub regular_season_hrs: i32,
    pub postseason_hrs: i32,
    pub players: Vec<PlayerScore>,
    pub calculated_at: DateTime<Utc>,
}

impl From<TeamScore> for TeamScoreResponse {
    fn from(score: TeamScore) -> Self {
        Self {
            team_id: score.team_id,
            total_hrs: score.total_hrs,
            regular_season_hrs: score.regular_season_hrs,
            postseason_hrs: score.postseason_hrs,
            players: score.players,
            calculated_at: score.calculated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LockTeamsResponse {
    pub season_year: i32,
    pub teams_locked: u64,
}
