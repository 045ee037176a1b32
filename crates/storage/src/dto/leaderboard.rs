use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{LeaderboardEntry, LeaderboardScope};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntryResponse {
    pub rank: i32,
    pub team_id: Uuid,
    pub team_name: String,
    pub total_hrs: i32,
    pub regular_season_hrs: i32,
    pub postseason_hrs: i32,
}

/// A stored leaderboard snapshot, best rank first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardResponse {
    pub season_year: i32,
    /// `overall` or `monthly`
    pub leaderboard_type: String,
    pub month: Option<i16>,
    /// Absent when the board has never been calculated.
    pub calculated_at: Option<DateTime<Utc>>,
    pub entries: Vec<LeaderboardEntryResponse>,
}

impl LeaderboardResponse {
    pub fn new(season_year: i32, scope: LeaderboardScope, rows: Vec<LeaderboardEntry>) -> Self {
        Self {
            season_year,
            leaderboard_type: scope.leaderboard_type().to_string(),
            month: scope.month(),
            calculated_at: rows.first().map(|r| r.calculated_at),
            entries: rows.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<LeaderboardEntry> for LeaderboardEntryResponse {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            rank: entry.rank,
            team_id: entry.team_id,
            team_name: entry.team_name,
            total_hrs: entry.total_hrs,
            regular_season_hrs: entry.regular_season_hrs,
            postseason_hrs: entry.postseason_hrs,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SeasonQuery {
    /// Defaults to the current season.
    pub season_year: Option<i32>,
}
