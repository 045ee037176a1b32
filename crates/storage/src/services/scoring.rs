//! Best-7-of-8 team scoring.
//!
//! Everything here is a pure function of its arguments: callers fetch the
//! stats they need up front and pass them in, so a batch of teams can be
//! scored against one consistent snapshot.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{PlayerHrTotals, Team};

/// Number of roster players whose home runs count toward a team score.
pub const COUNTED_PLAYERS: usize = 7;

/// The slice of a team the scoring engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRoster {
    pub team_id: Uuid,
    pub name: String,
    /// Leaderboard tie-break: earlier teams rank ahead on equal totals.
    pub created_at: NaiveDateTime,
    pub player_ids: Vec<Uuid>,
}

impl From<&Team> for TeamRoster {
    fn from(team: &Team) -> Self {
        Self {
            team_id: team.team_id,
            name: team.name.clone(),
            created_at: team.created_at,
            player_ids: team.player_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlayerScore {
    pub player_id: Uuid,
    /// Index of the player in the roster as picked.
    pub roster_position: usize,
    /// The figure the player was ranked by.
    pub hrs: i32,
    pub regular_season_hrs: i32,
    pub postseason_hrs: i32,
    pub included: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TeamScore {
    pub team_id: Uuid,
    /// Players ordered by `hrs` descending; equal figures keep roster order.
    pub players: Vec<PlayerScore>,
    pub total_hrs: i32,
    pub regular_season_hrs: i32,
    pub postseason_hrs: i32,
    pub calculated_at: DateTime<Utc>,
}

impl TeamScore {
    pub fn excluded(&self) -> impl Iterator<Item = &PlayerScore> {
        self.players.iter().filter(|p| !p.included)
    }
}

/// Scores one roster against a stats snapshot.
///
/// Players missing from `stats` count as zero. A roster with no players is
/// an `InvalidState` error.
pub fn compute_team_score(
    roster: &TeamRoster,
    stats: &HashMap<Uuid, PlayerHrTotals>,
    include_postseason: bool,
    as_of: DateTime<Utc>,
) -> Result<TeamScore> {
    if roster.player_ids.is_empty() {
        return Err(StorageError::InvalidState(format!(
            "team '{}' has an empty roster and cannot be scored",
            roster.name
        )));
    }

    let mut players: Vec<PlayerScore> = roster
        .player_ids
        .iter()
        .enumerate()
        .map(|(roster_position, player_id)| {
            let totals = stats.get(player_id).copied().unwrap_or_default();
            PlayerScore {
                player_id: *player_id,
                roster_position,
                hrs: totals.figure(include_postseason),
                regular_season_hrs: totals.regular_season,
                postseason_hrs: totals.postseason,
                included: false,
            }
        })
        .collect();

    // sort_by is stable, so a tie at the cutoff goes to the earlier pick.
    players.sort_by(|a, b| b.hrs.cmp(&a.hrs));

    let mut total_hrs = 0;
    let mut regular_season_hrs = 0;
    let mut postseason_hrs = 0;

    for (index, player) in players.iter_mut().enumerate() {
        player.included = index < COUNTED_PLAYERS;
        if player.included {
            total_hrs += player.hrs;
            regular_season_hrs += player.regular_season_hrs;
            postseason_hrs += player.postseason_hrs;
        }
    }

    Ok(TeamScore {
        team_id: roster.team_id,
        players,
        total_hrs,
        regular_season_hrs,
        postseason_hrs,
        calculated_at: as_of,
    })
}
