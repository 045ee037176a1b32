use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// One row per player, season and calendar day on which the player homered.
///
/// `hrs_daily` is that day's delta (postseason share in `hrs_daily_postseason`);
/// the remaining counters are cumulative season-to-date totals and never
/// decrease as `stat_date` advances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PlayerDailyStat {
    pub player_id: Uuid,
    pub season_year: i32,
    pub stat_date: NaiveDate,
    pub hrs_daily: i32,
    pub hrs_daily_postseason: i32,
    pub hrs_regular_season: i32,
    pub hrs_postseason: i32,
    pub hrs_total: i32,
    pub last_updated: NaiveDateTime,
}

/// Full-season home run total, used for contest eligibility and the roster cap.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PlayerSeasonStat {
    pub player_id: Uuid,
    pub season_year: i32,
    pub hrs_total: i32,
    pub team_abbr: String,
    pub updated_at: NaiveDateTime,
}

/// The two components a player's score is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlayerHrTotals {
    pub regular_season: i32,
    pub postseason: i32,
}

impl PlayerHrTotals {
    pub fn new(regular_season: i32, postseason: i32) -> Self {
        Self {
            regular_season,
            postseason,
        }
    }

    pub fn combined(&self) -> i32 {
        self.regular_season + self.postseason
    }

    /// The figure a player is ranked by within their team.
    pub fn figure(&self, include_postseason: bool) -> i32 {
        if include_postseason {
            self.combined()
        } else {
            self.regular_season
        }
    }
}

/// Values for one `(player, season, date)` row as computed by ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewDailyStat {
    pub player_id: Uuid,
    pub season_year: i32,
    pub stat_date: NaiveDate,
    pub hrs_daily: i32,
    pub hrs_daily_postseason: i32,
    pub hrs_regular_season: i32,
    pub hrs_postseason: i32,
}

impl NewDailyStat {
    pub fn hrs_total(&self) -> i32 {
        self.hrs_regular_season + self.hrs_postseason
    }

    /// True when `existing` already holds exactly these counts.
    pub fn matches(&self, existing: &PlayerDailyStat) -> bool {
        existing.player_id == self.player_id
            && existing.season_year == self.season_year
            && existing.stat_date == self.stat_date
            && existing.hrs_daily == self.hrs_daily
            && existing.hrs_daily_postseason == self.hrs_daily_postseason
            && existing.hrs_regular_season == self.hrs_regular_season
            && existing.hrs_postseason == self.hrs_postseason
            && existing.hrs_total == self.hrs_total()
    }
}
