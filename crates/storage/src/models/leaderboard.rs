use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Result, StorageError};

/// Which ranking a leaderboard snapshot represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaderboardScope {
    /// Full season, postseason included.
    Overall,
    /// Regular-season home runs hit within one calendar month.
    Monthly(u32),
}

impl LeaderboardScope {
    pub fn monthly(month: u32) -> Result<Self> {
        if (1..=12).contains(&month) {
            Ok(Self::Monthly(month))
        } else {
            Err(StorageError::Validation(format!(
                "month must be between 1 and 12, got {month}"
            )))
        }
    }

    pub fn leaderboard_type(&self) -> &'static str {
        match self {
            Self::Overall => "overall",
            Self::Monthly(_) => "monthly",
        }
    }

    pub fn month(&self) -> Option<i16> {
        match self {
            Self::Overall => None,
            Self::Monthly(month) => Some(*month as i16),
        }
    }

    pub fn include_postseason(&self) -> bool {
        matches!(self, Self::Overall)
    }
}

impl fmt::Display for LeaderboardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overall => f.write_str("overall"),
            Self::Monthly(month) => write!(f, "monthly:{month:02}"),
        }
    }
}

/// A persisted leaderboard row joined with the team's display name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaderboardEntry {
    pub season_year: i32,
    pub leaderboard_type: String,
    pub month: Option<i16>,
    pub team_id: Uuid,
    pub team_name: String,
    pub rank: i32,
    pub total_hrs: i32,
    pub regular_season_hrs: i32,
    pub postseason_hrs: i32,
    pub calculated_at: DateTime<Utc>,
}

/// A freshly ranked row, ready to be written as part of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLeaderboardEntry {
    pub team_id: Uuid,
    pub rank: i32,
    pub total_hrs: i32,
    pub regular_season_hrs: i32,
    pub postseason_hrs: i32,
}
