use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, StorageError};

/// Where a contest season is in its yearly cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SeasonPhase {
    OffSeason,
    Registration,
    Active,
    Completed,
}

impl SeasonPhase {
    pub const ALL: [SeasonPhase; 4] = [
        Self::OffSeason,
        Self::Registration,
        Self::Active,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OffSeason => "off_season",
            Self::Registration => "registration",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// The following phase in normal operation, `None` once completed.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::OffSeason => Some(Self::Registration),
            Self::Registration => Some(Self::Active),
            Self::Active => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Explanation shown when an action is refused during this phase.
    pub fn rejection_message(&self) -> &'static str {
        match self {
            Self::OffSeason => "Registration is not yet open for this season",
            Self::Registration => "This action is not available while registration is open",
            Self::Active => "The season is underway; roster changes are locked",
            Self::Completed => "The season is over",
        }
    }
}

impl fmt::Display for SeasonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeasonPhase {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| StorageError::Validation(format!("unknown season phase '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SeasonConfig {
    pub season_year: i32,
    pub phase: SeasonPhase,
    pub registration_opens_on: Option<NaiveDate>,
    pub registration_closes_on: Option<NaiveDate>,
    pub season_starts_on: Option<NaiveDate>,
    pub season_ends_on: Option<NaiveDate>,
    pub is_current_season: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SeasonConfig {
    /// Forward-only move used by normal operation.
    pub fn advanced_phase(&self) -> Result<SeasonPhase> {
        self.phase.next().ok_or_else(|| {
            StorageError::InvalidState(format!(
                "season {} is already {}; there is no later phase",
                self.season_year, self.phase
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_in_order() {
        assert_eq!(SeasonPhase::OffSeason.next(), Some(SeasonPhase::Registration));
        assert_eq!(SeasonPhase::Registration.next(), Some(SeasonPhase::Active));
        assert_eq!(SeasonPhase::Active.next(), Some(SeasonPhase::Completed));
        assert_eq!(SeasonPhase::Completed.next(), None);
    }

    #[test]
    fn phase_strings_parse() {
        for phase in SeasonPhase::ALL {
            assert_eq!(phase.as_str().parse::<SeasonPhase>().unwrap(), phase);
        }
        assert!("preseason".parse::<SeasonPhase>().is_err());
    }
}
