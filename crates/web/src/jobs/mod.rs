//! Scheduled recalculation jobs.
//!
//! Scheduling is owned by an external trigger (host cron hitting the admin
//! endpoint); this module only runs a job when asked.

pub mod alert;
pub mod lock;
pub mod pipeline;
pub mod retry;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use pipeline::{JobOutcome, PipelineError, RecalculationPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobName {
    /// Ingest one day of stats, rebuilding leaderboards if anything changed.
    UpdateStats,
    /// Rebuild leaderboards from stored stats.
    CalculateLeaderboard,
}

impl JobName {
    pub const ALL: [JobName; 2] = [Self::UpdateStats, Self::CalculateLeaderboard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpdateStats => "update_stats",
            Self::CalculateLeaderboard => "calculate_leaderboard",
        }
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|job| job.as_str() == s)
            .ok_or_else(|| {
                format!("unknown job '{s}'; expected one of: update_stats, calculate_leaderboard")
            })
    }
}

/// Caller overrides for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobParams {
    pub season_year: Option<i32>,
    pub date: Option<NaiveDate>,
}
