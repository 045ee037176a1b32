use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{LeaderboardEntry, LeaderboardScope, NewLeaderboardEntry, PlayerHrTotals};
use crate::repository::leaderboard::LeaderboardRepository;
use crate::repository::snapshot::SnapshotRepository;
use crate::services::scoring::{TeamRoster, TeamScore, compute_team_score};

/// Rosters and stats read at one instant; every team in a rebuild is
/// scored against the same snapshot.
#[derive(Debug, Clone)]
pub struct SeasonSnapshot {
    pub rosters: Vec<TeamRoster>,
    pub stats: HashMap<Uuid, PlayerHrTotals>,
    pub taken_at: DateTime<Utc>,
}

/// A daily delta row as read for monthly windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct DailyDelta {
    pub player_id: Uuid,
    pub stat_date: NaiveDate,
    pub hrs_daily: i32,
    pub hrs_daily_postseason: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRun {
    pub season_year: i32,
    pub scope: LeaderboardScope,
    pub teams_ranked: usize,
    pub calculated_at: DateTime<Utc>,
}

/// First and last calendar day of `month` in `season_year`.
pub fn month_bounds(season_year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || StorageError::Validation(format!("invalid month {season_year}-{month:02}"));

    let first = NaiveDate::from_ymd_opt(season_year, month, 1).ok_or_else(invalid)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(season_year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(season_year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    let last = next_month.pred_opt().ok_or_else(invalid)?;

    Ok((first, last))
}

/// Sums regular-season daily deltas falling inside `[first, last]`.
///
/// Cumulative columns are never consulted, so a month only reflects home runs
/// hit during it.
pub fn monthly_totals(
    deltas: &[DailyDelta],
    (first, last): (NaiveDate, NaiveDate),
) -> HashMap<Uuid, PlayerHrTotals> {
    let mut totals: HashMap<Uuid, PlayerHrTotals> = HashMap::new();

    for delta in deltas {
        if delta.stat_date < first || delta.stat_date > last {
            continue;
        }
        let entry = totals.entry(delta.player_id).or_default();
        entry.regular_season += delta.hrs_daily - delta.hrs_daily_postseason;
    }

    totals
}

struct ScoredTeam<'a> {
    roster: &'a TeamRoster,
    score: TeamScore,
}

/// Scores every roster in the snapshot and assigns ranks 1..N.
///
/// Teams that fail to score are logged and left off rather than aborting
/// the whole board.
pub fn build_ranking(
    snapshot: &SeasonSnapshot,
    scope: LeaderboardScope,
) -> Vec<NewLeaderboardEntry> {
    let include_postseason = scope.include_postseason();

    let scored: Vec<ScoredTeam<'_>> = snapshot
        .rosters
        .iter()
        .filter_map(|roster| {
            match compute_team_score(roster, &snapshot.stats, include_postseason, snapshot.taken_at)
            {
                Ok(score) => Some(ScoredTeam { roster, score }),
                Err(e) => {
                    warn!(team_id = %roster.team_id, %scope, "Skipping team on leaderboard: {}", e);
                    None
                }
            }
        })
        .collect();

    rank(scored)
}

fn rank(mut scored: Vec<ScoredTeam<'_>>) -> Vec<NewLeaderboardEntry> {
    scored.sort_by(|a, b| {
        b.score
            .total_hrs
            .cmp(&a.score.total_hrs)
            .then_with(|| a.roster.created_at.cmp(&b.roster.created_at))
            .then_with(|| a.roster.team_id.cmp(&b.roster.team_id))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(index, team)| NewLeaderboardEntry {
            team_id: team.roster.team_id,
            rank: index as i32 + 1,
            total_hrs: team.score.total_hrs,
            regular_season_hrs: team.score.regular_season_hrs,
            postseason_hrs: team.score.postseason_hrs,
        })
        .collect()
}

/// Rebuilds and persists one leaderboard, replacing the previous snapshot
/// for `(season_year, scope)` atomically.
pub async fn calculate_leaderboard(
    pool: &PgPool,
    season_year: i32,
    scope: LeaderboardScope,
) -> Result<LeaderboardRun> {
    let snapshot = SnapshotRepository::new(pool).load(season_year, scope).await?;
    let entries = build_ranking(&snapshot, scope);

    LeaderboardRepository::new(pool)
        .replace_snapshot(season_year, scope, &entries, snapshot.taken_at)
        .await?;

    info!(
        season_year,
        %scope,
        teams = entries.len(),
        "Leaderboard snapshot replaced"
    );

    Ok(LeaderboardRun {
        season_year,
        scope,
        teams_ranked: entries.len(),
        calculated_at: snapshot.taken_at,
    })
}

pub async fn get_overall_leaderboard(
    pool: &PgPool,
    season_year: i32,
) -> Result<Vec<LeaderboardEntry>> {
    LeaderboardRepository::new(pool)
        .fetch(season_year, LeaderboardScope::Overall)
        .await
}

pub async fn get_monthly_leaderboard(
    pool: &PgPool,
    season_year: i32,
    month: u32,
) -> Result<Vec<LeaderboardEntry>> {
    let scope = LeaderboardScope::monthly(month)?;
    LeaderboardRepository::new(pool).fetch(season_year, scope).await
}

/// Month whose monthly board a stats date contributes to.
pub fn scope_for_date(date: NaiveDate) -> LeaderboardScope {
    LeaderboardScope::Monthly(date.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    fn created(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    /// One-player rosters make team totals equal the player's figure.
    fn snapshot(teams: &[(i32, u32)]) -> SeasonSnapshot {
        let mut rosters = Vec::new();
        let mut stats = HashMap::new();
        for (hrs, created_day) in teams {
            let player_id = Uuid::new_v4();
            stats.insert(player_id, PlayerHrTotals::new(*hrs, 0));
            rosters.push(TeamRoster {
                team_id: Uuid::new_v4(),
                name: format!("team-{hrs}-{created_day}"),
                created_at: created(*created_day),
                player_ids: vec![player_id],
            });
        }
        SeasonSnapshot {
            rosters,
            stats,
            taken_at: Utc.with_ymd_and_hms(2026, 7, 2, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn ranks_are_contiguous_and_ordered() {
        let snap = snapshot(&[(12, 1), (40, 2), (25, 3), (40, 4), (0, 5)]);

        let entries = build_ranking(&snap, LeaderboardScope::Overall);

        let ranks: Vec<i32> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        assert!(entries.windows(2).all(|w| w[0].total_hrs >= w[1].total_hrs));
    }

    #[test]
    fn equal_totals_rank_earlier_team_first() {
        let snap = snapshot(&[(30, 9), (30, 2), (30, 5)]);

        let entries = build_ranking(&snap, LeaderboardScope::Overall);

        let by_created: Vec<u32> = entries
            .iter()
            .map(|e| {
                let roster = snap.rosters.iter().find(|r| r.team_id == e.team_id).unwrap();
                roster.created_at.day()
            })
            .collect();
        assert_eq!(by_created, vec![2, 5, 9]);
    }

    #[test]
    fn unscorable_team_is_skipped() {
        let mut snap = snapshot(&[(10, 1), (20, 2)]);
        snap.rosters.push(TeamRoster {
            team_id: Uuid::new_v4(),
            name: "empty".to_string(),
            created_at: created(3),
            player_ids: Vec::new(),
        });

        let entries = build_ranking(&snap, LeaderboardScope::Overall);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].total_hrs, 20);
    }

    #[test]
    fn no_teams_gives_empty_board() {
        let snap = snapshot(&[]);
        assert!(build_ranking(&snap, LeaderboardScope::Overall).is_empty());
    }

    #[test]
    fn rebuilding_same_snapshot_is_identical() {
        let snap = snapshot(&[(3, 4), (17, 1), (17, 2), (9, 3)]);

        let first = build_ranking(&snap, LeaderboardScope::Overall);
        let second = build_ranking(&snap, LeaderboardScope::Overall);

        assert_eq!(first, second);
    }

    #[test]
    fn month_bounds_cover_whole_month() {
        assert_eq!(month_bounds(2026, 4).unwrap(), (date(4, 1), date(4, 30)));
        assert_eq!(month_bounds(2026, 12).unwrap(), (date(12, 1), date(12, 31)));
        assert_eq!(
            month_bounds(2028, 2).unwrap(),
            (
                NaiveDate::from_ymd_opt(2028, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2028, 2, 29).unwrap()
            )
        );
        assert!(month_bounds(2026, 13).is_err());
        assert!(month_bounds(2026, 0).is_err());
    }

    #[test]
    fn monthly_totals_only_count_days_in_window() {
        let slugger = Uuid::new_v4();
        let benchwarmer = Uuid::new_v4();
        let regular = |player_id, stat_date, hrs_daily| DailyDelta {
            player_id,
            stat_date,
            hrs_daily,
            hrs_daily_postseason: 0,
        };
        let deltas = [
            regular(slugger, date(5, 31), 3),
            regular(slugger, date(6, 1), 1),
            regular(slugger, date(6, 30), 2),
            regular(slugger, date(7, 1), 4),
            regular(benchwarmer, date(7, 2), 1),
        ];

        let june = monthly_totals(&deltas, month_bounds(2026, 6).unwrap());

        assert_eq!(june.get(&slugger), Some(&PlayerHrTotals::new(3, 0)));
        assert_eq!(june.get(&benchwarmer), None);
    }

    #[test]
    fn monthly_totals_exclude_postseason_share() {
        let player = Uuid::new_v4();
        let deltas = [DailyDelta {
            player_id: player,
            stat_date: date(10, 3),
            hrs_daily: 3,
            hrs_daily_postseason: 2,
        }];

        let october = monthly_totals(&deltas, month_bounds(2026, 10).unwrap());

        assert_eq!(october[&player], PlayerHrTotals::new(1, 0));
    }

    #[test]
    fn monthly_board_uses_monthly_figures() {
        let mut snap = snapshot(&[(50, 1), (5, 2)]);
        // month-only totals flip the order of the cumulative board
        let first_player = snap.rosters[0].player_ids[0];
        let second_player = snap.rosters[1].player_ids[0];
        snap.stats = HashMap::from([
            (first_player, PlayerHrTotals::new(2, 0)),
            (second_player, PlayerHrTotals::new(6, 0)),
        ]);

        let entries = build_ranking(&snap, LeaderboardScope::Monthly(6));

        assert_eq!(entries[0].team_id, snap.rosters[1].team_id);
        assert_eq!(entries[0].total_hrs, 6);
    }
}
