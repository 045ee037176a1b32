use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::stats::latest_totals;
use super::team::{TeamRow, assemble, fetch_rosters};
use crate::error::Result;
use crate::models::{EntryStatus, LeaderboardScope, Lifecycle, PlayerHrTotals};
use crate::services::leaderboard::{DailyDelta, SeasonSnapshot, month_bounds, monthly_totals};
use crate::services::scoring::TeamRoster;

/// Reads everything a leaderboard rebuild needs inside one
/// repeatable-read transaction.
pub struct SnapshotRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SnapshotRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn load(&self, season_year: i32, scope: LeaderboardScope) -> Result<SeasonSnapshot> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let taken_at: DateTime<Utc> = sqlx::query_scalar("SELECT now()")
            .fetch_one(&mut *tx)
            .await?;

        let ranked: Vec<&str> = EntryStatus::RANKED.iter().map(|s| s.as_str()).collect();
        let rows = sqlx::query_as::<_, TeamRow>(
            r#"
            SELECT team_id, owner_id, season_year, name, payment_status, entry_status,
                   locked_at, created_at, updated_at, deleted_at
            FROM teams
            WHERE season_year = $1 AND entry_status = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(season_year)
        .bind(&ranked)
        .fetch_all(&mut *tx)
        .await?;

        let team_ids: Vec<Uuid> = rows.iter().map(|r| r.team_id).collect();
        let rosters = fetch_rosters(&mut *tx, &team_ids).await?;
        let teams = assemble(rows, rosters)?;

        let mut player_ids: Vec<Uuid> = teams.iter().flat_map(|t| t.player_ids.clone()).collect();
        player_ids.sort_unstable();
        player_ids.dedup();

        let stats: HashMap<Uuid, PlayerHrTotals> = match scope {
            LeaderboardScope::Overall => latest_totals(&mut *tx, season_year, &player_ids).await?,
            LeaderboardScope::Monthly(month) => {
                let (first, last) = month_bounds(season_year, month)?;
                let deltas = sqlx::query_as::<_, DailyDelta>(
                    r#"
                    SELECT player_id, stat_date, hrs_daily, hrs_daily_postseason
                    FROM player_daily_stats
                    WHERE season_year = $1 AND player_id = ANY($2)
                      AND stat_date BETWEEN $3 AND $4
                    "#,
                )
                .bind(season_year)
                .bind(&player_ids)
                .bind(first)
                .bind(last)
                .fetch_all(&mut *tx)
                .await?;
                monthly_totals(&deltas, (first, last))
            }
        };

        tx.commit().await?;

        debug!(
            season_year,
            %scope,
            teams = teams.len(),
            players = stats.len(),
            "Loaded leaderboard snapshot"
        );

        Ok(SeasonSnapshot {
            rosters: teams.iter().map(TeamRoster::from).collect(),
            stats,
            taken_at,
        })
    }
}
