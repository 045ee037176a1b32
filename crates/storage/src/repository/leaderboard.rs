use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::error::Result;
use crate::models::{LeaderboardEntry, LeaderboardScope, NewLeaderboardEntry};

pub struct LeaderboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LeaderboardRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Swaps the stored snapshot for `(season_year, scope)` in one transaction.
    /// Readers see either the old board or the new one, never a mix.
    pub async fn replace_snapshot(
        &self,
        season_year: i32,
        scope: LeaderboardScope,
        entries: &[NewLeaderboardEntry],
        calculated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            r#"
            DELETE FROM leaderboard_entries
            WHERE season_year = $1
              AND leaderboard_type = $2
              AND month IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(season_year)
        .bind(scope.leaderboard_type())
        .bind(scope.month())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        debug!(
            season_year,
            %scope,
            removed,
            inserted = entries.len(),
            "Replacing leaderboard rows"
        );

        if !entries.is_empty() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO leaderboard_entries (season_year, leaderboard_type, month, team_id, \
                 rank, total_hrs, regular_season_hrs, postseason_hrs, calculated_at) ",
            );
            builder.push_values(entries, |mut b, entry| {
                b.push_bind(season_year)
                    .push_bind(scope.leaderboard_type())
                    .push_bind(scope.month())
                    .push_bind(entry.team_id)
                    .push_bind(entry.rank)
                    .push_bind(entry.total_hrs)
                    .push_bind(entry.regular_season_hrs)
                    .push_bind(entry.postseason_hrs)
                    .push_bind(calculated_at);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// The stored board, best rank first.
    pub async fn fetch(
        &self,
        season_year: i32,
        scope: LeaderboardScope,
    ) -> Result<Vec<LeaderboardEntry>> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT
                le.season_year, le.leaderboard_type, le.month, le.team_id,
                t.name AS team_name,
                le.rank, le.total_hrs, le.regular_season_hrs, le.postseason_hrs,
                le.calculated_at
            FROM leaderboard_entries le
            JOIN teams t ON t.team_id = le.team_id
            WHERE le.season_year = $1
              AND le.leaderboard_type = $2
              AND le.month IS NOT DISTINCT FROM $3
            ORDER BY le.rank
            "#,
        )
        .bind(season_year)
        .bind(scope.leaderboard_type())
        .bind(scope.month())
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }
}
