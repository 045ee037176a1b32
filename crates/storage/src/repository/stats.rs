use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewDailyStat, PlayerDailyStat, PlayerHrTotals, PlayerSeasonStat};

const DAILY_COLUMNS: &str = "player_id, season_year, stat_date, hrs_daily, hrs_daily_postseason, \
     hrs_regular_season, hrs_postseason, hrs_total, last_updated";

#[derive(FromRow)]
struct TotalsRow {
    player_id: Uuid,
    hrs_regular_season: i32,
    hrs_postseason: i32,
}

#[derive(FromRow)]
struct PriorSeasonRow {
    player_id: Uuid,
    hrs_total: i32,
}

/// Latest cumulative totals per player for the season.
pub(crate) async fn latest_totals<'e, E>(
    executor: E,
    season_year: i32,
    player_ids: &[Uuid],
) -> Result<HashMap<Uuid, PlayerHrTotals>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, TotalsRow>(
        r#"
        SELECT DISTINCT ON (player_id) player_id, hrs_regular_season, hrs_postseason
        FROM player_daily_stats
        WHERE season_year = $1 AND player_id = ANY($2)
        ORDER BY player_id, stat_date DESC
        "#,
    )
    .bind(season_year)
    .bind(player_ids)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| (r.player_id, PlayerHrTotals::new(r.hrs_regular_season, r.hrs_postseason)))
        .collect())
}

/// Repository for per-player home run statistics.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Rows already stored for one stats date.
    pub async fn daily_for_date(
        &self,
        season_year: i32,
        stat_date: NaiveDate,
    ) -> Result<Vec<PlayerDailyStat>> {
        let rows = sqlx::query_as::<_, PlayerDailyStat>(&format!(
            r#"
            SELECT {DAILY_COLUMNS}
            FROM player_daily_stats
            WHERE season_year = $1 AND stat_date = $2
            "#
        ))
        .bind(season_year)
        .bind(stat_date)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Latest cumulative totals strictly before `stat_date`, per player.
    ///
    /// Reading "before" rather than "latest" keeps a re-run of the same date
    /// from adding its own counts twice.
    pub async fn totals_before(
        &self,
        season_year: i32,
        stat_date: NaiveDate,
    ) -> Result<HashMap<Uuid, PlayerHrTotals>> {
        let rows = sqlx::query_as::<_, TotalsRow>(
            r#"
            SELECT DISTINCT ON (player_id) player_id, hrs_regular_season, hrs_postseason
            FROM player_daily_stats
            WHERE season_year = $1 AND stat_date < $2
            ORDER BY player_id, stat_date DESC
            "#,
        )
        .bind(season_year)
        .bind(stat_date)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.player_id, PlayerHrTotals::new(r.hrs_regular_season, r.hrs_postseason)))
            .collect())
    }

    pub async fn latest_totals(
        &self,
        season_year: i32,
        player_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, PlayerHrTotals>> {
        latest_totals(self.pool, season_year, player_ids).await
    }

    /// Writes one daily row keyed by `(player, season, date)`.
    /// Returns true when the row was newly created.
    pub async fn upsert_daily(&self, stat: &NewDailyStat) -> Result<bool> {
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO player_daily_stats (
                player_id, season_year, stat_date, hrs_daily, hrs_daily_postseason,
                hrs_regular_season, hrs_postseason, hrs_total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (player_id, season_year, stat_date)
            DO UPDATE SET
                hrs_daily = EXCLUDED.hrs_daily,
                hrs_daily_postseason = EXCLUDED.hrs_daily_postseason,
                hrs_regular_season = EXCLUDED.hrs_regular_season,
                hrs_postseason = EXCLUDED.hrs_postseason,
                hrs_total = EXCLUDED.hrs_total,
                last_updated = CURRENT_TIMESTAMP
            RETURNING (xmax = 0)
            "#,
        )
        .bind(stat.player_id)
        .bind(stat.season_year)
        .bind(stat.stat_date)
        .bind(stat.hrs_daily)
        .bind(stat.hrs_daily_postseason)
        .bind(stat.hrs_regular_season)
        .bind(stat.hrs_postseason)
        .bind(stat.hrs_total())
        .fetch_one(self.pool)
        .await?;

        Ok(inserted)
    }

    /// Re-derives cumulative columns for a player's rows after `stat_date`
    /// from their daily deltas. Needed when an earlier date is backfilled.
    pub async fn rebuild_cumulative_after(
        &self,
        player_id: Uuid,
        season_year: i32,
        stat_date: NaiveDate,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            WITH running AS (
                SELECT
                    stat_date,
                    SUM(hrs_daily - hrs_daily_postseason) OVER w AS regular,
                    SUM(hrs_daily_postseason) OVER w AS post
                FROM player_daily_stats
                WHERE player_id = $1 AND season_year = $2
                WINDOW w AS (ORDER BY stat_date ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)
            )
            UPDATE player_daily_stats s
            SET
                hrs_regular_season = running.regular,
                hrs_postseason = running.post,
                hrs_total = running.regular + running.post,
                last_updated = CURRENT_TIMESTAMP
            FROM running
            WHERE s.player_id = $1
              AND s.season_year = $2
              AND s.stat_date = running.stat_date
              AND s.stat_date > $3
              AND (s.hrs_regular_season, s.hrs_postseason) IS DISTINCT FROM (running.regular, running.post)
            "#,
        )
        .bind(player_id)
        .bind(season_year)
        .bind(stat_date)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn latest_stats_date(&self, season_year: i32) -> Result<Option<NaiveDate>> {
        let date = sqlx::query_scalar::<_, Option<NaiveDate>>(
            "SELECT MAX(stat_date) FROM player_daily_stats WHERE season_year = $1",
        )
        .bind(season_year)
        .fetch_one(self.pool)
        .await?;

        Ok(date)
    }

    /// A player's rows for the season, oldest first.
    pub async fn player_history(
        &self,
        player_id: Uuid,
        season_year: i32,
    ) -> Result<Vec<PlayerDailyStat>> {
        let rows = sqlx::query_as::<_, PlayerDailyStat>(&format!(
            r#"
            SELECT {DAILY_COLUMNS}
            FROM player_daily_stats
            WHERE player_id = $1 AND season_year = $2
            ORDER BY stat_date
            "#
        ))
        .bind(player_id)
        .bind(season_year)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn upsert_season_stat(
        &self,
        player_id: Uuid,
        season_year: i32,
        hrs_total: i32,
        team_abbr: &str,
    ) -> Result<PlayerSeasonStat> {
        let stat = sqlx::query_as::<_, PlayerSeasonStat>(
            r#"
            INSERT INTO player_season_stats (player_id, season_year, hrs_total, team_abbr)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (player_id, season_year)
            DO UPDATE SET
                hrs_total = EXCLUDED.hrs_total,
                team_abbr = EXCLUDED.team_abbr,
                updated_at = CURRENT_TIMESTAMP
            RETURNING player_id, season_year, hrs_total, team_abbr, updated_at
            "#,
        )
        .bind(player_id)
        .bind(season_year)
        .bind(hrs_total)
        .bind(team_abbr)
        .fetch_one(self.pool)
        .await?;

        Ok(stat)
    }

    /// Full-season totals for `season_year`, limited to `player_ids`.
    pub async fn season_totals(
        &self,
        season_year: i32,
        player_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i32>> {
        let rows = sqlx::query_as::<_, PriorSeasonRow>(
            r#"
            SELECT player_id, hrs_total
            FROM player_season_stats
            WHERE season_year = $1 AND player_id = ANY($2)
            "#,
        )
        .bind(season_year)
        .bind(player_ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| (r.player_id, r.hrs_total)).collect())
    }
}
