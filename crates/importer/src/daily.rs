//! Daily home run ingestion.
//!
//! One run turns a date's final box scores into `player_daily_stats` rows.
//! Cumulative totals are built on the latest row strictly before the date,
//! so running the same date twice writes the same values.

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use storage::models::{NewDailyStat, PlayerDailyStat, PlayerHrTotals};
use storage::repository::player::PlayerRepository;
use storage::repository::stats::StatsRepository;

use crate::error::Result;
use crate::sources::mlb::{GameKind, MlbClient};
use crate::traits::DailyStatsIngestor;

/// Outcome counts for one ingested date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Feed players with no matching contest player.
    pub skipped: usize,
    pub errors: usize,
    pub games: usize,
}

impl IngestionSummary {
    /// True when at least one stored row was created or changed.
    pub fn changed(&self) -> bool {
        self.created + self.updated > 0
    }
}

/// Home runs one batter hit on one date, split by game kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCount {
    pub regular_season: i32,
    pub postseason: i32,
}

impl DayCount {
    pub fn add(&mut self, kind: GameKind, hrs: i32) {
        match kind {
            GameKind::RegularSeason => self.regular_season += hrs,
            GameKind::Postseason => self.postseason += hrs,
        }
    }

    pub fn total(&self) -> i32 {
        self.regular_season + self.postseason
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRow {
    pub stat: NewDailyStat,
    /// Stored row already holds these values.
    pub unchanged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyPlan {
    pub rows: Vec<PlannedRow>,
    pub skipped: usize,
}

/// Accepts both `"656941"` and `"mlb-656941"`.
pub fn normalize_external_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let digits = raw.strip_prefix("mlb-").unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Yesterday's date as seen from the feed's timezone.
pub fn default_stats_date(now: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDate {
    let local = FixedOffset::east_opt(utc_offset_hours * 3600)
        .map(|offset| now.with_timezone(&offset).date_naive())
        .unwrap_or_else(|| now.date_naive());
    local - Duration::days(1)
}

/// Computes the rows to write for `stat_date`.
///
/// `previous` holds each player's cumulative totals as of the day before;
/// `existing` the rows already stored for `stat_date`.
pub fn plan_daily_upserts(
    season_year: i32,
    stat_date: NaiveDate,
    counts: &HashMap<i64, DayCount>,
    players: &HashMap<i64, Uuid>,
    previous: &HashMap<Uuid, PlayerHrTotals>,
    existing: &HashMap<Uuid, PlayerDailyStat>,
) -> DailyPlan {
    let mut plan = DailyPlan::default();

    let mut external_ids: Vec<&i64> = counts.keys().collect();
    external_ids.sort_unstable();

    for external_id in external_ids {
        let count = counts[external_id];
        if count.total() <= 0 {
            continue;
        }
        let Some(&player_id) = players.get(external_id) else {
            debug!(external_id, "Skipping feed player not in contest pool");
            plan.skipped += 1;
            continue;
        };

        let before = previous.get(&player_id).copied().unwrap_or_default();
        let stat = NewDailyStat {
            player_id,
            season_year,
            stat_date,
            hrs_daily: count.total(),
            hrs_daily_postseason: count.postseason,
            hrs_regular_season: before.regular_season + count.regular_season,
            hrs_postseason: before.postseason + count.postseason,
        };
        let unchanged = existing
            .get(&player_id)
            .is_some_and(|row| stat.matches(row));

        plan.rows.push(PlannedRow { stat, unchanged });
    }

    plan
}

/// Ingests daily stats from the MLB Stats API.
pub struct MlbDailyIngestor {
    client: MlbClient,
    pool: PgPool,
}

impl MlbDailyIngestor {
    pub fn new(client: MlbClient, pool: PgPool) -> Self {
        Self { client, pool }
    }

    /// Sums home runs per batter over every counted, final game of the date.
    async fn fetch_day(&self, date: NaiveDate) -> Result<(HashMap<i64, DayCount>, usize)> {
        let schedule = self.client.fetch_schedule(date).await?;

        let games: Vec<_> = schedule
            .dates
            .iter()
            .filter(|d| d.date == date)
            .flat_map(|d| d.games.iter())
            .filter_map(|game| {
                let kind = game.kind()?;
                if game.is_final() {
                    Some((game, kind))
                } else {
                    debug!(game = %game.description(), state = %game.status.detailed_state, "Game not final, ignoring");
                    None
                }
            })
            .collect();

        info!(%date, games = games.len(), "Fetched schedule");

        let mut counts: HashMap<i64, DayCount> = HashMap::new();
        for (game, kind) in &games {
            let boxscore = self.client.fetch_boxscore(game.game_pk).await?;
            for (batter, hrs) in boxscore.home_runs() {
                counts.entry(batter).or_default().add(*kind, hrs);
            }
            debug!(game = %game.description(), "Processed box score");
        }

        Ok((counts, games.len()))
    }

    async fn player_index(&self) -> Result<HashMap<i64, Uuid>> {
        let players = PlayerRepository::new(&self.pool).list().await?;
        let mut index = HashMap::with_capacity(players.len());

        for player in players {
            match normalize_external_id(&player.external_id) {
                Some(id) => {
                    index.insert(id, player.player_id);
                }
                None => warn!(
                    player_id = %player.player_id,
                    external_id = %player.external_id,
                    "Player has an unusable external id"
                ),
            }
        }

        Ok(index)
    }
}

#[async_trait::async_trait]
impl DailyStatsIngestor for MlbDailyIngestor {
    async fn ingest(&self, season_year: i32, date: NaiveDate) -> Result<IngestionSummary> {
        let (counts, games) = self.fetch_day(date).await?;
        let mut summary = IngestionSummary {
            games,
            ..Default::default()
        };

        if counts.is_empty() {
            info!(%date, "No home runs found for date");
            return Ok(summary);
        }

        let players = self.player_index().await?;
        let stats = StatsRepository::new(&self.pool);
        let previous = stats.totals_before(season_year, date).await?;
        let existing: HashMap<Uuid, PlayerDailyStat> = stats
            .daily_for_date(season_year, date)
            .await?
            .into_iter()
            .map(|row| (row.player_id, row))
            .collect();

        let plan = plan_daily_upserts(season_year, date, &counts, &players, &previous, &existing);
        summary.skipped = plan.skipped;

        let backfill = stats
            .latest_stats_date(season_year)
            .await?
            .is_some_and(|latest| latest > date);

        for row in plan.rows {
            if row.unchanged {
                summary.unchanged += 1;
                continue;
            }

            match stats.upsert_daily(&row.stat).await {
                Ok(true) => summary.created += 1,
                Ok(false) => summary.updated += 1,
                Err(e) => {
                    warn!(player_id = %row.stat.player_id, %date, "Failed to write daily stats: {}", e);
                    summary.errors += 1;
                    continue;
                }
            }

            if backfill {
                let rebuilt = stats
                    .rebuild_cumulative_after(row.stat.player_id, season_year, date)
                    .await?;
                if rebuilt > 0 {
                    info!(player_id = %row.stat.player_id, rebuilt, "Rebuilt later cumulative totals");
                }
            }
        }

        info!(
            %date,
            season_year,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            errors = summary.errors,
            "Daily ingestion finished"
        );

        Ok(summary)
    }

    fn name(&self) -> &'static str {
        "mlb-stats-api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn regular(hrs: i32) -> DayCount {
        DayCount {
            regular_season: hrs,
            postseason: 0,
        }
    }

    fn stored(stat: &NewDailyStat) -> PlayerDailyStat {
        PlayerDailyStat {
            player_id: stat.player_id,
            season_year: stat.season_year,
            stat_date: stat.stat_date,
            hrs_daily: stat.hrs_daily,
            hrs_daily_postseason: stat.hrs_daily_postseason,
            hrs_regular_season: stat.hrs_regular_season,
            hrs_postseason: stat.hrs_postseason,
            hrs_total: stat.hrs_total(),
            last_updated: date().and_hms_opt(6, 0, 0).unwrap(),
        }
    }

    #[test]
    fn default_date_uses_feed_timezone() {
        // 02:00 UTC on June 11 is still June 10 in US Eastern.
        let now = DateTime::parse_from_rfc3339("2025-06-11T02:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(default_stats_date(now, -4), NaiveDate::from_ymd_opt(2025, 6, 9).unwrap());
        assert_eq!(default_stats_date(now, 0), NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
    }

    #[test]
    fn normalizes_both_id_formats() {
        assert_eq!(normalize_external_id("656941"), Some(656941));
        assert_eq!(normalize_external_id("mlb-656941"), Some(656941));
        assert_eq!(normalize_external_id(" mlb-7 "), Some(7));
        assert_eq!(normalize_external_id("espn-1"), None);
        assert_eq!(normalize_external_id("mlb-"), None);
        assert_eq!(normalize_external_id(""), None);
    }

    #[test]
    fn builds_on_previous_totals() {
        let player = Uuid::new_v4();
        let counts = HashMap::from([(10, regular(2))]);
        let players = HashMap::from([(10, player)]);
        let previous = HashMap::from([(player, PlayerHrTotals::new(20, 0))]);

        let plan = plan_daily_upserts(2025, date(), &counts, &players, &previous, &HashMap::new());

        assert_eq!(plan.rows.len(), 1);
        let stat = plan.rows[0].stat;
        assert_eq!(stat.hrs_daily, 2);
        assert_eq!(stat.hrs_regular_season, 22);
        assert_eq!(stat.hrs_total(), 22);
        assert!(!plan.rows[0].unchanged);
    }

    #[test]
    fn first_home_run_starts_from_zero() {
        let player = Uuid::new_v4();
        let counts = HashMap::from([(10, regular(1))]);
        let players = HashMap::from([(10, player)]);

        let plan = plan_daily_upserts(
            2025,
            date(),
            &counts,
            &players,
            &HashMap::new(),
            &HashMap::new(),
        );
        assert_eq!(plan.rows[0].stat.hrs_total(), 1);
    }

    #[test]
    fn unknown_players_are_skipped() {
        let counts = HashMap::from([(10, regular(1)), (11, regular(3))]);
        let players = HashMap::from([(10, Uuid::new_v4())]);

        let plan = plan_daily_upserts(
            2025,
            date(),
            &counts,
            &players,
            &HashMap::new(),
            &HashMap::new(),
        );
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.skipped, 1);
    }

    #[test]
    fn rerun_of_same_date_is_unchanged() {
        let player = Uuid::new_v4();
        let counts = HashMap::from([(10, regular(2))]);
        let players = HashMap::from([(10, player)]);
        let previous = HashMap::from([(player, PlayerHrTotals::new(20, 0))]);

        let first = plan_daily_upserts(2025, date(), &counts, &players, &previous, &HashMap::new());
        let existing = HashMap::from([(player, stored(&first.rows[0].stat))]);
        let second = plan_daily_upserts(2025, date(), &counts, &players, &previous, &existing);

        assert_eq!(second.rows[0].stat, first.rows[0].stat);
        assert!(second.rows[0].unchanged);
    }

    #[test]
    fn corrected_feed_value_is_an_update() {
        let player = Uuid::new_v4();
        let players = HashMap::from([(10, player)]);
        let first = plan_daily_upserts(
            2025,
            date(),
            &HashMap::from([(10, regular(1))]),
            &players,
            &HashMap::new(),
            &HashMap::new(),
        );
        let existing = HashMap::from([(player, stored(&first.rows[0].stat))]);

        let second = plan_daily_upserts(
            2025,
            date(),
            &HashMap::from([(10, regular(2))]),
            &players,
            &HashMap::new(),
            &existing,
        );
        assert!(!second.rows[0].unchanged);
        assert_eq!(second.rows[0].stat.hrs_total(), 2);
    }

    #[test]
    fn postseason_counts_go_to_postseason_columns() {
        let player = Uuid::new_v4();
        let mut count = DayCount::default();
        count.add(GameKind::Postseason, 1);
        let counts = HashMap::from([(10, count)]);
        let players = HashMap::from([(10, player)]);
        let previous = HashMap::from([(player, PlayerHrTotals::new(40, 2))]);

        let plan = plan_daily_upserts(2025, date(), &counts, &players, &previous, &HashMap::new());
        let stat = plan.rows[0].stat;

        assert_eq!(stat.hrs_daily, 1);
        assert_eq!(stat.hrs_daily_postseason, 1);
        assert_eq!(stat.hrs_regular_season, 40);
        assert_eq!(stat.hrs_postseason, 3);
        assert_eq!(stat.hrs_total(), 43);
    }

    #[test]
    fn summary_changed_ignores_unchanged_rows() {
        let mut summary = IngestionSummary {
            unchanged: 4,
            skipped: 2,
            ..Default::default()
        };
        assert!(!summary.changed());
        summary.updated = 1;
        assert!(summary.changed());
    }
}
