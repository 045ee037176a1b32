use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, PgPool};

use crate::error::{Result, StorageError};
use crate::models::{SeasonConfig, SeasonPhase};

const SEASON_COLUMNS: &str = "season_year, phase, registration_opens_on, registration_closes_on, \
     season_starts_on, season_ends_on, is_current_season, created_at, updated_at";

#[derive(FromRow)]
struct SeasonRow {
    season_year: i32,
    phase: String,
    registration_opens_on: Option<NaiveDate>,
    registration_closes_on: Option<NaiveDate>,
    season_starts_on: Option<NaiveDate>,
    season_ends_on: Option<NaiveDate>,
    is_current_season: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<SeasonRow> for SeasonConfig {
    type Error = StorageError;

    fn try_from(row: SeasonRow) -> Result<Self> {
        Ok(SeasonConfig {
            season_year: row.season_year,
            phase: row.phase.parse()?,
            registration_opens_on: row.registration_opens_on,
            registration_closes_on: row.registration_closes_on,
            season_starts_on: row.season_starts_on,
            season_ends_on: row.season_ends_on,
            is_current_season: row.is_current_season,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Dates an administrator may set on a season.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonDates {
    pub registration_opens_on: Option<NaiveDate>,
    pub registration_closes_on: Option<NaiveDate>,
    pub season_starts_on: Option<NaiveDate>,
    pub season_ends_on: Option<NaiveDate>,
}

pub struct SeasonRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SeasonRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, season_year: i32) -> Result<SeasonConfig> {
        sqlx::query_as::<_, SeasonRow>(&format!(
            "SELECT {SEASON_COLUMNS} FROM season_configs WHERE season_year = $1"
        ))
        .bind(season_year)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?
        .try_into()
    }

    /// The season flagged current, if any.
    pub async fn current(&self) -> Result<Option<SeasonConfig>> {
        sqlx::query_as::<_, SeasonRow>(&format!(
            "SELECT {SEASON_COLUMNS} FROM season_configs WHERE is_current_season"
        ))
        .fetch_optional(self.pool)
        .await?
        .map(SeasonConfig::try_from)
        .transpose()
    }

    pub async fn list(&self) -> Result<Vec<SeasonConfig>> {
        sqlx::query_as::<_, SeasonRow>(&format!(
            "SELECT {SEASON_COLUMNS} FROM season_configs ORDER BY season_year DESC"
        ))
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(SeasonConfig::try_from)
        .collect()
    }

    /// Creates the season in `off_season` or updates its dates; phase and
    /// current flag are left alone on update.
    pub async fn upsert(&self, season_year: i32, dates: &SeasonDates) -> Result<SeasonConfig> {
        sqlx::query_as::<_, SeasonRow>(&format!(
            r#"
            INSERT INTO season_configs (
                season_year, phase, registration_opens_on, registration_closes_on,
                season_starts_on, season_ends_on
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (season_year)
            DO UPDATE SET
                registration_opens_on = EXCLUDED.registration_opens_on,
                registration_closes_on = EXCLUDED.registration_closes_on,
                season_starts_on = EXCLUDED.season_starts_on,
                season_ends_on = EXCLUDED.season_ends_on,
                updated_at = CURRENT_TIMESTAMP
            RETURNING {SEASON_COLUMNS}
            "#
        ))
        .bind(season_year)
        .bind(SeasonPhase::OffSeason.as_str())
        .bind(dates.registration_opens_on)
        .bind(dates.registration_closes_on)
        .bind(dates.season_starts_on)
        .bind(dates.season_ends_on)
        .fetch_one(self.pool)
        .await?
        .try_into()
    }

    /// Marks one season current and clears the flag everywhere else, atomically.
    pub async fn set_current(&self, season_year: i32) -> Result<SeasonConfig> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE season_configs
            SET is_current_season = FALSE, updated_at = CURRENT_TIMESTAMP
            WHERE is_current_season AND season_year <> $1
            "#,
        )
        .bind(season_year)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, SeasonRow>(&format!(
            r#"
            UPDATE season_configs
            SET is_current_season = TRUE, updated_at = CURRENT_TIMESTAMP
            WHERE season_year = $1
            RETURNING {SEASON_COLUMNS}
            "#
        ))
        .bind(season_year)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StorageError::NotFound)?;

        tx.commit().await?;
        row.try_into()
    }

    /// Compare-and-set phase change; `expected` guards against concurrent moves.
    pub async fn set_phase(
        &self,
        season_year: i32,
        expected: SeasonPhase,
        next: SeasonPhase,
    ) -> Result<SeasonConfig> {
        sqlx::query_as::<_, SeasonRow>(&format!(
            r#"
            UPDATE season_configs
            SET phase = $3, updated_at = CURRENT_TIMESTAMP
            WHERE season_year = $1 AND phase = $2
            RETURNING {SEASON_COLUMNS}
            "#
        ))
        .bind(season_year)
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| {
            StorageError::Conflict(format!(
                "season {season_year} is no longer in phase '{expected}'"
            ))
        })?
        .try_into()
    }
}
