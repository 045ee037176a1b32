use std::collections::HashMap;

use chrono::NaiveDateTime;
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{EntryStatus, Lifecycle, PaymentStatus, Team};

const TEAM_COLUMNS: &str = "team_id, owner_id, season_year, name, payment_status, entry_status, \
     locked_at, created_at, updated_at, deleted_at";

#[derive(FromRow)]
pub(crate) struct TeamRow {
    pub team_id: Uuid,
    owner_id: Uuid,
    season_year: i32,
    name: String,
    payment_status: String,
    entry_status: String,
    locked_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    deleted_at: Option<NaiveDateTime>,
}

impl TeamRow {
    pub(crate) fn into_team(self, player_ids: Vec<Uuid>) -> Result<Team> {
        Ok(Team {
            team_id: self.team_id,
            owner_id: self.owner_id,
            season_year: self.season_year,
            name: self.name,
            payment_status: self.payment_status.parse()?,
            entry_status: self.entry_status.parse()?,
            locked_at: self.locked_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            player_ids,
        })
    }
}

#[derive(FromRow)]
struct RosterRow {
    team_id: Uuid,
    player_id: Uuid,
}

/// Roster player ids per team, in roster order.
pub(crate) async fn fetch_rosters<'e, E>(
    executor: E,
    team_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Uuid>>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, RosterRow>(
        r#"
        SELECT team_id, player_id
        FROM team_players
        WHERE team_id = ANY($1)
        ORDER BY team_id, roster_position
        "#,
    )
    .bind(team_ids)
    .fetch_all(executor)
    .await?;

    let mut rosters: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in rows {
        rosters.entry(row.team_id).or_default().push(row.player_id);
    }
    Ok(rosters)
}

pub(crate) fn assemble(
    rows: Vec<TeamRow>,
    mut rosters: HashMap<Uuid, Vec<Uuid>>,
) -> Result<Vec<Team>> {
    rows.into_iter()
        .map(|row| {
            let players = rosters.remove(&row.team_id).unwrap_or_default();
            row.into_team(players)
        })
        .collect()
}

pub struct TeamRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TeamRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, team_id: Uuid) -> Result<Team> {
        let row = sqlx::query_as::<_, TeamRow>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE team_id = $1 AND deleted_at IS NULL"
        ))
        .bind(team_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        let mut rosters = fetch_rosters(self.pool, &[team_id]).await?;
        row.into_team(rosters.remove(&team_id).unwrap_or_default())
    }

    pub async fn list_by_owner(&self, owner_id: Uuid, season_year: i32) -> Result<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(&format!(
            r#"
            SELECT {TEAM_COLUMNS}
            FROM teams
            WHERE owner_id = $1 AND season_year = $2 AND deleted_at IS NULL
            ORDER BY created_at, team_id
            "#
        ))
        .bind(owner_id)
        .bind(season_year)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.team_id).collect();
        let rosters = fetch_rosters(self.pool, &ids).await?;
        assemble(rows, rosters)
    }

    /// Inserts a draft team and its roster in one transaction.
    pub async fn create(
        &self,
        owner_id: Uuid,
        season_year: i32,
        name: &str,
        player_ids: &[Uuid],
    ) -> Result<Team> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TeamRow>(&format!(
            r#"
            INSERT INTO teams (team_id, owner_id, season_year, name, payment_status, entry_status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(season_year)
        .bind(name)
        .bind(PaymentStatus::Draft.as_str())
        .bind(EntryStatus::Draft.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::from(e).conflict_on_unique("team name"))?;

        insert_roster(&mut tx, row.team_id, player_ids).await?;
        tx.commit().await?;

        row.into_team(player_ids.to_vec())
    }

    /// Replaces name and roster unless the team got locked in the meantime.
    pub async fn update(&self, team_id: Uuid, name: &str, player_ids: &[Uuid]) -> Result<Team> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TeamRow>(&format!(
            r#"
            UPDATE teams
            SET name = $2, updated_at = CURRENT_TIMESTAMP
            WHERE team_id = $1 AND deleted_at IS NULL AND entry_status <> $3
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(team_id)
        .bind(name)
        .bind(EntryStatus::Locked.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StorageError::from(e).conflict_on_unique("team name"))?
        .ok_or_else(|| StorageError::InvalidState("team is missing or locked".to_string()))?;

        sqlx::query("DELETE FROM team_players WHERE team_id = $1")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        insert_roster(&mut tx, team_id, player_ids).await?;
        tx.commit().await?;

        row.into_team(player_ids.to_vec())
    }

    /// Compare-and-set on payment status; fails if another writer moved it first.
    pub async fn set_payment_status(
        &self,
        team_id: Uuid,
        expected: PaymentStatus,
        next: PaymentStatus,
    ) -> Result<Team> {
        let row = sqlx::query_as::<_, TeamRow>(&format!(
            r#"
            UPDATE teams
            SET payment_status = $3, updated_at = CURRENT_TIMESTAMP
            WHERE team_id = $1 AND payment_status = $2 AND deleted_at IS NULL
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(team_id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| {
            StorageError::Conflict(format!(
                "payment status is no longer '{}'",
                expected.as_str()
            ))
        })?;

        let mut rosters = fetch_rosters(self.pool, &[team_id]).await?;
        row.into_team(rosters.remove(&team_id).unwrap_or_default())
    }

    /// Compare-and-set on entry status. Moving to `locked` stamps `locked_at`.
    pub async fn set_entry_status(
        &self,
        team_id: Uuid,
        expected: EntryStatus,
        next: EntryStatus,
    ) -> Result<Team> {
        let row = sqlx::query_as::<_, TeamRow>(&format!(
            r#"
            UPDATE teams
            SET entry_status = $3,
                locked_at = CASE WHEN $3 = 'locked' THEN CURRENT_TIMESTAMP ELSE locked_at END,
                updated_at = CURRENT_TIMESTAMP
            WHERE team_id = $1 AND entry_status = $2 AND deleted_at IS NULL
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(team_id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| {
            StorageError::Conflict(format!("entry status is no longer '{}'", expected.as_str()))
        })?;

        let mut rosters = fetch_rosters(self.pool, &[team_id]).await?;
        row.into_team(rosters.remove(&team_id).unwrap_or_default())
    }

    /// Locks every entered team of the season. Returns how many were locked.
    pub async fn lock_entered(&self, season_year: i32) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE teams
            SET entry_status = $2, locked_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE season_year = $1 AND entry_status = $3 AND deleted_at IS NULL
            "#,
        )
        .bind(season_year)
        .bind(EntryStatus::Locked.as_str())
        .bind(EntryStatus::Entered.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn soft_delete(&self, team_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE teams
            SET deleted_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE team_id = $1 AND deleted_at IS NULL AND entry_status <> $2
            "#,
        )
        .bind(team_id)
        .bind(EntryStatus::Locked.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::InvalidState(
                "team is missing or locked".to_string(),
            ));
        }
        Ok(())
    }
}

async fn insert_roster(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    team_id: Uuid,
    player_ids: &[Uuid],
) -> Result<()> {
    if player_ids.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO team_players (team_id, player_id, roster_position) ");
    builder.push_values(player_ids.iter().enumerate(), |mut b, (position, player_id)| {
        b.push_bind(team_id)
            .push_bind(*player_id)
            .push_bind(position as i16 + 1);
    });

    builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(|e| roster_error(StorageError::from(e)))?;
    Ok(())
}

fn roster_error(e: StorageError) -> StorageError {
    if e.is_foreign_key_violation() {
        StorageError::Validation("roster references an unknown player".to_string())
    } else if e.is_unique_violation() {
        StorageError::Validation("roster picks the same player more than once".to_string())
    } else {
        e
    }
}
