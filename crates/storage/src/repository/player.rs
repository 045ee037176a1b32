use sqlx::{FromRow, PgPool};

use crate::error::Result;
use crate::models::Player;

const PLAYER_COLUMNS: &str =
    "player_id, external_id, name, team_abbr, photo_url, created_at, updated_at";

#[derive(FromRow)]
struct UpsertedPlayer {
    #[sqlx(flatten)]
    player: Player,
    inserted: bool,
}

/// Repository for Player database operations
pub struct PlayerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PlayerRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Player>> {
        let players = sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(players)
    }

    /// Inserts a player or refreshes its name and team, keyed by the feed id.
    /// The flag is true when a new row was created.
    pub async fn upsert_by_external_id(
        &self,
        external_id: &str,
        name: &str,
        team_abbr: &str,
    ) -> Result<(Player, bool)> {
        let row = sqlx::query_as::<_, UpsertedPlayer>(&format!(
            r#"
            INSERT INTO players (external_id, name, team_abbr)
            VALUES ($1, $2, $3)
            ON CONFLICT (external_id)
            DO UPDATE SET
                name = EXCLUDED.name,
                team_abbr = EXCLUDED.team_abbr,
                updated_at = CURRENT_TIMESTAMP
            RETURNING {PLAYER_COLUMNS}, (xmax = 0) AS inserted
            "#
        ))
        .bind(external_id)
        .bind(name)
        .bind(team_abbr)
        .fetch_one(self.pool)
        .await?;

        Ok((row.player, row.inserted))
    }
}
