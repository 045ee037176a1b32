//! Season eligibility import: the prior season's home run leaders become the
//! contest's player pool, and their totals feed the roster cap.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};

use storage::repository::player::PlayerRepository;
use storage::repository::stats::StatsRepository;

use crate::error::Result;
use crate::sources::mlb::MlbClient;
use crate::sources::mlb::models::LeadersResponse;

pub const LEADERS_LIMIT: u32 = 500;
pub const DEFAULT_MIN_HRS: i32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleLeader {
    pub external_id: String,
    pub name: String,
    pub team_abbr: String,
    pub hrs_total: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilitySummary {
    pub fetched: usize,
    pub eligible: usize,
    pub players_created: usize,
    pub players_updated: usize,
    pub errors: usize,
}

/// Leaders with at least `min_hrs`, one entry per player, best first.
pub fn eligible_leaders(response: &LeadersResponse, min_hrs: i32) -> Vec<EligibleLeader> {
    let mut by_player: HashMap<i64, EligibleLeader> = HashMap::new();

    for leader in response.league_leaders.iter().flat_map(|l| l.leaders.iter()) {
        let Some(hrs) = leader.home_runs() else {
            warn!(person = leader.person.id, value = %leader.value, "Unparseable leader value");
            continue;
        };
        if hrs < min_hrs {
            continue;
        }

        let candidate = EligibleLeader {
            external_id: leader.person.id.to_string(),
            name: leader.person.full_name.clone(),
            team_abbr: leader.team_abbr().to_string(),
            hrs_total: hrs,
        };
        by_player
            .entry(leader.person.id)
            .and_modify(|existing| {
                if candidate.hrs_total > existing.hrs_total {
                    *existing = candidate.clone();
                }
            })
            .or_insert(candidate);
    }

    let mut leaders: Vec<EligibleLeader> = by_player.into_values().collect();
    leaders.sort_by(|a, b| {
        b.hrs_total
            .cmp(&a.hrs_total)
            .then_with(|| a.external_id.cmp(&b.external_id))
    });
    leaders
}

/// Upserts every eligible leader of `season_year` as a player with a season stat.
pub async fn import_eligibility(
    pool: &PgPool,
    client: &MlbClient,
    season_year: i32,
    min_hrs: i32,
) -> Result<EligibilitySummary> {
    info!(season_year, min_hrs, "Fetching season home run leaders");
    let response = client.fetch_season_leaders(season_year, LEADERS_LIMIT).await?;

    let leaders = eligible_leaders(&response, min_hrs);
    let mut summary = EligibilitySummary {
        fetched: response.league_leaders.iter().map(|l| l.leaders.len()).sum(),
        eligible: leaders.len(),
        ..Default::default()
    };

    let players = PlayerRepository::new(pool);
    let stats = StatsRepository::new(pool);

    for leader in &leaders {
        let outcome = async {
            let (player, inserted) = players
                .upsert_by_external_id(&leader.external_id, &leader.name, &leader.team_abbr)
                .await?;
            stats
                .upsert_season_stat(
                    player.player_id,
                    season_year,
                    leader.hrs_total,
                    &leader.team_abbr,
                )
                .await?;
            Ok::<_, storage::error::StorageError>(inserted)
        }
        .await;

        match outcome {
            Ok(true) => summary.players_created += 1,
            Ok(false) => summary.players_updated += 1,
            Err(e) => {
                warn!(external_id = %leader.external_id, name = %leader.name, "Failed to import player: {}", e);
                summary.errors += 1;
            }
        }
    }

    info!(
        season_year,
        eligible = summary.eligible,
        created = summary.players_created,
        updated = summary.players_updated,
        errors = summary.errors,
        "Eligibility import finished"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> LeadersResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn filters_below_threshold() {
        let leaders = eligible_leaders(
            &response(
                r#"{"leagueLeaders": [{"leaders": [
                    {"value": "41", "person": {"id": 1, "fullName": "A"}, "team": {"abbreviation": "NYY"}},
                    {"value": "20", "person": {"id": 2, "fullName": "B"}},
                    {"value": "19", "person": {"id": 3, "fullName": "C"}}
                ]}]}"#,
            ),
            20,
        );

        let ids: Vec<&str> = leaders.iter().map(|l| l.external_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(leaders[0].team_abbr, "NYY");
        assert_eq!(leaders[1].team_abbr, "FA");
    }

    #[test]
    fn duplicate_players_keep_highest_total() {
        let leaders = eligible_leaders(
            &response(
                r#"{"leagueLeaders": [
                    {"leaders": [{"value": "25", "person": {"id": 9, "fullName": "Traded"}}]},
                    {"leaders": [{"value": "31", "person": {"id": 9, "fullName": "Traded"}}]}
                ]}"#,
            ),
            20,
        );

        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].hrs_total, 31);
    }

    #[test]
    fn empty_response_yields_nothing() {
        assert!(eligible_leaders(&LeadersResponse::default(), 20).is_empty());
    }
}
