//! Wire types for the MLB Stats API, limited to the fields ingestion reads.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScheduleResponse {
    #[serde(default)]
    pub dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleDate {
    pub date: NaiveDate,
    #[serde(default)]
    pub games: Vec<ScheduledGame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduledGame {
    #[serde(rename = "gamePk")]
    pub game_pk: i64,
    #[serde(rename = "gameType")]
    pub game_type: String,
    pub status: GameStatus,
    #[serde(default)]
    pub teams: Option<Matchup>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GameStatus {
    #[serde(rename = "abstractGameState")]
    pub abstract_game_state: String,
    #[serde(rename = "detailedState", default)]
    pub detailed_state: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Matchup {
    pub away: MatchupSide,
    pub home: MatchupSide,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchupSide {
    pub team: TeamRef,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TeamRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

/// How a scheduled game counts toward contest totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
    RegularSeason,
    Postseason,
}

impl ScheduledGame {
    /// `None` for spring training, exhibitions and the All-Star game.
    pub fn kind(&self) -> Option<GameKind> {
        match self.game_type.as_str() {
            "R" => Some(GameKind::RegularSeason),
            "F" | "D" | "L" | "W" => Some(GameKind::Postseason),
            _ => None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.status.abstract_game_state == "Final"
    }

    pub fn description(&self) -> String {
        match &self.teams {
            Some(m) => format!(
                "{} @ {}",
                m.away.team.name.as_deref().unwrap_or("?"),
                m.home.team.name.as_deref().unwrap_or("?")
            ),
            None => format!("game {}", self.game_pk),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BoxscoreResponse {
    pub teams: BoxscoreTeams,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BoxscoreTeams {
    pub away: BoxscoreTeam,
    pub home: BoxscoreTeam,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BoxscoreTeam {
    #[serde(default)]
    pub batters: Vec<i64>,
    /// Keyed `ID<person id>`.
    #[serde(default)]
    pub players: HashMap<String, BoxscorePlayer>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BoxscorePlayer {
    pub person: Person,
    #[serde(default)]
    pub stats: PlayerStats,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Person {
    pub id: i64,
    #[serde(rename = "fullName", default)]
    pub full_name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PlayerStats {
    #[serde(default)]
    pub batting: BattingStats,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BattingStats {
    #[serde(rename = "homeRuns", default)]
    pub home_runs: i32,
}

impl BoxscoreResponse {
    /// Home runs per batter for both teams; batters without one are omitted.
    pub fn home_runs(&self) -> Vec<(i64, i32)> {
        [&self.teams.away, &self.teams.home]
            .into_iter()
            .flat_map(|team| {
                team.batters.iter().filter_map(|id| {
                    let hrs = team
                        .players
                        .get(&format!("ID{id}"))
                        .map(|p| p.stats.batting.home_runs)
                        .unwrap_or(0);
                    (hrs > 0).then_some((*id, hrs))
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LeadersResponse {
    #[serde(rename = "leagueLeaders", default)]
    pub league_leaders: Vec<LeagueLeaders>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LeagueLeaders {
    #[serde(default)]
    pub leaders: Vec<Leader>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Leader {
    /// Numeric, but sent as a string.
    pub value: String,
    pub person: Person,
    #[serde(default)]
    pub team: Option<TeamRef>,
}

impl Leader {
    pub fn home_runs(&self) -> Option<i32> {
        self.value.trim().parse().ok()
    }

    pub fn team_abbr(&self) -> &str {
        self.team
            .as_ref()
            .and_then(|t| t.abbreviation.as_deref())
            .unwrap_or("FA")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boxscore_home_runs() {
        let json = r#"{
            "teams": {
                "away": {
                    "batters": [1, 2],
                    "players": {
                        "ID1": {"person": {"id": 1, "fullName": "A"}, "stats": {"batting": {"homeRuns": 2}}},
                        "ID2": {"person": {"id": 2, "fullName": "B"}, "stats": {"batting": {}}}
                    }
                },
                "home": {
                    "batters": [3],
                    "players": {
                        "ID3": {"person": {"id": 3, "fullName": "C"}, "stats": {"batting": {"homeRuns": 1}}}
                    }
                }
            }
        }"#;

        let boxscore: BoxscoreResponse = serde_json::from_str(json).unwrap();
        assert_eq!(boxscore.home_runs(), vec![(1, 2), (3, 1)]);
    }

    #[test]
    fn classifies_game_types() {
        let game = |game_type: &str| ScheduledGame {
            game_pk: 1,
            game_type: game_type.to_string(),
            status: GameStatus {
                abstract_game_state: "Final".to_string(),
                detailed_state: "Final".to_string(),
            },
            teams: None,
        };

        assert_eq!(game("R").kind(), Some(GameKind::RegularSeason));
        for t in ["F", "D", "L", "W"] {
            assert_eq!(game(t).kind(), Some(GameKind::Postseason));
        }
        assert_eq!(game("S").kind(), None);
        assert_eq!(game("A").kind(), None);
    }

    #[test]
    fn leader_value_is_parsed_and_team_defaults() {
        let json = r#"{"leagueLeaders": [{"leaders": [
            {"value": "58", "person": {"id": 7, "fullName": "Big Bat"}, "team": {"name": "Seattle Mariners"}}
        ]}]}"#;

        let leaders: LeadersResponse = serde_json::from_str(json).unwrap();
        let leader = &leaders.league_leaders[0].leaders[0];
        assert_eq!(leader.home_runs(), Some(58));
        assert_eq!(leader.team_abbr(), "FA");
    }
}
