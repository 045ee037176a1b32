use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::error::{Result, StorageError};

/// Players every team must pick.
pub const ROSTER_SIZE: usize = 8;

/// Ceiling on the sum of the roster's prior-season home runs.
pub const PRESEASON_HR_CAP: i32 = 172;

/// Checks a proposed roster and returns its pre-season home run total.
///
/// `prior_season` maps each eligible player to their previous-season total;
/// a player missing from it is not eligible for the contest.
pub fn validate_roster(player_ids: &[Uuid], prior_season: &HashMap<Uuid, i32>) -> Result<i32> {
    let mut problems = Vec::new();

    if player_ids.len() != ROSTER_SIZE {
        problems.push(format!(
            "roster must have exactly {} players, got {}",
            ROSTER_SIZE,
            player_ids.len()
        ));
    }

    let mut seen = HashSet::new();
    for player_id in player_ids {
        if !seen.insert(player_id) {
            problems.push(format!("player {player_id} is picked more than once"));
        }
    }

    let mut total = 0;
    for player_id in seen {
        match prior_season.get(player_id) {
            Some(hrs) => total += hrs,
            None => problems.push(format!("player {player_id} is not eligible this season")),
        }
    }

    if total > PRESEASON_HR_CAP {
        problems.push(format!(
            "pre-season home run total {total} exceeds the cap of {PRESEASON_HR_CAP}"
        ));
    }

    if problems.is_empty() {
        Ok(total)
    } else {
        Err(StorageError::Validation(problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(hrs: &[i32]) -> (Vec<Uuid>, HashMap<Uuid, i32>) {
        let ids: Vec<Uuid> = hrs.iter().map(|_| Uuid::new_v4()).collect();
        let prior = ids.iter().copied().zip(hrs.iter().copied()).collect();
        (ids, prior)
    }

    #[test]
    fn roster_at_cap_is_accepted() {
        let (ids, prior) = pool(&[30, 25, 25, 22, 20, 20, 15, 15]);
        assert_eq!(validate_roster(&ids, &prior).unwrap(), 172);
    }

    #[test]
    fn roster_over_cap_is_rejected() {
        let (ids, prior) = pool(&[30, 25, 25, 22, 20, 20, 15, 16]);
        let err = validate_roster(&ids, &prior).unwrap_err().to_string();
        assert!(err.contains("173 exceeds the cap of 172"), "{err}");
    }

    #[test]
    fn wrong_size_is_rejected() {
        let (ids, prior) = pool(&[20, 20, 20]);
        let err = validate_roster(&ids, &prior).unwrap_err().to_string();
        assert!(err.contains("exactly 8 players, got 3"), "{err}");
    }

    #[test]
    fn duplicates_and_ineligible_players_are_reported() {
        let (mut ids, prior) = pool(&[20, 20, 20, 20, 20, 20, 20]);
        ids.push(ids[0]);
        let stranger = Uuid::new_v4();
        ids[1] = stranger;

        let err = validate_roster(&ids, &prior).unwrap_err().to_string();

        assert!(err.contains("picked more than once"), "{err}");
        assert!(err.contains(&format!("player {stranger} is not eligible")), "{err}");
    }
}
