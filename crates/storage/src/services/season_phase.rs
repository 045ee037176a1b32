//! Phase gating for team mutations.

use thiserror::Error;

use crate::models::{SeasonConfig, SeasonPhase};

/// Creating a team and editing its name or roster.
pub const ROSTER_EDIT_PHASES: &[SeasonPhase] = &[SeasonPhase::Registration];

/// Payment and entry submissions stay open until the season starts.
pub const ENTRY_PHASES: &[SeasonPhase] = &[SeasonPhase::Registration];

/// Locking entries happens once play is underway.
pub const LOCK_PHASES: &[SeasonPhase] = &[SeasonPhase::Active];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseViolation {
    #[error("no season configured")]
    NoSeason,

    #[error("{message} (current phase: {current}; allowed: {})", join_phases(.allowed))]
    Forbidden {
        current: SeasonPhase,
        allowed: Vec<SeasonPhase>,
        message: String,
    },
}

fn join_phases(phases: &[SeasonPhase]) -> String {
    phases
        .iter()
        .map(SeasonPhase::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves whether an action allowed in `allowed` may run against the
/// current season, handing the season back on success.
pub fn check_phase(
    current: Option<SeasonConfig>,
    allowed: &[SeasonPhase],
) -> Result<SeasonConfig, PhaseViolation> {
    let season = current.ok_or(PhaseViolation::NoSeason)?;

    if allowed.contains(&season.phase) {
        return Ok(season);
    }

    Err(PhaseViolation::Forbidden {
        current: season.phase,
        allowed: allowed.to_vec(),
        message: season.phase.rejection_message().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn season(phase: SeasonPhase) -> SeasonConfig {
        let now = NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        SeasonConfig {
            season_year: 2026,
            phase,
            registration_opens_on: None,
            registration_closes_on: None,
            season_starts_on: None,
            season_ends_on: None,
            is_current_season: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn missing_season_is_unavailable() {
        assert_eq!(
            check_phase(None, ROSTER_EDIT_PHASES),
            Err(PhaseViolation::NoSeason)
        );
    }

    #[test]
    fn allowed_phase_passes_season_through() {
        let config = season(SeasonPhase::Registration);
        assert_eq!(
            check_phase(Some(config.clone()), ROSTER_EDIT_PHASES).unwrap(),
            config
        );
    }

    #[test]
    fn each_blocked_phase_explains_itself() {
        let cases = [
            (SeasonPhase::OffSeason, "not yet open"),
            (SeasonPhase::Active, "roster changes are locked"),
            (SeasonPhase::Completed, "season is over"),
        ];

        for (phase, expected) in cases {
            match check_phase(Some(season(phase)), ROSTER_EDIT_PHASES) {
                Err(PhaseViolation::Forbidden {
                    current,
                    allowed,
                    message,
                }) => {
                    assert_eq!(current, phase);
                    assert_eq!(allowed, vec![SeasonPhase::Registration]);
                    assert!(message.contains(expected), "{message}");
                }
                other => panic!("expected rejection for {phase}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejection_text_names_phases() {
        let err = check_phase(Some(season(SeasonPhase::Active)), ROSTER_EDIT_PHASES).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The season is underway; roster changes are locked (current phase: active; allowed: registration)"
        );
    }
}
