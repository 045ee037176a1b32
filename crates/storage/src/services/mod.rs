pub mod leaderboard;
pub mod roster;
pub mod scoring;
pub mod season_phase;
