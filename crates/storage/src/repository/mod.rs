pub mod job_execution;
pub mod leaderboard;
pub mod player;
pub mod season;
pub mod snapshot;
pub mod stats;
pub mod team;
