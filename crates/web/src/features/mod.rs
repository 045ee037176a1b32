pub mod admin;
pub mod leaderboard;
pub mod seasons;
pub mod teams;
