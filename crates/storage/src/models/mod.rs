pub mod job_execution;
pub mod leaderboard;
pub mod lifecycle;
pub mod player;
pub mod player_stats;
pub mod season;
pub mod team;

pub use job_execution::{JobExecution, JobStatus, NewJobExecution};
pub use leaderboard::{LeaderboardEntry, LeaderboardScope, NewLeaderboardEntry};
pub use lifecycle::Lifecycle;
pub use player::Player;
pub use player_stats::{NewDailyStat, PlayerDailyStat, PlayerHrTotals, PlayerSeasonStat};
pub use season::{SeasonConfig, SeasonPhase};
pub use team::{EntryStatus, PaymentStatus, Team};
