pub mod common;
pub mod job;
pub mod leaderboard;
pub mod season;
pub mod team;

pub use common::{PaginatedResponse, PaginationMeta, PaginationParams};
