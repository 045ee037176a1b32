pub mod daily;
pub mod eligibility;
pub mod error;
pub mod sources;
pub mod traits;

pub use daily::{IngestionSummary, MlbDailyIngestor};
pub use error::{ImporterError, Result};
pub use sources::mlb::MlbClient;
pub use traits::DailyStatsIngestor;
