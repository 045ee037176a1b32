use chrono::NaiveDate;

use crate::Result;
use crate::daily::IngestionSummary;

/// A source of per-day home run counts for a season.
#[async_trait::async_trait]
pub trait DailyStatsIngestor: Send + Sync {
    /// Ingests `date` into the stats store. Safe to call again for the same date.
    async fn ingest(&self, season_year: i32, date: NaiveDate) -> Result<IngestionSummary>;

    fn name(&self) -> &'static str;
}
