use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::models::{BoxscoreResponse, LeadersResponse, ScheduleResponse};
use crate::error::{ImporterError, Result};

pub const DEFAULT_BASE_URL: &str = "https://statsapi.mlb.com/api/v1";

/// Transport-level attempts per request, on top of whatever the caller does.
const TRANSPORT_ATTEMPTS: u32 = 3;

pub struct MlbClient {
    base_url: String,
    client: reqwest::Client,
}

impl MlbClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("hr-derby-importer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn fetch_schedule(&self, date: NaiveDate) -> Result<ScheduleResponse> {
        let date = date.format("%Y-%m-%d").to_string();
        self.get_json("schedule", &[("sportId", "1"), ("date", &date)])
            .await
    }

    pub async fn fetch_boxscore(&self, game_pk: i64) -> Result<BoxscoreResponse> {
        self.get_json(&format!("game/{game_pk}/boxscore"), &[]).await
    }

    /// Regular-season home run leaders for a season.
    pub async fn fetch_season_leaders(
        &self,
        season_year: i32,
        limit: u32,
    ) -> Result<LeadersResponse> {
        let season = season_year.to_string();
        let limit = limit.to_string();
        self.get_json(
            "stats/leaders",
            &[
                ("leaderCategories", "homeRuns"),
                ("season", &season),
                ("limit", &limit),
                ("leaderGameTypes", "R"),
                ("statGroup", "hitting"),
            ],
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.try_get(&url, query).await {
                Ok(body) => return Ok(serde_json::from_str(&body)?),
                Err(e) if e.is_retryable() && attempt < TRANSPORT_ATTEMPTS => {
                    let delay = Duration::from_millis(250 * 2u64.pow(attempt));
                    warn!(url = %url, attempt, "Feed request failed: {}. Retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_get(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        debug!(url, "GET");
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImporterError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
