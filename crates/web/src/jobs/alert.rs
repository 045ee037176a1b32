use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// What an administrator is told when a job fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobAlert {
    pub job_name: String,
    pub error: String,
    /// `source()` chain of the error, outermost first.
    pub detail: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub context: serde_json::Value,
}

impl JobAlert {
    pub fn new(
        job_name: &str,
        err: &(dyn std::error::Error + 'static),
        context: serde_json::Value,
    ) -> Self {
        let mut detail = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            detail.push(cause.to_string());
            source = cause.source();
        }

        Self {
            job_name: job_name.to_string(),
            error: err.to_string(),
            detail,
            timestamp: Utc::now(),
            context,
        }
    }
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("alert webhook returned {0}")]
    Status(u16),
}

#[async_trait::async_trait]
pub trait AdminAlerter: Send + Sync {
    async fn alert(&self, alert: &JobAlert) -> Result<(), AlertError>;
}

/// Writes alerts to the log. Always on.
pub struct TracingAlerter;

#[async_trait::async_trait]
impl AdminAlerter for TracingAlerter {
    async fn alert(&self, alert: &JobAlert) -> Result<(), AlertError> {
        error!(
            job = %alert.job_name,
            error = %alert.error,
            detail = ?alert.detail,
            context = %alert.context,
            "Job failed"
        );
        Ok(())
    }
}

/// Logs, then posts the alert as JSON to a webhook.
pub struct WebhookAlerter {
    client: reqwest::Client,
    url: String,
}

impl WebhookAlerter {
    pub fn new(url: impl Into<String>) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl AdminAlerter for WebhookAlerter {
    async fn alert(&self, alert: &JobAlert) -> Result<(), AlertError> {
        TracingAlerter.alert(alert).await?;

        let response = self.client.post(&self.url).json(alert).send().await?;
        if !response.status().is_success() {
            return Err(AlertError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("ingestion failed")]
    struct Outer(#[source] Inner);

    #[derive(Debug, Error)]
    #[error("feed timed out")]
    struct Inner;

    #[test]
    fn alert_carries_error_chain() {
        let err = Outer(Inner);
        let alert = JobAlert::new("update_stats", &err, serde_json::json!({"date": "2025-06-01"}));

        assert_eq!(alert.job_name, "update_stats");
        assert_eq!(alert.error, "ingestion failed");
        assert_eq!(alert.detail, vec!["feed timed out".to_string()]);
        assert_eq!(alert.context["date"], "2025-06-01");
    }
}
