use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImporterError>;

#[derive(Error, Debug)]
pub enum ImporterError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::error::StorageError),

    #[error("Unexpected feed response: {0}")]
    InvalidResponse(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ImporterError {
    /// Whether trying the same call again could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestError(e) => e.is_timeout() || e.is_connect(),
            Self::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            Self::DatabaseError(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            Self::StorageError(e) => e.is_transient(),
            Self::ParseError(_) | Self::InvalidResponse(_) | Self::ValidationError(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        for status in [429, 500, 502, 503] {
            let err = ImporterError::UpstreamStatus {
                status,
                url: "https://example.test".to_string(),
            };
            assert!(err.is_retryable(), "{status} should be retryable");
        }
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let err = ImporterError::UpstreamStatus {
            status: 404,
            url: "https://example.test".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(!ImporterError::InvalidResponse("no dates".to_string()).is_retryable());
        assert!(!ImporterError::ValidationError("bad date".to_string()).is_retryable());
    }

    #[test]
    fn pool_timeouts_are_retryable() {
        assert!(ImporterError::DatabaseError(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!ImporterError::DatabaseError(sqlx::Error::RowNotFound).is_retryable());
    }
}
