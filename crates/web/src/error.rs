use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use storage::error::StorageError;
use storage::models::SeasonPhase;
use storage::services::season_phase::PhaseViolation;
use validator::ValidationErrors;

use crate::jobs::PipelineError;

/// Web layer errors
#[derive(Debug)]
pub enum WebError {
    Storage(StorageError),
    Validation(ValidationErrors),
    Pipeline(PipelineError),
    BadRequest(String),
    Unauthorized,
    /// The current season phase does not allow the action.
    Forbidden {
        message: String,
        current_phase: SeasonPhase,
        allowed_phases: Vec<SeasonPhase>,
    },
    /// The acting owner does not own the team.
    NotOwner,
    ServiceUnavailable(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Validation(e) => write!(f, "Validation error: {}", e),
            Self::Pipeline(e) => write!(f, "Job error: {}", e),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::Forbidden { message, .. } => write!(f, "Forbidden: {}", message),
            Self::NotOwner => write!(f, "Forbidden: not the team owner"),
            Self::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

fn phase_names(phases: &[SeasonPhase]) -> Vec<&'static str> {
    phases.iter().map(SeasonPhase::as_str).collect()
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            Self::Storage(StorageError::NotFound) => StatusCode::NOT_FOUND,
            Self::Storage(StorageError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Storage(StorageError::InvalidState(_)) => StatusCode::CONFLICT,
            Self::Storage(StorageError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline(PipelineError::AlreadyRunning(_)) => StatusCode::CONFLICT,
            Self::Pipeline(PipelineError::Ingestion(_)) => StatusCode::BAD_GATEWAY,
            Self::Pipeline(PipelineError::Leaderboard(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } | Self::NotOwner => StatusCode::FORBIDDEN,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = match &self {
            Self::Storage(StorageError::NotFound) => {
                json!({
                    "error": "Resource not found"
                })
            }
            Self::Storage(
                StorageError::Validation(msg)
                | StorageError::InvalidState(msg)
                | StorageError::Conflict(msg),
            ) => {
                json!({
                    "error": msg
                })
            }
            Self::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                json!({
                    "error": "An internal error occurred"
                })
            }
            Self::Validation(errors) => {
                let mut details: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errors)| {
                        errors.iter().map(move |e| {
                            format!(
                                "{}: {}",
                                field,
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| e.code.to_string())
                            )
                        })
                    })
                    .collect();
                details.sort();

                json!({
                    "error": "Validation failed",
                    "details": details
                })
            }
            Self::Pipeline(PipelineError::Leaderboard(e)) => {
                tracing::error!("Leaderboard rebuild error: {:?}", e);
                json!({
                    "error": "Leaderboard rebuild failed"
                })
            }
            Self::Pipeline(e) => {
                json!({
                    "error": e.to_string(),
                    "detail": std::error::Error::source(e).map(|s| s.to_string())
                })
            }
            Self::BadRequest(msg) | Self::ServiceUnavailable(msg) => {
                json!({
                    "error": msg
                })
            }
            Self::Unauthorized => {
                json!({
                    "error": "Unauthorized"
                })
            }
            Self::Forbidden {
                message,
                current_phase,
                allowed_phases,
            } => {
                json!({
                    "error": message,
                    "current_phase": current_phase.as_str(),
                    "allowed_phases": phase_names(allowed_phases)
                })
            }
            Self::NotOwner => {
                json!({
                    "error": "Only the team owner may change this team"
                })
            }
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<StorageError> for WebError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

impl From<ValidationErrors> for WebError {
    fn from(error: ValidationErrors) -> Self {
        Self::Validation(error)
    }
}

impl From<PipelineError> for WebError {
    fn from(error: PipelineError) -> Self {
        Self::Pipeline(error)
    }
}

impl From<PhaseViolation> for WebError {
    fn from(violation: PhaseViolation) -> Self {
        match violation {
            PhaseViolation::NoSeason => Self::ServiceUnavailable(violation.to_string()),
            PhaseViolation::Forbidden {
                current,
                allowed,
                message,
            } => Self::Forbidden {
                message,
                current_phase: current,
                allowed_phases: allowed,
            },
        }
    }
}

pub type ApiResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn phase_rejection_carries_phase_detail() {
        let err = WebError::from(PhaseViolation::Forbidden {
            current: SeasonPhase::Active,
            allowed: vec![SeasonPhase::Registration],
            message: SeasonPhase::Active.rejection_message().to_string(),
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["current_phase"], "active");
        assert_eq!(body["allowed_phases"], json!(["registration"]));
        assert_eq!(body["error"], "The season is underway; roster changes are locked");
    }

    #[tokio::test]
    async fn missing_season_is_service_unavailable() {
        let response = WebError::from(PhaseViolation::NoSeason).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["error"], "no season configured");
    }

    #[test]
    fn storage_errors_map_to_statuses() {
        let cases = [
            (StorageError::NotFound, StatusCode::NOT_FOUND),
            (StorageError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (StorageError::InvalidState("x".into()), StatusCode::CONFLICT),
            (StorageError::Conflict("x".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(WebError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn running_job_is_a_conflict() {
        let err = WebError::from(PipelineError::AlreadyRunning(crate::jobs::JobName::UpdateStats));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
