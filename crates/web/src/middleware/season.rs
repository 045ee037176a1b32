//! Season phase gating for routes.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use storage::Database;
use storage::models::{SeasonConfig, SeasonPhase};
use storage::repository::season::SeasonRepository;
use storage::services::season_phase::check_phase;

use crate::error::WebError;

/// The season a guarded request runs against. Read-only for handlers.
#[derive(Debug, Clone)]
pub struct CurrentSeason(pub Arc<SeasonConfig>);

#[async_trait]
pub trait CurrentSeasonSource: Send + Sync {
    async fn current_season(&self) -> storage::error::Result<Option<SeasonConfig>>;
}

#[async_trait]
impl CurrentSeasonSource for Database {
    async fn current_season(&self) -> storage::error::Result<Option<SeasonConfig>> {
        SeasonRepository::new(self.pool()).current().await
    }
}

/// State for [`require_phase`]: where to look the season up and which
/// phases let the request through.
#[derive(Clone)]
pub struct PhaseGate {
    source: Arc<dyn CurrentSeasonSource>,
    allowed: &'static [SeasonPhase],
}

impl PhaseGate {
    pub fn new(source: Arc<dyn CurrentSeasonSource>, allowed: &'static [SeasonPhase]) -> Self {
        Self { source, allowed }
    }
}

/// Rejects the request unless the current season is in an allowed phase.
/// Lookup failures are errors, never a pass.
pub async fn require_phase(
    State(gate): State<PhaseGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let current = gate.source.current_season().await?;
    let season = check_phase(current, gate.allowed)?;

    request
        .extensions_mut()
        .insert(CurrentSeason(Arc::new(season)));
    Ok(next.run(request).await)
}

/// Attaches the current season when there is one; never blocks the request.
pub async fn attach_season(
    State(source): State<Arc<dyn CurrentSeasonSource>>,
    mut request: Request,
    next: Next,
) -> Response {
    match source.current_season().await {
        Ok(Some(season)) => {
            request
                .extensions_mut()
                .insert(CurrentSeason(Arc::new(season)));
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Current season lookup failed: {}", e),
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Extension, Router,
        body::{Body, to_bytes},
        http::StatusCode,
        middleware,
        routing::post,
    };
    use chrono::NaiveDate;
    use storage::error::StorageError;
    use storage::services::season_phase::ROSTER_EDIT_PHASES;
    use tower::ServiceExt;

    enum Fake {
        Season(SeasonPhase),
        Missing,
        Broken,
    }

    #[async_trait]
    impl CurrentSeasonSource for Fake {
        async fn current_season(&self) -> storage::error::Result<Option<SeasonConfig>> {
            let phase = match self {
                Fake::Season(phase) => *phase,
                Fake::Missing => return Ok(None),
                Fake::Broken => return Err(StorageError::InvalidState("db down".to_string())),
            };
            let now = NaiveDate::from_ymd_opt(2026, 2, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            Ok(Some(SeasonConfig {
                season_year: 2026,
                phase,
                registration_opens_on: None,
                registration_closes_on: None,
                season_starts_on: None,
                season_ends_on: None,
                is_current_season: true,
                created_at: now,
                updated_at: now,
            }))
        }
    }

    async fn echo_season(Extension(CurrentSeason(season)): Extension<CurrentSeason>) -> String {
        season.season_year.to_string()
    }

    async fn optional_season(season: Option<Extension<CurrentSeason>>) -> String {
        season
            .map(|Extension(CurrentSeason(s))| s.phase.to_string())
            .unwrap_or_else(|| "none".to_string())
    }

    async fn guarded(source: Fake) -> (StatusCode, serde_json::Value) {
        let gate = PhaseGate::new(Arc::new(source), ROSTER_EDIT_PHASES);
        let app = Router::new()
            .route("/teams", post(echo_season))
            .route_layer(middleware::from_fn_with_state(gate, require_phase));

        let response = app
            .oneshot(Request::builder().method("POST").uri("/teams").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ));
        (status, body)
    }

    #[tokio::test]
    async fn allowed_phase_passes_season_through() {
        let (status, body) = guarded(Fake::Season(SeasonPhase::Registration)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!(2026));
    }

    #[tokio::test]
    async fn each_disallowed_phase_is_forbidden_with_its_message() {
        for phase in [SeasonPhase::OffSeason, SeasonPhase::Active, SeasonPhase::Completed] {
            let (status, body) = guarded(Fake::Season(phase)).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["current_phase"], phase.as_str());
            assert_eq!(body["allowed_phases"], serde_json::json!(["registration"]));
            assert_eq!(body["error"], phase.rejection_message());
        }
    }

    #[tokio::test]
    async fn no_season_is_unavailable() {
        let (status, body) = guarded(Fake::Missing).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "no season configured");
    }

    #[tokio::test]
    async fn lookup_failure_does_not_bypass_the_guard() {
        let (status, _) = guarded(Fake::Broken).await;
        assert_ne!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn attach_season_never_blocks() {
        for (source, expected) in [
            (Fake::Season(SeasonPhase::Active), "active"),
            (Fake::Missing, "none"),
            (Fake::Broken, "none"),
        ] {
            let source: Arc<dyn CurrentSeasonSource> = Arc::new(source);
            let app = Router::new()
                .route("/board", axum::routing::get(optional_season))
                .layer(middleware::from_fn_with_state(source, attach_season));

            let response = app
                .oneshot(Request::builder().uri("/board").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(bytes, expected.as_bytes());
        }
    }
}
