use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use storage::services::season_phase::LOCK_PHASES;

use super::handlers::{
    advance_season_phase, list_job_executions, lock_teams, override_season_phase,
    set_current_season, trigger_job, upsert_season,
};
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::middleware::season::{CurrentSeasonSource, PhaseGate, require_phase};
use crate::state::AppState;

pub fn routes(seasons: Arc<dyn CurrentSeasonSource>, api_keys: ApiKeys) -> Router<AppState> {
    let locking = Router::new()
        .route("/teams/lock", post(lock_teams))
        .route_layer(middleware::from_fn_with_state(
            PhaseGate::new(seasons, LOCK_PHASES),
            require_phase,
        ));

    Router::new()
        .route("/seasons", put(upsert_season))
        .route("/seasons/:season_year/current", post(set_current_season))
        .route("/seasons/:season_year/advance", post(advance_season_phase))
        .route("/seasons/:season_year/phase", put(override_season_phase))
        .route("/jobs", get(list_job_executions))
        .route("/jobs/:job_name", post(trigger_job))
        .merge(locking)
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use importer::{MlbClient, MlbDailyIngestor};
    use sqlx::PgPool;
    use storage::Database;
    use storage::repository::season::{SeasonDates, SeasonRepository};
    use tower::ServiceExt;

    use super::*;
    use crate::cache::{EtagGeneration, QueryCache};
    use crate::jobs::RecalculationPipeline;
    use crate::jobs::alert::TracingAlerter;
    use crate::jobs::lock::JobLocks;
    use crate::jobs::pipeline::{
        CacheInvalidator, PgJobRecorder, PgLeaderboardRebuilder, ReadCacheInvalidator,
    };
    use crate::jobs::retry::RetryPolicy;

    const KEY: &str = "admin-test-key";

    fn app(pool: PgPool) -> Router {
        let db = Database::from_pool(pool.clone());
        let etags = EtagGeneration::new();
        let queries = QueryCache::new(Duration::from_secs(300));
        let read_caches: Arc<dyn CacheInvalidator> =
            Arc::new(ReadCacheInvalidator::new(etags.clone(), queries.clone()));

        // The feed is never called by these requests.
        let client = MlbClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let pipeline = RecalculationPipeline::new(
            JobLocks::new(),
            RetryPolicy::default(),
            -4,
            Arc::new(MlbDailyIngestor::new(client, pool.clone())),
            Arc::new(PgLeaderboardRebuilder::new(pool.clone())),
            read_caches.clone(),
            Arc::new(PgJobRecorder::new(pool)),
            Arc::new(TracingAlerter),
        );

        let seasons: Arc<dyn CurrentSeasonSource> = Arc::new(db.clone());
        let state = AppState {
            db,
            queries,
            etags: etags.clone(),
            pipeline: Arc::new(pipeline),
            read_caches,
        };

        Router::new()
            .nest(
                "/api",
                crate::api_routes(etags, seasons, ApiKeys::from_comma_separated(KEY)),
            )
            .with_state(state)
    }

    async fn season_of(response: axum::response::Response) -> i64 {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["season_year"].as_i64().unwrap()
    }

    #[sqlx::test(migrations = "../storage/migrations")]
    #[ignore]
    async fn switching_current_season_invalidates_issued_etags(pool: PgPool) {
        let repo = SeasonRepository::new(&pool);
        repo.upsert(2024, &SeasonDates::default()).await.unwrap();
        repo.upsert(2025, &SeasonDates::default()).await.unwrap();
        repo.set_current(2024).await.unwrap();

        let app = app(pool);

        let first = app
            .clone()
            .oneshot(
                Request::get("/api/leaderboards/overall")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let tag = first.headers()[header::ETAG].clone();
        assert_eq!(season_of(first).await, 2024);

        let switched = app
            .clone()
            .oneshot(
                Request::post("/api/admin/seasons/2025/current")
                    .header(header::AUTHORIZATION, format!("Bearer {KEY}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(switched.status(), StatusCode::OK);

        let revalidated = app
            .oneshot(
                Request::get("/api/leaderboards/overall")
                    .header(header::IF_NONE_MATCH, tag.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(revalidated.status(), StatusCode::OK);
        assert_ne!(revalidated.headers()[header::ETAG], tag);
        assert_eq!(season_of(revalidated).await, 2025);
    }
}
