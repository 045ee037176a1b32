use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use importer::{MlbClient, MlbDailyIngestor};
use storage::Database;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod cache;
mod config;
mod error;
mod features;
mod jobs;
mod middleware;
mod state;

use cache::{EtagGeneration, QueryCache};
use config::Config;
use jobs::RecalculationPipeline;
use jobs::alert::{AdminAlerter, TracingAlerter, WebhookAlerter};
use jobs::lock::JobLocks;
use jobs::pipeline::{
    CacheInvalidator, PgJobRecorder, PgLeaderboardRebuilder, ReadCacheInvalidator,
};
use jobs::retry::RetryPolicy;
use middleware::auth::ApiKeys;
use middleware::season::CurrentSeasonSource;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::leaderboard::handlers::get_overall,
        features::leaderboard::handlers::get_monthly,
        features::teams::handlers::create_team,
        features::teams::handlers::update_team,
        features::teams::handlers::delete_team,
        features::teams::handlers::update_entry_status,
        features::teams::handlers::update_payment_status,
        features::teams::handlers::get_team,
        features::teams::handlers::list_my_teams,
        features::teams::handlers::get_team_score,
        features::seasons::handlers::get_current_season,
        features::seasons::handlers::list_seasons,
        features::admin::handlers::upsert_season,
        features::admin::handlers::set_current_season,
        features::admin::handlers::advance_season_phase,
        features::admin::handlers::override_season_phase,
        features::admin::handlers::lock_teams,
        features::admin::handlers::trigger_job,
        features::admin::handlers::list_job_executions,
    ),
    components(
        schemas(
            storage::dto::leaderboard::LeaderboardResponse,
            storage::dto::leaderboard::LeaderboardEntryResponse,
            storage::dto::team::CreateTeamRequest,
            storage::dto::team::UpdateTeamRequest,
            storage::dto::team::UpdatePaymentStatusRequest,
            storage::dto::team::UpdateEntryStatusRequest,
            storage::dto::team::TeamResponse,
            storage::dto::team::TeamScoreResponse,
            storage::dto::team::LockTeamsResponse,
            storage::dto::season::UpsertSeasonRequest,
            storage::dto::season::OverridePhaseRequest,
            storage::dto::job::JobExecutionResponse,
            storage::dto::job::TriggerJobRequest,
            storage::dto::job::JobRunResponse,
            storage::dto::common::PaginationMeta,
            storage::models::SeasonConfig,
            storage::models::SeasonPhase,
            storage::models::PaymentStatus,
            storage::models::EntryStatus,
            jobs::JobName,
        )
    ),
    tags(
        (name = "leaderboards", description = "Public leaderboard endpoints"),
        (name = "teams", description = "Team registration and scores"),
        (name = "seasons", description = "Public season endpoints"),
        (name = "admin", description = "Operator endpoints"),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("API Key")
                        .build(),
                ),
            )
        }
    }
}

/// Every `/api` route, before state is attached.
fn api_routes(
    etags: EtagGeneration,
    seasons: Arc<dyn CurrentSeasonSource>,
    api_keys: ApiKeys,
) -> Router<AppState> {
    Router::new()
        .nest(
            "/leaderboards",
            features::leaderboard::routes(etags, seasons.clone()),
        )
        .nest(
            "/teams",
            features::teams::routes(seasons.clone(), api_keys.clone()),
        )
        .nest("/seasons", features::seasons::routes())
        .nest("/admin", features::admin::routes(seasons, api_keys))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting home run contest API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!(
        "Connecting to database at: {}",
        config
            .database_url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    let api_keys = ApiKeys::from_comma_separated(&config.api_keys);
    if api_keys.is_empty() {
        tracing::warn!("API_KEYS is empty; admin endpoints will reject every request");
    }

    let queries = QueryCache::new(config.query_cache_ttl);
    let etags = EtagGeneration::new();

    let client = MlbClient::new(config.mlb_api_base_url.clone(), config.feed_timeout)
        .context("Failed to build stats feed client")?;

    let alerter: Arc<dyn AdminAlerter> = match &config.alert_webhook_url {
        Some(url) => {
            tracing::info!("Job failure alerts go to the configured webhook");
            Arc::new(WebhookAlerter::new(url.clone()).context("Failed to build alert client")?)
        }
        None => Arc::new(TracingAlerter),
    };

    let read_caches: Arc<dyn CacheInvalidator> =
        Arc::new(ReadCacheInvalidator::new(etags.clone(), queries.clone()));

    let pipeline = RecalculationPipeline::new(
        JobLocks::new(),
        RetryPolicy::new(config.ingest_max_attempts, config.ingest_base_delay),
        config.feed_utc_offset_hours,
        Arc::new(MlbDailyIngestor::new(client, db.pool().clone())),
        Arc::new(PgLeaderboardRebuilder::new(db.pool().clone())),
        read_caches.clone(),
        Arc::new(PgJobRecorder::new(db.pool().clone())),
        alerter,
    );

    let seasons: Arc<dyn CurrentSeasonSource> = Arc::new(db.clone());

    let state = AppState {
        db,
        queries,
        etags: etags.clone(),
        pipeline: Arc::new(pipeline),
        read_caches,
    };

    let api = api_routes(etags, seasons, api_keys);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    let app = Router::new()
        .nest("/api", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(state);

    let bind_address = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui/",
        bind_address
    );

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
