use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use storage::{models::SeasonConfig, repository::season::SeasonRepository};

use crate::error::WebError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/seasons/current",
    responses(
        (status = 200, description = "The season the contest is running", body = SeasonConfig),
        (status = 503, description = "No season configured")
    ),
    tag = "seasons"
)]
pub async fn get_current_season(State(state): State<AppState>) -> Result<Response, WebError> {
    let season = SeasonRepository::new(state.db.pool())
        .current()
        .await?
        .ok_or_else(|| WebError::ServiceUnavailable("no season configured".to_string()))?;

    Ok(Json(season).into_response())
}

#[utoipa::path(
    get,
    path = "/api/seasons",
    responses(
        (status = 200, description = "All configured seasons, newest first", body = Vec<SeasonConfig>)
    ),
    tag = "seasons"
)]
pub async fn list_seasons(State(state): State<AppState>) -> Result<Response, WebError> {
    let seasons = SeasonRepository::new(state.db.pool()).list().await?;

    Ok(Json(seasons).into_response())
}
