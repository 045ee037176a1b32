use std::sync::Arc;

use axum::{Router, middleware, routing::get};

use super::handlers::{get_monthly, get_overall};
use crate::cache::etag::{EtagGeneration, conditional_get};
use crate::middleware::season::{CurrentSeasonSource, attach_season};
use crate::state::AppState;

pub fn routes(etags: EtagGeneration, seasons: Arc<dyn CurrentSeasonSource>) -> Router<AppState> {
    Router::new()
        .route("/overall", get(get_overall))
        .route("/monthly/:month", get(get_monthly))
        .layer(middleware::from_fn_with_state(seasons, attach_season))
        .layer(middleware::from_fn_with_state(etags, conditional_get))
}
