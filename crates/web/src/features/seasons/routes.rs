use axum::{Router, routing::get};

use super::handlers::{get_current_season, list_seasons};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_seasons))
        .route("/current", get(get_current_season))
}
