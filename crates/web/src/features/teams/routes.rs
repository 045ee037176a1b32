use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use storage::services::season_phase::{ENTRY_PHASES, ROSTER_EDIT_PHASES};

use super::handlers::{
    create_team, delete_team, get_team, get_team_score, list_my_teams, update_entry_status,
    update_payment_status, update_team,
};
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::middleware::season::{CurrentSeasonSource, PhaseGate, attach_season, require_phase};
use crate::state::AppState;

pub fn routes(seasons: Arc<dyn CurrentSeasonSource>, api_keys: ApiKeys) -> Router<AppState> {
    let roster_edits = Router::new()
        .route("/", post(create_team))
        .route("/:team_id", put(update_team).delete(delete_team))
        .route_layer(middleware::from_fn_with_state(
            PhaseGate::new(seasons.clone(), ROSTER_EDIT_PHASES),
            require_phase,
        ));

    let entries = Router::new()
        .route("/:team_id/entry", put(update_entry_status))
        .route_layer(middleware::from_fn_with_state(
            PhaseGate::new(seasons.clone(), ENTRY_PHASES),
            require_phase,
        ));

    let payments = Router::new()
        .route("/:team_id/payment", put(update_payment_status))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth));

    let owner_views = Router::new()
        .route("/mine", get(list_my_teams))
        .route_layer(middleware::from_fn_with_state(seasons, attach_season));

    Router::new()
        .route("/:team_id", get(get_team))
        .route("/:team_id/score", get(get_team_score))
        .merge(owner_views)
        .merge(roster_edits)
        .merge(entries)
        .merge(payments)
}
