use std::sync::Arc;

use axum::extract::FromRef;
use storage::Database;

use crate::cache::{EtagGeneration, QueryCache};
use crate::jobs::RecalculationPipeline;
use crate::jobs::pipeline::CacheInvalidator;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub queries: QueryCache,
    pub etags: EtagGeneration,
    pub pipeline: Arc<RecalculationPipeline>,
    /// Same invalidation the pipeline runs after a rebuild.
    pub read_caches: Arc<dyn CacheInvalidator>,
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for QueryCache {
    fn from_ref(state: &AppState) -> Self {
        state.queries.clone()
    }
}
