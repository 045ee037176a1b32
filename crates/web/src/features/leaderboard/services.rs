use sqlx::PgPool;
use storage::{
    dto::leaderboard::LeaderboardResponse,
    error::Result,
    models::LeaderboardScope,
    services::leaderboard::{get_monthly_leaderboard, get_overall_leaderboard},
};
use tracing::debug;

use crate::cache::QueryCache;

pub const CACHE_PREFIX: &str = "leaderboard:";

/// Keys embed the ETag generation the request started under, so a read that
/// races an invalidation can only populate a key no later request asks for.
pub fn cache_key(generation: u64, season_year: i32, scope: LeaderboardScope) -> String {
    format!("{CACHE_PREFIX}{generation}:{season_year}:{scope}")
}

/// Stored snapshot for `(season_year, scope)`, served from the query cache
/// when possible.
pub async fn get_leaderboard(
    pool: &PgPool,
    cache: &QueryCache,
    generation: u64,
    season_year: i32,
    scope: LeaderboardScope,
) -> Result<LeaderboardResponse> {
    let key = cache_key(generation, season_year, scope);
    if let Some(hit) = cache.get::<LeaderboardResponse>(&key).await {
        debug!(key, "Leaderboard served from cache");
        return Ok(hit);
    }

    let rows = match scope {
        LeaderboardScope::Overall => get_overall_leaderboard(pool, season_year).await?,
        LeaderboardScope::Monthly(month) => {
            get_monthly_leaderboard(pool, season_year, month).await?
        }
    };

    let response = LeaderboardResponse::new(season_year, scope, rows);
    cache.set(key, &response).await;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::EtagGeneration;

    #[test]
    fn keys_are_distinct_per_scope_and_generation() {
        assert_eq!(
            cache_key(0, 2025, LeaderboardScope::Overall),
            "leaderboard:0:2025:overall"
        );
        assert_eq!(
            cache_key(3, 2025, LeaderboardScope::Monthly(6)),
            "leaderboard:3:2025:monthly:06"
        );
        assert_ne!(
            cache_key(0, 2025, LeaderboardScope::Overall),
            cache_key(1, 2025, LeaderboardScope::Overall)
        );
        assert!(cache_key(7, 2025, LeaderboardScope::Overall).starts_with(CACHE_PREFIX));
    }

    #[tokio::test]
    async fn late_write_from_before_invalidation_is_never_served() {
        let etags = EtagGeneration::new();
        let cache = QueryCache::new(Duration::from_secs(300));

        // A read starts, then a rebuild commits and invalidates before it stores.
        let started_under = etags.current();
        etags.bump();
        cache.invalidate_all().await;
        cache
            .set(cache_key(started_under, 2025, LeaderboardScope::Overall), &"stale")
            .await;

        let key = cache_key(etags.current(), 2025, LeaderboardScope::Overall);
        assert_eq!(cache.get::<String>(&key).await, None);
    }
}
