//! Weak ETags for cacheable GET responses.
//!
//! Every tag embeds a process-wide generation number. Bumping the generation
//! after a data change makes every previously issued tag stale at once.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

#[derive(Clone, Default)]
pub struct EtagGeneration {
    current: Arc<AtomicU64>,
}

impl EtagGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Invalidates every tag handed out so far. Returns the new generation.
    pub fn bump(&self) -> u64 {
        self.current.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Tag for `uri` under the current generation.
    pub fn tag_for(&self, uri: &str) -> String {
        let mut hasher = DefaultHasher::new();
        uri.hash(&mut hasher);
        format!("W/\"{}-{:x}\"", self.current(), hasher.finish())
    }
}

fn matches_any(if_none_match: &HeaderValue, tag: &str) -> bool {
    if_none_match
        .to_str()
        .map(|raw| raw.split(',').any(|candidate| {
            let candidate = candidate.trim();
            candidate == "*" || candidate == tag
        }))
        .unwrap_or(false)
}

/// Answers `304 Not Modified` when the client already holds the current tag,
/// and stamps successful GET responses with one otherwise.
pub async fn conditional_get(
    State(generation): State<EtagGeneration>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let tag = generation.tag_for(&request.uri().to_string());

    if let Some(if_none_match) = request.headers().get(header::IF_NONE_MATCH)
        && matches_any(if_none_match, &tag)
    {
        let mut response = (StatusCode::NOT_MODIFIED, Body::empty()).into_response();
        if let Ok(value) = HeaderValue::from_str(&tag) {
            response.headers_mut().insert(header::ETAG, value);
        }
        return response;
    }

    let mut response = next.run(request).await;
    if response.status() == StatusCode::OK
        && let Ok(value) = HeaderValue::from_str(&tag)
    {
        let headers = response.headers_mut();
        headers.insert(header::ETAG, value);
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt;

    fn app(generation: EtagGeneration) -> Router {
        Router::new()
            .route("/board", get(|| async { "ranked" }))
            .layer(middleware::from_fn_with_state(generation, conditional_get))
    }

    fn get_with(tag: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/board");
        if let Some(tag) = tag {
            builder = builder.header(header::IF_NONE_MATCH, tag);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn bump_changes_tags() {
        let generation = EtagGeneration::new();
        let before = generation.tag_for("/board");
        assert_eq!(generation.bump(), 1);
        assert_ne!(before, generation.tag_for("/board"));
        assert_ne!(generation.tag_for("/board"), generation.tag_for("/other"));
    }

    #[tokio::test]
    async fn repeat_request_is_not_modified() {
        let generation = EtagGeneration::new();

        let first = app(generation.clone()).oneshot(get_with(None)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let tag = first.headers()[header::ETAG].to_str().unwrap().to_string();

        let second = app(generation.clone()).oneshot(get_with(Some(&tag))).await.unwrap();
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn bumped_generation_serves_fresh_body() {
        let generation = EtagGeneration::new();
        let tag = generation.tag_for("/board");
        generation.bump();

        let response = app(generation).oneshot(get_with(Some(&tag))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
