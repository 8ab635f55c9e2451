//! Rate limiting middleware using token bucket algorithm

use crate::AppState;
use answerforge_common::errors::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Create a new rate limiter; `None` when the rate is zero
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Option<Arc<GlobalRateLimiter>> {
    let rate = NonZeroU32::new(requests_per_second)?;
    let burst = NonZeroU32::new(burst).unwrap_or(rate);

    Some(Arc::new(RateLimiter::direct(Quota::per_second(rate).allow_burst(burst))))
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(limiter) = &state.limiter else {
        return next.run(request).await;
    };

    match limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            AppError::RateLimited {
                limit: state.config.rate_limit.requests_per_second,
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use crate::create_router;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = create_rate_limiter(100, 200).unwrap();
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_zero_rate_disables_limiter() {
        assert!(create_rate_limiter(0, 10).is_none());
    }

    #[tokio::test]
    async fn test_exhausted_bucket_returns_429() {
        let mut config = test_config();
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 1;
        let app = create_router(state_with(config, Vec::new()));

        let first = send(app.clone(), post_json("/v1/ask", json!({"question": "fees"}))).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = send(app.clone(), post_json("/v1/ask", json!({"question": "fees"}))).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_json(second).await;
        assert_eq!(body["error"]["code"], "RATE_LIMITED");

        // Health checks are not rate limited.
        let health = send(
            app,
            axum::http::Request::builder()
                .uri("/health")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(health.status(), StatusCode::OK);
    }
}
