//! Health check handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub knowledge: KnowledgeCheck,
    pub embedding_cache: CacheCheck,
}

#[derive(Serialize)]
pub struct KnowledgeCheck {
    pub status: String,
    pub entries: usize,
}

#[derive(Serialize)]
pub struct CacheCheck {
    pub entries: usize,
}

/// Liveness check; healthy whenever the server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: answerforge_common::VERSION,
    })
}

/// Readiness check; ready once the knowledge base holds entries
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let entries = state.knowledge.len();
    let ready = entries > 0;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            checks: HealthChecks {
                knowledge: KnowledgeCheck {
                    status: if ready { "up" } else { "empty" }.to_string(),
                    entries,
                },
                embedding_cache: CacheCheck {
                    entries: state.resolver.cache().len().await,
                },
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use crate::create_router;
    use crate::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(create_router(test_state()), get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reports_entries() {
        let response = send(create_router(test_state()), get("/ready")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["knowledge"]["entries"], 2);
    }

    #[tokio::test]
    async fn test_not_ready_when_empty() {
        let app = create_router(state_with(test_config(), Vec::new()));
        let response = send(app, get("/ready")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["status"], "not_ready");
    }
}
