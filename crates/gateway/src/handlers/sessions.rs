//! Session management handlers

use crate::AppState;
use answerforge_common::errors::{AppError, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

/// Create session response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub expires_at: String,
}

/// Create a new conversation session
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let handle = state.sessions.create().await;

    tracing::info!(session_id = %handle.id, "Session created");

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: handle.id,
            expires_at: handle.expires_at.to_rfc3339(),
        }),
    )
}

/// Discard a session and its conversation memory
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode> {
    let not_found = || AppError::SessionNotFound {
        id: session_id.clone(),
    };

    let id = Uuid::parse_str(&session_id).map_err(|_| not_found())?;
    if !state.sessions.remove(&id).await {
        return Err(not_found());
    }

    tracing::info!(session_id = %id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::create_router;
    use crate::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = create_router(test_state());

        let created = send(app.clone(), post_json("/v1/sessions", json!({}))).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let body = body_json(created).await;
        let id = body["sessionId"].as_str().unwrap().to_string();
        assert!(body["expiresAt"].is_string());

        let deleted = send(app.clone(), delete(&format!("/v1/sessions/{}", id))).await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let again = send(app.clone(), delete(&format!("/v1/sessions/{}", id))).await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);

        // A deleted session can no longer carry questions.
        let ask = send(app, post_json("/v1/ask", json!({"question": "fees", "sessionId": id}))).await;
        assert_eq!(ask.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_malformed_id() {
        let app = create_router(test_state());
        let response = send(app, delete("/v1/sessions/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "SESSION_NOT_FOUND");
    }
}
