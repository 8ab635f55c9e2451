//! Question answering handler

use crate::AppState;
use answerforge_common::{
    errors::{AppError, Result},
    resolution::{ConversationMemory, Resolution},
    routing::RouteDecision,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

const QUESTION_REQUIRED: &str = "question is required";

/// Ask request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[validate(length(max = 2000))]
    pub question: Option<String>,

    /// Known panorama names for navigation routing
    #[serde(default)]
    pub pano_names: Vec<String>,

    /// Known project names for navigation routing
    #[serde(default)]
    pub project_names: Vec<String>,

    /// Conversation session carrying follow-up context
    pub session_id: Option<String>,
}

/// Ask response: a navigation decision or an answer
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AskResponse {
    Route(RouteDecision),
    Answer(Resolution),
}

#[derive(Serialize)]
struct QuestionRequired {
    answer: &'static str,
}

/// Answer a question, or route it to a panorama or project
pub async fn ask(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|rejection| AppError::Validation {
        message: rejection.body_text(),
        field: None,
    })?;

    let question = match request.question.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(QuestionRequired {
                    answer: QUESTION_REQUIRED,
                }),
            )
                .into_response());
        }
    };

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("question".to_string()),
    })?;

    // Resolve the session before routing so an unknown id is always reported.
    let session = match &request.session_id {
        Some(raw) => {
            let not_found = || AppError::SessionNotFound { id: raw.clone() };
            let id = Uuid::parse_str(raw).map_err(|_| not_found())?;
            Some(state.sessions.get(&id).await.ok_or_else(not_found)?)
        }
        None => None,
    };

    let decision = state
        .intent_router
        .route(&question, &request.pano_names, &request.project_names);
    if decision.is_routed() {
        tracing::info!(
            intent = ?decision.intent,
            target = ?decision.target,
            "Question routed"
        );
        return Ok(Json(AskResponse::Route(decision)).into_response());
    }

    let resolution = match session {
        Some(memory) => {
            // Held for the whole resolution; turns within a session run in order.
            let mut memory = memory.lock().await;
            state.resolver.resolve(&question, &mut memory).await
        }
        None => {
            let mut memory = ConversationMemory::new();
            state.resolver.resolve(&question, &mut memory).await
        }
    };

    tracing::debug!(
        session_id = ?request.session_id,
        via = resolution.via.as_str(),
        "Answer sent"
    );

    Ok(Json(AskResponse::Answer(resolution)).into_response())
}

#[cfg(test)]
mod tests {
    use crate::create_router;
    use crate::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_known_question_is_answered() {
        let app = create_router(test_state());

        let response = send(app, post_json("/v1/ask", json!({"question": "What are the school fees?"}))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["answer"], "Fees are 100 per term.");
        assert_eq!(body["via"], "semantic");
    }

    #[tokio::test]
    async fn test_unrelated_question_falls_back() {
        let app = create_router(test_state());

        let response = send(app, post_json("/v1/ask", json!({"question": "zebra quantum xylophone"}))).await;
        let body = body_json(response).await;

        // Offline arbitration leaves a weak candidate unconfirmed.
        assert_eq!(body["answer"], "Please contact the office.");
        assert_eq!(body["via"], "llm-unavailable");
    }

    #[tokio::test]
    async fn test_missing_question() {
        let app = create_router(test_state());

        for body in [json!({}), json!({"question": "   "})] {
            let response = send(app.clone(), post_json("/v1/ask", body)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await, json!({"answer": "question is required"}));
        }
    }

    #[tokio::test]
    async fn test_missing_question_leaves_session_untouched() {
        let state = state_with(
            test_config(),
            vec![
                entry("school fees", "Fees are 100 per term."),
                entry("school bus", "Buses leave at 7."),
                entry("library hours", "Open 9 to 5."),
            ],
        );
        let app = create_router(state.clone());

        let created = send(app.clone(), post_json("/v1/sessions", json!({}))).await;
        let session_id = body_json(created).await["sessionId"].as_str().unwrap().to_string();
        send(
            app.clone(),
            post_json("/v1/ask", json!({"question": "school", "sessionId": session_id})),
        )
        .await;
        let cached = state.resolver.cache().len().await;

        let blank_requests = [
            json!({"sessionId": session_id}),
            json!({"question": "  ", "sessionId": session_id}),
        ];
        for body in blank_requests {
            let response = send(app.clone(), post_json("/v1/ask", body)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await, json!({"answer": "question is required"}));
        }
        assert_eq!(state.resolver.cache().len().await, cached);

        // "school" is still the remembered question, so "fees" merges with it.
        let id = uuid::Uuid::parse_str(&session_id).unwrap();
        let memory = state.sessions.get(&id).await.unwrap();
        assert_eq!(memory.lock().await.last_question(), Some("school"));

        let follow_up = send(
            app,
            post_json("/v1/ask", json!({"question": "fees", "sessionId": session_id})),
        )
        .await;
        let body = body_json(follow_up).await;
        assert_eq!(body["answer"], "Fees are 100 per term.");
        assert_eq!(body["via"], "semantic");
    }

    #[tokio::test]
    async fn test_question_too_long() {
        let app = create_router(test_state());
        let question = "a".repeat(2001);

        let response = send(app, post_json("/v1/ask", json!({"question": question}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["field"], "question");
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let app = create_router(test_state());
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/v1/ask")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();

        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_panorama_mention_is_routed() {
        let app = create_router(test_state());

        let response = send(
            app,
            post_json(
                "/v1/ask",
                json!({
                    "question": "show me the main campus",
                    "panoNames": ["Main Campus"],
                    "projectNames": ["Campus"]
                }),
            ),
        )
        .await;

        assert_eq!(
            body_json(response).await,
            json!({"intent": "pano", "target": "Main Campus"})
        );
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = create_router(test_state());

        for id in ["not-a-uuid", "7f1c2b9e-0000-4000-8000-000000000000"] {
            let response = send(
                app.clone(),
                post_json("/v1/ask", json!({"question": "fees", "sessionId": id})),
            )
            .await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(body_json(response).await["error"]["code"], "SESSION_NOT_FOUND");
        }
    }

    #[tokio::test]
    async fn test_session_merges_short_follow_up() {
        let app = create_router(state_with(
            test_config(),
            vec![
                entry("school fees", "Fees are 100 per term."),
                entry("school bus", "Buses leave at 7."),
                entry("library hours", "Open 9 to 5."),
            ],
        ));

        let created = send(app.clone(), post_json("/v1/sessions", json!({}))).await;
        let session_id = body_json(created).await["sessionId"].as_str().unwrap().to_string();

        send(
            app.clone(),
            post_json("/v1/ask", json!({"question": "school", "sessionId": session_id})),
        )
        .await;
        let follow_up = send(
            app.clone(),
            post_json("/v1/ask", json!({"question": "fees", "sessionId": session_id})),
        )
        .await;

        let body = body_json(follow_up).await;
        assert_eq!(body["answer"], "Fees are 100 per term.");
        assert_eq!(body["via"], "semantic");
    }

    #[tokio::test]
    async fn test_requests_without_session_do_not_share_memory() {
        let app = create_router(state_with(
            test_config(),
            vec![
                entry("school fees", "Fees are 100 per term."),
                entry("library hours", "Open 9 to 5."),
            ],
        ));

        send(app.clone(), post_json("/v1/ask", json!({"question": "school"}))).await;
        let response = send(app, post_json("/v1/ask", json!({"question": "fees"}))).await;

        // Without carry-over "fees" is a single-token multi-match query.
        let body = body_json(response).await;
        assert_eq!(body["via"], "multi-match");
        assert_eq!(body["answer"], "• Fees are 100 per term.");
    }
}
