//! Administrative handlers

use crate::AppState;
use answerforge_common::errors::{AppError, Result};
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct ReloadResponse {
    pub entries: usize,
}

/// Re-read the knowledge store and swap it in atomically
///
/// On failure the previous entry set stays live.
pub async fn reload_knowledge(State(state): State<AppState>) -> Result<Json<ReloadResponse>> {
    let knowledge = Arc::clone(&state.knowledge);

    let entries = tokio::task::spawn_blocking(move || knowledge.reload())
        .await
        .map_err(|e| AppError::Internal {
            message: format!("Knowledge reload task failed: {}", e),
        })??;

    Ok(Json(ReloadResponse { entries }))
}
