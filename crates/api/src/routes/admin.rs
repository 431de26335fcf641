//! Deactivation housekeeping: sweep every form known to the platform and
//! drop its settings record.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeactivateResponse {
    removed: usize,
}

async fn deactivate(State(state): State<AppState>) -> Result<Json<DeactivateResponse>, StatusCode> {
    let forms = state.registry.forms().await;
    let removed = state
        .store
        .purge(forms.iter().map(|f| f.id))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "deactivation sweep failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    tracing::info!(removed, "deactivation sweep completed");
    Ok(Json(DeactivateResponse { removed }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/deactivate", post(deactivate))
}
