//! Per-form SMTP settings records: the persistence side of the settings
//! panel. Passwords are encrypted before they hit the store and decrypted
//! on read, the same way the panel displays them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use config::SmtpSettings;

use crate::AppState;

async fn get_settings(
    State(state): State<AppState>,
    Path(form_id): Path<u64>,
) -> Result<Json<SmtpSettings>, StatusCode> {
    match state.store.get(form_id).await {
        Some(mut settings) => {
            settings.password = state.codec.decrypt(&settings.password).unwrap_or_default();
            Ok(Json(settings))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn put_settings(
    State(state): State<AppState>,
    Path(form_id): Path<u64>,
    Json(mut settings): Json<SmtpSettings>,
) -> Result<StatusCode, StatusCode> {
    settings.password = state.codec.encrypt(&settings.password);
    state.store.put(form_id, settings).await.map_err(|e| {
        tracing::error!(form_id, error = %e, "failed to save settings");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_settings(
    State(state): State<AppState>,
    Path(form_id): Path<u64>,
) -> Result<StatusCode, StatusCode> {
    let removed = state.store.delete(form_id).await.map_err(|e| {
        tracing::error!(form_id, error = %e, "failed to delete settings");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/:form_id/smtp",
        get(get_settings).put(put_settings).delete(delete_settings),
    )
}
