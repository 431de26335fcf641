//! The platform's pre-send extension point over HTTP: the notification
//! pipeline posts the entry, the notification template and the message
//! format here before running its own mailer, and honors the returned
//! abort flag.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use notifier::{override_send, Disposition, Entry, HookAction, MessageFormat, Notification, ResolveContext};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    entry: Entry,
    notification: Notification,
    message_format: Option<MessageFormat>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    /// True when the platform must suppress its own default send.
    abort_default: bool,
    disposition: String,
}

async fn handler(
    State(state): State<AppState>,
    Path(form_id): Path<u64>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, StatusCode> {
    let form = state
        .registry
        .form(form_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let message_format = request
        .message_format
        .unwrap_or(request.notification.message_format);

    let ctx = ResolveContext {
        site_name: &state.config.general.site_name,
        admin_email: &state.config.general.admin_email,
        uploads: &state.config.uploads,
        expander: None,
    };

    let action = override_send(
        &state.store,
        &state.codec,
        &state.debug_log,
        &ctx,
        &form,
        &request.entry,
        &request.notification,
        message_format,
    )
    .await;

    let response = match action {
        HookAction::UseDefault => SendResponse {
            abort_default: false,
            disposition: "default".to_string(),
        },
        HookAction::Abort(outcome) => SendResponse {
            abort_default: outcome.aborted,
            disposition: match outcome.disposition {
                Disposition::Sent => "sent".to_string(),
                Disposition::Skipped(reason) => format!("skipped: {reason}"),
                Disposition::Failed(error) => format!("failed: {error}"),
            },
        },
    };

    Ok(Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/:form_id/notifications/send", post(handler))
}
