use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PingResponse {
    ping: &'static str,
    site_name: String,
    platform_version: String,
}

async fn handler(State(state): State<AppState>) -> Json<PingResponse> {
    Json(PingResponse {
        ping: "pong!",
        site_name: state.config.general.site_name.clone(),
        platform_version: state.registry.platform_version().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(handler))
}
