use axum::Router;

use crate::AppState;

pub mod admin;
pub mod notifications;
pub mod ping;
pub mod settings;

/// Combine all API routes into a single router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .nest("/ping", ping::router())
        .nest("/smtp", smtp_test::router())
        .nest("/forms", settings::router().merge(notifications::router()))
        .nest("/admin", admin::router())
}
