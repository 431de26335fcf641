//! Administrative service entry point using Axum.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{bail, Result};
use axum::{middleware::from_fn, serve};
use config::{Config, SettingsStore};
use notifier::{version_at_least, FormsRegistry, JsonFormsRegistry};
use sentry_tower::{NewSentryLayer, SentryHttpLayer};
use tokio::{net::TcpListener, signal};
use tower::limit::ConcurrencyLimitLayer;
use util::{CredentialCodec, DebugLog};

mod middleware;
mod routes;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SettingsStore>,
    pub codec: Arc<CredentialCodec>,
    pub debug_log: Arc<DebugLog>,
    pub registry: Arc<dyn FormsRegistry>,
}

/// Primary server structure.
pub struct NotifierServer;

impl NotifierServer {
    /// Initialise configuration, the settings store, the forms registry,
    /// sentry and HTTP routes.
    pub async fn start() -> Result<()> {
        // Load configuration file
        let config = Config::init().await;

        // Activation gate: refuse to run without the forms platform export,
        // or against a platform older than we support.
        let registry = match JsonFormsRegistry::load(config.forms.registry_path.as_str()).await {
            Ok(registry) => registry,
            Err(e) => bail!("cannot activate: forms platform registry unavailable ({e})"),
        };
        let version = registry.platform_version().await;
        if !version_at_least(&version, &config.forms.min_platform_version) {
            bail!(
                "cannot activate: platform version {version} is below required {}",
                config.forms.min_platform_version
            );
        }
        tracing::info!(%version, forms = registry.forms().await.len(), "forms registry loaded");

        // Per-form settings records and the helpers the send path shares
        let store = SettingsStore::open(config.logging.settings_path.as_str()).await?;
        let codec = CredentialCodec::from_secrets(&config.security.auth_key, &config.security.auth_salt);
        let debug_log = DebugLog::new(config.logging.debug_log.as_str());

        // Configure Sentry if enabled
        let _sentry = if config.sentry.enabled {
            let mut opts = sentry::ClientOptions::new();
            opts.traces_sample_rate = config.sentry.trace_sample_rate;
            if let Some(env) = &config.sentry.environment {
                opts.environment = Some(env.clone().into());
            }
            Some(sentry::init((config.sentry.endpoint.as_str(), opts)))
        } else {
            None
        };

        let state = AppState {
            config,
            store: Arc::new(store),
            codec: Arc::new(codec),
            debug_log: Arc::new(debug_log),
            registry: Arc::new(registry),
        };

        // Build routes and attach middleware
        let app = routes::create_router()
            .with_state(state)
            .layer(from_fn(middleware::cors))
            .layer(ConcurrencyLimitLayer::new(100))
            .layer(NewSentryLayer::new_from_top())
            .layer(SentryHttpLayer::new().enable_transaction());

        // Start HTTP server
        let addr: SocketAddr = "0.0.0.0:3000".parse().unwrap();
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "smtp notifier api listening");
        serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    NotifierServer::start().await
}
