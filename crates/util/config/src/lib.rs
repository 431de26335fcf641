use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

mod store;

pub use store::{Encryption, SettingsStore, SmtpSettings, StoreError, SETTINGS_KEY_PREFIX};

static CONFIG: OnceCell<Arc<Config>> = OnceCell::const_new();

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfiguration,
    pub security: SecurityConfiguration,
    pub uploads: UploadsConfiguration,
    pub forms: FormsConfiguration,
    pub logging: LoggingConfiguration,
    pub sentry: SentryConfiguration,
}

impl Config {
    pub async fn init() -> Arc<Self> {
        CONFIG
            .get_or_init(|| async {
                let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());
                let cfg = match tokio::fs::read_to_string(&path).await {
                    Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
                    Err(_) => Self::default(),
                };
                Arc::new(cfg)
            })
            .await
            .clone()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfiguration {
    pub site_name: String,
    pub admin_email: String,
}
impl Default for GeneralConfiguration {
    fn default() -> Self {
        Self {
            site_name: "Forms Instance".into(),
            admin_email: "admin@localhost".into(),
        }
    }
}

/// Site-wide secrets the credential codec derives its key material from.
/// Both are constant for the lifetime of the installation; leaving them
/// empty puts the codec into its encoding-only fallback mode.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SecurityConfiguration {
    pub auth_key: String,
    pub auth_salt: String,
}
impl Default for SecurityConfiguration {
    fn default() -> Self {
        Self {
            auth_key: String::new(),
            auth_salt: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UploadsConfiguration {
    /// Local filesystem root that uploaded files live under.
    pub root: String,
    /// Path marker separating the public URL prefix from the upload-relative
    /// part, e.g. `https://host/media/form-uploads/3/x.pdf` with marker
    /// `/form-uploads/` maps to `<root>3/x.pdf`.
    pub url_marker: String,
}
impl Default for UploadsConfiguration {
    fn default() -> Self {
        Self {
            root: "uploads/form-uploads/".into(),
            url_marker: "/form-uploads/".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FormsConfiguration {
    /// Path to the forms registry file exported by the host platform.
    pub registry_path: String,
    /// Minimum host platform version this service activates against.
    pub min_platform_version: String,
}
impl Default for FormsConfiguration {
    fn default() -> Self {
        Self {
            registry_path: "forms.json".into(),
            min_platform_version: "2.5".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfiguration {
    /// Flat debug log the send path appends to when a form enables debug.
    pub debug_log: String,
    /// Where the per-form settings records are persisted.
    pub settings_path: String,
}
impl Default for LoggingConfiguration {
    fn default() -> Self {
        Self {
            debug_log: "smtp-notifier.log".into(),
            settings_path: "smtp-settings.json".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SentryConfiguration {
    pub enabled: bool,
    pub endpoint: String,
    pub trace_sample_rate: f32,
    pub environment: Option<String>,
}
impl Default for SentryConfiguration {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            trace_sample_rate: 1.0,
            environment: None,
        }
    }
}
