//! Per-form SMTP settings records and the file-backed store they live in.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Prefix for the on-disk record keys, one record per form id.
pub const SETTINGS_KEY_PREFIX: &str = "smtp_settings_form_";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Connection security for the SMTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    #[default]
    None,
    Ssl,
    Starttls,
}

/// One form's SMTP configuration. An empty `host` disables the override for
/// that form entirely; the default platform mail path runs instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub encryption: Encryption,
    pub username: String,
    /// Stored ciphertext; callers run it through the credential codec.
    pub password: String,
    pub force_from: bool,
    pub from_email: String,
    pub from_name: String,
    pub reply_to: String,
    pub debug: bool,
    pub force_plaintext: bool,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            encryption: Encryption::None,
            username: String::new(),
            password: String::new(),
            force_from: false,
            from_email: String::new(),
            from_name: String::new(),
            reply_to: String::new(),
            debug: false,
            force_plaintext: false,
        }
    }
}

impl SmtpSettings {
    /// Whether this record turns the override path on.
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty()
    }
}

/// File-backed map of form id -> [`SmtpSettings`], persisted as a single
/// JSON object keyed `smtp_settings_form_<id>`. The whole map is cached in
/// memory and rewritten on every mutation; records are small and writes are
/// admin-driven.
pub struct SettingsStore {
    path: PathBuf,
    records: RwLock<HashMap<u64, SmtpSettings>>,
}

impl SettingsStore {
    /// Open the store, reading any existing records. A missing file is an
    /// empty store, not an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(content) => parse_records(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub async fn get(&self, form_id: u64) -> Option<SmtpSettings> {
        self.records.read().await.get(&form_id).cloned()
    }

    pub async fn put(&self, form_id: u64, settings: SmtpSettings) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(form_id, settings);
        self.persist(&records).await
    }

    pub async fn delete(&self, form_id: u64) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let removed = records.remove(&form_id).is_some();
        if removed {
            self.persist(&records).await?;
        }
        Ok(removed)
    }

    /// Deactivation sweep: drop the record of every listed form.
    pub async fn purge(&self, form_ids: impl IntoIterator<Item = u64>) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        let mut removed = 0;
        for id in form_ids {
            if records.remove(&id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.persist(&records).await?;
        }
        Ok(removed)
    }

    async fn persist(&self, records: &HashMap<u64, SmtpSettings>) -> Result<(), StoreError> {
        let keyed: HashMap<String, &SmtpSettings> = records
            .iter()
            .map(|(id, rec)| (format!("{SETTINGS_KEY_PREFIX}{id}"), rec))
            .collect();
        let content = serde_json::to_string_pretty(&keyed)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

fn parse_records(content: &str) -> Result<HashMap<u64, SmtpSettings>, serde_json::Error> {
    let keyed: HashMap<String, SmtpSettings> = serde_json::from_str(content)?;
    Ok(keyed
        .into_iter()
        .filter_map(|(key, rec)| {
            key.strip_prefix(SETTINGS_KEY_PREFIX)
                .and_then(|id| id.parse().ok())
                .map(|id: u64| (id, rec))
        })
        .collect())
}
