//! The host platform's surface as this service sees it: forms, submitted
//! entries, notification templates, and the registry they are read from.
//!
//! Nothing here subclasses or re-implements the platform; the registry is an
//! injected interface and the types mirror what the platform exports.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Form {
    pub id: u64,
    pub title: String,
    pub fields: Vec<FormField>,
}

impl Form {
    pub fn field(&self, id: u64) -> Option<&FormField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn fields_of_type(&self, field_type: FieldType) -> impl Iterator<Item = &FormField> {
        self.fields.iter().filter(move |f| f.field_type == field_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormField {
    pub id: u64,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Multi-file upload fields store their entry value as a JSON array.
    pub multiple_files: bool,
    /// Visibility is computed by the platform (admin-hidden or conditional
    /// logic) before the form reaches us; we only honor the flag.
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Number,
    Select,
    Fileupload,
    Hidden,
}

/// One submitted instance of a form. Values are keyed by field id; composite
/// input keys like `"4.1"` stay string-keyed on purpose.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Entry {
    pub id: u64,
    pub form_id: u64,
    pub values: HashMap<String, String>,
}

impl Entry {
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn field_value(&self, field_id: u64) -> Option<&str> {
        self.value(&field_id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToType {
    #[default]
    Email,
    Field,
    Routing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    #[default]
    Html,
    Text,
    Multipart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RuleOperator {
    #[default]
    #[serde(rename = "is")]
    Is,
    #[serde(rename = "isnot")]
    IsNot,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "starts_with")]
    StartsWith,
    #[serde(rename = "ends_with")]
    EndsWith,
}

/// One routing rule: when the entry value of `field_id` matches, `email`
/// joins the recipient list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingRule {
    pub field_id: u64,
    pub operator: RuleOperator,
    pub value: String,
    pub email: String,
}

/// A notification template attached to a form, evaluated per submission.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Notification {
    pub id: String,
    pub name: String,
    pub to_type: ToType,
    pub to: String,
    pub to_field: String,
    pub routing: Vec<RoutingRule>,
    pub from: String,
    pub from_name: String,
    pub cc: String,
    pub bcc: String,
    pub reply_to: String,
    pub subject: String,
    pub message: String,
    pub message_format: MessageFormat,
    pub disable_autoformat: bool,
    pub enable_attachments: bool,
    /// Paths seeded on the template itself, before upload fields are added.
    pub attachments: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("forms registry unavailable: {0}")]
    Io(#[from] std::io::Error),

    #[error("forms registry parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The injected host-platform interface. The api binary wires in the
/// JSON-file implementation; tests construct forms inline.
#[async_trait]
pub trait FormsRegistry: Send + Sync {
    async fn platform_version(&self) -> String;
    async fn forms(&self) -> Vec<Form>;
    async fn form(&self, id: u64) -> Option<Form>;
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RegistryFile {
    platform_version: String,
    forms: Vec<Form>,
}

/// Registry backed by the JSON export the platform writes next to its own
/// data, loaded once at startup.
pub struct JsonFormsRegistry {
    path: PathBuf,
    data: RegistryFile,
}

impl JsonFormsRegistry {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path).await?;
        let data = serde_json::from_str(&content)?;
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl FormsRegistry for JsonFormsRegistry {
    async fn platform_version(&self) -> String {
        self.data.platform_version.clone()
    }

    async fn forms(&self) -> Vec<Form> {
        self.data.forms.clone()
    }

    async fn form(&self, id: u64) -> Option<Form> {
        self.data.forms.iter().find(|f| f.id == id).cloned()
    }
}

/// Dotted-version comparison for the activation gate; missing segments
/// count as zero, non-numeric segments as zero.
pub fn version_at_least(version: &str, minimum: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|seg| seg.trim().parse().unwrap_or(0))
            .collect()
    };
    let (have, want) = (parse(version), parse(minimum));
    let len = have.len().max(want.len());
    for i in 0..len {
        let h = have.get(i).copied().unwrap_or(0);
        let w = want.get(i).copied().unwrap_or(0);
        if h != w {
            return h > w;
        }
    }
    true
}
