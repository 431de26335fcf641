//! Per-form SMTP override for the forms platform's notification pipeline.
//!
//! The platform resolves which notifications to send for a submission and
//! calls the pre-send hook in [`dispatch`]; when the form has a configured
//! SMTP host, the notification is resolved against the entry, mapped onto a
//! per-send lettre transport, and the platform's own mail path is told to
//! stand down.

pub mod attachments;
pub mod dispatch;
pub mod format;
pub mod forms;
pub mod merge_tags;
pub mod resolver;
pub mod routing;
pub mod transport;

pub use dispatch::{override_send, HookAction};
pub use forms::{
    version_at_least, Entry, FieldType, Form, FormField, FormsRegistry, JsonFormsRegistry,
    MessageFormat, Notification, RegistryError, RoutingRule, RuleOperator, ToType,
};
pub use resolver::{resolve_notification, MarkupExpander, ResolveContext, ResolvedBody, ResolvedNotification};
pub use transport::{
    build_transport, plan_message, send_notification, Disposition, MessagePlan, SendOutcome,
    SkipReason,
};
