//! Notification resolution: template + form + entry -> concrete send fields.
//!
//! A pure function over its inputs. External capabilities (markup expansion
//! of embedded shortcodes) come in through [`MarkupExpander`] rather than by
//! extending any platform type. Absent or empty inputs degrade to defaults;
//! nothing in here errors.

use std::path::PathBuf;

use config::UploadsConfiguration;

use crate::attachments::collect_attachments;
use crate::format::{auto_format_html, strip_html};
use crate::forms::{Entry, Form, MessageFormat, Notification, ToType};
use crate::merge_tags::{replace_merge_tags, TagContext, TagFormat};
use crate::routing::resolve_routing;

/// Hook for the platform's embedded-markup pass over message bodies.
pub trait MarkupExpander: Send + Sync {
    fn expand(&self, text: &str) -> String;
}

pub struct ResolveContext<'a> {
    pub site_name: &'a str,
    pub admin_email: &'a str,
    pub uploads: &'a UploadsConfiguration,
    pub expander: Option<&'a dyn MarkupExpander>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBody {
    Html(String),
    Text(String),
    Multipart { html: String, text: String },
}

impl ResolvedBody {
    /// Plaintext rendering, deriving one by stripping markup when only an
    /// html body exists.
    pub fn text_version(&self) -> String {
        match self {
            ResolvedBody::Text(text) => text.clone(),
            ResolvedBody::Html(html) => strip_html(html),
            ResolvedBody::Multipart { text, .. } => text.clone(),
        }
    }

    /// Html rendering; a text-only body is passed through as-is.
    pub fn html_version(&self) -> String {
        match self {
            ResolvedBody::Html(html) => html.clone(),
            ResolvedBody::Text(text) => text.clone(),
            ResolvedBody::Multipart { html, .. } => html.clone(),
        }
    }
}

/// Concrete field values for one send attempt. Ephemeral; recomputed from
/// the template on every attempt.
#[derive(Debug, Clone)]
pub struct ResolvedNotification {
    pub to: String,
    pub from: String,
    pub from_name: String,
    pub cc: String,
    pub bcc: String,
    pub reply_to: String,
    pub subject: String,
    pub body: ResolvedBody,
    pub attachments: Vec<PathBuf>,
}

pub fn resolve_notification(
    notification: &Notification,
    form: &Form,
    entry: &Entry,
    ctx: &ResolveContext<'_>,
) -> ResolvedNotification {
    let tags = TagContext {
        form,
        entry,
        site_name: ctx.site_name,
        admin_email: ctx.admin_email,
    };

    let email_to = recipient_value(notification, form, entry);

    let replace = |input: &str| replace_merge_tags(input, &tags, TagFormat::Text);

    let to = non_empty_or(replace(&email_to), ctx.admin_email);
    let from = non_empty_or(replace(&notification.from), ctx.admin_email);
    let from_name = replace(&notification.from_name);
    let cc = replace(&notification.cc);
    let bcc = replace(&notification.bcc);
    let reply_to = replace(&notification.reply_to);
    let subject = replace(&notification.subject);

    let body = resolve_body(notification, &tags, ctx);
    let attachments = collect_attachments(notification, form, entry, ctx.uploads);

    ResolvedNotification {
        to,
        from,
        from_name,
        cc,
        bcc,
        reply_to,
        subject,
        body,
        attachments,
    }
}

/// The raw recipient value before merge-tag replacement: a literal address
/// list, a field lookup, or the routing-rule evaluation. Routing only runs
/// when `to` itself is empty, matching templates that carry both.
fn recipient_value(notification: &Notification, form: &Form, entry: &Entry) -> String {
    let mut to_field = String::new();
    if notification.to_type == ToType::Field {
        to_field = notification.to_field.clone();
        if to_field.is_empty() {
            to_field = notification.to.clone();
        }
    }

    if notification.to.is_empty()
        && notification.to_type == ToType::Routing
        && !notification.routing.is_empty()
    {
        resolve_routing(&notification.routing, form, entry)
    } else if !to_field.is_empty() {
        entry.value(&to_field).unwrap_or("").to_string()
    } else {
        notification.to.clone()
    }
}

fn resolve_body(
    notification: &Notification,
    tags: &TagContext<'_>,
    ctx: &ResolveContext<'_>,
) -> ResolvedBody {
    // Multipart resolves its merge tags in html format, then derives the
    // text alternative from a second, text-format pass.
    let merge_format = match notification.message_format {
        MessageFormat::Text => TagFormat::Text,
        MessageFormat::Html | MessageFormat::Multipart => TagFormat::Html,
    };

    let mut message = replace_merge_tags(&notification.message, tags, merge_format);
    if merge_format == TagFormat::Html && !notification.disable_autoformat {
        message = auto_format_html(&message);
    }
    if let Some(expander) = ctx.expander {
        message = expander.expand(&message);
    }

    match notification.message_format {
        MessageFormat::Text => ResolvedBody::Text(message),
        MessageFormat::Html => ResolvedBody::Html(message),
        MessageFormat::Multipart => {
            let mut text = replace_merge_tags(&notification.message, tags, TagFormat::Text);
            if let Some(expander) = ctx.expander {
                text = expander.expand(&text);
            }
            ResolvedBody::Multipart {
                html: message,
                text: strip_html(&text),
            }
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
