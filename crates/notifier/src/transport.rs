//! Transport mapping: resolved notification fields + a form's SMTP settings
//! -> one message handed to a freshly built lettre transport.
//!
//! The planning step is pure and covers everything that can be decided
//! without I/O (content type, address validation, recipient lookup); the
//! send step builds the transport per attempt and runs inside a failure
//! boundary that captures transport errors as the outcome instead of
//! propagating them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use config::{Encryption, SmtpSettings};
use util::{CredentialCodec, DebugLog};

use crate::forms::{Entry, MessageFormat};
use crate::resolver::{ResolveContext, ResolvedBody, ResolvedNotification};

/// Fixed connection timeout; there is no retry and no cancellation beyond it.
pub const SMTP_TIMEOUT_SECS: u64 = 10;

/// Why an attempt was dropped before reaching the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InvalidFrom,
    InvalidTo,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidFrom => write!(f, "You have an invalid FROM email address set."),
            SkipReason::InvalidTo => write!(f, "You have an invalid TO email address set."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Sent,
    Skipped(SkipReason),
    Failed(String),
}

/// Result of one attempt. `aborted` reports whether the platform's own
/// default send path must be suppressed — true whenever the mapper ran,
/// regardless of the disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub aborted: bool,
    pub disposition: Disposition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedContent {
    Text(String),
    Html(String),
    Multipart { html: String, text: String },
}

/// Everything the send step needs, fully validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePlan {
    pub from_email: String,
    pub from_name: String,
    pub to: Vec<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub content: PlannedContent,
    pub attachments: Vec<PathBuf>,
}

fn is_valid_email(value: &str) -> bool {
    value.parse::<Address>().is_ok()
}

/// Pure planning step: content-type selection, from/to resolution and
/// validation, optional-recipient filtering, reply-to precedence.
pub fn plan_message(
    settings: &SmtpSettings,
    resolved: &ResolvedNotification,
    entry: &Entry,
    message_format: MessageFormat,
    ctx: &ResolveContext<'_>,
) -> Result<MessagePlan, SkipReason> {
    let content = if settings.force_plaintext {
        PlannedContent::Text(resolved.body.text_version())
    } else {
        match message_format {
            MessageFormat::Text => PlannedContent::Text(resolved.body.text_version()),
            MessageFormat::Html => PlannedContent::Html(resolved.body.html_version()),
            MessageFormat::Multipart => match &resolved.body {
                ResolvedBody::Multipart { html, text } => PlannedContent::Multipart {
                    html: html.clone(),
                    text: text.clone(),
                },
                other => PlannedContent::Html(other.html_version()),
            },
        }
    };

    let (from_email, from_name) = if settings.force_from {
        let email = settings.from_email.trim();
        let name = settings.from_name.trim();
        (
            if email.is_empty() { ctx.admin_email } else { email }.to_string(),
            if name.is_empty() { ctx.site_name } else { name }.to_string(),
        )
    } else {
        (resolved.from.clone(), resolved.from_name.clone())
    };
    if !is_valid_email(&from_email) {
        return Err(SkipReason::InvalidFrom);
    }

    // A purely numeric recipient is a field id; the entry holds the address.
    let raw_to = if !resolved.to.is_empty() && resolved.to.chars().all(|c| c.is_ascii_digit()) {
        entry.value(&resolved.to).unwrap_or("").to_string()
    } else {
        resolved.to.clone()
    };
    let to: Vec<String> = raw_to
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect();
    if to.is_empty() || !to.iter().all(|addr| is_valid_email(addr)) {
        return Err(SkipReason::InvalidTo);
    }

    let cc = Some(resolved.cc.trim())
        .filter(|v| !v.is_empty() && is_valid_email(v))
        .map(str::to_string);
    let bcc = Some(resolved.bcc.trim())
        .filter(|v| !v.is_empty() && is_valid_email(v))
        .map(str::to_string);

    // The per-form reply-to override wins over the template's value.
    let settings_reply_to = settings.reply_to.trim();
    let reply_to = if !settings_reply_to.is_empty() && is_valid_email(settings_reply_to) {
        Some(settings_reply_to.to_string())
    } else {
        Some(resolved.reply_to.trim())
            .filter(|v| !v.is_empty() && is_valid_email(v))
            .map(str::to_string)
    };

    Ok(MessagePlan {
        from_email,
        from_name,
        to,
        cc,
        bcc,
        reply_to,
        subject: resolved.subject.clone(),
        content,
        attachments: resolved.attachments.clone(),
    })
}

/// Build a transport for one attempt from a form's settings. Also used by
/// the administrative connection test.
pub fn build_transport(
    settings: &SmtpSettings,
    password: &str,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, lettre::transport::smtp::Error> {
    let mut builder = match settings.encryption {
        Encryption::Ssl => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?,
        Encryption::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?,
        Encryption::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host),
    };

    builder = builder
        .port(settings.port)
        .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)));

    if !settings.username.is_empty() {
        builder = builder.credentials(Credentials::new(
            settings.username.clone(),
            password.to_string(),
        ));
    }

    Ok(builder.build())
}

/// Run one full attempt. Validation skips and transport failures both come
/// back as the outcome; the default-path abort flag is set in every branch.
pub async fn send_notification(
    settings: &SmtpSettings,
    resolved: &ResolvedNotification,
    entry: &Entry,
    message_format: MessageFormat,
    ctx: &ResolveContext<'_>,
    codec: &CredentialCodec,
    debug_log: &DebugLog,
) -> SendOutcome {
    let plan = match plan_message(settings, resolved, entry, message_format, ctx) {
        Ok(plan) => plan,
        Err(reason) => {
            // Validation problems are admin mistakes; they land in the log
            // whether or not debugging is on.
            let _ = debug_log.append(&reason.to_string()).await;
            tracing::warn!(host = %settings.host, "notification skipped: {reason}");
            return SendOutcome {
                aborted: true,
                disposition: Disposition::Skipped(reason),
            };
        }
    };

    let disposition = attempt_send(settings, &plan, codec).await;

    if settings.debug {
        let line = match &disposition {
            Disposition::Sent => format!("Notification sent to {}.", plan.to.join(",")),
            Disposition::Failed(error) => error.clone(),
            Disposition::Skipped(reason) => reason.to_string(),
        };
        let _ = debug_log.append(&line).await;
    }

    match &disposition {
        Disposition::Sent => tracing::debug!(host = %settings.host, "notification sent"),
        Disposition::Failed(error) => {
            tracing::warn!(host = %settings.host, error = %error, "notification send failed")
        }
        Disposition::Skipped(_) => {}
    }

    SendOutcome {
        aborted: true,
        disposition,
    }
}

async fn attempt_send(
    settings: &SmtpSettings,
    plan: &MessagePlan,
    codec: &CredentialCodec,
) -> Disposition {
    let password = codec.decrypt(&settings.password).unwrap_or_default();

    let transport = match build_transport(settings, &password) {
        Ok(transport) => transport,
        Err(error) => return Disposition::Failed(error.to_string()),
    };

    let message = match build_message(plan).await {
        Ok(message) => message,
        Err(error) => return Disposition::Failed(error.to_string()),
    };

    match transport.send(message).await {
        Ok(_) => Disposition::Sent,
        Err(error) => Disposition::Failed(error.to_string()),
    }
}

async fn build_message(plan: &MessagePlan) -> anyhow::Result<Message> {
    let from_address: Address = plan.from_email.parse()?;
    let from_name = (!plan.from_name.is_empty()).then(|| plan.from_name.clone());
    let mut builder = Message::builder()
        .from(Mailbox::new(from_name, from_address))
        .subject(plan.subject.as_str());

    for to in &plan.to {
        builder = builder.to(Mailbox::new(None, to.parse()?));
    }
    if let Some(cc) = &plan.cc {
        builder = builder.cc(Mailbox::new(None, cc.parse()?));
    }
    if let Some(bcc) = &plan.bcc {
        builder = builder.bcc(Mailbox::new(None, bcc.parse()?));
    }
    if let Some(reply_to) = &plan.reply_to {
        builder = builder.reply_to(Mailbox::new(None, reply_to.parse()?));
    }

    let body_part = |content: &PlannedContent| match content {
        PlannedContent::Text(text) => BodyPart::Single(SinglePart::plain(text.clone())),
        PlannedContent::Html(html) => BodyPart::Single(SinglePart::html(html.clone())),
        PlannedContent::Multipart { html, text } => {
            BodyPart::Multi(MultiPart::alternative_plain_html(text.clone(), html.clone()))
        }
    };

    let message = if plan.attachments.is_empty() {
        match body_part(&plan.content) {
            BodyPart::Single(part) => builder.singlepart(part)?,
            BodyPart::Multi(part) => builder.multipart(part)?,
        }
    } else {
        let mut mixed = match body_part(&plan.content) {
            BodyPart::Single(part) => MultiPart::mixed().singlepart(part),
            BodyPart::Multi(part) => MultiPart::mixed().multipart(part),
        };
        for path in &plan.attachments {
            mixed = mixed.singlepart(attachment_part(path).await?);
        }
        builder.multipart(mixed)?
    };

    Ok(message)
}

enum BodyPart {
    Single(SinglePart),
    Multi(MultiPart),
}

async fn attachment_part(path: &Path) -> anyhow::Result<SinglePart> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let content_type = ContentType::parse(mime.essence_str())?;
    Ok(Attachment::new(filename).body(bytes, content_type))
}
