//! The platform's pre-send extension point: decide per form whether the
//! notification leaves through its own SMTP transport or the default path.

use config::SettingsStore;
use util::{CredentialCodec, DebugLog};

use crate::forms::{Entry, Form, MessageFormat, Notification};
use crate::resolver::{resolve_notification, ResolveContext};
use crate::transport::{send_notification, SendOutcome};

/// What the platform should do with its own send path afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    /// No settings for this form (or no host configured): the default mail
    /// path runs unmodified.
    UseDefault,
    /// The override handled the attempt; the default send is suppressed no
    /// matter how the attempt went.
    Abort(SendOutcome),
}

#[allow(clippy::too_many_arguments)]
pub async fn override_send(
    store: &SettingsStore,
    codec: &CredentialCodec,
    debug_log: &DebugLog,
    ctx: &ResolveContext<'_>,
    form: &Form,
    entry: &Entry,
    notification: &Notification,
    message_format: MessageFormat,
) -> HookAction {
    let Some(settings) = store.get(form.id).await.filter(|s| s.is_configured()) else {
        let _ = debug_log.append("There are no settings configured.").await;
        tracing::debug!(form_id = form.id, "no SMTP settings, using default mail path");
        return HookAction::UseDefault;
    };

    let resolved = resolve_notification(notification, form, entry, ctx);
    let outcome =
        send_notification(&settings, &resolved, entry, message_format, ctx, codec, debug_log).await;

    HookAction::Abort(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::ToType;
    use crate::transport::{Disposition, SkipReason};
    use config::{SmtpSettings, UploadsConfiguration};

    struct Fixture {
        store: SettingsStore,
        codec: CredentialCodec,
        debug_log: DebugLog,
        uploads: UploadsConfiguration,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        Fixture {
            store: SettingsStore::open(dir.path().join("settings.json")).await.unwrap(),
            codec: CredentialCodec::from_secrets("key", "salt"),
            debug_log: DebugLog::new(dir.path().join("debug.log")),
            uploads: UploadsConfiguration::default(),
            _dir: dir,
        }
    }

    fn ctx(uploads: &UploadsConfiguration) -> ResolveContext<'_> {
        ResolveContext {
            site_name: "Acme",
            admin_email: "admin@acme.test",
            uploads,
            expander: None,
        }
    }

    fn notification() -> Notification {
        Notification {
            to_type: ToType::Email,
            to: "user@example.com".into(),
            from: "sender@acme.test".into(),
            subject: "Hi".into(),
            message: "Hello".into(),
            ..Default::default()
        }
    }

    fn form() -> Form {
        Form {
            id: 12,
            title: "Contact".into(),
            fields: Vec::new(),
        }
    }

    #[tokio::test]
    async fn no_settings_leaves_default_path_untouched() {
        let fx = fixture().await;
        let action = override_send(
            &fx.store,
            &fx.codec,
            &fx.debug_log,
            &ctx(&fx.uploads),
            &form(),
            &Entry::default(),
            &notification(),
            MessageFormat::Html,
        )
        .await;
        assert_eq!(action, HookAction::UseDefault);

        let log = std::fs::read_to_string(fx.debug_log.path()).unwrap();
        assert!(log.contains("There are no settings configured."));
    }

    #[tokio::test]
    async fn empty_host_counts_as_unconfigured() {
        let fx = fixture().await;
        fx.store.put(12, SmtpSettings::default()).await.unwrap();

        let action = override_send(
            &fx.store,
            &fx.codec,
            &fx.debug_log,
            &ctx(&fx.uploads),
            &form(),
            &Entry::default(),
            &notification(),
            MessageFormat::Html,
        )
        .await;
        assert_eq!(action, HookAction::UseDefault);
    }

    #[tokio::test]
    async fn validation_skip_still_aborts_default_send() {
        let fx = fixture().await;
        fx.store
            .put(
                12,
                SmtpSettings {
                    host: "smtp.acme.test".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut bad = notification();
        bad.from = "not an address".into();

        let action = override_send(
            &fx.store,
            &fx.codec,
            &fx.debug_log,
            &ctx(&fx.uploads),
            &form(),
            &Entry::default(),
            &bad,
            MessageFormat::Html,
        )
        .await;

        match action {
            HookAction::Abort(outcome) => {
                assert!(outcome.aborted);
                assert_eq!(outcome.disposition, Disposition::Skipped(SkipReason::InvalidFrom));
            }
            HookAction::UseDefault => panic!("expected abort"),
        }

        let log = std::fs::read_to_string(fx.debug_log.path()).unwrap();
        assert!(log.contains("invalid FROM"));
    }

    #[tokio::test]
    async fn transport_failure_still_aborts_default_send() {
        let fx = fixture().await;
        fx.store
            .put(
                12,
                SmtpSettings {
                    // Nothing listens here; the connection attempt fails fast
                    // and the failure is captured, not raised.
                    host: "127.0.0.1".into(),
                    port: 1,
                    debug: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let action = override_send(
            &fx.store,
            &fx.codec,
            &fx.debug_log,
            &ctx(&fx.uploads),
            &form(),
            &Entry::default(),
            &notification(),
            MessageFormat::Html,
        )
        .await;

        match action {
            HookAction::Abort(outcome) => {
                assert!(outcome.aborted);
                assert!(matches!(outcome.disposition, Disposition::Failed(_)));
            }
            HookAction::UseDefault => panic!("expected abort"),
        }

        // Debug was on: the captured error is in the log.
        let log = std::fs::read_to_string(fx.debug_log.path()).unwrap();
        assert!(log.lines().count() >= 1);
    }
}
