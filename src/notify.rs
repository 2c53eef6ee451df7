//! Operator notification after a run that ingested at least one document.
//!
//! Delivery is best-effort. The coordinator logs a [`MonitorError::NotificationFailed`]
//! and carries on; the ledger and artifacts are already committed by then.

use crate::config::NotifyConfig;
use crate::error::MonitorError;
use crate::output::ProcessedDocument;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info};

/// Implicit-TLS submission port. Every other port negotiates STARTTLS.
const SMTPS_PORT: u16 = 465;

/// Receives the documents ingested by one run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, documents: &[ProcessedDocument]) -> Result<(), MonitorError>;
}

/// Notifier used when no SMTP credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, documents: &[ProcessedDocument]) -> Result<(), MonitorError> {
        debug!(
            "Notification disabled; {} processed documents not emailed",
            documents.len()
        );
        Ok(())
    }
}

/// Sends one plain-text email through an authenticated SMTP relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    pub fn new(
        host: &str,
        port: u16,
        credentials: Credentials,
        from: Mailbox,
        to: Mailbox,
    ) -> Result<Self, MonitorError> {
        let builder = if port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| MonitorError::NotificationFailed(format!("SMTP relay '{host}': {e}")))?;

        Ok(Self {
            transport: builder.port(port).credentials(credentials).build(),
            from,
            to,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, documents: &[ProcessedDocument]) -> Result<(), MonitorError> {
        let (subject, body) = compose_message(documents);
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MonitorError::NotificationFailed(format!("building message: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MonitorError::NotificationFailed(e.to_string()))?;

        info!("Notification sent to {}", self.to);
        Ok(())
    }
}

/// Build the notifier described by `config`.
///
/// Without both credentials this is a [`DisabledNotifier`]. With them, the
/// host is required, the sender defaults to the username and the recipient
/// defaults to the sender.
pub fn notifier_from_config(config: &NotifyConfig) -> Result<Arc<dyn Notifier>, MonitorError> {
    let (Some(username), Some(password)) = (&config.username, &config.password) else {
        return Ok(Arc::new(DisabledNotifier));
    };
    if !config.is_enabled() {
        return Ok(Arc::new(DisabledNotifier));
    }

    let host = config
        .host
        .as_deref()
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| {
            MonitorError::InvalidConfig("SMTP host is required when credentials are set".into())
        })?;

    let from_addr = config.from.as_deref().unwrap_or(username);
    let to_addr = config.recipient.as_deref().unwrap_or(from_addr);
    let from = parse_mailbox("sender", from_addr)?;
    let to = parse_mailbox("recipient", to_addr)?;

    let port = config.port.unwrap_or(NotifyConfig::DEFAULT_PORT);
    let credentials = Credentials::new(username.clone(), password.clone());
    let notifier = SmtpNotifier::new(host, port, credentials, from, to)?;
    debug!("SMTP notification enabled via {}:{}", host, port);
    Ok(Arc::new(notifier))
}

fn parse_mailbox(role: &str, addr: &str) -> Result<Mailbox, MonitorError> {
    addr.parse::<Mailbox>()
        .map_err(|e| MonitorError::InvalidConfig(format!("invalid {role} address '{addr}': {e}")))
}

/// Subject and plain-text body listing each document's title, URL and text.
pub fn compose_message(documents: &[ProcessedDocument]) -> (String, String) {
    let subject = format!("製造たばこ小売定価: {} new document(s)", documents.len());

    let mut body = String::new();
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            body.push_str("\n----------------------------------------\n\n");
        }
        let _ = writeln!(body, "Title: {}", doc.title);
        let _ = writeln!(body, "URL: {}", doc.url);
        let _ = writeln!(body, "Pages: {}", doc.page_count);
        body.push('\n');
        body.push_str(doc.content.trim_end());
        body.push('\n');
    }

    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc(title: &str, url: &str, content: &str) -> ProcessedDocument {
        ProcessedDocument {
            url: url.into(),
            title: title.into(),
            content: content.into(),
            artifact_path: PathBuf::from(format!("data/{title}.txt")),
            page_count: 1,
        }
    }

    #[test]
    fn message_lists_every_document() {
        let docs = vec![
            doc("製造たばこ小売定価 2024-01", "https://site/a.pdf", "セブンスター 600円\n\n"),
            doc("製造たばこ小売定価 2024-02", "https://site/b.pdf", "メビウス 580円\n\n"),
        ];
        let (subject, body) = compose_message(&docs);

        assert!(subject.contains("2 new"));
        assert!(body.contains("Title: 製造たばこ小売定価 2024-01"));
        assert!(body.contains("URL: https://site/b.pdf"));
        assert!(body.contains("セブンスター 600円\n"));
        assert!(body.find("2024-01").unwrap() < body.find("2024-02").unwrap());
    }

    #[test]
    fn no_credentials_means_disabled() {
        let config = NotifyConfig {
            host: Some("smtp.example.com".into()),
            username: Some("ops@example.com".into()),
            ..Default::default()
        };
        assert!(notifier_from_config(&config).is_ok());
    }

    #[test]
    fn credentials_without_host_is_invalid() {
        let config = NotifyConfig {
            username: Some("ops@example.com".into()),
            password: Some("secret".into()),
            ..Default::default()
        };
        let err = notifier_from_config(&config).err().unwrap();
        assert!(matches!(err, MonitorError::InvalidConfig(_)));
    }

    #[test]
    fn bad_recipient_is_invalid() {
        let config = NotifyConfig {
            host: Some("smtp.example.com".into()),
            username: Some("ops@example.com".into()),
            password: Some("secret".into()),
            recipient: Some("not an address".into()),
            ..Default::default()
        };
        let err = notifier_from_config(&config).err().unwrap();
        assert!(err.to_string().contains("recipient"));
    }

    #[tokio::test]
    async fn disabled_notifier_is_a_noop() {
        let docs = vec![doc("t", "https://site/a.pdf", "x")];
        assert!(DisabledNotifier.notify(&docs).await.is_ok());
    }
}
