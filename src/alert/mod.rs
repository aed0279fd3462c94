//! Operator alerts.
//!
//! [`Alerter`] is the notification collaborator used when a stage degrades
//! (e.g. the live word source is down and the fallback set is used).  Alerts
//! are best effort: [`Alerter::alert`] never returns an error, so a broken
//! mail relay can never take a run down with it.
//!
//! [`EmailAlerter`] sends plain-text mail over SMTP with implicit TLS.  When
//! the username, password or recipient is missing the alert is skipped with a
//! log line.

use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::{credential, AlertConfig};

// ---------------------------------------------------------------------------
// AlertError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("invalid mailbox {0:?}: {1}")]
    Address(String, String),

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// Alerter trait
// ---------------------------------------------------------------------------

/// Best-effort operator notification.
#[async_trait]
pub trait Alerter: Send + Sync {
    async fn alert(&self, subject: &str, body: &str);
}

// ---------------------------------------------------------------------------
// EmailAlerter
// ---------------------------------------------------------------------------

struct SmtpCredentials {
    username: String,
    password: String,
    recipient: String,
}

/// SMTP alerter built from [`AlertConfig`].
pub struct EmailAlerter {
    host: String,
    port: u16,
    credentials: Option<SmtpCredentials>,
}

impl EmailAlerter {
    pub fn from_config(config: &AlertConfig) -> Self {
        let credentials = match (
            credential(config.username.clone()),
            credential(config.password.clone()),
            credential(config.recipient.clone()),
        ) {
            (Some(username), Some(password), Some(recipient)) => Some(SmtpCredentials {
                username,
                password,
                recipient,
            }),
            _ => None,
        };

        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            credentials,
        }
    }

    /// `true` when username, password and recipient are all configured.
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn send(&self, creds: &SmtpCredentials, subject: &str, body: &str) -> Result<(), AlertError> {
        let from: Mailbox = creds
            .username
            .parse()
            .map_err(|e| AlertError::Address(creds.username.clone(), format!("{e}")))?;
        let to: Mailbox = creds
            .recipient
            .parse()
            .map_err(|e| AlertError::Address(creds.recipient.clone(), format!("{e}")))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| AlertError::Message(e.to_string()))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
            .map_err(|e| AlertError::Transport(e.to_string()))?
            .port(self.port)
            .credentials(Credentials::new(
                creds.username.clone(),
                creds.password.clone(),
            ))
            .build();

        mailer
            .send(message)
            .await
            .map_err(|e| AlertError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Alerter for EmailAlerter {
    async fn alert(&self, subject: &str, body: &str) {
        let Some(creds) = &self.credentials else {
            log::warn!("alert: email credentials not configured, skipping alert {subject:?}");
            return;
        };

        match self.send(creds, subject, body).await {
            Ok(()) => log::info!("alert: email sent to {}", creds.recipient),
            Err(e) => log::error!("alert: failed to send email: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> AlertConfig {
        AlertConfig {
            username: Some("bot@example.com".into()),
            password: Some("app-password".into()),
            recipient: Some("ops@example.com".into()),
            ..AlertConfig::default()
        }
    }

    #[test]
    fn configured_when_all_credentials_present() {
        assert!(EmailAlerter::from_config(&full_config()).is_configured());
    }

    #[test]
    fn not_configured_when_any_credential_missing() {
        let mut cfg = full_config();
        cfg.recipient = None;
        assert!(!EmailAlerter::from_config(&cfg).is_configured());

        let mut cfg = full_config();
        cfg.password = Some("your_password".into());
        assert!(!EmailAlerter::from_config(&cfg).is_configured());
    }

    #[tokio::test]
    async fn unconfigured_alert_is_a_silent_skip() {
        let alerter = EmailAlerter::from_config(&AlertConfig::default());
        // Must return without touching the network or panicking.
        alerter.alert("subject", "body").await;
    }

    #[test]
    fn alerter_is_object_safe() {
        let alerter: Box<dyn Alerter> =
            Box::new(EmailAlerter::from_config(&AlertConfig::default()));
        drop(alerter);
    }
}
