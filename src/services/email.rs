//! Outgoing mail: the `Mailer` contract and its transports

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};

use crate::{
    config::{EmailConfig, MailTransport, SiteConfig},
    error::{AppError, AppResult},
};

/// Delivers a plain-text message to one recipient
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> AppResult<()>;
}

/// Build the mailer selected by `email.transport`
pub fn from_config(config: &EmailConfig) -> AppResult<Arc<dyn Mailer>> {
    let mailer: Arc<dyn Mailer> = match config.transport {
        MailTransport::Smtp => Arc::new(SmtpMailer::new(config)?),
        MailTransport::Log => Arc::new(LogMailer),
        MailTransport::Memory => Arc::new(OutboxMailer::default()),
    };
    Ok(mailer)
}

// ---------------------------------------------------------------------------
// SMTP
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SmtpMailer {
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let from_name = config.smtp_from_name.as_deref().unwrap_or("eLibrary");
        let from = Mailbox::from_str(&format!("{} <{}>", from_name, config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let builder = if config.smtp_use_tls {
            SmtpTransport::starttls_relay(&config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&config.smtp_host)
        }
        .port(config.smtp_port);

        let builder = if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            builder
        };

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }

    fn build_message(&self, subject: &str, body: &str, recipient: &str) -> AppResult<Message> {
        let to = Mailbox::from_str(recipient)
            .map_err(|e| AppError::Mail(format!("Invalid recipient address: {}", e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><pre>{}</pre></body></html>"#,
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Mail(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> AppResult<()> {
        let message = self.build_message(subject, body, recipient)?;
        let transport = self.transport.clone();

        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| AppError::Internal(format!("Mail task failed: {}", e)))?
            .map_err(|e| AppError::Mail(format!("Failed to send email: {}", e)))?;

        tracing::info!("Sent \"{}\" to {}", subject, recipient);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Development transports
// ---------------------------------------------------------------------------

/// Writes messages to the log instead of delivering them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> AppResult<()> {
        tracing::info!(recipient, subject, "Outgoing email:\n{}", body);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

/// Keeps every message in memory
#[derive(Debug, Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<SentEmail>>,
}

impl OutboxMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last_to(&self, recipient: &str) -> Option<SentEmail> {
        self.sent().into_iter().rev().find(|m| m.recipient == recipient)
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> AppResult<()> {
        self.sent
            .lock()
            .map_err(|_| AppError::Internal("Outbox lock poisoned".to_string()))?
            .push(SentEmail {
                subject: subject.to_string(),
                body: body.to_string(),
                recipient: recipient.to_string(),
            });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

pub const ACTIVATION_SUBJECT: &str = "Account activation.";

/// Path of the activation endpoint for an encoded id and token
pub fn activation_path(uidb64: &str, token: &str) -> String {
    format!("/api/v1/auth/activate/{}/{}", uidb64, token)
}

/// Body of the activation email
pub fn activation_body(username: &str, site: &SiteConfig, uidb64: &str, token: &str) -> String {
    format!(
        r#"Hi {username},

Please click on the link below to confirm your registration at {domain}:

{scheme}://{domain}{path}

If you did not sign up, you can ignore this message.
"#,
        username = username,
        domain = site.domain,
        scheme = site.scheme,
        path = activation_path(uidb64, token),
    )
}
