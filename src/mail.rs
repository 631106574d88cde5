//! Outgoing mail.
//!
//! The dispatcher only depends on [`MailTransport`]. [`SmtpMailer`] delivers
//! through an SMTP relay when `SMTP_HOST` is configured; [`LogMailer`] writes
//! the message to the log instead.

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{info, instrument};

pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

/// One message with every recipient on the `To` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

#[rocket::async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port);

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

/// Assembles the plain-text MIME message for `mail`.
pub fn build_message(mail: &OutgoingMail) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(mail.from.parse::<Mailbox>()?)
        .subject(mail.subject.clone())
        .header(ContentType::TEXT_PLAIN);

    for recipient in &mail.to {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }

    builder
        .body(mail.body.clone())
        .map_err(|e| MailError::Build(e.to_string()))
}

#[rocket::async_trait]
impl MailTransport for SmtpMailer {
    #[instrument(skip_all, fields(subject = %mail.subject, recipients = mail.to.len()))]
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = build_message(mail)?;
        self.transport.send(message).await?;

        info!(to = ?mail.to, "Notification email sent");
        Ok(())
    }
}

/// Writes messages to the log. Used when no SMTP relay is configured.
pub struct LogMailer;

#[rocket::async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        build_message(mail)?;
        info!(
            from = %mail.from,
            to = ?mail.to,
            subject = %mail.subject,
            "SMTP not configured; logging email instead of sending:\n{}",
            mail.body
        );
        Ok(())
    }
}
