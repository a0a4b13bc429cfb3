use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument, warn};

use crate::shared::AppError;

/// Outbound notification payload
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Trait for best-effort email dispatch. Callers decide whether a delivery
/// failure matters; the credential flows treat it as log-and-continue.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError>;
}

/// SMTP implementation over lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Builds the transport from SMTP_HOST / SMTP_USERNAME / SMTP_PASSWORD /
    /// MAIL_FROM environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        let host = std::env::var("SMTP_HOST")
            .map_err(|_| AppError::EmailError("SMTP_HOST is not set".to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        if let (Ok(username), Ok(password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        let from = std::env::var("MAIL_FROM")
            .unwrap_or_else(|_| "noreply@gramlet.app".to_string())
            .parse::<Mailbox>()
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, message))]
    async fn send(&self, message: EmailMessage) -> Result<(), AppError> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .body(message.body)
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        self.transport.send(email).await.map_err(|e| {
            warn!(error = %e, "SMTP delivery failed");
            AppError::EmailError(e.to_string())
        })?;

        info!(recipient = %message.to, "Email dispatched");
        Ok(())
    }
}

/// Mailer for development: logs the message instead of delivering it
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError> {
        info!(
            recipient = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Email dispatch (log only)"
        );
        Ok(())
    }
}
