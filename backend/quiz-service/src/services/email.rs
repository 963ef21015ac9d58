/// Outbound mail: verification codes and password reset links
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_code(&self, recipient: &str, code: &str) -> Result<(), MailError>;

    async fn send_password_reset(
        &self,
        recipient: &str,
        username: &str,
        code: &str,
    ) -> Result<(), MailError>;
}

/// SMTP mailer, or a log-only mailer when no host is configured
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
    password_reset_url: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(format!("SMTP_FROM: {e}")))?;

        let transport = if config.host.trim().is_empty() {
            warn!("SMTP host not configured; mail will be logged instead of sent");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            }
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port);

            let builder = match (&config.username, &config.password) {
                (Some(username), Some(password)) => {
                    builder.credentials(Credentials::new(username.clone(), password.clone()))
                }
                _ => builder,
            };
            Some(Arc::new(builder.build()))
        };

        Ok(Self {
            transport,
            from,
            password_reset_url: config.password_reset_url.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    fn reset_link(&self, username: &str, code: &str) -> String {
        format!(
            "{}?username={}&code={}",
            self.password_reset_url,
            urlencoding::encode(username),
            urlencoding::encode(code)
        )
    }

    async fn send_mail(&self, recipient: &str, subject: &str, body: String) -> Result<(), MailError> {
        let Some(transport) = &self.transport else {
            info!(subject, recipient, "mail transport disabled; skipping send");
            return Ok(());
        };

        let to = recipient
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(e.to_string()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        info!(subject, "mail sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification_code(&self, recipient: &str, code: &str) -> Result<(), MailError> {
        let body = format!(
            "Your verification code is {code}.\n\nThe code expires in 5 minutes. \
             If you did not request it, you can ignore this mail."
        );
        self.send_mail(recipient, "[Quizhub] Email verification code", body)
            .await
    }

    async fn send_password_reset(
        &self,
        recipient: &str,
        username: &str,
        code: &str,
    ) -> Result<(), MailError> {
        let link = self.reset_link(username, code);
        let body = format!(
            "We received a password reset request for {username}.\n\n\
             Open the following link to choose a new password:\n{link}\n\n\
             The link expires in 10 minutes."
        );
        self.send_mail(recipient, "[Quizhub] Password reset", body)
            .await
    }
}
