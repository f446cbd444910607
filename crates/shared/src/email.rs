//! SMTP delivery of login codes via `lettre`.
//!
//! The transport and sender mailbox are built once at startup so a bad
//! `[email]` section fails the boot instead of the first sign-in.

use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::EmailConfig;

const SUBJECT: &str = "Tally 登录验证码";

/// Mail failures.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Sender or recipient does not parse as a mailbox.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
    /// The SMTP relay could not be configured.
    #[error("invalid SMTP settings: {0}")]
    Transport(String),
    /// The message could not be assembled.
    #[error("failed to build email: {0}")]
    Build(String),
    /// The relay refused or the connection failed.
    #[error("failed to send email: {0}")]
    Send(String),
}

/// Sends verification codes through one SMTP relay.
#[derive(Clone)]
pub struct EmailService {
    sender: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("sender", &self.sender.to_string())
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Validates the sender and prepares the relay (implicit TLS).
    ///
    /// # Errors
    ///
    /// `InvalidAddress` for a bad `from_email`, `Transport` for a bad host.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let sender = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| EmailError::InvalidAddress(e.to_string()))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| EmailError::Transport(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.smtp_username, config.smtp_password))
            .build();
        Ok(Self { sender, transport })
    }

    /// The bilingual code message, without sending it.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` for a bad recipient.
    pub fn code_message(
        &self,
        to: &str,
        code: &str,
        ttl_minutes: u64,
    ) -> Result<Message, EmailError> {
        let recipient = to
            .parse::<Mailbox>()
            .map_err(|e| EmailError::InvalidAddress(e.to_string()))?;
        let body = format!(
            "您的登录验证码是 {code}，{ttl_minutes} 分钟内有效。\n\
             Your Tally login code is {code}. It expires in {ttl_minutes} minutes.\n\n\
             如果这不是您本人的操作，请忽略此邮件。"
        );
        Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::Build(e.to_string()))
    }

    /// Delivers a login code.
    ///
    /// # Errors
    ///
    /// Any [`EmailError`].
    pub async fn send_code(
        &self,
        to: &str,
        code: &str,
        ttl_minutes: u64,
    ) -> Result<(), EmailError> {
        let message = self.code_message(to, code, ttl_minutes)?;
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| EmailError::Send(e.to_string()))
    }
}
