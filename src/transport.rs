//! The mail port: what the handler needs from a message transfer service.

use async_trait::async_trait;

use crate::config::SmtpSettings;
use crate::errors::{ConnectivityError, SendError};
use crate::request::EmailRequest;

/// A plain-text message ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl MailMessage {
    /// Subject and text are trimmed; the recipient is used as given.
    pub fn new(from: impl Into<String>, request: &EmailRequest) -> Self {
        Self {
            from: from.into(),
            to: request.receiver_email.clone(),
            subject: request.subject.trim().to_string(),
            text: request.body_text.trim().to_string(),
        }
    }
}

/// Provider acknowledgement of an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: String,
}

/// Async email transport.
///
/// Implementations translate provider failures into [`SendError`] before
/// returning, so callers never inspect provider codes.
#[async_trait(?Send)]
pub trait MailTransport {
    /// Checks that the service is reachable and accepts the credentials.
    async fn verify(&mut self) -> Result<(), ConnectivityError>;

    /// Delivers one message.
    async fn send(&mut self, message: &MailMessage) -> Result<SentMessage, SendError>;
}

/// Creates a transport once the configuration guard has passed.
pub trait TransportFactory {
    type Transport: MailTransport;

    fn create(&self, settings: &SmtpSettings) -> Self::Transport;
}
