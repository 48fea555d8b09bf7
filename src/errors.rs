//! Error types, from the SMTP wire up to the API surface.

use thiserror::Error;

/// Reply code an SMTP server uses to reject a mailbox.
pub const MAILBOX_UNAVAILABLE: u16 = 550;

/// Raw failure of an SMTP session.
#[derive(Error, Debug)]
pub enum SmtpError {
    /// The socket could not be opened or the server refused the session.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server refused the credentials or offered no usable mechanism.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The server answered a command with a negative reply.
    #[error("{command} rejected with {code}: {reply}")]
    Rejected {
        command: &'static str,
        code: u16,
        reply: String,
    },

    /// Reading or writing the socket failed mid-session.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The server sent something that is not an SMTP reply.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<worker::Error> for SmtpError {
    fn from(e: worker::Error) -> Self {
        SmtpError::Connection(e.to_string())
    }
}

/// The mail service could not be reached before sending.
#[derive(Error, Debug)]
#[error("SMTP connection check failed: {0}")]
pub struct ConnectivityError(#[from] pub SmtpError);

/// Categorized outcome of a failed send.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    RecipientRejected(String),

    #[error("{0}")]
    Other(String),
}

impl From<SmtpError> for SendError {
    fn from(e: SmtpError) -> Self {
        let detail = e.to_string();
        match e {
            SmtpError::Auth(_) => SendError::Auth(detail),
            SmtpError::Connection(_) => SendError::Connection(detail),
            SmtpError::Rejected {
                code: MAILBOX_UNAVAILABLE,
                ..
            } => SendError::RecipientRejected(detail),
            _ => SendError::Other(detail),
        }
    }
}

/// Required relay settings are absent.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required config: {0}")]
    Missing(&'static str),
}

/// Everything the request handler can fail with.
///
/// Each variant knows the HTTP status, short code and public message it is
/// reported with; the detail carried inside is only ever logged.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("invalid JSON in request body: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl HandlerError {
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::InvalidJson(_)
            | HandlerError::Validation(_)
            | HandlerError::Send(SendError::RecipientRejected(_)) => 400,
            _ => 500,
        }
    }

    /// Short, stable code reported as `error`.
    pub fn error_code(&self) -> &'static str {
        match self {
            HandlerError::InvalidJson(_) => "Invalid JSON in request body",
            HandlerError::Validation(_) => "Validation failed",
            HandlerError::Config(_) => "Server configuration error",
            HandlerError::Connectivity(_) => "Email service unavailable",
            HandlerError::Send(SendError::Auth(_)) => "Authentication failed",
            HandlerError::Send(SendError::Connection(_)) => "Connection failed",
            HandlerError::Send(SendError::RecipientRejected(_)) => "Invalid recipient",
            HandlerError::Send(SendError::Other(_)) => "Email sending failed",
            HandlerError::Unexpected(_) => "Internal server error",
        }
    }

    /// Human readable text reported as `message`.
    pub fn public_message(&self) -> &'static str {
        match self {
            HandlerError::InvalidJson(_) => "Request body must be valid JSON",
            HandlerError::Validation(_) => "Invalid request parameters",
            HandlerError::Config(_) => "Email service not properly configured",
            HandlerError::Connectivity(_) => "Unable to connect to email service",
            HandlerError::Send(SendError::Auth(_)) => "Invalid email credentials",
            HandlerError::Send(SendError::Connection(_)) => "Unable to connect to email server",
            HandlerError::Send(SendError::RecipientRejected(_)) => {
                "The recipient email address is invalid or does not exist"
            }
            HandlerError::Send(SendError::Other(_)) => "An error occurred while sending the email",
            HandlerError::Unexpected(_) => "An unexpected error occurred",
        }
    }

    pub fn details(&self) -> Option<&[String]> {
        match self {
            HandlerError::Validation(details) => Some(details.as_slice()),
            _ => None,
        }
    }

    /// Caller-induced failures are expected and stay out of the logs.
    pub fn is_operator_facing(&self) -> bool {
        matches!(
            self,
            HandlerError::Connectivity(_) | HandlerError::Send(_) | HandlerError::Unexpected(_)
        )
    }
}
