//! email-relay-worker — a Cloudflare Worker that validates JSON email
//! requests and relays them over SMTP.
//!
//! `POST {"receiver_email", "subject", "body_text"}` sends a plain-text
//! message from the configured account; `OPTIONS` answers CORS preflight.

pub mod config;
pub mod email;
#[cfg(target_arch = "wasm32")]
mod entry;
pub mod errors;
pub mod handler;
pub mod logger;
pub mod mailer;
pub mod request;
pub mod response;
pub mod transport;
pub mod utils;

// Re-exports
pub use config::{AuthType, Credentials, RelayConfig, SmtpSettings};
pub use email::OutgoingEmail;
pub use errors::{ConfigError, ConnectivityError, HandlerError, SendError, SmtpError};
pub use handler::EmailHandler;
pub use logger::{LogLevel, Logger};
pub use mailer::{SmtpTransport, SmtpTransportFactory};
pub use request::{parse_body, validate, ApiRequest, EmailRequest, ValidationResult};
pub use response::{create_response, ApiResponse};
pub use transport::{MailMessage, MailTransport, SentMessage, TransportFactory};
pub use utils::is_valid_email;
