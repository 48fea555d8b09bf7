//! SMTP client over the Cloudflare Workers TCP socket.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use worker::{ConnectionBuilder, SecureTransport, Socket};

use crate::config::{AuthType, Credentials, SmtpSettings};
use crate::email::{format_date, OutgoingEmail};
use crate::errors::{ConnectivityError, SendError, SmtpError};
use crate::logger::Logger;
use crate::transport::{MailMessage, MailTransport, SentMessage, TransportFactory};

const CLIENT_NAME: &str = "127.0.0.1";

/// Reply code of a complete SMTP reply (`250 OK`, or the last line of `250-…`).
pub fn reply_code(reply: &str) -> Option<u16> {
    let last = reply.lines().rev().find(|l| !l.is_empty())?;
    last.get(..3)?.parse().ok()
}

/// A reply is complete once its last line is not a `NNN-` continuation.
/// Works on raw bytes so a read may end inside a multibyte character.
pub fn is_complete_reply(buffer: &[u8]) -> bool {
    if !buffer.ends_with(b"\n") {
        return false;
    }
    match buffer
        .split(|&b| b == b'\n')
        .rev()
        .find(|l| !l.is_empty() && *l != b"\r")
    {
        Some(last) => last.get(3) != Some(&b'-'),
        None => false,
    }
}

/// Server capabilities advertised in the EHLO reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub auth: Vec<AuthType>,
    pub start_tls: bool,
}

impl Capabilities {
    pub fn parse(ehlo_reply: &str) -> Self {
        let mut caps = Self::default();
        for line in ehlo_reply.lines() {
            let keywords = line.get(4..).unwrap_or("").to_ascii_uppercase();
            let mut words = keywords.split_whitespace();
            match words.next() {
                Some("STARTTLS") => caps.start_tls = true,
                Some("AUTH") => {
                    for mechanism in words {
                        match mechanism {
                            "PLAIN" => caps.auth.push(AuthType::Plain),
                            "LOGIN" => caps.auth.push(AuthType::Login),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
        caps
    }

    /// First mechanism in `preferred` order the server also supports.
    pub fn choose_auth(&self, preferred: &[AuthType]) -> Option<AuthType> {
        preferred.iter().copied().find(|a| self.auth.contains(a))
    }
}

/// Creates [`SmtpTransport`]s.
#[derive(Debug, Clone)]
pub struct SmtpTransportFactory {
    logger: Logger,
}

impl SmtpTransportFactory {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl TransportFactory for SmtpTransportFactory {
    type Transport = SmtpTransport;

    fn create(&self, settings: &SmtpSettings) -> SmtpTransport {
        SmtpTransport::new(settings.clone(), self.logger.clone())
    }
}

/// SMTP transport; the session opened by `verify` is reused by `send`.
pub struct SmtpTransport {
    settings: SmtpSettings,
    logger: Logger,
    session: Option<SmtpSession>,
}

impl SmtpTransport {
    pub fn new(settings: SmtpSettings, logger: Logger) -> Self {
        let logger = logger.scoped(format!("[smtp:{}:{}] ", settings.host, settings.port));
        Self {
            settings,
            logger,
            session: None,
        }
    }

    async fn session(&mut self) -> Result<&mut SmtpSession, SmtpError> {
        if self.session.is_none() {
            let session = SmtpSession::connect(&self.settings, self.logger.clone()).await?;
            self.session = Some(session);
        }
        self.session
            .as_mut()
            .ok_or_else(|| SmtpError::Connection("session not established".into()))
    }

    async fn deliver(&mut self, message: &MailMessage) -> Result<SentMessage, SmtpError> {
        let email = OutgoingEmail::new(message, format_date(worker::Date::now().as_millis()));
        let session = self.session().await?;
        session.mail_from(&email.from).await?;
        session.rcpt_to(&email.to).await?;
        session.data(&email.get_email_data()).await?;
        Ok(SentMessage {
            message_id: email.message_id,
        })
    }
}

#[async_trait(?Send)]
impl MailTransport for SmtpTransport {
    async fn verify(&mut self) -> Result<(), ConnectivityError> {
        self.session().await?;
        Ok(())
    }

    async fn send(&mut self, message: &MailMessage) -> Result<SentMessage, SendError> {
        let result = self.deliver(message).await;
        if let Some(mut session) = self.session.take() {
            session.quit().await;
        }
        let sent = result?;
        self.logger.info(&format!("Message {} accepted for {}", sent.message_id, message.to));
        Ok(sent)
    }
}

/// An authenticated SMTP conversation.
struct SmtpSession {
    socket: Socket,
    logger: Logger,
}

impl SmtpSession {
    /// Connect, greet, EHLO, optional STARTTLS, AUTH.
    async fn connect(settings: &SmtpSettings, logger: Logger) -> Result<Self, SmtpError> {
        let use_start_tls = !settings.secure && settings.start_tls;
        let transport = if settings.secure {
            SecureTransport::On
        } else if use_start_tls {
            SecureTransport::StartTls
        } else {
            SecureTransport::Off
        };
        let socket = ConnectionBuilder::new()
            .secure_transport(transport)
            .allow_half_open(false)
            .connect(settings.host.clone(), settings.port)?;

        let mut session = Self { socket, logger };

        let greeting = session
            .read_reply()
            .await
            .map_err(|e| SmtpError::Connection(e.to_string()))?;
        if reply_code(&greeting) != Some(220) {
            return Err(SmtpError::Connection(format!("unexpected greeting: {}", greeting.trim())));
        }

        let mut caps = session.ehlo().await?;
        if use_start_tls && caps.start_tls {
            session.command("STARTTLS", "STARTTLS", 2).await?;
            session.socket = session.socket.start_tls();
            caps = session.ehlo().await?;
        }

        session.auth(&caps, settings).await?;
        session.logger.debug("Session ready");
        Ok(session)
    }

    async fn read_reply(&mut self) -> Result<String, SmtpError> {
        let mut buf = vec![0u8; 4096];
        let mut raw = Vec::new();
        loop {
            let n = self.socket.read(&mut buf).await?;
            if n == 0 {
                if raw.is_empty() {
                    return Err(SmtpError::Protocol("connection closed by server".into()));
                }
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            if is_complete_reply(&raw) {
                break;
            }
        }
        let reply = String::from_utf8_lossy(&raw).into_owned();
        self.logger.debug(&format!("S: {}", reply.trim_end()));
        Ok(reply)
    }

    async fn write_line(&mut self, line: &str) -> Result<(), SmtpError> {
        self.logger.debug(&format!("C: {}", line));
        self.write_raw(&format!("{}\r\n", line)).await
    }

    async fn write_raw(&mut self, data: &str) -> Result<(), SmtpError> {
        self.socket.write_all(data.as_bytes()).await?;
        self.socket.flush().await?;
        Ok(())
    }

    /// Sends `line` and expects a reply in the `class`xx range.
    async fn command(
        &mut self,
        line: &str,
        name: &'static str,
        class: u16,
    ) -> Result<String, SmtpError> {
        self.write_line(line).await?;
        self.expect(name, class).await
    }

    async fn expect(&mut self, name: &'static str, class: u16) -> Result<String, SmtpError> {
        let reply = self.read_reply().await?;
        match reply_code(&reply) {
            Some(code) if code / 100 == class => Ok(reply),
            Some(code) => Err(SmtpError::Rejected {
                command: name,
                code,
                reply: reply.trim().to_string(),
            }),
            None => Err(SmtpError::Protocol(format!("{}: {}", name, reply.trim()))),
        }
    }

    async fn ehlo(&mut self) -> Result<Capabilities, SmtpError> {
        self.write_line(&format!("EHLO {}", CLIENT_NAME)).await?;
        let reply = self.read_reply().await?;
        match reply_code(&reply) {
            Some(code) if code / 100 == 2 => Ok(Capabilities::parse(&reply)),
            Some(421) => Err(SmtpError::Connection(format!("EHLO: {}", reply.trim()))),
            _ => {
                self.command(&format!("HELO {}", CLIENT_NAME), "HELO", 2)
                    .await
                    .map_err(|e| SmtpError::Connection(e.to_string()))?;
                Ok(Capabilities::default())
            }
        }
    }

    async fn auth(&mut self, caps: &Capabilities, settings: &SmtpSettings) -> Result<(), SmtpError> {
        let creds = &settings.credentials;
        let result = match caps.choose_auth(&settings.auth_type) {
            Some(AuthType::Plain) => self.auth_plain(creds).await,
            Some(AuthType::Login) => self.auth_login(creds).await,
            None => return Err(SmtpError::Auth("no supported auth method".into())),
        };
        result.map_err(|e| match e {
            SmtpError::Rejected { reply, .. } => SmtpError::Auth(reply),
            other => other,
        })
    }

    async fn auth_plain(&mut self, creds: &Credentials) -> Result<(), SmtpError> {
        let blob = format!("\u{0}{}\u{0}{}", creds.username, creds.password);
        self.logger.debug("C: AUTH PLAIN <redacted>");
        self.write_raw(&format!("AUTH PLAIN {}\r\n", B64.encode(blob.as_bytes())))
            .await?;
        self.expect("AUTH PLAIN", 2).await?;
        Ok(())
    }

    async fn auth_login(&mut self, creds: &Credentials) -> Result<(), SmtpError> {
        self.command("AUTH LOGIN", "AUTH LOGIN", 3).await?;
        self.write_line(&B64.encode(creds.username.as_bytes())).await?;
        self.expect("AUTH LOGIN", 3).await?;
        self.logger.debug("C: <redacted>");
        self.write_raw(&format!("{}\r\n", B64.encode(creds.password.as_bytes())))
            .await?;
        self.expect("AUTH LOGIN", 2).await?;
        Ok(())
    }

    async fn mail_from(&mut self, from: &str) -> Result<(), SmtpError> {
        self.command(&format!("MAIL FROM:<{}>", from), "MAIL FROM", 2)
            .await?;
        Ok(())
    }

    async fn rcpt_to(&mut self, to: &str) -> Result<(), SmtpError> {
        self.command(&format!("RCPT TO:<{}>", to), "RCPT TO", 2).await?;
        Ok(())
    }

    async fn data(&mut self, email_data: &str) -> Result<(), SmtpError> {
        self.command("DATA", "DATA", 3).await?;
        self.logger.debug(&format!("C: <{} bytes of message data>", email_data.len()));
        self.write_raw(email_data).await?;
        self.expect("DATA", 2).await?;
        Ok(())
    }

    /// Best effort; the session is discarded either way.
    async fn quit(&mut self) {
        if self.command("QUIT", "QUIT", 2).await.is_err() {
            self.logger.debug("QUIT not acknowledged");
        }
        if let Err(e) = self.socket.close().await {
            self.logger.debug(&format!("close failed: {}", e));
        }
    }
}
