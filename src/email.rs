//! Renders a [`MailMessage`] as the text sent after `DATA`.

use chrono::{DateTime, Utc};

use crate::transport::MailMessage;
use crate::utils::{apply_dot_stuffing, encode_header, encode_quoted_printable};

const LINE_LENGTH: usize = 76;

/// RFC 5322 `Date` value for a Unix timestamp in milliseconds.
pub fn format_date(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_default()
        .to_rfc2822()
}

/// A message with its generated headers, ready for the wire.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub message_id: String,
    headers: Vec<(&'static str, String)>,
    text: String,
}

impl OutgoingEmail {
    /// `date` is the formatted `Date` header value.
    pub fn new(message: &MailMessage, date: impl Into<String>) -> Self {
        let domain = message.from.split('@').nth(1).unwrap_or("localhost");
        let message_id = format!("<{}@{}>", uuid::Uuid::new_v4(), domain);

        let headers = vec![
            ("From", message.from.clone()),
            ("To", message.to.clone()),
            ("Subject", encode_header(&message.subject)),
            ("Date", date.into()),
            ("Message-ID", message_id.clone()),
            ("MIME-Version", "1.0".to_string()),
            ("Content-Type", "text/plain; charset=\"UTF-8\"".to_string()),
            ("Content-Transfer-Encoding", "quoted-printable".to_string()),
        ];

        Self {
            from: message.from.clone(),
            to: message.to.clone(),
            message_id,
            headers,
            text: message.text.clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Raw message including the final CRLF.CRLF.
    pub fn get_email_data(&self) -> String {
        let mut data = String::new();
        for (name, value) in &self.headers {
            data.push_str(&format!("{}: {}\r\n", name, value));
        }
        data.push_str("\r\n");
        data.push_str(&encode_quoted_printable(&self.text, LINE_LENGTH));
        data.push_str("\r\n");

        format!("{}.\r\n", apply_dot_stuffing(&data))
    }
}
