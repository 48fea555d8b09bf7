//! Email address check and the text encodings used on the wire.

use regex::Regex;
use std::sync::OnceLock;

/// `local@domain.tld`: no whitespace, exactly one `@`, a dot after it.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
}

/// Validates the basic shape of an email address.
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Quoted-printable encoding (RFC 2045). Encoded lines, soft break `=`
/// included, stay within `line_length`; callers pass the 76 column limit.
pub fn encode_quoted_printable(text: &str, line_length: usize) -> String {
    let bytes = text.as_bytes();
    let mut result = String::new();
    let mut current_line_length = 0;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        let encoded: String = if byte == 0x0a {
            result.push_str("\r\n");
            current_line_length = 0;
            i += 1;
            continue;
        } else if byte == 0x0d {
            if i + 1 < bytes.len() && bytes[i + 1] == 0x0a {
                result.push_str("\r\n");
                current_line_length = 0;
                i += 2;
                continue;
            }
            "=0D".to_string()
        } else {
            let is_whitespace = byte == 0x20 || byte == 0x09;
            let next_is_line_break =
                i + 1 >= bytes.len() || bytes[i + 1] == 0x0a || bytes[i + 1] == 0x0d;
            let needs_encoding = (byte < 32 && !is_whitespace)
                || byte > 126
                || byte == b'='
                || (is_whitespace && next_is_line_break);

            if needs_encoding {
                format!("={:02X}", byte)
            } else {
                char::from(byte).to_string()
            }
        };

        if current_line_length + encoded.len() > line_length.saturating_sub(3) {
            result.push_str("=\r\n");
            current_line_length = 0;
        }
        result.push_str(&encoded);
        current_line_length += encoded.len();
        i += 1;
    }

    result
}

/// RFC 2047 header encoding (UTF-8 Q). Plain printable ASCII is kept as is;
/// anything with non-ASCII or control characters (CR/LF included) is encoded
/// so it cannot break out of its header line.
pub fn encode_header(text: &str) -> String {
    if text.bytes().all(|b| b == b' ' || b == b'\t' || (33..=126).contains(&b)) {
        return text.to_string();
    }
    let mut encoded = String::new();
    for &byte in text.as_bytes() {
        if (33..=126).contains(&byte) && byte != b'?' && byte != b'=' && byte != b'_' {
            encoded.push(char::from(byte));
        } else if byte == b' ' {
            encoded.push('_');
        } else {
            encoded.push_str(&format!("={:02X}", byte));
        }
    }
    format!("=?UTF-8?Q?{}?=", encoded)
}

/// Escapes lines starting with `.` so they cannot end the DATA section.
pub fn apply_dot_stuffing(data: &str) -> String {
    let mut result = data.replace("\r\n.", "\r\n..");
    if result.starts_with('.') {
        result.insert(0, '.');
    }
    result
}
