//! Relay configuration read once per invocation from the Worker environment.
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `GMAIL_USER` | Yes | sender account |
//! | `GMAIL_APP_PASSWORD` | Yes | secret for the sender account |
//! | `SMTP_HOST` | No | `smtp.gmail.com` |
//! | `SMTP_PORT` | No | `465` |
//! | `SMTP_SECURE` | No | `true` (implicit TLS) |
//! | `SMTP_START_TLS` | No | `true` |
//! | `SMTP_AUTH` | No | `plain,login` |
//! | `LOG_LEVEL` | No | `info` |

use crate::errors::ConfigError;
use crate::logger::{LogLevel, Logger};

pub const SENDER_VAR: &str = "GMAIL_USER";
pub const PASSWORD_VAR: &str = "GMAIL_APP_PASSWORD";

const DEFAULT_HOST: &str = "smtp.gmail.com";
const DEFAULT_PORT: u16 = 465;

/// SASL mechanisms the SMTP client can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    Plain,
    Login,
}

impl AuthType {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Some(AuthType::Plain),
            "login" => Some(AuthType::Login),
            _ => None,
        }
    }
}

/// SMTP credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything the relay may be configured with; credentials may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub sender: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub start_tls: bool,
    pub auth_type: Vec<AuthType>,
    pub log_level: LogLevel,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            sender: None,
            password: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            secure: true,
            start_tls: true,
            auth_type: vec![AuthType::Plain, AuthType::Login],
            log_level: LogLevel::Info,
        }
    }
}

/// Validated settings a transport is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub start_tls: bool,
    pub auth_type: Vec<AuthType>,
    pub credentials: Credentials,
}

impl SmtpSettings {
    pub fn sender(&self) -> &str {
        &self.credentials.username
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl RelayConfig {
    /// Builds a config from a variable lookup (Worker vars and secrets).
    ///
    /// Unparseable optional values keep their defaults and are reported
    /// through `logger`.
    pub fn from_lookup<F>(lookup: F, logger: &Logger) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| non_empty(lookup(name));

        let log_level = match get("LOG_LEVEL") {
            Some(v) => v.parse().unwrap_or_else(|e| {
                logger.warn(&format!("{}, using {:?}", e, defaults.log_level));
                defaults.log_level
            }),
            None => defaults.log_level,
        };

        let port = match get("SMTP_PORT") {
            Some(v) => v.trim().parse().unwrap_or_else(|_| {
                logger.warn(&format!("invalid SMTP_PORT '{}', using {}", v, defaults.port));
                defaults.port
            }),
            None => defaults.port,
        };

        let flag = |name: &str, default: bool| match get(name) {
            Some(v) => parse_bool(&v).unwrap_or_else(|| {
                logger.warn(&format!("invalid {} '{}', using {}", name, v, default));
                default
            }),
            None => default,
        };

        let auth_type = match get("SMTP_AUTH") {
            Some(v) => {
                let parsed: Vec<AuthType> = v.split(',').filter_map(AuthType::parse).collect();
                if parsed.is_empty() {
                    logger.warn(&format!("no known mechanism in SMTP_AUTH '{}'", v));
                    defaults.auth_type.clone()
                } else {
                    parsed
                }
            }
            None => defaults.auth_type.clone(),
        };

        Self {
            sender: get(SENDER_VAR),
            password: get(PASSWORD_VAR),
            host: get("SMTP_HOST").unwrap_or(defaults.host),
            port,
            secure: flag("SMTP_SECURE", defaults.secure),
            start_tls: flag("SMTP_START_TLS", defaults.start_tls),
            auth_type,
            log_level,
        }
    }

    /// Reads the Worker environment; secrets win over plain vars of the same name.
    pub fn from_env(env: &worker::Env, logger: &Logger) -> Self {
        Self::from_lookup(
            |name| {
                env.secret(name)
                    .map(|v| v.to_string())
                    .or_else(|_| env.var(name).map(|v| v.to_string()))
                    .ok()
            },
            logger,
        )
    }

    /// Configuration guard: both sender and secret must be present.
    pub fn settings(&self) -> Result<SmtpSettings, ConfigError> {
        let username = non_empty(self.sender.clone()).ok_or(ConfigError::Missing(SENDER_VAR))?;
        let password = non_empty(self.password.clone()).ok_or(ConfigError::Missing(PASSWORD_VAR))?;
        Ok(SmtpSettings {
            host: self.host.clone(),
            port: self.port,
            secure: self.secure,
            start_tls: self.start_tls,
            auth_type: self.auth_type.clone(),
            credentials: Credentials { username, password },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn quiet() -> Logger {
        Logger::new(LogLevel::None, "")
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::from_lookup(lookup(&[]), &quiet());
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.host, "smtp.gmail.com");
        assert_eq!(config.port, 465);
    }

    #[test]
    fn test_reads_all_vars() {
        let config = RelayConfig::from_lookup(
            lookup(&[
                ("GMAIL_USER", "me@example.com"),
                ("GMAIL_APP_PASSWORD", "secret"),
                ("SMTP_HOST", "smtp.example.com"),
                ("SMTP_PORT", "587"),
                ("SMTP_SECURE", "false"),
                ("SMTP_START_TLS", "yes"),
                ("SMTP_AUTH", "login"),
                ("LOG_LEVEL", "debug"),
            ]),
            &quiet(),
        );
        assert_eq!(config.sender.as_deref(), Some("me@example.com"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 587);
        assert!(!config.secure);
        assert!(config.start_tls);
        assert_eq!(config.auth_type, vec![AuthType::Login]);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = RelayConfig::from_lookup(
            lookup(&[
                ("SMTP_PORT", "not-a-port"),
                ("SMTP_SECURE", "maybe"),
                ("SMTP_AUTH", "cram-md5"),
                ("LOG_LEVEL", "loud"),
            ]),
            &quiet(),
        );
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_guard_requires_both_credentials() {
        let mut config = RelayConfig::default();
        assert_eq!(config.settings(), Err(ConfigError::Missing("GMAIL_USER")));

        config.sender = Some("me@example.com".into());
        assert_eq!(config.settings(), Err(ConfigError::Missing("GMAIL_APP_PASSWORD")));

        config.password = Some(String::new());
        assert_eq!(config.settings(), Err(ConfigError::Missing("GMAIL_APP_PASSWORD")));

        config.password = Some("secret".into());
        let settings = config.settings().unwrap();
        assert_eq!(settings.sender(), "me@example.com");
        assert_eq!(settings.credentials.password, "secret");
    }

    #[test]
    fn test_empty_vars_are_missing() {
        let config = RelayConfig::from_lookup(lookup(&[("GMAIL_USER", "")]), &quiet());
        assert_eq!(config.sender, None);
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            username: "me".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
