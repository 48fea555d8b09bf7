//! Level-filtered logger writing to the Workers console.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Debug = 0,
    #[default]
    Info = 1,
    Warn = 2,
    Error = 3,
    None = 4,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "none" | "off" => Ok(LogLevel::None),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Logger {
    level: LogLevel,
    prefix: String,
}

impl Logger {
    pub fn new(level: LogLevel, prefix: impl Into<String>) -> Self {
        Self {
            level,
            prefix: prefix.into(),
        }
    }

    /// Same level, different prefix.
    pub fn scoped(&self, prefix: impl Into<String>) -> Self {
        Self::new(self.level, prefix)
    }

    pub fn debug(&self, message: &str) {
        if self.level <= LogLevel::Debug {
            self.emit(LogLevel::Debug, message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.level <= LogLevel::Info {
            self.emit(LogLevel::Info, message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.level <= LogLevel::Warn {
            self.emit(LogLevel::Warn, message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.level <= LogLevel::Error {
            self.emit(LogLevel::Error, message);
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn emit(&self, level: LogLevel, message: &str) {
        let line = format!("{}{}", self.prefix, message);
        match level {
            LogLevel::Warn => worker::console_warn!("{}", line),
            LogLevel::Error => worker::console_error!("{}", line),
            _ => worker::console_log!("{}", line),
        }
    }

    // The console bindings only exist inside the Workers runtime.
    #[cfg(not(target_arch = "wasm32"))]
    fn emit(&self, level: LogLevel, message: &str) {
        eprintln!("{:?} {}{}", level, self.prefix, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!(" warn ".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("off".parse::<LogLevel>(), Ok(LogLevel::None));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Error < LogLevel::None);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }
}
