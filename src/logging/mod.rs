use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum LogLevel {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Verbose = 5,
}

impl LogLevel {
    pub fn from_config_value(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "verbose" | "trace" => Some(Self::Verbose),
            _ => None,
        }
    }

    fn label(self, colored: bool) -> &'static str {
        match (self, colored) {
            (Self::Error, false) => "ERROR",
            (Self::Warn, false) => "WARN",
            (Self::Info, false) => "INFO",
            (Self::Debug, false) => "DEBUG",
            (Self::Verbose, false) => "VERBOSE",
            (Self::Error, true) => "\x1b[31mERROR\x1b[0m",
            (Self::Warn, true) => "\x1b[33mWARN\x1b[0m",
            (Self::Info, true) => "\x1b[32mINFO\x1b[0m",
            (Self::Debug, true) => "\x1b[36mDEBUG\x1b[0m",
            (Self::Verbose, true) => "\x1b[35mVERBOSE\x1b[0m",
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub human_friendly: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            human_friendly: false,
        }
    }
}

pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &str);
}

#[derive(Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_line(&self, line: &str) {
        let _ = writeln!(io::stdout().lock(), "{line}");
    }
}

/// Line-oriented logger shared by the spool, storage and replay paths.
///
/// Lines look like `2026-01-01T00:00:00.000Z [INFO] [storage::init] message payload={..}`.
#[derive(Clone)]
pub struct Logger {
    config: LoggerConfig,
    sink: Arc<dyn LogSink>,
}

impl Logger {
    pub fn new(config: LoggerConfig) -> Self {
        Self::with_sink(config, Arc::new(StdoutSink))
    }

    pub fn with_sink(config: LoggerConfig, sink: Arc<dyn LogSink>) -> Self {
        Self { config, sink }
    }

    pub fn error(&self, context: &str, message: &str) {
        self.log(LogLevel::Error, context, message, None);
    }

    pub fn warn(&self, context: &str, message: &str) {
        self.log(LogLevel::Warn, context, message, None);
    }

    pub fn info(&self, context: &str, message: &str) {
        self.log(LogLevel::Info, context, message, None);
    }

    pub fn debug(&self, context: &str, message: &str) {
        self.log(LogLevel::Debug, context, message, None);
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.config.min_level
    }

    pub fn log(&self, level: LogLevel, context: &str, message: &str, payload: Option<Value>) {
        if !self.enabled(level) {
            return;
        }

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut line = format!(
            "{timestamp} [{}]",
            level.label(self.config.human_friendly)
        );
        if !context.is_empty() {
            line.push_str(&format!(" [{context}]"));
        }
        line.push(' ');
        line.push_str(message);
        if let Some(payload) = payload {
            line.push_str(&format!(" payload={payload}"));
        }

        self.sink.write_line(&line);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("config", &self.config)
            .field("sink", &"<dyn LogSink>")
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::{LogLevel, LogSink, Logger, LoggerConfig};

    #[derive(Default)]
    pub(crate) struct MemorySink {
        pub(crate) lines: Mutex<Vec<String>>,
    }

    impl LogSink for MemorySink {
        fn write_line(&self, line: &str) {
            self.lines
                .lock()
                .expect("memory sink mutex poisoned")
                .push(line.to_owned());
        }
    }

    pub(crate) fn memory_logger(min_level: LogLevel) -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let logger = Logger::with_sink(
            LoggerConfig {
                min_level,
                human_friendly: false,
            },
            sink.clone(),
        );
        (logger, sink)
    }

    #[test]
    fn parses_config_levels() {
        assert_eq!(LogLevel::from_config_value("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_config_value(" WARN "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_config_value("verbose"), Some(LogLevel::Verbose));
        assert_eq!(LogLevel::from_config_value("loud"), None);
    }

    #[test]
    fn threshold_filters_lower_priority_lines() {
        let (logger, sink) = memory_logger(LogLevel::Info);

        logger.info("tests::logger", "kept");
        logger.debug("tests::logger", "dropped");

        let lines = sink.lines.lock().expect("memory sink mutex poisoned");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[INFO] [tests::logger] kept"));
    }

    #[test]
    fn log_supports_optional_json_payload() {
        let (logger, sink) = memory_logger(LogLevel::Debug);

        logger.log(
            LogLevel::Warn,
            "tests::payload",
            "record skipped",
            Some(json!({"offset": 3, "size": 12})),
        );

        let lines = sink.lines.lock().expect("memory sink mutex poisoned");
        assert!(lines[0].contains("[WARN]"));
        assert!(lines[0].ends_with("record skipped payload={\"offset\":3,\"size\":12}"));
        assert!(lines[0].starts_with("20"));
    }

    #[test]
    fn human_friendly_mode_colors_levels() {
        let sink = Arc::new(MemorySink::default());
        let logger = Logger::with_sink(
            LoggerConfig {
                min_level: LogLevel::Error,
                human_friendly: true,
            },
            sink.clone(),
        );

        logger.error("", "boom");

        let lines = sink.lines.lock().expect("memory sink mutex poisoned");
        assert!(lines[0].contains("\x1b[31mERROR\x1b[0m] boom"));
    }
}
