// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Console bridge: forwards the web console into the native log.
//
// The content runtime calls `log` with `{ level, args, timestamp }`. Args are
// formatted into one line (tagged errors as `Name: message`, tagged dates as
// their ISO string) and written at a severity derived from `level`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gyo_core::error::{BridgeError, Result};
use gyo_core::tagged::format_line;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::handler::BridgeHandler;

pub use gyo_core::types::CONSOLE_BRIDGE;

/// Native severity a console line is written at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleSeverity {
    Error,
    Warn,
    Info,
    Debug,
}

impl ConsoleSeverity {
    /// `error`→Error, `warn`→Warn, `debug`→Debug, anything else→Info.
    pub fn from_level(level: &str) -> Self {
        match level {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            _ => Self::Info,
        }
    }
}

/// The host's logging facility.
pub trait ConsoleSink: Send + Sync {
    fn write(&self, severity: ConsoleSeverity, line: &str, entry: &ConsoleEntry);
}

/// Writes console lines as `tracing` events under the `web_console` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ConsoleSink for TracingSink {
    fn write(&self, severity: ConsoleSeverity, line: &str, entry: &ConsoleEntry) {
        let console_level = entry.level.as_str();
        let issued_at = entry.issued_at().map(|t| t.to_rfc3339());
        let at = issued_at.as_deref();
        match severity {
            ConsoleSeverity::Error => match entry.stack.as_deref() {
                Some(stack) => {
                    tracing::error!(target: "web_console", console_level, at, stack, "{line}")
                }
                None => tracing::error!(target: "web_console", console_level, at, "{line}"),
            },
            ConsoleSeverity::Warn => {
                tracing::warn!(target: "web_console", console_level, at, "{line}")
            }
            ConsoleSeverity::Info => {
                tracing::info!(target: "web_console", console_level, at, "{line}")
            }
            ConsoleSeverity::Debug => {
                tracing::debug!(target: "web_console", console_level, at, "{line}")
            }
        }
    }
}

/// Payload of one `log` call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsoleEntry {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub args: Vec<Value>,
    /// Milliseconds since the Unix epoch, as issued by the content runtime.
    #[serde(default)]
    pub timestamp: Option<f64>,
    /// Stack of the first argument when an error is logged.
    #[serde(default)]
    pub stack: Option<String>,
}

fn default_level() -> String {
    "log".into()
}

impl ConsoleEntry {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
    }
}

/// Handler for the [`CONSOLE_BRIDGE`] bridge.
#[derive(Clone)]
pub struct ConsoleBridgeHandler {
    sink: Arc<dyn ConsoleSink>,
}

impl Default for ConsoleBridgeHandler {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl ConsoleBridgeHandler {
    pub fn new(sink: Arc<dyn ConsoleSink>) -> Self {
        Self { sink }
    }

    fn log(&self, data: &Value) -> Result<Value> {
        let entry: ConsoleEntry = if data.is_null() {
            serde_json::from_value(json!({}))?
        } else {
            serde_json::from_value(data.clone())?
        };
        let line = format_line(&entry.args);
        self.sink
            .write(ConsoleSeverity::from_level(&entry.level), &line, &entry);
        Ok(json!({ "success": true }))
    }
}

impl BridgeHandler for ConsoleBridgeHandler {
    fn handle(&self, method: &str, data: &Value) -> Result<Value> {
        match method {
            "log" => self.log(data),
            other => Err(BridgeError::UnknownMethod(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Lines(Mutex<Vec<(ConsoleSeverity, String)>>);

    impl ConsoleSink for Lines {
        fn write(&self, severity: ConsoleSeverity, line: &str, _entry: &ConsoleEntry) {
            self.0.lock().unwrap().push((severity, line.to_owned()));
        }
    }

    fn handler() -> (ConsoleBridgeHandler, Arc<Lines>) {
        let lines = Arc::new(Lines::default());
        (ConsoleBridgeHandler::new(lines.clone()), lines)
    }

    #[test]
    fn warn_line_with_primitives() {
        let (h, lines) = handler();
        let out = h
            .handle("log", &json!({ "level": "warn", "args": ["hello", 42] }))
            .unwrap();
        assert_eq!(out, json!({ "success": true }));
        assert_eq!(
            *lines.0.lock().unwrap(),
            vec![(ConsoleSeverity::Warn, "hello 42".to_owned())]
        );
    }

    #[test]
    fn tagged_error_is_formatted() {
        let (h, lines) = handler();
        h.handle(
            "log",
            &json!({
                "level": "error",
                "args": [{ "__type": "Error", "name": "TypeError", "message": "x" }]
            }),
        )
        .unwrap();
        let (severity, line) = lines.0.lock().unwrap()[0].clone();
        assert_eq!(severity, ConsoleSeverity::Error);
        assert!(line.contains("TypeError: x"));
    }

    #[test]
    fn severity_mapping() {
        assert_eq!(ConsoleSeverity::from_level("error"), ConsoleSeverity::Error);
        assert_eq!(ConsoleSeverity::from_level("warn"), ConsoleSeverity::Warn);
        assert_eq!(ConsoleSeverity::from_level("debug"), ConsoleSeverity::Debug);
        assert_eq!(ConsoleSeverity::from_level("log"), ConsoleSeverity::Info);
        assert_eq!(ConsoleSeverity::from_level("trace"), ConsoleSeverity::Info);
    }

    #[test]
    fn empty_payload_logs_empty_line() {
        let (h, lines) = handler();
        h.handle("log", &Value::Null).unwrap();
        assert_eq!(
            *lines.0.lock().unwrap(),
            vec![(ConsoleSeverity::Info, String::new())]
        );
    }

    #[test]
    fn other_methods_are_unknown() {
        let (h, _) = handler();
        let err = h.handle("clear", &Value::Null).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownMethod(ref m) if m == "clear"));
    }

    #[test]
    fn bad_payload_is_a_handler_failure() {
        let (h, lines) = handler();
        assert!(h.handle("log", &json!({ "args": "not a list" })).is_err());
        assert!(lines.0.lock().unwrap().is_empty());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn tracing_sink_writes_at_mapped_level() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            ConsoleBridgeHandler::default()
                .handle("log", &json!({ "level": "warn", "args": ["hello", 42], "timestamp": 0 }))
                .unwrap();
        });

        let out = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("WARN"));
        assert!(out.contains("web_console"));
        assert!(out.contains("hello 42"));
    }
}
