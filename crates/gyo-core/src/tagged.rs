// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tagged-value scheme for payloads that plain JSON cannot carry.
//
// Errors and dates are sent as records with a `__type` discriminator:
//
//   { "__type": "Error", "name": "TypeError", "message": "x", "stack": "..." }
//   { "__type": "Date",  "value": "2026-01-01T00:00:00.000Z" }
//
// Both sides use the same records, so a tagged value passes through a handler
// and back without losing its tag.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator key used on the wire.
pub const TYPE_KEY: &str = "__type";

/// A value that needs a tagged record on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type")]
pub enum Tagged {
    Error {
        #[serde(default = "default_error_name")]
        name: String,
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
    /// `value` is kept as received; use [`Tagged::as_datetime`] to parse it.
    Date { value: String },
}

fn default_error_name() -> String {
    "Error".into()
}

impl Tagged {
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// ISO-8601 with millisecond precision and a `Z` suffix, the same shape
    /// the content runtime produces.
    pub fn date(at: DateTime<Utc>) -> Self {
        Self::Date {
            value: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Recognise a tagged record. Unknown `__type` values and untagged
    /// values yield `None`.
    pub fn decode(value: &Value) -> Option<Self> {
        let tag = value.as_object()?.get(TYPE_KEY)?.as_str()?;
        if tag != "Error" && tag != "Date" {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        // Both variants are plain string records; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date { value } => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::Error { .. } => None,
        }
    }
}

impl std::fmt::Display for Tagged {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error { name, message, .. } => write!(f, "{name}: {message}"),
            Self::Date { value } => f.write_str(value),
        }
    }
}

/// Render one value as a fragment of a human-readable line.
///
/// Strings are written raw, tagged records through their `Display`, and
/// everything else as compact JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".into(),
        other => match Tagged::decode(other) {
            Some(tagged) => tagged.to_string(),
            None => other.to_string(),
        },
    }
}

/// Join several values with single spaces, the way a console prints its
/// arguments.
pub fn format_line(args: &[Value]) -> String {
    args.iter().map(display).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn error_record_shape() {
        let v = Tagged::error("TypeError", "x").to_value();
        assert_eq!(v, json!({ "__type": "Error", "name": "TypeError", "message": "x" }));
    }

    #[test]
    fn date_matches_content_runtime_format() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        let v = Tagged::date(at).to_value();
        assert_eq!(v, json!({ "__type": "Date", "value": "2026-03-01T12:30:00.000Z" }));
        assert_eq!(Tagged::decode(&v).unwrap().as_datetime(), Some(at));
    }

    #[test]
    fn decode_fills_missing_error_fields() {
        let t = Tagged::decode(&json!({ "__type": "Error" })).unwrap();
        assert_eq!(t.to_string(), "Error: ");
    }

    #[test]
    fn unknown_tags_are_not_decoded() {
        assert!(Tagged::decode(&json!({ "__type": "Map", "entries": [] })).is_none());
        assert!(Tagged::decode(&json!({ "name": "x" })).is_none());
        assert!(Tagged::decode(&json!("Error")).is_none());
    }

    #[test]
    fn line_formatting() {
        let line = format_line(&[
            json!("hello"),
            json!(42),
            json!(null),
            json!({ "__type": "Error", "name": "TypeError", "message": "x" }),
            json!({ "a": [1, 2] }),
        ]);
        assert_eq!(line, r#"hello 42 null TypeError: x {"a":[1,2]}"#);
    }
}
