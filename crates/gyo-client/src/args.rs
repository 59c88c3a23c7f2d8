// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Console argument serialization policy.
//
// Primitives pass through. Errors and timestamps become tagged records so the
// native side can print them sensibly. Anything that cannot be represented as
// JSON degrades to its display string rather than failing the whole line.

use std::fmt::{Debug, Display};

use chrono::{DateTime, Utc};
use gyo_core::tagged::Tagged;
use serde::Serialize;
use serde_json::{Number, Value};

/// One console argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Error {
        name: String,
        message: String,
        stack: Option<String>,
    },
    Date(DateTime<Utc>),
    Json(Value),
    /// Pre-rendered text for values with no JSON form.
    Display(String),
}

impl Arg {
    /// Capture an error: name from the Rust type, message from `Display`,
    /// and the `source()` chain as the stack.
    pub fn error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        let full = std::any::type_name::<E>();
        let base = full.split('<').next().unwrap_or(full);
        let name = base.rsplit("::").next().unwrap_or(base).to_owned();

        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {cause}"));
            source = cause.source();
        }

        Self::Error {
            name,
            message: err.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }

    /// Serialize any value, falling back to its `Debug` form when it has no
    /// JSON representation.
    pub fn serialize<T: Serialize + Debug + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => Self::Json(v),
            Err(_) => Self::Display(format!("{value:?}")),
        }
    }

    pub fn display(value: impl Display) -> Self {
        Self::Display(value.to_string())
    }

    /// Stack text, for error arguments that carry one.
    pub fn stack(&self) -> Option<&str> {
        match self {
            Self::Error { stack, .. } => stack.as_deref(),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Int(n) => Value::from(n),
            Self::Float(f) => match Number::from_f64(f) {
                Some(n) => Value::Number(n),
                None => Value::String(non_finite(f).into()),
            },
            Self::Str(s) | Self::Display(s) => Value::String(s),
            Self::Error {
                name,
                message,
                stack,
            } => Tagged::Error {
                name,
                message,
                stack,
            }
            .to_value(),
            Self::Date(at) => Tagged::date(at).to_value(),
            Self::Json(v) => v,
        }
    }
}

fn non_finite(f: f64) -> &'static str {
    if f.is_nan() {
        "NaN"
    } else if f.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Arg {
    fn from(n: i32) -> Self {
        Self::Int(n.into())
    }
}

impl From<i64> for Arg {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u32> for Arg {
    fn from(n: u32) -> Self {
        Self::Int(n.into())
    }
}

impl From<f64> for Arg {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<DateTime<Utc>> for Arg {
    fn from(at: DateTime<Utc>) -> Self {
        Self::Date(at)
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
