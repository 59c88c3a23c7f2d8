// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire envelopes shared by every platform.
//
// Field names on the wire are camelCase (`bridgeName`, `methodName`,
// `callbackId`) because the content runtime produces them directly from
// script objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result};

/// Bridge name the native console handler is registered under and the
/// content-side console forwarder calls.
pub const CONSOLE_BRIDGE: &str = "gyo-console";

/// Opaque token correlating a request with its eventual response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(pub String);

impl CallbackId {
    /// Build an id from the issuing bridge, its issue time and a monotonic
    /// counter: `{bridge}_{issued_ms}_{counter}`.
    pub fn new(bridge_name: &str, issued_ms: i64, counter: u64) -> Self {
        Self(format!("{bridge_name}_{issued_ms}_{counter}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallbackId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A call from the content runtime into a native handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    pub bridge_name: String,
    pub method_name: String,
    /// Missing on the wire means `null`.
    #[serde(default)]
    pub data: Value,
    pub callback_id: CallbackId,
}

impl BridgeRequest {
    /// Parse the string framing (JSON text).
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| BridgeError::MalformedMessage(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Parse the structured framing (an already-decoded object).
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(BridgeError::MalformedMessage(
                "envelope is not an object".into(),
            ));
        }
        serde_json::from_value(value).map_err(|e| BridgeError::MalformedMessage(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Outcome of one accepted request, produced exactly once by the router.
///
/// It is never put on the wire as a single message; the router renders it
/// through the `resolve` or `reject` entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    pub callback_id: CallbackId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResponse {
    pub fn resolved(callback_id: CallbackId, data: Value) -> Self {
        Self {
            callback_id,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn rejected(callback_id: CallbackId, error: &BridgeError) -> Self {
        Self {
            callback_id,
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }

    pub fn from_result(callback_id: CallbackId, result: Result<Value>) -> Self {
        match result {
            Ok(data) => Self::resolved(callback_id, data),
            Err(e) => Self::rejected(callback_id, &e),
        }
    }
}

/// An unsolicited notification from native code to every listener of a
/// bridge name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeEvent {
    pub bridge_name: String,
    #[serde(default)]
    pub data: Value,
}

impl BridgeEvent {
    pub fn new(bridge_name: impl Into<String>, data: Value) -> Self {
        Self {
            bridge_name: bridge_name.into(),
            data,
        }
    }
}
