// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the gyo bridge.

use thiserror::Error;

const UNKNOWN_BRIDGE_PREFIX: &str = "unknown bridge: ";
const UNKNOWN_METHOD_PREFIX: &str = "unknown method: ";
const TIMEOUT_PREFIX: &str = "bridge method '";
const TIMEOUT_SUFFIX: &str = "' timed out";

/// Top-level error type for all bridge operations.
///
/// The `Display` form of the protocol variants is what travels over the wire
/// in a `reject(callbackId, error)` call, and [`BridgeError::from_rejection`]
/// reverses it on the content side.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Protocol --
    #[error("no native bridge found; not running inside a WebView with bridge support")]
    NoBridgeAvailable,

    #[error("unknown bridge: {0}")]
    UnknownBridge(String),

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// A handler failed; the message is forwarded verbatim.
    #[error("{0}")]
    Handler(String),

    #[error("bridge method '{0}' timed out")]
    Timeout(String),

    #[error("malformed bridge message: {0}")]
    MalformedMessage(String),

    /// The client was destroyed while the call was still pending.
    #[error("bridge destroyed before the call settled")]
    Destroyed,

    // -- Ambient --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Map a rejection string received from the native side back onto the
    /// variant that produced it. Anything unrecognised is a handler failure.
    pub fn from_rejection(message: &str) -> Self {
        if let Some(name) = message.strip_prefix(UNKNOWN_BRIDGE_PREFIX) {
            return Self::UnknownBridge(name.to_owned());
        }
        if let Some(method) = message.strip_prefix(UNKNOWN_METHOD_PREFIX) {
            return Self::UnknownMethod(method.to_owned());
        }
        if let Some(method) = message
            .strip_prefix(TIMEOUT_PREFIX)
            .and_then(|rest| rest.strip_suffix(TIMEOUT_SUFFIX))
        {
            return Self::Timeout(method.to_owned());
        }
        Self::Handler(message.to_owned())
    }

    /// Whether this failure was decided on the content side without any
    /// native involvement.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::NoBridgeAvailable | Self::Timeout(_) | Self::Destroyed
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
