// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport seams between the content runtime and the native host.
//
// Content → native: one of two ingress framings, depending on the host
// platform. Android exposes a single string-message function
// (`window.androidBridge.postMessage(json)`); iOS exposes a structured
// message channel (`window.webkit.messageHandlers.gyoBridge`). Both carry the
// same envelope.
//
// Native → content: the three `gyoBridge` entry points installed in the
// content runtime.

use serde_json::Value;

use crate::types::{BridgeResponse, CallbackId};

/// Ingress that accepts the envelope as JSON text.
pub trait StringIngress: Send + Sync {
    fn post_message(&self, message: &str);
}

/// Ingress that accepts the envelope as an already-decoded object.
pub trait StructuredIngress: Send + Sync {
    fn post_structured(&self, message: Value);
}

/// The `resolve` / `reject` / `publish` functions the native side calls into.
///
/// Calls never fail from the caller's point of view: an unknown callback id
/// or a bridge name nobody listens on is a silent no-op in the content
/// runtime.
pub trait ContentEntryPoints: Send + Sync {
    fn resolve(&self, callback_id: &CallbackId, data: Value);

    fn reject(&self, callback_id: &CallbackId, error: &str);

    fn publish(&self, bridge_name: &str, data: Value);

    /// Route an outcome through `resolve` or `reject`.
    fn deliver(&self, response: BridgeResponse) {
        if response.success {
            self.resolve(&response.callback_id, response.data.unwrap_or(Value::Null));
        } else {
            let error = response.error.unwrap_or_else(|| "Unknown error".into());
            self.reject(&response.callback_id, &error);
        }
    }
}
