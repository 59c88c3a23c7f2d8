// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Handler trait implemented by feature-specific native code.

use gyo_core::error::Result;
use serde_json::Value;

/// Native implementation of one bridge's methods.
///
/// Handlers run on the background executor, so they must be `Send + Sync`
/// and must not assume any shared mutable state in the router. A method name
/// the handler does not recognise should return
/// `BridgeError::UnknownMethod(method)`.
///
/// Returning `Err` rejects the caller's call with the error's message. A
/// panic is caught at the dispatch boundary and treated the same way.
pub trait BridgeHandler: Send + Sync {
    fn handle(&self, method: &str, data: &Value) -> Result<Value>;
}

/// Plain functions and closures can serve as handlers.
impl<F> BridgeHandler for F
where
    F: Fn(&str, &Value) -> Result<Value> + Send + Sync,
{
    fn handle(&self, method: &str, data: &Value) -> Result<Value> {
        self(method, data)
    }
}
