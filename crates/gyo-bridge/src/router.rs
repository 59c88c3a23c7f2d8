// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native message router: one per hosting view and transport channel.
//
// Flow for one inbound message:
//
//   1. Parse and validate the envelope. A malformed envelope is logged and
//      dropped with no response; the caller sees a timeout.
//   2. Look up the bridge name. Unknown names are rejected straight away.
//   3. Run the handler on the background executor, catching errors and
//      panics at this boundary.
//   4. Post the outcome to the UI executor, which delivers it through the
//      content runtime's `resolve` / `reject` entry points.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use gyo_core::error::{BridgeError, Result};
use gyo_core::transport::{ContentEntryPoints, StringIngress, StructuredIngress};
use gyo_core::types::{BridgeRequest, BridgeResponse};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::executor::Executor;
use crate::handler::BridgeHandler;
use crate::registry::SharedRegistry;

/// Routes inbound envelopes to registered handlers and delivers outcomes.
#[derive(Clone)]
pub struct BridgeRouter {
    registry: SharedRegistry,
    content: Arc<dyn ContentEntryPoints>,
    background: Arc<dyn Executor>,
    ui: Arc<dyn Executor>,
}

impl BridgeRouter {
    pub fn new(
        registry: SharedRegistry,
        content: Arc<dyn ContentEntryPoints>,
        background: Arc<dyn Executor>,
        ui: Arc<dyn Executor>,
    ) -> Self {
        Self {
            registry,
            content,
            background,
            ui,
        }
    }

    /// String framing entry point.
    ///
    /// Returns `Err(MalformedMessage)` when the envelope was dropped. Nothing
    /// is delivered to the content runtime in that case.
    pub fn handle_message(&self, raw: &str) -> Result<()> {
        match BridgeRequest::from_json(raw) {
            Ok(request) => {
                self.dispatch(request);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "error parsing bridge message, dropping it");
                Err(e)
            }
        }
    }

    /// Structured framing entry point. Same contract as [`Self::handle_message`].
    pub fn handle_structured(&self, message: Value) -> Result<()> {
        match BridgeRequest::from_value(message) {
            Ok(request) => {
                self.dispatch(request);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "invalid bridge message format, dropping it");
                Err(e)
            }
        }
    }

    /// Dispatch an already-validated request.
    #[instrument(
        skip_all,
        fields(
            bridge = %request.bridge_name,
            method = %request.method_name,
            callback_id = %request.callback_id,
        )
    )]
    pub fn dispatch(&self, request: BridgeRequest) {
        debug!("bridge received request");

        let handler = self
            .registry
            .read()
            .expect("registry lock poisoned")
            .get(&request.bridge_name);

        let Some(handler) = handler else {
            warn!("bridge not registered");
            let err = BridgeError::UnknownBridge(request.bridge_name);
            self.deliver(BridgeResponse::rejected(request.callback_id, &err));
            return;
        };

        let router = self.clone();
        self.background.execute(Box::new(move || {
            let BridgeRequest {
                bridge_name,
                method_name,
                data,
                callback_id,
            } = request;
            let result = run_handler(handler.as_ref(), &method_name, &data);
            if let Err(ref e) = result {
                error!(
                    bridge = %bridge_name,
                    method = %method_name,
                    error = %e,
                    "error handling bridge call"
                );
            }
            router.deliver(BridgeResponse::from_result(callback_id, result));
        }));
    }

    /// Push an unsolicited event to every content-side listener of
    /// `bridge_name`. Fire-and-forget.
    pub fn publish_event<T: Serialize>(&self, bridge_name: &str, data: &T) -> Result<()> {
        let data = serde_json::to_value(data)?;
        let content = Arc::clone(&self.content);
        let bridge_name = bridge_name.to_owned();
        debug!(bridge = %bridge_name, "publishing event");
        self.ui.execute(Box::new(move || content.publish(&bridge_name, data)));
        Ok(())
    }

    /// Hand an outcome to the UI executor for delivery.
    fn deliver(&self, response: BridgeResponse) {
        let content = Arc::clone(&self.content);
        self.ui.execute(Box::new(move || content.deliver(response)));
    }
}

impl StringIngress for BridgeRouter {
    fn post_message(&self, message: &str) {
        // Failures are already logged; the content side will time out.
        let _ = self.handle_message(message);
    }
}

impl StructuredIngress for BridgeRouter {
    fn post_structured(&self, message: Value) {
        let _ = self.handle_structured(message);
    }
}

/// Run one handler call, converting a panic into a handler error.
fn run_handler(handler: &dyn BridgeHandler, method: &str, data: &Value) -> Result<Value> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(method, data))) {
        Ok(result) => result,
        Err(payload) => Err(BridgeError::Handler(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown error".into()
    }
}
