// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-runtime globals: detected ingress and installed clients.
//
// Every client installs itself when created, so several bridge instances
// share one channel. The runtime keeps a flat list of weak client handles:
// `resolve` / `reject` go to whichever client holds the callback id, and
// `publish` reaches every client with a matching name. Dropped and destroyed
// clients are pruned from the list on install and on delivery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use gyo_core::error::{BridgeError, Result};
use gyo_core::transport::{ContentEntryPoints, StringIngress, StructuredIngress};
use gyo_core::types::{BridgeRequest, CallbackId};
use serde_json::Value;
use tracing::{debug, trace};

use crate::client::ClientState;

/// The ingress a request will be sent through.
#[derive(Clone)]
pub(crate) enum Transport {
    String(Arc<dyn StringIngress>),
    Structured(Arc<dyn StructuredIngress>),
}

impl Transport {
    pub(crate) fn send(&self, request: &BridgeRequest) -> Result<()> {
        match self {
            Self::String(ingress) => {
                let message = request.to_json()?;
                trace!(%message, "posting string message");
                ingress.post_message(&message);
            }
            Self::Structured(ingress) => {
                let message = serde_json::to_value(request)?;
                ingress.post_structured(message);
            }
        }
        Ok(())
    }
}

/// One embedded page's view of the bridge.
#[derive(Default)]
pub struct ContentRuntime {
    string_ingress: RwLock<Option<Arc<dyn StringIngress>>>,
    structured_ingress: RwLock<Option<Arc<dyn StructuredIngress>>>,
    clients: RwLock<Vec<Weak<ClientState>>>,
    calls: AtomicU64,
}

impl ContentRuntime {
    /// A runtime with no host attached, as when the page runs in a plain
    /// browser.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach the string-message ingress (Android framing).
    pub fn attach_string_ingress(&self, ingress: Arc<dyn StringIngress>) {
        *self.string_ingress.write().expect("ingress lock poisoned") = Some(ingress);
        debug!("string ingress attached");
    }

    /// Attach the structured-message ingress (iOS framing).
    pub fn attach_structured_ingress(&self, ingress: Arc<dyn StructuredIngress>) {
        *self.structured_ingress.write().expect("ingress lock poisoned") = Some(ingress);
        debug!("structured ingress attached");
    }

    /// Forget every attached ingress, as when the host tears the view down.
    pub fn detach(&self) {
        *self.string_ingress.write().expect("ingress lock poisoned") = None;
        *self.structured_ingress.write().expect("ingress lock poisoned") = None;
        debug!("ingress detached");
    }

    /// Detect the active transport. The string ingress wins when both are
    /// attached.
    pub(crate) fn transport(&self) -> Option<Transport> {
        if let Some(ingress) = self
            .string_ingress
            .read()
            .expect("ingress lock poisoned")
            .clone()
        {
            return Some(Transport::String(ingress));
        }
        self.structured_ingress
            .read()
            .expect("ingress lock poisoned")
            .clone()
            .map(Transport::Structured)
    }

    pub fn has_transport(&self) -> bool {
        self.transport().is_some()
    }

    /// Whether any live client is installed.
    pub fn has_entry_points(&self) -> bool {
        self.client_count() > 0
    }

    /// Number of live installed clients.
    pub fn client_count(&self) -> usize {
        self.live_clients().len()
    }

    /// Next value of the runtime-wide call counter, starting at 1. Shared by
    /// every client so callback ids never collide between same-named clients.
    pub(crate) fn next_call(&self) -> u64 {
        self.calls.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn install(&self, client: &Arc<ClientState>) {
        let mut clients = self.clients.write().expect("client list lock poisoned");
        clients.retain(|c| c.strong_count() > 0);
        clients.push(Arc::downgrade(client));
        debug!(bridge = %client.name, installed = clients.len(), "bridge client installed");
    }

    pub(crate) fn uninstall(&self, client: &Arc<ClientState>) {
        let target = Arc::as_ptr(client);
        self.clients
            .write()
            .expect("client list lock poisoned")
            .retain(|c| c.strong_count() > 0 && c.as_ptr() != target);
    }

    /// Strong handles to every live client. No lock is held while the
    /// caller delivers, so re-entrant calls are safe.
    fn live_clients(&self) -> Vec<Arc<ClientState>> {
        let (live, stale) = {
            let clients = self.clients.read().expect("client list lock poisoned");
            let live: Vec<_> = clients.iter().filter_map(Weak::upgrade).collect();
            let stale = live.len() != clients.len();
            (live, stale)
        };
        if stale {
            self.clients
                .write()
                .expect("client list lock poisoned")
                .retain(|c| c.strong_count() > 0);
        }
        live
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.clients.read().expect("client list lock poisoned").len()
    }
}

/// The native side delivers into the runtime through these.
impl ContentEntryPoints for ContentRuntime {
    fn resolve(&self, callback_id: &CallbackId, data: Value) {
        for client in self.live_clients() {
            if let Some(call) = client.take(callback_id) {
                call.settle(Ok(data));
                return;
            }
        }
        debug!(%callback_id, "resolve for no pending call");
    }

    fn reject(&self, callback_id: &CallbackId, error: &str) {
        for client in self.live_clients() {
            if let Some(call) = client.take(callback_id) {
                call.settle(Err(BridgeError::from_rejection(error)));
                return;
            }
        }
        debug!(%callback_id, "reject for no pending call");
    }

    fn publish(&self, bridge_name: &str, data: Value) {
        let mut reached = 0;
        for client in self.live_clients() {
            if client.name == bridge_name {
                client.fan_out(&data);
                reached += 1;
            }
        }
        if reached == 0 {
            debug!(bridge = %bridge_name, "publish with no matching client");
        }
    }
}
