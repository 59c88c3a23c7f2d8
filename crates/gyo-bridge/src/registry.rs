// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Handler registry: bridge name → handler, scoped to one hosting view.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::handler::BridgeHandler;

/// Registry shared between a view's registration call sites and its router.
///
/// Registration normally happens once on the UI thread at view setup; the
/// lock only matters when a host registers from elsewhere.
pub type SharedRegistry = Arc<RwLock<HandlerRegistry>>;

/// At most one handler per bridge name.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn BridgeHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Drop every registration, starting a fresh scope for a new view.
    pub fn initialize(&mut self) {
        self.handlers.clear();
        debug!("bridge registry initialised");
    }

    /// Install or overwrite the handler for `bridge_name`.
    pub fn register(&mut self, bridge_name: impl Into<String>, handler: Arc<dyn BridgeHandler>) {
        let bridge_name = bridge_name.into();
        debug!(bridge = %bridge_name, "registered bridge");
        self.handlers.insert(bridge_name, handler);
    }

    pub fn unregister(&mut self, bridge_name: &str) {
        self.handlers.remove(bridge_name);
        debug!(bridge = %bridge_name, "unregistered bridge");
    }

    pub fn get(&self, bridge_name: &str) -> Option<Arc<dyn BridgeHandler>> {
        self.handlers.get(bridge_name).cloned()
    }

    pub fn contains(&self, bridge_name: &str) -> bool {
        self.handlers.contains_key(bridge_name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
