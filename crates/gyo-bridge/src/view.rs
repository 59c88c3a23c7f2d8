// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hosting-view scope for bridge registrations.
//
// Each view owns its own registry, so two views in one process never see
// each other's handlers. Creating or reloading a view clears the registry and
// re-registers the built-in console bridge.

use std::sync::Arc;

use gyo_core::transport::ContentEntryPoints;
use tracing::info;
use uuid::Uuid;

use crate::console::{CONSOLE_BRIDGE, ConsoleBridgeHandler};
use crate::executor::Executor;
use crate::handler::BridgeHandler;
use crate::registry::{HandlerRegistry, SharedRegistry};
use crate::router::BridgeRouter;

/// Unique identifier for a hosting view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(pub Uuid);

impl ViewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The bridge-facing half of one hosting view.
pub struct HostView {
    id: ViewId,
    registry: SharedRegistry,
    console: ConsoleBridgeHandler,
}

impl HostView {
    /// Create a view with the default console handler (logs via `tracing`).
    pub fn new() -> Self {
        Self::with_console(ConsoleBridgeHandler::default())
    }

    pub fn with_console(console: ConsoleBridgeHandler) -> Self {
        let view = Self {
            id: ViewId::new(),
            registry: HandlerRegistry::shared(),
            console,
        };
        view.reload();
        info!(view = %view.id, "hosting view created");
        view
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Start a fresh registration scope, as on page (re)load.
    pub fn reload(&self) {
        let mut registry = self.registry.write().expect("registry lock poisoned");
        registry.initialize();
        registry.register(CONSOLE_BRIDGE, Arc::new(self.console.clone()));
    }

    pub fn register(&self, bridge_name: impl Into<String>, handler: Arc<dyn BridgeHandler>) {
        self.registry
            .write()
            .expect("registry lock poisoned")
            .register(bridge_name, handler);
    }

    pub fn unregister(&self, bridge_name: &str) {
        self.registry
            .write()
            .expect("registry lock poisoned")
            .unregister(bridge_name);
    }

    pub fn is_registered(&self, bridge_name: &str) -> bool {
        self.registry
            .read()
            .expect("registry lock poisoned")
            .contains(bridge_name)
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Build the router for this view's transport channel.
    pub fn router(
        &self,
        content: Arc<dyn ContentEntryPoints>,
        background: Arc<dyn Executor>,
        ui: Arc<dyn Executor>,
    ) -> BridgeRouter {
        BridgeRouter::new(self.registry(), content, background, ui)
    }
}

impl Default for HostView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gyo_core::error::Result;
    use serde_json::{Value, json};

    fn noop() -> Arc<dyn BridgeHandler> {
        Arc::new(|_: &str, _: &Value| -> Result<Value> { Ok(json!(null)) })
    }

    #[test]
    fn new_view_has_console_bridge() {
        let view = HostView::new();
        assert!(view.is_registered(CONSOLE_BRIDGE));
    }

    #[test]
    fn reload_drops_custom_bridges() {
        let view = HostView::new();
        view.register("camera", noop());
        assert!(view.is_registered("camera"));

        view.reload();
        assert!(!view.is_registered("camera"));
        assert!(view.is_registered(CONSOLE_BRIDGE));
    }

    #[test]
    fn views_do_not_share_registrations() {
        let a = HostView::new();
        let b = HostView::new();
        a.register("camera", noop());
        assert!(a.is_registered("camera"));
        assert!(!b.is_registered("camera"));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn unregister_removes_bridge() {
        let view = HostView::new();
        view.register("camera", noop());
        view.unregister("camera");
        assert!(!view.is_registered("camera"));
    }
}
