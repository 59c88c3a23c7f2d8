// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host services: one hosting view, its router, and an in-process content
// runtime wired to it.
//
// The loopback wiring stands in for a real web view: the content runtime's
// string ingress is the router itself, and the router delivers back into the
// content runtime's entry points. Everything else (registry scope, executors,
// timeouts, console forwarding) is the same as on a device.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use gyo_bridge::{BridgeHandler, BridgeRouter, Executor, HostView};
use gyo_client::{BridgeClient, ConsoleForwarder, ContentRuntime};
use gyo_core::config::BridgeConfig;
use gyo_core::error::Result;
use serde::Serialize;
use tracing::{info, instrument};

use super::data_dir;

/// Shared host services. Cheap to clone.
#[derive(Clone)]
pub struct HostServices {
    view: Arc<HostView>,
    router: BridgeRouter,
    content: Arc<ContentRuntime>,
    data_dir: PathBuf,
    config: Arc<Mutex<BridgeConfig>>,
}

#[allow(dead_code)]
impl HostServices {
    /// Create a view and wire a loopback content runtime to it.
    ///
    /// Handlers run on `background`; results are delivered on `ui`.
    pub fn loopback(
        config: BridgeConfig,
        data_dir: PathBuf,
        background: Arc<dyn Executor>,
        ui: Arc<dyn Executor>,
    ) -> Self {
        let view = Arc::new(HostView::new());
        let content = ContentRuntime::new();
        let router = view.router(content.clone(), background, ui);
        content.attach_string_ingress(Arc::new(router.clone()));
        info!(view = %view.id(), server_url = %config.server_url, "loopback host wired");

        Self {
            view,
            router,
            content,
            data_dir,
            config: Arc::new(Mutex::new(config)),
        }
    }

    pub fn view(&self) -> &HostView {
        &self.view
    }

    pub fn router(&self) -> &BridgeRouter {
        &self.router
    }

    pub fn content(&self) -> &Arc<ContentRuntime> {
        &self.content
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // -- Config --------------------------------------------------------------

    pub fn config(&self) -> BridgeConfig {
        self.config.lock().expect("config lock poisoned").clone()
    }

    /// Validate, persist and adopt `config`.
    pub fn save_config(&self, config: &BridgeConfig) -> Result<()> {
        config.validate()?;
        config.save(data_dir::config_path(&self.data_dir))?;
        *self.config.lock().expect("config lock poisoned") = config.clone();
        Ok(())
    }

    // -- Registrations -------------------------------------------------------

    pub fn register(&self, bridge_name: &str, handler: Arc<dyn BridgeHandler>) {
        self.view.register(bridge_name, handler);
        info!(bridge = %bridge_name, "bridge registered");
    }

    pub fn unregister(&self, bridge_name: &str) {
        self.view.unregister(bridge_name);
        info!(bridge = %bridge_name, "bridge unregistered");
    }

    /// Page (re)load: fresh registration scope with only the console bridge.
    pub fn reload(&self) {
        self.view.reload();
        info!(view = %self.view.id(), "hosting view reloaded");
    }

    // -- Events --------------------------------------------------------------

    #[instrument(skip(self, data))]
    pub fn publish_event<T: Serialize>(&self, bridge_name: &str, data: &T) -> Result<()> {
        self.router.publish_event(bridge_name, data)
    }

    // -- Content side --------------------------------------------------------

    /// A content-side client using the configured request timeout.
    pub fn client(&self, bridge_name: &str) -> BridgeClient {
        BridgeClient::with_timeout(&self.content, bridge_name, self.config().request_timeout())
    }

    pub fn console(&self) -> ConsoleForwarder {
        ConsoleForwarder::install(&self.content, &self.config().console)
    }

    /// Tear the view down. Later invokes fail with `NoBridgeAvailable`.
    pub fn shutdown(&self) {
        self.content.detach();
        info!(view = %self.view.id(), "hosting view shut down");
    }
}

/// Load `gyo-config.json` from `dir`, or defaults when there is none.
///
/// A file that exists but does not parse or validate is an error.
pub fn load_config(dir: &Path) -> Result<BridgeConfig> {
    let path = data_dir::config_path(dir);
    if path.exists() {
        BridgeConfig::load(&path)
    } else {
        Ok(BridgeConfig::default())
    }
}
