// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content session run against the loopback view: waits for the host's
// `ready` event, forwards a few console lines, and exercises one direct call
// and one call to a bridge nobody registered.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use gyo_bridge::CONSOLE_BRIDGE;
use gyo_client::Arg;
use gyo_core::error::{BridgeError, Result};
use serde_json::json;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::services::host::HostServices;

/// Bridge name the host publishes lifecycle events on.
pub const HOST_BRIDGE: &str = "gyo-host";

pub async fn run(services: HostServices) -> Result<()> {
    let lifecycle = services.client(HOST_BRIDGE);
    let (ready_tx, ready_rx) = oneshot::channel();
    let ready_tx = Arc::new(Mutex::new(Some(ready_tx)));
    let unsubscribe = lifecycle.listen(move |event| {
        if let Some(tx) = ready_tx.lock().expect("ready lock poisoned").take() {
            let _ = tx.send(event.clone());
        }
    });

    let config = services.config();
    services.publish_event(
        HOST_BRIDGE,
        &json!({ "event": "ready", "serverUrl": config.server_url }),
    )?;
    let event = ready_rx.await.map_err(|_| BridgeError::Destroyed)?;
    unsubscribe.unsubscribe();
    info!(%event, "content received host event");

    let console = services.console();
    console.info(vec!["page loaded from".into(), config.server_url.clone().into()]);
    console.debug(vec!["started at".into(), Utc::now().into()]);
    let failure = std::io::Error::other("demo failure");
    console.error(vec![Arg::error(&failure), Arg::serialize(&json!({ "retry": false }))]);

    let direct = services.client(CONSOLE_BRIDGE);
    let out = direct
        .invoke("log", json!({ "level": "warn", "args": ["hello", 42] }))
        .await?;
    info!(%out, "console bridge answered");

    match services.client("camera").invoke("snap", json!({})).await {
        Err(BridgeError::UnknownBridge(name)) => {
            info!(bridge = %name, "unregistered bridge rejected as expected")
        }
        other => warn!(?other, "unexpected outcome for unregistered bridge"),
    }

    console.uninstall();
    lifecycle.destroy();
    Ok(())
}
