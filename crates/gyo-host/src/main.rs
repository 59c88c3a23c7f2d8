// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gyo host: reference hosting view for the bridge.
//
// Entry point. Loads config, initialises logging, wires a loopback content
// runtime to one hosting view, and drives the UI queue on the main thread
// while the content side runs.

mod demo;
mod services;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gyo_bridge::{TokioExecutor, UiQueue};
use tracing::{error, info};

use services::data_dir;
use services::host::{self, HostServices};

fn main() -> ExitCode {
    let dir = data_dir::data_dir();
    let config = host::load_config(&dir);

    let fallback = config
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();

    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!(
                path = %data_dir::config_path(&dir).display(),
                error = %e,
                "invalid host config"
            );
            return ExitCode::FAILURE;
        }
    };
    info!(server_url = %config.server_url, data_dir = %dir.display(), "gyo host starting");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };
    let _enter = runtime.enter();

    // The main thread plays the UI thread: deliveries are queued here.
    let (ui, queue) = UiQueue::channel();
    let services = HostServices::loopback(
        config,
        dir,
        Arc::new(TokioExecutor::new(runtime.handle().clone())),
        Arc::new(ui),
    );

    let content = runtime.spawn(demo::run(services.clone()));
    while !content.is_finished() {
        queue.run_until(Instant::now() + Duration::from_millis(50));
    }
    queue.run_pending();

    let outcome = runtime.block_on(content);
    services.shutdown();
    match outcome {
        Ok(Ok(())) => {
            info!("gyo host finished");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!(error = %e, "content session failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "content task aborted");
            ExitCode::FAILURE
        }
    }
}
