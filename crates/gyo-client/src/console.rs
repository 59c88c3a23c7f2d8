// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Web-console forwarding into the native log.
//
// Best-effort telemetry: every line is sent fire-and-forget over the
// `gyo-console` bridge and any failure, including a missing host, is
// swallowed.

use std::sync::Arc;

use chrono::Utc;
use gyo_core::config::{ConsoleConfig, ConsoleLevel};
use serde_json::{Map, Value};
use tracing::debug;

use crate::args::Arg;
use crate::client::BridgeClient;
use crate::runtime::ContentRuntime;

pub use gyo_core::types::CONSOLE_BRIDGE;

pub struct ConsoleForwarder {
    client: BridgeClient,
    config: ConsoleConfig,
}

impl ConsoleForwarder {
    pub fn install(runtime: &Arc<ContentRuntime>, config: &ConsoleConfig) -> Self {
        debug!(enabled = config.enabled, levels = ?config.levels, "console forwarding installed");
        Self {
            client: BridgeClient::new(runtime, CONSOLE_BRIDGE),
            config: config.clone(),
        }
    }

    pub fn forwards(&self, level: ConsoleLevel) -> bool {
        self.config.enabled && self.config.levels.contains(&level)
    }

    /// Send one console line. Returns immediately; the outcome is dropped.
    pub fn forward(&self, level: ConsoleLevel, args: Vec<Arg>) {
        if !self.forwards(level) {
            return;
        }

        let stack = match (level, args.first()) {
            (ConsoleLevel::Error, Some(first)) => first.stack().map(str::to_owned),
            _ => None,
        };

        let mut data = Map::new();
        data.insert("level".into(), Value::from(level.as_str()));
        data.insert(
            "args".into(),
            Value::Array(args.into_iter().map(Arg::into_value).collect()),
        );
        data.insert("timestamp".into(), Value::from(Utc::now().timestamp_millis()));
        if let Some(stack) = stack {
            data.insert("stack".into(), Value::String(stack));
        }

        drop(self.client.invoke("log", Value::Object(data)));
    }

    pub fn log(&self, args: Vec<Arg>) {
        self.forward(ConsoleLevel::Log, args);
    }

    pub fn info(&self, args: Vec<Arg>) {
        self.forward(ConsoleLevel::Info, args);
    }

    pub fn warn(&self, args: Vec<Arg>) {
        self.forward(ConsoleLevel::Warn, args);
    }

    pub fn error(&self, args: Vec<Arg>) {
        self.forward(ConsoleLevel::Error, args);
    }

    pub fn debug(&self, args: Vec<Arg>) {
        self.forward(ConsoleLevel::Debug, args);
    }

    /// Stop forwarding and drop any console calls still in flight.
    pub fn uninstall(self) {
        self.client.destroy();
    }
}
