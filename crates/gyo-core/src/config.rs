// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge and host configuration, persisted as `gyo-config.json`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BridgeError, Result};

/// File name the host looks for in its data directory.
pub const CONFIG_FILE: &str = "gyo-config.json";

/// Default per-call deadline on the content side.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Console severities the content runtime can forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub const ALL: [ConsoleLevel; 5] = [
        ConsoleLevel::Log,
        ConsoleLevel::Info,
        ConsoleLevel::Warn,
        ConsoleLevel::Error,
        ConsoleLevel::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }
}

/// Web-console forwarding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsoleConfig {
    /// Forward console output to the native log at all.
    pub enabled: bool,
    /// Which console methods are forwarded.
    pub levels: Vec<ConsoleLevel>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            levels: ConsoleLevel::ALL.to_vec(),
        }
    }
}

/// Persistent bridge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Page the hosting view loads.
    pub server_url: String,
    /// Content-side deadline for every `invoke`.
    pub request_timeout_ms: u64,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub console: ConsoleConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5173".into(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            log_filter: "info".into(),
            console: ConsoleConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Load and validate a config file. Missing keys take their defaults;
    /// an empty `serverUrl` is rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        info!(path = %path.display(), server_url = %config.server_url, "loaded bridge config");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        debug!(path = %path.as_ref().display(), "bridge config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(BridgeError::Config(format!("serverUrl is empty in {CONFIG_FILE}")));
        }
        if self.request_timeout_ms == 0 {
            return Err(BridgeError::Config("requestTimeoutMs must be positive".into()));
        }
        Ok(())
    }
}
