// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gyo core: envelope types, error taxonomy and transport seams shared by the
// native router (`gyo-bridge`) and the content-side client (`gyo-client`).

pub mod config;
pub mod error;
pub mod tagged;
pub mod transport;
pub mod types;

pub use config::{BridgeConfig, ConsoleConfig, ConsoleLevel};
pub use error::{BridgeError, Result};
pub use serde_json::Value;
pub use tagged::Tagged;
pub use transport::{ContentEntryPoints, StringIngress, StructuredIngress};
pub use types::*;
