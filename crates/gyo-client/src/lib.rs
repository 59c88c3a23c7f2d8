// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gyo client: content side of the bridge.
//
// A `ContentRuntime` stands for one embedded page: it knows which ingress the
// host attached and holds the `gyoBridge` entry points the native side calls
// into. `BridgeClient`s are created against a runtime under a bridge name;
// they issue requests, correlate responses to pending calls, time them out,
// and fan published events out to their listeners.

pub mod args;
pub mod client;
pub mod console;
pub mod reply;
pub mod runtime;

pub use args::Arg;
pub use client::{BridgeClient, Unsubscribe};
pub use console::{CONSOLE_BRIDGE, ConsoleForwarder};
pub use reply::Reply;
pub use runtime::ContentRuntime;
