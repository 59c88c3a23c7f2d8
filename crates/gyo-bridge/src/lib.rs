// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gyo bridge: native side.
//
// A hosting view owns a `HandlerRegistry`. Raw messages from the content
// runtime enter through `BridgeRouter`, which validates them, resolves the
// target `BridgeHandler`, runs it on the background executor and marshals the
// outcome back onto the UI executor, where it is delivered through the
// content runtime's `resolve` / `reject` / `publish` entry points.

pub mod console;
pub mod executor;
pub mod handler;
pub mod registry;
pub mod router;
pub mod script;
pub mod view;

pub use console::{
    CONSOLE_BRIDGE, ConsoleBridgeHandler, ConsoleEntry, ConsoleSeverity, ConsoleSink, TracingSink,
};
pub use executor::{Executor, InlineExecutor, TokioExecutor, UiExecutor, UiQueue};
pub use handler::BridgeHandler;
pub use registry::{HandlerRegistry, SharedRegistry};
pub use router::BridgeRouter;
pub use script::{Platform, ScriptEntryPoints, ScriptEvaluator};
pub use view::{HostView, ViewId};
