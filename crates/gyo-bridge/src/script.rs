// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Script rendering for WebViews that only accept JavaScript evaluation.
//
// The platform WebView (Android `evaluateJavascript`, WKWebView
// `evaluateJavaScript`) is wrapped in a `ScriptEvaluator`; `ScriptEntryPoints`
// turns resolve/reject/publish calls into `window.gyoBridge.*(...)` scripts.
// Every argument is emitted as a JSON literal, so quotes, backslashes and
// line breaks in ids, names or error messages stay inside their string.

use gyo_core::transport::ContentEntryPoints;
use gyo_core::types::CallbackId;
use serde_json::Value;
use tracing::trace;

/// Name of the content-runtime global the entry points live on.
pub const GLOBAL_NAME: &str = "gyoBridge";

/// Evaluates a script in the hosting view's content runtime.
///
/// Called only from the UI executor.
pub trait ScriptEvaluator: Send + Sync {
    fn evaluate_script(&self, script: &str);
}

impl<F> ScriptEvaluator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn evaluate_script(&self, script: &str) {
        self(script)
    }
}

/// [`ContentEntryPoints`] implemented by evaluating scripts.
pub struct ScriptEntryPoints<E> {
    evaluator: E,
}

impl<E: ScriptEvaluator> ScriptEntryPoints<E> {
    pub fn new(evaluator: E) -> Self {
        Self { evaluator }
    }

    fn call(&self, function: &str, args: &[Value]) {
        let script = call_script(function, args);
        trace!(%script, "evaluating bridge script");
        self.evaluator.evaluate_script(&script);
    }
}

impl<E: ScriptEvaluator> ContentEntryPoints for ScriptEntryPoints<E> {
    fn resolve(&self, callback_id: &CallbackId, data: Value) {
        self.call("resolve", &[Value::String(callback_id.to_string()), data]);
    }

    fn reject(&self, callback_id: &CallbackId, error: &str) {
        self.call(
            "reject",
            &[
                Value::String(callback_id.to_string()),
                Value::String(error.to_owned()),
            ],
        );
    }

    fn publish(&self, bridge_name: &str, data: Value) {
        self.call(
            "publish",
            &[Value::String(bridge_name.to_owned()), data],
        );
    }
}

/// `window.gyoBridge.<function>(<json>, <json>, ...);`
pub fn call_script(function: &str, args: &[Value]) -> String {
    let args = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("window.{GLOBAL_NAME}.{function}({args});")
}

/// Host platform, which decides the ingress framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// String framing through `window.androidBridge.postMessage(json)`.
    Android,
    /// Structured framing through `window.webkit.messageHandlers.gyoBridge`.
    Ios,
}

impl Platform {
    /// The platform this binary was built for, if it is a bridge host.
    pub fn current() -> Option<Self> {
        #[cfg(target_os = "android")]
        {
            Some(Self::Android)
        }
        #[cfg(target_os = "ios")]
        {
            Some(Self::Ios)
        }
        #[cfg(not(any(target_os = "ios", target_os = "android")))]
        {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }

    /// Name under which the host registers its ingress in the content runtime.
    pub fn ingress_name(&self) -> &'static str {
        match self {
            Self::Android => "androidBridge",
            Self::Ios => GLOBAL_NAME,
        }
    }

    /// Script injected once the page has finished loading. It installs
    /// `window.gyo` with the platform name and a low-level `postMessage`
    /// that speaks this platform's framing.
    pub fn runtime_bootstrap(&self) -> String {
        let post = match self {
            Self::Android => {
                concat!(
                    "if (window.androidBridge) { ",
                    "window.androidBridge.postMessage(JSON.stringify(message)); }",
                )
            }
            Self::Ios => {
                concat!(
                    "if (window.webkit && window.webkit.messageHandlers && ",
                    "window.webkit.messageHandlers.gyoBridge) { ",
                    "window.webkit.messageHandlers.gyoBridge.postMessage(message); }",
                )
            }
        };
        format!(
            r#"(function() {{
    window.gyo = {{
        platform: '{platform}',
        __bridge: {{
            postMessage: function(message) {{ {post} }}
        }}
    }};
    console.log('gyo runtime initialized on {platform}');
}})();"#,
            platform = self.as_str(),
        )
    }
}
