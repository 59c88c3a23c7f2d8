// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Web bridge client: request correlation, timeouts and event fan-out.
//
// Every `invoke` gets a fresh callback id and a pending entry holding the
// reply sender and its timer. The first of {response, timeout, destroy}
// removes the entry and settles the reply; anything arriving later finds no
// entry and is a no-op.
//
// The deadline is a spawned timer when `invoke` runs inside a tokio runtime,
// and otherwise travels with the `Reply` and starts on its first poll.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::Utc;
use gyo_core::config::DEFAULT_REQUEST_TIMEOUT_MS;
use gyo_core::error::{BridgeError, Result};
use gyo_core::types::{BridgeRequest, CallbackId};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, instrument, warn};

use crate::reply::Reply;
use crate::runtime::ContentRuntime;

type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

pub(crate) struct PendingCall {
    method: String,
    tx: oneshot::Sender<Result<Value>>,
    timer: Option<AbortHandle>,
}

impl PendingCall {
    pub(crate) fn settle(self, outcome: Result<Value>) {
        if let Some(timer) = self.timer {
            timer.abort();
        }
        // The caller may have dropped its Reply; nothing to do then.
        let _ = self.tx.send(outcome);
    }
}

pub(crate) struct ClientState {
    pub(crate) name: String,
    timeout: Duration,
    destroyed: AtomicBool,
    next_listener: AtomicU64,
    pending: Mutex<HashMap<CallbackId, PendingCall>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl ClientState {
    pub(crate) fn take(&self, callback_id: &CallbackId) -> Option<PendingCall> {
        self.pending
            .lock()
            .expect("pending lock poisoned")
            .remove(callback_id)
    }

    fn owns(&self, callback_id: &CallbackId) -> bool {
        self.pending
            .lock()
            .expect("pending lock poisoned")
            .contains_key(callback_id)
    }

    fn expire(&self, callback_id: &CallbackId) {
        if let Some(call) = self.take(callback_id) {
            warn!(
                bridge = %self.name,
                method = %call.method,
                %callback_id,
                "bridge call timed out"
            );
            let method = call.method.clone();
            call.settle(Err(BridgeError::Timeout(method)));
        }
    }

    fn is_listening(&self, id: u64) -> bool {
        self.listeners
            .lock()
            .expect("listener lock poisoned")
            .iter()
            .any(|(l, _)| *l == id)
    }

    /// Deliver to a snapshot of the listener set. A listener removed while
    /// the snapshot is being walked is skipped; one added is not called
    /// for this event.
    pub(crate) fn fan_out(&self, data: &Value) {
        let snapshot: Vec<(u64, Listener)> = self
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .clone();

        for (id, listener) in snapshot {
            if !self.is_listening(id) {
                continue;
            }
            if catch_unwind(AssertUnwindSafe(|| listener(data))).is_err() {
                warn!(bridge = %self.name, listener = id, "event listener panicked");
            }
        }
    }
}

/// Content-side handle for one bridge name.
#[derive(Clone)]
pub struct BridgeClient {
    state: Arc<ClientState>,
    runtime: Arc<ContentRuntime>,
}

impl BridgeClient {
    /// Create a client with the default 30 s request timeout and install it
    /// into `runtime`.
    pub fn new(runtime: &Arc<ContentRuntime>, name: impl Into<String>) -> Self {
        Self::with_timeout(
            runtime,
            name,
            Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }

    pub fn with_timeout(
        runtime: &Arc<ContentRuntime>,
        name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let state = Arc::new(ClientState {
            name: name.into(),
            timeout,
            destroyed: AtomicBool::new(false),
            next_listener: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
        });

        runtime.install(&state);
        debug!(bridge = %state.name, ?timeout, "bridge client created");

        Self {
            state,
            runtime: Arc::clone(runtime),
        }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn pending_count(&self) -> usize {
        self.state.pending.lock().expect("pending lock poisoned").len()
    }

    pub fn listener_count(&self) -> usize {
        self.state
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .len()
    }

    /// Call `method` on the native handler registered under this client's
    /// name.
    ///
    /// Fails immediately with `NoBridgeAvailable` when the runtime has no
    /// ingress, and with `Destroyed` after `destroy`; no pending entry is
    /// created in either case. Invoked outside a tokio runtime, the deadline
    /// starts counting from the call but is only enforced while the reply is
    /// polled inside one.
    #[instrument(skip(self, data), fields(bridge = %self.state.name))]
    pub fn invoke(&self, method: &str, data: Value) -> Reply {
        if self.state.destroyed.load(Ordering::Acquire) {
            return Reply::failed(BridgeError::Destroyed);
        }
        let Some(transport) = self.runtime.transport() else {
            debug!("no bridge transport available");
            return Reply::failed(BridgeError::NoBridgeAvailable);
        };

        let issued = tokio::time::Instant::now();
        let counter = self.runtime.next_call();
        let callback_id =
            CallbackId::new(&self.state.name, Utc::now().timestamp_millis(), counter);
        let (tx, rx) = oneshot::channel();

        self.state
            .pending
            .lock()
            .expect("pending lock poisoned")
            .insert(
                callback_id.clone(),
                PendingCall {
                    method: method.to_owned(),
                    tx,
                    timer: None,
                },
            );
        let armed = self.arm_timer(&callback_id);

        let request = BridgeRequest {
            bridge_name: self.state.name.clone(),
            method_name: method.to_owned(),
            data,
            callback_id: callback_id.clone(),
        };
        debug!(%callback_id, "sending bridge request");

        if let Err(e) = transport.send(&request) {
            if let Some(call) = self.state.take(&callback_id) {
                if let Some(timer) = call.timer {
                    timer.abort();
                }
            }
            return Reply::failed(e);
        }
        if armed {
            return Reply::pending(rx);
        }

        let weak = Arc::downgrade(&self.state);
        Reply::with_deadline(rx, issued + self.state.timeout, move || {
            if let Some(state) = weak.upgrade() {
                state.expire(&callback_id);
            }
        })
    }

    /// `invoke` and deserialize the result into `T`.
    pub async fn invoke_as<T: DeserializeOwned>(&self, method: &str, data: Value) -> Result<T> {
        let value = self.invoke(method, data).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Spawn the deadline timer. Returns `false` outside a tokio runtime.
    fn arm_timer(&self, callback_id: &CallbackId) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(%callback_id, "no async runtime; deadline deferred to the reply");
            return false;
        };

        let weak = Arc::downgrade(&self.state);
        let id = callback_id.clone();
        let timeout = self.state.timeout;
        let timer = handle
            .spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(state) = weak.upgrade() {
                    state.expire(&id);
                }
            })
            .abort_handle();

        let mut pending = self.state.pending.lock().expect("pending lock poisoned");
        match pending.get_mut(callback_id) {
            Some(call) => call.timer = Some(timer),
            None => timer.abort(),
        }
        true
    }

    /// Settle a pending call with `data`. Returns `false` when no call with
    /// this id is pending.
    pub fn resolve(&self, callback_id: &CallbackId, data: Value) -> bool {
        match self.state.take(callback_id) {
            Some(call) => {
                call.settle(Ok(data));
                true
            }
            None => false,
        }
    }

    /// Settle a pending call with a rejection string as received on the
    /// wire.
    pub fn reject(&self, callback_id: &CallbackId, error: &str) -> bool {
        match self.state.take(callback_id) {
            Some(call) => {
                call.settle(Err(BridgeError::from_rejection(error)));
                true
            }
            None => false,
        }
    }

    /// Whether `callback_id` was issued by this client and is still pending.
    pub fn is_pending(&self, callback_id: &CallbackId) -> bool {
        self.state.owns(callback_id)
    }

    /// Deliver an event to this client's listeners if `bridge_name` is its
    /// own name.
    pub fn publish(&self, bridge_name: &str, data: &Value) {
        if bridge_name == self.state.name {
            self.state.fan_out(data);
        }
    }

    pub fn listen<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.state.next_listener.fetch_add(1, Ordering::Relaxed);
        self.state
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .push((id, Arc::new(callback)));
        Unsubscribe {
            state: Arc::downgrade(&self.state),
            id,
        }
    }

    /// Drop every pending call and listener and leave the runtime.
    /// Outstanding replies settle with `Destroyed`, as do later invokes;
    /// native work still running is not told.
    pub fn destroy(&self) {
        self.state.destroyed.store(true, Ordering::Release);
        self.runtime.uninstall(&self.state);
        let pending: Vec<PendingCall> = self
            .state
            .pending
            .lock()
            .expect("pending lock poisoned")
            .drain()
            .map(|(_, call)| call)
            .collect();
        let orphaned = pending.len();
        for call in pending {
            call.settle(Err(BridgeError::Destroyed));
        }
        self.state
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .clear();
        debug!(bridge = %self.state.name, orphaned, "bridge client destroyed");
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("name", &self.state.name)
            .field("timeout", &self.state.timeout)
            .field("pending", &self.pending_count())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Removes exactly the listener it was returned for.
#[derive(Debug, Clone)]
pub struct Unsubscribe {
    state: Weak<ClientState>,
    id: u64,
}

impl Unsubscribe {
    /// Idempotent; later calls do nothing.
    pub fn unsubscribe(&self) {
        if let Some(state) = self.state.upgrade() {
            state
                .listeners
                .lock()
                .expect("listener lock poisoned")
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gyo_core::transport::{ContentEntryPoints, StringIngress};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Capture(Mutex<Vec<BridgeRequest>>);

    impl Capture {
        fn last_id(&self) -> CallbackId {
            self.0.lock().unwrap().last().unwrap().callback_id.clone()
        }
    }

    impl StringIngress for Capture {
        fn post_message(&self, message: &str) {
            self.0
                .lock()
                .unwrap()
                .push(BridgeRequest::from_json(message).unwrap());
        }
    }

    fn attached() -> (Arc<ContentRuntime>, Arc<Capture>) {
        let runtime = ContentRuntime::new();
        let capture = Arc::new(Capture::default());
        runtime.attach_string_ingress(capture.clone());
        (runtime, capture)
    }

    #[tokio::test]
    async fn no_transport_fails_immediately() {
        let runtime = ContentRuntime::new();
        let client = BridgeClient::new(&runtime, "camera");
        let err = client.invoke("snap", Value::Null).await.unwrap_err();
        assert!(matches!(err, BridgeError::NoBridgeAvailable));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn request_carries_envelope_and_resolves() {
        let (runtime, capture) = attached();
        let client = BridgeClient::new(&runtime, "camera");

        let reply = client.invoke("snap", json!({ "flash": true }));
        let sent = capture.0.lock().unwrap()[0].clone();
        assert_eq!(sent.bridge_name, "camera");
        assert_eq!(sent.method_name, "snap");
        assert_eq!(sent.data, json!({ "flash": true }));
        assert!(sent.callback_id.as_str().starts_with("camera_"));
        assert!(sent.callback_id.as_str().ends_with("_1"));
        assert_eq!(client.pending_count(), 1);

        runtime.resolve(&sent.callback_id, json!("photo.jpg"));
        assert_eq!(reply.await.unwrap(), json!("photo.jpg"));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn late_and_duplicate_responses_are_no_ops() {
        let (runtime, capture) = attached();
        let client = BridgeClient::new(&runtime, "camera");

        let reply = client.invoke("snap", Value::Null);
        let id = capture.last_id();
        assert!(client.resolve(&id, json!(1)));
        assert!(!client.resolve(&id, json!(2)));
        assert!(!client.reject(&id, "too late"));
        runtime.reject(&id, "too late");
        assert_eq!(reply.await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn rejection_maps_back_to_variants() {
        let (runtime, capture) = attached();
        let client = BridgeClient::new(&runtime, "camera");

        let reply = client.invoke("snap", Value::Null);
        runtime.reject(&capture.last_id(), "unknown bridge: camera");
        assert!(matches!(reply.await, Err(BridgeError::UnknownBridge(ref b)) if b == "camera"));

        let reply = client.invoke("snap", Value::Null);
        runtime.reject(&capture.last_id(), "lens cap on");
        let err = reply.await.unwrap_err();
        assert!(matches!(err, BridgeError::Handler(_)));
        assert_eq!(err.to_string(), "lens cap on");
    }

    #[tokio::test]
    async fn concurrent_calls_resolve_out_of_order() {
        let (runtime, capture) = attached();
        let client = BridgeClient::new(&runtime, "camera");

        let first = client.invoke("slow", Value::Null);
        let first_id = capture.last_id();
        let second = client.invoke("fast", Value::Null);
        let second_id = capture.last_id();
        assert_ne!(first_id, second_id);

        runtime.resolve(&second_id, json!("fast"));
        assert_eq!(second.await.unwrap(), json!("fast"));
        assert_eq!(client.pending_count(), 1);

        runtime.resolve(&first_id, json!("slow"));
        assert_eq!(first.await.unwrap(), json!("slow"));
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_call_times_out() {
        let (runtime, capture) = attached();
        let client = BridgeClient::new(&runtime, "camera");

        let started = tokio::time::Instant::now();
        let reply = client.invoke("snap", Value::Null);
        let id = capture.last_id();

        let err = reply.await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(ref m) if m == "snap"));
        assert_eq!(err.to_string(), "bridge method 'snap' timed out");
        assert!(started.elapsed() >= Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS));
        assert_eq!(client.pending_count(), 0);

        // The native response arriving afterwards is discarded.
        assert!(!client.resolve(&id, json!("late")));
    }

    #[tokio::test(start_paused = true)]
    async fn response_before_deadline_wins_the_race() {
        let (runtime, capture) = attached();
        let client = BridgeClient::with_timeout(&runtime, "camera", Duration::from_secs(5));

        let reply = client.invoke("snap", Value::Null);
        tokio::time::advance(Duration::from_secs(4)).await;
        runtime.resolve(&capture.last_id(), json!("ok"));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(reply.await.unwrap(), json!("ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_reply_is_still_cleaned_up() {
        let (runtime, _capture) = attached();
        let client = BridgeClient::with_timeout(&runtime, "camera", Duration::from_secs(1));

        drop(client.invoke("snap", Value::Null));
        assert_eq!(client.pending_count(), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(client.pending_count(), 0);
    }

    #[test]
    fn publish_only_reaches_matching_name() {
        let runtime = ContentRuntime::new();
        let camera = BridgeClient::new(&runtime, "camera");
        let gps = BridgeClient::new(&runtime, "gps");

        let camera_hits = Arc::new(Mutex::new(Vec::new()));
        let gps_hits = Arc::new(AtomicUsize::new(0));
        let sink = camera_hits.clone();
        let _c = camera.listen(move |v| sink.lock().unwrap().push(v.clone()));
        let counter = gps_hits.clone();
        let _g = gps.listen(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        runtime.publish("camera", json!({ "frame": 1 }));
        runtime.publish("unknown", json!({}));

        assert_eq!(*camera_hits.lock().unwrap(), vec![json!({ "frame": 1 })]);
        assert_eq!(gps_hits.load(Ordering::SeqCst), 0);

        runtime.publish("gps", json!({ "lat": 0 }));
        assert_eq!(gps_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn every_installed_client_receives_its_responses() {
        let (runtime, capture) = attached();
        let camera = BridgeClient::new(&runtime, "camera");
        let gps = BridgeClient::new(&runtime, "gps");

        let photo = camera.invoke("snap", Value::Null);
        let photo_id = capture.last_id();
        let fix = gps.invoke("fix", Value::Null);
        let fix_id = capture.last_id();

        runtime.resolve(&photo_id, json!("photo"));
        runtime.reject(&fix_id, "no signal");
        assert_eq!(photo.await.unwrap(), json!("photo"));
        assert_eq!(fix.await.unwrap_err().to_string(), "no signal");
    }

    #[test]
    fn unsubscribe_is_idempotent_and_exact() {
        let runtime = ContentRuntime::new();
        let client = BridgeClient::new(&runtime, "camera");
        let hits = Arc::new(AtomicUsize::new(0));

        let a = hits.clone();
        let first = client.listen(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });
        let b = hits.clone();
        let _second = client.listen(move |_| {
            b.fetch_add(10, Ordering::SeqCst);
        });

        first.unsubscribe();
        first.unsubscribe();
        assert_eq!(client.listener_count(), 1);

        client.publish("camera", &Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn unsubscribe_during_delivery_takes_effect_immediately() {
        let runtime = ContentRuntime::new();
        let client = BridgeClient::new(&runtime, "camera");
        let later_hits = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Unsubscribe>>> = Arc::new(Mutex::new(None));

        let victim = slot.clone();
        let adder = client.clone();
        let added = later_hits.clone();
        let _first = client.listen(move |_| {
            if let Some(u) = victim.lock().unwrap().take() {
                u.unsubscribe();
            }
            let added = added.clone();
            // Added during delivery: must not see this event.
            let _ = adder.listen(move |_| {
                added.fetch_add(100, Ordering::SeqCst);
            });
        });
        let hit = later_hits.clone();
        let second = client.listen(move |_| {
            hit.fetch_add(1, Ordering::SeqCst);
        });
        *slot.lock().unwrap() = Some(second);

        client.publish("camera", &Value::Null);
        assert_eq!(later_hits.load(Ordering::SeqCst), 0);
        assert_eq!(client.listener_count(), 2);
    }

    #[test]
    fn panicking_listener_does_not_starve_others() {
        let runtime = ContentRuntime::new();
        let client = BridgeClient::new(&runtime, "camera");
        let hits = Arc::new(AtomicUsize::new(0));

        let _bad = client.listen(|_| panic!("listener bug"));
        let h = hits.clone();
        let _good = client.listen(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        client.publish("camera", &Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn destroy_settles_pending_and_clears_listeners() {
        let (runtime, capture) = attached();
        let client = BridgeClient::new(&runtime, "camera");
        let _l = client.listen(|_| {});

        let reply = client.invoke("snap", Value::Null);
        let id = capture.last_id();
        client.destroy();

        assert!(matches!(reply.await, Err(BridgeError::Destroyed)));
        assert_eq!(client.pending_count(), 0);
        assert_eq!(client.listener_count(), 0);
        assert!(!client.resolve(&id, json!("late")));

        assert_eq!(runtime.client_count(), 0);
        let err = client.invoke("snap", Value::Null).await.unwrap_err();
        assert!(matches!(err, BridgeError::Destroyed));
        assert_eq!(client.pending_count(), 0);
    }

    #[test]
    fn dropped_clients_leave_the_runtime() {
        let runtime = ContentRuntime::new();
        let keeper = BridgeClient::new(&runtime, "camera");
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let _l = keeper.listen(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..10_000 {
            drop(BridgeClient::new(&runtime, "camera"));
        }
        assert!(runtime.slot_count() <= 2);

        runtime.publish("camera", json!({ "frame": 1 }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.slot_count(), 1);
        assert_eq!(runtime.client_count(), 1);
    }

    #[tokio::test]
    async fn same_named_clients_never_share_an_id() {
        let (runtime, capture) = attached();
        let first = BridgeClient::new(&runtime, "camera");
        let second = BridgeClient::new(&runtime, "camera");

        let a = first.invoke("snap", Value::Null);
        let a_id = capture.last_id();
        let b = second.invoke("snap", Value::Null);
        let b_id = capture.last_id();
        assert_ne!(a_id, b_id);

        runtime.resolve(&b_id, json!("b"));
        runtime.resolve(&a_id, json!("a"));
        assert_eq!(a.await.unwrap(), json!("a"));
        assert_eq!(b.await.unwrap(), json!("b"));
    }

    #[test]
    fn deadline_outside_runtime_applies_once_awaited() {
        let (runtime, _capture) = attached();
        let client = BridgeClient::new(&runtime, "camera");
        let reply = client.invoke("snap", Value::Null);
        assert_eq!(client.pending_count(), 1);

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        let outcome = rt.block_on(async { tokio::time::timeout(Duration::from_secs(120), reply).await });

        assert!(matches!(outcome, Ok(Err(BridgeError::Timeout(ref m))) if m == "snap"));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn invoke_as_deserializes() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Photo {
            path: String,
        }

        let (runtime, capture) = attached();
        let client = BridgeClient::new(&runtime, "camera");
        let rt = runtime.clone();
        let cap = capture.clone();
        let pending = tokio::spawn(async move {
            tokio::task::yield_now().await;
            rt.resolve(&cap.last_id(), json!({ "path": "a.jpg" }));
        });

        let photo: Photo = client.invoke_as("snap", Value::Null).await.unwrap();
        pending.await.unwrap();
        assert_eq!(photo, Photo { path: "a.jpg".into() });
    }
}
