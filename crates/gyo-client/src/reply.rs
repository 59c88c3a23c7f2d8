// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Future returned by `BridgeClient::invoke`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use gyo_core::error::{BridgeError, Result};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::RecvError;
use tokio::time::{Instant, Sleep};

/// Settles exactly once with the handler's result or the rejection.
///
/// Dropping a `Reply` opts out of the result; the pending entry is still
/// cleaned up by the response or the timeout.
#[must_use = "a Reply does nothing unless awaited; drop it to ignore the outcome"]
pub struct Reply {
    state: State,
}

enum State {
    Pending {
        rx: oneshot::Receiver<Result<Value>>,
        deadline: Option<Deadline>,
    },
    Failed(Option<BridgeError>),
}

/// A deadline no timer was spawned for. The sleep is created on the first
/// poll that runs inside a tokio runtime.
struct Deadline {
    at: Instant,
    sleep: Option<Pin<Box<Sleep>>>,
    expire: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Deadline {
    /// `true` once the deadline has passed and `expire` has run.
    fn poll_elapsed(&mut self, cx: &mut Context<'_>) -> bool {
        if self.sleep.is_none() {
            if tokio::runtime::Handle::try_current().is_err() {
                return false;
            }
            self.sleep = Some(Box::pin(tokio::time::sleep_until(self.at)));
        }
        let Some(sleep) = self.sleep.as_mut() else {
            return false;
        };
        if sleep.as_mut().poll(cx).is_pending() {
            return false;
        }
        if let Some(expire) = self.expire.take() {
            expire();
        }
        true
    }
}

impl Reply {
    pub(crate) fn pending(rx: oneshot::Receiver<Result<Value>>) -> Self {
        Self {
            state: State::Pending { rx, deadline: None },
        }
    }

    /// A pending reply that runs `expire` itself once `at` has passed.
    pub(crate) fn with_deadline(
        rx: oneshot::Receiver<Result<Value>>,
        at: Instant,
        expire: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: State::Pending {
                rx,
                deadline: Some(Deadline {
                    at,
                    sleep: None,
                    expire: Some(Box::new(expire)),
                }),
            },
        }
    }

    /// A reply that fails on first poll without any message having been sent.
    pub(crate) fn failed(error: BridgeError) -> Self {
        Self {
            state: State::Failed(Some(error)),
        }
    }
}

fn received(outcome: std::result::Result<Result<Value>, RecvError>) -> Result<Value> {
    // Sender dropped without settling: the client went away.
    outcome.unwrap_or(Err(BridgeError::Destroyed))
}

impl Future for Reply {
    type Output = Result<Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            State::Pending { rx, deadline } => {
                if let Poll::Ready(outcome) = Pin::new(&mut *rx).poll(cx) {
                    return Poll::Ready(received(outcome));
                }
                let elapsed = deadline.as_mut().is_some_and(|d| d.poll_elapsed(cx));
                if !elapsed {
                    return Poll::Pending;
                }
                *deadline = None;
                // Expiry settled the call through the channel.
                Pin::new(rx).poll(cx).map(received)
            }
            State::Failed(error) => {
                Poll::Ready(Err(error.take().unwrap_or(BridgeError::Destroyed)))
            }
        }
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Pending { .. } => "pending",
            State::Failed(_) => "failed",
        };
        f.debug_struct("Reply").field("state", &state).finish()
    }
}
