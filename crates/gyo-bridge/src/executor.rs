// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Execution contexts for the router's two-phase handoff.
//
// Handlers run on a background executor so a slow handler never stalls
// rendering. Delivery into the content runtime runs on the UI executor,
// because script evaluation is only safe on the UI/main thread.

use std::sync::mpsc;
use std::time::Instant;

use tracing::{debug, warn};

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs jobs in a particular execution context.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Runs every job immediately on the calling thread.
///
/// Suitable when ingress already arrives on the main thread (iOS delivers
/// script messages there) and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job();
    }
}

/// Background executor backed by tokio's blocking pool.
///
/// Handlers are synchronous and may block, so they go to `spawn_blocking`
/// rather than the async worker threads.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime the caller is running inside, if any.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        // The join handle is dropped; the outcome is reported by the job itself.
        drop(self.handle.spawn_blocking(job));
    }
}

/// Posting side of the UI run queue. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct UiExecutor {
    tx: mpsc::Sender<Job>,
}

impl Executor for UiExecutor {
    fn execute(&self, job: Job) {
        if self.tx.send(job).is_err() {
            // The UI loop has gone away with the view; nothing can be delivered.
            warn!("UI queue closed, dropping job");
        }
    }
}

/// Draining side of the UI run queue. Owned by the UI/main thread.
pub struct UiQueue {
    rx: mpsc::Receiver<Job>,
}

impl UiQueue {
    pub fn channel() -> (UiExecutor, UiQueue) {
        let (tx, rx) = mpsc::channel();
        (UiExecutor { tx }, UiQueue { rx })
    }

    /// Run everything queued right now without waiting. Returns the number
    /// of jobs run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Run jobs as they arrive until `deadline`, or until every
    /// [`UiExecutor`] has been dropped.
    pub fn run_until(&self, deadline: Instant) -> usize {
        let mut ran = 0;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(ran, "UI queue drained until deadline");
        ran
    }

    /// Run jobs until every [`UiExecutor`] has been dropped.
    pub fn run_until_closed(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.recv() {
            job();
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn inline_runs_immediately() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        InlineExecutor.execute(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ui_queue_defers_until_drained() {
        let (ui, queue) = UiQueue::channel();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let h = hits.clone();
            ui.execute(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(queue.run_pending(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn ui_queue_accepts_jobs_from_other_threads() {
        let (ui, queue) = UiQueue::channel();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let worker = std::thread::spawn(move || {
            ui.execute(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }));
        });
        worker.join().unwrap();
        // The executor was moved into the worker and dropped there.
        assert_eq!(queue.run_until_closed(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_until_stops_at_deadline() {
        let (_ui, queue) = UiQueue::channel();
        let ran = queue.run_until(Instant::now() + Duration::from_millis(10));
        assert_eq!(ran, 0);
    }

    #[tokio::test]
    async fn tokio_executor_runs_off_thread() {
        let exec = TokioExecutor::current().expect("inside runtime");
        let (tx, rx) = tokio::sync::oneshot::channel();
        exec.execute(Box::new(move || {
            let _ = tx.send(std::thread::current().id());
        }));
        let worker = rx.await.unwrap();
        assert_ne!(worker, std::thread::current().id());
    }
}
