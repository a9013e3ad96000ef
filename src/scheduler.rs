//! Periodic scrape runs on a background thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::pipeline::Orchestrator;

/// Handle to the scheduler thread. Dropping it stops the thread.
pub struct Scheduler {
    stop_tx: Option<Sender<()>>,
    runs: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Run once immediately, then every `interval` until stopped.
    pub fn start(orchestrator: Arc<Orchestrator>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let runs = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&runs);

        let thread = thread::spawn(move || {
            info!(?interval, "scheduler started");
            loop {
                let summary = orchestrator.run();
                counter.fetch_add(1, Ordering::Relaxed);
                if !summary.success {
                    warn!(error = ?summary.error, "scheduled run did not succeed");
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("scheduler stopped");
        });

        Self {
            stop_tx: Some(stop_tx),
            runs,
            thread: Some(thread),
        }
    }

    /// Runs started so far, including failed ones.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Block until the thread has exited. A run in progress finishes first.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            warn!("scheduler thread panicked");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
