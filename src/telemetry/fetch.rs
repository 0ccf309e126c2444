// Background fetch: runs the (potentially slow) telemetry fetch off the
// caller's interactive thread and reports completion over a channel

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::cache::TelemetryCache;
use crate::errors::ParabolicaError;
use crate::telemetry::{SampleSequence, SessionKey};
use crate::telemetry::source::TelemetrySource;

/// Terminal state of a background fetch. Exactly one outcome is delivered
/// per fetch; there is no partial-success value.
#[derive(Debug)]
pub enum FetchOutcome {
    Completed(SampleSequence),
    Failed(ParabolicaError),
    Cancelled,
}

/// Caller's side of a background fetch: poll or block for the outcome,
/// cancel at any time. Cancellation abandons the in-flight request; no
/// partial cache entry is ever written for a cancelled fetch.
pub struct FetchHandle {
    receiver: Receiver<FetchOutcome>,
    cancel_flag: Arc<AtomicBool>,
}

impl FetchHandle {
    /// Ask the worker to stop. The fetch call itself may still run to
    /// completion, but its result is discarded and never cached.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Block until the fetch finishes one way or another.
    pub fn wait(self) -> FetchOutcome {
        self.receiver
            .recv()
            .unwrap_or(FetchOutcome::Failed(ParabolicaError::FetchDeliveryError))
    }

    /// Block with a deadline; `None` while the fetch is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<FetchOutcome> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                Some(FetchOutcome::Failed(ParabolicaError::FetchDeliveryError))
            }
        }
    }
}

/// Run a cache-first fetch on a worker thread. A cache hit bypasses the
/// source entirely; a successful source fetch is written back to the cache
/// before the outcome is delivered.
pub fn fetch_in_background<S>(
    source: S,
    cache: Arc<TelemetryCache>,
    key: SessionKey,
) -> FetchHandle
where
    S: TelemetrySource + Send + 'static,
{
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let worker_flag = Arc::clone(&cancel_flag);
    let (sender, receiver) = mpsc::channel::<FetchOutcome>();

    thread::spawn(move || {
        let outcome = run_fetch(&source, &cache, &key, &worker_flag);
        if sender.send(outcome).is_err() {
            warn!("Fetch for {} finished but the caller went away", key);
        }
    });

    FetchHandle {
        receiver,
        cancel_flag,
    }
}

fn run_fetch<S: TelemetrySource>(
    source: &S,
    cache: &TelemetryCache,
    key: &SessionKey,
    cancel_flag: &AtomicBool,
) -> FetchOutcome {
    if cancel_flag.load(Ordering::SeqCst) {
        return FetchOutcome::Cancelled;
    }

    if let Some(seq) = cache.get(key) {
        return FetchOutcome::Completed(seq);
    }

    let result = source.fetch(key);

    // cancelled mid-fetch: discard whatever came back, never touch the cache
    if cancel_flag.load(Ordering::SeqCst) {
        info!("Fetch for {} cancelled, discarding result", key);
        return FetchOutcome::Cancelled;
    }

    let seq = match result {
        Ok(seq) => seq,
        Err(e) => return FetchOutcome::Failed(e),
    };

    if let Err(e) = cache.put(key, &seq) {
        return FetchOutcome::Failed(e);
    }
    FetchOutcome::Completed(seq)
}
