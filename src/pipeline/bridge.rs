//! Thread boundary between worker tasks and the subscribing thread.
//!
//! Worker tasks (parallel merge) and `FluxSink` handles never call into the
//! subscriber directly. They push signals through crossbeam channels and ring a
//! [`WakeSignal`] so the subscribing thread can wait without spinning.

use crate::pipeline::signal::Signal;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Cooperative cancellation flag shared between a subscription and its nodes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Generation counter + condition variable used to park the subscribing thread
/// until some producer made progress.
#[derive(Debug, Default)]
pub struct WakeSignal {
    generation: Mutex<u64>,
    cvar: Condvar,
}

impl WakeSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current generation. Capture before draining, then wait on it.
    pub fn generation(&self) -> u64 {
        match self.generation.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn notify(&self) {
        let mut g = match self.generation.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *g = g.wrapping_add(1);
        self.cvar.notify_all();
    }

    /// Block until the generation moves past `seen` or `timeout` elapses.
    /// Returns `true` if woken by a notification.
    pub fn wait_since(&self, seen: u64, timeout: Duration) -> bool {
        let guard = match self.generation.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        match self.cvar.wait_timeout_while(guard, timeout, |g| *g == seen) {
            Ok((_, result)) => !result.timed_out(),
            Err(_) => false,
        }
    }
}

/// A signal produced by upstream `source` of a parallel merge.
#[derive(Debug, Clone)]
pub struct WorkerMessage {
    pub source: usize,
    pub signal: Signal,
}

/// Create the bounded worker → merge channel.
///
/// The bound is the backpressure point: a worker blocks once `capacity`
/// signals are waiting to be consumed.
pub fn worker_channel(capacity: usize) -> (Sender<WorkerMessage>, Receiver<WorkerMessage>) {
    bounded(capacity.max(1))
}
