//! Merge nodes.
//!
//! - [`MergeNode`] interleaves upstreams round-robin on the subscriber's
//!   thread.
//! - [`ParallelMergeNode`] runs each upstream as a task on an injected
//!   [`Executor`] and serializes their signals through one bounded crossbeam
//!   channel. The channel bound is the backpressure point for the workers.

use crate::pipeline::bridge::{worker_channel, CancelToken, WorkerMessage};
use crate::pipeline::error::FluxError;
use crate::pipeline::executor::{run_worker, Executor};
use crate::pipeline::node::{AnyNode, NodeContext, Pull};
use crate::pipeline::signal::Signal;
use crossbeam_channel::{Receiver, TryRecvError};
use std::sync::Arc;

pub struct MergeNode {
    sources: Vec<AnyNode>,
    done: Vec<bool>,
    remaining: usize,
    cursor: usize,
}

impl MergeNode {
    pub fn new(sources: Vec<AnyNode>) -> Self {
        let n = sources.len();
        Self {
            sources,
            done: vec![false; n],
            remaining: n,
            cursor: 0,
        }
    }

    pub fn name(&self) -> &str {
        "Merge"
    }

    fn fail(&mut self, failed: usize, error: FluxError) -> Signal {
        for (i, source) in self.sources.iter_mut().enumerate() {
            if i != failed && !self.done[i] {
                source.cancel();
            }
            self.done[i] = true;
        }
        self.remaining = 0;
        Signal::Error(error)
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        let n = self.sources.len();
        let mut scanned = 0;
        while self.remaining > 0 && scanned < n {
            let i = self.cursor;
            self.cursor = (self.cursor + 1) % n;
            scanned += 1;
            if self.done[i] {
                continue;
            }
            match self.sources[i].next(cx) {
                Pull::Ready(Signal::Value(v)) => return Pull::Ready(Signal::Value(v)),
                Pull::Ready(Signal::Complete) => {
                    self.done[i] = true;
                    self.remaining -= 1;
                }
                Pull::Ready(Signal::Error(e)) => return Pull::Ready(self.fail(i, e)),
                Pull::Pending => {}
            }
        }
        if self.remaining == 0 {
            Pull::Ready(Signal::Complete)
        } else {
            Pull::Pending
        }
    }

    pub fn cancel(&mut self) {
        for (i, source) in self.sources.iter_mut().enumerate() {
            if !self.done[i] {
                source.cancel();
                self.done[i] = true;
            }
        }
        self.remaining = 0;
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        for i in 0..self.sources.len() {
            if self.done[i] {
                continue;
            }
            match self.sources[i].poll_terminal(cx) {
                Some(Signal::Complete) => {
                    self.done[i] = true;
                    self.remaining -= 1;
                }
                Some(Signal::Error(e)) => return Some(self.fail(i, e)),
                _ => {}
            }
        }
        (self.remaining == 0).then_some(Signal::Complete)
    }
}

/// Merge whose upstreams run on executor tasks.
///
/// Upstreams are handed to the executor on the first pull. Order within one
/// upstream is preserved; order across upstreams is whatever the workers
/// produce.
pub struct ParallelMergeNode {
    sources: Vec<AnyNode>,
    executor: Arc<dyn Executor>,
    capacity: usize,
    rx: Option<Receiver<WorkerMessage>>,
    /// A value received while looking for a terminal signal.
    head: Option<Signal>,
    remaining: usize,
    token: CancelToken,
    started: bool,
}

impl ParallelMergeNode {
    pub fn new(sources: Vec<AnyNode>, executor: Arc<dyn Executor>, capacity: usize) -> Self {
        let remaining = sources.len();
        Self {
            sources,
            executor,
            capacity,
            rx: None,
            head: None,
            remaining,
            token: CancelToken::new(),
            started: false,
        }
    }

    pub fn name(&self) -> &str {
        "MergeParallel"
    }

    fn start(&mut self, cx: &NodeContext) -> Result<(), FluxError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        let (tx, rx) = worker_channel(self.capacity);
        self.rx = Some(rx);

        let mut worker_cx = cx.clone();
        worker_cx.cancel = self.token.clone();
        worker_cx.demand = self.capacity as u64;

        tracing::debug!(
            "Starting {} merge worker(s) on {} (capacity {})",
            self.sources.len(),
            self.executor.name(),
            self.capacity
        );
        for (source, node) in self.sources.drain(..).enumerate() {
            let tx = tx.clone();
            let cx = worker_cx.clone();
            let task_name = format!("rxflow-merge-{}", source);
            self.executor
                .execute(&task_name, Box::new(move || run_worker(source, node, cx, tx)))?;
        }
        Ok(())
    }

    fn receive(&mut self) -> Option<Result<Signal, TryRecvError>> {
        if let Some(signal) = self.head.take() {
            return Some(Ok(signal));
        }
        let rx = self.rx.as_ref()?;
        Some(rx.try_recv().map(|msg| msg.signal))
    }

    fn fail(&mut self, error: FluxError) -> Signal {
        self.token.cancel();
        self.remaining = 0;
        self.rx = None;
        Signal::Error(error)
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        if self.remaining == 0 {
            return Pull::Ready(Signal::Complete);
        }
        if let Err(e) = self.start(cx) {
            return Pull::Ready(self.fail(e));
        }
        loop {
            match self.receive() {
                Some(Ok(Signal::Value(v))) => return Pull::Ready(Signal::Value(v)),
                Some(Ok(Signal::Complete)) => {
                    self.remaining -= 1;
                    if self.remaining == 0 {
                        self.rx = None;
                        return Pull::Ready(Signal::Complete);
                    }
                }
                Some(Ok(Signal::Error(e))) => return Pull::Ready(self.fail(e)),
                Some(Err(TryRecvError::Empty)) => return Pull::Pending,
                Some(Err(TryRecvError::Disconnected)) | None => {
                    return Pull::Ready(self.fail(FluxError::upstream(
                        "merge worker exited before a terminal signal",
                    )))
                }
            }
        }
    }

    pub fn cancel(&mut self) {
        self.token.cancel();
        self.remaining = 0;
        self.rx = None;
        self.head = None;
        for source in &mut self.sources {
            source.cancel();
        }
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        if self.remaining == 0 {
            return Some(Signal::Complete);
        }
        if let Err(e) = self.start(cx) {
            return Some(self.fail(e));
        }
        loop {
            match self.receive()? {
                Ok(Signal::Complete) => {
                    self.remaining -= 1;
                    if self.remaining == 0 {
                        self.rx = None;
                        return Some(Signal::Complete);
                    }
                }
                Ok(Signal::Error(e)) => return Some(self.fail(e)),
                Ok(value) => {
                    self.head = Some(value);
                    return None;
                }
                Err(_) => return None,
            }
        }
    }
}

impl Drop for ParallelMergeNode {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
