//! CreateNode: bridges a push-style emitter into the pull-based graph.
//!
//! The generator runs once, on the first pull, with a [`FluxSink`]. The sink
//! may be cloned and moved to other threads; every emission goes through an
//! unbounded crossbeam channel and rings the subscription's wake signal.
//!
//! Values that arrive faster than they are pulled are handled by the node's
//! [`OverflowStrategy`].

use crate::pipeline::bridge::{CancelToken, WakeSignal};
use crate::pipeline::error::FluxError;
use crate::pipeline::node::{NodeContext, Pull};
use crate::pipeline::signal::{Signal, Value};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Generator closure handed to `Flux::create`.
pub type Generator = Arc<dyn Fn(FluxSink) + Send + Sync>;

/// What a `create` source does with values the consumer has not asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowStrategy {
    /// Queue them until demand arrives.
    #[default]
    Buffer,
    /// Fail the stream with `FluxError::DemandViolation`.
    Error,
}

/// Push handle given to a `create` generator.
#[derive(Clone)]
pub struct FluxSink {
    tx: Sender<Signal>,
    terminated: Arc<AtomicBool>,
    cancel: CancelToken,
    wake: Arc<WakeSignal>,
}

impl FluxSink {
    /// Emit a value. Returns `false` if the sink is terminated or cancelled.
    pub fn next(&self, value: impl Into<Value>) -> bool {
        self.emit(Signal::Value(value.into()))
    }

    pub fn error(&self, error: FluxError) -> bool {
        self.emit(Signal::Error(error))
    }

    pub fn complete(&self) -> bool {
        self.emit(Signal::Complete)
    }

    /// Whether the downstream subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn emit(&self, signal: Signal) -> bool {
        if self.cancel.is_cancelled() || self.terminated.load(Ordering::SeqCst) {
            return false;
        }
        if signal.is_terminal() && self.terminated.swap(true, Ordering::SeqCst) {
            return false;
        }
        if self.tx.send(signal).is_err() {
            return false;
        }
        self.wake.notify();
        true
    }
}

pub struct CreateNode {
    generator: Option<Generator>,
    strategy: OverflowStrategy,
    rx: Option<Receiver<Signal>>,
    buffer: VecDeque<Value>,
    terminal: Option<Signal>,
    disconnected: bool,
    cancel: CancelToken,
}

impl CreateNode {
    pub fn new(generator: Generator, strategy: OverflowStrategy) -> Self {
        Self {
            generator: Some(generator),
            strategy,
            rx: None,
            buffer: VecDeque::new(),
            terminal: None,
            disconnected: false,
            cancel: CancelToken::new(),
        }
    }

    pub fn name(&self) -> &str {
        "Create"
    }

    fn start(&mut self, cx: &NodeContext) {
        let Some(generator) = self.generator.take() else {
            return;
        };
        let (tx, rx) = unbounded();
        self.rx = Some(rx);
        let sink = FluxSink {
            tx,
            terminated: Arc::new(AtomicBool::new(false)),
            cancel: self.cancel.clone(),
            wake: cx.wake.clone(),
        };
        generator(sink);
    }

    fn drain_channel(&mut self) {
        if self.terminal.is_some() || self.disconnected {
            return;
        }
        let Some(rx) = &self.rx else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(Signal::Value(v)) => self.buffer.push_back(v),
                Ok(terminal) => {
                    self.terminal = Some(terminal);
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        self.start(cx);
        self.drain_channel();

        if self.strategy == OverflowStrategy::Error && self.buffer.len() as u64 > cx.demand {
            let attempted = self.buffer.len() as u64;
            tracing::warn!(
                "Create source overflowed: {} buffered, {} requested",
                attempted,
                cx.demand
            );
            self.cancel();
            return Pull::Ready(Signal::Error(FluxError::DemandViolation {
                outstanding: cx.demand,
                attempted,
            }));
        }

        if let Some(v) = self.buffer.pop_front() {
            return Pull::Ready(Signal::Value(v));
        }
        if let Some(terminal) = self.terminal.take() {
            return Pull::Ready(terminal);
        }
        if self.disconnected {
            return Pull::Ready(Signal::Error(FluxError::upstream(
                "emitter dropped before a terminal signal",
            )));
        }
        Pull::Pending
    }

    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.rx = None;
        self.buffer.clear();
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        // The generator runs on subscription even before any demand.
        self.start(cx);
        self.drain_channel();
        if !self.buffer.is_empty() {
            return None;
        }
        if let Some(terminal) = self.terminal.take() {
            return Some(terminal);
        }
        self.disconnected.then(|| {
            Signal::Error(FluxError::upstream(
                "emitter dropped before a terminal signal",
            ))
        })
    }
}
