//! ZipNode: combines the i-th value of every upstream into one tuple.
//!
//! The first upstream to complete ends the zip; values already buffered from
//! the other upstreams are discarded and those upstreams are cancelled.

use crate::pipeline::node::{AnyNode, NodeContext, Pull};
use crate::pipeline::signal::{Signal, Value};
use std::collections::VecDeque;

pub struct ZipNode {
    sources: Vec<AnyNode>,
    buffers: Vec<VecDeque<Value>>,
    finished: bool,
}

impl ZipNode {
    pub fn new(sources: Vec<AnyNode>) -> Self {
        let buffers = sources.iter().map(|_| VecDeque::new()).collect();
        Self {
            sources,
            buffers,
            finished: false,
        }
    }

    pub fn name(&self) -> &str {
        "Zip"
    }

    fn finish(&mut self, ended: usize, signal: Signal) -> Signal {
        for (i, source) in self.sources.iter_mut().enumerate() {
            if i != ended {
                source.cancel();
            }
        }
        let discarded: usize = self.buffers.iter().map(VecDeque::len).sum();
        if discarded > 0 {
            tracing::trace!("Zip discarding {} buffered value(s)", discarded);
        }
        self.buffers.iter_mut().for_each(VecDeque::clear);
        self.finished = true;
        signal
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        if self.finished || self.sources.is_empty() {
            self.finished = true;
            return Pull::Ready(Signal::Complete);
        }
        // Keep scanning past a pending upstream so a later terminal is not
        // hidden behind it.
        let mut pending = false;
        for i in 0..self.sources.len() {
            if !self.buffers[i].is_empty() {
                continue;
            }
            match self.sources[i].next(cx) {
                Pull::Ready(Signal::Value(v)) => self.buffers[i].push_back(v),
                Pull::Ready(terminal) => return Pull::Ready(self.finish(i, terminal)),
                Pull::Pending => pending = true,
            }
        }
        if pending {
            return Pull::Pending;
        }
        let tuple = self
            .buffers
            .iter_mut()
            .filter_map(VecDeque::pop_front)
            .collect();
        Pull::Ready(Signal::Value(Value::Tuple(tuple)))
    }

    pub fn cancel(&mut self) {
        for source in &mut self.sources {
            source.cancel();
        }
        self.buffers.iter_mut().for_each(VecDeque::clear);
        self.finished = true;
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        if self.finished || self.sources.is_empty() {
            return Some(Signal::Complete);
        }
        for i in 0..self.sources.len() {
            if !self.buffers[i].is_empty() {
                continue;
            }
            if let Some(terminal) = self.sources[i].poll_terminal(cx) {
                return Some(self.finish(i, terminal));
            }
        }
        None
    }
}
