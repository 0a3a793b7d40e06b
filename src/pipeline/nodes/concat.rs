//! ConcatNode: drains upstreams strictly one after another.

use crate::pipeline::node::{AnyNode, NodeContext, Pull};
use crate::pipeline::signal::Signal;

pub struct ConcatNode {
    sources: Vec<AnyNode>,
    current: usize,
}

impl ConcatNode {
    pub fn new(sources: Vec<AnyNode>) -> Self {
        Self {
            sources,
            current: 0,
        }
    }

    pub fn name(&self) -> &str {
        "Concat"
    }

    /// Cancel every upstream that has not been drained yet.
    fn cancel_remaining(&mut self) {
        for source in self.sources.iter_mut().skip(self.current + 1) {
            source.cancel();
        }
        self.current = self.sources.len();
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        while let Some(source) = self.sources.get_mut(self.current) {
            match source.next(cx) {
                Pull::Ready(Signal::Complete) => {
                    tracing::trace!("Concat advancing past upstream {}", self.current);
                    self.current += 1;
                }
                Pull::Ready(Signal::Error(e)) => {
                    self.cancel_remaining();
                    return Pull::Ready(Signal::Error(e));
                }
                other => return other,
            }
        }
        Pull::Ready(Signal::Complete)
    }

    pub fn cancel(&mut self) {
        for source in self.sources.iter_mut().skip(self.current) {
            source.cancel();
        }
        self.current = self.sources.len();
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        while let Some(source) = self.sources.get_mut(self.current) {
            match source.poll_terminal(cx)? {
                Signal::Complete => self.current += 1,
                Signal::Error(e) => {
                    self.cancel_remaining();
                    return Some(Signal::Error(e));
                }
                Signal::Value(_) => return None,
            }
        }
        Some(Signal::Complete)
    }
}
