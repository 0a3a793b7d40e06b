//! Finite and degenerate sources: `just`, `empty`, `range`, `never`, `error`.

use crate::pipeline::error::FluxError;
use crate::pipeline::node::{NodeContext, Pull};
use crate::pipeline::signal::{Signal, Value};
use std::collections::VecDeque;

/// Emits a fixed list of values, then completes. `empty` is a `JustNode`
/// with no values.
pub struct JustNode {
    values: VecDeque<Value>,
}

impl JustNode {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into(),
        }
    }

    pub fn name(&self) -> &str {
        "Just"
    }

    pub fn next(&mut self, _cx: &NodeContext) -> Pull {
        match self.values.pop_front() {
            Some(v) => Pull::Ready(Signal::Value(v)),
            None => Pull::Ready(Signal::Complete),
        }
    }

    pub fn cancel(&mut self) {
        self.values.clear();
    }

    pub fn poll_terminal(&mut self, _cx: &NodeContext) -> Option<Signal> {
        self.values.is_empty().then_some(Signal::Complete)
    }
}

/// Emits `count` consecutive integers starting at `start`.
pub struct RangeNode {
    next: i64,
    end: i64,
}

impl RangeNode {
    pub fn new(start: i64, count: u64) -> Self {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        Self {
            next: start,
            end: start.saturating_add(count),
        }
    }

    pub fn name(&self) -> &str {
        "Range"
    }

    pub fn next(&mut self, _cx: &NodeContext) -> Pull {
        if self.next >= self.end {
            return Pull::Ready(Signal::Complete);
        }
        let v = self.next;
        self.next += 1;
        Pull::Ready(Signal::Value(Value::Int(v)))
    }

    pub fn cancel(&mut self) {
        self.next = self.end;
    }

    pub fn poll_terminal(&mut self, _cx: &NodeContext) -> Option<Signal> {
        (self.next >= self.end).then_some(Signal::Complete)
    }
}

/// Never signals.
#[derive(Default)]
pub struct NeverNode;

impl NeverNode {
    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &str {
        "Never"
    }

    pub fn next(&mut self, _cx: &NodeContext) -> Pull {
        Pull::Pending
    }

    pub fn cancel(&mut self) {}

    pub fn poll_terminal(&mut self, _cx: &NodeContext) -> Option<Signal> {
        None
    }
}

/// Fails on the first pull.
pub struct ErrorNode {
    error: FluxError,
}

impl ErrorNode {
    pub fn new(error: FluxError) -> Self {
        Self { error }
    }

    pub fn name(&self) -> &str {
        "Error"
    }

    pub fn next(&mut self, _cx: &NodeContext) -> Pull {
        Pull::Ready(Signal::Error(self.error.clone()))
    }

    pub fn cancel(&mut self) {}

    pub fn poll_terminal(&mut self, _cx: &NodeContext) -> Option<Signal> {
        Some(Signal::Error(self.error.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::clock::VirtualClock;
    use std::sync::Arc;
    use std::time::Duration;

    fn cx() -> NodeContext {
        NodeContext::new(Arc::new(VirtualClock::new()), Duration::from_millis(1))
    }

    #[test]
    fn test_just_emits_then_completes() {
        let cx = cx();
        let mut node = JustNode::new(vec!["one".into(), "two".into()]);
        assert_eq!(node.poll_terminal(&cx), None);
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value("one".into())));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value("two".into())));
        assert_eq!(node.poll_terminal(&cx), Some(Signal::Complete));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Complete));
    }

    #[test]
    fn test_range() {
        let cx = cx();
        let mut node = RangeNode::new(5, 2);
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value(Value::Int(5))));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value(Value::Int(6))));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Complete));
    }

    #[test]
    fn test_never_and_error() {
        let cx = cx();
        assert_eq!(NeverNode::new().next(&cx), Pull::Pending);

        let mut err = ErrorNode::new(FluxError::upstream("boom"));
        assert_eq!(
            err.next(&cx),
            Pull::Ready(Signal::Error(FluxError::upstream("boom")))
        );
    }
}
