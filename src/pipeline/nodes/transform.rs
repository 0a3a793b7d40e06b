//! Single-upstream transforms: map, filter, take, defaultIfEmpty,
//! collectList, then.

use crate::pipeline::node::{AnyNode, NodeContext, Pull};
use crate::pipeline::signal::{Signal, Value};
use std::sync::Arc;

pub type MapFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
pub type PredicateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Applies a function to every value.
pub struct MapNode {
    upstream: Box<AnyNode>,
    f: MapFn,
}

impl MapNode {
    pub fn new(upstream: AnyNode, f: MapFn) -> Self {
        Self {
            upstream: Box::new(upstream),
            f,
        }
    }

    pub fn name(&self) -> &str {
        "Map"
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        match self.upstream.next(cx) {
            Pull::Ready(Signal::Value(v)) => Pull::Ready(Signal::Value((self.f)(v))),
            other => other,
        }
    }

    pub fn cancel(&mut self) {
        self.upstream.cancel();
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        self.upstream.poll_terminal(cx)
    }
}

/// Drops values for which the predicate is false.
pub struct FilterNode {
    upstream: Box<AnyNode>,
    predicate: PredicateFn,
}

impl FilterNode {
    pub fn new(upstream: AnyNode, predicate: PredicateFn) -> Self {
        Self {
            upstream: Box::new(upstream),
            predicate,
        }
    }

    pub fn name(&self) -> &str {
        "Filter"
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        loop {
            match self.upstream.next(cx) {
                Pull::Ready(Signal::Value(v)) => {
                    if (self.predicate)(&v) {
                        return Pull::Ready(Signal::Value(v));
                    }
                }
                other => return other,
            }
        }
    }

    pub fn cancel(&mut self) {
        self.upstream.cancel();
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        self.upstream.poll_terminal(cx)
    }
}

/// Forwards the first `n` values, then cancels upstream and completes.
pub struct TakeNode {
    upstream: Box<AnyNode>,
    remaining: u64,
    upstream_cancelled: bool,
}

impl TakeNode {
    pub fn new(upstream: AnyNode, n: u64) -> Self {
        Self {
            upstream: Box::new(upstream),
            remaining: n,
            upstream_cancelled: false,
        }
    }

    pub fn name(&self) -> &str {
        "Take"
    }

    fn finish(&mut self) -> Signal {
        if !self.upstream_cancelled {
            self.upstream_cancelled = true;
            self.upstream.cancel();
        }
        Signal::Complete
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        if self.remaining == 0 {
            return Pull::Ready(self.finish());
        }
        match self.upstream.next(cx) {
            Pull::Ready(Signal::Value(v)) => {
                self.remaining -= 1;
                Pull::Ready(Signal::Value(v))
            }
            other => other,
        }
    }

    pub fn cancel(&mut self) {
        if !self.upstream_cancelled {
            self.upstream_cancelled = true;
            self.upstream.cancel();
        }
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        if self.remaining == 0 {
            Some(self.finish())
        } else {
            self.upstream.poll_terminal(cx)
        }
    }
}

/// Emits `fallback` if upstream completes without any value.
pub struct DefaultIfEmptyNode {
    upstream: Box<AnyNode>,
    fallback: Option<Value>,
    seen_value: bool,
    /// Upstream completed empty while there was no demand for the fallback.
    owes_fallback: bool,
    completing: bool,
}

impl DefaultIfEmptyNode {
    pub fn new(upstream: AnyNode, fallback: Value) -> Self {
        Self {
            upstream: Box::new(upstream),
            fallback: Some(fallback),
            seen_value: false,
            owes_fallback: false,
            completing: false,
        }
    }

    pub fn name(&self) -> &str {
        "DefaultIfEmpty"
    }

    fn emit_fallback(&mut self) -> Pull {
        match self.fallback.take() {
            Some(v) => {
                self.completing = true;
                Pull::Ready(Signal::Value(v))
            }
            None => Pull::Ready(Signal::Complete),
        }
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        if self.completing {
            return Pull::Ready(Signal::Complete);
        }
        if self.owes_fallback {
            return self.emit_fallback();
        }
        match self.upstream.next(cx) {
            Pull::Ready(Signal::Value(v)) => {
                self.seen_value = true;
                Pull::Ready(Signal::Value(v))
            }
            Pull::Ready(Signal::Complete) if !self.seen_value => self.emit_fallback(),
            other => other,
        }
    }

    pub fn cancel(&mut self) {
        self.upstream.cancel();
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        if self.completing {
            return Some(Signal::Complete);
        }
        if self.owes_fallback {
            return None;
        }
        match self.upstream.poll_terminal(cx)? {
            // An empty completion still owes the fallback value.
            Signal::Complete if !self.seen_value => {
                self.owes_fallback = true;
                None
            }
            terminal => Some(terminal),
        }
    }
}

/// Buffers every value and emits them as one `Value::List` on completion.
pub struct CollectListNode {
    upstream: Box<AnyNode>,
    items: Vec<Value>,
    upstream_done: bool,
    emitted: bool,
}

impl CollectListNode {
    pub fn new(upstream: AnyNode) -> Self {
        Self {
            upstream: Box::new(upstream),
            items: Vec::new(),
            upstream_done: false,
            emitted: false,
        }
    }

    pub fn name(&self) -> &str {
        "CollectList"
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        if self.emitted {
            return Pull::Ready(Signal::Complete);
        }
        loop {
            if self.upstream_done {
                self.emitted = true;
                let items = std::mem::take(&mut self.items);
                return Pull::Ready(Signal::Value(Value::List(items)));
            }
            match self.upstream.next(cx) {
                Pull::Ready(Signal::Value(v)) => self.items.push(v),
                Pull::Ready(Signal::Complete) => self.upstream_done = true,
                Pull::Ready(Signal::Error(e)) => {
                    self.items.clear();
                    return Pull::Ready(Signal::Error(e));
                }
                Pull::Pending => return Pull::Pending,
            }
        }
    }

    pub fn cancel(&mut self) {
        self.items.clear();
        self.upstream.cancel();
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        if self.emitted {
            return Some(Signal::Complete);
        }
        if self.upstream_done {
            return None;
        }
        match self.upstream.poll_terminal(cx)? {
            // The list itself still needs demand.
            Signal::Complete => {
                self.upstream_done = true;
                None
            }
            terminal => {
                self.items.clear();
                Some(terminal)
            }
        }
    }
}

/// Discards values; forwards only the terminal signal.
pub struct ThenNode {
    upstream: Box<AnyNode>,
}

impl ThenNode {
    pub fn new(upstream: AnyNode) -> Self {
        Self {
            upstream: Box::new(upstream),
        }
    }

    pub fn name(&self) -> &str {
        "Then"
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        loop {
            match self.upstream.next(cx) {
                Pull::Ready(Signal::Value(_)) => continue,
                other => return other,
            }
        }
    }

    pub fn cancel(&mut self) {
        self.upstream.cancel();
    }

    // Values never reach downstream, so draining them needs no demand.
    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        match self.next(cx) {
            Pull::Ready(signal) => Some(signal),
            Pull::Pending => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::clock::VirtualClock;
    use crate::pipeline::error::FluxError;
    use crate::pipeline::node::BuiltinNode;
    use crate::pipeline::nodes::{ErrorNode, JustNode};
    use std::time::Duration;

    fn cx() -> NodeContext {
        NodeContext::new(Arc::new(VirtualClock::new()), Duration::from_millis(1))
    }

    fn just(values: Vec<Value>) -> AnyNode {
        AnyNode::Builtin(BuiltinNode::Just(JustNode::new(values)))
    }

    fn drain(node: &mut impl FnMut(&NodeContext) -> Pull) -> Vec<Signal> {
        let cx = cx();
        let mut out = Vec::new();
        loop {
            match node(&cx) {
                Pull::Ready(s) => {
                    let terminal = s.is_terminal();
                    out.push(s);
                    if terminal {
                        return out;
                    }
                }
                Pull::Pending => return out,
            }
        }
    }

    #[test]
    fn test_map_and_filter() {
        let mut map = MapNode::new(
            just(vec![1.into(), 2.into(), 3.into()]),
            Arc::new(|v| Value::Int(v.as_int().unwrap_or_default() * 10)),
        );
        assert_eq!(
            drain(&mut |cx| map.next(cx)),
            vec![
                Signal::Value(Value::Int(10)),
                Signal::Value(Value::Int(20)),
                Signal::Value(Value::Int(30)),
                Signal::Complete
            ]
        );

        let mut filter = FilterNode::new(
            just(vec![1.into(), 2.into(), 3.into(), 4.into()]),
            Arc::new(|v| v.as_int().map(|i| i % 2 == 0).unwrap_or(false)),
        );
        assert_eq!(
            drain(&mut |cx| filter.next(cx)),
            vec![
                Signal::Value(Value::Int(2)),
                Signal::Value(Value::Int(4)),
                Signal::Complete
            ]
        );
    }

    #[test]
    fn test_take_completes_early() {
        let mut take = TakeNode::new(just(vec![1.into(), 2.into(), 3.into()]), 2);
        let cx = cx();
        assert_eq!(take.poll_terminal(&cx), None);
        assert_eq!(take.next(&cx), Pull::Ready(Signal::Value(Value::Int(1))));
        assert_eq!(take.next(&cx), Pull::Ready(Signal::Value(Value::Int(2))));
        assert_eq!(take.poll_terminal(&cx), Some(Signal::Complete));
    }

    #[test]
    fn test_take_zero() {
        let mut take = TakeNode::new(just(vec![1.into()]), 0);
        assert_eq!(drain(&mut |cx| take.next(cx)), vec![Signal::Complete]);
    }

    #[test]
    fn test_default_if_empty() {
        let mut empty = DefaultIfEmptyNode::new(just(vec![]), "flux1...".into());
        assert_eq!(
            drain(&mut |cx| empty.next(cx)),
            vec![Signal::Value("flux1...".into()), Signal::Complete]
        );

        let mut non_empty = DefaultIfEmptyNode::new(just(vec!["x".into()]), "fallback".into());
        assert_eq!(
            drain(&mut |cx| non_empty.next(cx)),
            vec![Signal::Value("x".into()), Signal::Complete]
        );
    }

    #[test]
    fn test_collect_list() {
        let mut collect = CollectListNode::new(just(vec!["f1".into(), "f2".into()]));
        assert_eq!(
            drain(&mut |cx| collect.next(cx)),
            vec![
                Signal::Value(Value::List(vec!["f1".into(), "f2".into()])),
                Signal::Complete
            ]
        );
    }

    #[test]
    fn test_then_discards_values_and_keeps_error() {
        let mut then = ThenNode::new(just(vec![1.into(), 2.into()]));
        assert_eq!(drain(&mut |cx| then.next(cx)), vec![Signal::Complete]);

        let failing = AnyNode::Builtin(BuiltinNode::Error(ErrorNode::new(FluxError::upstream(
            "boom",
        ))));
        let mut then = ThenNode::new(failing);
        assert_eq!(
            drain(&mut |cx| then.next(cx)),
            vec![Signal::Error(FluxError::upstream("boom"))]
        );
    }

    fn failing(message: &str) -> AnyNode {
        AnyNode::Builtin(BuiltinNode::Error(ErrorNode::new(FluxError::upstream(
            message,
        ))))
    }

    #[test]
    fn test_default_if_empty_error_without_demand() {
        let cx = cx();
        let mut node = DefaultIfEmptyNode::new(failing("e"), "fallback".into());
        assert_eq!(
            node.poll_terminal(&cx),
            Some(Signal::Error(FluxError::upstream("e")))
        );
    }

    #[test]
    fn test_default_if_empty_holds_fallback_for_demand() {
        let cx = cx();
        let mut node = DefaultIfEmptyNode::new(just(vec![]), "fallback".into());
        assert_eq!(node.poll_terminal(&cx), None);
        assert_eq!(node.poll_terminal(&cx), None);
        assert_eq!(
            node.next(&cx),
            Pull::Ready(Signal::Value("fallback".into()))
        );
        assert_eq!(node.poll_terminal(&cx), Some(Signal::Complete));
    }

    #[test]
    fn test_collect_list_error_without_demand() {
        let cx = cx();
        let mut node = CollectListNode::new(failing("e"));
        assert_eq!(
            node.poll_terminal(&cx),
            Some(Signal::Error(FluxError::upstream("e")))
        );
    }

    #[test]
    fn test_collect_list_waits_for_demand_after_empty_completion() {
        let cx = cx();
        let mut node = CollectListNode::new(just(vec![]));
        assert_eq!(node.poll_terminal(&cx), None);
        assert_eq!(
            node.next(&cx),
            Pull::Ready(Signal::Value(Value::List(Vec::new())))
        );
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Complete));
    }
}
