//! Live node abstraction for the stream engine.
//!
//! Two-layer design:
//! - **`NodePlugin` trait**: for user-defined sources plugged in via
//!   `Flux::from_plugin`.
//! - **`BuiltinNode` enum**: for all built-in nodes. The subscription loop
//!   dispatches with a `match`, no dynamic dispatch on the hot path.
//!
//! `AnyNode` wraps either variant so parents can own upstreams uniformly.
//!
//! Nodes are pulled: a parent calls `next` when it wants one more signal. A
//! node that has returned a terminal signal is never pulled again.

use crate::pipeline::bridge::{CancelToken, WakeSignal};
use crate::pipeline::clock::Clock;
use crate::pipeline::nodes::{
    CollectListNode, ConcatNode, CreateNode, DefaultIfEmptyNode, ErrorNode, FilterNode,
    FlatMapNode, IntervalNode, JustNode, LogNode, MapNode, MergeNode, NeverNode,
    OnErrorResumeNode, OnErrorReturnNode, ParallelMergeNode, RangeNode, TakeNode, ThenNode,
    ZipNode,
};
use crate::pipeline::signal::Signal;
use std::sync::Arc;
use std::time::Duration;

/// Result of pulling a node once.
#[derive(Debug, Clone, PartialEq)]
pub enum Pull {
    /// The node produced a signal.
    Ready(Signal),
    /// Nothing available yet; a producer on another thread or the clock must
    /// make progress first.
    Pending,
}

/// Context passed to every pull.
///
/// Cheap to clone: parallel merge hands a clone to each worker task.
#[derive(Clone)]
pub struct NodeContext {
    /// Set once the owning subscription is cancelled or terminated.
    pub cancel: CancelToken,
    /// Time source for `interval`.
    pub clock: Arc<dyn Clock>,
    /// Rung by producers on other threads when they make progress.
    pub wake: Arc<WakeSignal>,
    /// Outstanding demand of the final consumer at the time of the pull.
    pub demand: u64,
    /// How long a worker task parks when its upstream is pending.
    pub idle_wait: Duration,
}

impl NodeContext {
    pub fn new(clock: Arc<dyn Clock>, idle_wait: Duration) -> Self {
        Self {
            cancel: CancelToken::new(),
            clock,
            wake: WakeSignal::new(),
            demand: 0,
            idle_wait,
        }
    }
}

/// Trait for user-defined source nodes.
pub trait NodePlugin: Send {
    /// Human-readable name of this node.
    fn name(&self) -> &str;

    /// Produce the next signal, or `Pull::Pending`.
    fn next(&mut self, cx: &NodeContext) -> Pull;

    /// Stop producing. Called at most once.
    fn cancel(&mut self) {}

    /// Report a terminal signal without producing a value, if already known.
    fn poll_terminal(&mut self, _cx: &NodeContext) -> Option<Signal> {
        None
    }
}

/// Enum dispatch for built-in nodes.
pub enum BuiltinNode {
    Just(JustNode),
    Range(RangeNode),
    Never(NeverNode),
    Error(ErrorNode),
    Interval(IntervalNode),
    Create(CreateNode),
    Map(MapNode),
    Filter(FilterNode),
    Take(TakeNode),
    Log(LogNode),
    DefaultIfEmpty(DefaultIfEmptyNode),
    FlatMap(FlatMapNode),
    CollectList(CollectListNode),
    Then(ThenNode),
    OnErrorReturn(OnErrorReturnNode),
    OnErrorResume(OnErrorResumeNode),
    Concat(ConcatNode),
    Merge(MergeNode),
    ParallelMerge(ParallelMergeNode),
    Zip(ZipNode),
}

macro_rules! dispatch {
    ($self:expr, $n:ident => $body:expr) => {
        match $self {
            BuiltinNode::Just($n) => $body,
            BuiltinNode::Range($n) => $body,
            BuiltinNode::Never($n) => $body,
            BuiltinNode::Error($n) => $body,
            BuiltinNode::Interval($n) => $body,
            BuiltinNode::Create($n) => $body,
            BuiltinNode::Map($n) => $body,
            BuiltinNode::Filter($n) => $body,
            BuiltinNode::Take($n) => $body,
            BuiltinNode::Log($n) => $body,
            BuiltinNode::DefaultIfEmpty($n) => $body,
            BuiltinNode::FlatMap($n) => $body,
            BuiltinNode::CollectList($n) => $body,
            BuiltinNode::Then($n) => $body,
            BuiltinNode::OnErrorReturn($n) => $body,
            BuiltinNode::OnErrorResume($n) => $body,
            BuiltinNode::Concat($n) => $body,
            BuiltinNode::Merge($n) => $body,
            BuiltinNode::ParallelMerge($n) => $body,
            BuiltinNode::Zip($n) => $body,
        }
    };
}

impl BuiltinNode {
    pub fn name(&self) -> &str {
        dispatch!(self, n => n.name())
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        dispatch!(self, n => n.next(cx))
    }

    pub fn cancel(&mut self) {
        dispatch!(self, n => n.cancel())
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        dispatch!(self, n => n.poll_terminal(cx))
    }
}

/// Wrapper that holds either a built-in node (enum dispatch) or a plugin (trait object).
pub enum AnyNode {
    Builtin(BuiltinNode),
    Plugin(Box<dyn NodePlugin>),
}

impl AnyNode {
    pub fn name(&self) -> &str {
        match self {
            AnyNode::Builtin(n) => n.name(),
            AnyNode::Plugin(n) => n.name(),
        }
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        match self {
            AnyNode::Builtin(n) => n.next(cx),
            AnyNode::Plugin(n) => n.next(cx),
        }
    }

    pub fn cancel(&mut self) {
        match self {
            AnyNode::Builtin(n) => n.cancel(),
            AnyNode::Plugin(n) => n.cancel(),
        }
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        match self {
            AnyNode::Builtin(n) => n.poll_terminal(cx),
            AnyNode::Plugin(n) => n.poll_terminal(cx),
        }
    }
}

impl From<BuiltinNode> for AnyNode {
    fn from(node: BuiltinNode) -> Self {
        AnyNode::Builtin(node)
    }
}
