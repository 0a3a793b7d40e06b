//! Compiled execution plan for a blueprint, and its instantiation into live
//! nodes.

use crate::pipeline::compiler::PipelineCompiler;
use crate::pipeline::error::{FluxError, FluxResult};
use crate::pipeline::executor::{Executor, ThreadExecutor};
use crate::pipeline::flux::{Flux, NodeSpec};
use crate::pipeline::id::NodeId;
use crate::pipeline::node::{AnyNode, BuiltinNode};
use crate::pipeline::node_type::NodeKind;
use crate::pipeline::nodes::{
    CollectListNode, ConcatNode, CreateNode, DefaultIfEmptyNode, ErrorNode, FilterNode,
    FlatMapNode, IntervalNode, JustNode, LogNode, MapNode, MergeNode, NeverNode,
    OnErrorResumeNode, OnErrorReturnNode, ParallelMergeNode, RangeNode, TakeNode, ThenNode,
    ZipNode,
};
use std::fmt;
use std::sync::Arc;

/// One node of a compiled plan.
#[derive(Clone)]
pub struct PlanNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Upstream node ids, in operand order. Always lower than `id`.
    pub upstream: Vec<NodeId>,
    /// Blueprint this node was compiled from.
    pub source: Flux,
}

impl fmt::Debug for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("upstream", &self.upstream)
            .finish()
    }
}

/// Compiled execution plan for a blueprint.
/// Nodes are stored sources first: every node appears after all of its upstreams.
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    /// Nodes in post-order; `nodes[i].id == NodeId(i)`.
    pub nodes: Vec<PlanNode>,

    /// The node whose signals reach the subscriber (last in `nodes`).
    pub root: NodeId,

    /// Compilation statistics
    pub stats: PlanStats,
}

/// Statistics about the compiled plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanStats {
    /// Total number of nodes in the plan
    pub total_nodes: usize,

    /// Number of source nodes (no upstream)
    pub source_nodes: usize,

    /// Number of fan-in combinators (concat, merge, zip)
    pub combinator_nodes: usize,

    /// Longest chain from the root to a source, counted in nodes
    pub max_depth: usize,

    /// Compilation time in microseconds
    pub compile_time_us: u64,
}

/// What live nodes need from the subscription that instantiates them.
#[derive(Clone)]
pub struct InstantiateEnv {
    /// Runs `merge_parallel` workers that do not name their own executor.
    pub executor: Arc<dyn Executor>,
    /// Default worker channel capacity for `merge_parallel`.
    pub queue_capacity: usize,
}

impl Default for InstantiateEnv {
    fn default() -> Self {
        Self {
            executor: Arc::new(ThreadExecutor::new()),
            queue_capacity: 256,
        }
    }
}

impl InstantiateEnv {
    /// Compile and instantiate a blueprint. Used for inner streams created
    /// while a subscription is running.
    pub fn build(&self, flux: &Flux) -> FluxResult<AnyNode> {
        PipelineCompiler::compile(flux).instantiate(self)
    }
}

impl CompiledPlan {
    /// Check if the plan has any nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&PlanNode> {
        self.nodes.get(id.index())
    }

    /// Build a fresh tree of live nodes. Every call yields independent state.
    pub fn instantiate(&self, env: &InstantiateEnv) -> FluxResult<AnyNode> {
        let mut slots: Vec<Option<AnyNode>> = Vec::with_capacity(self.nodes.len());
        for plan_node in &self.nodes {
            let upstream = plan_node
                .upstream
                .iter()
                .map(|id| {
                    slots
                        .get_mut(id.index())
                        .and_then(Option::take)
                        .ok_or_else(|| missing_node(*id))
                })
                .collect::<FluxResult<Vec<_>>>()?;
            slots.push(Some(build_node(plan_node, upstream, env)?));
        }
        slots
            .get_mut(self.root.index())
            .and_then(Option::take)
            .ok_or_else(|| missing_node(self.root))
    }
}

fn missing_node(id: NodeId) -> FluxError {
    FluxError::upstream(format!("compiled plan references missing {}", id))
}

fn single(mut upstream: Vec<AnyNode>, id: NodeId) -> FluxResult<AnyNode> {
    upstream.pop().ok_or_else(|| missing_node(id))
}

fn build_node(
    plan_node: &PlanNode,
    upstream: Vec<AnyNode>,
    env: &InstantiateEnv,
) -> FluxResult<AnyNode> {
    let id = plan_node.id;
    let node = match plan_node.source.spec() {
        NodeSpec::Just(values) => BuiltinNode::Just(JustNode::new(values.clone())),
        NodeSpec::Empty => BuiltinNode::Just(JustNode::new(Vec::new())),
        NodeSpec::Never => BuiltinNode::Never(NeverNode::new()),
        NodeSpec::Error(e) => BuiltinNode::Error(ErrorNode::new(e.clone())),
        NodeSpec::Range { start, count } => BuiltinNode::Range(RangeNode::new(*start, *count)),
        NodeSpec::Interval(period) => BuiltinNode::Interval(IntervalNode::new(*period)),
        NodeSpec::Create {
            generator,
            strategy,
        } => BuiltinNode::Create(CreateNode::new(generator.clone(), *strategy)),
        NodeSpec::Plugin { factory, .. } => return Ok(AnyNode::Plugin(factory())),
        NodeSpec::Map { f, .. } => BuiltinNode::Map(MapNode::new(single(upstream, id)?, f.clone())),
        NodeSpec::Filter { predicate, .. } => {
            BuiltinNode::Filter(FilterNode::new(single(upstream, id)?, predicate.clone()))
        }
        NodeSpec::Take { n, .. } => BuiltinNode::Take(TakeNode::new(single(upstream, id)?, *n)),
        NodeSpec::Log { category, .. } => {
            BuiltinNode::Log(LogNode::new(single(upstream, id)?, id, category.clone()))
        }
        NodeSpec::DefaultIfEmpty { value, .. } => BuiltinNode::DefaultIfEmpty(
            DefaultIfEmptyNode::new(single(upstream, id)?, value.clone()),
        ),
        NodeSpec::FlatMap { f, .. } => BuiltinNode::FlatMap(FlatMapNode::new(
            single(upstream, id)?,
            f.clone(),
            env.clone(),
        )),
        NodeSpec::CollectList(_) => {
            BuiltinNode::CollectList(CollectListNode::new(single(upstream, id)?))
        }
        NodeSpec::Then(_) => BuiltinNode::Then(ThenNode::new(single(upstream, id)?)),
        NodeSpec::OnErrorReturn { value, .. } => BuiltinNode::OnErrorReturn(
            OnErrorReturnNode::new(single(upstream, id)?, value.clone()),
        ),
        NodeSpec::OnErrorResume { f, .. } => BuiltinNode::OnErrorResume(OnErrorResumeNode::new(
            single(upstream, id)?,
            f.clone(),
            env.clone(),
        )),
        NodeSpec::Concat(_) => BuiltinNode::Concat(ConcatNode::new(upstream)),
        NodeSpec::Merge(_) => BuiltinNode::Merge(MergeNode::new(upstream)),
        NodeSpec::MergeParallel {
            executor, capacity, ..
        } => BuiltinNode::ParallelMerge(ParallelMergeNode::new(
            upstream,
            executor.clone().unwrap_or_else(|| env.executor.clone()),
            capacity.unwrap_or(env.queue_capacity),
        )),
        NodeSpec::Zip(_) => BuiltinNode::Zip(ZipNode::new(upstream)),
    };
    Ok(AnyNode::Builtin(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::clock::VirtualClock;
    use crate::pipeline::node::{NodeContext, Pull};
    use crate::pipeline::signal::{Signal, Value};
    use std::time::Duration;

    #[test]
    fn test_instantiate_is_cold() {
        let flux = Flux::just(vec!["a".into()]).concat_with(&Flux::just(vec!["b".into()]));
        let plan = flux.plan();
        let mut cx = NodeContext::new(Arc::new(VirtualClock::new()), Duration::from_millis(1));
        cx.demand = u64::MAX;

        for _ in 0..2 {
            let mut node = plan.instantiate(&InstantiateEnv::default()).unwrap();
            assert_eq!(node.next(&cx), Pull::Ready(Signal::Value(Value::from("a"))));
            assert_eq!(node.next(&cx), Pull::Ready(Signal::Value(Value::from("b"))));
            assert_eq!(node.next(&cx), Pull::Ready(Signal::Complete));
        }
    }

    #[test]
    fn test_root_is_last() {
        let plan = Flux::range(0, 3).map(|v| v).plan();
        assert_eq!(plan.root, NodeId(1));
        assert_eq!(plan.node(plan.root).map(|n| n.kind), Some(NodeKind::Map));
        assert!(!plan.is_empty());
    }
}
