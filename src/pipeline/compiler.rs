use super::compiled_plan::{CompiledPlan, PlanNode, PlanStats};
use super::flux::Flux;
use super::id::NodeId;

/// Compiles a blueprint into an execution plan
pub struct PipelineCompiler;

/// Work item of the iterative post-order walk.
struct Frame {
    flux: Flux,
    depth: usize,
    expanded: bool,
}

impl PipelineCompiler {
    /// Compile a blueprint into an execution plan.
    ///
    /// The blueprint is walked depth-first with an explicit stack, so very long
    /// operator chains do not exhaust the thread stack. Nodes are emitted in
    /// post-order: every node appears after all of its upstreams and the root
    /// comes last.
    ///
    /// A blueprint reachable along two paths (e.g. `f.concat_with(&f)`) is
    /// emitted once per path, so every live node has exactly one parent.
    pub fn compile(flux: &Flux) -> CompiledPlan {
        let start_time = std::time::Instant::now();

        let mut nodes: Vec<PlanNode> = Vec::new();
        // Ids of finished subtrees, consumed by their parent in operand order.
        let mut finished: Vec<NodeId> = Vec::new();
        let mut stack = vec![Frame {
            flux: flux.clone(),
            depth: 1,
            expanded: false,
        }];
        let mut max_depth = 0;

        while let Some(frame) = stack.pop() {
            if frame.expanded {
                let arity = frame.flux.spec().upstreams().len();
                let upstream = finished.split_off(finished.len().saturating_sub(arity));
                let id = NodeId(nodes.len() as u32);
                nodes.push(PlanNode {
                    id,
                    kind: frame.flux.kind(),
                    upstream,
                    source: frame.flux,
                });
                finished.push(id);
                continue;
            }

            max_depth = max_depth.max(frame.depth);
            let depth = frame.depth;
            let upstreams: Vec<Flux> = frame.flux.spec().upstreams().to_vec();
            stack.push(Frame {
                expanded: true,
                ..frame
            });
            // Reversed so the first operand is finished first.
            for up in upstreams.into_iter().rev() {
                stack.push(Frame {
                    flux: up,
                    depth: depth + 1,
                    expanded: false,
                });
            }
        }

        let root = finished.pop().unwrap_or(NodeId::INVALID);
        let stats = Self::stats(&nodes, max_depth, start_time.elapsed().as_micros() as u64);

        tracing::debug!(
            "Compiled plan: {} nodes ({} sources, {} combinators), depth {}, {}us",
            stats.total_nodes,
            stats.source_nodes,
            stats.combinator_nodes,
            stats.max_depth,
            stats.compile_time_us
        );

        CompiledPlan { nodes, root, stats }
    }

    fn stats(nodes: &[PlanNode], max_depth: usize, compile_time_us: u64) -> PlanStats {
        PlanStats {
            total_nodes: nodes.len(),
            source_nodes: nodes.iter().filter(|n| n.kind.is_source()).count(),
            combinator_nodes: nodes.iter().filter(|n| n.kind.is_combinator()).count(),
            max_depth,
            compile_time_us,
        }
    }
}
