//! `Flux`: the inert blueprint of a stream, built with a fluent API.
//!
//! Nothing runs while a blueprint is assembled. Each `subscribe` compiles the
//! blueprint into a [`CompiledPlan`] and instantiates fresh live nodes, so one
//! blueprint can be subscribed any number of times.
//!
//! ```
//! use rxflow::pipeline::{Flux, Value};
//!
//! let flux = Flux::just(vec!["a".into(), "b".into()])
//!     .concat_with(&Flux::just(vec!["c".into()]))
//!     .map(|v| Value::from(v.to_string().to_uppercase()));
//! assert_eq!(flux.plan().stats.total_nodes, 4);
//! ```

use crate::pipeline::compiled_plan::CompiledPlan;
use crate::pipeline::compiler::PipelineCompiler;
use crate::pipeline::error::FluxError;
use crate::pipeline::executor::Executor;
use crate::pipeline::node::NodePlugin;
use crate::pipeline::node_type::NodeKind;
use crate::pipeline::nodes::{FluxSink, Generator, MapFn, OverflowStrategy, PredicateFn};
use crate::pipeline::signal::Value;
use crate::pipeline::subscription::{
    LambdaSubscriber, SubscribeOptions, Subscriber, Subscription,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type FlatMapFn = Arc<dyn Fn(Value) -> Flux + Send + Sync>;
pub type ResumeFn = Arc<dyn Fn(FluxError) -> Flux + Send + Sync>;
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn NodePlugin> + Send + Sync>;

/// One blueprint node. Operators own their upstream blueprints.
pub enum NodeSpec {
    Just(Vec<Value>),
    Empty,
    Never,
    Error(FluxError),
    Range {
        start: i64,
        count: u64,
    },
    Interval(Duration),
    Create {
        generator: Generator,
        strategy: OverflowStrategy,
    },
    Plugin {
        name: String,
        factory: PluginFactory,
    },
    Map {
        upstream: Flux,
        f: MapFn,
    },
    Filter {
        upstream: Flux,
        predicate: PredicateFn,
    },
    Take {
        upstream: Flux,
        n: u64,
    },
    Log {
        upstream: Flux,
        category: String,
    },
    DefaultIfEmpty {
        upstream: Flux,
        value: Value,
    },
    FlatMap {
        upstream: Flux,
        f: FlatMapFn,
    },
    CollectList(Flux),
    Then(Flux),
    OnErrorReturn {
        upstream: Flux,
        value: Value,
    },
    OnErrorResume {
        upstream: Flux,
        f: ResumeFn,
    },
    Concat(Vec<Flux>),
    Merge(Vec<Flux>),
    MergeParallel {
        sources: Vec<Flux>,
        executor: Option<Arc<dyn Executor>>,
        capacity: Option<usize>,
    },
    Zip(Vec<Flux>),
}

impl NodeSpec {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeSpec::Just(_) => NodeKind::Just,
            NodeSpec::Empty => NodeKind::Empty,
            NodeSpec::Never => NodeKind::Never,
            NodeSpec::Error(_) => NodeKind::Error,
            NodeSpec::Range { .. } => NodeKind::Range,
            NodeSpec::Interval(_) => NodeKind::Interval,
            NodeSpec::Create { .. } => NodeKind::Create,
            NodeSpec::Plugin { .. } => NodeKind::Plugin,
            NodeSpec::Map { .. } => NodeKind::Map,
            NodeSpec::Filter { .. } => NodeKind::Filter,
            NodeSpec::Take { .. } => NodeKind::Take,
            NodeSpec::Log { .. } => NodeKind::Log,
            NodeSpec::DefaultIfEmpty { .. } => NodeKind::DefaultIfEmpty,
            NodeSpec::FlatMap { .. } => NodeKind::FlatMap,
            NodeSpec::CollectList(_) => NodeKind::CollectList,
            NodeSpec::Then(_) => NodeKind::Then,
            NodeSpec::OnErrorReturn { .. } => NodeKind::OnErrorReturn,
            NodeSpec::OnErrorResume { .. } => NodeKind::OnErrorResume,
            NodeSpec::Concat(_) => NodeKind::Concat,
            NodeSpec::Merge(_) => NodeKind::Merge,
            NodeSpec::MergeParallel { .. } => NodeKind::MergeParallel,
            NodeSpec::Zip(_) => NodeKind::Zip,
        }
    }

    /// Upstream blueprints in operand order.
    pub fn upstreams(&self) -> &[Flux] {
        match self {
            NodeSpec::Just(_)
            | NodeSpec::Empty
            | NodeSpec::Never
            | NodeSpec::Error(_)
            | NodeSpec::Range { .. }
            | NodeSpec::Interval(_)
            | NodeSpec::Create { .. }
            | NodeSpec::Plugin { .. } => &[],
            NodeSpec::Map { upstream, .. }
            | NodeSpec::Filter { upstream, .. }
            | NodeSpec::Take { upstream, .. }
            | NodeSpec::Log { upstream, .. }
            | NodeSpec::DefaultIfEmpty { upstream, .. }
            | NodeSpec::FlatMap { upstream, .. }
            | NodeSpec::CollectList(upstream)
            | NodeSpec::Then(upstream)
            | NodeSpec::OnErrorReturn { upstream, .. }
            | NodeSpec::OnErrorResume { upstream, .. } => std::slice::from_ref(upstream),
            NodeSpec::Concat(sources)
            | NodeSpec::Merge(sources)
            | NodeSpec::MergeParallel { sources, .. }
            | NodeSpec::Zip(sources) => sources,
        }
    }
}

/// Cold, reusable stream blueprint.
#[derive(Clone)]
pub struct Flux {
    spec: Arc<NodeSpec>,
}

impl fmt::Debug for Flux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let upstreams = self.spec.upstreams();
        if upstreams.is_empty() {
            write!(f, "{}", self.kind())
        } else {
            write!(f, "{}(", self.kind())?;
            for (i, up) in upstreams.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", up)?;
            }
            write!(f, ")")
        }
    }
}

impl Flux {
    fn from_spec(spec: NodeSpec) -> Self {
        Self {
            spec: Arc::new(spec),
        }
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    pub fn kind(&self) -> NodeKind {
        self.spec.kind()
    }

    // ── Sources ──

    /// Emit the given values in order, then complete.
    pub fn just(values: Vec<Value>) -> Self {
        Self::from_spec(NodeSpec::Just(values))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::just(items.into_iter().map(Into::into).collect())
    }

    /// `count` consecutive integers starting at `start`.
    pub fn range(start: i64, count: u64) -> Self {
        Self::from_spec(NodeSpec::Range { start, count })
    }

    pub fn empty() -> Self {
        Self::from_spec(NodeSpec::Empty)
    }

    pub fn never() -> Self {
        Self::from_spec(NodeSpec::Never)
    }

    pub fn error(error: FluxError) -> Self {
        Self::from_spec(NodeSpec::Error(error))
    }

    /// Emit 0, 1, 2, ... at `period`, `2 * period`, ... of the subscription's
    /// clock, measured from subscription (the first poll of the node, which
    /// `activate` performs even with no initial request). Never completes.
    pub fn interval(period: Duration) -> Self {
        Self::from_spec(NodeSpec::Interval(period))
    }

    /// Push-style source that buffers values the consumer has not requested.
    pub fn create<F>(generator: F) -> Self
    where
        F: Fn(FluxSink) + Send + Sync + 'static,
    {
        Self::create_with(generator, OverflowStrategy::Buffer)
    }

    pub fn create_with<F>(generator: F, strategy: OverflowStrategy) -> Self
    where
        F: Fn(FluxSink) + Send + Sync + 'static,
    {
        Self::from_spec(NodeSpec::Create {
            generator: Arc::new(generator),
            strategy,
        })
    }

    /// User-defined source. `factory` runs once per subscription.
    pub fn from_plugin<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn NodePlugin> + Send + Sync + 'static,
    {
        Self::from_spec(NodeSpec::Plugin {
            name: name.into(),
            factory: Arc::new(factory),
        })
    }

    // ── Fan-in ──

    pub fn concat(sources: impl IntoIterator<Item = Flux>) -> Self {
        Self::from_spec(NodeSpec::Concat(sources.into_iter().collect()))
    }

    /// Cooperative merge on the subscriber's thread.
    pub fn merge(sources: impl IntoIterator<Item = Flux>) -> Self {
        Self::from_spec(NodeSpec::Merge(sources.into_iter().collect()))
    }

    /// Merge whose upstreams run on the subscription's executor.
    pub fn merge_parallel(sources: impl IntoIterator<Item = Flux>) -> Self {
        Self::from_spec(NodeSpec::MergeParallel {
            sources: sources.into_iter().collect(),
            executor: None,
            capacity: None,
        })
    }

    /// Merge whose upstreams run on `executor`, with a worker channel of
    /// `capacity` signals.
    pub fn merge_parallel_on(
        sources: impl IntoIterator<Item = Flux>,
        executor: Arc<dyn Executor>,
        capacity: usize,
    ) -> Self {
        Self::from_spec(NodeSpec::MergeParallel {
            sources: sources.into_iter().collect(),
            executor: Some(executor),
            capacity: Some(capacity),
        })
    }

    pub fn zip(sources: impl IntoIterator<Item = Flux>) -> Self {
        Self::from_spec(NodeSpec::Zip(sources.into_iter().collect()))
    }

    pub fn concat_with(&self, other: &Flux) -> Self {
        Self::concat([self.clone(), other.clone()])
    }

    pub fn merge_with(&self, other: &Flux) -> Self {
        Self::merge([self.clone(), other.clone()])
    }

    pub fn zip_with(&self, other: &Flux) -> Self {
        Self::zip([self.clone(), other.clone()])
    }

    // ── Operators ──

    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::from_spec(NodeSpec::Map {
            upstream: self.clone(),
            f: Arc::new(f),
        })
    }

    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::from_spec(NodeSpec::Filter {
            upstream: self.clone(),
            predicate: Arc::new(predicate),
        })
    }

    pub fn take(&self, n: u64) -> Self {
        Self::from_spec(NodeSpec::Take {
            upstream: self.clone(),
            n,
        })
    }

    /// Log every signal under the default category.
    pub fn log(&self) -> Self {
        self.log_as("flux")
    }

    pub fn log_as(&self, category: impl Into<String>) -> Self {
        Self::from_spec(NodeSpec::Log {
            upstream: self.clone(),
            category: category.into(),
        })
    }

    pub fn default_if_empty(&self, value: impl Into<Value>) -> Self {
        Self::from_spec(NodeSpec::DefaultIfEmpty {
            upstream: self.clone(),
            value: value.into(),
        })
    }

    /// Map each value to an inner stream; inner streams are drained one at a
    /// time in upstream order.
    pub fn flat_map<F>(&self, f: F) -> Self
    where
        F: Fn(Value) -> Flux + Send + Sync + 'static,
    {
        Self::from_spec(NodeSpec::FlatMap {
            upstream: self.clone(),
            f: Arc::new(f),
        })
    }

    pub fn collect_list(&self) -> Self {
        Self::from_spec(NodeSpec::CollectList(self.clone()))
    }

    pub fn then(&self) -> Self {
        Self::from_spec(NodeSpec::Then(self.clone()))
    }

    pub fn on_error_return(&self, value: impl Into<Value>) -> Self {
        Self::from_spec(NodeSpec::OnErrorReturn {
            upstream: self.clone(),
            value: value.into(),
        })
    }

    pub fn on_error_resume<F>(&self, f: F) -> Self
    where
        F: Fn(FluxError) -> Flux + Send + Sync + 'static,
    {
        Self::from_spec(NodeSpec::OnErrorResume {
            upstream: self.clone(),
            f: Arc::new(f),
        })
    }

    // ── Subscription ──

    /// Compile this blueprint without subscribing.
    pub fn plan(&self) -> CompiledPlan {
        PipelineCompiler::compile(self)
    }

    /// Subscribe with default options (unbounded demand, thread executor,
    /// fresh virtual clock).
    pub fn subscribe(&self, subscriber: impl Subscriber + 'static) -> Subscription {
        self.subscribe_with(subscriber, SubscribeOptions::default())
    }

    pub fn subscribe_with(
        &self,
        subscriber: impl Subscriber + 'static,
        options: SubscribeOptions,
    ) -> Subscription {
        Subscription::start(self, Box::new(subscriber), options)
    }

    /// Subscribe with a value callback; errors and completion are logged.
    pub fn subscribe_fn<F>(&self, on_next: F) -> Subscription
    where
        F: FnMut(Value) + Send + 'static,
    {
        self.subscribe(LambdaSubscriber::new(on_next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blueprint_shape() {
        let flux = Flux::zip([Flux::range(0, 2), Flux::just(vec!["x".into()])])
            .map(|v| v)
            .on_error_return("fallback");
        assert_eq!(flux.kind(), NodeKind::OnErrorReturn);
        assert_eq!(format!("{:?}", flux), "OnErrorReturn(Map(Zip(Range, Just)))");
    }

    #[test]
    fn test_from_iter_converts() {
        match Flux::from_iter(["a", "b"]).spec() {
            NodeSpec::Just(values) => assert_eq!(values, &vec![Value::from("a"), "b".into()]),
            _ => panic!("expected a Just blueprint"),
        }
    }
}
