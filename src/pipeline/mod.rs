//! Reactive stream engine.
//!
//! A [`Flux`] is an inert blueprint. Subscribing compiles it into a plan of
//! nodes (sources first), instantiates live nodes and drives them by pulling
//! from the root as the subscriber grants demand.
//!
//! # Architecture
//!
//! ```text
//! Flux (blueprint) ──compile──► CompiledPlan ──instantiate──► AnyNode tree
//!                                                                 │ pull
//!                        Subscriber ◄── EmissionChannel ◄── Subscription
//! ```
//!
//! # Design
//!
//! - **Enum dispatch on hot path**: `BuiltinNode` enum for all built-in nodes,
//!   `NodePlugin` trait objects for user-defined sources.
//! - **Single-threaded by default**: every operator runs on the subscriber's
//!   thread; only `merge_parallel` uses an injected `Executor`.
//! - **Bounded hand-off**: parallel workers push through a bounded crossbeam
//!   channel and ring a wake signal instead of calling the subscriber.
//! - **Virtual time**: `interval` reads an injected `Clock`.

pub mod bridge;
pub mod channel;
pub mod clock;
pub mod compiled_plan;
pub mod compiler;
pub mod error;
pub mod executor;
pub mod flux;
pub mod id;
pub mod node;
pub mod node_type;
pub mod nodes;
pub mod signal;
pub mod subscription;

pub use bridge::{CancelToken, WakeSignal, WorkerMessage};
pub use channel::{Demand, EmissionChannel};
pub use clock::{Clock, VirtualClock};
pub use compiled_plan::{CompiledPlan, InstantiateEnv, PlanNode, PlanStats};
pub use compiler::PipelineCompiler;
pub use error::{FluxError, FluxResult};
pub use executor::{Executor, Task, ThreadExecutor, WorkerPool};
pub use flux::{FlatMapFn, Flux, NodeSpec, PluginFactory, ResumeFn};
pub use id::{NodeId, SubscriptionId};
pub use node::{AnyNode, BuiltinNode, NodeContext, NodePlugin, Pull};
pub use node_type::NodeKind;
pub use nodes::{FluxSink, OverflowStrategy};
pub use signal::{Signal, Value};
pub use subscription::{
    LambdaSubscriber, SubscribeOptions, Subscriber, Subscription, SubscriptionState,
};
