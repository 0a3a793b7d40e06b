//! Built-in node implementations.

pub mod concat;
pub mod create;
pub mod flat_map;
pub mod interval;
pub mod log;
pub mod merge;
pub mod recovery;
pub mod source;
pub mod transform;
pub mod zip;

pub use concat::ConcatNode;
pub use create::{CreateNode, FluxSink, Generator, OverflowStrategy};
pub use flat_map::FlatMapNode;
pub use interval::IntervalNode;
pub use log::LogNode;
pub use merge::{MergeNode, ParallelMergeNode};
pub use recovery::{OnErrorResumeNode, OnErrorReturnNode};
pub use source::{ErrorNode, JustNode, NeverNode, RangeNode};
pub use transform::{
    CollectListNode, DefaultIfEmptyNode, FilterNode, MapFn, MapNode, PredicateFn, TakeNode,
    ThenNode,
};
pub use zip::ZipNode;
