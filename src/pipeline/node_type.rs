//! Node kind enumeration.
//!
//! Every blueprint node has a `NodeKind`; compiled plans and log output use it
//! to describe the graph without touching the live nodes.

use serde::{Deserialize, Serialize};

/// Kinds of nodes a blueprint can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    // Sources
    Just,
    Empty,
    Never,
    Error,
    Range,
    Interval,
    Create,
    Plugin,

    // Single-upstream operators
    Map,
    Filter,
    Take,
    Log,
    DefaultIfEmpty,
    FlatMap,
    CollectList,
    Then,
    OnErrorReturn,
    OnErrorResume,

    // Fan-in combinators
    Concat,
    Merge,
    MergeParallel,
    Zip,
}

impl NodeKind {
    /// Get the display name for this node kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::Just => "Just",
            NodeKind::Empty => "Empty",
            NodeKind::Never => "Never",
            NodeKind::Error => "Error",
            NodeKind::Range => "Range",
            NodeKind::Interval => "Interval",
            NodeKind::Create => "Create",
            NodeKind::Plugin => "Plugin",
            NodeKind::Map => "Map",
            NodeKind::Filter => "Filter",
            NodeKind::Take => "Take",
            NodeKind::Log => "Log",
            NodeKind::DefaultIfEmpty => "DefaultIfEmpty",
            NodeKind::FlatMap => "FlatMap",
            NodeKind::CollectList => "CollectList",
            NodeKind::Then => "Then",
            NodeKind::OnErrorReturn => "OnErrorReturn",
            NodeKind::OnErrorResume => "OnErrorResume",
            NodeKind::Concat => "Concat",
            NodeKind::Merge => "Merge",
            NodeKind::MergeParallel => "MergeParallel",
            NodeKind::Zip => "Zip",
        }
    }

    /// Check if this kind produces signals without an upstream.
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            NodeKind::Just
                | NodeKind::Empty
                | NodeKind::Never
                | NodeKind::Error
                | NodeKind::Range
                | NodeKind::Interval
                | NodeKind::Create
                | NodeKind::Plugin
        )
    }

    /// Check if this kind consumes any number of upstreams.
    pub fn is_combinator(&self) -> bool {
        matches!(
            self,
            NodeKind::Concat | NodeKind::Merge | NodeKind::MergeParallel | NodeKind::Zip
        )
    }

    /// Get a short description of what this node does.
    pub fn description(&self) -> &'static str {
        match self {
            NodeKind::Just => "Emits a fixed sequence of values, then completes.",
            NodeKind::Empty => "Completes immediately.",
            NodeKind::Never => "Never signals anything.",
            NodeKind::Error => "Fails immediately with the given error.",
            NodeKind::Range => "Emits a run of consecutive integers.",
            NodeKind::Interval => "Emits 0, 1, 2, ... on a virtual-time period.",
            NodeKind::Create => "Bridges a push-style emitter into the stream.",
            NodeKind::Plugin => "User-defined source node.",
            NodeKind::Map => "Transforms each value.",
            NodeKind::Filter => "Drops values failing a predicate.",
            NodeKind::Take => "Forwards the first n values, then completes.",
            NodeKind::Log => "Logs every signal passing through.",
            NodeKind::DefaultIfEmpty => "Emits a fallback value if upstream completes empty.",
            NodeKind::FlatMap => "Maps each value to an inner stream, drained in order.",
            NodeKind::CollectList => "Collects all values into one list.",
            NodeKind::Then => "Ignores values, forwards the terminal signal.",
            NodeKind::OnErrorReturn => "Replaces an error with a value and completion.",
            NodeKind::OnErrorResume => "Replaces an error with a fallback stream.",
            NodeKind::Concat => "Drains upstreams one after another.",
            NodeKind::Merge => "Interleaves upstreams on the subscriber's thread.",
            NodeKind::MergeParallel => "Runs upstreams on executor tasks, serialized downstream.",
            NodeKind::Zip => "Pairs values by index, stops at the shortest upstream.",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
