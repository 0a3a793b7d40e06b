//! LogNode: pass-through that reports every lifecycle event via `tracing`.
//!
//! Events go to target `rxflow::flux` at `info` level, tagged with the node id
//! and a category (default `"flux"`).

use crate::pipeline::id::NodeId;
use crate::pipeline::node::{AnyNode, NodeContext, Pull};
use crate::pipeline::signal::Signal;

pub struct LogNode {
    upstream: Box<AnyNode>,
    id: NodeId,
    category: String,
    subscribed: bool,
    last_demand: u64,
    done: bool,
}

impl LogNode {
    pub fn new(upstream: AnyNode, id: NodeId, category: impl Into<String>) -> Self {
        Self {
            upstream: Box::new(upstream),
            id,
            category: category.into(),
            subscribed: false,
            last_demand: 0,
            done: false,
        }
    }

    pub fn name(&self) -> &str {
        "Log"
    }

    fn on_pull(&mut self, cx: &NodeContext) {
        if !self.subscribed {
            self.subscribed = true;
            tracing::info!(target: "rxflow::flux", node = %self.id, category = %self.category, "onSubscribe({})", self.upstream.name());
        }
        // Outstanding demand only grows through a new request; a top-up that
        // exactly replaces consumed credit goes unreported.
        if cx.demand > self.last_demand {
            if cx.demand == u64::MAX {
                tracing::info!(target: "rxflow::flux", node = %self.id, category = %self.category, "request(unbounded)");
            } else {
                tracing::info!(target: "rxflow::flux", node = %self.id, category = %self.category, "request({})", cx.demand - self.last_demand);
            }
        }
        self.last_demand = cx.demand;
    }

    fn report(&mut self, signal: &Signal) {
        match signal {
            Signal::Value(v) => {
                tracing::info!(target: "rxflow::flux", node = %self.id, category = %self.category, "onNext({})", v)
            }
            Signal::Complete => {
                self.done = true;
                tracing::info!(target: "rxflow::flux", node = %self.id, category = %self.category, "onComplete()")
            }
            Signal::Error(e) => {
                self.done = true;
                tracing::info!(target: "rxflow::flux", node = %self.id, category = %self.category, "onError({})", e)
            }
        }
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        self.on_pull(cx);
        let pull = self.upstream.next(cx);
        if let Pull::Ready(signal) = &pull {
            self.report(signal);
        }
        pull
    }

    pub fn cancel(&mut self) {
        if !self.done {
            self.done = true;
            tracing::info!(target: "rxflow::flux", node = %self.id, category = %self.category, "cancel()");
        }
        self.upstream.cancel();
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        self.on_pull(cx);
        let terminal = self.upstream.poll_terminal(cx);
        if let Some(signal) = &terminal {
            self.report(signal);
        }
        terminal
    }
}
