//! FlatMapNode: maps each upstream value to an inner stream and drains the
//! inner streams one at a time, in upstream order.

use crate::pipeline::compiled_plan::InstantiateEnv;
use crate::pipeline::flux::FlatMapFn;
use crate::pipeline::node::{AnyNode, NodeContext, Pull};
use crate::pipeline::signal::Signal;

pub struct FlatMapNode {
    upstream: Box<AnyNode>,
    f: FlatMapFn,
    env: InstantiateEnv,
    inner: Option<Box<AnyNode>>,
    upstream_done: bool,
}

impl FlatMapNode {
    pub fn new(upstream: AnyNode, f: FlatMapFn, env: InstantiateEnv) -> Self {
        Self {
            upstream: Box::new(upstream),
            f,
            env,
            inner: None,
            upstream_done: false,
        }
    }

    pub fn name(&self) -> &str {
        "FlatMap"
    }

    fn fail_inner(&mut self, signal: Signal) -> Signal {
        self.inner = None;
        if !self.upstream_done {
            self.upstream_done = true;
            self.upstream.cancel();
        }
        signal
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        loop {
            if let Some(inner) = &mut self.inner {
                match inner.next(cx) {
                    Pull::Ready(Signal::Complete) => self.inner = None,
                    Pull::Ready(Signal::Error(e)) => {
                        return Pull::Ready(self.fail_inner(Signal::Error(e)))
                    }
                    other => return other,
                }
                continue;
            }
            if self.upstream_done {
                return Pull::Ready(Signal::Complete);
            }
            match self.upstream.next(cx) {
                Pull::Ready(Signal::Value(v)) => {
                    let flux = (self.f)(v);
                    match self.env.build(&flux) {
                        Ok(node) => self.inner = Some(Box::new(node)),
                        Err(e) => return Pull::Ready(self.fail_inner(Signal::Error(e))),
                    }
                }
                Pull::Ready(Signal::Complete) => self.upstream_done = true,
                other => return other,
            }
        }
    }

    pub fn cancel(&mut self) {
        if let Some(inner) = &mut self.inner {
            inner.cancel();
        }
        self.inner = None;
        if !self.upstream_done {
            self.upstream_done = true;
            self.upstream.cancel();
        }
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        if let Some(inner) = &mut self.inner {
            match inner.poll_terminal(cx)? {
                Signal::Complete => self.inner = None,
                other => return Some(self.fail_inner(other)),
            }
        }
        if self.upstream_done {
            return Some(Signal::Complete);
        }
        match self.upstream.poll_terminal(cx)? {
            Signal::Complete => {
                self.upstream_done = true;
                Some(Signal::Complete)
            }
            other => Some(other),
        }
    }
}
