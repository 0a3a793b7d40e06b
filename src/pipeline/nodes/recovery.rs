//! Error recovery: `on_error_return` and `on_error_resume`.

use crate::pipeline::compiled_plan::InstantiateEnv;
use crate::pipeline::error::FluxError;
use crate::pipeline::flux::ResumeFn;
use crate::pipeline::node::{AnyNode, NodeContext, Pull};
use crate::pipeline::signal::{Signal, Value};

enum ReturnState {
    Forwarding,
    /// Error seen while the consumer had no demand; the substitute is owed.
    Substituting(Value),
    Completing,
}

/// Replaces an upstream error with one substitute value followed by completion.
pub struct OnErrorReturnNode {
    upstream: Box<AnyNode>,
    fallback: Option<Value>,
    state: ReturnState,
}

impl OnErrorReturnNode {
    pub fn new(upstream: AnyNode, fallback: Value) -> Self {
        Self {
            upstream: Box::new(upstream),
            fallback: Some(fallback),
            state: ReturnState::Forwarding,
        }
    }

    pub fn name(&self) -> &str {
        "OnErrorReturn"
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        match std::mem::replace(&mut self.state, ReturnState::Completing) {
            ReturnState::Substituting(v) => Pull::Ready(Signal::Value(v)),
            ReturnState::Completing => Pull::Ready(Signal::Complete),
            ReturnState::Forwarding => {
                let pull = self.upstream.next(cx);
                match pull {
                    Pull::Ready(Signal::Error(e)) => match self.fallback.take() {
                        Some(v) => {
                            tracing::debug!("Substituting {} for error: {}", v, e);
                            Pull::Ready(Signal::Value(v))
                        }
                        None => Pull::Ready(Signal::Error(e)),
                    },
                    other => {
                        self.state = ReturnState::Forwarding;
                        other
                    }
                }
            }
        }
    }

    pub fn cancel(&mut self) {
        self.upstream.cancel();
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        match self.state {
            ReturnState::Completing => Some(Signal::Complete),
            ReturnState::Substituting(_) => None,
            ReturnState::Forwarding => match self.upstream.poll_terminal(cx) {
                Some(Signal::Error(e)) => match self.fallback.take() {
                    Some(v) => {
                        tracing::debug!("Substituting {} for error: {}", v, e);
                        self.state = ReturnState::Substituting(v);
                        None
                    }
                    None => Some(Signal::Error(e)),
                },
                other => other,
            },
        }
    }
}

/// Switches to a fallback stream built from the upstream error.
///
/// Applies once: errors raised by the fallback propagate unchanged.
pub struct OnErrorResumeNode {
    upstream: Box<AnyNode>,
    resume: Option<ResumeFn>,
    env: InstantiateEnv,
}

impl OnErrorResumeNode {
    pub fn new(upstream: AnyNode, resume: ResumeFn, env: InstantiateEnv) -> Self {
        Self {
            upstream: Box::new(upstream),
            resume: Some(resume),
            env,
        }
    }

    pub fn name(&self) -> &str {
        "OnErrorResume"
    }

    /// Replace the upstream with the fallback. `Err` carries the terminal to
    /// forward when no switch is possible.
    fn switch(&mut self, error: FluxError) -> Result<(), Signal> {
        let Some(resume) = self.resume.take() else {
            return Err(Signal::Error(error));
        };
        tracing::debug!("Resuming after error: {}", error);
        let fallback = resume(error);
        match self.env.build(&fallback) {
            Ok(node) => {
                *self.upstream = node;
                Ok(())
            }
            Err(e) => Err(Signal::Error(e)),
        }
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        loop {
            match self.upstream.next(cx) {
                Pull::Ready(Signal::Error(e)) => {
                    if let Err(terminal) = self.switch(e) {
                        return Pull::Ready(terminal);
                    }
                }
                other => return other,
            }
        }
    }

    pub fn cancel(&mut self) {
        self.resume = None;
        self.upstream.cancel();
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        loop {
            match self.upstream.poll_terminal(cx)? {
                Signal::Error(e) => {
                    if let Err(terminal) = self.switch(e) {
                        return Some(terminal);
                    }
                }
                other => return Some(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::clock::VirtualClock;
    use crate::pipeline::flux::Flux;
    use crate::pipeline::node::BuiltinNode;
    use crate::pipeline::nodes::{ConcatNode, ErrorNode, JustNode};
    use std::sync::Arc;
    use std::time::Duration;

    fn cx(demand: u64) -> NodeContext {
        let mut cx = NodeContext::new(Arc::new(VirtualClock::new()), Duration::from_millis(1));
        cx.demand = demand;
        cx
    }

    fn failing_after(values: Vec<Value>, message: &str) -> AnyNode {
        AnyNode::Builtin(BuiltinNode::Concat(ConcatNode::new(vec![
            AnyNode::Builtin(BuiltinNode::Just(JustNode::new(values))),
            AnyNode::Builtin(BuiltinNode::Error(ErrorNode::new(FluxError::upstream(
                message,
            )))),
        ])))
    }

    #[test]
    fn test_on_error_return_substitutes_then_completes() {
        let cx = cx(u64::MAX);
        let mut node = OnErrorReturnNode::new(
            failing_after(vec!["a".into(), "b".into()], "boom"),
            "c".into(),
        );
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value("a".into())));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value("b".into())));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value("c".into())));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Complete));
    }

    #[test]
    fn test_on_error_return_owes_substitute_without_demand() {
        let cx = cx(0);
        let mut node = OnErrorReturnNode::new(failing_after(vec![], "boom"), "c".into());
        assert_eq!(node.poll_terminal(&cx), None);
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value("c".into())));
        assert_eq!(node.poll_terminal(&cx), Some(Signal::Complete));
    }

    #[test]
    fn test_on_error_resume_switches_once() {
        let cx = cx(u64::MAX);
        let mut node = OnErrorResumeNode::new(
            failing_after(vec!["a".into()], "first"),
            Arc::new(|e: FluxError| {
                Flux::just(vec![Value::from(e.message())])
                    .concat_with(&Flux::error(FluxError::upstream("second")))
            }),
            InstantiateEnv::default(),
        );
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value("a".into())));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value("first".into())));
        assert_eq!(
            node.next(&cx),
            Pull::Ready(Signal::Error(FluxError::upstream("second")))
        );
    }
}
