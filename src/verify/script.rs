//! Script steps recorded by a [`StepVerifier`](super::StepVerifier).

use crate::pipeline::{FluxError, Signal, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type ValuePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub type ErrorPredicate = Arc<dyn Fn(&FluxError) -> bool + Send + Sync>;
pub type ValueConsumer = Box<dyn FnMut(&Value) + Send>;

/// What the next value signal(s) must look like.
pub enum Expectation {
    /// Exactly this value.
    Next(Value),
    /// Any value accepted by the predicate.
    NextMatches {
        description: String,
        predicate: ValuePredicate,
    },
    /// Any value; handed to a closure that asserts on it.
    ConsumeNext(ValueConsumer),
    /// `n` values of any content.
    NextCount(u64),
}

impl Expectation {
    pub fn describe(&self) -> String {
        match self {
            Expectation::Next(v) => format!("onNext({})", v),
            Expectation::NextMatches { description, .. } => {
                format!("onNext matching \"{}\"", description)
            }
            Expectation::ConsumeNext(_) => "onNext(<any>)".to_string(),
            Expectation::NextCount(n) => format!("{} x onNext", n),
        }
    }
}

/// How the stream is expected to end.
pub enum TerminalExpectation {
    Complete,
    AnyError,
    ErrorMessage(String),
    ErrorMatches {
        description: String,
        predicate: ErrorPredicate,
    },
}

impl TerminalExpectation {
    pub fn describe(&self) -> String {
        match self {
            TerminalExpectation::Complete => "onComplete()".to_string(),
            TerminalExpectation::AnyError => "onError(<any>)".to_string(),
            TerminalExpectation::ErrorMessage(m) => format!("onError with message \"{}\"", m),
            TerminalExpectation::ErrorMatches { description, .. } => {
                format!("onError matching \"{}\"", description)
            }
        }
    }

    pub fn matches(&self, signal: &Signal) -> bool {
        match (self, signal) {
            (TerminalExpectation::Complete, Signal::Complete) => true,
            (TerminalExpectation::AnyError, Signal::Error(_)) => true,
            (TerminalExpectation::ErrorMessage(m), Signal::Error(e)) => e.message() == *m,
            (TerminalExpectation::ErrorMatches { predicate, .. }, Signal::Error(e)) => {
                predicate(e)
            }
            _ => false,
        }
    }
}

/// One scripted step.
pub enum Step {
    Expect(Expectation),
    /// Grant more demand.
    Request(u64),
    /// Advance the verifier's virtual clock.
    Await(Duration),
    /// Cancel the subscription; no terminal signal is expected afterwards.
    Cancel,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Expect(e) => write!(f, "Expect({})", e.describe()),
            Step::Request(n) => write!(f, "Request({})", n),
            Step::Await(d) => write!(f, "Await({:?})", d),
            Step::Cancel => write!(f, "Cancel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_matching() {
        let err = Signal::Error(FluxError::upstream("Some error"));
        assert!(TerminalExpectation::AnyError.matches(&err));
        assert!(TerminalExpectation::ErrorMessage("Some error".into()).matches(&err));
        assert!(!TerminalExpectation::ErrorMessage("other".into()).matches(&err));
        assert!(!TerminalExpectation::Complete.matches(&err));
        assert!(TerminalExpectation::Complete.matches(&Signal::Complete));

        let by_kind = TerminalExpectation::ErrorMatches {
            description: "upstream".into(),
            predicate: Arc::new(|e| matches!(e, FluxError::Upstream(_))),
        };
        assert!(by_kind.matches(&err));
    }

    #[test]
    fn test_step_debug() {
        assert_eq!(
            format!("{:?}", Step::Expect(Expectation::Next("x".into()))),
            "Expect(onNext(x))"
        );
        assert_eq!(format!("{:?}", Step::Request(2)), "Request(2)");
    }
}
