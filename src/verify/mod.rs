//! Step-based verification harness.
//!
//! A [`StepVerifier`] subscribes to a blueprint, replays the signals it
//! receives against a recorded script and reports the first divergence as
//! [`FluxError::ScriptMismatch`]. Waiting is bounded: if the pipeline does not
//! reach the next scripted point within the verifier's timeout, verification
//! fails with [`FluxError::Timeout`]. Time-based sources are driven by the
//! verifier's own [`VirtualClock`] via [`StepVerifier::then_await`].
//!
//! ```
//! use rxflow::pipeline::Flux;
//! use rxflow::verify::StepVerifier;
//!
//! let flux = Flux::just(vec!["f1".into()]).concat_with(&Flux::just(vec!["f2".into()]));
//! StepVerifier::create(&flux)
//!     .expect_next("f1")
//!     .expect_next("f2")
//!     .verify_complete()
//!     .unwrap();
//! ```

pub mod script;

pub use script::{Expectation, Step, TerminalExpectation};

use crate::config::HarnessConfig;
use crate::pipeline::{
    Flux, FluxError, FluxResult, Signal, SubscribeOptions, Subscriber, Subscription, Value,
    VirtualClock,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

type SignalQueue = Arc<Mutex<VecDeque<Signal>>>;

fn lock(queue: &SignalQueue) -> MutexGuard<'_, VecDeque<Signal>> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Subscriber that queues every signal for the verifier.
struct RecordingSubscriber {
    queue: SignalQueue,
}

impl Subscriber for RecordingSubscriber {
    fn on_next(&mut self, value: Value) {
        lock(&self.queue).push_back(Signal::Value(value));
    }

    fn on_error(&mut self, error: FluxError) {
        lock(&self.queue).push_back(Signal::Error(error));
    }

    fn on_complete(&mut self) {
        lock(&self.queue).push_back(Signal::Complete);
    }
}

/// Outcome of a passing verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    /// Wall-clock time the verification took.
    pub duration: Duration,
    /// Every signal observed, in order.
    pub observed: Vec<String>,
}

/// Scripted expectations over one subscription to a blueprint.
pub struct StepVerifier {
    flux: Flux,
    steps: Vec<Step>,
    terminal: Option<TerminalExpectation>,
    timeout: Duration,
    initial_request: Option<u64>,
    clock: Arc<VirtualClock>,
    options: SubscribeOptions,
}

impl StepVerifier {
    /// Verifier with default harness settings: 1s timeout, unbounded demand.
    pub fn create(flux: &Flux) -> Self {
        Self::with_config(flux, &HarnessConfig::default())
    }

    pub fn with_config(flux: &Flux, config: &HarnessConfig) -> Self {
        Self {
            flux: flux.clone(),
            steps: Vec::new(),
            terminal: None,
            timeout: Duration::from_millis(config.timeout_ms),
            initial_request: config.initial_request,
            clock: Arc::new(VirtualClock::new()),
            options: SubscribeOptions::default(),
        }
    }

    // ── Settings ──

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Demand requested on subscribe. `0` defers everything to `then_request`.
    pub fn initial_request(mut self, n: u64) -> Self {
        self.initial_request = Some(n);
        self
    }

    /// Share a clock with the caller, e.g. to inspect it after verification.
    pub fn with_clock(mut self, clock: Arc<VirtualClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Executor and merge settings for the subscription. The clock and the
    /// initial request are still taken from the verifier.
    pub fn with_options(mut self, options: SubscribeOptions) -> Self {
        self.options = options;
        self
    }

    // ── Script ──

    fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn expect_next(self, value: impl Into<Value>) -> Self {
        self.step(Step::Expect(Expectation::Next(value.into())))
    }

    /// One `expect_next` per item, in order.
    pub fn expect_next_seq<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        for v in values {
            self = self.expect_next(v);
        }
        self
    }

    pub fn expect_next_matches<F>(self, description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.step(Step::Expect(Expectation::NextMatches {
            description: description.into(),
            predicate: Arc::new(predicate),
        }))
    }

    /// Hand the next value to `consumer`, which typically asserts on it.
    pub fn assert_next<F>(self, consumer: F) -> Self
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.step(Step::Expect(Expectation::ConsumeNext(Box::new(consumer))))
    }

    pub fn expect_next_count(self, n: u64) -> Self {
        self.step(Step::Expect(Expectation::NextCount(n)))
    }

    pub fn then_request(self, n: u64) -> Self {
        self.step(Step::Request(n))
    }

    /// Advance the verifier's virtual clock by `by`.
    pub fn then_await(self, by: Duration) -> Self {
        self.step(Step::Await(by))
    }

    pub fn then_cancel(self) -> Self {
        self.step(Step::Cancel)
    }

    // ── Terminal expectations ──

    pub fn expect_complete(mut self) -> Self {
        self.terminal = Some(TerminalExpectation::Complete);
        self
    }

    pub fn expect_error(mut self) -> Self {
        self.terminal = Some(TerminalExpectation::AnyError);
        self
    }

    pub fn expect_error_message(mut self, message: impl Into<String>) -> Self {
        self.terminal = Some(TerminalExpectation::ErrorMessage(message.into()));
        self
    }

    pub fn expect_error_matches<F>(mut self, description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&FluxError) -> bool + Send + Sync + 'static,
    {
        self.terminal = Some(TerminalExpectation::ErrorMatches {
            description: description.into(),
            predicate: Arc::new(predicate),
        });
        self
    }

    pub fn verify_complete(self) -> FluxResult<VerifyReport> {
        self.expect_complete().verify()
    }

    pub fn verify_error(self) -> FluxResult<VerifyReport> {
        self.expect_error().verify()
    }

    pub fn verify_error_message(self, message: impl Into<String>) -> FluxResult<VerifyReport> {
        self.expect_error_message(message).verify()
    }

    pub fn verify_error_matches<F>(
        self,
        description: impl Into<String>,
        predicate: F,
    ) -> FluxResult<VerifyReport>
    where
        F: Fn(&FluxError) -> bool + Send + Sync + 'static,
    {
        self.expect_error_matches(description, predicate).verify()
    }

    /// Run the script.
    ///
    /// Without a terminal expectation the subscription is cancelled once the
    /// last step passed.
    pub fn verify(self) -> FluxResult<VerifyReport> {
        let started = Instant::now();
        let queue: SignalQueue = Arc::default();
        let mut options = self.options.clone().with_clock(self.clock.clone());
        options.initial_request = self.initial_request;

        let subscription = Subscription::start(
            &self.flux,
            Box::new(RecordingSubscriber {
                queue: queue.clone(),
            }),
            options,
        );
        let mut run = Run {
            subscription,
            queue,
            observed: Vec::new(),
            timeout: self.timeout,
            deadline: started + self.timeout,
        };

        let StepVerifier {
            steps,
            terminal,
            clock,
            ..
        } = self;
        let step_count = steps.len();

        for (index, step) in steps.into_iter().enumerate() {
            match step {
                Step::Expect(expectation) => run.expect(index, expectation)?,
                Step::Request(n) => run.subscription.request(n)?,
                Step::Await(by) => {
                    clock.advance(by);
                    run.subscription.drain();
                }
                Step::Cancel => run.subscription.cancel(),
            }
        }

        match terminal {
            Some(expected) => {
                let description = expected.describe();
                let signal = run.next_signal(step_count, &description)?;
                if !expected.matches(&signal) {
                    return Err(run.mismatch(step_count, description, &signal));
                }
            }
            None => run.subscription.cancel(),
        }

        let duration = started.elapsed();
        tracing::debug!(
            "Verification passed in {:?} ({} signal(s))",
            duration,
            run.observed.len()
        );
        Ok(VerifyReport {
            duration,
            observed: run.observed,
        })
    }
}

/// Live state of one verification.
struct Run {
    subscription: Subscription,
    queue: SignalQueue,
    observed: Vec<String>,
    timeout: Duration,
    deadline: Instant,
}

impl Run {
    fn mismatch(&self, index: usize, expected: String, actual: &Signal) -> FluxError {
        FluxError::ScriptMismatch {
            index,
            expected,
            actual: actual.describe(),
            observed: self.observed.clone(),
        }
    }

    /// Next signal, waiting on the subscription's wake signal up to the
    /// deadline.
    fn next_signal(&mut self, index: usize, waiting_for: &str) -> FluxResult<Signal> {
        loop {
            if let Some(signal) = lock(&self.queue).pop_front() {
                self.observed.push(signal.describe());
                return Ok(signal);
            }
            if self.subscription.is_terminated() {
                return Err(FluxError::ScriptMismatch {
                    index,
                    expected: waiting_for.to_string(),
                    actual: format!("no signal ({:?})", self.subscription.state()),
                    observed: self.observed.clone(),
                });
            }

            let seen = self.subscription.wake().generation();
            self.subscription.drain();
            if !lock(&self.queue).is_empty() {
                continue;
            }

            let now = Instant::now();
            if now >= self.deadline {
                tracing::warn!(
                    "Verification timed out after {:?} waiting for {}",
                    self.timeout,
                    waiting_for
                );
                return Err(FluxError::Timeout {
                    bound: self.timeout,
                    waiting_for: waiting_for.to_string(),
                    observed: self.observed.clone(),
                });
            }
            let wait = (self.deadline - now).min(self.subscription.idle_wait());
            self.subscription.wake().wait_since(seen, wait);
        }
    }

    fn expect(&mut self, index: usize, expectation: Expectation) -> FluxResult<()> {
        let description = expectation.describe();
        match expectation {
            Expectation::Next(expected) => {
                let signal = self.next_signal(index, &description)?;
                if signal.as_value() != Some(&expected) {
                    return Err(self.mismatch(index, description, &signal));
                }
            }
            Expectation::NextMatches { predicate, .. } => {
                let signal = self.next_signal(index, &description)?;
                if !signal.as_value().is_some_and(|v| predicate(v)) {
                    return Err(self.mismatch(index, description, &signal));
                }
            }
            Expectation::ConsumeNext(mut consumer) => {
                let signal = self.next_signal(index, &description)?;
                match signal.as_value() {
                    Some(v) => consumer(v),
                    None => return Err(self.mismatch(index, description, &signal)),
                }
            }
            Expectation::NextCount(n) => {
                for seen in 0..n {
                    let remaining = format!("{} more onNext of {}", n - seen, n);
                    let signal = self.next_signal(index, &remaining)?;
                    if signal.as_value().is_none() {
                        return Err(self.mismatch(index, remaining, &signal));
                    }
                }
            }
        }
        Ok(())
    }
}
