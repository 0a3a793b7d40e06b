//! Subscription controller.
//!
//! A [`Subscription`] owns one instantiated node tree, the demand granted by
//! its subscriber and the cancellation flag shared with every node. All
//! pulling happens on the thread that calls [`Subscription::request`],
//! [`Subscription::drain`] or [`Subscription::await_terminal`]; worker tasks
//! and `create` sinks only ring the wake signal.
//!
//! ```text
//! Unsubscribed ──activate──► Active ──► Completed
//!                              │   ├──► Errored
//!                              └───┴──► Cancelled
//! ```

use crate::config::EngineConfig;
use crate::pipeline::bridge::WakeSignal;
use crate::pipeline::channel::{Demand, EmissionChannel};
use crate::pipeline::clock::{Clock, VirtualClock};
use crate::pipeline::compiled_plan::{InstantiateEnv, PlanStats};
use crate::pipeline::error::{FluxError, FluxResult};
use crate::pipeline::executor::{Executor, ThreadExecutor, WorkerPool};
use crate::pipeline::flux::Flux;
use crate::pipeline::id::SubscriptionId;
use crate::pipeline::node::{AnyNode, NodeContext, Pull};
use crate::pipeline::signal::{Signal, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Final consumer of a stream.
#[cfg_attr(test, mockall::automock)]
pub trait Subscriber: Send {
    fn on_next(&mut self, value: Value);
    fn on_error(&mut self, error: FluxError);
    fn on_complete(&mut self);
}

type NextFn = Box<dyn FnMut(Value) + Send>;
type ErrorFn = Box<dyn FnMut(FluxError) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;

/// Subscriber built from closures. Missing handlers log instead.
pub struct LambdaSubscriber {
    on_next: NextFn,
    on_error: Option<ErrorFn>,
    on_complete: Option<CompleteFn>,
}

impl LambdaSubscriber {
    pub fn new<F>(on_next: F) -> Self
    where
        F: FnMut(Value) + Send + 'static,
    {
        Self {
            on_next: Box::new(on_next),
            on_error: None,
            on_complete: None,
        }
    }

    pub fn with_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(FluxError) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn with_complete<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }
}

impl Subscriber for LambdaSubscriber {
    fn on_next(&mut self, value: Value) {
        (self.on_next)(value);
    }

    fn on_error(&mut self, error: FluxError) {
        match &mut self.on_error {
            Some(f) => f(error),
            None => tracing::error!("Unhandled stream error: {}", error),
        }
    }

    fn on_complete(&mut self) {
        match &mut self.on_complete {
            Some(f) => f(),
            None => tracing::debug!("Stream completed"),
        }
    }
}

/// Runtime dependencies of one subscription.
#[derive(Clone)]
pub struct SubscribeOptions {
    /// Time source for `interval`.
    pub clock: Arc<dyn Clock>,
    /// Runs `merge_parallel` workers.
    pub executor: Arc<dyn Executor>,
    /// Worker channel capacity for `merge_parallel`.
    pub queue_capacity: usize,
    /// How long a waiting thread parks between progress checks.
    pub idle_wait: Duration,
    /// Demand requested on activation; `None` requests an unbounded amount.
    pub initial_request: Option<u64>,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            clock: Arc::new(VirtualClock::new()),
            executor: Arc::new(ThreadExecutor::new()),
            queue_capacity: 256,
            idle_wait: Duration::from_millis(5),
            initial_request: None,
        }
    }
}

impl SubscribeOptions {
    /// Options from the `[merge]` section. A positive `worker_threads` starts a
    /// dedicated [`WorkerPool`].
    pub fn from_config(config: &EngineConfig) -> FluxResult<Self> {
        let executor: Arc<dyn Executor> = if config.merge.worker_threads > 0 {
            Arc::new(WorkerPool::new(config.merge.worker_threads)?)
        } else {
            Arc::new(ThreadExecutor::new())
        };
        Ok(Self {
            executor,
            queue_capacity: config.merge.queue_capacity,
            idle_wait: Duration::from_millis(config.merge.idle_wait_ms),
            ..Self::default()
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Request `n` on activation. `0` waits for an explicit `request`.
    pub fn with_initial_request(mut self, n: u64) -> Self {
        self.initial_request = Some(n);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Active,
    Completed,
    Errored,
    Cancelled,
}

impl SubscriptionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SubscriptionState::Completed | SubscriptionState::Errored | SubscriptionState::Cancelled
        )
    }
}

/// One subscribe/terminate cycle. Dropping an active subscription cancels it.
pub struct Subscription {
    id: SubscriptionId,
    state: SubscriptionState,
    /// Node tree awaiting activation.
    pending_root: Option<FluxResult<AnyNode>>,
    root: Option<AnyNode>,
    channel: EmissionChannel,
    cx: NodeContext,
    stats: PlanStats,
    initial_request: Option<u64>,
}

impl Subscription {
    /// Compile and instantiate `flux` without requesting anything yet.
    pub fn new(flux: &Flux, subscriber: Box<dyn Subscriber>, options: SubscribeOptions) -> Self {
        let plan = flux.plan();
        let env = InstantiateEnv {
            executor: options.executor.clone(),
            queue_capacity: options.queue_capacity,
        };
        Self {
            id: SubscriptionId::next(),
            state: SubscriptionState::Unsubscribed,
            pending_root: Some(plan.instantiate(&env)),
            root: None,
            channel: EmissionChannel::new(subscriber),
            cx: NodeContext::new(options.clock, options.idle_wait),
            stats: plan.stats,
            initial_request: options.initial_request,
        }
    }

    /// `new` followed by `activate`.
    pub fn start(flux: &Flux, subscriber: Box<dyn Subscriber>, options: SubscribeOptions) -> Self {
        let mut subscription = Self::new(flux, subscriber, options);
        subscription.activate();
        subscription
    }

    /// Move to `Active` and issue the initial request. No-op unless
    /// `Unsubscribed`. With no initial request the graph is still polled once,
    /// so an immediate error or completion arrives and time-based sources
    /// start their clocks.
    pub fn activate(&mut self) {
        if self.state != SubscriptionState::Unsubscribed {
            return;
        }
        self.state = SubscriptionState::Active;
        tracing::debug!(
            "{} active: {} node(s), {} source(s)",
            self.id,
            self.stats.total_nodes,
            self.stats.source_nodes
        );
        match self.pending_root.take() {
            Some(Ok(root)) => self.root = Some(root),
            Some(Err(e)) => {
                self.finish(Signal::Error(e));
                return;
            }
            None => {
                self.finish(Signal::Error(FluxError::NotActive));
                return;
            }
        }
        let initial = self.initial_request.unwrap_or(u64::MAX);
        if initial > 0 {
            // Cannot fail: the subscription is active.
            let _ = self.request(initial);
        } else {
            // Terminals need no demand.
            self.drain();
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn demand(&self) -> Demand {
        self.channel.demand()
    }

    /// Values delivered to the subscriber so far.
    pub fn delivered(&self) -> u64 {
        self.channel.delivered()
    }

    pub fn stats(&self) -> &PlanStats {
        &self.stats
    }

    /// Wake signal rung by producers on other threads.
    pub fn wake(&self) -> &Arc<WakeSignal> {
        &self.cx.wake
    }

    pub fn idle_wait(&self) -> Duration {
        self.cx.idle_wait
    }

    /// Grant `n` more values and deliver whatever is ready.
    ///
    /// Ignored once terminated. `request(0)` is a no-op.
    pub fn request(&mut self, n: u64) -> FluxResult<()> {
        match self.state {
            SubscriptionState::Unsubscribed => Err(FluxError::NotActive),
            SubscriptionState::Active => {
                if n == 0 {
                    tracing::trace!("{} request(0) ignored", self.id);
                    return Ok(());
                }
                self.channel.request(n);
                tracing::debug!("{} request({}) -> {}", self.id, n, self.channel.demand());
                self.drain();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Deliver every signal that is ready without blocking. Returns the number
    /// of values delivered.
    pub fn drain(&mut self) -> usize {
        let mut delivered = 0;
        while self.state == SubscriptionState::Active {
            let Some(root) = self.root.as_mut() else {
                break;
            };
            let demand = self.channel.demand();
            self.cx.demand = demand.outstanding();

            if demand.is_zero() {
                if let Some(terminal) = root.poll_terminal(&self.cx) {
                    self.finish(terminal);
                }
                break;
            }

            match root.next(&self.cx) {
                Pull::Ready(Signal::Value(v)) => match self.channel.emit(Signal::Value(v)) {
                    Ok(()) => delivered += 1,
                    Err(e) => self.finish(Signal::Error(e)),
                },
                Pull::Ready(terminal) => self.finish(terminal),
                Pull::Pending => break,
            }
        }
        delivered
    }

    /// Keep draining until a terminal state or `timeout`, parking on the wake
    /// signal in between.
    pub fn await_terminal(&mut self, timeout: Duration) -> FluxResult<SubscriptionState> {
        if self.state == SubscriptionState::Unsubscribed {
            return Err(FluxError::NotActive);
        }
        let deadline = Instant::now() + timeout;
        loop {
            let seen = self.cx.wake.generation();
            self.drain();
            if self.state.is_terminal() {
                return Ok(self.state);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(FluxError::Timeout {
                    bound: timeout,
                    waiting_for: "a terminal signal".into(),
                    observed: Vec::new(),
                });
            }
            self.cx
                .wake
                .wait_since(seen, (deadline - now).min(self.cx.idle_wait));
        }
    }

    /// Stop the stream. Propagates to every live node before returning.
    /// No-op after a terminal signal.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = SubscriptionState::Cancelled;
        self.cx.cancel.cancel();
        self.pending_root = None;
        if let Some(mut root) = self.root.take() {
            root.cancel();
        }
        tracing::debug!(
            "{} cancelled after {} value(s)",
            self.id,
            self.channel.delivered()
        );
    }

    fn finish(&mut self, signal: Signal) {
        let state = match &signal {
            Signal::Complete => SubscriptionState::Completed,
            Signal::Error(_) => SubscriptionState::Errored,
            Signal::Value(_) => return,
        };
        self.state = state;
        self.cx.cancel.cancel();
        self.root = None;
        tracing::debug!(
            "{} {} after {} value(s)",
            self.id,
            signal.describe(),
            self.channel.delivered()
        );
        // Terminal signals never violate demand.
        let _ = self.channel.emit(signal);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
