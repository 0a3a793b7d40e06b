//! Demand accounting and the emission channel to the final subscriber.

use crate::pipeline::error::{FluxError, FluxResult};
use crate::pipeline::signal::Signal;
use crate::pipeline::subscription::Subscriber;
use std::fmt;

/// Outstanding credit granted by a subscriber.
///
/// `Demand::UNBOUNDED` (`u64::MAX`) is never decremented; additions saturate
/// into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Demand(u64);

impl Demand {
    pub const UNBOUNDED: Demand = Demand(u64::MAX);

    pub fn new(n: u64) -> Self {
        Self(n)
    }

    #[inline]
    pub fn outstanding(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_unbounded(self) -> bool {
        self.0 == u64::MAX
    }

    pub fn add(&mut self, n: u64) {
        self.0 = self.0.saturating_add(n);
    }

    /// Consume one unit. Returns `false` if none was outstanding.
    pub fn consume(&mut self) -> bool {
        match self.0 {
            0 => false,
            u64::MAX => true,
            _ => {
                self.0 -= 1;
                true
            }
        }
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "unbounded")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Delivers signals to exactly one subscriber, in order, subject to demand.
///
/// - A `Value` with zero outstanding demand is rejected with
///   `FluxError::DemandViolation`; the subscriber does not see it.
/// - The first terminal signal is delivered once; everything after it is
///   dropped.
pub struct EmissionChannel {
    subscriber: Box<dyn Subscriber>,
    demand: Demand,
    terminated: bool,
    delivered: u64,
}

impl EmissionChannel {
    pub fn new(subscriber: Box<dyn Subscriber>) -> Self {
        Self {
            subscriber,
            demand: Demand::default(),
            terminated: false,
            delivered: 0,
        }
    }

    pub fn demand(&self) -> Demand {
        self.demand
    }

    pub fn request(&mut self, n: u64) {
        if !self.terminated {
            self.demand.add(n);
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Number of values delivered so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn emit(&mut self, signal: Signal) -> FluxResult<()> {
        if self.terminated {
            tracing::trace!("Dropping {} after terminal signal", signal.describe());
            return Ok(());
        }
        match signal {
            Signal::Value(v) => {
                if !self.demand.consume() {
                    tracing::error!("Value emitted without outstanding demand: {}", v);
                    return Err(FluxError::DemandViolation {
                        outstanding: 0,
                        attempted: 1,
                    });
                }
                self.delivered += 1;
                self.subscriber.on_next(v);
            }
            Signal::Complete => {
                self.terminated = true;
                self.subscriber.on_complete();
            }
            Signal::Error(e) => {
                self.terminated = true;
                self.subscriber.on_error(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::signal::Value;
    use crate::pipeline::subscription::MockSubscriber;
    use mockall::predicate::eq;

    #[test]
    fn test_demand_saturates_and_unbounded_is_sticky() {
        let mut d = Demand::new(u64::MAX - 1);
        d.add(5);
        assert!(d.is_unbounded());
        assert!(d.consume());
        assert!(d.is_unbounded());
        assert_eq!(d.to_string(), "unbounded");

        let mut d = Demand::new(1);
        assert!(d.consume());
        assert!(!d.consume());
        assert!(d.is_zero());
    }

    #[test]
    fn test_emit_requires_demand() {
        let mut subscriber = MockSubscriber::new();
        subscriber
            .expect_on_next()
            .with(eq(Value::from("x")))
            .times(1)
            .return_const(());
        let mut channel = EmissionChannel::new(Box::new(subscriber));

        assert_eq!(
            channel.emit(Signal::Value("x".into())),
            Err(FluxError::DemandViolation {
                outstanding: 0,
                attempted: 1
            })
        );
        channel.request(1);
        channel.emit(Signal::Value("x".into())).unwrap();
        assert_eq!(channel.delivered(), 1);
        assert!(channel.demand().is_zero());
    }

    #[test]
    fn test_terminal_delivered_once() {
        let mut subscriber = MockSubscriber::new();
        subscriber.expect_on_complete().times(1).return_const(());
        subscriber.expect_on_error().never();
        subscriber.expect_on_next().never();
        let mut channel = EmissionChannel::new(Box::new(subscriber));
        channel.request(10);

        channel.emit(Signal::Complete).unwrap();
        channel.emit(Signal::Complete).unwrap();
        channel.emit(Signal::Error(FluxError::upstream("late"))).unwrap();
        channel.emit(Signal::Value("late".into())).unwrap();
        assert!(channel.is_terminated());
    }
}
