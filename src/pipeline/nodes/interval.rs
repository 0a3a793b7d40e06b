//! IntervalNode: emits an increasing counter on a virtual-time period.
//!
//! Tick `k` (starting at 0) becomes due at `start + (k + 1) * period`, where
//! `start` is the clock reading the first time the node is polled, with or
//! without demand. The node never completes on its own; bound it with `take`.

use crate::pipeline::node::{NodeContext, Pull};
use crate::pipeline::signal::{Signal, Value};
use std::time::Duration;

pub struct IntervalNode {
    period: Duration,
    start: Option<Duration>,
    emitted: u64,
    cancelled: bool,
}

impl IntervalNode {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            start: None,
            emitted: 0,
            cancelled: false,
        }
    }

    pub fn name(&self) -> &str {
        "Interval"
    }

    fn due_at(&self, start: Duration) -> Duration {
        let ticks = u32::try_from(self.emitted.saturating_add(1)).unwrap_or(u32::MAX);
        start.saturating_add(self.period.saturating_mul(ticks))
    }

    pub fn next(&mut self, cx: &NodeContext) -> Pull {
        if self.cancelled {
            return Pull::Pending;
        }
        let now = cx.clock.now();
        let start = *self.start.get_or_insert(now);
        if now >= self.due_at(start) {
            let tick = self.emitted;
            self.emitted += 1;
            Pull::Ready(Signal::Value(Value::Int(tick as i64)))
        } else {
            Pull::Pending
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn poll_terminal(&mut self, cx: &NodeContext) -> Option<Signal> {
        self.start.get_or_insert_with(|| cx.clock.now());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::clock::VirtualClock;
    use std::sync::Arc;

    #[test]
    fn test_interval_follows_virtual_clock() {
        let clock = Arc::new(VirtualClock::new());
        let cx = NodeContext::new(clock.clone(), Duration::from_millis(1));
        let mut node = IntervalNode::new(Duration::from_secs(1));

        assert_eq!(node.next(&cx), Pull::Pending);

        clock.advance(Duration::from_secs(1));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value(Value::Int(0))));
        assert_eq!(node.next(&cx), Pull::Pending);

        // Several periods at once are emitted back to back.
        clock.advance(Duration::from_secs(3));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value(Value::Int(1))));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value(Value::Int(2))));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value(Value::Int(3))));
        assert_eq!(node.next(&cx), Pull::Pending);
    }

    #[test]
    fn test_interval_start_is_first_pull() {
        let clock = Arc::new(VirtualClock::new());
        clock.advance(Duration::from_secs(10));
        let cx = NodeContext::new(clock.clone(), Duration::from_millis(1));
        let mut node = IntervalNode::new(Duration::from_secs(1));

        assert_eq!(node.next(&cx), Pull::Pending);
        clock.advance(Duration::from_millis(999));
        assert_eq!(node.next(&cx), Pull::Pending);
        clock.advance(Duration::from_millis(1));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value(Value::Int(0))));
    }

    #[test]
    fn test_start_recorded_without_demand() {
        let clock = Arc::new(VirtualClock::new());
        let cx = NodeContext::new(clock.clone(), Duration::from_millis(1));
        let mut node = IntervalNode::new(Duration::from_secs(1));

        assert_eq!(node.poll_terminal(&cx), None);
        clock.advance(Duration::from_secs(2));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value(Value::Int(0))));
        assert_eq!(node.next(&cx), Pull::Ready(Signal::Value(Value::Int(1))));
        assert_eq!(node.next(&cx), Pull::Pending);
    }
}
