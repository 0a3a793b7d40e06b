//! Subscriber helpers

use rxflow::pipeline::{FluxError, Signal, Subscriber, Value};
use std::sync::{Arc, Mutex};

/// Subscriber that records every signal it receives.
#[derive(Clone, Default)]
pub struct Recorder {
    signals: Arc<Mutex<Vec<Signal>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }

    pub fn values(&self) -> Vec<Value> {
        self.signals()
            .into_iter()
            .filter_map(Signal::into_value)
            .collect()
    }

    pub fn terminals(&self) -> usize {
        self.signals().iter().filter(|s| s.is_terminal()).count()
    }
}

impl Subscriber for Recorder {
    fn on_next(&mut self, value: Value) {
        self.signals.lock().unwrap().push(Signal::Value(value));
    }

    fn on_error(&mut self, error: FluxError) {
        self.signals.lock().unwrap().push(Signal::Error(error));
    }

    fn on_complete(&mut self) {
        self.signals.lock().unwrap().push(Signal::Complete);
    }
}
