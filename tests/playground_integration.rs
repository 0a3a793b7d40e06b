//! End-to-end subscriptions mirroring the demo scenarios

mod common;

use common::builders::strings;
use common::mock_helpers::Recorder;
use rxflow::pipeline::{
    Flux, FluxError, LambdaSubscriber, Signal, SubscribeOptions, Subscription, SubscriptionState,
    Value, VirtualClock,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn values(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::from(*s)).collect()
}

#[test]
fn test_just_log_subscribe() {
    let recorder = Recorder::new();
    let sub = strings(&["one", "two", "three"]).log().subscribe(recorder.clone());

    assert_eq!(sub.state(), SubscriptionState::Completed);
    assert_eq!(recorder.values(), values(&["one", "two", "three"]));
    assert_eq!(recorder.signals().last(), Some(&Signal::Complete));
}

#[test]
fn test_concat_with() {
    let recorder = Recorder::new();
    strings(&["one", "two", "three"])
        .concat_with(&strings(&["four"]))
        .log()
        .subscribe(recorder.clone());

    assert_eq!(recorder.values(), values(&["one", "two", "three", "four"]));
    assert_eq!(recorder.terminals(), 1);
}

#[test]
fn test_concat_with_error_reaches_error_handler() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(false));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let subscriber = {
        let errors = errors.clone();
        let completed = completed.clone();
        let seen = seen.clone();
        LambdaSubscriber::new(move |v| seen.lock().unwrap().push(v))
            .with_error(move |e| errors.lock().unwrap().push(e.message()))
            .with_complete(move || *completed.lock().unwrap() = true)
    };

    let sub = strings(&["one", "two", "three"])
        .concat_with(&Flux::error(FluxError::upstream("Some exception occurred.")))
        .log()
        .subscribe(subscriber);

    assert_eq!(sub.state(), SubscriptionState::Errored);
    assert_eq!(*seen.lock().unwrap(), values(&["one", "two", "three"]));
    assert_eq!(*errors.lock().unwrap(), vec!["Some exception occurred.".to_string()]);
    assert!(!*completed.lock().unwrap());
}

#[test]
fn test_from_iterable() {
    let recorder = Recorder::new();
    Flux::from_iter([1, 2, 3]).log().subscribe(recorder.clone());
    assert_eq!(recorder.values(), vec![1.into(), 2.into(), 3.into()]);
}

#[test]
fn test_interval_ticks_with_clock() {
    let clock = Arc::new(VirtualClock::new());
    let recorder = Recorder::new();
    let mut sub = Flux::interval(Duration::from_secs(1)).log().subscribe_with(
        recorder.clone(),
        SubscribeOptions::default().with_clock(clock.clone()),
    );
    assert!(recorder.signals().is_empty());

    clock.advance(Duration::from_secs(5));
    sub.drain();
    assert_eq!(
        recorder.values(),
        (0..5).map(Value::from).collect::<Vec<_>>()
    );
    assert_eq!(sub.state(), SubscriptionState::Active);

    sub.cancel();
    assert_eq!(sub.state(), SubscriptionState::Cancelled);
    assert_eq!(recorder.terminals(), 0);
}

#[test]
fn test_request_two() {
    let recorder = Recorder::new();
    let mut sub = Subscription::start(
        &Flux::range(1, 5).log(),
        Box::new(recorder.clone()),
        SubscribeOptions::default().with_initial_request(0),
    );
    assert!(recorder.signals().is_empty());

    sub.request(2).unwrap();
    assert_eq!(recorder.values(), vec![1.into(), 2.into()]);
    assert_eq!(sub.state(), SubscriptionState::Active);
    assert!(sub.demand().is_zero());
}

#[test]
fn test_on_error_return_completes() {
    let recorder = Recorder::new();
    Flux::range(1, 5)
        .concat_with(&Flux::error(FluxError::upstream("Some error")))
        .concat_with(&Flux::just(vec![6.into()]))
        .on_error_return(10)
        .log()
        .subscribe(recorder.clone());

    assert_eq!(
        recorder.values(),
        [1, 2, 3, 4, 5, 10].map(Value::from).to_vec()
    );
    assert_eq!(recorder.signals().last(), Some(&Signal::Complete));
}

#[test]
fn test_on_error_resume_switches() {
    let recorder = Recorder::new();
    Flux::range(1, 2)
        .concat_with(&Flux::error(FluxError::upstream("Some error")))
        .on_error_resume(|e| Flux::just(vec![Value::from(e.message())]))
        .subscribe(recorder.clone());

    assert_eq!(
        recorder.values(),
        vec![1.into(), 2.into(), "Some error".into()]
    );
}

#[test]
fn test_create_pushes_from_thread() {
    let recorder = Recorder::new();
    let flux = Flux::create(|sink| {
        std::thread::spawn(move || {
            for i in 0..3 {
                sink.next(i);
            }
            sink.complete();
        });
    });
    let mut sub = flux.subscribe(recorder.clone());

    assert_eq!(
        sub.await_terminal(common::test_timeout()).unwrap(),
        SubscriptionState::Completed
    );
    assert_eq!(recorder.values(), vec![0.into(), 1.into(), 2.into()]);
}

/// Log sink shared between the fmt layer and the test.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_log_operator_output() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        strings(&["one", "two"]).log_as("demo").subscribe(Recorder::new());
    });

    let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    for event in [
        "onSubscribe",
        "request(unbounded)",
        "onNext(one)",
        "onNext(two)",
        "onComplete()",
    ] {
        assert!(output.contains(event), "missing {event} in:\n{output}");
    }
    assert!(output.contains("category=demo"));
    assert!(output.contains("rxflow::flux"));
}
