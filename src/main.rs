//! rxflow demo - Main Entry Point
//!
//! Replays a set of small stream scenarios with logging enabled, so the
//! `log()` operator output and the subscription lifecycle can be inspected.
//!
//! Usage: `rxflow [config.toml]`. Without an argument the platform config
//! file is used if present.

use anyhow::Context;
use rxflow::{
    config::EngineConfig,
    pipeline::{
        Flux, FluxError, LambdaSubscriber, SubscribeOptions, Subscription, SubscriptionState,
        Value, VirtualClock,
    },
    verify::StepVerifier,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => EngineConfig::load_or_default(),
    };

    // Keep the guard alive so buffered file output is flushed on exit
    let _guard = init_logging(&config)?;

    tracing::info!("Starting rxflow demo");

    let options = SubscribeOptions::from_config(&config)?;
    let timeout = Duration::from_millis(config.harness.timeout_ms);

    log_three_strings(&options, timeout)?;
    concat_with_error(&options, timeout)?;
    from_iterable(&options, timeout)?;
    interval_ticks(&options)?;
    bounded_request(&options)?;
    error_substitution(&config)?;
    parallel_merge(&options, timeout)?;

    tracing::info!("All scenarios finished");
    Ok(())
}

/// Console logging plus an optional daily rolling file.
fn init_logging(config: &EngineConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .map_err(|e| anyhow::anyhow!("invalid log filter: {}", e))?;

    let (file_layer, guard) = match &config.logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "rxflow.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn print_value(v: Value) {
    println!("{}", v);
}

fn run(
    flux: &Flux,
    subscriber: LambdaSubscriber,
    options: &SubscribeOptions,
    timeout: Duration,
) -> anyhow::Result<SubscriptionState> {
    let mut subscription = flux.subscribe_with(subscriber, options.clone());
    Ok(subscription.await_terminal(timeout)?)
}

fn log_three_strings(options: &SubscribeOptions, timeout: Duration) -> anyhow::Result<()> {
    tracing::info!("-- just + log --");
    let flux = Flux::just(vec!["one".into(), "two".into(), "three".into()]).log();
    run(&flux, LambdaSubscriber::new(print_value), options, timeout)?;

    tracing::info!("-- concat_with --");
    let flux = flux.concat_with(&Flux::just(vec!["four".into()]));
    run(&flux, LambdaSubscriber::new(print_value), options, timeout)?;
    Ok(())
}

fn concat_with_error(options: &SubscribeOptions, timeout: Duration) -> anyhow::Result<()> {
    tracing::info!("-- concat_with(error) --");
    let flux = Flux::just(vec!["one".into(), "two".into(), "three".into()])
        .concat_with(&Flux::error(FluxError::upstream("Some exception occurred.")))
        .concat_with(&Flux::just(vec!["four".into()]))
        .log();

    let subscriber = LambdaSubscriber::new(print_value)
        .with_error(|e| println!("Error is: {}", e.message()))
        .with_complete(|| println!("Completed"));
    let state = run(&flux, subscriber, options, timeout)?;
    tracing::info!("Stream ended as {:?}", state);
    Ok(())
}

fn from_iterable(options: &SubscribeOptions, timeout: Duration) -> anyhow::Result<()> {
    tracing::info!("-- from_iter --");
    let flux = Flux::from_iter([1, 2, 3]).log();
    run(&flux, LambdaSubscriber::new(print_value), options, timeout)?;
    Ok(())
}

/// `interval` only moves when its clock does.
fn interval_ticks(options: &SubscribeOptions) -> anyhow::Result<()> {
    tracing::info!("-- interval on virtual time --");
    let clock = Arc::new(VirtualClock::new());
    let flux = Flux::interval(Duration::from_secs(1)).log();
    let mut subscription = flux.subscribe_with(
        LambdaSubscriber::new(print_value),
        options.clone().with_clock(clock.clone()),
    );

    for _ in 0..3 {
        clock.advance(Duration::from_secs(1));
        subscription.drain();
    }
    subscription.cancel();
    Ok(())
}

fn bounded_request(options: &SubscribeOptions) -> anyhow::Result<()> {
    tracing::info!("-- request(2) --");
    let flux = Flux::range(1, 5).log();
    let mut subscription = Subscription::start(
        &flux,
        Box::new(LambdaSubscriber::new(print_value)),
        options.clone().with_initial_request(0),
    );
    subscription.request(2)?;
    tracing::info!(
        "Delivered {} value(s), state {:?}",
        subscription.delivered(),
        subscription.state()
    );
    subscription.cancel();
    Ok(())
}

fn error_substitution(config: &EngineConfig) -> anyhow::Result<()> {
    tracing::info!("-- on_error_return, verified --");
    let flux = Flux::range(1, 5)
        .concat_with(&Flux::error(FluxError::upstream("Some error")))
        .concat_with(&Flux::just(vec![6.into()]))
        .on_error_return(10)
        .log();

    let report = StepVerifier::with_config(&flux, &config.harness)
        .expect_next_seq([1, 2, 3, 4, 5, 10])
        .verify_complete()?;
    tracing::info!(
        "Observed [{}] in {:?}",
        report.observed.join(", "),
        report.duration
    );
    Ok(())
}

fn parallel_merge(options: &SubscribeOptions, timeout: Duration) -> anyhow::Result<()> {
    tracing::info!("-- merge_parallel on {} --", options.executor.name());
    let flux = Flux::merge_parallel([
        Flux::range(0, 3).map(|v| Value::from(format!("a{}", v))),
        Flux::range(0, 3).map(|v| Value::from(format!("b{}", v))),
    ])
    .log_as("parallel");
    let state = run(&flux, LambdaSubscriber::new(print_value), options, timeout)?;
    tracing::info!("Stream ended as {:?}", state);
    Ok(())
}
