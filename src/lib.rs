//! # rxflow: backpressure-aware reactive streams
//!
//! Streams are assembled as inert [`Flux`] blueprints with a fluent API and
//! come alive when subscribed. Each subscription compiles the blueprint,
//! instantiates fresh operator nodes and pulls values through them only as
//! fast as the subscriber grants demand.
//!
//! ## Architecture
//!
//! - **Pipeline**: blueprint, compiler, operator nodes and the subscription
//!   state machine
//! - **Verify**: a scripted step verifier for asserting exact signal sequences
//! - **Config**: TOML settings for the harness, parallel merge and logging
//! - **Communication**: crossbeam channels between merge workers and the
//!   subscriber thread
//!
//! ## Example
//!
//! ```
//! use rxflow::pipeline::{Flux, FluxError};
//! use rxflow::verify::StepVerifier;
//!
//! let flux = Flux::range(1, 5)
//!     .concat_with(&Flux::error(FluxError::upstream("Some error")))
//!     .concat_with(&Flux::just(vec![6.into()]))
//!     .on_error_return(10);
//!
//! StepVerifier::create(&flux)
//!     .expect_next_seq([1, 2, 3, 4, 5, 10])
//!     .verify_complete()
//!     .unwrap();
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod verify;

// Re-export commonly used types
pub use config::{EngineConfig, HarnessConfig, LoggingConfig, MergeConfig};
pub use error::{Result, RxflowError};
pub use pipeline::{Flux, FluxError, Signal, SubscribeOptions, Subscriber, Subscription, Value};
pub use verify::StepVerifier;
