//! Blueprint builders shared by the integration tests

use rxflow::pipeline::{Flux, Value};

/// `just` over string literals.
pub fn strings(items: &[&str]) -> Flux {
    Flux::just(items.iter().map(|s| Value::from(*s)).collect())
}

/// The three two-element streams used by the zip and merge scenarios.
pub fn f1() -> Flux {
    strings(&["f11", "f12"])
}

pub fn f2() -> Flux {
    strings(&["f21", "f22"])
}

pub fn f3() -> Flux {
    strings(&["f31", "f32"])
}

/// Tuple value from string parts, as produced by `zip`.
pub fn tuple(parts: &[&str]) -> Value {
    Value::Tuple(parts.iter().map(|s| Value::from(*s)).collect())
}
