//! Values and signals flowing through the stream graph.
//!
//! `Value` is the dynamic payload type: the graph is interpreted at subscribe
//! time, so every node speaks the same tagged variant. `Signal` wraps a value
//! or one of the two terminal outcomes.

use crate::pipeline::error::FluxError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dynamic payload carried by `Signal::Value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// One element per zipped upstream, in upstream order.
    Tuple(Vec<Value>),
    /// Collected values, e.g. from `collect_list`.
    List(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Tuple element `index` (zero based).
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.as_tuple().and_then(|items| items.get(index))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_joined(f, items)?;
                write!(f, ")")
            }
            Value::List(items) => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// One unit of communication between a producer and its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Value(Value),
    Complete,
    Error(FluxError),
}

impl Signal {
    /// `Complete` and `Error` end a stream; nothing may follow them.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Signal::Value(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Signal::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Signal::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Text form used by the `log` operator and the harness.
    pub fn describe(&self) -> String {
        match self {
            Signal::Value(v) => format!("onNext({v})"),
            Signal::Complete => "onComplete()".to_string(),
            Signal::Error(e) => format!("onError({e})"),
        }
    }
}

impl From<Value> for Signal {
    fn from(v: Value) -> Self {
        Signal::Value(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::Str("x".into()).as_int(), None);
    }

    #[test]
    fn test_tuple_access_and_display() {
        let t = Value::Tuple(vec!["f1".into(), "f2".into(), 3.into()]);
        assert_eq!(t.get(0), Some(&Value::from("f1")));
        assert_eq!(t.get(3), None);
        assert_eq!(t.to_string(), "(f1, f2, 3)");

        let l = Value::List(vec![1.into(), 2.into()]);
        assert_eq!(l.to_string(), "[1, 2]");
        assert_eq!(l.as_list().map(|items| items.len()), Some(2));
    }

    #[test]
    fn test_signal_terminal() {
        assert!(!Signal::Value(Value::Unit).is_terminal());
        assert!(Signal::Complete.is_terminal());
        assert!(Signal::Error(FluxError::upstream("boom")).is_terminal());
    }

    #[test]
    fn test_signal_describe() {
        assert_eq!(Signal::Value("one".into()).describe(), "onNext(one)");
        assert_eq!(Signal::Complete.describe(), "onComplete()");
        assert_eq!(
            Signal::Error(FluxError::upstream("boom")).describe(),
            "onError(Upstream error: boom)"
        );
    }
}
