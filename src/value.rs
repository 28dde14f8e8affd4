//! Scalar values flowing through facts, variables and plan steps.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::symbol::{Sym, SymbolStore};

/// A tagged value.
///
/// `Unbound` marks a variable or query position that has not been bound
/// yet. It is never equal to anything, including another `Unbound`: only
/// binding resolves it.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Unbound,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Symbol(Sym),
    List(Arc<[Value]>),
}

impl Value {
    /// True for every tag except `Unbound`.
    #[inline]
    pub fn is_bound(&self) -> bool {
        !matches!(self, Value::Unbound)
    }

    /// Bound all the way down: lists must not contain `Unbound` either.
    pub fn is_ground(&self) -> bool {
        match self {
            Value::Unbound => false,
            Value::List(items) => items.iter().all(Value::is_ground),
            _ => true,
        }
    }

    pub fn string(text: &str) -> Self {
        Value::String(Arc::from(text))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Sym> for Value {
    fn from(s: Sym) -> Self {
        Value::Symbol(s)
    }
}

/// Render a value in domain-file syntax.
pub fn format_value(value: &Value, symbols: &SymbolStore) -> String {
    let mut out = String::new();
    render(value, symbols, &mut out);
    out
}

fn render(value: &Value, symbols: &SymbolStore, out: &mut String) {
    match value {
        Value::Unbound => out.push('_'),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => render_number(*n, out),
        Value::String(s) => {
            let _ = write!(out, "{:?}", s.as_ref());
        }
        Value::Symbol(sym) => out.push_str(symbols.name(*sym)),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render(item, symbols, out);
            }
            out.push(']');
        }
    }
}

fn render_number(n: f64, out: &mut String) {
    // Integral values print without a trailing ".0".
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        let _ = write!(out, "{}", n as i64);
    } else {
        let _ = write!(out, "{}", n);
    }
}

/// Convert a value to JSON. Symbols become their names, `Unbound` and
/// non-finite numbers become `null`.
pub fn value_to_json(value: &Value, symbols: &SymbolStore) -> serde_json::Value {
    match value {
        Value::Unbound => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Symbol(sym) => serde_json::Value::String(symbols.name(*sym).to_string()),
        Value::List(items) => serde_json::Value::Array(
            items.iter().map(|v| value_to_json(v, symbols)).collect(),
        ),
    }
}
