//! Runtime value type for scenario expressions.
//!
//! Simulation variables are always numbers; strings only appear as
//! literals and as host function results.  Values coerce freely: a string
//! that parses as a number behaves as that number, anything else as `0`.

use std::cmp::Ordering;
use std::fmt;

/// A scalar produced by evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Str(String),
}

/// The zero sentinel substituted whenever resolution or arithmetic fails.
impl Default for Value {
    fn default() -> Self {
        Value::Number(0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl Value {
    /// Boolean result of a comparison or logical operator.
    pub fn truth(b: bool) -> Value {
        Value::Number(if b { 1.0 } else { 0.0 })
    }

    /// Coerce to boolean: `0`, `NaN`, `""` and `"0"` are falsy.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Number(x) => *x != 0.0 && !x.is_nan(),
            Value::Str(s) => !s.is_empty() && s != "0",
        }
    }

    /// Coerce to `f64` (returns 0 for non-numeric strings).
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(x) => *x,
            Value::Str(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    /// Coerce to a string (clones for Str, formats numbers).
    pub fn as_str(&self) -> String {
        self.to_string()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
        }
    }

    // ── Arithmetic helpers ────────────────────────────────────────────────────

    /// Two strings concatenate; every other combination adds numerically.
    pub fn arith_add(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Value::Str(format!("{a}{b}")),
            _ => Value::Number(self.as_number() + rhs.as_number()),
        }
    }

    pub fn arith_sub(&self, rhs: &Value) -> Value {
        Value::Number(self.as_number() - rhs.as_number())
    }

    pub fn arith_mul(&self, rhs: &Value) -> Value {
        Value::Number(self.as_number() * rhs.as_number())
    }

    /// `None` when the divisor is zero.
    pub fn arith_div(&self, rhs: &Value) -> Option<Value> {
        let b = rhs.as_number();
        if b == 0.0 {
            return None;
        }
        Some(Value::Number(self.as_number() / b))
    }

    /// `None` when the divisor is zero.
    pub fn arith_rem(&self, rhs: &Value) -> Option<Value> {
        let b = rhs.as_number();
        if b == 0.0 {
            return None;
        }
        Some(Value::Number(self.as_number() % b))
    }

    pub fn arith_neg(&self) -> Value {
        Value::Number(-self.as_number())
    }

    /// Relational comparison.
    ///
    /// Two strings that do not both parse as numbers compare lexically;
    /// everything else compares numerically.  `None` when either side is
    /// `NaN`, which is then neither equal to nor ordered against anything.
    pub fn cmp_value(&self, rhs: &Value) -> Option<Ordering> {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => {
                match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                    (Ok(af), Ok(bf)) => af.partial_cmp(&bf),
                    _ => Some(a.cmp(b)),
                }
            }
            _ => self.as_number().partial_cmp(&rhs.as_number()),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::truth(b)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
