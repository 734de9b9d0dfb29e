//! Tree-walking evaluator.
//!
//! Evaluation never aborts.  Unknown variables, division by zero and other
//! numeric faults substitute `0` and write a diagnostic.  A failed function
//! call also substitutes `0`, but is additionally recorded in
//! [`Evaluation::failures`] so the host can decide whether the whole
//! expression is still usable.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use super::ast::{BinOp, Expr, UnaryOp};
use super::parser::{parse_expr_in, SyntaxError};
use super::resolve::{EvalError, Origin, Resolver};
use super::value::Value;
use crate::diag::{Diagnostic, DiagnosticKind};

/// Compiled `=/` patterns kept per evaluator before the cache is flushed.
pub const REGEX_CACHE_LIMIT: usize = 64;

/// Result of one evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: Value,
    /// Calls that could not be completed, in evaluation order.
    pub failures: Vec<EvalError>,
}

impl Evaluation {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn as_bool(&self) -> bool {
        self.value.as_bool()
    }

    pub fn as_number(&self) -> f64 {
        self.value.as_number()
    }

    /// The value, or the first call failure.
    pub fn into_result(self) -> Result<Value, EvalError> {
        match self.failures.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }
}

/// Evaluates expressions for one expression-bearing entity.
pub struct Evaluator<'h, C> {
    resolver: Resolver<'h, C>,
    /// Compiled `=/` patterns; `None` marks a pattern that failed to compile.
    regex_cache: RefCell<HashMap<String, Option<Regex>>>,
}

impl<'h, C> Clone for Evaluator<'h, C> {
    fn clone(&self) -> Self {
        Evaluator {
            resolver: self.resolver.clone(),
            regex_cache: self.regex_cache.clone(),
        }
    }
}

impl<'h, C> Evaluator<'h, C> {
    pub fn new(resolver: Resolver<'h, C>) -> Self {
        Evaluator {
            resolver,
            regex_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn resolver(&self) -> &Resolver<'h, C> {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut Resolver<'h, C> {
        &mut self.resolver
    }

    pub fn set_local(&mut self, name: impl Into<String>, value: f64) {
        self.resolver.set_local(name, value);
    }

    pub fn evaluate(&self, expr: &Expr) -> Evaluation {
        let mut failures = Vec::new();
        let value = self.eval(expr, &mut failures);
        tracing::trace!(
            component = self.resolver.component(),
            %value,
            failures = failures.len(),
            "evaluated"
        );
        Evaluation { value, failures }
    }

    /// Evaluate a statement read from `origin`; diagnostics raised on the
    /// way are tagged with its file and line.
    pub fn evaluate_at(&self, expr: &Expr, origin: Origin) -> Evaluation {
        let prev = self.resolver.replace_origin(Some(origin));
        let out = self.evaluate(expr);
        self.resolver.replace_origin(prev);
        out
    }

    /// Parse and evaluate in one go.
    pub fn eval_str(&self, src: &str) -> Result<Evaluation, SyntaxError> {
        let file: Arc<str> = Arc::from(self.resolver.component());
        let expr = parse_expr_in(src, file)?;
        Ok(self.evaluate(&expr))
    }

    fn report(&self, kind: DiagnosticKind, message: String) {
        self.resolver.report(Diagnostic::new(
            kind,
            format!("{}: {message}", self.resolver.component()),
        ));
    }

    fn eval(&self, expr: &Expr, failures: &mut Vec<EvalError>) -> Value {
        match expr {
            Expr::Literal(v) => v.clone(),

            Expr::Var(name) => Value::Number(self.resolver.resolve_variable(name).0),

            Expr::Call(name, arg_exprs) => {
                let args: Vec<Value> = arg_exprs.iter().map(|a| self.eval(a, failures)).collect();
                match self.resolver.call(name, &args) {
                    Ok(v) => self.finite(v, name),
                    Err(err) => {
                        failures.push(err);
                        Value::default()
                    }
                }
            }

            Expr::Unary(op, inner) => {
                let v = self.eval(inner, failures);
                match op {
                    UnaryOp::Neg => self.finite(v.arith_neg(), "-"),
                    UnaryOp::Not => Value::truth(!v.as_bool()),
                }
            }

            // The right operand is only evaluated when it decides the result.
            Expr::Binary(BinOp::And, lhs, rhs) => Value::truth(
                self.eval(lhs, failures).as_bool() && self.eval(rhs, failures).as_bool(),
            ),
            Expr::Binary(BinOp::Or, lhs, rhs) => Value::truth(
                self.eval(lhs, failures).as_bool() || self.eval(rhs, failures).as_bool(),
            ),

            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval(lhs, failures);
                let r = self.eval(rhs, failures);
                self.eval_binop(*op, l, r)
            }

            Expr::Ternary(cond, then, else_) => {
                if self.eval(cond, failures).as_bool() {
                    self.eval(then, failures)
                } else {
                    self.eval(else_, failures)
                }
            }
        }
    }

    fn eval_binop(&self, op: BinOp, l: Value, r: Value) -> Value {
        use std::cmp::Ordering;
        match op {
            BinOp::Add => self.finite(l.arith_add(&r), "+"),
            BinOp::Sub => self.finite(l.arith_sub(&r), "-"),
            BinOp::Mul => self.finite(l.arith_mul(&r), "*"),
            BinOp::Div => match l.arith_div(&r) {
                Some(v) => self.finite(v, "/"),
                None => {
                    self.report(DiagnosticKind::Arithmetic, "division by zero".into());
                    Value::default()
                }
            },
            BinOp::Rem => match l.arith_rem(&r) {
                Some(v) => self.finite(v, "%"),
                None => {
                    self.report(DiagnosticKind::Arithmetic, "modulo by zero".into());
                    Value::default()
                }
            },

            BinOp::Eq => Value::truth(l.cmp_value(&r) == Some(Ordering::Equal)),
            BinOp::Ne => Value::truth(l.cmp_value(&r) != Some(Ordering::Equal)),
            BinOp::Lt => Value::truth(l.cmp_value(&r) == Some(Ordering::Less)),
            BinOp::Le => Value::truth(matches!(
                l.cmp_value(&r),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinOp::Gt => Value::truth(l.cmp_value(&r) == Some(Ordering::Greater)),
            BinOp::Ge => Value::truth(matches!(
                l.cmp_value(&r),
                Some(Ordering::Greater | Ordering::Equal)
            )),

            BinOp::GlobMatch => Value::truth(glob_match(&r.as_str(), &l.as_str())),
            BinOp::NotGlobMatch => Value::truth(!glob_match(&r.as_str(), &l.as_str())),
            BinOp::RegexMatch => match self.regex_match(&r.as_str(), &l.as_str()) {
                Some(m) => Value::truth(m),
                None => Value::default(),
            },
            BinOp::NotRegexMatch => match self.regex_match(&r.as_str(), &l.as_str()) {
                Some(m) => Value::truth(!m),
                None => Value::default(),
            },

            // Both operands already evaluated.
            BinOp::And => Value::truth(l.as_bool() && r.as_bool()),
            BinOp::Or => Value::truth(l.as_bool() || r.as_bool()),
        }
    }

    /// Replace NaN and infinities with the zero sentinel.
    fn finite(&self, v: Value, what: &str) -> Value {
        match v {
            Value::Number(x) if !x.is_finite() => {
                self.report(
                    DiagnosticKind::Arithmetic,
                    format!("non-finite result from '{what}'"),
                );
                Value::default()
            }
            v => v,
        }
    }

    /// `None` if the pattern does not compile.
    ///
    /// The cache is flushed once it holds [`REGEX_CACHE_LIMIT`] patterns.
    fn regex_match(&self, pattern: &str, text: &str) -> Option<bool> {
        let mut cache = self.regex_cache.borrow_mut();
        if cache.len() >= REGEX_CACHE_LIMIT && !cache.contains_key(pattern) {
            cache.clear();
        }
        let compiled = cache.entry(pattern.to_owned()).or_insert_with(|| {
            Regex::new(pattern)
                .map_err(|e| {
                    self.report(DiagnosticKind::Pattern, format!("invalid regex '{pattern}': {e}"))
                })
                .ok()
        });
        compiled.as_ref().map(|re| re.is_match(text))
    }
}

// ── Glob matching ─────────────────────────────────────────────────────────────

/// `*` matches any run of characters, `?` any single character.
///
/// Only the most recent `*` is ever retried, so the cost is bounded by
/// `pattern.len() * text.len()`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` and the text index it currently absorbs up to.
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some('*') => {
                star = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == t[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    star = Some((sp, st + 1));
                    pi = sp + 1;
                    ti = st + 1;
                }
                None => return false,
            },
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

// ── Tests ─────────────────────────────────────────────────────────────────────
