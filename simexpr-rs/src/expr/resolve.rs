//! Symbol and function resolution.
//!
//! Variables resolve against the evaluator's own [`VarTable`] first and
//! then against the host's [`VariableProvider`].  A miss is reported to the
//! diagnostics channel and reads as `0`.
//!
//! Functions resolve only against the [`FunctionTable`] bound when the
//! resolver was built.  A miss is reported *and* returned as an
//! [`EvalError`]: unknown variables degrade quietly, unknown functions fail
//! the call.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;

use super::value::Value;
use crate::diag::{Diagnostic, DiagnosticKind, DiagnosticSink, TracingSink};
use crate::var::VarTable;

// ── Host interfaces ───────────────────────────────────────────────────────────

/// Read access to the host's global variable registry.
pub trait VariableProvider {
    fn variable_exists(&self, name: &str) -> bool;
    fn get_variable(&self, name: &str) -> f64;
}

impl VariableProvider for HashMap<String, f64> {
    fn variable_exists(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn get_variable(&self, name: &str) -> f64 {
        self.get(name).copied().unwrap_or(0.0)
    }
}

/// A registry with nothing in it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVariables;

impl VariableProvider for NoVariables {
    fn variable_exists(&self, _name: &str) -> bool {
        false
    }

    fn get_variable(&self, _name: &str) -> f64 {
        0.0
    }
}

/// A host operation bound into a [`FunctionTable`].
///
/// Receives the host context and the evaluated arguments (the argument
/// count is `args.len()`); `Err` carries the reason the call failed.
pub type HostFn<C> = Rc<dyn Fn(&C, &[Value]) -> Result<Value, String>>;

/// Name → host operation dispatch table.
pub struct FunctionTable<C> {
    fns: HashMap<String, HostFn<C>>,
}

impl<C> Default for FunctionTable<C> {
    fn default() -> Self {
        FunctionTable { fns: HashMap::new() }
    }
}

impl<C> Clone for FunctionTable<C> {
    fn clone(&self) -> Self {
        FunctionTable { fns: self.fns.clone() }
    }
}

impl<C> FunctionTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or rebind) `name`.
    pub fn bind<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&C, &[Value]) -> Result<Value, String> + 'static,
    {
        self.fns.insert(name.into(), Rc::new(f));
    }

    /// Builder form of [`bind`](Self::bind).
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&C, &[Value]) -> Result<Value, String> + 'static,
    {
        self.bind(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<&HostFn<C>> {
        self.fns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A per-call failure recorded during evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{name}' failed: {message}")]
    CallFailed { name: String, message: String },
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Where the expression being resolved was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    pub file: Arc<str>,
    /// Line the statement starts on.
    pub line: u32,
}

/// Resolves names for one evaluator.
///
/// The host context, global registry and diagnostics sink are borrowed for
/// `'h`.  Cloning a resolver copies its local variables and function table
/// but keeps pointing at the same host objects.
pub struct Resolver<'h, C> {
    component: String,
    locals: VarTable,
    globals: &'h dyn VariableProvider,
    context: &'h C,
    functions: FunctionTable<C>,
    diagnostics: &'h dyn DiagnosticSink,
    /// Location stamped onto diagnostics that carry none.
    origin: RefCell<Option<Origin>>,
}

impl<'h, C> Clone for Resolver<'h, C> {
    fn clone(&self) -> Self {
        Resolver {
            component: self.component.clone(),
            locals: self.locals.clone(),
            globals: self.globals,
            context: self.context,
            functions: self.functions.clone(),
            diagnostics: self.diagnostics,
            origin: self.origin.clone(),
        }
    }
}

impl<'h, C> Resolver<'h, C> {
    /// A resolver with no globals, no functions, reporting through
    /// [`TracingSink`].  `component` prefixes every diagnostic.
    pub fn new(component: impl Into<String>, context: &'h C) -> Self {
        Resolver {
            component: component.into(),
            locals: VarTable::new(),
            globals: &NoVariables,
            context,
            functions: FunctionTable::new(),
            diagnostics: &TracingSink,
            origin: RefCell::new(None),
        }
    }

    pub fn with_globals(mut self, globals: &'h dyn VariableProvider) -> Self {
        self.globals = globals;
        self
    }

    pub fn with_diagnostics(mut self, sink: &'h dyn DiagnosticSink) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn with_functions(mut self, functions: FunctionTable<C>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_local(mut self, name: impl Into<String>, value: f64) -> Self {
        self.locals.set(name, value);
        self
    }

    /// Bind one more host operation.
    pub fn bind<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&C, &[Value]) -> Result<Value, String> + 'static,
    {
        self.functions.bind(name, f);
        self
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn context(&self) -> &'h C {
        self.context
    }

    pub fn functions(&self) -> &FunctionTable<C> {
        &self.functions
    }

    pub fn locals(&self) -> &VarTable {
        &self.locals
    }

    pub fn set_local(&mut self, name: impl Into<String>, value: f64) {
        self.locals.set(name, value);
    }

    pub fn unset_local(&mut self, name: &str) -> bool {
        self.locals.unset(name)
    }

    pub fn origin(&self) -> Option<Origin> {
        self.origin.borrow().clone()
    }

    /// Set the location later diagnostics are tagged with, returning the
    /// previous one.
    pub fn replace_origin(&self, origin: Option<Origin>) -> Option<Origin> {
        self.origin.replace(origin)
    }

    /// Write to the diagnostics channel, adding the current origin if the
    /// diagnostic has no location of its own.
    pub fn report(&self, diag: Diagnostic) {
        let origin = self.origin.borrow();
        let diag = match origin.as_ref() {
            Some(o) if diag.file.is_none() => diag.at(Arc::clone(&o.file), o.line),
            _ => diag,
        };
        self.diagnostics.report(diag);
    }

    /// Look `name` up locally, then globally.
    ///
    /// Returns `(value, found)`; a miss yields `(0.0, false)` and one
    /// diagnostic.
    pub fn resolve_variable(&self, name: &str) -> (f64, bool) {
        if let Some(v) = self.locals.get(name) {
            return (v, true);
        }
        if self.globals.variable_exists(name) {
            return (self.globals.get_variable(name), true);
        }
        self.report(Diagnostic::unknown_variable(&self.component, name));
        (0.0, false)
    }

    /// Find a bound host operation, reporting a miss.
    pub fn resolve_function(&self, name: &str) -> Option<&HostFn<C>> {
        let f = self.functions.get(name);
        if f.is_none() {
            self.report(Diagnostic::unknown_function(&self.component, name));
        }
        f
    }

    /// Invoke `name` on the bound context.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let f = self
            .resolve_function(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_owned()))?;
        (**f)(self.context, args).map_err(|message| {
            let err = EvalError::CallFailed {
                name: name.to_owned(),
                message,
            };
            self.report(Diagnostic::new(
                DiagnosticKind::CallFailed,
                format!("{}: {err}", self.component),
            ));
            err
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::DiagnosticLog;

    struct Track {
        lead_gap: f64,
    }

    fn globals() -> VarTable {
        [("speed", 12.5), ("gap", 40.0)].into_iter().collect()
    }

    #[test]
    fn local_shadows_global() {
        let host = Track { lead_gap: 0.0 };
        let g = globals();
        let r = Resolver::new("t", &host).with_globals(&g).with_local("speed", 3.0);
        assert_eq!(r.resolve_variable("speed"), (3.0, true));
        assert_eq!(r.resolve_variable("gap"), (40.0, true));
    }

    #[test]
    fn missing_variable_reads_zero_and_reports_once() {
        let host = Track { lead_gap: 0.0 };
        let log = DiagnosticLog::new();
        let r = Resolver::new("cut_in", &host).with_diagnostics(&log);
        assert_eq!(r.resolve_variable("undefined_x"), (0.0, false));
        assert_eq!(log.len(), 1);
        assert!(log.messages()[0].contains("undefined_x"));
        assert_eq!(log.messages()[0], "cut_in: unknown variable 'undefined_x'");
    }

    #[test]
    fn bound_function_sees_context() {
        let host = Track { lead_gap: 25.0 };
        let r = Resolver::new("t", &host).bind("leadGap", |t: &Track, _| Ok(Value::Number(t.lead_gap)));
        assert_eq!(r.call("leadGap", &[]), Ok(Value::Number(25.0)));
    }

    #[test]
    fn missing_function_fails_and_reports() {
        let host = Track { lead_gap: 0.0 };
        let log = DiagnosticLog::new();
        let r = Resolver::new("t", &host).with_diagnostics(&log);
        assert_eq!(r.call("warp", &[]), Err(EvalError::UnknownFunction("warp".into())));
        assert_eq!(log.messages(), vec!["t: unknown function 'warp'"]);
    }

    #[test]
    fn host_error_becomes_call_failed() {
        let host = Track { lead_gap: 0.0 };
        let log = DiagnosticLog::new();
        let r = Resolver::new("t", &host)
            .with_diagnostics(&log)
            .bind("need1", |_: &Track, args| {
                if args.len() == 1 {
                    Ok(args[0].clone())
                } else {
                    Err(format!("expected 1 argument, got {}", args.len()))
                }
            });
        let err = r.call("need1", &[]).unwrap_err();
        assert_eq!(
            err,
            EvalError::CallFailed {
                name: "need1".into(),
                message: "expected 1 argument, got 0".into()
            }
        );
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn clone_copies_locals_and_shares_context() {
        let host = Track { lead_gap: 7.0 };
        let mut a = Resolver::new("t", &host).with_local("x", 1.0);
        let b = a.clone();
        a.set_local("x", 2.0);
        assert_eq!(b.resolve_variable("x"), (1.0, true));
        assert_eq!(a.resolve_variable("x"), (2.0, true));
        assert!(std::ptr::eq(a.context(), b.context()));
    }

    #[test]
    fn origin_tags_unresolved_symbols() {
        let host = ();
        let log = DiagnosticLog::new();
        let r = Resolver::new("cut_in", &host).with_diagnostics(&log);
        let prev = r.replace_origin(Some(Origin {
            file: "cut_in.scn".into(),
            line: 4,
        }));
        assert!(prev.is_none());
        r.resolve_variable("undefined_x");
        assert!(r.call("warp", &[]).is_err());
        r.replace_origin(None);
        r.resolve_variable("later");

        let diags = log.take();
        assert_eq!(diags[0].file.as_deref(), Some("cut_in.scn"));
        assert_eq!(diags[0].line, Some(4));
        assert_eq!(diags[0].message, "cut_in: unknown variable 'undefined_x'");
        assert_eq!(diags[1].to_string(), "cut_in.scn:4: cut_in: unknown function 'warp'");
        assert_eq!(diags[2].file, None);
    }

    #[test]
    fn hashmap_is_a_provider() {
        let host = ();
        let mut g = HashMap::new();
        g.insert("lane".to_owned(), 2.0);
        let r = Resolver::new("t", &host).with_globals(&g);
        assert_eq!(r.resolve_variable("lane"), (2.0, true));
    }

    #[test]
    fn function_table_names_sorted() {
        let t = FunctionTable::<()>::new()
            .with("b", |_, _| Ok(Value::default()))
            .with("a", |_, _| Ok(Value::default()));
        assert_eq!(t.names(), vec!["a", "b"]);
        assert!(t.contains("a"));
        assert_eq!(t.len(), 2);
    }
}
