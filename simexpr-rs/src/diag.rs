//! Diagnostics channel.
//!
//! The host owns the sink; the lexer, parser and evaluator only ever write
//! to it.  Messages follow the `<component>: unknown variable '<name>'`
//! shape so they can be grepped out of a simulation log.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

/// Classification of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnknownVariable,
    UnknownFunction,
    CallFailed,
    Syntax,
    Arithmetic,
    Pattern,
}

/// A single message written to the diagnostics channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub file: Option<Arc<str>>,
    pub line: Option<u32>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file: None,
            line: None,
        }
    }

    pub fn at(mut self, file: Arc<str>, line: u32) -> Self {
        self.file = Some(file);
        self.line = Some(line);
        self
    }

    pub fn unknown_variable(component: &str, name: &str) -> Self {
        Self::new(
            DiagnosticKind::UnknownVariable,
            format!("{component}: unknown variable '{name}'"),
        )
    }

    pub fn unknown_function(component: &str, name: &str) -> Self {
        Self::new(
            DiagnosticKind::UnknownFunction,
            format!("{component}: unknown function '{name}'"),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{file}:{line}: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// One-way notification interface implemented by the host.
pub trait DiagnosticSink {
    fn report(&self, diag: Diagnostic);
}

/// Forwards every diagnostic to `tracing` at `WARN` level.
///
/// This is the sink a [`Resolver`](crate::expr::Resolver) uses when the
/// host does not supply one.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diag: Diagnostic) {
        tracing::warn!(kind = ?diag.kind, "{diag}");
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: RefCell<Vec<Diagnostic>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Rendered messages, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.entries.borrow().iter().map(ToString::to_string).collect()
    }

    /// Drain and return everything collected so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn report(&self, diag: Diagnostic) {
        self.entries.borrow_mut().push(diag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_variable_message() {
        let d = Diagnostic::unknown_variable("brake_check", "speed");
        assert_eq!(d.kind, DiagnosticKind::UnknownVariable);
        assert_eq!(d.to_string(), "brake_check: unknown variable 'speed'");
    }

    #[test]
    fn located_message() {
        let d = Diagnostic::new(DiagnosticKind::Syntax, "unexpected '*'").at("a.scn".into(), 3);
        assert_eq!(d.to_string(), "a.scn:3: unexpected '*'");
    }

    #[test]
    fn log_collects_and_drains() {
        let log = DiagnosticLog::new();
        log.report(Diagnostic::unknown_function("c", "f"));
        log.report(Diagnostic::unknown_variable("c", "v"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.messages()[0], "c: unknown function 'f'");
        let drained = log.take();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }
}
