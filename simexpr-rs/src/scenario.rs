//! Scenario loader.
//!
//! A scenario is a text file of `;`-separated expression statements, each
//! optionally labelled:
//!
//! ```text
//! # cut-in trigger
//! approach: distanceTo(lead) < 30;
//! brake:    approach && speed > 20;
//! speed * 3.6;                       # unlabelled
//! ```
//!
//! A malformed statement does not stop the load: it becomes one entry in the
//! returned error list and the following statements load normally.

use std::path::Path;
use std::sync::Arc;

use crate::expr::ast::Expr;
use crate::expr::parser::{Parser, SyntaxError};
use crate::expr::resolve::Origin;

// ── Public API ────────────────────────────────────────────────────────────────

/// One successfully parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub label: Option<String>,
    pub expr: Expr,
    pub line: u32,
}

/// The parsed contents of one scenario source.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub file: Arc<str>,
    entries: Vec<Entry>,
}

impl Scenario {
    /// Parse scenario text.
    ///
    /// Returns the scenario and every syntax error encountered, in source
    /// order.
    pub fn load_str(src: &str, file: impl Into<Arc<str>>) -> (Self, Vec<SyntaxError>) {
        let file = file.into();
        let (stmts, errors) = Parser::new(src, Arc::clone(&file)).parse_all();
        let entries = stmts
            .into_iter()
            .map(|s| Entry {
                label: s.label,
                expr: s.expr,
                line: s.line,
            })
            .collect::<Vec<_>>();
        tracing::debug!(
            file = %file,
            entries = entries.len(),
            errors = errors.len(),
            "scenario loaded"
        );
        (Scenario { file, entries }, errors)
    }

    /// Read and parse a scenario file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<SyntaxError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s, path.display().to_string()))
    }

    /// First entry carrying `label`.
    pub fn get(&self, label: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.label.as_deref() == Some(label))
    }

    /// Where `entry` was written, for tagging its diagnostics.
    pub fn origin_of(&self, entry: &Entry) -> Origin {
        Origin {
            file: Arc::clone(&self.file),
            line: entry.line,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
