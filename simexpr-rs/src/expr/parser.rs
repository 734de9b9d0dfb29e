//! Expression parser with statement-level error recovery.
//!
//! Operator precedence (lowest → highest):
//!   ternary  →  or  →  and  →  equality/match  →  relational  →
//!   additive  →  multiplicative  →  unary  →  primary
//!
//! A scenario is a sequence of statements separated by `;`, each optionally
//! labelled (`brake: gap < 10;`).  Before every statement the parser sets a
//! [`Checkpoint`]; a syntax error unwinds to it, skips the rest of the
//! statement and is handed back as a [`SyntaxError`].  The next call to
//! [`Parser::parse_next`] starts clean.

use std::sync::Arc;

use thiserror::Error;

use super::ast::{BinOp, Expr, UnaryOp};
use super::lexer::{LexError, Lexer, Token, TokenKind};
use super::value::Value;
use crate::diag::{Diagnostic, DiagnosticKind};

/// File name used when the caller does not supply one.
pub const DEFAULT_FILE: &str = "<expr>";

/// Deepest nesting of parentheses, calls, unary and binary operators
/// accepted in one statement.
pub const MAX_DEPTH: usize = 64;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// The lexer could not make sense of the input.
    Lexical,
    /// The token sequence does not fit the grammar.
    Grammar,
}

/// A located syntax error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{file}:{line}: syntax error near {token}: {message}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    /// The offending token as it reads in the source.
    pub token: String,
    pub line: u32,
    pub file: Arc<str>,
    pub message: String,
}

impl SyntaxError {
    fn at(tok: &Token, message: impl Into<String>) -> Self {
        let kind = match tok.kind {
            TokenKind::Error(_) => SyntaxErrorKind::Lexical,
            _ => SyntaxErrorKind::Grammar,
        };
        SyntaxError {
            kind,
            token: tok.describe(),
            line: tok.line,
            file: Arc::clone(&tok.file),
            message: message.into(),
        }
    }
}

impl From<&SyntaxError> for Diagnostic {
    fn from(err: &SyntaxError) -> Self {
        Diagnostic::new(
            DiagnosticKind::Syntax,
            format!("syntax error near {}: {}", err.token, err.message),
        )
        .at(Arc::clone(&err.file), err.line)
    }
}

// ── Recovery ──────────────────────────────────────────────────────────────────

/// Saved parse position: the token a statement started at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub token: usize,
}

/// Holds the single active checkpoint.
///
/// Establishing a checkpoint replaces the previous one; there is no stack,
/// so an error anywhere inside a statement (including inside call
/// arguments) abandons the whole statement.
#[derive(Debug, Default)]
pub struct Recovery {
    active: Option<Checkpoint>,
}

impl Recovery {
    pub fn establish(&mut self, checkpoint: Checkpoint) {
        self.active = Some(checkpoint);
    }

    pub fn active(&self) -> Option<Checkpoint> {
        self.active
    }

    /// Consume the active checkpoint.
    pub fn unwind(&mut self) -> Option<Checkpoint> {
        self.active.take()
    }
}

// ── Statements ────────────────────────────────────────────────────────────────

/// One parsed statement of a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub label: Option<String>,
    pub expr: Expr,
    /// Line the statement starts on.
    pub line: u32,
}

// ── Parser ────────────────────────────────────────────────────────────────────

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    recovery: Recovery,
    /// Nesting of the expression currently being built.
    depth: usize,
}

impl Parser {
    pub fn new(src: &str, file: impl Into<Arc<str>>) -> Self {
        Self::from_tokens(Lexer::new(src, file).tokenize())
    }

    /// Parse a pre-lexed stream.  A missing trailing `Eof` is tolerated.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            recovery: Recovery::default(),
            depth: 0,
        }
    }

    pub fn recovery(&self) -> &Recovery {
        &self.recovery
    }

    /// Index of the next unread token; where the next statement will start.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek2(&self) -> &TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos).or_else(|| self.tokens.last())
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, expected: &TokenKind) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        match self.current() {
            Some(tok) => match tok.kind {
                TokenKind::Error(e) => SyntaxError::at(tok, e.to_string()),
                _ => SyntaxError::at(tok, message),
            },
            None => SyntaxError {
                kind: SyntaxErrorKind::Grammar,
                token: "end of input".to_owned(),
                line: 1,
                file: DEFAULT_FILE.into(),
                message: message.into(),
            },
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.peek() == &TokenKind::Eof
    }

    // ── Statement level ───────────────────────────────────────────────────────

    /// Parse the next statement.  Returns `None` once the input is exhausted.
    ///
    /// On error the rest of the offending statement is skipped, so calling
    /// again continues with the statement after it.
    pub fn parse_next(&mut self) -> Option<Result<Statement, SyntaxError>> {
        while self.eat(&TokenKind::Semi) {}
        if self.at_end() {
            return None;
        }

        self.recovery.establish(Checkpoint { token: self.pos });
        self.depth = 0;
        match self.parse_statement() {
            Ok(stmt) => Some(Ok(stmt)),
            Err(err) => {
                if let Some(cp) = self.recovery.unwind() {
                    self.pos = cp.token;
                }
                self.skip_statement();
                tracing::debug!(
                    file = %err.file,
                    line = err.line,
                    resume = self.pos,
                    "recovered from syntax error: {}",
                    err.message
                );
                Some(Err(err))
            }
        }
    }

    /// Parse every statement, collecting good ones and errors separately.
    pub fn parse_all(&mut self) -> (Vec<Statement>, Vec<SyntaxError>) {
        let mut stmts = Vec::new();
        let mut errors = Vec::new();
        while let Some(res) = self.parse_next() {
            match res {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => errors.push(err),
            }
        }
        (stmts, errors)
    }

    /// Skip past the next `;`.
    ///
    /// An unterminated string swallows the rest of its line, `;` included,
    /// so once one is passed the statement also ends at the next line.
    fn skip_statement(&mut self) {
        let mut cut_line = None;
        while let Some(tok) = self.tokens.get(self.pos) {
            if tok.is_eof() || cut_line.is_some_and(|line| tok.line > line) {
                break;
            }
            self.pos += 1;
            match tok.kind {
                TokenKind::Semi => break,
                TokenKind::Error(LexError::UnterminatedString) => cut_line = Some(tok.line),
                _ => {}
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        let line = self.current().map_or(1, |t| t.line);
        let label = if self.peek() == &TokenKind::Ident && self.peek2() == &TokenKind::Colon {
            let name = self.advance().map(|t| t.text.to_string());
            self.pos += 1; // ':'
            name
        } else {
            None
        };
        let expr = self.parse_expr()?;
        if !self.eat(&TokenKind::Semi) && !self.at_end() {
            return Err(self.error_here("expected ';' or end of input"));
        }
        Ok(Statement { label, expr, line })
    }

    /// Parse exactly one expression spanning the whole input.
    pub fn parse_single(&mut self) -> Result<Expr, SyntaxError> {
        self.recovery.establish(Checkpoint { token: self.pos });
        self.depth = 0;
        let expr = self.parse_expr()?;
        if !self.at_end() {
            return Err(self.error_here("expected end of input"));
        }
        Ok(expr)
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_ternary()
    }

    /// Go one level deeper, failing past [`MAX_DEPTH`].
    ///
    /// Callers restore `depth` on success; an error abandons the statement
    /// and the next one starts from zero.
    fn descend(&mut self) -> Result<(), SyntaxError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error_here("expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_ternary(&mut self) -> Result<Expr, SyntaxError> {
        let cond = self.parse_or()?;
        if self.eat(&TokenKind::Question) {
            let base = self.depth;
            self.descend()?;
            let then = self.parse_ternary()?;
            if !self.eat(&TokenKind::Colon) {
                return Err(self.error_here("expected ':' in conditional"));
            }
            let else_ = self.parse_ternary()?;
            self.depth = base;
            Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(else_)))
        } else {
            Ok(cond)
        }
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.depth;
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            self.descend()?;
            let rhs = self.parse_and()?;
            lhs = Expr::binary(BinOp::Or, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.depth;
        let mut lhs = self.parse_equality()?;
        while self.eat(&TokenKind::And) {
            self.descend()?;
            let rhs = self.parse_equality()?;
            lhs = Expr::binary(BinOp::And, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.depth;
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                TokenKind::GlobMatch => BinOp::GlobMatch,
                TokenKind::RegexMatch => BinOp::RegexMatch,
                TokenKind::NotGlobMatch => BinOp::NotGlobMatch,
                TokenKind::NotRegexMatch => BinOp::NotRegexMatch,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.parse_relational()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.depth;
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.parse_additive()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.depth;
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.depth;
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.pos += 1;
        let base = self.depth;
        self.descend()?;
        let inner = self.parse_unary()?;
        self.depth = base;
        Ok(Expr::unary(op, inner))
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let tok = match self.current() {
            Some(t) if !t.is_eof() => t.clone(),
            _ => return Err(self.error_here("unexpected end of input")),
        };
        match tok.kind {
            TokenKind::Number(x) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Number(x)))
            }
            TokenKind::Str => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Str(tok.text.to_string())))
            }
            TokenKind::Ident => {
                self.pos += 1;
                let name = tok.text.to_string();
                if self.eat(&TokenKind::LParen) {
                    let base = self.depth;
                    self.descend()?;
                    let mut args = Vec::new();
                    if self.peek() != &TokenKind::RParen {
                        args.push(self.parse_expr()?);
                        while self.eat(&TokenKind::Comma) {
                            args.push(self.parse_expr()?);
                        }
                    }
                    if !self.eat(&TokenKind::RParen) {
                        return Err(self.error_here(format!("expected ')' after arguments to {name}")));
                    }
                    self.depth = base;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            TokenKind::LParen => {
                self.pos += 1;
                let base = self.depth;
                self.descend()?;
                let inner = self.parse_expr()?;
                if !self.eat(&TokenKind::RParen) {
                    return Err(self.error_here("expected ')'"));
                }
                self.depth = base;
                Ok(inner)
            }
            TokenKind::Error(e) => Err(SyntaxError::at(&tok, e.to_string())),
            _ => Err(SyntaxError::at(&tok, "unexpected token")),
        }
    }
}

/// Parse a single expression.
pub fn parse_expr(src: &str) -> Result<Expr, SyntaxError> {
    parse_expr_in(src, DEFAULT_FILE)
}

/// Parse a single expression, attributing errors to `file`.
pub fn parse_expr_in(src: &str, file: impl Into<Arc<str>>) -> Result<Expr, SyntaxError> {
    Parser::new(src, file).parse_single()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn num(x: f64) -> Expr {
        Expr::Literal(Value::Number(x))
    }

    fn var(name: &str) -> Expr {
        Expr::Var(name.into())
    }

    #[test]
    fn precedence() {
        assert_eq!(
            parse_expr("a + 2 * b").unwrap(),
            Expr::binary(BinOp::Add, var("a"), Expr::binary(BinOp::Mul, num(2.0), var("b")))
        );
        assert_eq!(
            parse_expr("(a + 2) * b").unwrap(),
            Expr::binary(BinOp::Mul, Expr::binary(BinOp::Add, var("a"), num(2.0)), var("b"))
        );
    }

    #[test]
    fn left_associative() {
        assert_eq!(
            parse_expr("10 - 4 - 3").unwrap(),
            Expr::binary(BinOp::Sub, Expr::binary(BinOp::Sub, num(10.0), num(4.0)), num(3.0))
        );
    }

    #[test]
    fn logical_binds_looser_than_comparison() {
        assert_eq!(
            parse_expr("a < 1 || b == 2 && !c").unwrap(),
            Expr::binary(
                BinOp::Or,
                Expr::binary(BinOp::Lt, var("a"), num(1.0)),
                Expr::binary(
                    BinOp::And,
                    Expr::binary(BinOp::Eq, var("b"), num(2.0)),
                    Expr::unary(UnaryOp::Not, var("c")),
                ),
            )
        );
    }

    #[test]
    fn function_calls() {
        assert_eq!(
            parse_expr("distanceTo(leadVehicle) < 30").unwrap(),
            Expr::binary(
                BinOp::Lt,
                Expr::Call("distanceTo".into(), vec![var("leadVehicle")]),
                num(30.0),
            )
        );
        assert_eq!(parse_expr("now()").unwrap(), Expr::Call("now".into(), vec![]));
        assert_eq!(
            parse_expr("max(a, b + 1, \"s\")").unwrap(),
            Expr::Call(
                "max".into(),
                vec![
                    var("a"),
                    Expr::binary(BinOp::Add, var("b"), num(1.0)),
                    Expr::Literal(Value::Str("s".into())),
                ],
            )
        );
    }

    #[test]
    fn ternary_is_right_associative() {
        assert_eq!(
            parse_expr("a ? 1 : b ? 2 : 3").unwrap(),
            Expr::Ternary(
                Box::new(var("a")),
                Box::new(num(1.0)),
                Box::new(Expr::Ternary(Box::new(var("b")), Box::new(num(2.0)), Box::new(num(3.0)))),
            )
        );
    }

    #[test]
    fn consecutive_operators_report_offending_token() {
        let err = parse_expr("x +* 2").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::Grammar);
        assert_eq!(err.token, "*");
        assert_eq!(err.line, 1);
        assert_eq!(&*err.file, DEFAULT_FILE);
    }

    #[test]
    fn lexical_errors_surface_as_syntax_errors() {
        let err = parse_expr_in("a @ b", "x.scn").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::Lexical);
        assert_eq!(err.token, "@");
        assert_eq!(err.to_string(), "x.scn:1: syntax error near @: unrecognised character");
    }

    #[test]
    fn trailing_tokens_rejected() {
        let err = parse_expr("a b").unwrap_err();
        assert_eq!(err.token, "b");
        assert!(parse_expr("a;").is_err());
    }

    #[test]
    fn missing_operand_at_end() {
        let err = parse_expr("a +").unwrap_err();
        assert_eq!(err.token, "end of input");
        assert!(parse_expr("").is_err());
    }

    #[test]
    fn unclosed_call() {
        let err = parse_expr("f(1, 2").unwrap_err();
        assert!(err.message.contains("after arguments to f"));
    }

    #[test]
    fn recovery_skips_only_the_bad_statement() {
        let mut p = Parser::new("a + 1;\nx +* 2;\nb * 3", "s.scn");
        let first = p.parse_next().unwrap().unwrap();
        assert_eq!(first.line, 1);
        let err = p.parse_next().unwrap().unwrap_err();
        assert_eq!(err.token, "*");
        assert_eq!(err.line, 2);
        assert!(p.recovery().active().is_none());
        let third = p.parse_next().unwrap().unwrap();
        assert_eq!(third.expr, Expr::binary(BinOp::Mul, var("b"), num(3.0)));
        assert_eq!(third.line, 3);
        assert!(p.parse_next().is_none());
    }

    #[test]
    fn parse_all_counts() {
        let src = "a; b +; c; (d; e";
        let (stmts, errors) = Parser::new(src, "s").parse_all();
        assert_eq!(stmts.len(), 3);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn checkpoint_is_overwritten_per_statement() {
        let mut p = Parser::new("a; b", "s");
        p.parse_next();
        assert_eq!(p.recovery().active(), Some(Checkpoint { token: 0 }));
        p.parse_next();
        assert_eq!(p.recovery().active(), Some(Checkpoint { token: 2 }));
    }

    #[test]
    fn labels_and_empty_statements() {
        let (stmts, errors) = Parser::new(";; brake: gap < 10;; go: 1", "s").parse_all();
        assert!(errors.is_empty());
        assert_eq!(stmts[0].label.as_deref(), Some("brake"));
        assert_eq!(stmts[1].label.as_deref(), Some("go"));
    }

    fn nested(n: usize) -> String {
        format!("{}1{}", "(".repeat(n), ")".repeat(n))
    }

    #[test]
    fn nesting_limit_is_inclusive() {
        assert_eq!(parse_expr(&nested(MAX_DEPTH)).unwrap(), num(1.0));
        let err = parse_expr(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");
    }

    #[test]
    fn runaway_nesting_is_a_syntax_error() {
        let err = parse_expr(&"(".repeat(10_000)).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::Grammar);
        assert_eq!(err.message, "expression nested too deeply");

        let src = format!("a: {};\nb: 2", nested(100_000));
        let (stmts, errors) = Parser::new(&src, "deep.scn").parse_all();
        assert_eq!(errors.len(), 1);
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].label.as_deref(), Some("b"));
    }

    #[test]
    fn long_operator_chains_are_bounded() {
        let ok = vec!["x"; MAX_DEPTH + 1].join(" + ");
        assert!(parse_expr(&ok).is_ok());
        let too_long = vec!["x"; MAX_DEPTH + 2].join(" + ");
        assert!(parse_expr(&too_long).is_err());
        assert!(parse_expr(&format!("{}x", "-".repeat(MAX_DEPTH + 1))).is_err());
        assert!(parse_expr(&format!("{}x", "!".repeat(MAX_DEPTH))).is_ok());
    }

    #[test]
    fn depth_resets_between_statements() {
        let one = nested(MAX_DEPTH);
        let src = format!("{one}; {one}; {one}");
        let (stmts, errors) = Parser::new(&src, "s").parse_all();
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn unterminated_string_costs_only_its_line() {
        let (stmts, errors) = Parser::new("a: \"abc;\nb: 2;\nc: 3", "s.scn").parse_all();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "unterminated string");
        assert_eq!(errors[0].line, 1);
        let labels: Vec<_> = stmts.iter().filter_map(|s| s.label.as_deref()).collect();
        assert_eq!(labels, vec!["b", "c"]);
    }

    #[test]
    fn unterminated_string_after_other_error() {
        // The first error is at '*'; skipping still stops at the line end.
        let (stmts, errors) = Parser::new("a: 1 +* \"x;\nb: 2", "s").parse_all();
        assert_eq!(errors.len(), 1);
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].line, 2);
    }

    #[test]
    fn syntax_error_converts_to_diagnostic() {
        let err = parse_expr_in("1 +* 2", "a.scn").unwrap_err();
        let d = Diagnostic::from(&err);
        assert_eq!(d.kind, DiagnosticKind::Syntax);
        assert_eq!(d.to_string(), "a.scn:1: syntax error near *: unexpected token");
    }
}
