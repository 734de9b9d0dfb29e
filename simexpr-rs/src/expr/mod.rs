//! Scenario expression language.
//!
//! - Numeric and string literals, variables, function calls
//! - Arithmetic, comparison, logical (short-circuit) and conditional
//!   operators, plus glob (`=~`) and regex (`=/`) matching
//! - Statement-level error recovery when parsing whole scenarios
//! - Name resolution against a local table, then the host registry
//!
//! # Quick start
//!
//! ```rust
//! use simexpr::expr::{parse_expr, Evaluator, Resolver, Value};
//! use simexpr::var::VarTable;
//!
//! let globals: VarTable = [("speed", 12.5)].into_iter().collect();
//! let host = ();
//! let ev = Evaluator::new(Resolver::new("demo", &host).with_globals(&globals));
//! let expr = parse_expr("speed + 5").unwrap();
//! assert_eq!(ev.evaluate(&expr).value, Value::Number(17.5));
//! ```

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod value;

// Re-exports for convenience.
pub use ast::{BinOp, Expr, UnaryOp};
pub use eval::{Evaluation, Evaluator};
pub use parser::{parse_expr, parse_expr_in, Parser, Statement, SyntaxError, SyntaxErrorKind};
pub use resolve::{
    EvalError, FunctionTable, HostFn, NoVariables, Origin, Resolver, VariableProvider,
};
pub use value::Value;
