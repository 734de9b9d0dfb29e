//! Reference simulation host.
//!
//! The expression core never implements functions itself; they are bound
//! from the host.  This module is a small host used by the command-line
//! runner, the integration tests and the benches: a global variable
//! registry plus a standard set of math and string operations.

use std::cell::RefCell;

use crate::diag::DiagnosticSink;
use crate::expr::resolve::{FunctionTable, Resolver, VariableProvider};
use crate::expr::{Evaluator, Value};
use crate::var::VarTable;

/// Global holding the current tick number.
pub const TICK_VAR: &str = "tick";
/// Global holding the ego vehicle's position along the track.
pub const EGO_POSITION_VAR: &str = "ego.position";

/// Host-side state shared by every evaluator in a simulation.
#[derive(Debug, Default)]
pub struct SimHost {
    globals: RefCell<VarTable>,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_globals(globals: VarTable) -> Self {
        SimHost {
            globals: RefCell::new(globals),
        }
    }

    pub fn set_global(&self, name: impl Into<String>, value: f64) {
        self.globals.borrow_mut().set(name, value);
    }

    pub fn global(&self, name: &str) -> Option<f64> {
        self.globals.borrow().get(name)
    }

    /// Publish the tick counter before evaluators run.
    pub fn begin_tick(&self, tick: u64) {
        self.set_global(TICK_VAR, tick as f64);
    }

    /// The standard functions plus the ones that read host state.
    pub fn functions() -> FunctionTable<SimHost> {
        standard_functions::<SimHost>().with("distanceTo", |host: &SimHost, args| {
            let pos = get_number(args, 0, "distanceTo")?;
            let ego = host.global(EGO_POSITION_VAR).unwrap_or(0.0);
            Ok(Value::Number((pos - ego).abs()))
        })
    }

    /// Build an evaluator bound to this host.
    pub fn evaluator<'h>(
        &'h self,
        component: &str,
        diagnostics: &'h dyn DiagnosticSink,
    ) -> Evaluator<'h, SimHost> {
        Evaluator::new(
            Resolver::new(component, self)
                .with_globals(self)
                .with_diagnostics(diagnostics)
                .with_functions(Self::functions()),
        )
    }
}

impl VariableProvider for SimHost {
    fn variable_exists(&self, name: &str) -> bool {
        self.globals.borrow().contains(name)
    }

    fn get_variable(&self, name: &str) -> f64 {
        self.globals.borrow().get(name).unwrap_or(0.0)
    }
}

/// Context-free operations any host can bind.
pub fn standard_functions<C>() -> FunctionTable<C> {
    FunctionTable::<C>::new()
        .with("abs", |_, args| Ok(Value::Number(get_number(args, 0, "abs")?.abs())))
        .with("sqrt", |_, args| {
            let x = get_number(args, 0, "sqrt")?;
            if x < 0.0 {
                return Err(format!("sqrt: negative argument {x}"));
            }
            Ok(Value::Number(x.sqrt()))
        })
        .with("floor", |_, args| Ok(Value::Number(get_number(args, 0, "floor")?.floor())))
        .with("ceil", |_, args| Ok(Value::Number(get_number(args, 0, "ceil")?.ceil())))
        .with("round", |_, args| Ok(Value::Number(get_number(args, 0, "round")?.round())))
        .with("pow", |_, args| {
            let base = get_number(args, 0, "pow")?;
            let exp = get_number(args, 1, "pow")?;
            Ok(Value::Number(base.powf(exp)))
        })
        .with("min", |_, args| fold_numbers(args, "min", f64::min))
        .with("max", |_, args| fold_numbers(args, "max", f64::max))
        .with("clamp", |_, args| {
            let x = get_number(args, 0, "clamp")?;
            let lo = get_number(args, 1, "clamp")?;
            let hi = get_number(args, 2, "clamp")?;
            if lo > hi {
                return Err(format!("clamp: lower bound {lo} above upper bound {hi}"));
            }
            Ok(Value::Number(x.clamp(lo, hi)))
        })
        .with("strlen", |_, args| {
            let s = get_str(args, 0, "strlen")?;
            Ok(Value::Number(s.chars().count() as f64))
        })
        .with("strcat", |_, args| {
            let mut out = String::new();
            for a in args {
                out.push_str(&a.as_str());
            }
            Ok(Value::Str(out))
        })
}

fn fold_numbers(args: &[Value], name: &str, f: fn(f64, f64) -> f64) -> Result<Value, String> {
    let first = get_number(args, 0, name)?;
    Ok(Value::Number(
        args[1..].iter().map(Value::as_number).fold(first, f),
    ))
}

fn get_str(args: &[Value], idx: usize, name: &str) -> Result<String, String> {
    args.get(idx)
        .map(|v| v.as_str())
        .ok_or_else(|| format!("{name}: argument {idx} missing"))
}

fn get_number(args: &[Value], idx: usize, name: &str) -> Result<f64, String> {
    args.get(idx)
        .map(|v| v.as_number())
        .ok_or_else(|| format!("{name}: argument {idx} missing"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
