//! Embedded expression language for simulation scenarios.
//!
//! Scenario authors write conditions such as
//! `distanceTo(leadVehicle) < 30 && speed > 20`; the host parses them once
//! at load time and evaluates them every simulation tick.
//!
//! - [`expr`]: lexer, parser (with error recovery), resolver and evaluator
//! - [`scenario`]: loading multi-statement scenario text and files
//! - [`diag`]: the diagnostics channel the core reports through
//! - [`host`]: a reference host with a global registry and standard functions
//!
//! # Quick start
//!
//! ```rust
//! use simexpr::diag::DiagnosticLog;
//! use simexpr::host::SimHost;
//! use simexpr::scenario::Scenario;
//!
//! let host = SimHost::new();
//! host.set_global("speed", 12.5);
//! let log = DiagnosticLog::new();
//! let ev = host.evaluator("demo", &log);
//!
//! let (scenario, errors) = Scenario::load_str("fast: speed + 5 > 15; bad: 1 +* 2", "demo.scn");
//! assert_eq!(errors.len(), 1);
//! let fast = scenario.get("fast").unwrap();
//! assert!(ev.evaluate(&fast.expr).as_bool());
//! ```

pub mod cli;
pub mod diag;
pub mod expr;
pub mod host;
pub mod scenario;
pub mod token_text;
pub mod var;
