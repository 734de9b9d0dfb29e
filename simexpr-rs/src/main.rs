use std::process::ExitCode;

use simexpr::cli::{self, Source};
use simexpr::diag::{Diagnostic, DiagnosticSink};
use simexpr::host::SimHost;
use simexpr::scenario::Scenario;

const USAGE: &str = "Usage: simexpr [-D<name>=<value>]... [-t<ticks>] [-q] <scenario-file>\n       \
                     simexpr [-D<name>=<value>]... [-t<ticks>] [-q] -e<expr>";

/// Writes diagnostics to stderr unless `-q` was given.
struct StderrSink {
    quiet: bool,
}

impl DiagnosticSink for StderrSink {
    fn report(&self, diag: Diagnostic) {
        if !self.quiet {
            eprintln!("simexpr: {diag}");
        }
    }
}

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("simexpr: {e}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };
    let sink = StderrSink { quiet: args.quiet };

    // ── Load ──────────────────────────────────────────────────────────────────
    let (scenario, errors, component) = match &args.source {
        Source::File(path) => match Scenario::load_file(path) {
            Ok((sc, errs)) => {
                let component = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "scenario".to_owned());
                (sc, errs, component)
            }
            Err(e) => {
                eprintln!("simexpr: {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        Source::Inline(src) => {
            let (sc, errs) = Scenario::load_str(src, "<command line>");
            (sc, errs, "expr".to_owned())
        }
        Source::None => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };
    for err in &errors {
        sink.report(Diagnostic::from(err));
    }

    // ── Run ───────────────────────────────────────────────────────────────────
    let host = SimHost::with_globals(args.defines.into_iter().collect());
    let ev = host.evaluator(&component, &sink);
    let mut failed_calls = 0usize;

    for tick in 0..args.ticks {
        host.begin_tick(tick);
        for (i, entry) in scenario.iter().enumerate() {
            let out = ev.evaluate_at(&entry.expr, scenario.origin_of(entry));
            failed_calls += out.failures.len();
            let label = match &entry.label {
                Some(label) => {
                    // Later statements may refer to earlier ones by label.
                    host.set_global(label.clone(), out.as_number());
                    label.clone()
                }
                None => format!("#{}", i + 1),
            };
            if args.ticks > 1 {
                println!("[{tick}] {label} = {}", out.value);
            } else {
                println!("{label} = {}", out.value);
            }
        }
    }

    if errors.is_empty() && failed_calls == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
