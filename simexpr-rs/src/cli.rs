//! Command-line argument parsing for the scenario runner.
//!
//! Usage:
//!   simexpr [-D<name>=<value>]... [-t<ticks>] [-q] <scenario-file>
//!   simexpr [-D<name>=<value>]... [-t<ticks>] [-q] -e<expr>

use std::path::PathBuf;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Initial host globals (`-D<name>=<value>`), in command-line order.
    pub defines: Vec<(String, f64)>,
    /// Number of simulation ticks to run (`-t<ticks>`).
    pub ticks: u64,
    /// Suppress diagnostics (`-q`).
    pub quiet: bool,
    /// What to evaluate.
    pub source: Source,
}

/// Where the expressions come from.
#[derive(Debug, Default)]
pub enum Source {
    /// Nothing given; rejected by [`parse_argv`].
    #[default]
    None,
    /// A scenario file (positional argument).
    File(PathBuf),
    /// A single inline expression (`-e<expr>`).
    Inline(String),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or(&[]))
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs {
        ticks: 1,
        ..CliArgs::default()
    };
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        // Non-flag argument.
        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'q' => args.quiet = true,

                // Flags that take a value, embedded (`-t5`) or separate (`-t 5`).
                flag @ ('D' | 't' | 'e') => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{flag} requires an argument"));
                    };
                    match flag {
                        'D' => args.defines.push(parse_define(&value)?),
                        't' => {
                            args.ticks = value
                                .parse()
                                .map_err(|_| format!("invalid tick count: {value}"))?;
                        }
                        _ => args.source = Source::Inline(value),
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    let inline = matches!(args.source, Source::Inline(_));
    match (positional.len(), inline) {
        (0, false) => return Err("no scenario file or -e expression given".to_owned()),
        (0, true) => {}
        (1, false) => args.source = Source::File(PathBuf::from(positional.remove(0))),
        (1, true) => return Err("give either a scenario file or -e, not both".to_owned()),
        (n, _) => return Err(format!("too many arguments ({n})")),
    }

    Ok(args)
}

/// Split `name=value` into its parts.
fn parse_define(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty variable name in '{s}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number for {name}: '{value}'"))?;
    Ok((name.to_owned(), value))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn empty_args_rejected() {
        assert!(parse_argv(&argv(&[])).is_err());
    }

    #[test]
    fn file_positional() {
        let a = parse_argv(&argv(&["cut_in.scn"])).unwrap();
        assert!(matches!(&a.source, Source::File(p) if p == &PathBuf::from("cut_in.scn")));
        assert_eq!(a.ticks, 1);
        assert!(!a.quiet);
    }

    #[test]
    fn inline_expression_embedded_and_separate() {
        let a = parse_argv(&argv(&["-espeed + 5"])).unwrap();
        assert!(matches!(&a.source, Source::Inline(e) if e == "speed + 5"));
        let a = parse_argv(&argv(&["-e", "1 + 1"])).unwrap();
        assert!(matches!(&a.source, Source::Inline(e) if e == "1 + 1"));
    }

    #[test]
    fn defines_in_order() {
        let a = parse_argv(&argv(&["-Dspeed=12.5", "-D", "gap = 40", "x.scn"])).unwrap();
        assert_eq!(
            a.defines,
            vec![("speed".to_owned(), 12.5), ("gap".to_owned(), 40.0)]
        );
    }

    #[test]
    fn bad_define() {
        assert!(parse_argv(&argv(&["-Dspeed", "x.scn"])).is_err());
        assert!(parse_argv(&argv(&["-D=3", "x.scn"])).is_err());
        assert!(parse_argv(&argv(&["-Dspeed=fast", "x.scn"])).is_err());
    }

    #[test]
    fn ticks_and_quiet_combined() {
        let a = parse_argv(&argv(&["-qt10", "x.scn"])).unwrap();
        assert!(a.quiet);
        assert_eq!(a.ticks, 10);
    }

    #[test]
    fn invalid_ticks() {
        assert!(parse_argv(&argv(&["-tmany", "x.scn"])).is_err());
    }

    #[test]
    fn missing_flag_value() {
        assert!(parse_argv(&argv(&["x.scn", "-t"])).is_err());
    }

    #[test]
    fn file_and_inline_conflict() {
        assert!(parse_argv(&argv(&["-e1", "x.scn"])).is_err());
    }

    #[test]
    fn too_many_positional() {
        assert!(parse_argv(&argv(&["a", "b"])).is_err());
    }

    #[test]
    fn unknown_flag() {
        assert!(parse_argv(&argv(&["-z", "x.scn"])).is_err());
    }

    #[test]
    fn double_dash_ends_flags() {
        let a = parse_argv(&argv(&["--", "-odd.scn"])).unwrap();
        assert!(matches!(&a.source, Source::File(p) if p == &PathBuf::from("-odd.scn")));
    }
}
