use criterion::{black_box, criterion_group, criterion_main, Criterion};
use simexpr::diag::DiagnosticLog;
use simexpr::expr::{parse_expr, Parser};
use simexpr::host::{SimHost, EGO_POSITION_VAR};

const TRIGGER: &str = "distanceTo(lead) < 30 && speed > 20 || (lane =~ \"2*\" ? 1 : 0)";

fn make_scenario(statements: usize) -> String {
    (0..statements)
        .map(|i| format!("s{i}: clamp(speed * {i} - gap / 2, 0, 100) >= max(gap, {i});\n"))
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let small = make_scenario(10);
    let large = make_scenario(1000);

    let mut g = c.benchmark_group("parse");
    g.bench_function("trigger", |b| b.iter(|| parse_expr(black_box(TRIGGER))));
    g.bench_function("scenario_10", |b| {
        b.iter(|| Parser::new(black_box(&small), "bench.scn").parse_all())
    });
    g.bench_function("scenario_1000", |b| {
        b.iter(|| Parser::new(black_box(&large), "bench.scn").parse_all())
    });
    g.finish();
}

fn bench_tick(c: &mut Criterion) {
    let host = SimHost::new();
    host.set_global("lead", 120.0);
    host.set_global("speed", 25.0);
    host.set_global("gap", 40.0);
    host.set_global("lane", 2.0);
    let log = DiagnosticLog::new();
    let ev = host.evaluator("bench", &log);

    let trigger = parse_expr(TRIGGER).expect("trigger parses");
    let (stmts, _) = Parser::new(&make_scenario(100), "bench.scn").parse_all();

    let mut g = c.benchmark_group("tick");
    g.bench_function("trigger", |b| {
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            host.begin_tick(tick);
            host.set_global(EGO_POSITION_VAR, (tick % 200) as f64);
            ev.evaluate(black_box(&trigger))
        })
    });
    g.bench_function("scenario_100", |b| {
        b.iter(|| {
            for stmt in &stmts {
                black_box(ev.evaluate(&stmt.expr));
            }
        })
    });
    g.finish();
}

criterion_group!(benches, bench_parse, bench_tick);
criterion_main!(benches);
