use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use quarry_core::parser::ast::{Expr, SourceType};
use quarry_core::parser::parse;
use quarry_core::{Analyzer, AnalyzerOptions};

/// A CommonJS-style module with the shapes a bundler sees most often.
fn module_source(copies: usize) -> String {
    let unit = r#"
const path = require("./path");
const { join, dirname } = require("./util" + ".js");
(function (r) {
  r(`./locale/${lang}.json`);
})(require);
if (typeof require === "function") {
  module.exports.load = function load(name) {
    return import(/* webpackChunkName: "page" */ "./pages/" + name);
  };
}
"#;
    unit.repeat(copies)
}

#[derive(Default)]
struct Count(usize);

fn counting_analyzer() -> Analyzer<Count> {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default()).expect("default options");
    analyzer.hooks_mut().can_rename.for_name("require").tap("bench", |_, _| Some(true));
    analyzer.hooks_mut().call.for_name("require").tap("bench", |w, expr| {
        if let Expr::Call(call) = expr
            && let Some(argument) = call.arguments.first()
        {
            let request = w.evaluate_expression(argument);
            black_box(request);
        }
        w.state_mut().0 += 1;
        Some(true)
    });
    analyzer
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn bench_parse(c: &mut Criterion) {
    let source = module_source(50);
    c.bench_function("parse_module_50_units", |b| {
        b.iter(|| parse(black_box(&source), SourceType::Module).expect("parses"));
    });
}

// ---------------------------------------------------------------------------
// Walking
// ---------------------------------------------------------------------------

fn bench_walk(c: &mut Criterion) {
    let source = module_source(50);
    let output = parse(&source, SourceType::Module).expect("parses");
    let analyzer = counting_analyzer();
    c.bench_function("walk_module_50_units", |b| {
        b.iter(|| analyzer.parse_output(black_box(&output), Count::default()).0);
    });
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn bench_evaluate(c: &mut Criterion) {
    let analyzer = Analyzer::<()>::new(AnalyzerOptions::default()).expect("default options");
    c.bench_function("evaluate_constant_arithmetic", |b| {
        b.iter(|| analyzer.evaluate(black_box("(1 + 2) * 3 - 4 / 2 ** 2")));
    });
    c.bench_function("evaluate_wrapped_template", |b| {
        b.iter(|| analyzer.evaluate(black_box("`./locale/${lang}/` + 'messages' + '.json'")));
    });
    c.bench_function("evaluate_string_methods", |b| {
        b.iter(|| analyzer.evaluate(black_box("'a-b-c'.replace(/-/g, '/').split('/').concat('d')")));
    });
}

// ---------------------------------------------------------------------------
// Group & main
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_parse, bench_walk, bench_evaluate);
criterion_main!(benches);
