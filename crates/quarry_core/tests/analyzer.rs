//! End-to-end analyzer tests: hooks registered the way a bundler plugin
//! would, driven through `Analyzer::parse`.

use std::rc::Rc;

use pretty_assertions::assert_eq;
use quarry_core::analyzer::scope::Tag;
use quarry_core::analyzer::{JsValue, SourceTypeOption};
use quarry_core::parser::ast::{Expr, Stmt};
use quarry_core::{Analyzer, AnalyzerOptions, QuarryError, Walker};

/// What a dependency-collecting plugin records.
#[derive(Debug, Default)]
struct Deps {
    requires: Vec<String>,
    events: Vec<String>,
}

fn first_argument(w: &mut Walker<'_, Deps>, expr: &Expr) -> Option<String> {
    let Expr::Call(call) = expr else {
        return None;
    };
    let argument = call.arguments.first()?;
    w.evaluate_expression(argument).as_string()
}

fn collect_requires(analyzer: &mut Analyzer<Deps>) {
    analyzer.hooks_mut().call.for_name("require").tap("deps", |w, expr| {
        let request = first_argument(w, expr)?;
        w.state_mut().requires.push(request);
        Some(true)
    });
}

fn analyzer() -> Analyzer<Deps> {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default()).expect("default options");
    collect_requires(&mut analyzer);
    analyzer
}

fn requires(source: &str) -> Vec<String> {
    analyzer().parse(source, Deps::default()).expect("parses").requires
}

#[test]
fn test_member_chain_call_gated_by_shadowing() {
    let mut a = analyzer();
    a.hooks_mut().call.for_name("cde.ddd.abc").tap("deps", |w, _| {
        w.state_mut().events.push("cde.ddd.abc".into());
        Some(true)
    });
    let state = a
        .parse("cde.ddd.abc(x);\n{ let cde = {}; cde.ddd.abc(x); }", Deps::default())
        .expect("parses");
    assert_eq!(state.events, vec!["cde.ddd.abc"]);
}

#[test]
fn test_block_binding_ends_with_its_block() {
    assert_eq!(
        requires("{ let require = () => {}; require('inner'); }\nrequire('outer');"),
        vec!["outer"]
    );
}

#[test]
fn test_hoisted_declarations_shadow_before_declaration() {
    assert_eq!(
        requires("require('a');\nfunction f() { require('b'); function require() {} }"),
        vec!["a"]
    );
    assert_eq!(
        requires("function g() { require('c'); if (x) { var require; } }\nrequire('d');"),
        vec!["d"]
    );
}

#[test]
fn test_require_requests_are_evaluated() {
    assert_eq!(
        requires("require('./a' + '.js'); require(`./b`); require(cond ? 'x' : 'y');"),
        vec!["./a.js", "./b"]
    );
}

fn renaming_analyzer() -> Analyzer<Deps> {
    let mut a = analyzer();
    a.hooks_mut().can_rename.for_name("require").tap("deps", |_, _| Some(true));
    a
}

#[test]
fn test_iife_parameter_inherits_free_name() {
    let a = renaming_analyzer();
    let parse = |source| a.parse(source, Deps::default()).expect("parses").requires;
    assert_eq!(parse("(function (r, unused) { r('./iife'); })(require);"), vec!["./iife"]);
    assert_eq!(parse("((r) => r('./arrow'))(require);"), vec!["./arrow"]);
    assert!(requires("(function (r) { r('./opaque'); })(require);").is_empty());
}

#[test]
fn test_rename_requires_can_rename() {
    let source = "const r = require;\nr('./renamed');";
    assert!(requires(source).is_empty());

    let state = renaming_analyzer().parse(source, Deps::default()).expect("parses");
    assert_eq!(state.requires, vec!["./renamed"]);
}

#[test]
fn test_taps_run_in_registration_order_until_one_bails() {
    let mut a = Analyzer::<Deps>::new(AnalyzerOptions::default()).expect("options");
    for (name, result) in [("first", None), ("second", Some(true)), ("third", Some(true))] {
        a.hooks_mut().call.for_name("f").tap(name, move |w, _| {
            w.state_mut().events.push(name.to_string());
            result
        });
    }
    let state = a.parse("f(); f();", Deps::default()).expect("parses");
    assert_eq!(state.events, vec!["first", "second", "first", "second"]);
}

#[test]
fn test_script_only_source_is_retried() {
    assert_eq!(requires("with (scope) { require('legacy'); }"), vec!["legacy"]);

    let module_only = Analyzer::<Deps>::new(AnalyzerOptions {
        source_type: SourceTypeOption::Module,
        ..AnalyzerOptions::default()
    })
    .expect("options");
    let err = module_only
        .parse("with (scope) {}", Deps::default())
        .expect_err("with is not allowed in modules");
    assert!(matches!(err, QuarryError::SyntaxError { line: 1, .. }));
}

#[test]
fn test_import_call_comment_options() {
    let mut a = analyzer();
    a.hooks_mut().import_call.tap("deps", |w, expr| {
        let options = w.parse_comment_options(expr.loc());
        let mut keys: Vec<String> = options
            .options
            .iter()
            .map(|(key, value)| format!("{key}={value:?}"))
            .collect();
        keys.extend(options.errors.iter().map(|e| format!("error@{}", e.comment.start.line)));
        w.state_mut().events.extend(keys);
        Some(true)
    });
    let source = r#"
import(/* webpackChunkName: "lazy", webpackPrefetch: true */ './lazy');
import(/* webpackExports: ["a", "b"] */ /* not options */ './named');
import(/* webpackChunkName: chunkName */ './bad');
"#;
    let state = a.parse(source, Deps::default()).expect("parses");
    assert_eq!(
        state.events,
        vec![
            format!("webpackChunkName={:?}", JsValue::String("lazy".into())),
            format!("webpackPrefetch={:?}", JsValue::Boolean(true)),
            format!(
                "webpackExports={:?}",
                JsValue::Array(vec![JsValue::String("a".into()), JsValue::String("b".into())])
            ),
            "error@4".to_string(),
        ]
    );
}

#[test]
fn test_asi_positions_are_reported() {
    let mut a = Analyzer::<Deps>::new(AnalyzerOptions::default()).expect("options");
    a.hooks_mut().statement.tap("asi", |w, stmt| {
        if let Stmt::Expr(_) = stmt {
            let asi = w.is_asi_position(stmt.loc().end.offset);
            w.state_mut().events.push(asi.to_string());
        }
        None
    });
    let state = a
        .parse("a = 1\nb = 2;\nc()", Deps::default())
        .expect("parses");
    assert_eq!(state.events, vec!["true", "false", "true"]);
}

#[test]
fn test_tags_flow_into_hooks() {
    const EXPORTS: Tag = Tag::new("exports alias");
    let mut a = Analyzer::<Deps>::new(AnalyzerOptions::default()).expect("options");
    a.hooks_mut().program.tap("tag", |w, _, _| {
        w.tag_variable("exp", EXPORTS, Rc::new("module.exports".to_string()));
        None
    });
    a.hooks_mut().expression.for_tag(EXPORTS).tap("tag", |w, _| {
        let data = w.current_tag_data::<String>()?;
        w.state_mut().events.push(data.to_string());
        Some(true)
    });
    let state = a.parse("exp; { const exp = 1; exp; }", Deps::default()).expect("parses");
    assert_eq!(state.events, vec!["module.exports"]);
}

#[test]
fn test_destructured_keys_are_visible_to_call_hooks() {
    let mut a = Analyzer::<Deps>::new(AnalyzerOptions::default()).expect("options");
    a.hooks_mut().call.for_name("require").tap("deps", |w, expr| {
        let keys = w
            .destructuring_assignment_properties_for(expr)
            .map(|keys| keys.iter().map(|k| k.id.clone()).collect::<Vec<_>>())
            .unwrap_or_default();
        w.state_mut().events.push(keys.join(","));
        Some(true)
    });
    let state = a
        .parse("const { a, b: renamed } = require('x');\nrequire('y');", Deps::default())
        .expect("parses");
    assert_eq!(state.events, vec!["a,b", ""]);
}

#[test]
fn test_decided_branches_skip_dead_code() {
    let source = "if (true) { require('live'); } else { require('dead'); }\nfalse ? require('t') : require('f');";
    assert_eq!(requires(source), vec!["live", "dead", "t", "f"]);

    let mut a = analyzer();
    a.hooks_mut().statement_if.tap("const", |w, stmt| {
        let Stmt::If(s) = stmt else { return None };
        w.evaluate_expression(&s.test).as_bool()
    });
    a.hooks_mut().expression_conditional_operator.tap("const", |w, expr| {
        let Expr::Conditional(c) = expr else { return None };
        w.evaluate_expression(&c.test).as_bool()
    });
    let state = a.parse(source, Deps::default()).expect("parses");
    assert_eq!(state.requires, vec!["live", "f"]);
}

#[test]
fn test_callee_evaluation_is_shared_with_hooks() {
    let mut a = Analyzer::<Deps>::new(AnalyzerOptions::default()).expect("options");
    a.hooks_mut().evaluate_identifier.for_name("api").tap("count", |w, _| {
        w.state_mut().events.push("evaluated".into());
        None
    });
    a.hooks_mut().call.for_name("api").tap("deps", |w, expr| {
        let Expr::Call(call) = expr else { return None };
        let callee = w.evaluate_expression_cached(&call.callee);
        let name = callee.identifier_value().map(|i| i.name.clone()).unwrap_or_default();
        w.state_mut().events.push(name);
        Some(true)
    });
    let state = a.parse("api(1);\napi(2);", Deps::default()).expect("parses");
    assert_eq!(state.events, vec!["evaluated", "api", "evaluated", "api"]);
}

#[test]
fn test_try_and_finally_blocks_reach_statement_hooks() {
    let mut a = analyzer();
    a.hooks_mut().statement.tap("blocks", |w, stmt| {
        if let Stmt::Block(block) = stmt {
            let line = block.loc.start.line;
            w.state_mut().events.push(format!("block@{line}"));
        }
        None
    });
    let state = a
        .parse("try {\n  require('a');\n} catch (e) {\n} finally {\n  require('b');\n}", Deps::default())
        .expect("parses");
    assert_eq!(state.events, vec!["block@1", "block@4"]);
    assert_eq!(state.requires, vec!["a", "b"]);
}

#[test]
fn test_chained_destructuring_records_every_target() {
    let mut a = Analyzer::<Deps>::new(AnalyzerOptions::default()).expect("options");
    a.hooks_mut().call.for_name("require").tap("deps", |w, expr| {
        let keys = w
            .destructuring_assignment_properties_for(expr)
            .map(|keys| keys.iter().map(|k| k.id.clone()).collect::<Vec<_>>())
            .unwrap_or_default();
        w.state_mut().events.push(keys.join(","));
        Some(true)
    });
    let state = a
        .parse("let b;\nconst { a } = { b } = require('x');", Deps::default())
        .expect("parses");
    assert_eq!(state.events, vec!["b,a"]);
}

#[test]
fn test_evaluate_entry_point() {
    let a = Analyzer::<()>::new(AnalyzerOptions::default()).expect("options");
    assert_eq!(a.evaluate("1 + 3").expect("parses").number_value(), Some(4.0));
    assert!(a.evaluate("1 +").is_err());
}
