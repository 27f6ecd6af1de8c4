//! The dependency-collecting plugin `qry` runs over a module.

use quarry_core::analyzer::hooks::AnalyzerHooks;
use quarry_core::analyzer::{EvaluatedKind, JsValue, Walker};
use quarry_core::parser::ast::{Expr, SourceType};
use quarry_core::parser::scanner::Span;
use quarry_core::EvaluatedExpression;
use serde::Serialize;
use serde_json::{Map, Value};

const PLUGIN: &str = "qry";

/// A position in the analyzed file, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl From<Span> for Location {
    fn from(span: Span) -> Self {
        Self {
            line: span.start.line,
            column: span.start.column,
        }
    }
}

/// How much of a request is known statically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Request {
    /// Fully known, e.g. `require("./a")`.
    Static { request: String },
    /// Known prefix and suffix, e.g. `require("./locale/" + lang + ".json")`.
    Context { prefix: String, suffix: String },
    /// Nothing is known.
    Unknown,
}

impl Request {
    fn from_evaluated(evaluated: &EvaluatedExpression) -> Self {
        if let Some(request) = evaluated.as_string() {
            return Request::Static { request };
        }
        let edge = |e: &Option<EvaluatedExpression>| {
            e.as_ref().and_then(EvaluatedExpression::as_string).unwrap_or_default()
        };
        match evaluated.kind() {
            EvaluatedKind::Wrapped(w) => Request::Context {
                prefix: edge(&w.prefix),
                suffix: edge(&w.postfix),
            },
            EvaluatedKind::TemplateString(t) => {
                let text = |part: Option<&EvaluatedExpression>| {
                    part.and_then(EvaluatedExpression::as_string).unwrap_or_default()
                };
                Request::Context {
                    prefix: text(t.parts.first()),
                    suffix: if t.parts.len() > 1 { text(t.parts.last()) } else { String::new() },
                }
            }
            _ => Request::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Require {
    #[serde(flatten)]
    pub request: Request,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Specifier {
    /// `None` for namespace imports and `export *`.
    pub imported: Option<String>,
    pub local: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleRequest {
    pub source: String,
    pub specifiers: Vec<Specifier>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamicImport {
    #[serde(flatten)]
    pub request: Request,
    /// Options from magic comments inside the call.
    pub options: Map<String, Value>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub message: String,
    pub loc: Location,
}

/// Everything found in one module.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub source_type: Option<&'static str>,
    pub requires: Vec<Require>,
    pub imports: Vec<ModuleRequest>,
    pub reexports: Vec<ModuleRequest>,
    pub dynamic_imports: Vec<DynamicImport>,
    pub typeof_require: Vec<Location>,
    pub warnings: Vec<Warning>,
}

/// JSON form of a magic-comment value.
pub fn to_json(value: &JsValue) -> Value {
    match value {
        JsValue::Undefined | JsValue::Null => Value::Null,
        JsValue::Boolean(b) => Value::Bool(*b),
        JsValue::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        JsValue::String(s) => Value::String(s.clone()),
        JsValue::BigInt(n) => Value::String(n.to_string()),
        JsValue::RegExp { pattern, flags } => Value::String(format!("/{pattern}/{flags}")),
        JsValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
    }
}

fn first_argument_request(w: &mut Walker<'_, Report>, expr: &Expr) -> Option<Request> {
    let Expr::Call(call) = expr else {
        return None;
    };
    let argument = call.arguments.first()?;
    if matches!(argument, Expr::Spread(_)) {
        return None;
    }
    let evaluated = w.evaluate_expression(argument);
    Some(Request::from_evaluated(&evaluated))
}

/// Register the collecting handlers on `hooks`.
pub fn register(hooks: &mut AnalyzerHooks<Report>) {
    hooks.program.tap(PLUGIN, |w, program, _| {
        w.state_mut().source_type = Some(match program.source_type {
            SourceType::Module => "module",
            SourceType::Script => "script",
        });
        None
    });

    hooks.can_rename.for_name("require").tap(PLUGIN, |_, _| Some(true));
    hooks.call.for_name("require").tap(PLUGIN, |w, expr| {
        let request = first_argument_request(w, expr)?;
        w.state_mut().requires.push(Require {
            request,
            loc: expr.loc().into(),
        });
        Some(true)
    });
    hooks.type_of.for_name("require").tap(PLUGIN, |w, expr| {
        w.state_mut().typeof_require.push(expr.loc().into());
        Some(true)
    });

    hooks.import.tap(PLUGIN, |w, stmt, source| {
        w.state_mut().imports.push(ModuleRequest {
            source: source.to_string(),
            specifiers: Vec::new(),
            loc: stmt.loc().into(),
        });
        None
    });
    hooks.import_specifier.tap(PLUGIN, |w, _, binding| {
        let specifier = Specifier {
            imported: binding.imported.map(str::to_string),
            local: Some(binding.local.name.clone()),
        };
        if let Some(import) = w.state_mut().imports.last_mut() {
            import.specifiers.push(specifier);
        }
        None
    });
    hooks.export_import.tap(PLUGIN, |w, stmt, source| {
        w.state_mut().reexports.push(ModuleRequest {
            source: source.to_string(),
            specifiers: Vec::new(),
            loc: stmt.loc().into(),
        });
        None
    });
    hooks.export_import_specifier.tap(PLUGIN, |w, _, binding| {
        let specifier = Specifier {
            imported: binding.local.map(str::to_string),
            local: binding.exported.map(str::to_string),
        };
        if let Some(reexport) = w.state_mut().reexports.last_mut() {
            reexport.specifiers.push(specifier);
        }
        None
    });

    hooks.import_call.tap(PLUGIN, |w, expr| {
        let Expr::Import(import) = expr else {
            return None;
        };
        let evaluated = w.evaluate_expression(&import.source);
        let comment_options = w.parse_comment_options(expr.loc());
        let options = comment_options
            .options
            .iter()
            .map(|(key, value)| (key.clone(), to_json(value)))
            .collect();
        let report = w.state_mut();
        report.warnings.extend(comment_options.errors.into_iter().map(|error| Warning {
            message: format!("invalid magic comment: {}", error.message),
            loc: error.comment.into(),
        }));
        report.dynamic_imports.push(DynamicImport {
            request: Request::from_evaluated(&evaluated),
            options,
            loc: expr.loc().into(),
        });
        None
    });
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quarry_core::{Analyzer, AnalyzerOptions};
    use serde_json::json;

    use super::*;

    fn collect(source: &str) -> Report {
        let mut analyzer = Analyzer::new(AnalyzerOptions::default()).expect("options");
        register(analyzer.hooks_mut());
        analyzer.parse(source, Report::default()).expect("parses")
    }

    #[test]
    fn test_collects_commonjs_requests() {
        let report = collect(
            "const a = require('./a');\nconst r = require;\nr('./b' + '.js');\nrequire('./i18n/' + lang + '.json');\nif (typeof require === 'function') {}",
        );
        assert_eq!(report.source_type, Some("module"));
        let requests: Vec<_> = report.requires.iter().map(|r| r.request.clone()).collect();
        assert_eq!(
            requests,
            vec![
                Request::Static { request: "./a".into() },
                Request::Static { request: "./b.js".into() },
                Request::Context {
                    prefix: "./i18n/".into(),
                    suffix: ".json".into()
                },
            ]
        );
        assert_eq!(report.typeof_require, vec![Location { line: 5, column: 5 }]);
    }

    #[test]
    fn test_collects_module_syntax() {
        let report = collect(
            "import d, { x as y } from './m';\nexport { z } from './n';\nimport(/* webpackChunkName: \"c\" */ './lazy');",
        );
        assert_eq!(report.imports.len(), 1);
        assert_eq!(report.imports[0].source, "./m");
        assert_eq!(report.imports[0].specifiers.len(), 2);
        assert_eq!(report.reexports[0].source, "./n");
        assert_eq!(
            report.reexports[0].specifiers,
            vec![Specifier {
                imported: Some("z".into()),
                local: Some("z".into())
            }]
        );
        let dynamic = &report.dynamic_imports[0];
        assert_eq!(dynamic.request, Request::Static { request: "./lazy".into() });
        assert_eq!(Value::Object(dynamic.options.clone()), json!({ "webpackChunkName": "c" }));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_namespace_reexport_names_the_namespace() {
        let report = collect("export * as ns from './m';\nexport * from './n';");
        assert_eq!(
            report.reexports[0].specifiers,
            vec![Specifier {
                imported: None,
                local: Some("ns".into())
            }]
        );
        assert_eq!(
            report.reexports[1].specifiers,
            vec![Specifier {
                imported: None,
                local: None
            }]
        );
    }

    #[test]
    fn test_bad_magic_comment_becomes_warning() {
        let report = collect("import(/* webpackMode: lazy */ './x');");
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].loc, Location { line: 1, column: 8 });
        assert!(report.dynamic_imports[0].options.is_empty());
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(to_json(&JsValue::Number(1.5)), json!(1.5));
        assert_eq!(to_json(&JsValue::Number(f64::NAN)), Value::Null);
        assert_eq!(
            to_json(&JsValue::Array(vec![JsValue::Boolean(true), JsValue::String("a".into())])),
            json!([true, "a"])
        );
    }
}
