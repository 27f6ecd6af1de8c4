//! The analyzer: scopes, partial evaluation and the hook-driven walker.
//!
//! - [`scope`]: variable bindings, tags and the scope chain.
//! - [`evaluated`] / [`value`]: what evaluation knows about an expression.
//! - [`member_chain`]: `a.b.c` and `a.b().c` chain resolution.
//! - [`hooks`]: the interception points plugins tap.
//! - [`walker`]: the three-phase traversal; evaluation lives in `evaluate`.
//! - [`comments`]: comment lookup and magic-comment options.
//! - [`options`]: [`AnalyzerOptions`].

pub mod comments;
mod evaluate;
pub mod evaluated;
pub mod hooks;
pub mod member_chain;
pub mod options;
pub mod scope;
mod stacked_map;
pub mod value;
pub mod walker;

use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::debug;

pub use comments::{CommentOptions, CommentOptionsError};
pub use evaluated::{EvaluatedExpression, EvaluatedKind, IdentifierValue, TemplateStringKind};
pub use hooks::AnalyzerHooks;
pub use member_chain::MemberAccess;
pub use options::{AnalyzerOptions, SourceTypeOption};
pub use scope::{Binding, Tag};
pub use value::JsValue;
pub use walker::{DestructuringKey, Dispatch, Walker};

use crate::error::QuarryResult;
use crate::parser::ast::SourceType;
use crate::parser::{ParseOutput, parse, parse_expression};

/// A configured analyzer.  Register handlers on [`hooks_mut`], then call
/// [`parse`] once per module; each call walks with a fresh scope and hands
/// back the caller's state.
///
/// [`hooks_mut`]: Analyzer::hooks_mut
/// [`parse`]: Analyzer::parse
pub struct Analyzer<S> {
    hooks: AnalyzerHooks<S>,
    options: AnalyzerOptions,
    magic_comment: Regex,
}

impl<S> Analyzer<S> {
    /// # Errors
    ///
    /// Returns [`QuarryError::Config`](crate::QuarryError::Config) when
    /// `options` do not validate.
    pub fn new(options: AnalyzerOptions) -> QuarryResult<Self> {
        options.validate()?;
        let magic_comment = comments::magic_comment_regex(&options.magic_comment_prefix)?;
        Ok(Self {
            hooks: AnalyzerHooks::new(),
            options,
            magic_comment,
        })
    }

    pub fn hooks(&self) -> &AnalyzerHooks<S> {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut AnalyzerHooks<S> {
        &mut self.hooks
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Parse `source` and walk it.
    ///
    /// With [`SourceTypeOption::Auto`] a source the module grammar rejects
    /// is retried once as a script; if that fails too, the module error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::SyntaxError`](crate::QuarryError::SyntaxError)
    /// when no grammar accepts the source.
    pub fn parse(&self, source: &str, state: S) -> QuarryResult<S> {
        let output = self.parse_source(source)?;
        Ok(self.parse_output(&output, state))
    }

    /// Walk an already parsed program.
    pub fn parse_output(&self, output: &ParseOutput, state: S) -> S {
        let comments: &[_] = if self.options.collect_comments {
            &output.comments
        } else {
            &[]
        };
        let mut walker = Walker::new(
            &self.hooks,
            &self.options,
            &self.magic_comment,
            state,
            comments,
            output.semicolons.clone(),
            output.program.source_type == SourceType::Module,
        );
        walker.run(&output.program);
        walker.into_state()
    }

    fn parse_source(&self, source: &str) -> QuarryResult<ParseOutput> {
        let mut first_error = None;
        for &source_type in self.options.source_type.attempts() {
            match parse(source, source_type) {
                Ok(output) => return Ok(output),
                Err(err) => {
                    debug!(?source_type, error = %err, "parse failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| {
            crate::error::QuarryError::Internal("no source type to parse with".into())
        }))
    }

    /// Run `f` against a walker over an empty sloppy-mode scope.
    pub fn with_walker<R>(&self, state: S, f: impl FnOnce(&mut Walker<'_, S>) -> R) -> R {
        let mut walker = Walker::new(
            &self.hooks,
            &self.options,
            &self.magic_comment,
            state,
            &[],
            FxHashSet::default(),
            false,
        );
        f(&mut walker)
    }
}

impl<S: Default> Analyzer<S> {
    /// Parse `source` as a single expression and evaluate it in an empty
    /// scope.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::SyntaxError`](crate::QuarryError::SyntaxError)
    /// when `source` is not exactly one expression.
    pub fn evaluate(&self, source: &str) -> QuarryResult<EvaluatedExpression> {
        let (expr, _) = parse_expression(source)?;
        Ok(self.with_walker(S::default(), |walker| walker.evaluate_expression(&expr)))
    }
}

impl<S> std::fmt::Debug for Analyzer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("options", &self.options)
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuarryError;

    #[derive(Debug, Default)]
    struct Calls(Vec<String>);

    fn analyzer(source_type: SourceTypeOption) -> Analyzer<Calls> {
        let mut analyzer = Analyzer::<Calls>::new(AnalyzerOptions {
            source_type,
            ..AnalyzerOptions::default()
        })
        .expect("options");
        analyzer.hooks_mut().call.for_name("require").tap("test", |w, _| {
            let strict = w.scope().is_strict;
            w.state_mut().0.push(format!("require strict={strict}"));
            Some(true)
        });
        analyzer
    }

    #[test]
    fn test_auto_retries_as_script() {
        let a = analyzer(SourceTypeOption::Auto);
        let state = a
            .parse("with (obj) { require('a'); }", Calls::default())
            .expect("script fallback");
        assert_eq!(state.0, vec!["require strict=false"]);
    }

    #[test]
    fn test_modules_are_strict() {
        let a = analyzer(SourceTypeOption::Auto);
        let state = a.parse("require('a'); export {};", Calls::default()).expect("module");
        assert_eq!(state.0, vec!["require strict=true"]);
    }

    #[test]
    fn test_fixed_source_type_does_not_retry() {
        let a = analyzer(SourceTypeOption::Module);
        assert!(matches!(
            a.parse("with (obj) {}", Calls::default()),
            Err(QuarryError::SyntaxError { .. })
        ));
        let a = analyzer(SourceTypeOption::Script);
        assert!(a.parse("import x from 'y';", Calls::default()).is_err());
    }

    #[test]
    fn test_module_error_is_reported_when_both_fail() {
        let a = analyzer(SourceTypeOption::Auto);
        let module_error = parse("let = ;", SourceType::Module).expect_err("invalid");
        let error = a.parse("let = ;", Calls::default()).expect_err("invalid");
        assert_eq!(error, module_error);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = AnalyzerOptions {
            magic_comment_prefix: String::new(),
            ..AnalyzerOptions::default()
        };
        assert!(matches!(Analyzer::<()>::new(options), Err(QuarryError::Config(_))));
    }

    #[test]
    fn test_collect_comments_off_hides_comments() {
        let mut a = Analyzer::<Calls>::new(AnalyzerOptions {
            collect_comments: false,
            ..AnalyzerOptions::default()
        })
        .expect("options");
        a.hooks_mut().program.tap("test", |w, _, comments| {
            w.state_mut().0.push(comments.len().to_string());
            None
        });
        let state = a.parse("/* a */ x; // b", Calls::default()).expect("parses");
        assert_eq!(state.0, vec!["0"]);
    }
}
