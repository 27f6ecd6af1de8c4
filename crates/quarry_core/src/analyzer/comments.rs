//! Comment lookup and magic-comment options.
//!
//! A magic comment carries a small object literal body, e.g.
//! `/* webpackChunkName: "vendor", webpackPrefetch: true */`.  Its values are
//! folded with the analyzer's own evaluator; nothing is executed.

use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::warn;

use crate::analyzer::hooks::AnalyzerHooks;
use crate::analyzer::value::{JsValue, number_to_js_string};
use crate::analyzer::walker::Walker;
use crate::error::{QuarryError, QuarryResult};
use crate::parser::ast::{Expr, ObjectProp, PropKey, PropValue};
use crate::parser::scanner::Span;
use crate::parser::{Comment, parse_expression};

/// Comments lying entirely inside `start..end`.
///
/// `comments` must be sorted by start offset, as the parser reports them.
pub fn comments_in_range(comments: &[Comment], start: usize, end: usize) -> &[Comment] {
    let first = comments.partition_point(|c| c.loc.start.offset < start);
    let rest = &comments[first..];
    let count = rest.iter().take_while(|c| c.loc.end.offset <= end).count();
    &rest[..count]
}

/// The pattern a comment must match to be read as options.
///
/// # Errors
///
/// Returns [`QuarryError::Config`] when `prefix` is empty.
pub fn magic_comment_regex(prefix: &str) -> QuarryResult<Regex> {
    if prefix.is_empty() {
        return Err(QuarryError::Config("magic comment prefix must not be empty".into()));
    }
    Regex::new(&format!(r"(^|\W){}[A-Z][A-Za-z]+:", regex::escape(prefix)))
        .map_err(|err| QuarryError::Config(format!("magic comment prefix {prefix:?}: {err}")))
}

/// A magic comment that could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentOptionsError {
    /// Span of the offending comment.
    pub comment: Span,
    pub message: String,
}

/// Options collected from the magic comments in a range.  Later comments
/// override earlier ones key by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentOptions {
    pub options: Vec<(String, JsValue)>,
    pub errors: Vec<CommentOptionsError>,
}

impl CommentOptions {
    pub fn get(&self, key: &str) -> Option<&JsValue> {
        self.options.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty() && self.errors.is_empty()
    }

    fn insert(&mut self, key: String, value: JsValue) {
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.options.push((key, value)),
        }
    }
}

impl<S> Walker<'_, S> {
    /// Read the magic comments inside `range`.
    ///
    /// A comment contributes either all of its options or a single entry in
    /// [`CommentOptions::errors`].
    pub fn parse_comment_options(&self, range: Span) -> CommentOptions {
        let mut result = CommentOptions::default();
        for comment in self.get_comments(range.start.offset, range.end.offset) {
            if !self.magic_comment().is_match(&comment.text) {
                continue;
            }
            match self.read_comment_options(&comment.text) {
                Ok(options) => {
                    for (key, value) in options {
                        result.insert(key, value);
                    }
                }
                Err(message) => {
                    warn!(line = comment.loc.start.line, %message, "rejected magic comment");
                    result.errors.push(CommentOptionsError {
                        comment: comment.loc,
                        message,
                    });
                }
            }
        }
        result
    }

    /// Evaluate `text` as the body of an object literal in an empty scope.
    fn read_comment_options(&self, text: &str) -> Result<Vec<(String, JsValue)>, String> {
        let (expr, _) = parse_expression(&format!("{{{text}}}")).map_err(|err| err.to_string())?;
        let Expr::Object(object) = &expr else {
            return Err("expected a list of `key: value` pairs".into());
        };
        let hooks = AnalyzerHooks::<()>::new();
        let mut sandbox = Walker::new(
            &hooks,
            self.options(),
            self.magic_comment(),
            (),
            &[],
            FxHashSet::default(),
            false,
        );
        let mut options = Vec::with_capacity(object.properties.len());
        for property in &object.properties {
            let ObjectProp::Prop(prop) = property else {
                return Err("spread is not allowed in magic comments".into());
            };
            let key = match &prop.key {
                PropKey::Ident(ident) => ident.name.clone(),
                PropKey::Str(s) => s.value.clone(),
                PropKey::Num(n) => number_to_js_string(n.value),
                _ => return Err("computed keys are not allowed in magic comments".into()),
            };
            let value = match &prop.value {
                PropValue::Value(value) => value.as_ref(),
                _ => return Err(format!("`{key}` must be a plain `key: value` pair")),
            };
            let evaluated = sandbox.evaluate_expression(value);
            let value = match evaluated.items_value() {
                Some(items) => items
                    .iter()
                    .map(|item| item.as_compile_time_value())
                    .collect::<Option<Vec<_>>>()
                    .map(JsValue::Array),
                None => evaluated.as_compile_time_value(),
            }
            .ok_or_else(|| format!("`{key}` is not a constant value"))?;
            options.push((key, value));
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::CommentKind;
    use crate::parser::scanner::Position;

    fn comment(start: usize, end: usize) -> Comment {
        let at = |offset| Position {
            offset,
            line: 1,
            column: offset as u32,
        };
        Comment {
            kind: CommentKind::Block,
            text: String::new(),
            loc: Span::new(at(start), at(end)),
        }
    }

    #[test]
    fn test_comments_in_range_requires_full_containment() {
        let comments = [comment(0, 5), comment(6, 10), comment(12, 20), comment(22, 30)];
        let found: Vec<_> = comments_in_range(&comments, 6, 20)
            .iter()
            .map(|c| c.loc.range())
            .collect();
        assert_eq!(found, vec![6..10, 12..20]);
        assert!(comments_in_range(&comments, 7, 19).is_empty());
        assert_eq!(comments_in_range(&comments, 0, 100).len(), 4);
    }

    #[test]
    fn test_magic_comment_regex() {
        let regex = magic_comment_regex("webpack").expect("valid prefix");
        assert!(regex.is_match(r#" webpackChunkName: "a" "#));
        assert!(regex.is_match("webpackIgnore: true"));
        assert!(!regex.is_match("xwebpackIgnore: true"));
        assert!(!regex.is_match("webpackignore: true"));
        assert!(!regex.is_match("webpackA: 1"));
        assert!(magic_comment_regex("").is_err());
        assert!(magic_comment_regex("a.b").expect("escaped").is_match("a.bMode: 1"));
    }

    #[test]
    fn test_comment_options_override_in_order() {
        let mut options = CommentOptions::default();
        options.insert("a".into(), JsValue::Number(1.0));
        options.insert("b".into(), JsValue::Null);
        options.insert("a".into(), JsValue::Number(2.0));
        assert_eq!(options.get("a"), Some(&JsValue::Number(2.0)));
        assert_eq!(options.options.len(), 2);
        assert!(!options.is_empty());
    }
}
