//! The result of partially evaluating an expression.
//!
//! An [`EvaluatedExpression`] records what the evaluator could learn about an
//! expression without running it: a concrete value, a set of possible values,
//! a string with unknown middle parts, a free identifier reference, or
//! nothing at all.  Independently of the value it carries truthiness,
//! nullishness and side-effect flags.

use num_bigint::BigInt;
use num_traits::Zero;

use crate::analyzer::member_chain::MemberAccess;
use crate::analyzer::scope::Binding;
use crate::analyzer::value::{JsValue, number_to_js_string};
use crate::parser::ast::NodeKey;
use crate::parser::scanner::Span;

/// Which template value a [`TemplateValue`] was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateStringKind {
    Cooked,
    /// Raw text, as seen by `String.raw`.
    Raw,
}

/// A reference to a free variable or a member chain rooted in one.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierValue {
    /// Dotted name, e.g. `module.exports`.
    pub name: String,
    /// Binding of the chain's root name.
    pub root_info: Binding,
    /// Members after the root, in source order.
    pub access: MemberAccess,
}

/// A string known only at its edges: `prefix + inner… + postfix`.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedValue {
    pub prefix: Option<EvaluatedExpression>,
    pub postfix: Option<EvaluatedExpression>,
    pub inner: Vec<EvaluatedExpression>,
}

/// A template literal whose constant parts have been merged.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateValue {
    pub kind: TemplateStringKind,
    /// The literal text segments.
    pub quasis: Vec<EvaluatedExpression>,
    /// Segments and unresolved substitutions interleaved.
    pub parts: Vec<EvaluatedExpression>,
}

/// What is known about the value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EvaluatedKind {
    #[default]
    Unknown,
    Undefined,
    Null,
    String(String),
    Number(f64),
    BigInt(BigInt),
    Boolean(bool),
    RegExp {
        pattern: String,
        flags: String,
    },
    /// One of several possible values.
    Conditional(Vec<EvaluatedExpression>),
    /// An array literal of evaluated items.
    Array(Vec<EvaluatedExpression>),
    /// An array of strings known in full, e.g. from `"a,b".split(",")`.
    ConstArray(Vec<String>),
    Identifier(Box<IdentifierValue>),
    Wrapped(Box<WrappedValue>),
    TemplateString(Box<TemplateValue>),
}

/// Outcome of evaluating one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedExpression {
    kind: EvaluatedKind,
    range: Option<Span>,
    truthy: bool,
    falsy: bool,
    nullish: Option<bool>,
    side_effects: bool,
    expression: Option<NodeKey>,
}

impl Default for EvaluatedExpression {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Whether `flags` is a valid, duplicate-free regular-expression flag set.
pub fn is_valid_regexp_flags(flags: &str) -> bool {
    let mut seen = [false; 128];
    for c in flags.chars() {
        if !"dgimsuvy".contains(c) || seen[c as usize] {
            return false;
        }
        seen[c as usize] = true;
    }
    !(seen['u' as usize] && seen['v' as usize])
}

// ─────────────────────────────────────────────────────────────────────────────
// Construction
// ─────────────────────────────────────────────────────────────────────────────

impl EvaluatedExpression {
    /// Nothing is known; side effects are assumed.
    pub fn unknown() -> Self {
        Self {
            kind: EvaluatedKind::Unknown,
            range: None,
            truthy: false,
            falsy: false,
            nullish: None,
            side_effects: true,
            expression: None,
        }
    }

    fn literal(kind: EvaluatedKind) -> Self {
        Self {
            kind,
            side_effects: false,
            ..Self::unknown()
        }
    }

    pub fn undefined() -> Self {
        Self::literal(EvaluatedKind::Undefined)
    }

    pub fn null() -> Self {
        Self::literal(EvaluatedKind::Null)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::literal(EvaluatedKind::String(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Self::literal(EvaluatedKind::Number(value))
    }

    pub fn bigint(value: impl Into<BigInt>) -> Self {
        Self::literal(EvaluatedKind::BigInt(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Self::literal(EvaluatedKind::Boolean(value))
    }

    pub fn regexp(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self::literal(EvaluatedKind::RegExp {
            pattern: pattern.into(),
            flags: flags.into(),
        })
    }

    /// A fully known array of strings.
    pub fn const_array(items: Vec<String>) -> Self {
        Self::literal(EvaluatedKind::ConstArray(items))
    }

    /// A compile-time value; arrays must hold only strings.
    pub fn from_value(value: &JsValue) -> Option<Self> {
        Some(match value {
            JsValue::Undefined => Self::undefined(),
            JsValue::Null => Self::null(),
            JsValue::Boolean(b) => Self::boolean(*b),
            JsValue::Number(n) => Self::number(*n),
            JsValue::String(s) => Self::string(s.clone()),
            JsValue::BigInt(n) => Self::bigint(n.clone()),
            JsValue::RegExp { pattern, flags } => Self::regexp(pattern.clone(), flags.clone()),
            JsValue::Array(items) => Self::const_array(
                items
                    .iter()
                    .map(|item| match item {
                        JsValue::String(s) => Some(s.clone()),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()?,
            ),
        })
    }

    /// A free identifier or member chain.
    pub fn identifier(value: IdentifierValue) -> Self {
        Self {
            kind: EvaluatedKind::Identifier(Box::new(value)),
            ..Self::unknown()
        }
    }

    /// A partially known string.
    pub fn wrapped(
        prefix: Option<EvaluatedExpression>,
        postfix: Option<EvaluatedExpression>,
        inner: Vec<EvaluatedExpression>,
    ) -> Self {
        Self {
            kind: EvaluatedKind::Wrapped(Box::new(WrappedValue {
                prefix,
                postfix,
                inner,
            })),
            ..Self::unknown()
        }
    }

    /// One of `options`.
    pub fn options(options: Vec<EvaluatedExpression>) -> Self {
        Self {
            kind: EvaluatedKind::Conditional(options),
            ..Self::unknown()
        }
    }

    /// An array literal; it has side effects if any item does.
    pub fn items(items: Vec<EvaluatedExpression>) -> Self {
        let side_effects = items.iter().any(|i| i.side_effects);
        Self {
            kind: EvaluatedKind::Array(items),
            side_effects,
            ..Self::unknown()
        }
    }

    pub fn template_string(
        quasis: Vec<EvaluatedExpression>,
        parts: Vec<EvaluatedExpression>,
        kind: TemplateStringKind,
    ) -> Self {
        let side_effects = parts.iter().any(|p| p.side_effects);
        Self {
            kind: EvaluatedKind::TemplateString(Box::new(TemplateValue { kind, quasis, parts })),
            side_effects,
            ..Self::unknown()
        }
    }

    /// Append `more` to the possible values, turning `self` into a
    /// conditional first if necessary.
    pub fn add_options(mut self, more: Vec<EvaluatedExpression>) -> Self {
        match &mut self.kind {
            EvaluatedKind::Conditional(options) => options.extend(more),
            _ => {
                self.kind = EvaluatedKind::Conditional(more);
                self.side_effects = true;
            }
        }
        self
    }

    pub fn with_range(mut self, range: Span) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_side_effects(mut self, side_effects: bool) -> Self {
        self.side_effects = side_effects;
        self
    }

    pub fn with_expression(mut self, expression: Option<NodeKey>) -> Self {
        self.expression = expression;
        self
    }

    /// Mark as always truthy, which also rules out nullish.
    pub fn into_truthy(mut self) -> Self {
        self.truthy = true;
        self.falsy = false;
        self.nullish = Some(false);
        self
    }

    /// Mark as always falsy.
    pub fn into_falsy(mut self) -> Self {
        self.falsy = true;
        self.truthy = false;
        self
    }

    /// Record nullishness; a nullish value is also falsy.
    pub fn with_nullish(mut self, nullish: bool) -> Self {
        self.nullish = Some(nullish);
        if nullish { self.into_falsy() } else { self }
    }

    pub fn set_range(&mut self, range: Span) {
        self.range = Some(range);
    }

    pub fn set_side_effects(&mut self) {
        self.side_effects = true;
    }

    pub fn set_expression(&mut self, expression: Option<NodeKey>) {
        self.expression = expression;
    }

    pub(crate) fn set_string(&mut self, value: String) {
        self.kind = EvaluatedKind::String(value);
        self.side_effects = false;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Queries
// ─────────────────────────────────────────────────────────────────────────────

impl EvaluatedExpression {
    pub fn kind(&self) -> &EvaluatedKind {
        &self.kind
    }

    pub fn into_kind(self) -> EvaluatedKind {
        self.kind
    }

    pub fn range(&self) -> Option<Span> {
        self.range
    }

    /// The expression this result was computed from, if it maps to exactly
    /// one node.
    pub fn expression(&self) -> Option<NodeKey> {
        self.expression
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.kind, EvaluatedKind::Unknown)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.kind, EvaluatedKind::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, EvaluatedKind::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, EvaluatedKind::String(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self.kind, EvaluatedKind::Number(_))
    }

    pub fn is_bigint(&self) -> bool {
        matches!(self.kind, EvaluatedKind::BigInt(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.kind, EvaluatedKind::Boolean(_))
    }

    pub fn is_regexp(&self) -> bool {
        matches!(self.kind, EvaluatedKind::RegExp { .. })
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self.kind, EvaluatedKind::Conditional(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, EvaluatedKind::Array(_))
    }

    pub fn is_const_array(&self) -> bool {
        matches!(self.kind, EvaluatedKind::ConstArray(_))
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, EvaluatedKind::Identifier(_))
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self.kind, EvaluatedKind::Wrapped(_))
    }

    pub fn is_template_string(&self) -> bool {
        matches!(self.kind, EvaluatedKind::TemplateString(_))
    }

    pub fn string_value(&self) -> Option<&str> {
        match &self.kind {
            EvaluatedKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn number_value(&self) -> Option<f64> {
        match self.kind {
            EvaluatedKind::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn bool_value(&self) -> Option<bool> {
        match self.kind {
            EvaluatedKind::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn identifier_value(&self) -> Option<&IdentifierValue> {
        match &self.kind {
            EvaluatedKind::Identifier(id) => Some(id),
            _ => None,
        }
    }

    pub fn wrapped_value(&self) -> Option<&WrappedValue> {
        match &self.kind {
            EvaluatedKind::Wrapped(w) => Some(w),
            _ => None,
        }
    }

    pub fn template_value(&self) -> Option<&TemplateValue> {
        match &self.kind {
            EvaluatedKind::TemplateString(t) => Some(t),
            _ => None,
        }
    }

    /// The possible values of a conditional.
    pub fn options_value(&self) -> Option<&[EvaluatedExpression]> {
        match &self.kind {
            EvaluatedKind::Conditional(options) => Some(options),
            _ => None,
        }
    }

    pub fn items_value(&self) -> Option<&[EvaluatedExpression]> {
        match &self.kind {
            EvaluatedKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        self.truthy
    }

    pub fn is_falsy(&self) -> bool {
        self.falsy
    }

    pub fn is_nullish(&self) -> Option<bool> {
        self.nullish
    }

    pub fn could_have_side_effects(&self) -> bool {
        self.side_effects
    }

    /// Whether the value is one [`as_compile_time_value`] can produce.
    ///
    /// [`as_compile_time_value`]: Self::as_compile_time_value
    pub fn is_compile_time_value(&self) -> bool {
        matches!(
            self.kind,
            EvaluatedKind::Undefined
                | EvaluatedKind::Null
                | EvaluatedKind::String(_)
                | EvaluatedKind::Number(_)
                | EvaluatedKind::BigInt(_)
                | EvaluatedKind::Boolean(_)
                | EvaluatedKind::RegExp { .. }
                | EvaluatedKind::ConstArray(_)
        )
    }

    /// The concrete value, for compile-time kinds.
    pub fn as_compile_time_value(&self) -> Option<JsValue> {
        Some(match &self.kind {
            EvaluatedKind::Undefined => JsValue::Undefined,
            EvaluatedKind::Null => JsValue::Null,
            EvaluatedKind::String(s) => JsValue::String(s.clone()),
            EvaluatedKind::Number(n) => JsValue::Number(*n),
            EvaluatedKind::BigInt(n) => JsValue::BigInt(n.clone()),
            EvaluatedKind::Boolean(b) => JsValue::Boolean(*b),
            EvaluatedKind::RegExp { pattern, flags } => JsValue::RegExp {
                pattern: pattern.clone(),
                flags: flags.clone(),
            },
            EvaluatedKind::ConstArray(items) => {
                JsValue::Array(items.iter().cloned().map(JsValue::String).collect())
            }
            _ => return None,
        })
    }

    /// `Some(true)` for primitives, `Some(false)` for objects, `None` when
    /// unknown.
    pub fn is_primitive_type(&self) -> Option<bool> {
        match self.kind {
            EvaluatedKind::Undefined
            | EvaluatedKind::Null
            | EvaluatedKind::String(_)
            | EvaluatedKind::Number(_)
            | EvaluatedKind::BigInt(_)
            | EvaluatedKind::Boolean(_) => Some(true),
            EvaluatedKind::RegExp { .. } | EvaluatedKind::Array(_) | EvaluatedKind::ConstArray(_) => {
                Some(false)
            }
            _ => None,
        }
    }

    /// Truthiness, if it can be decided.
    pub fn as_bool(&self) -> Option<bool> {
        if self.truthy {
            return Some(true);
        }
        if self.falsy || self.nullish == Some(true) {
            return Some(false);
        }
        match &self.kind {
            EvaluatedKind::Boolean(b) => Some(*b),
            EvaluatedKind::Null | EvaluatedKind::Undefined => Some(false),
            EvaluatedKind::String(s) => Some(!s.is_empty()),
            EvaluatedKind::Number(n) => Some(*n != 0.0 && !n.is_nan()),
            EvaluatedKind::BigInt(n) => Some(!n.is_zero()),
            EvaluatedKind::RegExp { .. } | EvaluatedKind::Array(_) | EvaluatedKind::ConstArray(_) => {
                Some(true)
            }
            EvaluatedKind::Wrapped(w) => {
                let edge_truthy = |edge: &Option<EvaluatedExpression>| {
                    edge.as_ref().and_then(|e| e.as_bool()) == Some(true)
                };
                (edge_truthy(&w.prefix) || edge_truthy(&w.postfix)).then_some(true)
            }
            EvaluatedKind::TemplateString(_) => self.as_string().map(|s| !s.is_empty()),
            _ => None,
        }
    }

    /// Nullishness, if it can be decided.
    pub fn as_nullish(&self) -> Option<bool> {
        if self.nullish == Some(true) || self.is_null() || self.is_undefined() {
            return Some(true);
        }
        if self.nullish == Some(false) || self.truthy {
            return Some(false);
        }
        match self.kind {
            EvaluatedKind::Boolean(_)
            | EvaluatedKind::String(_)
            | EvaluatedKind::Number(_)
            | EvaluatedKind::BigInt(_)
            | EvaluatedKind::RegExp { .. }
            | EvaluatedKind::Array(_)
            | EvaluatedKind::ConstArray(_)
            | EvaluatedKind::TemplateString(_) => Some(false),
            _ => None,
        }
    }

    /// String conversion, if every part is known.
    pub fn as_string(&self) -> Option<String> {
        match &self.kind {
            EvaluatedKind::Boolean(b) => Some(b.to_string()),
            EvaluatedKind::Null => Some("null".into()),
            EvaluatedKind::Undefined => Some("undefined".into()),
            EvaluatedKind::String(s) => Some(s.clone()),
            EvaluatedKind::Number(n) => Some(number_to_js_string(*n)),
            EvaluatedKind::BigInt(n) => Some(n.to_string()),
            EvaluatedKind::RegExp { pattern, flags } => Some(format!("/{pattern}/{flags}")),
            EvaluatedKind::Array(items) => {
                let parts = items.iter().map(|i| i.as_string()).collect::<Option<Vec<_>>>()?;
                Some(parts.join(","))
            }
            EvaluatedKind::ConstArray(items) => Some(items.join(",")),
            EvaluatedKind::TemplateString(t) => t.parts.iter().map(|p| p.as_string()).collect(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_defaults() {
        let e = EvaluatedExpression::unknown();
        assert!(e.is_unknown());
        assert!(e.could_have_side_effects());
        assert_eq!(e.as_bool(), None);
        assert_eq!(e.as_nullish(), None);
        assert_eq!(e.as_string(), None);
    }

    #[test]
    fn test_literals_have_no_side_effects() {
        for e in [
            EvaluatedExpression::string("a"),
            EvaluatedExpression::number(1.0),
            EvaluatedExpression::null(),
            EvaluatedExpression::regexp("a", "g"),
        ] {
            assert!(!e.could_have_side_effects());
            assert!(e.is_compile_time_value());
        }
    }

    #[test]
    fn test_as_bool() {
        assert_eq!(EvaluatedExpression::string("").as_bool(), Some(false));
        assert_eq!(EvaluatedExpression::number(f64::NAN).as_bool(), Some(false));
        assert_eq!(EvaluatedExpression::bigint(3).as_bool(), Some(true));
        assert_eq!(EvaluatedExpression::items(vec![]).as_bool(), Some(true));
        assert_eq!(EvaluatedExpression::unknown().into_truthy().as_bool(), Some(true));
        assert_eq!(
            EvaluatedExpression::unknown().with_nullish(true).as_bool(),
            Some(false)
        );
    }

    #[test]
    fn test_wrapped_truthy_only_through_edges() {
        let w = EvaluatedExpression::wrapped(
            Some(EvaluatedExpression::string("./")),
            None,
            vec![EvaluatedExpression::unknown()],
        );
        assert_eq!(w.as_bool(), Some(true));
        let w = EvaluatedExpression::wrapped(None, None, vec![EvaluatedExpression::unknown()]);
        assert_eq!(w.as_bool(), None);
    }

    #[test]
    fn test_as_nullish() {
        assert_eq!(EvaluatedExpression::undefined().as_nullish(), Some(true));
        assert_eq!(EvaluatedExpression::string("x").as_nullish(), Some(false));
        assert_eq!(EvaluatedExpression::unknown().as_nullish(), None);
    }

    #[test]
    fn test_as_string_conversions() {
        assert_eq!(EvaluatedExpression::number(1e21).as_string().as_deref(), Some("1e+21"));
        assert_eq!(
            EvaluatedExpression::regexp("a+", "gi").as_string().as_deref(),
            Some("/a+/gi")
        );
        let arr = EvaluatedExpression::items(vec![
            EvaluatedExpression::number(1.0),
            EvaluatedExpression::string("b"),
        ]);
        assert_eq!(arr.as_string().as_deref(), Some("1,b"));
        let with_unknown = EvaluatedExpression::items(vec![EvaluatedExpression::unknown()]);
        assert_eq!(with_unknown.as_string(), None);
    }

    #[test]
    fn test_items_side_effects_follow_elements() {
        let pure = EvaluatedExpression::items(vec![EvaluatedExpression::number(1.0)]);
        assert!(!pure.could_have_side_effects());
        let impure = EvaluatedExpression::items(vec![EvaluatedExpression::unknown()]);
        assert!(impure.could_have_side_effects());
    }

    #[test]
    fn test_add_options_flattens() {
        let c = EvaluatedExpression::options(vec![EvaluatedExpression::string("a")])
            .add_options(vec![EvaluatedExpression::string("b")]);
        assert_eq!(c.options_value().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_primitive_type() {
        assert_eq!(EvaluatedExpression::null().is_primitive_type(), Some(true));
        assert_eq!(EvaluatedExpression::const_array(vec![]).is_primitive_type(), Some(false));
        assert_eq!(EvaluatedExpression::unknown().is_primitive_type(), None);
    }

    #[test]
    fn test_regexp_flags() {
        assert!(is_valid_regexp_flags("gimsuy"));
        assert!(is_valid_regexp_flags(""));
        assert!(!is_valid_regexp_flags("gg"));
        assert!(!is_valid_regexp_flags("x"));
        assert!(!is_valid_regexp_flags("uv"));
    }
}
