//! Partial evaluation of expressions.
//!
//! [`Walker::evaluate_expression`] folds literals, operators, templates and a
//! handful of string methods, resolves free identifiers and member chains,
//! and gives `evaluate*` hooks a chance at everything else.  Failures never
//! propagate: an expression that cannot be folded evaluates to "unknown".

use std::iter::Peekable;
use std::str::Chars;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::analyzer::evaluated::{
    EvaluatedExpression, EvaluatedKind, IdentifierValue, TemplateStringKind, TemplateValue,
    WrappedValue, is_valid_regexp_flags,
};
use crate::analyzer::member_chain::AllowedMemberTypes;
use crate::analyzer::scope::Binding;
use crate::analyzer::value::{
    JsValue, binary_operation, loose_equals, number_to_js_string, strict_equals, unary_operation,
};
use crate::analyzer::walker::{Dispatch, Walker};
use crate::parser::ast::{
    ArrayExpr, BinaryExpr, BinaryOp, CallExpr, ChainExpr, ConditionalExpr, Expr, LogicalExpr,
    LogicalOp, MemberProp, NewExpr, TemplateLit, UnaryExpr, UnaryOp,
};
use crate::parser::scanner::Span;

type Eval = EvaluatedExpression;

/// `a.start..b.end`, or whichever of the two exists.
fn join_ranges(a: Option<Span>, b: Option<Span>) -> Option<Span> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.to(b)),
        (a, b) => a.or(b),
    }
}

fn string_at(value: String, range: Option<Span>) -> Eval {
    let string = Eval::string(value);
    match range {
        Some(range) => string.with_range(range),
        None => string,
    }
}

/// The result of a folded operator; only primitives are representable.
fn value_as_expression(value: &JsValue) -> Option<Eval> {
    match value {
        JsValue::Boolean(_) | JsValue::Number(_) | JsValue::BigInt(_) | JsValue::String(_) => {
            Eval::from_value(value)
        }
        _ => None,
    }
}

impl<S> Walker<'_, S> {
    /// Evaluate `expr` as far as statically possible.
    pub fn evaluate_expression(&mut self, expr: &Expr) -> Eval {
        let hooks = self.hooks;
        let mut late_identifier = None;
        let mut result = self
            .evaluate_builtin(expr, &mut late_identifier)
            .or_else(|| hooks.evaluate.call(&expr.kind(), |h| h(self, expr)))
            .or_else(|| {
                late_identifier.map(|ident| Eval::identifier(ident).with_range(expr.loc()))
            })
            .unwrap_or_default();
        if result.range().is_none() {
            result.set_range(expr.loc());
        }
        result.set_expression(Some(expr.key()));
        result
    }

    /// [`evaluate_expression`](Self::evaluate_expression), memoized per node
    /// for the rest of the walk.  The walker evaluates call callees and
    /// rename candidates through here, so hooks asking again for the same
    /// node get the stored result.
    pub fn evaluate_expression_cached(&mut self, expr: &Expr) -> Eval {
        let key = expr.key();
        if let Some(cached) = self.evaluation_cache.get(&key) {
            return cached.clone();
        }
        let evaluated = self.evaluate_expression(expr);
        self.evaluation_cache.insert(key, evaluated.clone());
        evaluated
    }

    fn evaluate_builtin(&mut self, expr: &Expr, late: &mut Option<IdentifierValue>) -> Option<Eval> {
        let range = expr.loc();
        match expr {
            Expr::Null(_) => Some(Eval::null().with_range(range)),
            Expr::Bool(b) => Some(Eval::boolean(b.value).with_range(range)),
            Expr::Num(n) => Some(Eval::number(n.value).with_range(range)),
            Expr::Str(s) => Some(Eval::string(s.value.clone()).with_range(range)),
            Expr::BigInt(b) => b.value.clone().map(|value| Eval::bigint(value).with_range(range)),
            Expr::Regexp(r) => Some(Eval::regexp(r.pattern.clone(), r.flags.clone()).with_range(range)),
            Expr::Template(template) => {
                let (quasis, mut parts) = self.simplify_template(template, TemplateStringKind::Cooked)?;
                if parts.len() == 1 {
                    return parts.pop().map(|part| part.with_range(range));
                }
                Some(Eval::template_string(quasis, parts, TemplateStringKind::Cooked).with_range(range))
            }
            Expr::TaggedTemplate(tagged) => {
                let tag = self.evaluate_expression(&tagged.tag);
                if tag.identifier_value().is_none_or(|ident| ident.name != "String.raw") {
                    return None;
                }
                let (quasis, parts) = self.simplify_template(&tagged.quasi, TemplateStringKind::Raw)?;
                Some(Eval::template_string(quasis, parts, TemplateStringKind::Raw).with_range(range))
            }
            Expr::Ident(_) | Expr::This(_) | Expr::MetaProp(_) | Expr::Member(_) => {
                self.evaluate_identifier_like(expr, late)
            }
            Expr::New(new) => self.evaluate_new_expression(expr, new),
            Expr::Logical(logical) => self.evaluate_logical_expression(logical, range),
            Expr::Binary(binary) => self.evaluate_binary_expression(binary, range),
            Expr::Unary(unary) => self.evaluate_unary_expression(expr, unary, range),
            Expr::Call(call) => self.evaluate_call_expression(expr, call, range),
            Expr::Conditional(conditional) => Some(self.evaluate_conditional_expression(conditional, range)),
            Expr::Array(array) => self.evaluate_array_expression(array, range),
            Expr::Chain(chain) => Some(self.evaluate_chain_expression(chain, range)),
            _ => None,
        }
    }

    // ── Identifiers ─────────────────────────────────────────────────────────

    /// Free names and member chains dispatch `evaluate_identifier`; when no
    /// handler answers, `late` receives the identifier value that is used
    /// once the `evaluate` hooks have had their turn.
    fn evaluate_identifier_like(&mut self, expr: &Expr, late: &mut Option<IdentifierValue>) -> Option<Eval> {
        let hooks = self.hooks;
        let Some(info) = self.get_member_expression_info(expr, AllowedMemberTypes::EXPRESSION) else {
            return match expr {
                Expr::Ident(ident) => self.evaluate_defined_identifier(expr, &ident.name),
                _ => None,
            };
        };
        if info.name == "undefined" {
            return Some(Eval::undefined().with_range(expr.loc()));
        }
        let binding = if info.access.is_empty() {
            info.root_info.clone()
        } else {
            Binding::Free(info.name.clone())
        };
        match self.call_hooks_for_info(&hooks.evaluate_identifier, &binding, |w, h| h(w, expr)) {
            Dispatch::Handled(result) => Some(result),
            Dispatch::Free(_) | Dispatch::Defined => {
                *late = Some(IdentifierValue {
                    name: info.name,
                    root_info: info.root_info,
                    access: info.access,
                });
                None
            }
        }
    }

    /// Locally declared names: tag handlers first, then handlers keyed by
    /// the name as written.
    fn evaluate_defined_identifier(&mut self, expr: &Expr, name: &str) -> Option<Eval> {
        let hooks = self.hooks;
        let binding = self.get_variable_info(name);
        if let Dispatch::Handled(result) =
            self.call_hooks_for_info(&hooks.evaluate_defined_identifier, &binding, |w, h| h(w, expr))
        {
            return Some(result);
        }
        hooks
            .evaluate_defined_identifier
            .get_name(name)?
            .call(|h| h(self, expr))
    }

    // ── Templates ───────────────────────────────────────────────────────────

    /// Evaluate the substitutions of `template`, folding every one that is a
    /// side-effect-free string into its neighbouring text.
    fn simplify_template(&mut self, template: &TemplateLit, kind: TemplateStringKind) -> Option<(Vec<Eval>, Vec<Eval>)> {
        let mut quasis: Vec<Eval> = Vec::with_capacity(template.quasis.len());
        let mut parts: Vec<Eval> = Vec::with_capacity(template.quasis.len() * 2);
        for (index, quasi) in template.quasis.iter().enumerate() {
            let text = match kind {
                TemplateStringKind::Cooked => quasi.cooked.as_deref()?,
                TemplateStringKind::Raw => quasi.raw.as_str(),
            };
            if let Some(substitution) = index.checked_sub(1).and_then(|i| template.expressions.get(i)) {
                let evaluated = self.evaluate_expression(substitution);
                if let Some(value) = evaluated.as_string()
                    && !evaluated.could_have_side_effects()
                    && let Some(previous) = quasis.last_mut()
                {
                    let merged = format!("{}{value}{text}", previous.string_value().unwrap_or_default());
                    let range = previous.range().map_or(quasi.loc, |r| r.to(quasi.loc));
                    previous.set_string(merged);
                    previous.set_range(range);
                    previous.set_expression(None);
                    let previous = previous.clone();
                    if let Some(last) = parts.last_mut() {
                        *last = previous;
                    }
                    continue;
                }
                parts.push(evaluated);
            }
            let part = Eval::string(text).with_range(quasi.loc);
            quasis.push(part.clone());
            parts.push(part);
        }
        Some((quasis, parts))
    }

    // ── Operators ───────────────────────────────────────────────────────────

    fn evaluate_new_expression(&mut self, expr: &Expr, new: &NewExpr) -> Option<Eval> {
        let Expr::Ident(callee) = new.callee.as_ref() else {
            return None;
        };
        let hooks = self.hooks;
        if callee.name != "RegExp" {
            return self.call_hooks_for_name(&hooks.evaluate_new_expression, &callee.name, |w, h| h(w, expr));
        }
        if new.arguments.len() > 2 || self.get_variable_info("RegExp") != Binding::Free("RegExp".into()) {
            return None;
        }
        let mut pattern = String::from("(?:)");
        if let Some(argument) = new.arguments.first() {
            if let Expr::Spread(_) = argument {
                return None;
            }
            pattern = self.evaluate_expression(argument).as_string().filter(|p| !p.is_empty())?;
        }
        let mut flags = String::new();
        if let Some(argument) = new.arguments.get(1) {
            if let Expr::Spread(_) = argument {
                return None;
            }
            let evaluated = self.evaluate_expression(argument);
            if !evaluated.is_undefined() {
                flags = evaluated.as_string()?;
                if !is_valid_regexp_flags(&flags) {
                    return None;
                }
            }
        }
        Some(Eval::regexp(pattern, flags).with_range(expr.loc()))
    }

    fn evaluate_logical_expression(&mut self, logical: &LogicalExpr, range: Span) -> Option<Eval> {
        let left = self.evaluate_expression(&logical.left);
        let (return_right, allowed_right) = match logical.op {
            LogicalOp::And => match left.as_bool() {
                Some(false) => return Some(left.with_range(range)),
                other => (other == Some(true), false),
            },
            LogicalOp::Or => match left.as_bool() {
                Some(true) => return Some(left.with_range(range)),
                other => (other == Some(false), true),
            },
            LogicalOp::NullishCoalesce => match left.as_nullish() {
                Some(false) => return Some(left.with_range(range)),
                Some(true) => (true, false),
                None => return None,
            },
        };
        let mut right = self.evaluate_expression(&logical.right);
        if return_right {
            if left.could_have_side_effects() {
                right.set_side_effects();
            }
            return Some(right.with_range(range));
        }
        match (allowed_right, right.as_bool()) {
            (true, Some(true)) => Some(Eval::unknown().into_truthy().with_range(range)),
            (false, Some(false)) => Some(Eval::unknown().into_falsy().with_range(range)),
            _ => None,
        }
    }

    fn evaluate_binary_expression(&mut self, binary: &BinaryExpr, range: Span) -> Option<Eval> {
        match binary.op {
            BinaryOp::Add => self.evaluate_addition(binary, range),
            BinaryOp::StrictEq => self.evaluate_equality(binary, true, true, range),
            BinaryOp::StrictNotEq => self.evaluate_equality(binary, true, false, range),
            BinaryOp::Eq => self.evaluate_equality(binary, false, true, range),
            BinaryOp::NotEq => self.evaluate_equality(binary, false, false, range),
            BinaryOp::In | BinaryOp::Instanceof => None,
            _ => self.evaluate_const_operation(binary, range),
        }
    }

    fn evaluate_const_operation(&mut self, binary: &BinaryExpr, range: Span) -> Option<Eval> {
        let left = self.evaluate_expression(&binary.left);
        let left_value = left.as_compile_time_value()?;
        let right = self.evaluate_expression(&binary.right);
        let right_value = right.as_compile_time_value()?;
        match binary_operation(binary.op, &left_value, &right_value) {
            Ok(value) => value_as_expression(&value).map(|result| {
                result
                    .with_side_effects(left.could_have_side_effects() || right.could_have_side_effects())
                    .with_range(range)
            }),
            Err(err) => {
                warn!(op = ?binary.op, error = %err, "constant operation failed");
                None
            }
        }
    }

    fn evaluate_addition(&mut self, binary: &BinaryExpr, range: Span) -> Option<Eval> {
        let left = self.evaluate_expression(&binary.left);
        let right = self.evaluate_expression(&binary.right);
        let side_effects = left.could_have_side_effects() || right.could_have_side_effects();
        let mut result = match (left.kind(), right.kind()) {
            (EvaluatedKind::String(l), EvaluatedKind::String(r)) => Eval::string(format!("{l}{r}")),
            (EvaluatedKind::String(l), EvaluatedKind::Number(r)) => {
                Eval::string(format!("{l}{}", number_to_js_string(*r)))
            }
            (EvaluatedKind::String(l), EvaluatedKind::Wrapped(w)) => {
                match w.prefix.as_ref().and_then(|p| p.string_value().map(|s| (s, p.range()))) {
                    Some((prefix, prefix_range)) => Eval::wrapped(
                        Some(string_at(format!("{l}{prefix}"), join_ranges(left.range(), prefix_range))),
                        w.postfix.clone(),
                        w.inner.clone(),
                    ),
                    None => Eval::wrapped(Some(left.clone()), w.postfix.clone(), w.inner.clone()),
                }
            }
            (EvaluatedKind::String(_), _) => Eval::wrapped(Some(left.clone()), None, vec![right.clone()]),
            (EvaluatedKind::Number(l), EvaluatedKind::String(r)) => {
                Eval::string(format!("{}{r}", number_to_js_string(*l)))
            }
            (EvaluatedKind::Number(l), EvaluatedKind::Number(r)) => Eval::number(l + r),
            (EvaluatedKind::BigInt(l), EvaluatedKind::BigInt(r)) => Eval::bigint(l + r),
            (EvaluatedKind::Number(_) | EvaluatedKind::BigInt(_), _) => return None,
            (EvaluatedKind::Wrapped(w), _) => append_to_wrapped(w, &right),
            (_, EvaluatedKind::String(_)) => Eval::wrapped(None, Some(right.clone()), vec![left.clone()]),
            (_, EvaluatedKind::Wrapped(w)) => {
                let mut inner = vec![left.clone()];
                inner.extend(w.prefix.clone());
                inner.extend(w.inner.iter().cloned());
                Eval::wrapped(None, w.postfix.clone(), inner)
            }
            _ => return None,
        };
        if side_effects {
            result.set_side_effects();
        }
        Some(result.with_range(range))
    }

    fn evaluate_equality(&mut self, binary: &BinaryExpr, strict: bool, eql: bool, range: Span) -> Option<Eval> {
        let left = self.evaluate_expression(&binary.left);
        let right = self.evaluate_expression(&binary.right);
        let side_effects = left.could_have_side_effects() || right.could_have_side_effects();
        let decided = |value: bool| Some(Eval::boolean(value).with_side_effects(side_effects).with_range(range));

        let left_value = left.as_compile_time_value();
        let right_value = right.as_compile_time_value();
        if let (Some(l), Some(r)) = (&left_value, &right_value) {
            let equal = if strict { strict_equals(l, r) } else { loose_equals(l, r) };
            return decided(equal == eql);
        }
        if left.is_array() && right.is_array() {
            return decided(!eql);
        }
        if let (Some(l), Some(r)) = (left.template_value(), right.template_value()) {
            return if templates_differ(l, r) { decided(!eql) } else { None };
        }
        if !strict {
            return None;
        }
        let (left_primitive, right_primitive) = (left.is_primitive_type(), right.is_primitive_type());
        let always_different = |a: Option<bool>, b: Option<bool>| {
            matches!((a, b), (Some(true), Some(false)) | (Some(false), Some(true)))
        };
        if (left_primitive == Some(false) && (left_value.is_some() || right_primitive == Some(true)))
            || (right_primitive == Some(false) && (right_value.is_some() || left_primitive == Some(true)))
            || always_different(left.as_bool(), right.as_bool())
            || always_different(left.as_nullish(), right.as_nullish())
        {
            return decided(!eql);
        }
        None
    }

    fn evaluate_unary_expression(&mut self, expr: &Expr, unary: &UnaryExpr, range: Span) -> Option<Eval> {
        match unary.op {
            UnaryOp::Typeof => self.evaluate_typeof(expr, unary, range),
            UnaryOp::Not => {
                let argument = self.evaluate_expression(&unary.argument);
                let value = argument.as_bool()?;
                Some(
                    Eval::boolean(!value)
                        .with_side_effects(argument.could_have_side_effects())
                        .with_range(range),
                )
            }
            UnaryOp::Minus | UnaryOp::Plus | UnaryOp::BitNot => {
                let argument = self.evaluate_expression(&unary.argument);
                let value = argument.as_compile_time_value()?;
                match unary_operation(unary.op, &value) {
                    Ok(result) => value_as_expression(&result).map(|result| {
                        result
                            .with_side_effects(argument.could_have_side_effects())
                            .with_range(range)
                    }),
                    Err(err) => {
                        warn!(op = ?unary.op, error = %err, "constant operation failed");
                        None
                    }
                }
            }
            UnaryOp::Void | UnaryOp::Delete => None,
        }
    }

    fn evaluate_typeof(&mut self, expr: &Expr, unary: &UnaryExpr, range: Span) -> Option<Eval> {
        let hooks = self.hooks;
        let hooked = match unary.argument.as_ref() {
            Expr::Ident(ident) => {
                self.call_hooks_for_name(&hooks.evaluate_typeof, &ident.name, |w, h| h(w, expr))
            }
            Expr::MetaProp(meta) => {
                let name = format!("{}.{}", meta.meta.name, meta.property.name);
                self.call_hooks_for_name(&hooks.evaluate_typeof, &name, |w, h| h(w, expr))
            }
            member @ Expr::Member(_) => {
                self.call_hooks_for_expression(&hooks.evaluate_typeof, member, |w, h| h(w, expr))
            }
            Expr::Chain(chain) => {
                self.call_hooks_for_expression(&hooks.evaluate_typeof, &chain.expression, |w, h| h(w, expr))
            }
            Expr::Fn(_) | Expr::Arrow(_) => return Some(Eval::string("function").with_range(range)),
            _ => None,
        };
        if hooked.is_some() {
            return hooked;
        }
        let argument = self.evaluate_expression(&unary.argument);
        let (type_name, side_effects) = match argument.kind() {
            EvaluatedKind::String(_) => ("string", false),
            EvaluatedKind::Wrapped(_) => ("string", true),
            EvaluatedKind::Undefined => ("undefined", false),
            EvaluatedKind::Number(_) => ("number", false),
            EvaluatedKind::BigInt(_) => ("bigint", false),
            EvaluatedKind::Boolean(_) => ("boolean", false),
            EvaluatedKind::ConstArray(_) | EvaluatedKind::RegExp { .. } | EvaluatedKind::Null => ("object", false),
            EvaluatedKind::Array(_) => ("object", argument.could_have_side_effects()),
            _ => return None,
        };
        Some(Eval::string(type_name).with_side_effects(side_effects).with_range(range))
    }

    fn evaluate_conditional_expression(&mut self, conditional: &ConditionalExpr, range: Span) -> Eval {
        let test = self.evaluate_expression(&conditional.test);
        match test.as_bool() {
            None => {
                let consequent = self.evaluate_expression(&conditional.consequent);
                let alternate = self.evaluate_expression(&conditional.alternate);
                Eval::options(flatten_options(consequent))
                    .add_options(flatten_options(alternate))
                    .with_range(range)
            }
            Some(branch) => {
                let chosen = if branch { &conditional.consequent } else { &conditional.alternate };
                let mut result = self.evaluate_expression(chosen);
                if test.could_have_side_effects() {
                    result.set_side_effects();
                }
                result.with_range(range)
            }
        }
    }

    fn evaluate_array_expression(&mut self, array: &ArrayExpr, range: Span) -> Option<Eval> {
        let mut items = Vec::with_capacity(array.elements.len());
        for element in &array.elements {
            let element = element.as_ref()?;
            if let Expr::Spread(_) = element {
                return None;
            }
            let item = self.evaluate_expression(element);
            if !item.is_compile_time_value() && !item.is_array() {
                return None;
            }
            items.push(item);
        }
        Some(Eval::items(items).with_range(range))
    }

    fn evaluate_chain_expression(&mut self, chain: &ChainExpr, range: Span) -> Eval {
        let mut optionals: Vec<&Expr> = Vec::new();
        let mut next: &Expr = &chain.expression;
        loop {
            match next {
                Expr::Member(member) => {
                    if member.optional {
                        optionals.push(&member.object);
                    }
                    next = &member.object;
                }
                Expr::Call(call) => {
                    if call.optional {
                        optionals.push(&call.callee);
                    }
                    next = &call.callee;
                }
                _ => break,
            }
        }
        while let Some(object) = optionals.pop() {
            let evaluated = self.evaluate_expression(object);
            if evaluated.as_nullish() == Some(true) {
                return evaluated.with_range(range);
            }
        }
        self.evaluate_expression(&chain.expression)
    }

    // ── Calls ───────────────────────────────────────────────────────────────

    fn evaluate_call_expression(&mut self, expr: &Expr, call: &CallExpr, range: Span) -> Option<Eval> {
        let hooks = self.hooks;
        match call.callee.as_ref() {
            Expr::Member(member) => {
                let property = match &member.property {
                    MemberProp::Ident(ident) => ident.name.clone(),
                    MemberProp::Computed(key) => match key.as_ref() {
                        Expr::Str(s) => s.value.clone(),
                        Expr::Num(n) => number_to_js_string(n.value),
                        _ => return None,
                    },
                    MemberProp::Private(_) => return None,
                };
                let param = self.evaluate_expression(&member.object);
                if let Some(result) = self.evaluate_string_method(&property, &call.arguments, &param) {
                    return Some(result.with_range(range));
                }
                hooks
                    .evaluate_call_expression_member
                    .call(property.as_str(), |h| h(self, expr, &param))
            }
            Expr::Ident(ident) => {
                self.call_hooks_for_name(&hooks.evaluate_call_expression, &ident.name, |w, h| h(w, expr))
            }
            _ => None,
        }
    }

    /// Evaluate call arguments; spreads make the call unfoldable.
    fn evaluate_arguments(&mut self, arguments: &[Expr]) -> Option<Vec<Eval>> {
        arguments
            .iter()
            .map(|argument| match argument {
                Expr::Spread(_) => None,
                other => Some(self.evaluate_expression(other)),
            })
            .collect()
    }

    /// `String.prototype` methods on a known receiver.
    fn evaluate_string_method(&mut self, method: &str, arguments: &[Expr], param: &Eval) -> Option<Eval> {
        let side_effects = param.could_have_side_effects();
        match method {
            "indexOf" => {
                let receiver = param.string_value()?;
                if arguments.is_empty() {
                    return None;
                }
                let args = self.evaluate_arguments(arguments)?;
                let search = args[0].string_value()?;
                let position = match args.get(1) {
                    Some(position) => position.number_value()?,
                    None => 0.0,
                };
                Some(Eval::number(js_index_of(receiver, search, position)).with_side_effects(side_effects))
            }
            "replace" => {
                let receiver = param.string_value()?;
                if arguments.len() != 2 {
                    return None;
                }
                let args = self.evaluate_arguments(arguments)?;
                let replacement = args[1].string_value()?;
                let replaced = match args[0].kind() {
                    EvaluatedKind::String(pattern) => replace_string(receiver, pattern, replacement),
                    EvaluatedKind::RegExp { pattern, flags } => {
                        replace_regexp(receiver, pattern, flags, replacement)?
                    }
                    _ => return None,
                };
                Some(Eval::string(replaced).with_side_effects(side_effects))
            }
            "substr" | "substring" | "slice" => {
                let receiver = param.string_value()?;
                if arguments.is_empty() {
                    return None;
                }
                let args = self.evaluate_arguments(arguments)?;
                let start = args[0].number_value()?;
                let end = match args.get(1) {
                    Some(end) => Some(end.number_value()?),
                    None => None,
                };
                let sliced = js_substring(method, receiver, start, end)?;
                Some(Eval::string(sliced).with_side_effects(side_effects))
            }
            "concat" => self.evaluate_concat(arguments, param),
            "split" => {
                let receiver = param.string_value()?;
                if arguments.len() != 1 {
                    return None;
                }
                let args = self.evaluate_arguments(arguments)?;
                let parts: Vec<String> = match args[0].kind() {
                    EvaluatedKind::String(separator) if separator.is_empty() => {
                        if !is_bmp(receiver) {
                            return None;
                        }
                        receiver.chars().map(String::from).collect()
                    }
                    EvaluatedKind::String(separator) => {
                        receiver.split(separator.as_str()).map(String::from).collect()
                    }
                    EvaluatedKind::RegExp { pattern, flags } => {
                        let regex = translate_regexp(pattern, flags, receiver)?;
                        if regex.captures_len() > 1 || regex.is_match("") {
                            return None;
                        }
                        regex.split(receiver).map(String::from).collect()
                    }
                    _ => return None,
                };
                Some(Eval::const_array(parts).with_side_effects(side_effects))
            }
            _ => None,
        }
    }

    /// `receiver.concat(...)` on a string or partially known string.
    fn evaluate_concat(&mut self, arguments: &[Expr], param: &Eval) -> Option<Eval> {
        if !param.is_string() && !param.is_wrapped() {
            return None;
        }
        let mut suffix: Option<Eval> = None;
        let mut has_unknown = false;
        let mut unknown_inner = Vec::new();
        for argument in arguments.iter().rev() {
            if let Expr::Spread(_) = argument {
                return None;
            }
            let evaluated = self.evaluate_expression(argument);
            let known = match evaluated.kind() {
                _ if has_unknown => None,
                EvaluatedKind::String(s) => Some(s.clone()),
                EvaluatedKind::Number(n) => Some(number_to_js_string(*n)),
                _ => None,
            };
            let Some(value) = known else {
                has_unknown = true;
                unknown_inner.push(evaluated);
                continue;
            };
            let joined = format!("{value}{}", suffix.as_ref().and_then(Eval::string_value).unwrap_or_default());
            let end = suffix.as_ref().map_or(evaluated.range(), Eval::range);
            let side_effects = suffix.as_ref().is_some_and(Eval::could_have_side_effects)
                || evaluated.could_have_side_effects();
            suffix = Some(
                string_at(joined, join_ranges(evaluated.range(), end)).with_side_effects(side_effects),
            );
        }
        unknown_inner.reverse();

        if has_unknown {
            let (prefix, inner) = match param.wrapped_value() {
                Some(w) => {
                    let mut inner = w.inner.clone();
                    inner.extend(w.postfix.clone());
                    inner.extend(unknown_inner);
                    (w.prefix.clone(), inner)
                }
                None => (Some(param.clone()), unknown_inner),
            };
            return Some(Eval::wrapped(prefix, suffix, inner));
        }
        if let Some(w) = param.wrapped_value() {
            let mut inner = w.inner.clone();
            let postfix = match (w.postfix.as_ref(), suffix) {
                (Some(old), Some(new)) => match (old.string_value(), new.string_value()) {
                    (Some(head), Some(tail)) => Some(
                        string_at(format!("{head}{tail}"), join_ranges(old.range(), new.range()))
                            .with_side_effects(old.could_have_side_effects() || new.could_have_side_effects()),
                    ),
                    _ => {
                        inner.push(old.clone());
                        Some(new)
                    }
                },
                (old, new) => new.or_else(|| old.cloned()),
            };
            return Some(Eval::wrapped(w.prefix.clone(), postfix, inner));
        }
        let receiver = param.string_value()?;
        let side_effects =
            suffix.as_ref().is_some_and(Eval::could_have_side_effects) || param.could_have_side_effects();
        let joined = format!("{receiver}{}", suffix.as_ref().and_then(Eval::string_value).unwrap_or_default());
        Some(Eval::string(joined).with_side_effects(side_effects))
    }
}

/// Flatten a conditional into its options, or wrap a single value.
fn flatten_options(evaluated: Eval) -> Vec<Eval> {
    match evaluated.options_value() {
        Some(options) => options.to_vec(),
        None => vec![evaluated],
    }
}

/// `wrapped + right`.
fn append_to_wrapped(left: &WrappedValue, right: &Eval) -> Eval {
    let postfix = left
        .postfix
        .as_ref()
        .and_then(|p| p.string_value().map(|s| (s, p.range())));
    match (postfix, right.kind()) {
        (Some((postfix, postfix_range)), EvaluatedKind::String(r)) => Eval::wrapped(
            left.prefix.clone(),
            Some(string_at(format!("{postfix}{r}"), join_ranges(postfix_range, right.range()))),
            left.inner.clone(),
        ),
        (Some((postfix, postfix_range)), EvaluatedKind::Number(r)) => Eval::wrapped(
            left.prefix.clone(),
            Some(string_at(
                format!("{postfix}{}", number_to_js_string(*r)),
                join_ranges(postfix_range, right.range()),
            )),
            left.inner.clone(),
        ),
        (_, EvaluatedKind::String(_)) => Eval::wrapped(left.prefix.clone(), Some(right.clone()), left.inner.clone()),
        (_, EvaluatedKind::Number(r)) => Eval::wrapped(
            left.prefix.clone(),
            Some(string_at(number_to_js_string(*r), right.range())),
            left.inner.clone(),
        ),
        (_, EvaluatedKind::Wrapped(r)) => {
            let mut inner = left.inner.clone();
            inner.extend(left.postfix.clone());
            inner.extend(r.prefix.clone());
            inner.extend(r.inner.iter().cloned());
            Eval::wrapped(left.prefix.clone(), r.postfix.clone(), inner)
        }
        _ => {
            let mut inner = left.inner.clone();
            inner.extend(left.postfix.clone());
            inner.push(right.clone());
            Eval::wrapped(left.prefix.clone(), None, inner)
        }
    }
}

/// Whether two templates provably differ by their known leading or
/// trailing text.
fn templates_differ(left: &TemplateValue, right: &TemplateValue) -> bool {
    fn prefix(parts: &[Eval]) -> Vec<char> {
        parts
            .iter()
            .map_while(Eval::as_string)
            .flat_map(|s| s.chars().collect::<Vec<_>>())
            .collect()
    }
    fn suffix(parts: &[Eval]) -> Vec<char> {
        let mut chars: Vec<char> = parts
            .iter()
            .rev()
            .map_while(Eval::as_string)
            .flat_map(|s| s.chars().rev().collect::<Vec<_>>())
            .collect();
        chars.reverse();
        chars
    }
    let (left_prefix, right_prefix) = (prefix(&left.parts), prefix(&right.parts));
    let (left_suffix, right_suffix) = (suffix(&left.parts), suffix(&right.parts));
    let prefix_len = left_prefix.len().min(right_prefix.len());
    let suffix_len = left_suffix.len().min(right_suffix.len());
    let prefix_mismatch = prefix_len > 0 && left_prefix[..prefix_len] != right_prefix[..prefix_len];
    let suffix_mismatch = suffix_len > 0
        && left_suffix[left_suffix.len() - suffix_len..] != right_suffix[right_suffix.len() - suffix_len..];
    prefix_mismatch || suffix_mismatch
}

// ─────────────────────────────────────────────────────────────────────────────
// String method semantics
// ─────────────────────────────────────────────────────────────────────────────

/// `ToIntegerOrInfinity`.
fn to_integer(n: f64) -> f64 {
    if n.is_nan() { 0.0 } else { n.trunc() }
}

/// `String.prototype.indexOf`, in UTF-16 code units.
fn js_index_of(haystack: &str, needle: &str, position: f64) -> f64 {
    let haystack: Vec<u16> = haystack.encode_utf16().collect();
    let needle: Vec<u16> = needle.encode_utf16().collect();
    let start = to_integer(position).clamp(0.0, haystack.len() as f64) as usize;
    if needle.is_empty() {
        return start as f64;
    }
    if needle.len() > haystack.len() - start {
        return -1.0;
    }
    haystack[start..]
        .windows(needle.len())
        .position(|window| window == needle.as_slice())
        .map_or(-1.0, |offset| (start + offset) as f64)
}

/// `substr`, `substring` and `slice`, in UTF-16 code units.
fn js_substring(method: &str, value: &str, start: f64, end: Option<f64>) -> Option<String> {
    let units: Vec<u16> = value.encode_utf16().collect();
    let len = units.len() as f64;
    let relative = |n: f64| {
        let n = to_integer(n);
        if n < 0.0 { (len + n).max(0.0) } else { n.min(len) }
    };
    let (from, to) = match method {
        "substr" => {
            let from = relative(start);
            let count = end.map_or(len, to_integer).clamp(0.0, len);
            (from, (from + count).min(len))
        }
        "substring" => {
            let a = to_integer(start).clamp(0.0, len);
            let b = end.map_or(len, |e| to_integer(e).clamp(0.0, len));
            (a.min(b), a.max(b))
        }
        "slice" => (relative(start), end.map_or(len, relative)),
        _ => return None,
    };
    let (from, to) = (from as usize, to as usize);
    Some(if from >= to {
        String::new()
    } else {
        String::from_utf16_lossy(&units[from..to])
    })
}

/// JavaScript `WhiteSpace` and `LineTerminator`, as class contents.
const JS_SPACE: &str =
    r"\t\n\x0B\x0C\r \xA0\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}";

/// What `.` matches without the `s` flag.
const JS_DOT: &str = r"[^\n\r\x{2028}\x{2029}]";

fn is_bmp(s: &str) -> bool {
    s.chars().all(|c| u32::from(c) <= 0xFFFF)
}

/// A JavaScript regular expression as a [`Regex`] that matches `haystack`
/// exactly as JavaScript would, or `None` when that cannot be guaranteed.
///
/// JavaScript matches by UTF-16 code unit and folds case with its own
/// tables, so supplementary characters and non-ASCII case-insensitive
/// input are left unfolded.
fn translate_regexp(pattern: &str, flags: &str, haystack: &str) -> Option<Regex> {
    if flags.contains(['y', 'v']) || !is_bmp(pattern) || !is_bmp(haystack) {
        return None;
    }
    if flags.contains('i') && !(pattern.is_ascii() && haystack.is_ascii() && !pattern.contains("\\u")) {
        return None;
    }
    if flags.contains('m') && haystack.contains(['\r', '\u{2028}', '\u{2029}']) {
        return None;
    }
    let body = rewrite_pattern(pattern, flags.contains('u'), flags.contains('s'))?;
    let inline: String = flags.chars().filter(|c| matches!(c, 'i' | 'm' | 's')).collect();
    let source = if inline.is_empty() { body } else { format!("(?{inline}){body}") };
    Regex::new(&source)
        .inspect_err(|err| debug!(pattern, %err, "regular expression not folded"))
        .ok()
}

/// Rewrite JavaScript pattern syntax into `regex` syntax with the same
/// meaning.  `\d`, `\w`, `\s` and `.` become explicit classes since the
/// `regex` crate reads them as Unicode classes.
fn rewrite_pattern(pattern: &str, unicode: bool, dot_all: bool) -> Option<String> {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next()?;
                rewrite_escape(escaped, &mut chars, in_class, unicode, &mut out)?;
            }
            '[' if in_class => out.push_str(r"\["),
            '[' => {
                in_class = true;
                out.push('[');
                if chars.next_if_eq(&'^').is_some() {
                    out.push('^');
                }
                // `[]` never matches and `[^]` matches anything.
                if chars.peek() == Some(&']') {
                    return None;
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            ']' => out.push_str(r"\]"),
            '&' | '~' if in_class => {
                out.push('\\');
                out.push(c);
            }
            '-' if in_class && chars.peek() == Some(&'-') => return None,
            '.' if !in_class && !dot_all => out.push_str(JS_DOT),
            '{' if !in_class && chars.peek() == Some(&',') => return None,
            other => out.push(other),
        }
    }
    (!in_class).then_some(out)
}

/// Contents of the class a `\d`-style escape stands for, and whether it is
/// negated.
fn class_escape(c: char) -> Option<(&'static str, bool)> {
    match c {
        'd' => Some(("0-9", false)),
        'D' => Some(("0-9", true)),
        'w' => Some(("0-9A-Za-z_", false)),
        'W' => Some(("0-9A-Za-z_", true)),
        's' => Some((JS_SPACE, false)),
        'S' => Some((JS_SPACE, true)),
        _ => None,
    }
}

/// Consume exactly `count` hex digits, or nothing.
fn take_hex(chars: &mut Peekable<Chars<'_>>, count: usize) -> Option<String> {
    let digits: String = chars.clone().take(count).collect();
    if digits.len() != count || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    chars.nth(count - 1);
    Some(digits)
}

fn rewrite_escape(
    c: char,
    rest: &mut Peekable<Chars<'_>>,
    in_class: bool,
    unicode: bool,
    out: &mut String,
) -> Option<()> {
    if let Some((set, negated)) = class_escape(c) {
        // Nested inside a class this is a union.
        out.push_str(if negated { "[^" } else { "[" });
        out.push_str(set);
        out.push(']');
        return Some(());
    }
    match c {
        'b' if in_class => out.push_str(r"\x08"),
        'b' => out.push_str(r"(?-u:\b)"),
        'f' | 'n' | 'r' | 't' | 'v' => {
            out.push('\\');
            out.push(c);
        }
        '0' if !rest.peek().is_some_and(char::is_ascii_digit) => out.push_str(r"\x00"),
        // Backreferences, control letters and property classes.
        '0'..='9' | 'B' | 'c' | 'k' | 'p' | 'P' => return None,
        'x' => match take_hex(rest, 2) {
            Some(hex) => out.push_str(&format!(r"\x{hex}")),
            None if unicode => return None,
            None => out.push('x'),
        },
        'u' if unicode && rest.next_if_eq(&'{').is_some() => {
            let mut hex = String::new();
            loop {
                match rest.next()? {
                    '}' => break,
                    d if d.is_ascii_hexdigit() => hex.push(d),
                    _ => return None,
                }
            }
            char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?;
            out.push_str(&format!(r"\x{{{hex}}}"));
        }
        'u' => match take_hex(rest, 4) {
            Some(hex) => {
                let unit = u32::from_str_radix(&hex, 16).ok()?;
                if (0xD800..=0xDFFF).contains(&unit) {
                    return None;
                }
                out.push_str(&format!(r"\x{{{hex}}}"));
            }
            None if unicode => return None,
            None => out.push('u'),
        },
        c if c.is_ascii_alphanumeric() || c == '_' => {
            if unicode {
                return None;
            }
            out.push(c);
        }
        other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
    }
    Some(())
}

/// The pieces of one match that `$` patterns in a replacement refer to.
struct ReplaceMatch<'h> {
    haystack: &'h str,
    start: usize,
    end: usize,
    captures: Option<&'h Captures<'h>>,
    has_named_groups: bool,
}

impl ReplaceMatch<'_> {
    fn group_count(&self) -> usize {
        self.captures.map_or(0, |c| c.len().saturating_sub(1))
    }

    fn group(&self, index: usize) -> &str {
        self.captures
            .and_then(|c| c.get(index))
            .map_or("", |m| m.as_str())
    }

    /// `GetSubstitution`.
    fn expand(&self, replacement: &str) -> String {
        let mut out = String::with_capacity(replacement.len());
        let bytes = replacement.as_bytes();
        let mut i = 0;
        while i < replacement.len() {
            let Some(offset) = replacement[i..].find('$') else {
                out.push_str(&replacement[i..]);
                break;
            };
            out.push_str(&replacement[i..i + offset]);
            i += offset;
            let next = bytes.get(i + 1).copied();
            match next {
                Some(b'$') => {
                    out.push('$');
                    i += 2;
                }
                Some(b'&') => {
                    out.push_str(&self.haystack[self.start..self.end]);
                    i += 2;
                }
                Some(b'`') => {
                    out.push_str(&self.haystack[..self.start]);
                    i += 2;
                }
                Some(b'\'') => {
                    out.push_str(&self.haystack[self.end..]);
                    i += 2;
                }
                Some(d @ b'0'..=b'9') => {
                    let first = usize::from(d - b'0');
                    let two_digit = bytes
                        .get(i + 2)
                        .filter(|b| b.is_ascii_digit())
                        .map(|b| first * 10 + usize::from(b - b'0'))
                        .filter(|n| (1..=self.group_count()).contains(n));
                    if let Some(n) = two_digit {
                        out.push_str(self.group(n));
                        i += 3;
                    } else if (1..=self.group_count()).contains(&first) {
                        out.push_str(self.group(first));
                        i += 2;
                    } else {
                        out.push('$');
                        i += 1;
                    }
                }
                Some(b'<') if self.has_named_groups => match replacement[i + 2..].find('>') {
                    Some(close) => {
                        let name = &replacement[i + 2..i + 2 + close];
                        let value = self
                            .captures
                            .and_then(|c| c.name(name))
                            .map_or("", |m| m.as_str());
                        out.push_str(value);
                        i += close + 3;
                    }
                    None => {
                        out.push('$');
                        i += 1;
                    }
                },
                _ => {
                    out.push('$');
                    i += 1;
                }
            }
        }
        out
    }
}

/// `haystack.replace(pattern, replacement)` with a string pattern: only the
/// first occurrence is replaced.
fn replace_string(haystack: &str, pattern: &str, replacement: &str) -> String {
    let Some(start) = haystack.find(pattern) else {
        return haystack.to_string();
    };
    let end = start + pattern.len();
    let found = ReplaceMatch {
        haystack,
        start,
        end,
        captures: None,
        has_named_groups: false,
    };
    format!("{}{}{}", &haystack[..start], found.expand(replacement), &haystack[end..])
}

/// `haystack.replace(/pattern/flags, replacement)`.
fn replace_regexp(haystack: &str, pattern: &str, flags: &str, replacement: &str) -> Option<String> {
    let regex = translate_regexp(pattern, flags, haystack)?;
    let has_named_groups = regex.capture_names().flatten().next().is_some();
    let global = flags.contains('g');
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for captures in regex.captures_iter(haystack) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let found = ReplaceMatch {
            haystack,
            start: whole.start(),
            end: whole.end(),
            captures: Some(&captures),
            has_named_groups,
        };
        out.push_str(&haystack[last..whole.start()]);
        out.push_str(&found.expand(replacement));
        last = whole.end();
        if !global {
            break;
        }
    }
    out.push_str(&haystack[last..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::analyzer::{Analyzer, AnalyzerOptions};

    fn evaluate(source: &str) -> Eval {
        let analyzer: Analyzer<()> = Analyzer::new(AnalyzerOptions::default()).expect("options");
        analyzer.evaluate(source).expect("parses")
    }

    fn string_of(source: &str) -> Option<String> {
        evaluate(source).string_value().map(str::to_string)
    }

    #[test]
    fn test_arithmetic_and_string_concatenation() {
        assert_eq!(evaluate("1 + 3").number_value(), Some(4.0));
        assert_eq!(string_of("'ab' + 1"), Some("ab1".into()));
        assert_eq!(string_of("1 + 'ab'"), Some("1ab".into()));
        assert_eq!(evaluate("2 ** 10").number_value(), Some(1024.0));
        assert_eq!(evaluate("7 % 4 << 2").number_value(), Some(12.0));
        assert_eq!(evaluate("10n + 5n").kind(), &EvaluatedKind::BigInt(15.into()));
        assert_eq!(
            string_of("`${170141183460469231731687303715884105727n + 170141183460469231731687303715884105729n}`"),
            Some("340282366920938463463374607431768211456".into())
        );
        assert!(evaluate("1n + 1").is_unknown());
    }

    #[test]
    fn test_typeof() {
        assert_eq!(string_of("typeof 123"), Some("number".into()));
        assert_eq!(string_of("typeof 'x'"), Some("string".into()));
        assert_eq!(string_of("typeof function () {}"), Some("function".into()));
        assert_eq!(string_of("typeof null"), Some("object".into()));
        assert!(evaluate("typeof x").is_unknown());
    }

    #[test]
    fn test_free_identifiers_and_undefined() {
        let e = evaluate("module.exports");
        let ident = e.identifier_value().expect("identifier");
        assert_eq!(ident.name, "module.exports");
        assert_eq!(ident.access.members.as_slice(), ["exports"]);
        assert!(evaluate("undefined").is_undefined());
    }

    #[test]
    fn test_wrapped_strings() {
        let e = evaluate("'./locale/' + lang + '.json'");
        let w = e.wrapped_value().expect("wrapped");
        assert_eq!(w.prefix.as_ref().and_then(Eval::string_value), Some("./locale/"));
        assert_eq!(w.postfix.as_ref().and_then(Eval::string_value), Some(".json"));
        assert_eq!(w.inner.len(), 1);
        assert!(e.could_have_side_effects());
    }

    #[test]
    fn test_template_folding() {
        assert_eq!(string_of("`a${1 + 1}b`"), Some("a2b".into()));
        let e = evaluate("`./dir/${name}.js`");
        let t = e.template_value().expect("template");
        assert_eq!(t.quasis.len(), 2);
        assert_eq!(t.parts.len(), 3);
        let raw = evaluate("String.raw`a\\n${1}`");
        assert_eq!(raw.as_string().as_deref(), Some("a\\n1"));
    }

    #[test]
    fn test_conditional_options() {
        let e = evaluate("x ? 'a' : y ? 'b' : 'c'");
        let options: Vec<_> = e
            .options_value()
            .expect("options")
            .iter()
            .filter_map(Eval::string_value)
            .collect();
        assert_eq!(options, vec!["a", "b", "c"]);
        assert_eq!(string_of("true ? 'a' : 'b'"), Some("a".into()));
    }

    #[test]
    fn test_array_of_unknown_is_unknown() {
        assert!(evaluate("[1, 2, a]").is_unknown());
        assert_eq!(evaluate("[1, 'b']").as_string().as_deref(), Some("1,b"));
    }

    #[test]
    fn test_equality() {
        assert_eq!(evaluate("1 === 1").bool_value(), Some(true));
        assert_eq!(evaluate("'1' == 1").bool_value(), Some(true));
        assert_eq!(evaluate("'1' === 1").bool_value(), Some(false));
        assert_eq!(evaluate("[] === []").bool_value(), Some(false));
        assert_eq!(evaluate("`a${x}` === `b${y}`").bool_value(), Some(false));
        assert!(evaluate("`a${x}` === `a${y}`").is_unknown());
        assert_eq!(evaluate("/a/ !== x").bool_value(), Some(true));
        assert_eq!(evaluate("null === 'x'").bool_value(), Some(false));
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(string_of("'' || 'b'"), Some("b".into()));
        assert_eq!(string_of("null ?? 'd'"), Some("d".into()));
        assert_eq!(evaluate("0 && x").number_value(), Some(0.0));
        assert_eq!(evaluate("x || 'y'").as_bool(), Some(true));
        assert!(evaluate("x ?? 1").is_unknown());
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(evaluate("'abcabc'.indexOf('c', 3)").number_value(), Some(5.0));
        assert_eq!(string_of("'a-b-c'.replace('-', '+')"), Some("a+b-c".into()));
        assert_eq!(string_of("'a-b-c'.replace(/-/g, '+')"), Some("a+b+c".into()));
        assert_eq!(string_of("'john smith'.replace(/(\\w+)\\s(\\w+)/, '$2 $1')"), Some("smith john".into()));
        assert_eq!(string_of("'abcdef'.substr(-3, 2)"), Some("de".into()));
        assert_eq!(string_of("'abcdef'.substring(4, 1)"), Some("bcd".into()));
        assert_eq!(string_of("'abcdef'.slice(1, -1)"), Some("bcde".into()));
        assert_eq!(string_of("'a'.concat('b', 1)"), Some("ab1".into()));
        let split = evaluate("'a,b,c'.split(',')");
        assert_eq!(split.kind(), &EvaluatedKind::ConstArray(vec!["a".into(), "b".into(), "c".into()]));
    }

    #[test]
    fn test_concat_with_unknown_argument() {
        let e = evaluate("'./'.concat(dir, '/index', '.js')");
        let w = e.wrapped_value().expect("wrapped");
        assert_eq!(w.prefix.as_ref().and_then(Eval::string_value), Some("./"));
        assert_eq!(w.postfix.as_ref().and_then(Eval::string_value), Some("/index.js"));
        assert_eq!(w.inner.len(), 1);
    }

    #[test]
    fn test_concat_on_wrapped_keeps_postfix() {
        let e = evaluate("('a' + x + 'b').concat('c', 1)");
        let w = e.wrapped_value().expect("wrapped");
        assert_eq!(w.prefix.as_ref().and_then(Eval::string_value), Some("a"));
        assert_eq!(w.postfix.as_ref().and_then(Eval::string_value), Some("bc1"));
        assert_eq!(w.inner.len(), 1);

        let e = evaluate("('a' + x + 'b').concat(y, '.js')");
        let w = e.wrapped_value().expect("wrapped");
        assert_eq!(w.prefix.as_ref().and_then(Eval::string_value), Some("a"));
        assert_eq!(w.postfix.as_ref().and_then(Eval::string_value), Some(".js"));
        let inner: Vec<_> = w.inner.iter().map(Eval::string_value).collect();
        assert_eq!(inner, vec![None, Some("b"), None]);
    }

    #[test]
    fn test_string_methods_ignore_extra_arguments() {
        assert_eq!(evaluate("'abc'.indexOf('c', 0, 9)").number_value(), Some(2.0));
        assert_eq!(string_of("'abcdef'.slice(1, 3, 'x')"), Some("bc".into()));
        assert_eq!(string_of("'abcdef'.substring(2, 4, 0)"), Some("cd".into()));
    }

    #[test]
    fn test_split_by_empty_string_needs_bmp() {
        let split = evaluate("'ab'.split('')");
        assert_eq!(split.kind(), &EvaluatedKind::ConstArray(vec!["a".into(), "b".into()]));
        assert!(evaluate("'a\\u{1F600}'.split('')").is_unknown());
    }

    #[test]
    fn test_regexp_classes_follow_javascript() {
        // Arabic-Indic digit three is not `\d`.
        assert_eq!(string_of("'\\u0663'.replace(/\\d/, 'x')"), Some("\u{663}".into()));
        assert_eq!(string_of("'a\\u00e9'.replace(/\\w+/, 'x')"), Some("x\u{e9}".into()));
        assert_eq!(string_of("'a\\u00a0b'.replace(/\\s/, '-')"), Some("a-b".into()));
        assert_eq!(string_of("'a\\rb'.replace(/a.b/, 'x')"), Some("a\rb".into()));
        assert_eq!(string_of("'a\\nb'.replace(/a.b/s, 'x')"), Some("x".into()));
        assert_eq!(string_of("'a-b'.replace(/[\\w-]+/, 'x')"), Some("x".into()));
        assert_eq!(string_of("'a1'.replace(/[^\\D]/, '#')"), Some("a#".into()));
        assert_eq!(string_of("'a\\u00e9'.replace(/\\u00e9/, 'e')"), Some("ae".into()));
        assert_eq!(string_of("'za'.replace(/\\z/, 'y')"), Some("ya".into()));
    }

    #[test]
    fn test_regexp_without_equivalent_is_unknown() {
        assert!(evaluate("'abc'.replace(/(a)\\1/, 'x')").is_unknown());
        assert!(evaluate("'abc'.replace(/[^]/, 'x')").is_unknown());
        assert!(evaluate("'\\u00c9'.replace(/\\u00e9/i, 'x')").is_unknown());
        assert!(evaluate("'a\\u{1F600}'.replace(/./, 'x')").is_unknown());
        assert!(evaluate("'a\\rb'.replace(/^b/m, 'x')").is_unknown());
        assert!(translate_regexp(r"\p{L}", "u", "a").is_none());
        assert!(translate_regexp(r"(?=a)", "", "a").is_none());
    }

    #[test]
    fn test_new_regexp() {
        assert_eq!(
            evaluate("new RegExp('a+', 'g')").kind(),
            &EvaluatedKind::RegExp {
                pattern: "a+".into(),
                flags: "g".into()
            }
        );
        assert!(evaluate("new RegExp('a', 'gg')").is_unknown());
        assert!(evaluate("new RegExp('')").is_unknown());
    }

    #[test]
    fn test_optional_chain_short_circuits() {
        assert!(evaluate("null?.a.b").is_null());
        assert_eq!(evaluate("a?.b").identifier_value().map(|i| i.name.as_str()), Some("a.b"));
    }

    #[test]
    fn test_unary() {
        assert_eq!(evaluate("!0").bool_value(), Some(true));
        assert_eq!(evaluate("-'3'").number_value(), Some(-3.0));
        assert_eq!(evaluate("~5").number_value(), Some(-6.0));
        assert!(evaluate("!x").is_unknown());
    }

    #[test]
    fn test_result_carries_range_and_expression() {
        let e = evaluate("  1 + 2");
        assert_eq!(e.range().map(|r| r.range()), Some(2..7));
        assert!(e.expression().is_some());
    }

    #[test]
    fn test_replacement_patterns() {
        assert_eq!(replace_string("abc", "b", "[$&$`$'$$]"), "a[bac$]c");
        assert_eq!(replace_string("abc", "b", "$1"), "a$1c");
        assert_eq!(
            replace_regexp("2024-05", r"(?<y>\d+)-(?<m>\d+)", "", "$<m>/$<y>").as_deref(),
            Some("05/2024")
        );
        assert_eq!(replace_regexp("aaa", "a", "y", "b"), None);
    }

    #[test]
    fn test_utf16_indices() {
        assert_eq!(js_index_of("😀a", "a", 0.0), 2.0);
        assert_eq!(js_index_of("abc", "", 10.0), 3.0);
        assert_eq!(js_substring("slice", "😀ab", 2.0, None).as_deref(), Some("ab"));
    }
}
