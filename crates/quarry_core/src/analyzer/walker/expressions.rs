//! Expression and pattern visitors.

use std::sync::LazyLock;

use regex::Regex;

use crate::analyzer::hooks::CallChain;
use crate::analyzer::member_chain::{AllowedMemberTypes, MemberAccess, MemberInfoKind};
use crate::analyzer::scope::{Binding, TopLevelScope};
use crate::analyzer::walker::{PathEntry, Walker};
use crate::parser::CommentKind;
use crate::parser::ast::{
    ArrowBody, ArrowExpr, AssignExpr, CallExpr, ClassBody, ClassMember, Expr, FnExpr, Ident,
    MemberExpr, MemberProp, MethodKind, ObjectExpr, ObjectPatProp, ObjectProp, Param, Pat,
    PropKey, PropValue, UnaryOp,
};

static PURE_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(#|@)__PURE__\s*$").expect("valid pure annotation regex"));

/// A function literal that can be walked as an IIFE.
#[derive(Clone, Copy)]
enum IifeFunction<'e> {
    Fn(&'e FnExpr),
    Arrow(&'e ArrowExpr),
}

impl<'e> IifeFunction<'e> {
    fn of(expr: &'e Expr) -> Option<Self> {
        let function = match expr {
            Expr::Fn(f) => IifeFunction::Fn(f),
            Expr::Arrow(a) => IifeFunction::Arrow(a),
            _ => return None,
        };
        function
            .params()
            .iter()
            .all(|p| matches!(p.pat, Pat::Ident(_)) && p.default.is_none())
            .then_some(function)
    }

    fn params(&self) -> &'e [Param] {
        match self {
            IifeFunction::Fn(f) => &f.params,
            IifeFunction::Arrow(a) => &a.params,
        }
    }
}

impl<S> Walker<'_, S> {
    pub(crate) fn walk_expressions(&mut self, expressions: &[Expr]) {
        for expression in expressions {
            self.walk_expression(expression);
        }
    }

    pub(crate) fn walk_expression(&mut self, expression: &Expr) {
        match expression {
            Expr::Array(array) => {
                for element in array.elements.iter().flatten() {
                    self.walk_expression(element);
                }
            }
            Expr::Arrow(arrow) => self.walk_arrow_function(arrow),
            Expr::Assign(assign) => self.walk_assignment_expression(expression, assign),
            Expr::Await(await_expr) => {
                if self.scope.top_level_scope == TopLevelScope::Yes {
                    let hooks = self.hooks;
                    hooks.top_level_await.call(|h| h(self, await_expr.loc));
                }
                self.walk_expression(&await_expr.argument);
            }
            Expr::Binary(binary) => {
                let hooks = self.hooks;
                if hooks.binary_expression.call(|h| h(self, expression)).is_none() {
                    self.walk_expression(&binary.left);
                    self.walk_expression(&binary.right);
                }
            }
            Expr::Call(call) => self.walk_call_expression(expression, call),
            Expr::Chain(chain) => {
                let hooks = self.hooks;
                if hooks.optional_chaining.call(|h| h(self, expression)).is_none() {
                    match chain.expression.as_ref() {
                        Expr::Call(call) => self.walk_call_expression(&chain.expression, call),
                        Expr::Member(member) => self.walk_member_expression(&chain.expression, member),
                        other => self.walk_expression(other),
                    }
                }
            }
            Expr::Class(class) => self.walk_class(class.id.as_ref(), class.super_class.as_deref(), &class.body),
            Expr::Conditional(conditional) => {
                let hooks = self.hooks;
                match hooks.expression_conditional_operator.call(|h| h(self, expression)) {
                    None => {
                        self.walk_expression(&conditional.test);
                        self.walk_expression(&conditional.consequent);
                        self.walk_expression(&conditional.alternate);
                    }
                    Some(true) => self.walk_expression(&conditional.consequent),
                    Some(false) => self.walk_expression(&conditional.alternate),
                }
            }
            Expr::Fn(function) => self.walk_function_expression(function),
            Expr::Ident(ident) => self.walk_identifier(expression, &ident.name),
            Expr::Import(import) => {
                let hooks = self.hooks;
                if hooks.import_call.call(|h| h(self, expression)) != Some(true) {
                    self.walk_expression(&import.source);
                    if let Some(options) = &import.options {
                        self.walk_expression(options);
                    }
                }
            }
            Expr::Logical(logical) => {
                let hooks = self.hooks;
                match hooks.expression_logical_operator.call(|h| h(self, expression)) {
                    None => {
                        self.walk_expression(&logical.left);
                        self.walk_expression(&logical.right);
                    }
                    Some(true) => self.walk_expression(&logical.right),
                    Some(false) => {}
                }
            }
            Expr::MetaProp(meta) => {
                let hooks = self.hooks;
                let name = format!("{}.{}", meta.meta.name, meta.property.name);
                if let Some(hook) = hooks.expression.get_name(&name) {
                    hook.call(|h| h(self, expression));
                }
            }
            Expr::Member(member) => self.walk_member_expression(expression, member),
            Expr::New(new) => {
                let hooks = self.hooks;
                if self.call_hooks_for_expression(&hooks.new, &new.callee, |w, h| h(w, expression))
                    != Some(true)
                {
                    self.walk_expression(&new.callee);
                    self.walk_expressions(&new.arguments);
                }
            }
            Expr::Object(object) => self.walk_object_expression(object),
            Expr::Sequence(sequence) => {
                if self.is_statement_level_expression(expression) {
                    let old = self.statement_path.pop();
                    let prev = self.prev_statement;
                    for item in &sequence.expressions {
                        self.statement_path.push(PathEntry::expression(item));
                        self.walk_expression(item);
                        self.prev_statement = self.statement_path.pop();
                    }
                    self.prev_statement = prev;
                    self.statement_path.extend(old);
                } else {
                    self.walk_expressions(&sequence.expressions);
                }
            }
            Expr::Spread(spread) => self.walk_expression(&spread.argument),
            Expr::TaggedTemplate(tagged) => {
                self.scope.in_tagged_template_tag = true;
                self.walk_expression(&tagged.tag);
                self.scope.in_tagged_template_tag = false;
                self.walk_expressions(&tagged.quasi.expressions);
            }
            Expr::Template(template) => self.walk_expressions(&template.expressions),
            Expr::This(_) => self.walk_identifier(expression, "this"),
            Expr::Unary(unary) => {
                if unary.op == UnaryOp::Typeof {
                    let hooks = self.hooks;
                    if self.call_hooks_for_expression(&hooks.type_of, &unary.argument, |w, h| {
                        h(w, expression)
                    }) == Some(true)
                    {
                        return;
                    }
                    if let Expr::Chain(chain) = unary.argument.as_ref()
                        && self.call_hooks_for_expression(&hooks.type_of, &chain.expression, |w, h| {
                            h(w, expression)
                        }) == Some(true)
                    {
                        return;
                    }
                }
                self.walk_expression(&unary.argument);
            }
            Expr::Update(update) => self.walk_expression(&update.argument),
            Expr::Yield(yield_expr) => {
                if let Some(argument) = &yield_expr.argument {
                    self.walk_expression(argument);
                }
            }
            Expr::Null(_)
            | Expr::Bool(_)
            | Expr::Num(_)
            | Expr::Str(_)
            | Expr::BigInt(_)
            | Expr::Regexp(_)
            | Expr::Super(_) => {}
        }
    }

    /// Fire `expression` hooks for a reference to `name`.
    fn walk_identifier(&mut self, expression: &Expr, name: &str) {
        let hooks = self.hooks;
        self.call_hooks_for_name(&hooks.expression, name, |w, h| h(w, expression));
    }

    fn walk_object_expression(&mut self, object: &ObjectExpr) {
        for property in &object.properties {
            let prop = match property {
                ObjectProp::Spread(spread) => {
                    self.walk_expression(&spread.argument);
                    continue;
                }
                ObjectProp::Prop(prop) => prop,
            };
            if let PropKey::Computed(key) = &prop.key {
                self.walk_expression(key);
            }
            match &prop.value {
                PropValue::Value(value) => self.walk_expression(value),
                PropValue::Shorthand => {
                    if let PropKey::Ident(ident) = &prop.key {
                        self.scope.in_short_hand = Some(ident.name.clone());
                        self.walk_identifier(&Expr::Ident(ident.clone()), &ident.name);
                        self.scope.in_short_hand = None;
                    }
                }
                PropValue::Get(function) | PropValue::Set(function) | PropValue::Method(function) => {
                    self.walk_function_expression(function);
                }
            }
        }
    }

    // ── Functions and classes ───────────────────────────────────────────────

    pub(crate) fn walk_params(&mut self, params: &[Param]) {
        for param in params {
            if let Some(default) = &param.default {
                self.walk_expression(default);
            }
            self.walk_pattern(&param.pat);
        }
    }

    pub(crate) fn walk_function_expression(&mut self, function: &FnExpr) {
        let outer = self.set_top_level_scope(TopLevelScope::No);
        self.in_function_scope(
            true,
            function.params.iter().map(|p| &p.pat),
            function.id.as_ref(),
            |w| {
                w.walk_params(&function.params);
                w.walk_function_body(&function.body);
            },
        );
        self.scope.top_level_scope = outer;
    }

    fn walk_arrow_function(&mut self, arrow: &ArrowExpr) {
        let inner = if self.scope.top_level_scope.is_top_level() {
            TopLevelScope::Arrow
        } else {
            TopLevelScope::No
        };
        let outer = self.set_top_level_scope(inner);
        self.in_function_scope(false, arrow.params.iter().map(|p| &p.pat), None, |w| {
            w.walk_params(&arrow.params);
            match &arrow.body {
                ArrowBody::Block(body) => w.walk_function_body(body),
                ArrowBody::Expr(body) => w.walk_expression(body),
            }
        });
        self.scope.top_level_scope = outer;
    }

    pub(crate) fn walk_class(&mut self, id: Option<&Ident>, super_class: Option<&Expr>, body: &ClassBody) {
        let hooks = self.hooks;
        if let Some(super_class) = super_class
            && hooks.class_extends_expression.call(|h| h(self, super_class)) != Some(true)
        {
            self.walk_expression(super_class);
        }
        self.in_class_scope(id, |w| {
            for member in &body.body {
                if hooks.class_body_element.call(|h| h(w, member)) == Some(true) {
                    continue;
                }
                match member {
                    ClassMember::Method(method) => {
                        if let PropKey::Computed(key) = &method.key {
                            w.walk_expression(key);
                        }
                        let outer = w.set_top_level_scope(TopLevelScope::No);
                        w.walk_function_expression(&method.value);
                        w.scope.top_level_scope = outer;
                    }
                    ClassMember::Property(property) => {
                        if let PropKey::Computed(key) = &property.key {
                            w.walk_expression(key);
                        }
                        if let Some(value) = &property.value
                            && hooks.class_body_value.call(|h| h(w, value)) != Some(true)
                        {
                            let outer = w.set_top_level_scope(TopLevelScope::No);
                            w.walk_expression(value);
                            w.scope.top_level_scope = outer;
                        }
                    }
                    ClassMember::StaticBlock(block) => {
                        let outer = w.set_top_level_scope(TopLevelScope::No);
                        w.walk_block_statement(&block.body);
                        w.scope.top_level_scope = outer;
                    }
                }
            }
        });
    }

    // ── Assignment ──────────────────────────────────────────────────────────

    fn walk_assignment_expression(&mut self, expression: &Expr, assign: &AssignExpr) {
        let hooks = self.hooks;
        match &assign.left {
            Pat::Ident(left) => {
                if let Some(rename) = self.get_rename_identifier(&assign.right)
                    && self
                        .call_hooks_for_info(&hooks.can_rename, &rename, |w, h| h(w, &assign.right))
                        .handled()
                        == Some(true)
                {
                    if self
                        .call_hooks_for_info(&hooks.rename, &rename, |w, h| h(w, &assign.right))
                        .handled()
                        != Some(true)
                    {
                        self.rename_variable(&left.name, rename);
                    }
                    return;
                }
                self.walk_expression(&assign.right);
                self.enter_pattern(&assign.left, &mut |w, ident| {
                    if w.call_hooks_for_name(&hooks.assign, &ident.name, |w, h| h(w, expression))
                        != Some(true)
                    {
                        w.walk_identifier(&Expr::Ident(ident.clone()), &ident.name);
                    }
                });
            }
            Pat::Expr(target) => {
                if let Expr::Member(_) = target.as_ref()
                    && let Some(info) =
                        self.get_member_expression_info(target, AllowedMemberTypes::EXPRESSION)
                    && self
                        .call_hooks_for_info(&hooks.assign_member_chain, &info.root_info, |w, h| {
                            h(w, expression, &info.access)
                        })
                        .handled()
                        == Some(true)
                {
                    return;
                }
                self.walk_expression(&assign.right);
                self.walk_expression(target);
            }
            pattern => {
                self.walk_expression(&assign.right);
                self.enter_pattern(pattern, &mut |w, ident| {
                    if w.call_hooks_for_name(&hooks.assign, &ident.name, |w, h| h(w, expression))
                        != Some(true)
                    {
                        w.define_variable(&ident.name);
                    }
                });
                self.walk_pattern(pattern);
            }
        }
    }

    // ── Calls ───────────────────────────────────────────────────────────────

    fn walk_call_expression(&mut self, expression: &Expr, call: &CallExpr) {
        if let Expr::Member(callee) = call.callee.as_ref()
            && let MemberProp::Ident(property) = &callee.property
            && (property.name == "call" || property.name == "bind")
            && let Some((this_arg, rest)) = call.arguments.split_first()
            && let Some(function) = IifeFunction::of(&callee.object)
        {
            self.walk_iife(function, rest, Some(this_arg));
            return;
        }
        if let Some(function) = IifeFunction::of(&call.callee) {
            self.walk_iife(function, &call.arguments, None);
            return;
        }

        let hooks = self.hooks;
        if let Expr::Member(_) = call.callee.as_ref()
            && let Some(info) =
                self.get_member_expression_info(&call.callee, AllowedMemberTypes::CALL_EXPRESSION)
            && let MemberInfoKind::Call {
                call: inner_call,
                callee_members,
                ..
            } = &info.kind
        {
            let chain = CallChain {
                call: inner_call,
                callee_members,
                access: &info.access,
            };
            if self
                .call_hooks_for_info(&hooks.call_member_chain_of_call_member_chain, &info.root_info, |w, h| {
                    h(w, expression, &chain)
                })
                .handled()
                == Some(true)
            {
                return;
            }
        }

        let callee = self.evaluate_expression_cached(&call.callee);
        if let Some(ident) = callee.identifier_value() {
            if self
                .call_hooks_for_info(&hooks.call_member_chain, &ident.root_info, |w, h| {
                    h(w, expression, &ident.access)
                })
                .handled()
                == Some(true)
            {
                return;
            }
            let binding = if ident.access.is_empty() {
                ident.root_info.clone()
            } else {
                Binding::Free(ident.name.clone())
            };
            if self
                .call_hooks_for_info(&hooks.call, &binding, |w, h| h(w, expression))
                .handled()
                == Some(true)
            {
                return;
            }
        }

        match call.callee.as_ref() {
            Expr::Member(member) => {
                self.walk_expression(&member.object);
                if let MemberProp::Computed(property) = &member.property {
                    self.walk_expression(property);
                }
            }
            callee => self.walk_expression(callee),
        }
        self.walk_expressions(&call.arguments);
    }

    /// The binding a parameter should alias when the IIFE passes `argument`,
    /// or `None` after walking `argument` normally.
    fn iife_argument_binding(&mut self, argument: &Expr) -> Option<Binding> {
        let hooks = self.hooks;
        if let Some(rename) = self.get_rename_identifier(argument)
            && self
                .call_hooks_for_info(&hooks.can_rename, &rename, |w, h| h(w, argument))
                .handled()
                == Some(true)
            && self
                .call_hooks_for_info(&hooks.rename, &rename, |w, h| h(w, argument))
                .handled()
                != Some(true)
        {
            return Some(match rename {
                Binding::Free(name) => self.get_variable_info(&name),
                other => other,
            });
        }
        self.walk_expression(argument);
        None
    }

    fn walk_iife(&mut self, function: IifeFunction<'_>, arguments: &[Expr], this_arg: Option<&Expr>) {
        let is_arrow = matches!(function, IifeFunction::Arrow(_));
        let rename_this = this_arg.and_then(|this| self.iife_argument_binding(this));
        let argument_bindings: Vec<Option<Binding>> = arguments
            .iter()
            .map(|argument| self.iife_argument_binding(argument))
            .collect();
        let params = function.params();
        let inner = if self.scope.top_level_scope.is_top_level() && is_arrow {
            TopLevelScope::Arrow
        } else {
            TopLevelScope::No
        };
        let outer = self.set_top_level_scope(inner);
        let scope_params: Vec<&Pat> = params
            .iter()
            .enumerate()
            .filter(|(index, _)| !matches!(argument_bindings.get(*index), Some(Some(_))))
            .map(|(_, param)| &param.pat)
            .collect();
        let id = match function {
            IifeFunction::Fn(f) => f.id.as_ref(),
            IifeFunction::Arrow(_) => None,
        };
        self.in_function_scope(true, scope_params, id, |w| {
            if let Some(this) = rename_this
                && !is_arrow
            {
                w.set_variable("this", this);
            }
            for (param, binding) in params.iter().zip(argument_bindings) {
                if let (Pat::Ident(ident), Some(binding)) = (&param.pat, binding) {
                    w.set_variable(&ident.name, binding);
                }
            }
            match function {
                IifeFunction::Fn(f) => w.walk_function_body(&f.body),
                IifeFunction::Arrow(a) => match &a.body {
                    ArrowBody::Block(body) => w.walk_function_body(body),
                    ArrowBody::Expr(body) => w.walk_expression(body),
                },
            }
        });
        self.scope.top_level_scope = outer;
    }

    // ── Member chains ───────────────────────────────────────────────────────

    fn walk_member_expression(&mut self, expression: &Expr, member: &MemberExpr) {
        let hooks = self.hooks;
        if let Some(info) = self.get_member_expression_info(expression, AllowedMemberTypes::ALL) {
            match &info.kind {
                MemberInfoKind::Expression => {
                    let binding = if info.access.is_empty() {
                        info.root_info.clone()
                    } else {
                        Binding::Free(info.name.clone())
                    };
                    if self
                        .call_hooks_for_info(&hooks.expression, &binding, |w, h| h(w, expression))
                        .handled()
                        == Some(true)
                    {
                        return;
                    }
                    if self
                        .call_hooks_for_info(&hooks.expression_member_chain, &info.root_info, |w, h| {
                            h(w, expression, &info.access)
                        })
                        .handled()
                        == Some(true)
                    {
                        return;
                    }
                    let mut name = info.name.clone();
                    let mut access = info.access.clone();
                    self.walk_member_expression_with_expression_name(
                        expression,
                        &mut name,
                        &mut access,
                        (expression, &info.root_info, &info.access),
                    );
                    return;
                }
                MemberInfoKind::Call {
                    call,
                    callee_members,
                    ..
                } => {
                    let chain = CallChain {
                        call,
                        callee_members,
                        access: &info.access,
                    };
                    if self
                        .call_hooks_for_info(&hooks.member_chain_of_call_member_chain, &info.root_info, |w, h| {
                            h(w, expression, &chain)
                        })
                        .handled()
                        == Some(true)
                    {
                        return;
                    }
                    self.walk_expression(call);
                    return;
                }
            }
        }
        self.walk_expression(&member.object);
        if let MemberProp::Computed(property) = &member.property {
            self.walk_expression(property);
        }
    }

    /// Walk the objects of a free-name member chain from the outside in,
    /// firing `expression` for each shorter prefix (`a.b.c`, then `a.b`).
    ///
    /// `chain` is the full chain with its root binding and access, given to
    /// `unhandled_expression_member_chain` once the root is reached.
    fn walk_member_expression_with_expression_name(
        &mut self,
        expression: &Expr,
        name: &mut String,
        access: &mut MemberAccess,
        chain: (&Expr, &Binding, &MemberAccess),
    ) {
        let Expr::Member(member) = expression else {
            return;
        };
        let hooks = self.hooks;
        if let Expr::Member(_) = member.object.as_ref() {
            if let Some(last) = access.members.last() {
                name.truncate(name.len().saturating_sub(last.len() + 1));
            }
            access.pop();
            let handled = self
                .call_hooks_for_info(&hooks.expression, &Binding::Free(name.clone()), |w, h| {
                    h(w, &member.object)
                })
                .handled()
                == Some(true);
            if !handled {
                self.walk_member_expression_with_expression_name(&member.object, name, access, chain);
            }
        } else if self
            .call_hooks_for_info(&hooks.unhandled_expression_member_chain, chain.1, |w, h| {
                h(w, chain.0, chain.2)
            })
            .handled()
            != Some(true)
        {
            self.walk_expression(&member.object);
        }
        if let MemberProp::Computed(property) = &member.property {
            self.walk_expression(property);
        }
    }

    // ── Patterns ────────────────────────────────────────────────────────────

    /// Call `on_ident` for every identifier `pattern` binds, unless a
    /// `pattern` hook claims it.
    pub fn enter_pattern(&mut self, pattern: &Pat, on_ident: &mut dyn FnMut(&mut Self, &Ident)) {
        match pattern {
            Pat::Ident(ident) => self.enter_identifier(ident, on_ident),
            Pat::Array(array) => {
                for element in array.elements.iter().flatten() {
                    self.enter_pattern(element, on_ident);
                }
            }
            Pat::Assign(assign) => self.enter_pattern(&assign.left, on_ident),
            Pat::Object(object) => {
                for property in &object.properties {
                    match property {
                        ObjectPatProp::KeyValue(kv) => self.enter_pattern(&kv.value, on_ident),
                        ObjectPatProp::Assign(shorthand) => {
                            self.scope.in_short_hand = Some(shorthand.key.name.clone());
                            self.enter_identifier(&shorthand.key, on_ident);
                            self.scope.in_short_hand = None;
                        }
                        ObjectPatProp::Rest(rest) => self.enter_pattern(&rest.argument, on_ident),
                    }
                }
            }
            Pat::Rest(rest) => self.enter_pattern(&rest.argument, on_ident),
            Pat::Expr(_) => {}
        }
    }

    pub fn enter_identifier(&mut self, ident: &Ident, on_ident: &mut dyn FnMut(&mut Self, &Ident)) {
        let hooks = self.hooks;
        if self.call_hooks_for_name(&hooks.pattern, &ident.name, |w, h| h(w, ident)) != Some(true) {
            on_ident(self, ident);
        }
    }

    /// Walk the expressions inside a pattern: defaults, computed keys and
    /// member targets.
    pub(crate) fn walk_pattern(&mut self, pattern: &Pat) {
        match pattern {
            Pat::Ident(_) => {}
            Pat::Array(array) => {
                for element in array.elements.iter().flatten() {
                    self.walk_pattern(element);
                }
            }
            Pat::Assign(assign) => {
                self.walk_expression(&assign.right);
                self.walk_pattern(&assign.left);
            }
            Pat::Object(object) => {
                for property in &object.properties {
                    match property {
                        ObjectPatProp::KeyValue(kv) => {
                            if let PropKey::Computed(key) = &kv.key {
                                self.walk_expression(key);
                            }
                            self.walk_pattern(&kv.value);
                        }
                        ObjectPatProp::Assign(shorthand) => {
                            if let Some(default) = &shorthand.value {
                                self.walk_expression(default);
                            }
                        }
                        ObjectPatProp::Rest(rest) => self.walk_pattern(&rest.argument),
                    }
                }
            }
            Pat::Rest(rest) => self.walk_pattern(&rest.argument),
            Pat::Expr(target) => self.walk_expression(target),
        }
    }

    // ── Purity ──────────────────────────────────────────────────────────────

    /// Whether evaluating `expr` can be dropped without observable effect.
    ///
    /// `comments_start` is where to look for a `/*#__PURE__*/` annotation
    /// belonging to a call.
    pub fn is_pure(&mut self, expr: &Expr, comments_start: usize) -> bool {
        let hooks = self.hooks;
        if let Some(result) = hooks.is_pure.call(&expr.kind(), |h| h(self, expr, comments_start)) {
            return result;
        }
        match expr {
            Expr::Class(class) => {
                let start = class.loc.start.offset;
                if let Some(super_class) = &class.super_class
                    && !self.is_pure(super_class, start)
                {
                    return false;
                }
                let has_super = class.super_class.is_some();
                class.body.body.iter().all(|member| match member {
                    ClassMember::StaticBlock(_) => false,
                    ClassMember::Method(method) => {
                        if let PropKey::Computed(key) = &method.key
                            && !self.is_pure(key, method.loc.start.offset)
                        {
                            return false;
                        }
                        !(has_super && method.kind == MethodKind::Constructor)
                    }
                    ClassMember::Property(property) => {
                        if let PropKey::Computed(key) = &property.key
                            && !self.is_pure(key, property.loc.start.offset)
                        {
                            return false;
                        }
                        match &property.value {
                            Some(value) if property.is_static => {
                                self.is_pure(value, property.key.loc().end.offset)
                            }
                            _ => true,
                        }
                    }
                })
            }
            Expr::Fn(_)
            | Expr::Arrow(_)
            | Expr::This(_)
            | Expr::Ident(_)
            | Expr::Null(_)
            | Expr::Bool(_)
            | Expr::Num(_)
            | Expr::Str(_)
            | Expr::BigInt(_)
            | Expr::Regexp(_) => true,
            Expr::Template(template) => {
                let mut start = comments_start;
                template.expressions.iter().all(|item| {
                    let pure = self.is_pure(item, start);
                    start = item.loc().end.offset;
                    pure
                })
            }
            Expr::Conditional(conditional) => {
                self.is_pure(&conditional.test, comments_start)
                    && self.is_pure(&conditional.consequent, conditional.test.loc().end.offset)
                    && self.is_pure(&conditional.alternate, conditional.consequent.loc().end.offset)
            }
            Expr::Logical(logical) => {
                self.is_pure(&logical.left, comments_start)
                    && self.is_pure(&logical.right, logical.left.loc().end.offset)
            }
            Expr::Sequence(sequence) => {
                let mut start = comments_start;
                sequence.expressions.iter().all(|item| {
                    let pure = self.is_pure(item, start);
                    start = item.loc().end.offset;
                    pure
                })
            }
            Expr::Call(call) => {
                let call_start = expr.loc().start.offset;
                let annotated = call_start.saturating_sub(comments_start) > 12
                    && self
                        .get_comments(comments_start, call_start)
                        .iter()
                        .any(|c| c.kind == CommentKind::Block && PURE_ANNOTATION.is_match(&c.text));
                if !annotated {
                    return false;
                }
                let mut start = call.callee.loc().end.offset;
                call.arguments.iter().all(|argument| {
                    if let Expr::Spread(_) = argument {
                        return false;
                    }
                    let pure = self.is_pure(argument, start);
                    start = argument.loc().end.offset;
                    pure
                })
            }
            _ => !self.evaluate_expression(expr).could_have_side_effects(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use crate::analyzer::scope::Tag;
    use crate::analyzer::{Analyzer, AnalyzerOptions};
    use crate::parser::ast::{Expr, Stmt};

    #[derive(Default)]
    struct Log(Vec<String>);

    fn analyzer() -> Analyzer<Log> {
        Analyzer::new(AnalyzerOptions::default()).expect("options")
    }

    fn record_calls(a: &mut Analyzer<Log>, name: &'static str) {
        a.hooks_mut().call.for_name(name).tap("test", move |w, _| {
            w.state_mut().0.push(name.to_string());
            Some(true)
        });
    }

    #[test]
    fn test_member_call_gated_by_block_shadow() {
        let mut a = analyzer();
        record_calls(&mut a, "cde.ddd.abc");
        let source = "cde.ddd.abc(); { let cde = {}; cde.ddd.abc(); } cde.ddd.abc();";
        let log = a.parse(source, Log::default()).expect("parses");
        assert_eq!(log.0, vec!["cde.ddd.abc", "cde.ddd.abc"]);
    }

    #[test]
    fn test_alias_through_can_rename() {
        let mut a = analyzer();
        a.hooks_mut().can_rename.for_name("require").tap("test", |_, _| Some(true));
        record_calls(&mut a, "require");
        let log = a
            .parse("var r = require; r('a'); function f(require) { require('b') }", Log::default())
            .expect("parses");
        assert_eq!(log.0, vec!["require"]);
    }

    #[test]
    fn test_iife_parameter_aliases_argument() {
        let mut a = analyzer();
        a.hooks_mut().can_rename.for_name("define").tap("test", |_, _| Some(true));
        record_calls(&mut a, "define");
        let log = a
            .parse("(function (d) { d([]); })(define);", Log::default())
            .expect("parses");
        assert_eq!(log.0, vec!["define"]);
    }

    #[test]
    fn test_iife_this_binding() {
        let mut a = analyzer();
        a.hooks_mut().can_rename.for_name("window").tap("test", |_, _| Some(true));
        a.hooks_mut().expression.for_name("window").tap("test", |w, _| {
            w.state_mut().0.push("window".into());
            Some(true)
        });
        let log = a
            .parse("(function () { this; }).call(window);", Log::default())
            .expect("parses");
        assert_eq!(log.0, vec!["window"]);
    }

    #[test]
    fn test_expression_hook_fires_for_each_chain_prefix() {
        let mut a = analyzer();
        for name in ["a.b.c", "a.b"] {
            a.hooks_mut().expression.for_name(name).tap("test", move |w, _| {
                w.state_mut().0.push(name.to_string());
                None
            });
        }
        let log = a.parse("a.b.c;", Log::default()).expect("parses");
        assert_eq!(log.0, vec!["a.b.c", "a.b"]);
    }

    #[test]
    fn test_call_rooted_member_chain() {
        let mut a = analyzer();
        a.hooks_mut()
            .member_chain_of_call_member_chain
            .for_name("require")
            .tap("test", |w, _, chain| {
                let members = chain.access.members.join(".");
                w.state_mut().0.push(members);
                Some(true)
            });
        let log = a.parse("require('x').a.b;", Log::default()).expect("parses");
        assert_eq!(log.0, vec!["a.b"]);
    }

    #[test]
    fn test_typeof_hook() {
        let mut a = analyzer();
        a.hooks_mut().type_of.for_name("module").tap("test", |w, e| {
            assert!(matches!(e, Expr::Unary(_)));
            w.state_mut().0.push("typeof module".into());
            Some(true)
        });
        let log = a.parse("if (typeof module === 'object') {}", Log::default()).expect("parses");
        assert_eq!(log.0, vec!["typeof module"]);
    }

    #[test]
    fn test_tag_hooks_see_tag_data() {
        const IMPORTED: Tag = Tag::new("imported");
        let mut a = analyzer();
        a.hooks_mut().import_specifier.tap("test", |w, _, binding| {
            w.tag_variable(&binding.local.name, IMPORTED, Rc::new(binding.source.to_string()));
            Some(true)
        });
        a.hooks_mut().expression.for_tag(IMPORTED).tap("test", |w, _| {
            let source = w.current_tag_data::<String>()?;
            w.state_mut().0.push(source.to_string());
            Some(true)
        });
        let log = a
            .parse("import x from './x'; x; function f(x) { x; }", Log::default())
            .expect("parses");
        assert_eq!(log.0, vec!["./x"]);
    }

    #[test]
    fn test_statement_level_sequence() {
        let mut a = analyzer();
        a.hooks_mut().call.for_name("f").tap("test", |w, e| {
            let level = w.is_statement_level_expression(e);
            w.state_mut().0.push(level.to_string());
            Some(true)
        });
        let log = a.parse("f(), f(); g(f());", Log::default()).expect("parses");
        assert_eq!(log.0, vec!["true", "true", "false"]);
    }

    #[test]
    fn test_logical_operator_decision() {
        let mut a = analyzer();
        a.hooks_mut().expression_logical_operator.tap("test", |_, _| Some(false));
        record_calls(&mut a, "f");
        let log = a.parse("x && f();", Log::default()).expect("parses");
        assert!(log.0.is_empty());
    }

    #[test]
    fn test_pure_annotation() {
        let mut a = analyzer();
        a.hooks_mut().statement.tap("test", |w, stmt| {
            if let Stmt::VarDecl(decl) = stmt
                && let Some(init) = &decl.declarators[0].init
            {
                let pure = w.is_pure(init, decl.declarators[0].id.loc().end.offset);
                w.state_mut().0.push(pure.to_string());
            }
            None
        });
        let source = "var a = /*#__PURE__*/ f(1);\nvar b = f(1);\nvar c = 1 + 2;\nvar d = x ? 1 : g();";
        let log = a.parse(source, Log::default()).expect("parses");
        assert_eq!(log.0, vec!["true", "false", "true", "false"]);
    }

    #[test]
    fn test_assign_defines_pattern_targets() {
        let mut a = analyzer();
        record_calls(&mut a, "g");
        let log = a.parse("[g] = [1]; g();", Log::default()).expect("parses");
        assert!(log.0.is_empty());
    }
}
