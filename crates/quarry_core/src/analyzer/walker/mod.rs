//! The three-phase AST walker.
//!
//! [`Walker::run`] visits a program in three passes per block:
//!
//! 1. **pre-walk** hoists `var` bindings and function declarations,
//! 2. **block pre-walk** declares `let`/`const`/`class` bindings and imports
//!    of the current block,
//! 3. **walk** visits statements and expressions in source order, entering
//!    scopes and calling hooks.
//!
//! Hook handlers receive `&mut Walker` and can query scope state, evaluate
//! sub-expressions and update their own state object through
//! [`Walker::state_mut`].

mod expressions;
mod statements;

use std::rc::Rc;

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::analyzer::evaluated::EvaluatedExpression;
use crate::analyzer::hooks::{AnalyzerHooks, NameHookMap};
use crate::analyzer::member_chain::{AllowedMemberTypes, MemberExpressionInfo, member_expression_info};
use crate::analyzer::options::AnalyzerOptions;
use crate::analyzer::scope::{Binding, FreeName, ScopeInfo, Tag, TagData, TopLevelScope, VariableInfo};
use crate::parser::Comment;
use crate::parser::ast::{Expr, Ident, NodeKey, Pat, Program, Stmt};
use crate::parser::scanner::Span;

/// Definition maps deeper than this are flattened when a scope is entered.
const COMPRESS_DEPTH: usize = 32;

/// Outcome of dispatching a hook map for one binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch<R> {
    /// A tag or name handler produced a result.
    Handled(R),
    /// No handler answered; the binding resolves to this free name.
    Free(String),
    /// The binding is a genuine local.
    Defined,
}

impl<R> Dispatch<R> {
    pub fn handled(self) -> Option<R> {
        match self {
            Dispatch::Handled(result) => Some(result),
            _ => None,
        }
    }
}

/// A property read by a destructuring pattern, e.g. `a` and `b` in
/// `const { a, b: c } = expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct DestructuringKey {
    pub id: String,
    pub range: Span,
    /// Set when the property was written in shorthand form (`{ a }`).
    pub shorthand: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PathEntry {
    span: Span,
    /// The expression this entry stands for, when it is an expression
    /// statement or one element of a statement-level sequence.
    expression: Option<NodeKey>,
}

impl PathEntry {
    fn statement(stmt: &Stmt) -> Self {
        Self {
            span: stmt.loc(),
            expression: match stmt {
                Stmt::Expr(s) => Some(s.expr.key()),
                _ => None,
            },
        }
    }

    fn expression(expr: &Expr) -> Self {
        Self {
            span: expr.loc(),
            expression: Some(expr.key()),
        }
    }
}

/// Traversal state for one program.
pub struct Walker<'a, S> {
    pub(crate) hooks: &'a AnalyzerHooks<S>,
    options: &'a AnalyzerOptions,
    magic_comment: &'a Regex,
    state: S,
    scope: ScopeInfo,
    comments: &'a [Comment],
    semicolons: FxHashSet<usize>,
    statement_path: Vec<PathEntry>,
    prev_statement: Option<PathEntry>,
    destructuring_assignment_properties: FxHashMap<NodeKey, Vec<DestructuringKey>>,
    current_tag_data: Option<TagData>,
    pub(crate) evaluation_cache: FxHashMap<NodeKey, EvaluatedExpression>,
}

impl<'a, S> Walker<'a, S> {
    pub(crate) fn new(
        hooks: &'a AnalyzerHooks<S>,
        options: &'a AnalyzerOptions,
        magic_comment: &'a Regex,
        state: S,
        comments: &'a [Comment],
        semicolons: FxHashSet<usize>,
        is_strict: bool,
    ) -> Self {
        Self {
            hooks,
            options,
            magic_comment,
            state,
            scope: ScopeInfo::root(is_strict),
            comments,
            semicolons,
            statement_path: Vec::new(),
            prev_statement: None,
            destructuring_assignment_properties: FxHashMap::default(),
            current_tag_data: None,
            evaluation_cache: FxHashMap::default(),
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    pub fn options(&self) -> &AnalyzerOptions {
        self.options
    }

    /// The scope currently being walked.
    pub fn scope(&self) -> &ScopeInfo {
        &self.scope
    }

    /// Walk `program` through all three passes, then run `finish`.
    pub fn run(&mut self, program: &Program) {
        let hooks = self.hooks;
        let comments = self.comments;
        if hooks.program.call(|h| h(self, program, comments)) != Some(true) {
            self.detect_mode(&program.body);
            self.pre_walk_statements(&program.body);
            self.prev_statement = None;
            self.block_pre_walk_statements(&program.body);
            self.prev_statement = None;
            self.walk_statements(&program.body);
            debug!(
                statements = program.body.len(),
                destructured = self.destructuring_assignment_properties.len(),
                "walk finished"
            );
        } else {
            debug!("program hook skipped the walk");
        }
        hooks.finish.call(|h| h(self, program, comments));
        self.destructuring_assignment_properties.clear();
        self.evaluation_cache.clear();
        self.statement_path.clear();
        self.prev_statement = None;
    }

    // ── Scope transitions ───────────────────────────────────────────────────

    fn enter_scope(&mut self, keep_try: bool) -> ScopeInfo {
        let mut child = self.scope.child(keep_try);
        if child.depth() > COMPRESS_DEPTH {
            child.definitions.compress();
        }
        std::mem::replace(&mut self.scope, child)
    }

    /// Run `f` in a nested block scope.
    pub fn in_block_scope(&mut self, f: impl FnOnce(&mut Self)) {
        let outer = self.enter_scope(true);
        f(self);
        self.scope = outer;
    }

    /// Run `f` in a function scope with `params` (and the function's own
    /// name, if any) declared.
    ///
    /// Arrow functions pass `has_this = false` so `this` keeps whatever it
    /// resolves to outside.
    pub fn in_function_scope<'p>(
        &mut self,
        has_this: bool,
        params: impl IntoIterator<Item = &'p Pat>,
        id: Option<&Ident>,
        f: impl FnOnce(&mut Self),
    ) {
        let outer = self.enter_scope(false);
        if has_this {
            self.undefine_variable("this");
        }
        for param in params {
            self.enter_pattern(param, &mut |w, ident| w.define_variable(&ident.name));
        }
        if let Some(id) = id {
            self.enter_identifier(id, &mut |w, ident| w.define_variable(&ident.name));
        }
        f(self);
        self.scope = outer;
    }

    /// Run `f` in a class body scope; class bodies are always strict.
    pub fn in_class_scope(&mut self, id: Option<&Ident>, f: impl FnOnce(&mut Self)) {
        let outer = self.enter_scope(false);
        self.scope.is_strict = true;
        self.undefine_variable("this");
        if let Some(id) = id {
            self.enter_identifier(id, &mut |w, ident| w.define_variable(&ident.name));
        }
        f(self);
        self.scope = outer;
    }

    /// Turn on strict mode for the current scope on a `"use strict"`
    /// directive.
    pub(crate) fn detect_mode(&mut self, body: &[Stmt]) {
        if let Some(Stmt::Expr(first)) = body.first()
            && let Expr::Str(directive) = first.expr.as_ref()
            && directive.value == "use strict"
        {
            self.scope.is_strict = true;
        }
    }

    pub(crate) fn set_top_level_scope(&mut self, top_level: TopLevelScope) -> TopLevelScope {
        std::mem::replace(&mut self.scope.top_level_scope, top_level)
    }

    // ── Variables ───────────────────────────────────────────────────────────

    /// What `name` resolves to in the current scope.
    pub fn get_variable_info(&self, name: &str) -> Binding {
        self.scope
            .definitions
            .lookup(name)
            .unwrap_or_else(|| Binding::Free(name.to_string()))
    }

    /// Bind `name` to `binding` in the current scope.
    ///
    /// Binding a name to its own free name removes the local binding.
    pub fn set_variable(&mut self, name: &str, binding: Binding) {
        match binding {
            Binding::Free(free) if free == name => self.scope.definitions.delete(name),
            Binding::Free(free) => {
                let info = VariableInfo::new(self.scope.id(), FreeName::Name(free));
                self.scope
                    .definitions
                    .set(name.to_string(), Binding::Info(Rc::new(info)));
            }
            other => self.scope.definitions.set(name.to_string(), other),
        }
    }

    /// Declare `name` in the current scope.
    ///
    /// A name already carrying information from this very scope keeps it,
    /// so tags attached during hoisting survive the declaration.
    pub fn define_variable(&mut self, name: &str) {
        if let Some(Binding::Info(info)) = self.scope.definitions.lookup(name)
            && info.declared_scope == self.scope.id()
        {
            return;
        }
        let scope = self.scope.id();
        self.scope
            .definitions
            .set(name.to_string(), Binding::Declared(scope));
    }

    pub fn undefine_variable(&mut self, name: &str) {
        self.scope.definitions.delete(name);
    }

    /// Whether `name` is bound locally (and not as an alias of a free name).
    pub fn is_variable_defined(&self, name: &str) -> bool {
        match self.scope.definitions.lookup(name) {
            None => false,
            Some(Binding::Free(_)) => false,
            Some(Binding::Declared(_)) => true,
            Some(Binding::Info(info)) => info.free_name == FreeName::Local,
        }
    }

    /// Attach `tag` with `data` to `name`.
    ///
    /// An unbound name becomes an alias of itself so free-name hooks keep
    /// applying; a locally declared name stays local.
    pub fn tag_variable(&mut self, name: &str, tag: Tag, data: TagData) {
        let info = match self.scope.definitions.lookup(name) {
            None | Some(Binding::Free(_)) => {
                VariableInfo::new(self.scope.id(), FreeName::Name(name.to_string())).with_tag(tag, data)
            }
            Some(Binding::Info(old)) => old.with_tag(tag, data),
            Some(Binding::Declared(scope)) => VariableInfo::new(scope, FreeName::Local).with_tag(tag, data),
        };
        self.scope
            .definitions
            .set(name.to_string(), Binding::Info(Rc::new(info)));
    }

    /// Data most recently attached to `name` under `tag`.
    pub fn get_tag_data<T: 'static>(&self, name: &str, tag: Tag) -> Option<Rc<T>> {
        match self.scope.definitions.lookup(name)? {
            Binding::Info(info) => info.tag_data(tag)?.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Tag data of the tag hook currently running.
    pub fn current_tag_data<T: 'static>(&self) -> Option<Rc<T>> {
        self.current_tag_data.clone()?.downcast::<T>().ok()
    }

    /// The binding of `name` together with the free name it stands for, or
    /// `None` when `name` is a genuine local.
    pub fn get_free_info_from_variable(&self, name: &str) -> Option<(Binding, String)> {
        let binding = self.get_variable_info(name);
        let free = binding.free_name()?.to_string();
        Some((binding, free))
    }

    /// Classify `expr` as a member chain rooted in a free name or call.
    pub fn get_member_expression_info<'e>(
        &self,
        expr: &'e Expr,
        allowed: AllowedMemberTypes,
    ) -> Option<MemberExpressionInfo<'e>> {
        member_expression_info(expr, allowed, |name| self.get_free_info_from_variable(name))
    }

    /// The binding a variable initialized or assigned with `expr` should
    /// alias, when `expr` evaluates to a free identifier or member chain.
    pub fn get_rename_identifier(&mut self, expr: &Expr) -> Option<Binding> {
        let evaluated = self.evaluate_expression_cached(expr);
        let ident = evaluated.identifier_value()?;
        Some(if ident.access.is_empty() {
            ident.root_info.clone()
        } else {
            Binding::Free(ident.name.clone())
        })
    }

    /// Alias `name` to `binding`, resolving free names first.
    pub(crate) fn rename_variable(&mut self, name: &str, binding: Binding) {
        let binding = match binding {
            Binding::Free(free) => self.get_variable_info(&free),
            other => other,
        };
        self.set_variable(name, binding);
    }

    // ── Hook dispatch ───────────────────────────────────────────────────────

    /// Dispatch `hook_map` for `info`.
    ///
    /// Tag hooks run first, newest tag first, with
    /// [`current_tag_data`](Self::current_tag_data) set; then the hook for
    /// the free name.  Locals never reach name hooks.
    pub fn call_hooks_for_info<F: ?Sized, R>(
        &mut self,
        hook_map: &NameHookMap<F>,
        info: &Binding,
        mut invoke: impl FnMut(&mut Self, &F) -> Option<R>,
    ) -> Dispatch<R> {
        let name = match info {
            Binding::Free(name) => name.clone(),
            Binding::Declared(_) => return Dispatch::Defined,
            Binding::Info(variable) => {
                let variable = Rc::clone(variable);
                for (tag, data) in variable.tags() {
                    let Some(hook) = hook_map.get_tag(tag) else {
                        continue;
                    };
                    let outer = self.current_tag_data.replace(Rc::clone(data));
                    let result = hook.call(|h| invoke(self, h));
                    self.current_tag_data = outer;
                    if let Some(result) = result {
                        return Dispatch::Handled(result);
                    }
                }
                match variable.free_name() {
                    Some(name) => name.to_string(),
                    None => return Dispatch::Defined,
                }
            }
        };
        if let Some(hook) = hook_map.get_name(&name)
            && let Some(result) = hook.call(|h| invoke(self, h))
        {
            return Dispatch::Handled(result);
        }
        Dispatch::Free(name)
    }

    /// Dispatch `hook_map` for whatever `name` resolves to.
    pub fn call_hooks_for_name<F: ?Sized, R>(
        &mut self,
        hook_map: &NameHookMap<F>,
        name: &str,
        invoke: impl FnMut(&mut Self, &F) -> Option<R>,
    ) -> Option<R> {
        let info = self.get_variable_info(name);
        self.call_hooks_for_info(hook_map, &info, invoke).handled()
    }

    /// Dispatch `hook_map` for the free-name chain `expr` stands for.
    ///
    /// Plain identifiers dispatch on their binding, so tags apply; member
    /// chains dispatch on their dotted name.
    pub fn call_hooks_for_expression<F: ?Sized, R>(
        &mut self,
        hook_map: &NameHookMap<F>,
        expr: &Expr,
        invoke: impl FnMut(&mut Self, &F) -> Option<R>,
    ) -> Option<R> {
        let info = self.get_member_expression_info(expr, AllowedMemberTypes::EXPRESSION)?;
        let binding = if info.access.is_empty() {
            info.root_info
        } else {
            Binding::Free(info.name)
        };
        self.call_hooks_for_info(hook_map, &binding, invoke).handled()
    }

    // ── Statement path ──────────────────────────────────────────────────────

    fn push_statement(&mut self, stmt: &Stmt) {
        self.statement_path.push(PathEntry::statement(stmt));
    }

    fn pop_statement(&mut self) {
        self.prev_statement = self.statement_path.pop();
    }

    /// Span of the innermost statement being visited.
    pub fn current_statement(&self) -> Option<Span> {
        self.statement_path.last().map(|entry| entry.span)
    }

    /// Whether `expr` is the whole of the current statement (or one element
    /// of a sequence that is).
    pub fn is_statement_level_expression(&self, expr: &Expr) -> bool {
        self.statement_path
            .last()
            .is_some_and(|entry| entry.expression == Some(expr.key()))
    }

    /// Whether a semicolon was inserted automatically at `offset`, at the
    /// end of the current statement or just before it.
    pub fn is_asi_position(&self, offset: usize) -> bool {
        let Some(current) = self.statement_path.last() else {
            return false;
        };
        (current.span.end.offset == offset && self.semicolons.contains(&offset))
            || (current.span.start.offset == offset
                && self
                    .prev_statement
                    .is_some_and(|prev| self.semicolons.contains(&prev.span.end.offset)))
    }

    pub fn set_asi_position(&mut self, offset: usize) {
        self.semicolons.insert(offset);
    }

    pub fn unset_asi_position(&mut self, offset: usize) {
        self.semicolons.remove(&offset);
    }

    /// Keys a destructuring pattern reads from `expr`, recorded during the
    /// block pre-walk.
    pub fn destructuring_assignment_properties_for(&self, expr: &Expr) -> Option<&[DestructuringKey]> {
        self.destructuring_assignment_properties
            .get(&expr.key())
            .map(Vec::as_slice)
    }

    // ── Comments ────────────────────────────────────────────────────────────

    /// Comments lying entirely inside `start..end`.
    pub fn get_comments(&self, start: usize, end: usize) -> &'a [Comment] {
        crate::analyzer::comments::comments_in_range(self.comments, start, end)
    }

    pub(crate) fn magic_comment(&self) -> &'a Regex {
        self.magic_comment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;

    const MARK: Tag = Tag::new("mark");
    const OTHER: Tag = Tag::new("other");

    fn with_walker<R>(f: impl FnOnce(&mut Walker<'_, ()>) -> R) -> R {
        let analyzer: Analyzer<()> = Analyzer::new(AnalyzerOptions::default()).expect("options");
        analyzer.with_walker((), f)
    }

    #[test]
    fn test_define_and_shadow() {
        with_walker(|w| {
            assert!(!w.is_variable_defined("x"));
            w.define_variable("x");
            assert!(w.is_variable_defined("x"));
            w.in_block_scope(|w| {
                w.undefine_variable("x");
                assert!(!w.is_variable_defined("x"));
            });
            assert!(w.is_variable_defined("x"));
        });
    }

    #[test]
    fn test_set_variable_to_own_name_removes_binding() {
        with_walker(|w| {
            w.set_variable("r", Binding::Free("require".into()));
            assert_eq!(w.get_variable_info("r").free_name(), Some("require"));
            assert!(!w.is_variable_defined("r"));
            w.set_variable("r", Binding::Free("r".into()));
            assert_eq!(w.get_variable_info("r"), Binding::Free("r".into()));
        });
    }

    #[test]
    fn test_tags_accumulate() {
        with_walker(|w| {
            w.tag_variable("a", MARK, Rc::new(1_u8));
            w.tag_variable("a", OTHER, Rc::new("two"));
            assert_eq!(w.get_tag_data::<u8>("a", MARK).as_deref(), Some(&1));
            assert_eq!(w.get_tag_data::<&str>("a", OTHER).as_deref(), Some(&"two"));
            assert_eq!(w.get_variable_info("a").free_name(), Some("a"));
        });
    }

    #[test]
    fn test_define_keeps_tags_from_same_scope() {
        with_walker(|w| {
            w.tag_variable("a", MARK, Rc::new(()));
            w.define_variable("a");
            assert!(w.get_tag_data::<()>("a", MARK).is_some());
            w.in_block_scope(|w| {
                w.define_variable("a");
                assert!(w.get_tag_data::<()>("a", MARK).is_none());
            });
        });
    }

    #[test]
    fn test_tagging_a_local_keeps_it_local() {
        with_walker(|w| {
            w.define_variable("l");
            w.tag_variable("l", MARK, Rc::new(()));
            assert!(w.is_variable_defined("l"));
            assert!(w.get_free_info_from_variable("l").is_none());
        });
    }

    #[test]
    fn test_function_scope_hides_this_alias() {
        with_walker(|w| {
            w.set_variable("this", Binding::Free("module.exports".into()));
            w.in_function_scope(false, [] as [&Pat; 0], None, |w| {
                assert_eq!(w.get_variable_info("this").free_name(), Some("module.exports"));
            });
            w.in_function_scope(true, [] as [&Pat; 0], None, |w| {
                assert_eq!(w.get_variable_info("this"), Binding::Free("this".into()));
            });
        });
    }

    #[test]
    fn test_class_scope_is_strict() {
        with_walker(|w| {
            assert!(!w.scope().is_strict);
            w.in_class_scope(None, |w| assert!(w.scope().is_strict));
            assert!(!w.scope().is_strict);
        });
    }
}
