//! Interception points the walker and evaluator call out to.
//!
//! Every hook is a *bail* hook: taps run in registration order and the first
//! one returning `Some` decides the outcome; the rest are skipped.  Keyed
//! hooks live in a [`HookMap`] and are created on first access, so plugins
//! register handlers with
//!
//! ```ignore
//! analyzer.hooks_mut().call.for_name("require").tap("deps", |walker, expr| {
//!     // …
//!     Some(true)
//! });
//! ```
//!
//! For hooks returning `bool`, `Some(true)` means "handled": the walker
//! skips its default processing.  Hooks whose result is a decision
//! (`statement_if`, `expression_conditional_operator`,
//! `expression_logical_operator`) use the value itself.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::analyzer::evaluated::EvaluatedExpression;
use crate::analyzer::member_chain::MemberAccess;
use crate::analyzer::scope::Tag;
use crate::analyzer::walker::Walker;
use crate::parser::ast::{ClassMember, Expr, ExprKind, Ident, Program, Stmt, VarDeclarator};
use crate::parser::scanner::Span;
use crate::parser::Comment;

struct Tap<F: ?Sized> {
    plugin: String,
    handler: Box<F>,
}

/// An ordered list of handlers with bail semantics.
pub struct Hook<F: ?Sized> {
    name: &'static str,
    taps: Vec<Tap<F>>,
}

impl<F: ?Sized> Hook<F> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            taps: Vec::new(),
        }
    }

    /// Whether any handler is registered.
    pub fn is_used(&self) -> bool {
        !self.taps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    fn push(&mut self, plugin: &str, handler: Box<F>) {
        self.taps.push(Tap {
            plugin: plugin.to_string(),
            handler,
        });
    }

    /// Run handlers in order until one returns `Some`.
    pub fn call<R>(&self, mut invoke: impl FnMut(&F) -> Option<R>) -> Option<R> {
        for tap in &self.taps {
            if let Some(result) = invoke(&tap.handler) {
                trace!(hook = self.name, plugin = %tap.plugin, "hook bailed");
                return Some(result);
            }
        }
        None
    }
}

impl<F: ?Sized> fmt::Debug for Hook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("plugins", &self.taps.iter().map(|t| &t.plugin).collect::<Vec<_>>())
            .finish()
    }
}

/// Hooks keyed by name, node kind or tag, created lazily.
pub struct HookMap<K, F: ?Sized> {
    name: &'static str,
    hooks: FxHashMap<K, Hook<F>>,
}

impl<K: Eq + Hash, F: ?Sized> HookMap<K, F> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            hooks: FxHashMap::default(),
        }
    }

    /// The hook for `key`, created if missing.
    pub fn for_key(&mut self, key: impl Into<K>) -> &mut Hook<F> {
        let name = self.name;
        self.hooks.entry(key.into()).or_insert_with(|| Hook::new(name))
    }

    /// The hook for `key`, if one was ever requested.
    pub fn get<Q>(&self, key: &Q) -> Option<&Hook<F>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.hooks.get(key)
    }

    /// Run the hook for `key`, if any.
    pub fn call<Q, R>(&self, key: &Q, invoke: impl FnMut(&F) -> Option<R>) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key)?.call(invoke)
    }
}

impl<K, F: ?Sized> fmt::Debug for HookMap<K, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookMap")
            .field("name", &self.name)
            .field("keys", &self.hooks.len())
            .finish()
    }
}

/// Hooks keyed by free name, plus hooks keyed by tag for tagged variables.
///
/// The walker resolves which of the two applies; see
/// [`Walker::call_hooks_for_info`].
pub struct NameHookMap<F: ?Sized> {
    names: HookMap<String, F>,
    tags: HookMap<Tag, F>,
}

impl<F: ?Sized> NameHookMap<F> {
    pub fn new(name: &'static str) -> Self {
        Self {
            names: HookMap::new(name),
            tags: HookMap::new(name),
        }
    }

    /// The hook for the free name `name`.
    pub fn for_name(&mut self, name: &str) -> &mut Hook<F> {
        self.names.for_key(name)
    }

    /// The hook for variables carrying `tag`.
    pub fn for_tag(&mut self, tag: Tag) -> &mut Hook<F> {
        self.tags.for_key(tag)
    }

    pub fn get_name(&self, name: &str) -> Option<&Hook<F>> {
        self.names.get(name)
    }

    pub fn get_tag(&self, tag: Tag) -> Option<&Hook<F>> {
        self.tags.get(&tag)
    }
}

impl<F: ?Sized> fmt::Debug for NameHookMap<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameHookMap")
            .field("names", &self.names)
            .field("tags", &self.tags)
            .finish()
    }
}

/// A call whose callee is a member chain, seen from a member chain on its
/// result: `a.b(…).c.d`.
#[derive(Debug, Clone, Copy)]
pub struct CallChain<'a> {
    /// The call expression.
    pub call: &'a Expr,
    /// Members of the callee after its root name (`["b"]`).
    pub callee_members: &'a [String],
    /// Members read from the call result (`["c", "d"]`).
    pub access: &'a MemberAccess,
}

/// One binding introduced by an `import` declaration.
#[derive(Debug, Clone, Copy)]
pub struct ImportBinding<'a> {
    pub source: &'a str,
    /// `"default"`, the imported name, or `None` for a namespace import.
    pub imported: Option<&'a str>,
    pub local: &'a Ident,
}

/// One name exported by an `export` declaration.
#[derive(Debug, Clone, Copy)]
pub struct ExportBinding<'a> {
    /// Module re-exported from, for `export … from`.
    pub source: Option<&'a str>,
    /// Local (or, for re-exports, imported) name; `None` for `export * as ns`.
    pub local: Option<&'a str>,
    /// Exported name; `None` for `export *`.
    pub exported: Option<&'a str>,
    /// Position of the specifier in its declaration.
    pub index: Option<usize>,
}

macro_rules! hook_signatures {
    ($($(#[$meta:meta])* $alias:ident => ($($arg:ty),*) -> $ret:ty;)*) => {
        $(
            $(#[$meta])*
            pub type $alias<S> = dyn Fn(&mut Walker<'_, S>, $($arg),*) -> Option<$ret>;

            impl<S> Hook<$alias<S>> {
                /// Register `handler` under the plugin name `plugin`.
                pub fn tap<H>(&mut self, plugin: &str, handler: H)
                where
                    H: Fn(&mut Walker<'_, S>, $($arg),*) -> Option<$ret> + 'static,
                {
                    self.push(plugin, Box::new(handler));
                }
            }
        )*
    };
}

hook_signatures! {
    /// Produces an evaluation result for an expression.
    EvalFn => (&Expr) -> EvaluatedExpression;
    /// Evaluates a method call on an already evaluated receiver.
    EvalMemberFn => (&Expr, &EvaluatedExpression) -> EvaluatedExpression;
    ExprFn => (&Expr) -> bool;
    /// Receives the whole expression and the members after the root.
    MemberChainFn => (&Expr, &MemberAccess) -> bool;
    CallChainFn => (&Expr, &CallChain<'_>) -> bool;
    StmtFn => (&Stmt) -> bool;
    /// Receives the statement and its module source.
    SourceFn => (&Stmt, &str) -> bool;
    ImportSpecifierFn => (&Stmt, &ImportBinding<'_>) -> bool;
    ExportSpecifierFn => (&Stmt, &ExportBinding<'_>) -> bool;
    DeclaratorFn => (&VarDeclarator) -> bool;
    PatternFn => (&Ident) -> bool;
    ClassMemberFn => (&ClassMember) -> bool;
    /// Receives the expression and the offset its comments start at.
    PureFn => (&Expr, usize) -> bool;
    ProgramFn => (&Program, &[Comment]) -> bool;
    SpanFn => (Span) -> bool;
}

/// Every hook the analyzer exposes.
pub struct AnalyzerHooks<S> {
    // Evaluation.
    pub evaluate: HookMap<ExprKind, EvalFn<S>>,
    pub evaluate_typeof: NameHookMap<EvalFn<S>>,
    pub evaluate_identifier: NameHookMap<EvalFn<S>>,
    /// Identifiers bound locally, keyed by their source name.
    pub evaluate_defined_identifier: NameHookMap<EvalFn<S>>,
    pub evaluate_new_expression: NameHookMap<EvalFn<S>>,
    pub evaluate_call_expression: NameHookMap<EvalFn<S>>,
    /// Method calls keyed by method name.
    pub evaluate_call_expression_member: HookMap<String, EvalMemberFn<S>>,
    pub is_pure: HookMap<ExprKind, PureFn<S>>,

    // Statements.
    pub pre_statement: Hook<StmtFn<S>>,
    pub block_pre_statement: Hook<StmtFn<S>>,
    pub statement: Hook<StmtFn<S>>,
    /// `Some(true)` walks only the consequent, `Some(false)` only the
    /// alternate.
    pub statement_if: Hook<StmtFn<S>>,
    pub label: HookMap<String, StmtFn<S>>,

    // Classes.
    pub class_extends_expression: Hook<ExprFn<S>>,
    pub class_body_element: Hook<ClassMemberFn<S>>,
    pub class_body_value: Hook<ExprFn<S>>,

    // Modules.
    pub import: Hook<SourceFn<S>>,
    pub import_specifier: Hook<ImportSpecifierFn<S>>,
    pub export: Hook<StmtFn<S>>,
    pub export_import: Hook<SourceFn<S>>,
    pub export_declaration: Hook<StmtFn<S>>,
    pub export_expression: Hook<StmtFn<S>>,
    pub export_specifier: Hook<ExportSpecifierFn<S>>,
    pub export_import_specifier: Hook<ExportSpecifierFn<S>>,

    // Declarations.
    pub pre_declarator: Hook<DeclaratorFn<S>>,
    pub declarator: Hook<DeclaratorFn<S>>,
    pub var_declaration: HookMap<String, PatternFn<S>>,
    pub var_declaration_let: HookMap<String, PatternFn<S>>,
    pub var_declaration_const: HookMap<String, PatternFn<S>>,
    pub var_declaration_var: HookMap<String, PatternFn<S>>,
    pub pattern: NameHookMap<PatternFn<S>>,

    // Expressions.
    pub can_rename: NameHookMap<ExprFn<S>>,
    pub rename: NameHookMap<ExprFn<S>>,
    pub assign: NameHookMap<ExprFn<S>>,
    pub assign_member_chain: NameHookMap<MemberChainFn<S>>,
    pub type_of: NameHookMap<ExprFn<S>>,
    pub import_call: Hook<ExprFn<S>>,
    pub top_level_await: Hook<SpanFn<S>>,
    pub call: NameHookMap<ExprFn<S>>,
    pub call_member_chain: NameHookMap<MemberChainFn<S>>,
    pub member_chain_of_call_member_chain: NameHookMap<CallChainFn<S>>,
    pub call_member_chain_of_call_member_chain: NameHookMap<CallChainFn<S>>,
    pub optional_chaining: Hook<ExprFn<S>>,
    pub new: NameHookMap<ExprFn<S>>,
    pub binary_expression: Hook<ExprFn<S>>,
    pub expression: NameHookMap<ExprFn<S>>,
    pub expression_member_chain: NameHookMap<MemberChainFn<S>>,
    pub unhandled_expression_member_chain: NameHookMap<MemberChainFn<S>>,
    /// `Some(true)` walks only the consequent, `Some(false)` only the
    /// alternate.
    pub expression_conditional_operator: Hook<ExprFn<S>>,
    /// `Some(true)` walks only the right operand, `Some(false)` neither.
    pub expression_logical_operator: Hook<ExprFn<S>>,

    // Lifecycle.
    /// `Some(true)` skips the walk.
    pub program: Hook<ProgramFn<S>>,
    pub finish: Hook<ProgramFn<S>>,
}

impl<S> AnalyzerHooks<S> {
    pub fn new() -> Self {
        Self {
            evaluate: HookMap::new("evaluate"),
            evaluate_typeof: NameHookMap::new("evaluate_typeof"),
            evaluate_identifier: NameHookMap::new("evaluate_identifier"),
            evaluate_defined_identifier: NameHookMap::new("evaluate_defined_identifier"),
            evaluate_new_expression: NameHookMap::new("evaluate_new_expression"),
            evaluate_call_expression: NameHookMap::new("evaluate_call_expression"),
            evaluate_call_expression_member: HookMap::new("evaluate_call_expression_member"),
            is_pure: HookMap::new("is_pure"),
            pre_statement: Hook::new("pre_statement"),
            block_pre_statement: Hook::new("block_pre_statement"),
            statement: Hook::new("statement"),
            statement_if: Hook::new("statement_if"),
            label: HookMap::new("label"),
            class_extends_expression: Hook::new("class_extends_expression"),
            class_body_element: Hook::new("class_body_element"),
            class_body_value: Hook::new("class_body_value"),
            import: Hook::new("import"),
            import_specifier: Hook::new("import_specifier"),
            export: Hook::new("export"),
            export_import: Hook::new("export_import"),
            export_declaration: Hook::new("export_declaration"),
            export_expression: Hook::new("export_expression"),
            export_specifier: Hook::new("export_specifier"),
            export_import_specifier: Hook::new("export_import_specifier"),
            pre_declarator: Hook::new("pre_declarator"),
            declarator: Hook::new("declarator"),
            var_declaration: HookMap::new("var_declaration"),
            var_declaration_let: HookMap::new("var_declaration_let"),
            var_declaration_const: HookMap::new("var_declaration_const"),
            var_declaration_var: HookMap::new("var_declaration_var"),
            pattern: NameHookMap::new("pattern"),
            can_rename: NameHookMap::new("can_rename"),
            rename: NameHookMap::new("rename"),
            assign: NameHookMap::new("assign"),
            assign_member_chain: NameHookMap::new("assign_member_chain"),
            type_of: NameHookMap::new("typeof"),
            import_call: Hook::new("import_call"),
            top_level_await: Hook::new("top_level_await"),
            call: NameHookMap::new("call"),
            call_member_chain: NameHookMap::new("call_member_chain"),
            member_chain_of_call_member_chain: NameHookMap::new("member_chain_of_call_member_chain"),
            call_member_chain_of_call_member_chain: NameHookMap::new(
                "call_member_chain_of_call_member_chain",
            ),
            optional_chaining: Hook::new("optional_chaining"),
            new: NameHookMap::new("new"),
            binary_expression: Hook::new("binary_expression"),
            expression: NameHookMap::new("expression"),
            expression_member_chain: NameHookMap::new("expression_member_chain"),
            unhandled_expression_member_chain: NameHookMap::new("unhandled_expression_member_chain"),
            expression_conditional_operator: Hook::new("expression_conditional_operator"),
            expression_logical_operator: Hook::new("expression_logical_operator"),
            program: Hook::new("program"),
            finish: Hook::new("finish"),
        }
    }
}

impl<S> Default for AnalyzerHooks<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for AnalyzerHooks<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerHooks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Plain = dyn Fn(u32) -> Option<u32>;

    fn plain(taps: &[(&str, fn(u32) -> Option<u32>)]) -> Hook<Plain> {
        let mut hook: Hook<Plain> = Hook::new("test");
        for (plugin, handler) in taps {
            hook.push(plugin, Box::new(*handler));
        }
        hook
    }

    #[test]
    fn test_first_some_wins() {
        let hook = plain(&[("a", |_| None), ("b", |x| Some(x + 1)), ("c", |_| Some(0))]);
        assert_eq!(hook.call(|h| h(1)), Some(2));
        assert_eq!(hook.len(), 3);
    }

    #[test]
    fn test_later_taps_are_skipped_after_bail() {
        use std::cell::Cell;
        let calls = Cell::new(0);
        let hook = plain(&[("a", |_| Some(1)), ("b", |_| Some(2))]);
        let result = hook.call(|h| {
            calls.set(calls.get() + 1);
            h(0)
        });
        assert_eq!(result, Some(1));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_no_taps_yields_none() {
        let hook = plain(&[]);
        assert!(!hook.is_used());
        assert_eq!(hook.call(|h| h(1)), None);
    }

    #[test]
    fn test_hook_map_creates_lazily() {
        let mut map: HookMap<String, Plain> = HookMap::new("keyed");
        assert!(map.get("x").is_none());
        map.for_key("x").push("p", Box::new(|v| Some(v * 2)));
        assert_eq!(map.call("x", |h| h(4)), Some(8));
        assert_eq!(map.call("y", |h| h(4)), None);
    }

    #[test]
    fn test_name_hook_map_separates_names_and_tags() {
        const T: Tag = Tag::new("t");
        let mut map: NameHookMap<Plain> = NameHookMap::new("n");
        map.for_name("t").push("p", Box::new(|_| Some(1)));
        assert!(map.get_tag(T).is_none());
        map.for_tag(T).push("p", Box::new(|_| Some(2)));
        assert_eq!(map.get_tag(T).and_then(|h| h.call(|f| f(0))), Some(2));
        assert_eq!(map.get_name("t").and_then(|h| h.call(|f| f(0))), Some(1));
    }
}
