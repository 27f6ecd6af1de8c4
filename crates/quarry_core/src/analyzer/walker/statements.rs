//! Statement visitors for the three walk phases.

use crate::analyzer::hooks::{ExportBinding, HookMap, ImportBinding, PatternFn};
use crate::analyzer::scope::TopLevelScope;
use crate::analyzer::value::number_to_js_string;
use crate::analyzer::walker::{DestructuringKey, Walker};
use crate::parser::ast::{
    BlockStmt, CatchClause, ClassDecl, ExportAllDecl, ExportDefaultDecl, ExportDefaultExpr,
    ExportNamedDecl, Expr, FnDecl, ForInOfLeft, ForInit, Ident, ImportDecl, ImportSpecifier,
    ObjectPat, ObjectPatProp, Pat, PropKey, Stmt, SwitchCase, VarDecl, VarKind,
};

impl<S> Walker<'_, S> {
    // ── Phase 1: hoisting ───────────────────────────────────────────────────

    pub(crate) fn pre_walk_statements(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.pre_walk_statement(statement);
        }
    }

    pub(crate) fn pre_walk_statement(&mut self, statement: &Stmt) {
        self.push_statement(statement);
        let hooks = self.hooks;
        if hooks.pre_statement.call(|h| h(self, statement)) == Some(true) {
            self.pop_statement();
            return;
        }
        match statement {
            Stmt::Block(block) => self.pre_walk_statements(&block.body),
            Stmt::DoWhile(s) => self.pre_walk_statement(&s.body),
            Stmt::While(s) => self.pre_walk_statement(&s.body),
            Stmt::ForIn(s) => {
                if let ForInOfLeft::VarDecl(decl) = &s.left {
                    self.pre_walk_variable_declaration(decl);
                }
                self.pre_walk_statement(&s.body);
            }
            Stmt::ForOf(s) => {
                if s.is_await && self.scope.top_level_scope == TopLevelScope::Yes {
                    hooks.top_level_await.call(|h| h(self, s.loc));
                }
                if let ForInOfLeft::VarDecl(decl) = &s.left {
                    self.pre_walk_variable_declaration(decl);
                }
                self.pre_walk_statement(&s.body);
            }
            Stmt::For(s) => {
                if let Some(ForInit::VarDecl(decl)) = &s.init {
                    self.pre_walk_variable_declaration(decl);
                }
                self.pre_walk_statement(&s.body);
            }
            Stmt::FnDecl(decl) => self.pre_walk_function_declaration(decl),
            Stmt::If(s) => {
                self.pre_walk_statement(&s.consequent);
                if let Some(alternate) = &s.alternate {
                    self.pre_walk_statement(alternate);
                }
            }
            Stmt::Labeled(s) => self.pre_walk_statement(&s.body),
            Stmt::Switch(s) => self.pre_walk_switch_cases(&s.cases),
            Stmt::Try(s) => {
                self.pre_walk_statement(&s.block);
                if let Some(handler) = &s.handler {
                    self.pre_walk_statements(&handler.body.body);
                }
                if let Some(finalizer) = &s.finalizer {
                    self.pre_walk_statement(finalizer);
                }
            }
            Stmt::VarDecl(decl) => self.pre_walk_variable_declaration(decl),
            Stmt::With(s) => self.pre_walk_statement(&s.body),
            _ => {}
        }
        self.pop_statement();
    }

    fn pre_walk_function_declaration(&mut self, decl: &FnDecl) {
        if let Some(id) = &decl.id {
            self.define_variable(&id.name);
        }
    }

    fn pre_walk_switch_cases(&mut self, cases: &[SwitchCase]) {
        for case in cases {
            self.pre_walk_statements(&case.consequent);
        }
    }

    fn pre_walk_variable_declaration(&mut self, decl: &VarDecl) {
        if decl.kind != VarKind::Var {
            return;
        }
        let hooks = self.hooks;
        self.pre_walk_declarators(decl, &hooks.var_declaration_var);
    }

    // ── Phase 2: block-scoped declarations ──────────────────────────────────

    pub(crate) fn block_pre_walk_statements(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.block_pre_walk_statement(statement);
        }
    }

    pub(crate) fn block_pre_walk_statement(&mut self, statement: &Stmt) {
        self.push_statement(statement);
        let hooks = self.hooks;
        if hooks.block_pre_statement.call(|h| h(self, statement)) == Some(true) {
            self.pop_statement();
            return;
        }
        match statement {
            Stmt::Import(decl) => self.block_pre_walk_import_declaration(statement, decl),
            Stmt::ExportAll(decl) => self.block_pre_walk_export_all_declaration(statement, decl),
            Stmt::ExportDefault(decl) => {
                self.block_pre_walk_export_default_declaration(statement, decl)
            }
            Stmt::ExportNamed(decl) => self.block_pre_walk_export_named_declaration(statement, decl),
            Stmt::VarDecl(decl) => self.block_pre_walk_variable_declaration(decl),
            Stmt::ClassDecl(decl) => self.block_pre_walk_class_declaration(decl),
            Stmt::Expr(s) => self.pre_walk_assignment_expression(&s.expr),
            _ => {}
        }
        self.pop_statement();
    }

    fn block_pre_walk_variable_declaration(&mut self, decl: &VarDecl) {
        let hooks = self.hooks;
        match decl.kind {
            VarKind::Var => {}
            VarKind::Let => self.pre_walk_declarators(decl, &hooks.var_declaration_let),
            VarKind::Const => self.pre_walk_declarators(decl, &hooks.var_declaration_const),
        }
    }

    fn block_pre_walk_class_declaration(&mut self, decl: &ClassDecl) {
        if let Some(id) = &decl.id {
            self.define_variable(&id.name);
        }
    }

    /// Declare the names bound by `decl`, giving the kind-specific hook map
    /// and then `var_declaration` a chance to claim each one.
    fn pre_walk_declarators(&mut self, decl: &VarDecl, kind_hooks: &HookMap<String, PatternFn<S>>) {
        let hooks = self.hooks;
        for declarator in &decl.declarators {
            if let (Pat::Object(pattern), Some(init)) = (&declarator.id, &declarator.init) {
                self.record_destructuring(pattern, init);
            }
            if hooks.pre_declarator.call(|h| h(self, declarator)) == Some(true) {
                continue;
            }
            self.enter_pattern(&declarator.id, &mut |w, ident| {
                let claimed = kind_hooks.call(ident.name.as_str(), |h| h(w, ident)) == Some(true)
                    || hooks
                        .var_declaration
                        .call(ident.name.as_str(), |h| h(w, ident))
                        == Some(true);
                if !claimed {
                    w.define_variable(&ident.name);
                }
            });
        }
    }

    fn block_pre_walk_import_declaration(&mut self, statement: &Stmt, decl: &ImportDecl) {
        let hooks = self.hooks;
        let source = decl.source.value.as_str();
        hooks.import.call(|h| h(self, statement, source));
        for specifier in &decl.specifiers {
            let imported = match specifier {
                ImportSpecifier::Default(_) => Some("default"),
                ImportSpecifier::Named(named) => Some(named.imported.name()),
                ImportSpecifier::Namespace(_) => None,
            };
            let binding = ImportBinding {
                source,
                imported,
                local: specifier.local(),
            };
            if hooks.import_specifier.call(|h| h(self, statement, &binding)) != Some(true) {
                self.define_variable(&specifier.local().name);
            }
        }
    }

    fn block_pre_walk_export_named_declaration(&mut self, statement: &Stmt, decl: &ExportNamedDecl) {
        let hooks = self.hooks;
        let source = decl.source.as_ref().map(|s| s.value.as_str());
        match source {
            Some(source) => {
                hooks.export_import.call(|h| h(self, statement, source));
            }
            None => {
                hooks.export.call(|h| h(self, statement));
            }
        }
        if let Some(declaration) = &decl.declaration
            && hooks.export_declaration.call(|h| h(self, statement)) != Some(true)
        {
            let prev = self.prev_statement;
            self.pre_walk_statement(declaration);
            self.prev_statement = prev;
            self.block_pre_walk_statement(declaration);
            let mut names: Vec<&Ident> = Vec::new();
            match declaration.as_ref() {
                Stmt::VarDecl(var) => {
                    for declarator in &var.declarators {
                        declarator.id.for_each_binding(&mut |id| names.push(id));
                    }
                }
                Stmt::FnDecl(f) => names.extend(&f.id),
                Stmt::ClassDecl(c) => names.extend(&c.id),
                _ => {}
            }
            for (index, id) in names.into_iter().enumerate() {
                let binding = ExportBinding {
                    source: None,
                    local: Some(&id.name),
                    exported: Some(&id.name),
                    index: Some(index),
                };
                hooks.export_specifier.call(|h| h(self, statement, &binding));
            }
        }
        for (index, specifier) in decl.specifiers.iter().enumerate() {
            let binding = ExportBinding {
                source,
                local: Some(specifier.local.name()),
                exported: Some(specifier.exported.name()),
                index: Some(index),
            };
            if source.is_some() {
                hooks.export_import_specifier.call(|h| h(self, statement, &binding));
            } else {
                hooks.export_specifier.call(|h| h(self, statement, &binding));
            }
        }
    }

    fn block_pre_walk_export_default_declaration(&mut self, statement: &Stmt, decl: &ExportDefaultDecl) {
        let hooks = self.hooks;
        let id = match &decl.declaration {
            ExportDefaultExpr::Fn(f) => {
                self.pre_walk_function_declaration(f);
                f.id.as_ref()
            }
            ExportDefaultExpr::Class(c) => {
                self.block_pre_walk_class_declaration(c);
                c.id.as_ref()
            }
            ExportDefaultExpr::Expr(_) => None,
        };
        if let Some(id) = id {
            let binding = ExportBinding {
                source: None,
                local: Some(&id.name),
                exported: Some("default"),
                index: None,
            };
            hooks.export_specifier.call(|h| h(self, statement, &binding));
        }
    }

    fn block_pre_walk_export_all_declaration(&mut self, statement: &Stmt, decl: &ExportAllDecl) {
        let hooks = self.hooks;
        let source = decl.source.value.as_str();
        hooks.export_import.call(|h| h(self, statement, source));
        let binding = ExportBinding {
            source: Some(source),
            local: None,
            exported: decl.exported.as_ref().map(|e| e.name()),
            index: Some(0),
        };
        hooks.export_import_specifier.call(|h| h(self, statement, &binding));
    }

    /// Remember which keys `pattern` reads from `init`, and from every
    /// target of a chained `init` such as `{ b } = expr`.
    fn record_destructuring(&mut self, pattern: &ObjectPat, init: &Expr) {
        let Some(keys) = self.destructuring_keys(pattern) else {
            return;
        };
        let target = match init {
            Expr::Await(await_expr) => &await_expr.argument,
            other => other,
        };
        self.destructuring_assignment_properties
            .insert(target.key(), keys);
        self.pre_walk_assignment_expression(init);
    }

    /// Record the keys of `({ a, b } = expr)`, following chained
    /// assignments such as `({ a } = { b } = expr)`.
    fn pre_walk_assignment_expression(&mut self, expr: &Expr) {
        let Expr::Assign(assign) = expr else {
            return;
        };
        let Pat::Object(pattern) = &assign.left else {
            return;
        };
        let Some(mut keys) = self.destructuring_keys(pattern) else {
            return;
        };
        if let Some(earlier) = self.destructuring_assignment_properties.remove(&expr.key()) {
            keys.extend(earlier);
        }
        let target = match assign.right.as_ref() {
            Expr::Await(await_expr) => &await_expr.argument,
            other => other,
        };
        self.destructuring_assignment_properties
            .insert(target.key(), keys);
        self.pre_walk_assignment_expression(&assign.right);
    }

    /// Property keys read by an object pattern, or `None` if one of them is
    /// a rest element or cannot be evaluated.
    fn destructuring_keys(&mut self, pattern: &ObjectPat) -> Option<Vec<DestructuringKey>> {
        let mut keys = Vec::with_capacity(pattern.properties.len());
        for property in &pattern.properties {
            let key = match property {
                ObjectPatProp::Rest(_) => return None,
                ObjectPatProp::Assign(shorthand) => DestructuringKey {
                    id: shorthand.key.name.clone(),
                    range: shorthand.key.loc,
                    shorthand: Some(shorthand.key.name.clone()),
                },
                ObjectPatProp::KeyValue(kv) => {
                    let id = match &kv.key {
                        PropKey::Ident(ident) => ident.name.clone(),
                        PropKey::Private(_) => return None,
                        PropKey::Str(s) => s.value.clone(),
                        PropKey::Num(n) => number_to_js_string(n.value),
                        PropKey::Computed(expr) => {
                            let evaluated = self.evaluate_expression(expr);
                            evaluated.as_string().filter(|s| !s.is_empty())?
                        }
                    };
                    DestructuringKey {
                        id,
                        range: kv.key.loc(),
                        shorthand: None,
                    }
                }
            };
            keys.push(key);
        }
        Some(keys)
    }

    // ── Phase 3: walk ───────────────────────────────────────────────────────

    pub(crate) fn walk_statements(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.walk_statement(statement);
        }
    }

    pub(crate) fn walk_statement(&mut self, statement: &Stmt) {
        self.push_statement(statement);
        let hooks = self.hooks;
        if hooks.statement.call(|h| h(self, statement)).is_some() {
            self.pop_statement();
            return;
        }
        match statement {
            Stmt::Block(block) => self.walk_block_statement(&block.body),
            Stmt::ClassDecl(decl) => self.walk_class(decl.id.as_ref(), decl.super_class.as_deref(), &decl.body),
            Stmt::DoWhile(s) => {
                self.walk_nested_statement(&s.body);
                self.walk_expression(&s.test);
            }
            Stmt::ExportDefault(decl) => self.walk_export_default_declaration(statement, decl),
            Stmt::ExportNamed(decl) => {
                if let Some(declaration) = &decl.declaration {
                    self.walk_statement(declaration);
                }
            }
            Stmt::Expr(s) => self.walk_expression(&s.expr),
            Stmt::ForIn(s) => self.walk_for_in_of(&s.left, &s.right, &s.body),
            Stmt::ForOf(s) => self.walk_for_in_of(&s.left, &s.right, &s.body),
            Stmt::For(s) => {
                self.in_block_scope(|w| {
                    match &s.init {
                        Some(ForInit::VarDecl(decl)) => {
                            w.block_pre_walk_variable_declaration(decl);
                            w.prev_statement = None;
                            w.walk_variable_declaration(decl);
                        }
                        Some(ForInit::Expr(expr)) => w.walk_expression(expr),
                        None => {}
                    }
                    if let Some(test) = &s.test {
                        w.walk_expression(test);
                    }
                    if let Some(update) = &s.update {
                        w.walk_expression(update);
                    }
                    w.walk_loop_body(&s.body);
                });
            }
            Stmt::FnDecl(decl) => self.walk_function_declaration(decl),
            Stmt::If(s) => match hooks.statement_if.call(|h| h(self, statement)) {
                None => {
                    self.walk_expression(&s.test);
                    self.walk_nested_statement(&s.consequent);
                    if let Some(alternate) = &s.alternate {
                        self.walk_nested_statement(alternate);
                    }
                }
                Some(true) => self.walk_nested_statement(&s.consequent),
                Some(false) => {
                    if let Some(alternate) = &s.alternate {
                        self.walk_nested_statement(alternate);
                    }
                }
            },
            Stmt::Labeled(s) => {
                if hooks.label.call(s.label.name.as_str(), |h| h(self, statement)) != Some(true) {
                    self.walk_nested_statement(&s.body);
                }
            }
            Stmt::Return(s) => {
                if let Some(argument) = &s.argument {
                    self.walk_expression(argument);
                }
            }
            Stmt::Throw(s) => self.walk_expression(&s.argument),
            Stmt::Switch(s) => {
                self.walk_expression(&s.discriminant);
                self.walk_switch_cases(&s.cases);
            }
            Stmt::Try(s) => {
                if self.scope.in_try {
                    self.walk_statement(&s.block);
                } else {
                    self.scope.in_try = true;
                    self.walk_statement(&s.block);
                    self.scope.in_try = false;
                }
                if let Some(handler) = &s.handler {
                    self.walk_catch_clause(handler);
                }
                if let Some(finalizer) = &s.finalizer {
                    self.walk_statement(finalizer);
                }
            }
            Stmt::VarDecl(decl) => self.walk_variable_declaration(decl),
            Stmt::While(s) => {
                self.walk_expression(&s.test);
                self.walk_nested_statement(&s.body);
            }
            Stmt::With(s) => {
                self.walk_expression(&s.object);
                self.walk_nested_statement(&s.body);
            }
            Stmt::Import(_)
            | Stmt::ExportAll(_)
            | Stmt::Break(_)
            | Stmt::Continue(_)
            | Stmt::Debugger(_)
            | Stmt::Empty(_) => {}
        }
        self.pop_statement();
    }

    /// Walk a statement nested in another one; the enclosing statement is
    /// not a predecessor for ASI purposes.
    fn walk_nested_statement(&mut self, statement: &Stmt) {
        self.prev_statement = None;
        self.walk_statement(statement);
    }

    /// Walk a block body in its own scope.
    pub(crate) fn walk_block_statement(&mut self, body: &[Stmt]) {
        self.in_block_scope(|w| {
            let prev = w.prev_statement;
            w.block_pre_walk_statements(body);
            w.prev_statement = prev;
            w.walk_statements(body);
        });
    }

    /// Walk a loop body in the loop's scope, without opening another one
    /// for a block body.
    fn walk_loop_body(&mut self, body: &Stmt) {
        if let Stmt::Block(block) = body {
            let prev = self.prev_statement;
            self.block_pre_walk_statements(&block.body);
            self.prev_statement = prev;
            self.walk_statements(&block.body);
        } else {
            self.walk_nested_statement(body);
        }
    }

    fn walk_for_in_of(&mut self, left: &ForInOfLeft, right: &Expr, body: &Stmt) {
        self.in_block_scope(|w| {
            match left {
                ForInOfLeft::VarDecl(decl) => {
                    w.block_pre_walk_variable_declaration(decl);
                    w.walk_variable_declaration(decl);
                }
                ForInOfLeft::Pat(pat) => w.walk_pattern(pat),
            }
            w.walk_expression(right);
            w.walk_loop_body(body);
        });
    }

    fn walk_switch_cases(&mut self, cases: &[SwitchCase]) {
        self.in_block_scope(|w| {
            for case in cases {
                let prev = w.prev_statement;
                w.block_pre_walk_statements(&case.consequent);
                w.prev_statement = prev;
            }
            for case in cases {
                if let Some(test) = &case.test {
                    w.walk_expression(test);
                }
                w.walk_statements(&case.consequent);
            }
        });
    }

    fn walk_catch_clause(&mut self, clause: &CatchClause) {
        self.in_block_scope(|w| {
            if let Some(param) = &clause.param {
                w.enter_pattern(param, &mut |w, ident| w.define_variable(&ident.name));
                w.walk_pattern(param);
            }
            let prev = w.prev_statement;
            w.block_pre_walk_statements(&clause.body.body);
            w.prev_statement = prev;
            w.walk_statements(&clause.body.body);
        });
    }

    pub(crate) fn walk_function_declaration(&mut self, decl: &FnDecl) {
        let outer = self.set_top_level_scope(TopLevelScope::No);
        self.in_function_scope(true, decl.params.iter().map(|p| &p.pat), None, |w| {
            w.walk_params(&decl.params);
            w.walk_function_body(&decl.body);
        });
        self.scope.top_level_scope = outer;
    }

    /// Hoist and walk a function body in the current (function) scope.
    pub(crate) fn walk_function_body(&mut self, body: &BlockStmt) {
        self.detect_mode(&body.body);
        let prev = self.prev_statement;
        self.pre_walk_statements(&body.body);
        self.prev_statement = prev;
        self.walk_block_statement(&body.body);
    }

    fn walk_export_default_declaration(&mut self, statement: &Stmt, decl: &ExportDefaultDecl) {
        let hooks = self.hooks;
        hooks.export.call(|h| h(self, statement));
        match &decl.declaration {
            ExportDefaultExpr::Fn(f) if f.id.is_some() => {
                if hooks.export_declaration.call(|h| h(self, statement)) != Some(true) {
                    self.walk_function_declaration(f);
                }
            }
            ExportDefaultExpr::Class(c) if c.id.is_some() => {
                if hooks.export_declaration.call(|h| h(self, statement)) != Some(true) {
                    self.walk_class(c.id.as_ref(), c.super_class.as_deref(), &c.body);
                }
            }
            other => {
                match other {
                    ExportDefaultExpr::Fn(f) => self.walk_function_declaration(f),
                    ExportDefaultExpr::Class(c) => {
                        self.walk_class(c.id.as_ref(), c.super_class.as_deref(), &c.body)
                    }
                    ExportDefaultExpr::Expr(expr) => self.walk_expression(expr),
                }
                if hooks.export_expression.call(|h| h(self, statement)) != Some(true) {
                    let binding = ExportBinding {
                        source: None,
                        local: None,
                        exported: Some("default"),
                        index: None,
                    };
                    hooks.export_specifier.call(|h| h(self, statement, &binding));
                }
            }
        }
    }

    pub(crate) fn walk_variable_declaration(&mut self, decl: &VarDecl) {
        let hooks = self.hooks;
        for declarator in &decl.declarators {
            if let (Pat::Ident(id), Some(init)) = (&declarator.id, &declarator.init)
                && let Some(rename) = self.get_rename_identifier(init)
                && self.call_hooks_for_info(&hooks.can_rename, &rename, |w, h| h(w, init)).handled()
                    == Some(true)
            {
                let renamed = self.call_hooks_for_info(&hooks.rename, &rename, |w, h| h(w, init)).handled();
                if renamed != Some(true) {
                    self.rename_variable(&id.name, rename);
                }
                continue;
            }
            if hooks.declarator.call(|h| h(self, declarator)) != Some(true) {
                self.walk_pattern(&declarator.id);
                if let Some(init) = &declarator.init {
                    self.walk_expression(init);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::analyzer::{Analyzer, AnalyzerOptions};

    #[derive(Default)]
    struct Seen {
        events: Vec<String>,
    }

    fn analyzer() -> Analyzer<Seen> {
        Analyzer::new(AnalyzerOptions::default()).expect("options")
    }

    #[test]
    fn test_hoisted_function_is_local_before_its_declaration() {
        let mut a = analyzer();
        a.hooks_mut().call.for_name("f").tap("t", |w, _| {
            w.state_mut().events.push("free f".into());
            Some(true)
        });
        let state = a.parse("f(); function f() {}", Seen::default()).expect("parses");
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_var_hoisting_shadows_free_name() {
        let mut a = analyzer();
        a.hooks_mut().call.for_name("require").tap("t", |w, _| {
            w.state_mut().events.push("require".into());
            Some(true)
        });
        let state = a
            .parse("require('a'); if (x) { var require = 1; }", Seen::default())
            .expect("parses");
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_import_specifiers_and_exports() {
        let mut a = analyzer();
        let hooks = a.hooks_mut();
        hooks.import.tap("t", |w, _, source| {
            w.state_mut().events.push(format!("import {source}"));
            None
        });
        hooks.import_specifier.tap("t", |w, _, binding| {
            let imported = binding.imported.unwrap_or("*");
            w.state_mut()
                .events
                .push(format!("specifier {imported} as {}", binding.local.name));
            None
        });
        hooks.export_specifier.tap("t", |w, _, binding| {
            w.state_mut().events.push(format!(
                "export {} as {}",
                binding.local.unwrap_or("<expr>"),
                binding.exported.unwrap_or("*")
            ));
            None
        });
        hooks.export_import_specifier.tap("t", |w, _, binding| {
            w.state_mut().events.push(format!(
                "reexport {} from {}",
                binding.exported.unwrap_or("*"),
                binding.source.unwrap_or("?")
            ));
            None
        });
        let source = "import d, { a as b } from './m';\nimport * as ns from './n';\n\
                      export const x = 1, y = 2;\nexport { b as c };\nexport * from './o';\n\
                      export default 42;";
        let state = a.parse(source, Seen::default()).expect("parses");
        pretty_assertions::assert_eq!(
            state.events,
            vec![
                "import ./m",
                "specifier default as d",
                "specifier a as b",
                "import ./n",
                "specifier * as ns",
                "export x as x",
                "export y as y",
                "export b as c",
                "reexport * from ./o",
                "export <expr> as default",
            ]
        );
    }

    #[test]
    fn test_statement_if_decides_branch() {
        let mut a = analyzer();
        a.hooks_mut().statement_if.tap("t", |_, _| Some(false));
        a.hooks_mut().call.for_name("seen").tap("t", |w, e| {
            let arg = match e {
                crate::parser::ast::Expr::Call(c) => w.evaluate_expression(&c.arguments[0]),
                _ => return None,
            };
            let text = arg.as_string().unwrap_or_default();
            w.state_mut().events.push(text);
            Some(true)
        });
        let state = a
            .parse("if (cond) { seen('then') } else { seen('else') }", Seen::default())
            .expect("parses");
        assert_eq!(state.events, vec!["else"]);
    }

    #[test]
    fn test_label_hook_can_skip_body() {
        let count = Rc::new(RefCell::new(0));
        let mut a = analyzer();
        a.hooks_mut().label.for_key("skip").tap("t", |_, _| Some(true));
        let c = Rc::clone(&count);
        a.hooks_mut().call.for_name("f").tap("t", move |_, _| {
            *c.borrow_mut() += 1;
            Some(true)
        });
        a.parse("skip: { f(); } keep: { f(); }", Seen::default()).expect("parses");
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_destructuring_keys_recorded() {
        let mut a = analyzer();
        a.hooks_mut().call.for_name("load").tap("t", |w, e| {
            let keys = w
                .destructuring_assignment_properties_for(e)
                .map(|keys| keys.iter().map(|k| k.id.clone()).collect::<Vec<_>>())
                .unwrap_or_default();
            w.state_mut().events.extend(keys);
            Some(true)
        });
        let state = a
            .parse("const { a, b: c, ['d']: e } = load();", Seen::default())
            .expect("parses");
        assert_eq!(state.events, vec!["a", "b", "d"]);
    }
}
