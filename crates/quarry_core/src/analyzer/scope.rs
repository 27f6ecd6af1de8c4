//! Lexical scope state and per-name binding information.
//!
//! Every name lookup resolves to a [`Binding`]:
//!
//! - [`Binding::Free`]: nothing in scope declares the name; it refers to a
//!   global or a bundler-provided free variable.
//! - [`Binding::Declared`]: declared locally, with nothing else known.
//! - [`Binding::Info`]: a [`VariableInfo`] records a free-name alias
//!   (`var r = require`) and/or a chain of [`Tag`]s attached by plugins.

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::analyzer::stacked_map::StackedMap;

/// Identity of one scope instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        ScopeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Whether the walker is at module top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevelScope {
    /// Directly in the program body.
    Yes,
    /// Inside an arrow function that is itself at top level.
    Arrow,
    /// Inside a function or class body.
    No,
}

impl TopLevelScope {
    /// `Yes` and `Arrow` both count as top level for `this` and `await`.
    pub fn is_top_level(self) -> bool {
        !matches!(self, TopLevelScope::No)
    }
}

/// A plugin-defined marker attached to variables.
///
/// Tags compare by name, so two plugins must pick distinct names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(&'static str);

impl Tag {
    /// A tag identified by `name`.
    pub const fn new(name: &'static str) -> Self {
        Tag(name)
    }

    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Opaque data stored alongside a [`Tag`].
pub type TagData = Rc<dyn Any>;

/// The free name a variable resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreeName {
    /// The variable aliases the free variable of this name.
    Name(String),
    /// The variable is a genuine local; free-name hooks do not apply.
    Local,
}

/// Information attached to a declared or aliased variable.
#[derive(Clone)]
pub struct VariableInfo {
    pub declared_scope: ScopeId,
    pub free_name: FreeName,
    /// Attached tags, oldest first.
    tags: Vec<(Tag, TagData)>,
}

impl VariableInfo {
    pub fn new(declared_scope: ScopeId, free_name: FreeName) -> Self {
        Self {
            declared_scope,
            free_name,
            tags: Vec::new(),
        }
    }

    /// A copy of `self` with one more tag on top.
    pub(crate) fn with_tag(&self, tag: Tag, data: TagData) -> Self {
        let mut info = self.clone();
        info.tags.push((tag, data));
        info
    }

    /// Tags newest first, the order hooks are consulted in.
    pub fn tags(&self) -> impl Iterator<Item = (Tag, &TagData)> {
        self.tags.iter().rev().map(|(tag, data)| (*tag, data))
    }

    /// Data of the most recent occurrence of `tag`.
    pub fn tag_data(&self, tag: Tag) -> Option<&TagData> {
        self.tags().find(|(t, _)| *t == tag).map(|(_, data)| data)
    }

    /// The free name, if the variable aliases one.
    pub fn free_name(&self) -> Option<&str> {
        match &self.free_name {
            FreeName::Name(name) => Some(name),
            FreeName::Local => None,
        }
    }
}

impl fmt::Debug for VariableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableInfo")
            .field("declared_scope", &self.declared_scope)
            .field("free_name", &self.free_name)
            .field("tags", &self.tags.iter().map(|(t, _)| t).collect::<Vec<_>>())
            .finish()
    }
}

impl PartialEq for VariableInfo {
    fn eq(&self, other: &Self) -> bool {
        self.declared_scope == other.declared_scope
            && self.free_name == other.free_name
            && self.tags.len() == other.tags.len()
            && self
                .tags
                .iter()
                .zip(&other.tags)
                .all(|((a, da), (b, db))| a == b && Rc::ptr_eq(da, db))
    }
}

/// What a name resolves to in the current scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Undeclared; the name itself is the free name.
    Free(String),
    /// Declared in the given scope with no further information.
    Declared(ScopeId),
    /// Declared or aliased, with attached information.
    Info(Rc<VariableInfo>),
}

impl Binding {
    /// The free name this binding stands for, if any.
    pub fn free_name(&self) -> Option<&str> {
        match self {
            Binding::Free(name) => Some(name),
            Binding::Declared(_) => None,
            Binding::Info(info) => info.free_name(),
        }
    }

    pub fn variable_info(&self) -> Option<&VariableInfo> {
        match self {
            Binding::Info(info) => Some(info),
            _ => None,
        }
    }
}

/// Mutable state of one lexical scope.
#[derive(Debug)]
pub struct ScopeInfo {
    pub(crate) id: ScopeId,
    pub(crate) definitions: StackedMap<String, Binding>,
    pub top_level_scope: TopLevelScope,
    pub in_try: bool,
    /// Name of the shorthand property being walked (`{ a }`), if any.
    pub in_short_hand: Option<String>,
    pub in_tagged_template_tag: bool,
    pub is_strict: bool,
}

impl ScopeInfo {
    /// The program scope.
    pub fn root(is_strict: bool) -> Self {
        Self {
            id: ScopeId::fresh(),
            definitions: StackedMap::new(),
            top_level_scope: TopLevelScope::Yes,
            in_try: false,
            in_short_hand: None,
            in_tagged_template_tag: false,
            is_strict,
        }
    }

    /// A nested scope inheriting `top_level_scope` and strictness.
    ///
    /// `in_try` carries over only into block scopes.
    pub fn child(&self, keep_try: bool) -> Self {
        Self {
            id: ScopeId::fresh(),
            definitions: self.definitions.create_child(),
            top_level_scope: self.top_level_scope,
            in_try: keep_try && self.in_try,
            in_short_hand: None,
            in_tagged_template_tag: false,
            is_strict: self.is_strict,
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Nesting depth of the definitions map.
    pub fn depth(&self) -> usize {
        self.definitions.depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMPORTED: Tag = Tag::new("imported");
    const PURE: Tag = Tag::new("pure");

    #[test]
    fn test_child_scope_inherits_flags() {
        let mut root = ScopeInfo::root(true);
        root.in_try = true;
        let block = root.child(true);
        let func = root.child(false);
        assert!(block.in_try);
        assert!(!func.in_try);
        assert!(func.is_strict);
        assert_ne!(root.id(), block.id());
        assert_eq!(block.depth(), 2);
    }

    #[test]
    fn test_tags_are_consulted_newest_first() {
        let info = VariableInfo::new(ScopeId::fresh(), FreeName::Local);
        let first: TagData = Rc::new(1_u32);
        let second: TagData = Rc::new(2_u32);
        let info = info.with_tag(IMPORTED, first).with_tag(PURE, Rc::new(()));
        let info = info.with_tag(IMPORTED, second);

        let order: Vec<_> = info.tags().map(|(t, _)| t).collect();
        assert_eq!(order, vec![IMPORTED, PURE, IMPORTED]);
        let data = info.tag_data(IMPORTED).and_then(|d| d.downcast_ref::<u32>());
        assert_eq!(data, Some(&2));
    }

    #[test]
    fn test_binding_free_name() {
        let scope = ScopeId::fresh();
        assert_eq!(Binding::Free("require".into()).free_name(), Some("require"));
        assert_eq!(Binding::Declared(scope).free_name(), None);
        let alias = VariableInfo::new(scope, FreeName::Name("module".into()));
        assert_eq!(Binding::Info(Rc::new(alias)).free_name(), Some("module"));
    }

    #[test]
    fn test_top_level_scope() {
        assert!(TopLevelScope::Arrow.is_top_level());
        assert!(!TopLevelScope::No.is_top_level());
    }
}
