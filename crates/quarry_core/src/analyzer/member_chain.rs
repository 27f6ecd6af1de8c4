//! Member-chain extraction and classification.
//!
//! `a.b["c"].d` is peeled into its root object `a` and the members
//! `["b", "c", "d"]`.  When the root is a free variable (or aliases one) the
//! chain gets a dotted name such as `a.b.c.d` that hooks can be keyed on.
//! Chains rooted in a call, like `require("x").foo.bar`, are classified
//! separately so `require` plugins can see through the call.

use smallvec::SmallVec;

use crate::analyzer::scope::Binding;
use crate::analyzer::value::number_to_js_string;
use crate::parser::ast::{Expr, MemberProp};
use crate::parser::scanner::Span;

/// Member names in source order.
pub type Members = SmallVec<[String; 4]>;

/// The members of a chain, with their optional-access flags and the range
/// of the object each member is read from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemberAccess {
    pub members: Members,
    pub members_optionals: SmallVec<[bool; 4]>,
    pub member_ranges: SmallVec<[Span; 4]>,
}

impl MemberAccess {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Drop the last member.
    pub fn pop(&mut self) {
        self.members.pop();
        self.members_optionals.pop();
        self.member_ranges.pop();
    }
}

/// A member chain split into its root object and members.
#[derive(Debug, Clone)]
pub struct MemberChain<'e> {
    /// The innermost non-member expression.
    pub object: &'e Expr,
    pub access: MemberAccess,
}

/// The member name a computed key stands for, when it is a literal.
fn literal_member_name(key: &Expr) -> Option<String> {
    match key {
        Expr::Str(s) => Some(s.value.clone()),
        Expr::Num(n) => Some(number_to_js_string(n.value)),
        Expr::Bool(b) => Some(b.value.to_string()),
        Expr::Null(_) => Some("null".into()),
        Expr::BigInt(b) => b.value.as_ref().map(ToString::to_string),
        _ => None,
    }
}

/// Split `expression` into its root object and the members read from it.
///
/// Extraction stops at the first computed member whose key is not a
/// literal, and at private names; whatever is left becomes `object`.
pub fn extract_member_expression_chain(expression: &Expr) -> MemberChain<'_> {
    let mut access = MemberAccess::default();
    let mut current = expression;
    while let Expr::Member(member) = current {
        let name = match &member.property {
            MemberProp::Ident(ident) => ident.name.clone(),
            MemberProp::Computed(key) => match literal_member_name(key) {
                Some(name) => name,
                None => break,
            },
            MemberProp::Private(_) => break,
        };
        access.members.push(name);
        access.members_optionals.push(member.optional);
        access.member_ranges.push(member.object.loc());
        current = &member.object;
    }
    access.members.reverse();
    access.members_optionals.reverse();
    access.member_ranges.reverse();
    MemberChain {
        object: current,
        access,
    }
}

/// The name hooks see for a chain root: identifiers, `this` and
/// meta-properties such as `import.meta`.
pub fn root_name(expression: &Expr) -> Option<String> {
    match expression {
        Expr::Ident(ident) => Some(ident.name.clone()),
        Expr::This(_) => Some("this".into()),
        Expr::MetaProp(meta) => Some(format!("{}.{}", meta.meta.name, meta.property.name)),
        _ => None,
    }
}

/// `root.m1.m2…`
pub fn object_and_members_to_name(root: &str, members: &[String]) -> String {
    let mut name = String::with_capacity(root.len() + members.iter().map(|m| m.len() + 1).sum::<usize>());
    name.push_str(root);
    for member in members {
        name.push('.');
        name.push_str(member);
    }
    name
}

/// Which chain shapes [`member_expression_info`] should classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedMemberTypes(u8);

impl AllowedMemberTypes {
    /// Chains rooted in a call: `f().a.b`.
    pub const CALL_EXPRESSION: Self = Self(0b01);
    /// Chains rooted in a name: `a.b.c`.
    pub const EXPRESSION: Self = Self(0b10);
    pub const ALL: Self = Self(0b11);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// How a classified chain is rooted.
#[derive(Debug, Clone)]
pub enum MemberInfoKind<'e> {
    /// Rooted in a free name.
    Expression,
    /// Rooted in a call of a free name or of a member chain on one.
    Call {
        /// The call expression at the root.
        call: &'e Expr,
        /// Dotted name of the callee, e.g. `require` or `a.b`.
        callee_name: String,
        /// Members of the callee after its root name.
        callee_members: Members,
    },
}

/// A member chain whose root resolved to a free name.
#[derive(Debug, Clone)]
pub struct MemberExpressionInfo<'e> {
    pub kind: MemberInfoKind<'e>,
    /// Full dotted name; call roots appear as `callee()`.
    pub name: String,
    /// Binding of the root name.
    pub root_info: Binding,
    pub access: MemberAccess,
}

/// Classify `expression` as a free-name or call-rooted member chain.
///
/// `resolve` maps a root name to its binding and free name and returns
/// `None` when the name is bound locally; such chains are not classified.
pub fn member_expression_info<'e>(
    expression: &'e Expr,
    allowed: AllowedMemberTypes,
    resolve: impl Fn(&str) -> Option<(Binding, String)>,
) -> Option<MemberExpressionInfo<'e>> {
    let MemberChain { object, access } = extract_member_expression_chain(expression);
    match object {
        Expr::Call(call) => {
            if !allowed.contains(AllowedMemberTypes::CALL_EXPRESSION) {
                return None;
            }
            let callee: &'e Expr = &call.callee;
            let (callee, callee_members) = if let Expr::Member(_) = callee {
                let chain = extract_member_expression_chain(callee);
                (chain.object, chain.access.members)
            } else {
                (callee, Members::new())
            };
            let (root_info, resolved_root) = resolve(&root_name(callee)?)?;
            let callee_name = object_and_members_to_name(&resolved_root, &callee_members);
            let name = object_and_members_to_name(&format!("{callee_name}()"), &access.members);
            Some(MemberExpressionInfo {
                kind: MemberInfoKind::Call {
                    call: object,
                    callee_name,
                    callee_members,
                },
                name,
                root_info,
                access,
            })
        }
        Expr::Ident(_) | Expr::MetaProp(_) | Expr::This(_) => {
            if !allowed.contains(AllowedMemberTypes::EXPRESSION) {
                return None;
            }
            let (root_info, resolved_root) = resolve(&root_name(object)?)?;
            Some(MemberExpressionInfo {
                kind: MemberInfoKind::Expression,
                name: object_and_members_to_name(&resolved_root, &access.members),
                root_info,
                access,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn expr(source: &str) -> Expr {
        parse_expression(source).expect("parses").0
    }

    fn free_except(locals: &'static [&'static str]) -> impl Fn(&str) -> Option<(Binding, String)> {
        move |name| {
            (!locals.contains(&name)).then(|| (Binding::Free(name.to_string()), name.to_string()))
        }
    }

    #[test]
    fn test_extract_chain_members_in_source_order() {
        let e = expr("a.b[\"c\"][0]?.d");
        let e = e.unwrap_chain();
        let chain = extract_member_expression_chain(e);
        assert!(matches!(chain.object, Expr::Ident(id) if id.name == "a"));
        assert_eq!(chain.access.members.as_slice(), ["b", "c", "0", "d"]);
        assert_eq!(chain.access.members_optionals.as_slice(), [false, false, false, true]);
        assert_eq!(chain.access.member_ranges[0].range(), 0..1);
        assert_eq!(chain.access.member_ranges[1].range(), 0..3);
    }

    #[test]
    fn test_extract_chain_stops_at_dynamic_key() {
        let e = expr("a[b].c");
        let chain = extract_member_expression_chain(&e);
        assert!(matches!(chain.object, Expr::Member(_)));
        assert_eq!(chain.access.members.as_slice(), ["c"]);
    }

    #[test]
    fn test_expression_chain_on_free_root() {
        let e = expr("cde.ddd.abc");
        let info = member_expression_info(&e, AllowedMemberTypes::ALL, free_except(&[]))
            .expect("classified");
        assert!(matches!(info.kind, MemberInfoKind::Expression));
        assert_eq!(info.name, "cde.ddd.abc");
        assert_eq!(info.root_info, Binding::Free("cde".into()));
        assert_eq!(info.access.members.as_slice(), ["ddd", "abc"]);
    }

    #[test]
    fn test_locally_bound_root_is_not_classified() {
        let e = expr("cde.ddd.abc");
        assert!(member_expression_info(&e, AllowedMemberTypes::ALL, free_except(&["cde"])).is_none());
    }

    #[test]
    fn test_call_rooted_chain() {
        let e = expr("a.b(1).c.d");
        let info = member_expression_info(&e, AllowedMemberTypes::ALL, free_except(&[]))
            .expect("classified");
        match &info.kind {
            MemberInfoKind::Call {
                call,
                callee_name,
                callee_members,
            } => {
                assert!(matches!(call, Expr::Call(_)));
                assert_eq!(callee_name, "a.b");
                assert_eq!(callee_members.as_slice(), ["b"]);
            }
            MemberInfoKind::Expression => panic!("expected a call-rooted chain"),
        }
        assert_eq!(info.name, "a.b().c.d");
        assert_eq!(info.access.members.as_slice(), ["c", "d"]);
    }

    #[test]
    fn test_allowed_types_filter() {
        let call = expr("require('x').y");
        assert!(member_expression_info(&call, AllowedMemberTypes::EXPRESSION, free_except(&[])).is_none());
        let plain = expr("x.y");
        assert!(
            member_expression_info(&plain, AllowedMemberTypes::CALL_EXPRESSION, free_except(&[]))
                .is_none()
        );
    }

    #[test]
    fn test_this_and_meta_roots() {
        let e = expr("this.x");
        let info = member_expression_info(&e, AllowedMemberTypes::ALL, free_except(&[])).expect("this");
        assert_eq!(info.name, "this.x");
        assert_eq!(root_name(&expr("1")), None);
    }

    #[test]
    fn test_object_and_members_to_name() {
        assert_eq!(object_and_members_to_name("a", &[]), "a");
        assert_eq!(
            object_and_members_to_name("a", &["b".to_string(), "c".to_string()]),
            "a.b.c"
        );
    }
}
