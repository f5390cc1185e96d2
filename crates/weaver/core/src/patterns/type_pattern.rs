// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Type patterns
//!
//! A pattern is parsed in symbolic form ([`TypePattern::Wild`] for every
//! name) and resolved against a [`Scope`](crate::binding::Scope): names of
//! formals become [`TypePattern::Binding`], wildcard-free names that resolve
//! become [`TypePattern::Exact`], and unknown names become
//! [`TypePattern::NoType`].

use crate::binding::{Bindings, IntMap, ResolveContext};
use crate::lint::Lint;
use crate::patterns::annotation_pattern::AnnotationTypePattern;
use crate::patterns::name_pattern::NamePattern;
use crate::patterns::signature_pattern::SignaturePattern;
use crate::patterns::type_pattern_list::TypePatternList;
use crate::tristate::TriState;
use crate::types::{MemberKind, TypeId, TypeUniverse, UnresolvedType};
use serde::{Deserialize, Serialize};
use std::fmt;
use weaver_common::Persistent;

/// How a type is compared against a pattern.
///
/// `Static` asks whether the type itself is named by the pattern (`within`,
/// signatures). `Dynamic` asks whether a value of that static type is an
/// instance of the pattern at runtime (`this`, `target`, `args`), which may
/// only be decidable with a runtime check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactTypePattern {
    pub ty: UnresolvedType,
    pub include_subtypes: bool,
    pub varargs: bool,
    pub annotation: AnnotationTypePattern,
}

impl ExactTypePattern {
    pub fn new(ty: UnresolvedType) -> Self {
        Self {
            ty,
            include_subtypes: false,
            varargs: false,
            annotation: AnnotationTypePattern::Any,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WildTypePattern {
    pub name: NamePattern,
    pub include_subtypes: bool,
    pub dims: u32,
    pub varargs: bool,
    pub type_parameters: Option<TypePatternList>,
    pub annotation: AnnotationTypePattern,
    /// Prefixes stripped from candidate names before matching, filled in on resolution
    pub known_prefixes: Vec<String>,
}

impl WildTypePattern {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: NamePattern::new(name),
            include_subtypes: false,
            dims: 0,
            varargs: false,
            type_parameters: None,
            annotation: AnnotationTypePattern::Any,
            known_prefixes: Vec::new(),
        }
    }

    fn name_matches(&self, name: &str) -> bool {
        self.name.matches(name) || self.known_prefixes.iter().any(|p| name.strip_prefix(p.as_str()).is_some_and(|rest| self.name.matches(rest)))
    }

    fn matches_one(&self, world: &mut TypeUniverse, id: TypeId) -> bool {
        let t = world.ty(id);
        if !self.name_matches(&t.unresolved().base_name()) {
            return false;
        }
        let Some(parameters) = &self.type_parameters else { return true };
        if !t.is_parameterized() {
            return false;
        }
        let args = t.type_arguments().to_vec();
        parameters.matches(world, &args, MatchKind::Static).always_true()
    }

    /// Name match of `id`, or of any of its supertypes when `subtypes` is set
    fn matches_type(&self, world: &mut TypeUniverse, id: TypeId, subtypes: bool) -> bool {
        let unresolved = world.to_unresolved(id);
        let (element, dims) = unresolved.element_type();
        if dims != self.dims + u32::from(self.varargs) {
            return false;
        }
        if world.is_missing(id) {
            return self.type_parameters.is_none() && self.name_matches(&element.base_name());
        }
        let element_id = if dims == 0 { id } else { world.resolve(element) };
        if !self.annotation.is_any() {
            let annotations = world.annotations(element_id);
            if !self.annotation.matches(world, &annotations).always_true() {
                return false;
            }
        }
        if self.matches_one(world, element_id) {
            return true;
        }
        subtypes && world.all_supertypes(element_id).into_iter().any(|s| self.matches_one(world, s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypePattern {
    /// `*`
    Any,
    /// Matches nothing; the result of an unresolvable name
    NoType,
    Exact(ExactTypePattern),
    Wild(WildTypePattern),
    /// A formal of the enclosing advice or pointcut, exposed at runtime
    Binding { formal_index: usize, ty: UnresolvedType },
    /// `hasmethod(..)` / `hasfield(..)`
    HasMember { signature: Box<SignaturePattern> },
    And(Box<TypePattern>, Box<TypePattern>),
    Or(Box<TypePattern>, Box<TypePattern>),
    Not(Box<TypePattern>),
    /// `..` inside a pattern list
    Ellipsis,
}

impl TypePattern {
    pub fn exact(ty: UnresolvedType) -> Self {
        TypePattern::Exact(ExactTypePattern::new(ty))
    }

    pub fn exact_name(name: &str) -> Self {
        Self::exact(UnresolvedType::for_name(name))
    }

    pub fn wild(name: &str) -> Self {
        TypePattern::Wild(WildTypePattern::new(name))
    }

    pub fn and(left: TypePattern, right: TypePattern) -> Self {
        TypePattern::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: TypePattern, right: TypePattern) -> Self {
        TypePattern::Or(Box::new(left), Box::new(right))
    }

    pub fn not(inner: TypePattern) -> Self {
        TypePattern::Not(Box::new(inner))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TypePattern::Any)
    }

    /// A bare `*`, which also stands for "every other aspect" in precedence lists
    pub fn is_star(&self) -> bool {
        match self {
            TypePattern::Any => true,
            TypePattern::Wild(w) => w.name.is_any() && !w.include_subtypes && w.dims == 0 && !w.varargs && w.type_parameters.is_none() && w.annotation.is_any(),
            _ => false,
        }
    }

    pub fn is_ellipsis(&self) -> bool {
        matches!(self, TypePattern::Ellipsis)
    }

    pub fn is_varargs(&self) -> bool {
        match self {
            TypePattern::Exact(e) => e.varargs,
            TypePattern::Wild(w) => w.varargs,
            _ => false,
        }
    }

    /// The single type this pattern stands for, if any
    pub fn exact_type(&self) -> Option<&UnresolvedType> {
        match self {
            TypePattern::Exact(e) => Some(&e.ty),
            TypePattern::Binding { ty, .. } => Some(ty),
            _ => None,
        }
    }

    pub fn formal_index(&self) -> Option<usize> {
        match self {
            TypePattern::Binding { formal_index, .. } => Some(*formal_index),
            _ => None,
        }
    }

    pub fn matches_statically(&self, world: &mut TypeUniverse, ty: TypeId) -> bool {
        self.matches(world, ty, MatchKind::Static).always_true()
    }

    pub fn matches(&self, world: &mut TypeUniverse, ty: TypeId, kind: MatchKind) -> TriState {
        match self {
            TypePattern::Any | TypePattern::Ellipsis => TriState::Yes,
            TypePattern::NoType => TriState::No,
            TypePattern::Exact(e) => match_exact(world, e, ty, kind),
            TypePattern::Binding { ty: bound, .. } => match_exact(world, &ExactTypePattern::new(bound.clone()), ty, MatchKind::Dynamic),
            TypePattern::Wild(w) => match kind {
                MatchKind::Static => TriState::from_bool(w.matches_type(world, ty, w.include_subtypes)),
                MatchKind::Dynamic => {
                    let ty = world.upper_bound(ty);
                    if w.matches_type(world, ty, true) {
                        TriState::Yes
                    } else if world.is_final(ty) || world.is_missing(ty) {
                        TriState::No
                    } else {
                        TriState::Maybe
                    }
                }
            },
            TypePattern::HasMember { signature } => TriState::from_bool(has_member(world, signature, ty)),
            TypePattern::And(l, r) => l.matches(world, ty, kind).and_then(|| r.matches(world, ty, kind)),
            TypePattern::Or(l, r) => l.matches(world, ty, kind).or_else(|| r.matches(world, ty, kind)),
            TypePattern::Not(p) => p.matches(world, ty, kind).negate(),
        }
    }

    /// Resolve names against the scope; `bindings` is `None` where binding a
    /// formal is not allowed.
    pub fn resolve_bindings(self, cx: &mut ResolveContext<'_>, bindings: Option<&mut Bindings>, allow_parameterized: bool) -> TypePattern {
        match self {
            TypePattern::Wild(w) => resolve_wild(w, cx, bindings, allow_parameterized),
            TypePattern::Exact(mut e) => {
                if e.ty.is_parameterized() && !allow_parameterized {
                    cx.error(PARAMETERIZED_NOT_ALLOWED);
                    return TypePattern::NoType;
                }
                e.annotation = e.annotation.resolve_bindings(cx, None);
                TypePattern::Exact(e)
            }
            TypePattern::HasMember { signature } => TypePattern::HasMember {
                signature: Box::new(signature.resolve_bindings(cx)),
            },
            TypePattern::And(l, r) => TypePattern::and(l.resolve_bindings(cx, None, allow_parameterized), r.resolve_bindings(cx, None, allow_parameterized)),
            TypePattern::Or(l, r) => TypePattern::or(l.resolve_bindings(cx, None, allow_parameterized), r.resolve_bindings(cx, None, allow_parameterized)),
            TypePattern::Not(p) => TypePattern::not(p.resolve_bindings(cx, None, allow_parameterized)),
            other => other,
        }
    }

    /// Renumber bindings for the advice being concretized. A binding whose
    /// formal is not passed on becomes an exact test of its constraint.
    pub fn remap(&self, map: &IntMap) -> TypePattern {
        match self {
            TypePattern::Binding { formal_index, ty } => match map.get(*formal_index) {
                Some(mapped) => TypePattern::Binding { formal_index: mapped, ty: ty.clone() },
                None => TypePattern::exact(map.constraint(*formal_index).cloned().unwrap_or_else(|| ty.clone())),
            },
            TypePattern::And(l, r) => TypePattern::and(l.remap(map), r.remap(map)),
            TypePattern::Or(l, r) => TypePattern::or(l.remap(map), r.remap(map)),
            TypePattern::Not(p) => TypePattern::not(p.remap(map)),
            other => other.clone(),
        }
    }
}

const PARAMETERIZED_NOT_ALLOWED: &str = "parameterized types not supported for this and target pointcuts (erasure limitation)";

fn match_exact(world: &mut TypeUniverse, pattern: &ExactTypePattern, ty: TypeId, kind: MatchKind) -> TriState {
    let target = world.resolve(&pattern.ty);
    if world.is_missing(target) || world.is_missing(ty) {
        return TriState::No;
    }
    let result = match kind {
        MatchKind::Static => TriState::from_bool(matches_exact_statically(world, target, pattern.include_subtypes, ty)),
        MatchKind::Dynamic => {
            let ty = world.upper_bound(ty);
            if world.is_assignable_from(target, ty) {
                TriState::Yes
            } else if world.is_coercible_from(target, ty) {
                TriState::Maybe
            } else {
                TriState::No
            }
        }
    };
    if pattern.annotation.is_any() || result.always_false() {
        return result;
    }
    let annotations = world.annotations(ty);
    result.and(pattern.annotation.matches(world, &annotations))
}

fn matches_exact_statically(world: &mut TypeUniverse, target: TypeId, include_subtypes: bool, ty: TypeId) -> bool {
    if target == ty {
        return true;
    }
    let t = world.ty(target);
    // `List` names every parameterization of List; `List<String>` only itself
    if !t.is_parameterized() && t.unresolved().erasure_signature() == world.ty(ty).unresolved().erasure_signature() {
        return true;
    }
    include_subtypes && world.is_assignable_from(target, ty)
}

fn has_member(world: &mut TypeUniverse, signature: &SignaturePattern, ty: TypeId) -> bool {
    if world.is_missing(ty) {
        return false;
    }
    for owner in world.hierarchy(ty) {
        let members = if signature.kind == MemberKind::Field { world.declared_fields(owner) } else { world.declared_methods(owner) };
        if members.iter().any(|m| signature.matches(world, m).always_true()) {
            return true;
        }
    }
    false
}

fn resolve_wild(mut w: WildTypePattern, cx: &mut ResolveContext<'_>, bindings: Option<&mut Bindings>, allow_parameterized: bool) -> TypePattern {
    let plain = w.dims == 0 && !w.varargs && !w.include_subtypes && w.type_parameters.is_none() && w.annotation.is_any();
    if plain && w.name.is_simple_identifier() {
        if let Some((index, formal)) = cx.scope.lookup_formal(w.name.text()) {
            let ty = formal.ty.clone();
            let Some(bindings) = bindings else {
                cx.error(format!("binding not allowed in this position: {}", w.name));
                return TypePattern::NoType;
            };
            if !bindings.register(index) {
                cx.error(format!("formal '{}' is bound more than once", w.name));
            }
            return TypePattern::Binding { formal_index: index, ty };
        }
    }

    if let Some(parameters) = w.type_parameters.take() {
        if !allow_parameterized {
            cx.error(PARAMETERIZED_NOT_ALLOWED);
            return TypePattern::NoType;
        }
        w.type_parameters = Some(parameters.resolve_bindings(cx, None, true));
    }
    w.annotation = std::mem::replace(&mut w.annotation, AnnotationTypePattern::Any).resolve_bindings(cx, None);

    if w.name.is_exact() {
        let id = cx.lookup_type(w.name.text());
        if cx.world.is_missing(id) {
            cx.world.report_lint(Lint::InvalidAbsoluteTypeName, format!("no match for this type name: {}", w.name), cx.location());
            return TypePattern::NoType;
        }
        let base = cx.world.to_unresolved(id);
        let ty = match &w.type_parameters {
            None => Some(base.clone()),
            Some(parameters) => parameters.exact_types().map(|args| UnresolvedType::parameterized(&base.base_name(), args)),
        };
        if let Some(ty) = ty {
            return TypePattern::Exact(ExactTypePattern {
                ty: ty.make_array(w.dims + u32::from(w.varargs)),
                include_subtypes: w.include_subtypes,
                varargs: w.varargs,
                annotation: w.annotation,
            });
        }
        // wildcard type arguments: keep matching by name, now fully qualified
        w.name = NamePattern::new(base.base_name());
        return TypePattern::Wild(w);
    }

    let mut prefixes: Vec<String> = cx.scope.import_prefixes().to_vec();
    if let Some(enclosing) = cx.scope.enclosing_type() {
        prefixes.push(format!("{}.", enclosing.base_name()));
    }
    w.known_prefixes = prefixes;
    TypePattern::Wild(w)
}

fn write_type_suffix(f: &mut fmt::Formatter<'_>, include_subtypes: bool, dims: u32, varargs: bool) -> fmt::Result {
    if include_subtypes {
        write!(f, "+")?;
    }
    let plain = if varargs { dims.saturating_sub(1) } else { dims };
    for _ in 0..plain {
        write!(f, "[]")?;
    }
    if varargs {
        write!(f, "...")?;
    }
    Ok(())
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypePattern::Any => write!(f, "*"),
            TypePattern::NoType => write!(f, "<nothing>"),
            TypePattern::Ellipsis => write!(f, ".."),
            TypePattern::Exact(e) => {
                if !e.annotation.is_any() {
                    write!(f, "({} ", e.annotation)?;
                }
                let (element, dims) = e.ty.element_type();
                write!(f, "{}", element.name())?;
                write_type_suffix(f, e.include_subtypes, dims, e.varargs)?;
                if !e.annotation.is_any() {
                    write!(f, ")")?;
                }
                Ok(())
            }
            TypePattern::Wild(w) => {
                if !w.annotation.is_any() {
                    write!(f, "({} ", w.annotation)?;
                }
                write!(f, "{}", w.name)?;
                if let Some(parameters) = &w.type_parameters {
                    write!(f, "<{}>", parameters)?;
                }
                write_type_suffix(f, w.include_subtypes, w.dims + u32::from(w.varargs), w.varargs)?;
                if !w.annotation.is_any() {
                    write!(f, ")")?;
                }
                Ok(())
            }
            TypePattern::Binding { ty, .. } => write!(f, "{}", ty.name()),
            TypePattern::HasMember { signature } => {
                let keyword = if signature.kind == MemberKind::Field { "hasfield" } else { "hasmethod" };
                write!(f, "{}({})", keyword, signature)
            }
            TypePattern::And(l, r) => write!(f, "({} && {})", l, r),
            TypePattern::Or(l, r) => write!(f, "({} || {})", l, r),
            TypePattern::Not(p) => write!(f, "!{}", p),
        }
    }
}

impl Persistent for TypePattern {
    const FAMILY: u8 = 2;

    fn kind_tag(&self) -> u8 {
        match self {
            TypePattern::Any => 1,
            TypePattern::NoType => 2,
            TypePattern::Exact(_) => 3,
            TypePattern::Wild(_) => 4,
            TypePattern::Binding { .. } => 5,
            TypePattern::HasMember { .. } => 6,
            TypePattern::And(..) => 7,
            TypePattern::Or(..) => 8,
            TypePattern::Not(_) => 9,
            TypePattern::Ellipsis => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::SimpleScope;
    use crate::patterns::parser::parse_type_pattern;
    use crate::types::{InMemoryTypeSource, TypeDescriptor};
    use std::sync::Arc;
    use weaver_common::{CollectingHandler, WorldConfig};

    fn universe(handler: CollectingHandler) -> TypeUniverse {
        let source = InMemoryTypeSource::with_java_lang();
        source.add(TypeDescriptor::class("com.acme.Base").method("void", "run", &[]));
        source.add(TypeDescriptor::class("com.acme.Derived").extends("com.acme.Base"));
        source.add(TypeDescriptor::class("com.acme.sub.Leaf").extends("com.acme.Derived").final_type());
        source.add(TypeDescriptor::aspect("com.acme.Tracing"));
        TypeUniverse::new(WorldConfig::default(), Arc::new(source), Arc::new(handler))
    }

    fn resolved(world: &mut TypeUniverse, text: &str) -> TypePattern {
        let scope = SimpleScope::for_type(UnresolvedType::for_name("com.acme.Tracing")).with_formal("s", "java.lang.String");
        let mut cx = ResolveContext::new(world, &scope);
        let mut bindings = Bindings::new(1);
        parse_type_pattern(text).expect("pattern should parse").resolve_bindings(&mut cx, Some(&mut bindings), true)
    }

    #[test]
    fn test_names_resolve_to_exact_types() {
        let mut world = universe(CollectingHandler::new());
        let p = resolved(&mut world, "Base");
        assert_eq!(p, TypePattern::exact_name("com.acme.Base"));
        let derived = world.resolve_name("com.acme.Derived");
        let base = world.resolve_name("com.acme.Base");
        assert!(p.matches_statically(&mut world, base));
        assert!(!p.matches_statically(&mut world, derived));
        assert!(resolved(&mut world, "Base+").matches_statically(&mut world, derived));
    }

    #[test]
    fn test_dynamic_matching_is_instanceof() {
        let mut world = universe(CollectingHandler::new());
        let p = resolved(&mut world, "Derived");
        let base = world.resolve_name("com.acme.Base");
        let leaf = world.resolve_name("com.acme.sub.Leaf");
        let string = world.resolve_name("java.lang.String");
        assert_eq!(p.matches(&mut world, leaf, MatchKind::Dynamic), TriState::Yes);
        assert_eq!(p.matches(&mut world, base, MatchKind::Dynamic), TriState::Maybe);
        assert_eq!(p.matches(&mut world, string, MatchKind::Dynamic), TriState::No);
    }

    #[test]
    fn test_wildcards_and_subtypes() {
        let mut world = universe(CollectingHandler::new());
        let leaf = world.resolve_name("com.acme.sub.Leaf");
        let string = world.resolve_name("java.lang.String");
        let p = resolved(&mut world, "com.acme..*");
        assert!(p.matches_statically(&mut world, leaf));
        assert!(!p.matches_statically(&mut world, string));
        let p = resolved(&mut world, "*Base+");
        assert!(p.matches_statically(&mut world, leaf));
        let p = resolved(&mut world, "!com.acme..*");
        assert!(p.matches_statically(&mut world, string));
        let p = resolved(&mut world, "(Base || java.lang.String)");
        assert!(p.matches_statically(&mut world, string));
    }

    #[test]
    fn test_formal_names_bind() {
        let mut world = universe(CollectingHandler::new());
        assert_eq!(resolved(&mut world, "s"), TypePattern::Binding { formal_index: 0, ty: UnresolvedType::string() });
    }

    #[test]
    fn test_binding_under_negation_is_an_error() {
        let handler = CollectingHandler::new();
        let mut world = universe(handler.clone());
        assert_eq!(resolved(&mut world, "!s"), TypePattern::not(TypePattern::NoType));
        assert!(handler.contains("binding not allowed"));
    }

    #[test]
    fn test_unknown_name_is_reported_and_matches_nothing() {
        let handler = CollectingHandler::new();
        let mut world = universe(handler.clone());
        assert_eq!(resolved(&mut world, "com.acme.Nope"), TypePattern::NoType);
        assert!(handler.contains("[Xlint:invalidAbsoluteTypeName]"));
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_generic_patterns() {
        let mut world = universe(CollectingHandler::new());
        let strings = world.resolve_name("java.util.List<java.lang.String>");
        let ints = world.resolve_name("java.util.List<java.lang.Integer>");
        let p = resolved(&mut world, "java.util.List<String>");
        assert!(p.matches_statically(&mut world, strings));
        assert!(!p.matches_statically(&mut world, ints));
        let raw = resolved(&mut world, "java.util.List");
        assert!(raw.matches_statically(&mut world, ints));
        let wild = resolved(&mut world, "java.util.List<*>");
        assert!(matches!(&wild, TypePattern::Wild(w) if w.name.text() == "java.util.List"));
        assert!(wild.matches_statically(&mut world, ints));
    }

    #[test]
    fn test_arrays_and_has_member() {
        let mut world = universe(CollectingHandler::new());
        let strings = world.resolve_name("java.lang.String[]");
        let string = world.resolve_name("java.lang.String");
        assert!(resolved(&mut world, "String[]").matches_statically(&mut world, strings));
        assert!(!resolved(&mut world, "String[]").matches_statically(&mut world, string));
        assert!(resolved(&mut world, "*[]").matches_statically(&mut world, strings));
        let derived = world.resolve_name("com.acme.Derived");
        assert!(resolved(&mut world, "hasmethod(void run())").matches_statically(&mut world, derived));
        assert!(!resolved(&mut world, "hasmethod(void stop())").matches_statically(&mut world, derived));
    }

    #[test]
    fn test_remap_unmapped_binding_becomes_exact() {
        let binding = TypePattern::Binding { formal_index: 1, ty: UnresolvedType::object() };
        let mut map = IntMap::new();
        map.put(1, 3);
        assert_eq!(binding.remap(&map).formal_index(), Some(3));
        let mut constrained = IntMap::new();
        constrained.constrain(1, UnresolvedType::string());
        assert_eq!(binding.remap(&constrained), TypePattern::exact(UnresolvedType::string()));
    }
}
