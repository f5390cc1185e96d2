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

//! Annotation patterns: `@Foo`, `@Foo(value="x")`, `!@Foo`, bindable formals

use crate::binding::{Bindings, IntMap, ResolveContext};
use crate::lint::Lint;
use crate::patterns::name_pattern::NamePattern;
use crate::tristate::TriState;
use crate::types::{AnnotationAj, TypeId, TypeUniverse, UnresolvedType};
use serde::{Deserialize, Serialize};
use std::fmt;
use weaver_common::Persistent;

/// `name="value"` or `name!="value"` inside an annotation pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedValueConstraint {
    pub name: String,
    pub value: String,
    pub negated: bool,
}

impl NamedValueConstraint {
    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            negated: false,
        }
    }

    pub fn not_equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            negated: true,
            ..Self::equals(name, value)
        }
    }

    /// Missing values fall back to the element default declared by the annotation type
    fn satisfied_by(&self, world: &mut TypeUniverse, annotation: &AnnotationAj) -> bool {
        let value = match annotation.value(&self.name) {
            Some(v) => Some(v.to_string()),
            None => {
                let ty = world.resolve(annotation.annotation_type());
                world.declared_methods(ty).into_iter().find(|m| m.name == self.name).and_then(|m| m.default_value)
            }
        };
        (value.as_deref() == Some(self.value.as_str())) != self.negated
    }
}

fn values_satisfied(world: &mut TypeUniverse, values: &[NamedValueConstraint], annotation: &AnnotationAj) -> bool {
    values.iter().all(|v| v.satisfied_by(world, annotation))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationTypePattern {
    Any,
    Exact { ty: UnresolvedType, values: Vec<NamedValueConstraint> },
    Binding { formal_index: usize, ty: UnresolvedType },
    Wild { name: NamePattern, values: Vec<NamedValueConstraint>, known_prefixes: Vec<String> },
    /// Both annotations present, written `@A @B`
    And(Box<AnnotationTypePattern>, Box<AnnotationTypePattern>),
    Or(Box<AnnotationTypePattern>, Box<AnnotationTypePattern>),
    Not(Box<AnnotationTypePattern>),
    Ellipsis,
}

impl AnnotationTypePattern {
    pub fn named(name: &str) -> Self {
        AnnotationTypePattern::Wild {
            name: NamePattern::new(name),
            values: Vec::new(),
            known_prefixes: Vec::new(),
        }
    }

    pub fn exact(ty: UnresolvedType) -> Self {
        AnnotationTypePattern::Exact { ty, values: Vec::new() }
    }

    pub fn and(left: Self, right: Self) -> Self {
        AnnotationTypePattern::And(Box::new(left), Box::new(right))
    }

    pub fn not(inner: Self) -> Self {
        AnnotationTypePattern::Not(Box::new(inner))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, AnnotationTypePattern::Any)
    }

    pub fn is_ellipsis(&self) -> bool {
        matches!(self, AnnotationTypePattern::Ellipsis)
    }

    pub fn annotation_type(&self) -> Option<&UnresolvedType> {
        match self {
            AnnotationTypePattern::Exact { ty, .. } | AnnotationTypePattern::Binding { ty, .. } => Some(ty),
            _ => None,
        }
    }

    pub fn formal_index(&self) -> Option<usize> {
        match self {
            AnnotationTypePattern::Binding { formal_index, .. } => Some(*formal_index),
            _ => None,
        }
    }

    /// Whether an element carrying `annotations` is matched
    pub fn matches(&self, world: &mut TypeUniverse, annotations: &[AnnotationAj]) -> TriState {
        match self {
            AnnotationTypePattern::Any | AnnotationTypePattern::Ellipsis => TriState::Yes,
            AnnotationTypePattern::Exact { ty, values } => {
                let found = annotations.iter().find(|a| a.is_of_type(ty));
                TriState::from_bool(found.is_some_and(|a| values_satisfied(world, values, a)))
            }
            AnnotationTypePattern::Binding { ty, .. } => TriState::from_bool(annotations.iter().any(|a| a.is_of_type(ty))),
            AnnotationTypePattern::Wild { name, values, known_prefixes } => {
                let matched = annotations.iter().any(|a| {
                    let type_name = a.annotation_type().base_name();
                    let name_ok = name.matches(&type_name) || known_prefixes.iter().any(|p| type_name.strip_prefix(p.as_str()).is_some_and(|rest| name.matches(rest)));
                    name_ok && values_satisfied(world, values, a)
                });
                TriState::from_bool(matched)
            }
            AnnotationTypePattern::And(l, r) => l.matches(world, annotations).and_then(|| r.matches(world, annotations)),
            AnnotationTypePattern::Or(l, r) => l.matches(world, annotations).or_else(|| r.matches(world, annotations)),
            AnnotationTypePattern::Not(p) => p.matches(world, annotations).negate(),
        }
    }

    /// Match the annotations a value of static type `ty` carries at runtime.
    ///
    /// A subtype may carry annotations the static type lacks, so a miss is only
    /// definite for final types.
    pub fn matches_runtime_type(&self, world: &mut TypeUniverse, ty: TypeId) -> TriState {
        if self.is_any() || self.is_ellipsis() {
            return TriState::Yes;
        }
        let annotations = world.annotations(ty);
        match self.matches(world, &annotations) {
            TriState::Yes => TriState::Yes,
            _ if world.is_final(ty) || world.is_missing(ty) => TriState::No,
            _ => TriState::Maybe,
        }
    }

    pub fn resolve_bindings(self, cx: &mut ResolveContext<'_>, bindings: Option<&mut Bindings>) -> Self {
        match self {
            AnnotationTypePattern::Wild { name, values, known_prefixes: _ } => {
                if !name.is_exact() {
                    let known_prefixes = cx.scope.import_prefixes().to_vec();
                    return AnnotationTypePattern::Wild { name, values, known_prefixes };
                }
                if values.is_empty() && name.is_simple_identifier() {
                    if let Some((index, formal)) = cx.scope.lookup_formal(name.text()) {
                        let ty = formal.ty.clone();
                        let Some(bindings) = bindings else {
                            cx.error(format!("binding not allowed in this position: @{}", name));
                            return AnnotationTypePattern::Any;
                        };
                        if !bindings.register(index) {
                            cx.error(format!("formal '{}' is bound more than once", name));
                        }
                        let id = cx.world.resolve(&ty);
                        if !cx.world.is_annotation(id) {
                            cx.error(format!("{} is not an annotation type", ty.name()));
                        }
                        return AnnotationTypePattern::Binding { formal_index: index, ty };
                    }
                }
                let id = cx.lookup_type(name.text());
                if cx.world.is_missing(id) {
                    cx.world.report_lint(Lint::InvalidAbsoluteTypeName, format!("no match for this type name: {}", name), cx.location());
                    return AnnotationTypePattern::Exact {
                        ty: UnresolvedType::for_name(name.text()),
                        values,
                    };
                }
                if !cx.world.is_annotation(id) {
                    cx.error(format!("{} is not an annotation type", cx.world.name(id)));
                }
                AnnotationTypePattern::Exact { ty: cx.world.to_unresolved(id), values }
            }
            AnnotationTypePattern::And(l, r) => AnnotationTypePattern::and(l.resolve_bindings(cx, None), r.resolve_bindings(cx, None)),
            AnnotationTypePattern::Or(l, r) => AnnotationTypePattern::Or(Box::new(l.resolve_bindings(cx, None)), Box::new(r.resolve_bindings(cx, None))),
            AnnotationTypePattern::Not(p) => AnnotationTypePattern::not(p.resolve_bindings(cx, None)),
            other => other,
        }
    }

    pub fn remap(&self, map: &IntMap) -> Self {
        match self {
            AnnotationTypePattern::Binding { formal_index, ty } => match map.get(*formal_index) {
                Some(mapped) => AnnotationTypePattern::Binding { formal_index: mapped, ty: ty.clone() },
                None => AnnotationTypePattern::exact(map.constraint(*formal_index).cloned().unwrap_or_else(|| ty.clone())),
            },
            AnnotationTypePattern::And(l, r) => AnnotationTypePattern::and(l.remap(map), r.remap(map)),
            AnnotationTypePattern::Or(l, r) => AnnotationTypePattern::Or(Box::new(l.remap(map)), Box::new(r.remap(map))),
            AnnotationTypePattern::Not(p) => AnnotationTypePattern::not(p.remap(map)),
            other => other.clone(),
        }
    }
}

fn write_values(f: &mut fmt::Formatter<'_>, values: &[NamedValueConstraint]) -> fmt::Result {
    if values.is_empty() {
        return Ok(());
    }
    let parts: Vec<String> = values.iter().map(|v| format!("{}{}\"{}\"", v.name, if v.negated { "!=" } else { "=" }, v.value)).collect();
    write!(f, "({})", parts.join(", "))
}

impl fmt::Display for AnnotationTypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationTypePattern::Any => Ok(()),
            AnnotationTypePattern::Ellipsis => write!(f, ".."),
            AnnotationTypePattern::Exact { ty, values } => {
                write!(f, "@{}", ty.name())?;
                write_values(f, values)
            }
            AnnotationTypePattern::Binding { ty, .. } => write!(f, "@{}", ty.name()),
            AnnotationTypePattern::Wild { name, values, .. } => {
                write!(f, "@{}", name)?;
                write_values(f, values)
            }
            AnnotationTypePattern::And(l, r) => write!(f, "{} {}", l, r),
            AnnotationTypePattern::Or(l, r) => write!(f, "({} || {})", l, r),
            AnnotationTypePattern::Not(p) => write!(f, "!{}", p),
        }
    }
}

impl Persistent for AnnotationTypePattern {
    const FAMILY: u8 = 3;

    fn kind_tag(&self) -> u8 {
        match self {
            AnnotationTypePattern::Any => 1,
            AnnotationTypePattern::Exact { .. } => 2,
            AnnotationTypePattern::Binding { .. } => 3,
            AnnotationTypePattern::Wild { .. } => 4,
            AnnotationTypePattern::And(..) => 5,
            AnnotationTypePattern::Or(..) => 6,
            AnnotationTypePattern::Not(_) => 7,
            AnnotationTypePattern::Ellipsis => 8,
        }
    }
}

/// Argument annotation patterns of `@args(..)`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnnotationPatternList {
    patterns: Vec<AnnotationTypePattern>,
}

impl AnnotationPatternList {
    pub fn new(patterns: Vec<AnnotationTypePattern>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[AnnotationTypePattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Match against the runtime annotations of arguments with the given static types
    pub fn matches(&self, world: &mut TypeUniverse, arg_types: &[TypeId]) -> TriState {
        match_from(&self.patterns, world, arg_types)
    }

    /// Pattern index to argument index, when the list aligns with `arg_count` in one way
    pub fn positions(&self, arg_count: usize) -> Option<Vec<(usize, usize)>> {
        let ellipses = self.patterns.iter().filter(|p| p.is_ellipsis()).count();
        let fixed = self.len() - ellipses;
        match ellipses {
            0 if fixed == arg_count => Some((0..fixed).map(|i| (i, i)).collect()),
            1 if fixed <= arg_count => {
                let mut result = Vec::new();
                let mut arg = 0;
                for (i, p) in self.patterns.iter().enumerate() {
                    if p.is_ellipsis() {
                        arg += arg_count - fixed;
                    } else {
                        result.push((i, arg));
                        arg += 1;
                    }
                }
                Some(result)
            }
            _ => None,
        }
    }

    pub fn resolve_bindings(self, cx: &mut ResolveContext<'_>, mut bindings: Option<&mut Bindings>) -> Self {
        if self.patterns.iter().filter(|p| p.is_ellipsis()).count() > 1 {
            cx.error(format!("only one '..' allowed in an argument list: ({})", self));
        }
        Self {
            patterns: self.patterns.into_iter().map(|p| p.resolve_bindings(cx, bindings.as_deref_mut())).collect(),
        }
    }

    pub fn remap(&self, map: &IntMap) -> Self {
        Self {
            patterns: self.patterns.iter().map(|p| p.remap(map)).collect(),
        }
    }
}

fn match_from(patterns: &[AnnotationTypePattern], world: &mut TypeUniverse, types: &[TypeId]) -> TriState {
    let Some((first, rest)) = patterns.split_first() else {
        return TriState::from_bool(types.is_empty());
    };
    if first.is_ellipsis() {
        let mut best = TriState::No;
        for skip in 0..=types.len() {
            best = best.or(match_from(rest, world, &types[skip..]));
            if best.always_true() {
                break;
            }
        }
        return best;
    }
    let Some((ty, remaining)) = types.split_first() else {
        return TriState::No;
    };
    first.matches_runtime_type(world, *ty).and_then(|| match_from(rest, world, remaining))
}

impl fmt::Display for AnnotationPatternList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.patterns.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::SimpleScope;
    use crate::types::{InMemoryTypeSource, ResolvedMember, TypeDescriptor, modifiers};
    use std::sync::Arc;
    use weaver_common::{CollectingHandler, WorldConfig};

    fn universe(handler: CollectingHandler) -> TypeUniverse {
        let source = InMemoryTypeSource::with_java_lang();
        let owner = UnresolvedType::for_name("com.acme.Audited");
        source.add(
            TypeDescriptor::annotation_type("com.acme.Audited")
                .with_method(ResolvedMember::method(owner, modifiers::PUBLIC | modifiers::ABSTRACT, UnresolvedType::string(), "level", vec![]).with_default_value("low")),
        );
        source.add(TypeDescriptor::class("com.acme.Plain"));
        source.add(TypeDescriptor::class("com.acme.Service").with_annotation(AnnotationAj::named("com.acme.Audited")));
        source.add(TypeDescriptor::class("com.acme.Sealed").final_type());
        TypeUniverse::new(WorldConfig::default(), Arc::new(source), Arc::new(handler))
    }

    #[test]
    fn test_values_fall_back_to_defaults() {
        let mut world = universe(CollectingHandler::new());
        let audited = UnresolvedType::for_name("com.acme.Audited");
        let explicit = vec![AnnotationAj::new(audited.clone()).with_value("level", "high")];
        let defaulted = vec![AnnotationAj::new(audited.clone())];
        let high = AnnotationTypePattern::Exact {
            ty: audited.clone(),
            values: vec![NamedValueConstraint::equals("level", "high")],
        };
        let low = AnnotationTypePattern::Exact {
            ty: audited.clone(),
            values: vec![NamedValueConstraint::equals("level", "low")],
        };
        assert_eq!(high.matches(&mut world, &explicit), TriState::Yes);
        assert_eq!(high.matches(&mut world, &defaulted), TriState::No);
        assert_eq!(low.matches(&mut world, &defaulted), TriState::Yes);
        let not_low = AnnotationTypePattern::Exact {
            ty: audited,
            values: vec![NamedValueConstraint::not_equals("level", "low")],
        };
        assert_eq!(not_low.matches(&mut world, &explicit), TriState::Yes);
    }

    #[test]
    fn test_runtime_type_annotations() {
        let mut world = universe(CollectingHandler::new());
        let p = AnnotationTypePattern::exact(UnresolvedType::for_name("com.acme.Audited"));
        let service = world.resolve_name("com.acme.Service");
        let plain = world.resolve_name("com.acme.Plain");
        let sealed = world.resolve_name("com.acme.Sealed");
        assert_eq!(p.matches_runtime_type(&mut world, service), TriState::Yes);
        assert_eq!(p.matches_runtime_type(&mut world, plain), TriState::Maybe);
        assert_eq!(p.matches_runtime_type(&mut world, sealed), TriState::No);
        let list = AnnotationPatternList::new(vec![AnnotationTypePattern::Ellipsis, p]);
        assert_eq!(list.matches(&mut world, &[plain, service]), TriState::Yes);
    }

    #[test]
    fn test_resolution_binds_and_checks_kind() {
        let handler = CollectingHandler::new();
        let mut world = universe(handler.clone());
        let scope = SimpleScope::for_type(UnresolvedType::for_name("com.acme.Tracer")).with_formal("a", "com.acme.Audited");
        let mut cx = ResolveContext::new(&mut world, &scope);
        let mut bindings = Bindings::new(1);
        let bound = AnnotationTypePattern::named("a").resolve_bindings(&mut cx, Some(&mut bindings));
        assert_eq!(bound.formal_index(), Some(0));
        let exact = AnnotationTypePattern::named("Audited").resolve_bindings(&mut cx, None);
        assert_eq!(exact, AnnotationTypePattern::exact(UnresolvedType::for_name("com.acme.Audited")));
        assert!(!cx.has_errors());
        AnnotationTypePattern::named("Plain").resolve_bindings(&mut cx, None);
        assert!(cx.has_errors());
        assert!(handler.contains("is not an annotation type"));
    }

    #[test]
    fn test_wildcard_names_match_through_imports() {
        let mut world = universe(CollectingHandler::new());
        let audited = [AnnotationAj::named("com.acme.Audited")];
        let unresolved = AnnotationTypePattern::named("Audit*");
        assert_eq!(unresolved.matches(&mut world, &audited), TriState::No);
        let scope = SimpleScope::for_type(UnresolvedType::for_name("com.acme.Tracer"));
        let mut cx = ResolveContext::new(&mut world, &scope);
        let resolved = unresolved.resolve_bindings(&mut cx, None);
        assert!(!cx.has_errors());
        assert_eq!(resolved.matches(&mut world, &audited), TriState::Yes);
        assert_eq!(resolved.matches(&mut world, &[AnnotationAj::named("org.other.Audited")]), TriState::No);
    }
}
