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

//! Member signature patterns, e.g. `public * com.acme..*Service.find*(String, ..) throws IOException`

use crate::binding::ResolveContext;
use crate::patterns::annotation_pattern::AnnotationTypePattern;
use crate::patterns::modifiers::ModifiersPattern;
use crate::patterns::name_pattern::NamePattern;
use crate::patterns::type_pattern::{MatchKind, TypePattern};
use crate::patterns::type_pattern_list::TypePatternList;
use crate::tristate::TriState;
use crate::types::{MemberKind, ResolvedMember, TypeId, TypeUniverse};
use serde::{Deserialize, Serialize};
use std::fmt;
use weaver_common::Persistent;

/// `throws A, !B`: every required pattern must match a declared exception,
/// no forbidden pattern may.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThrowsPattern {
    pub required: Vec<TypePattern>,
    pub forbidden: Vec<TypePattern>,
}

impl ThrowsPattern {
    pub fn is_any(&self) -> bool {
        self.required.is_empty() && self.forbidden.is_empty()
    }

    fn matches(&self, world: &mut TypeUniverse, exceptions: &[TypeId]) -> bool {
        let any_matches = |world: &mut TypeUniverse, p: &TypePattern| exceptions.iter().any(|e| p.matches_statically(world, *e));
        self.required.iter().all(|p| any_matches(world, p)) && !self.forbidden.iter().any(|p| any_matches(world, p))
    }

    fn resolve_bindings(self, cx: &mut ResolveContext<'_>) -> Self {
        Self {
            required: self.required.into_iter().map(|p| p.resolve_bindings(cx, None, true)).collect(),
            forbidden: self.forbidden.into_iter().map(|p| p.resolve_bindings(cx, None, true)).collect(),
        }
    }
}

impl fmt::Display for ThrowsPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.required.iter().map(ToString::to_string).collect();
        parts.extend(self.forbidden.iter().map(|p| format!("!{}", p)));
        write!(f, "throws {}", parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePattern {
    pub kind: MemberKind,
    pub annotation: AnnotationTypePattern,
    pub modifiers: ModifiersPattern,
    pub return_type: TypePattern,
    pub declaring_type: TypePattern,
    pub name: NamePattern,
    pub parameters: TypePatternList,
    pub throws: ThrowsPattern,
}

impl SignaturePattern {
    /// Matches every member of `kind`
    pub fn any(kind: MemberKind) -> Self {
        Self {
            kind,
            annotation: AnnotationTypePattern::Any,
            modifiers: ModifiersPattern::ANY,
            return_type: TypePattern::Any,
            declaring_type: TypePattern::Any,
            name: NamePattern::any(),
            parameters: TypePatternList::any(),
            throws: ThrowsPattern::default(),
        }
    }

    pub fn method(return_type: TypePattern, declaring_type: TypePattern, name: &str, parameters: TypePatternList) -> Self {
        Self {
            return_type,
            declaring_type,
            name: NamePattern::new(name),
            parameters,
            ..Self::any(MemberKind::Method)
        }
    }

    pub fn constructor(declaring_type: TypePattern, parameters: TypePatternList) -> Self {
        Self {
            declaring_type,
            name: NamePattern::new("<init>"),
            parameters,
            ..Self::any(MemberKind::Constructor)
        }
    }

    pub fn field(field_type: TypePattern, declaring_type: TypePattern, name: &str) -> Self {
        Self {
            return_type: field_type,
            declaring_type,
            name: NamePattern::new(name),
            parameters: TypePatternList::empty(),
            ..Self::any(MemberKind::Field)
        }
    }

    /// `staticinitialization(T)` and exception handlers name only a type
    pub fn for_type(kind: MemberKind, declaring_type: TypePattern) -> Self {
        Self {
            declaring_type,
            parameters: TypePatternList::empty(),
            ..Self::any(kind)
        }
    }

    pub fn with_modifiers(mut self, modifiers: ModifiersPattern) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationTypePattern) -> Self {
        self.annotation = annotation;
        self
    }

    pub fn with_throws(mut self, throws: ThrowsPattern) -> Self {
        self.throws = throws;
        self
    }

    fn has_name(&self) -> bool {
        matches!(self.kind, MemberKind::Method | MemberKind::Field | MemberKind::Advice)
    }

    fn has_parameters(&self) -> bool {
        matches!(self.kind, MemberKind::Method | MemberKind::Constructor | MemberKind::Advice)
    }

    pub fn matches(&self, world: &mut TypeUniverse, member: &ResolvedMember) -> TriState {
        if self.kind != member.kind || !self.matches_ignoring_declaring_type(world, member) {
            return TriState::No;
        }
        TriState::from_bool(self.declaring_type_matches(world, member))
    }

    /// Everything but the declaring type; used to explain near misses on call join points
    pub fn matches_ignoring_declaring_type(&self, world: &mut TypeUniverse, member: &ResolvedMember) -> bool {
        if self.kind != member.kind || !self.modifiers.matches(member.modifiers) {
            return false;
        }
        if self.has_name() && !self.name.matches(&member.name) {
            return false;
        }
        if !self.annotation.is_any() && !self.annotation.matches(world, &member.annotations).always_true() {
            return false;
        }
        if matches!(self.kind, MemberKind::Method | MemberKind::Field | MemberKind::Advice) && !self.return_type.is_any() {
            let ret = world.resolve(&member.return_type);
            if !self.return_type.matches_statically(world, ret) {
                return false;
            }
        }
        if self.has_parameters() {
            if self.parameters.patterns().last().is_some_and(TypePattern::is_varargs) && !member.varargs {
                return false;
            }
            let params: Vec<TypeId> = member.parameter_types.iter().map(|p| world.resolve(p)).collect();
            if !self.parameters.matches(world, &params, MatchKind::Static).always_true() {
                return false;
            }
        }
        if !self.throws.is_any() {
            let exceptions: Vec<TypeId> = member.exceptions.iter().map(|e| world.resolve(e)).collect();
            if !self.throws.matches(world, &exceptions) {
                return false;
            }
        }
        true
    }

    /// The declaring type, or any supertype where an overridden method was first declared
    pub fn declaring_type_matches(&self, world: &mut TypeUniverse, member: &ResolvedMember) -> bool {
        if self.declaring_type.is_any() {
            return true;
        }
        let declaring = world.resolve(&member.declaring_type);
        if self.declaring_type.matches_statically(world, declaring) {
            return true;
        }
        if self.kind != MemberKind::Method || member.is_static() || member.is_private() {
            return false;
        }
        for s in world.all_supertypes(declaring) {
            let declares = world.declared_methods(s).iter().any(|m| m.same_name_and_parameters(member) && !m.is_private());
            if declares && self.declaring_type.matches_statically(world, s) {
                return true;
            }
        }
        false
    }

    pub fn resolve_bindings(self, cx: &mut ResolveContext<'_>) -> Self {
        Self {
            kind: self.kind,
            annotation: self.annotation.resolve_bindings(cx, None),
            modifiers: self.modifiers,
            return_type: self.return_type.resolve_bindings(cx, None, true),
            declaring_type: self.declaring_type.resolve_bindings(cx, None, true),
            name: self.name,
            parameters: self.parameters.resolve_bindings(cx, None, true),
            throws: self.throws.resolve_bindings(cx),
        }
    }
}

impl fmt::Display for SignaturePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.annotation.is_any() {
            write!(f, "{} ", self.annotation)?;
        }
        if !self.modifiers.is_any() {
            write!(f, "{} ", self.modifiers)?;
        }
        match self.kind {
            MemberKind::StaticInitialization | MemberKind::Handler => return write!(f, "{}", self.declaring_type),
            MemberKind::Constructor => {
                if !self.declaring_type.is_any() {
                    write!(f, "{}.", self.declaring_type)?;
                }
                write!(f, "new")?;
            }
            _ => {
                write!(f, "{} ", self.return_type)?;
                if !self.declaring_type.is_any() {
                    write!(f, "{}.", self.declaring_type)?;
                }
                write!(f, "{}", self.name)?;
            }
        }
        if self.has_parameters() {
            write!(f, "({})", self.parameters)?;
        }
        if !self.throws.is_any() {
            write!(f, " {}", self.throws)?;
        }
        Ok(())
    }
}

impl Persistent for SignaturePattern {
    const FAMILY: u8 = 4;

    fn kind_tag(&self) -> u8 {
        match self.kind {
            MemberKind::Method => 1,
            MemberKind::Constructor => 2,
            MemberKind::Field => 3,
            MemberKind::StaticInitialization => 4,
            MemberKind::Handler => 5,
            MemberKind::Advice => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::SimpleScope;
    use crate::patterns::parser::parse_signature_pattern;
    use crate::types::{InMemoryTypeSource, TypeDescriptor, UnresolvedType, modifiers};
    use std::sync::Arc;
    use weaver_common::{CollectingHandler, WorldConfig};

    fn universe() -> TypeUniverse {
        let source = InMemoryTypeSource::with_java_lang();
        source.add(TypeDescriptor::interface("com.acme.Repo").method("java.lang.Object", "find", &["java.lang.String"]));
        source.add(
            TypeDescriptor::class("com.acme.SqlRepo")
                .implements("com.acme.Repo")
                .method("java.lang.Object", "find", &["java.lang.String"])
                .method("void", "close", &[]),
        );
        TypeUniverse::new(WorldConfig::default(), Arc::new(source), Arc::new(CollectingHandler::new()))
    }

    fn sig(world: &mut TypeUniverse, text: &str) -> SignaturePattern {
        let scope = SimpleScope::for_type(UnresolvedType::for_name("com.acme.Tracing"));
        let mut cx = ResolveContext::new(world, &scope);
        parse_signature_pattern(text, MemberKind::Method).expect("signature should parse").resolve_bindings(&mut cx)
    }

    fn member(world: &mut TypeUniverse, owner: &str, name: &str) -> ResolvedMember {
        let id = world.resolve_name(owner);
        world.declared_methods(id).into_iter().find(|m| m.name == name).expect("member exists")
    }

    #[test]
    fn test_overridden_declaration_matches_supertype_pattern() {
        let mut world = universe();
        let find = member(&mut world, "com.acme.SqlRepo", "find");
        let close = member(&mut world, "com.acme.SqlRepo", "close");
        let p = sig(&mut world, "* Repo.find(String)");
        assert_eq!(p.matches(&mut world, &find), TriState::Yes);
        let p = sig(&mut world, "* Repo.close()");
        assert_eq!(p.matches(&mut world, &close), TriState::No);
        assert!(p.matches_ignoring_declaring_type(&mut world, &close));
    }

    #[test]
    fn test_modifiers_params_and_throws() {
        let mut world = universe();
        let close = member(&mut world, "com.acme.SqlRepo", "close").with_exceptions(vec![UnresolvedType::for_name("java.io.IOException")]);
        assert_eq!(sig(&mut world, "public void *()").matches(&mut world, &close), TriState::Yes);
        assert_eq!(sig(&mut world, "!public * *(..)").matches(&mut world, &close), TriState::No);
        assert_eq!(sig(&mut world, "* *(*)").matches(&mut world, &close), TriState::No);
        assert_eq!(sig(&mut world, "* *(..) throws java.io.IOException").matches(&mut world, &close), TriState::Yes);
        assert_eq!(sig(&mut world, "* *(..) throws !Exception+").matches(&mut world, &close), TriState::No);
        let mut quiet = close.clone();
        quiet.modifiers = modifiers::PUBLIC | modifiers::STATIC;
        assert_eq!(sig(&mut world, "static * close(..)").matches(&mut world, &quiet), TriState::Yes);
    }

    #[test]
    fn test_display() {
        let mut world = universe();
        assert_eq!(sig(&mut world, "public * com.acme..*.find*(String, ..)").to_string(), "public * com.acme..*.find*(java.lang.String, ..)");
    }
}
