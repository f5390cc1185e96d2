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

//! Generics-aware subtyping

use crate::types::resolved::TypeId;
use crate::types::universe::TypeUniverse;
use crate::types::unresolved::{TypeKind, WildcardBound};

const ARRAY_SUPERTYPES: [&str; 2] = ["Ljava/lang/Cloneable;", "Ljava/io/Serializable;"];

/// Primitive widening conversions, by signature character
fn widens_to(source: &str, target: &str) -> bool {
    let targets: &[&str] = match source {
        "B" => &["S", "I", "J", "F", "D"],
        "S" | "C" => &["I", "J", "F", "D"],
        "I" => &["J", "F", "D"],
        "J" => &["F", "D"],
        "F" => &["D"],
        _ => &[],
    };
    targets.contains(&target)
}

impl TypeUniverse {
    fn erasure_of(&self, id: TypeId) -> String {
        self.ty(id).unresolved().erasure_signature()
    }

    /// Upper bound of a type variable or wildcard; other types are their own bound
    pub fn upper_bound(&mut self, id: TypeId) -> TypeId {
        let t = self.ty(id);
        match (t.kind(), t.bound()) {
            (TypeKind::TypeVariableReference, Some((_, b))) => b,
            (TypeKind::Wildcard, Some((WildcardBound::Extends, b))) => b,
            (TypeKind::TypeVariableReference | TypeKind::Wildcard, _) => self.object(),
            _ => id,
        }
    }

    /// `id` followed by all of its supertypes
    pub fn hierarchy(&mut self, id: TypeId) -> Vec<TypeId> {
        let mut all = vec![id];
        all.extend(self.all_supertypes(id));
        all
    }

    /// Whether a value of type `source` may be assigned to `target` without a cast
    pub fn is_assignable_from(&mut self, target: TypeId, source: TypeId) -> bool {
        if target == source {
            return true;
        }
        if self.is_missing(target) || self.is_missing(source) {
            return false;
        }
        let (target_kind, source_kind) = (self.ty(target).kind(), self.ty(source).kind());
        match (target_kind, source_kind) {
            (_, TypeKind::TypeVariableReference | TypeKind::Wildcard) => {
                let bound = self.upper_bound(source);
                return bound != source && self.is_assignable_from(target, bound);
            }
            (TypeKind::TypeVariableReference | TypeKind::Wildcard, _) => {
                let bound = self.upper_bound(target);
                return bound != target && self.is_assignable_from(bound, source);
            }
            (TypeKind::Primitive, _) | (_, TypeKind::Primitive) => return self.ty(target).signature() == self.ty(source).signature(),
            _ => {}
        }
        if self.ty(target).is_object() {
            return true;
        }
        match (target_kind, source_kind) {
            (TypeKind::Array, TypeKind::Array) => {
                let (Some(tc), Some(sc)) = (self.ty(target).component_type(), self.ty(source).component_type()) else {
                    return false;
                };
                if self.ty(tc).is_primitive() || self.ty(sc).is_primitive() {
                    return self.ty(tc).signature() == self.ty(sc).signature();
                }
                self.is_assignable_from(tc, sc)
            }
            (TypeKind::Array, _) => false,
            (_, TypeKind::Array) => ARRAY_SUPERTYPES.contains(&self.ty(target).signature()),
            (TypeKind::Parameterized, _) => self.is_parameterization_assignable(target, source),
            // a raw or generic target accepts every parameterization of its erasure
            _ => self.is_erased_subtype(target, source),
        }
    }

    fn is_erased_subtype(&mut self, target: TypeId, source: TypeId) -> bool {
        let wanted = self.erasure_of(target);
        if self.erasure_of(source) == wanted {
            return true;
        }
        self.all_supertypes(source).into_iter().any(|s| self.erasure_of(s) == wanted)
    }

    fn is_parameterization_assignable(&mut self, target: TypeId, source: TypeId) -> bool {
        let wanted = self.erasure_of(target);
        let Some(found) = self.hierarchy(source).into_iter().find(|c| self.erasure_of(*c) == wanted) else {
            return false;
        };
        if !self.ty(found).is_parameterized() {
            // raw to parameterized is an unchecked conversion
            return true;
        }
        let target_args = self.ty(target).type_arguments().to_vec();
        let source_args = self.ty(found).type_arguments().to_vec();
        if target_args.len() != source_args.len() {
            return false;
        }
        if target_args.iter().all(|a| self.ty(*a).is_wildcard() && self.ty(*a).bound().is_none()) {
            return true;
        }
        for (ta, sa) in target_args.into_iter().zip(source_args) {
            if !self.type_argument_matches(ta, sa) {
                return false;
            }
        }
        true
    }

    /// One position of a parameterized assignment check
    fn type_argument_matches(&mut self, target_arg: TypeId, source_arg: TypeId) -> bool {
        let t = self.ty(target_arg);
        let s = self.ty(source_arg);
        if t.signature() == s.signature() {
            return true;
        }
        match (t.kind(), t.bound()) {
            (TypeKind::Wildcard, None) => true,
            (TypeKind::Wildcard, Some((WildcardBound::Extends, bound))) => {
                let source_bound = self.upper_bound(source_arg);
                self.is_assignable_from(bound, source_bound)
            }
            (TypeKind::Wildcard, Some((WildcardBound::Super, bound))) => {
                let lower = match (s.kind(), s.bound()) {
                    (TypeKind::Wildcard, Some((WildcardBound::Super, b))) => b,
                    (TypeKind::Wildcard, _) => return false,
                    _ => source_arg,
                };
                self.is_assignable_from(lower, bound)
            }
            (TypeKind::TypeVariableReference, _) => {
                let bound = self.upper_bound(target_arg);
                let source_bound = self.upper_bound(source_arg);
                self.is_assignable_from(bound, source_bound)
            }
            _ => false,
        }
    }

    /// Whether a cast from `source` to `target` could succeed at runtime
    pub fn is_coercible_from(&mut self, target: TypeId, source: TypeId) -> bool {
        if self.is_missing(target) || self.is_missing(source) {
            return false;
        }
        if self.is_assignable_from(target, source) || self.is_assignable_from(source, target) {
            return true;
        }
        let (t, s) = (self.ty(target), self.ty(source));
        if t.is_primitive() || s.is_primitive() {
            return false;
        }
        match (t.component_type(), s.component_type()) {
            (Some(tc), Some(sc)) => {
                if self.ty(tc).is_primitive() || self.ty(sc).is_primitive() {
                    return false;
                }
                return self.is_coercible_from(tc, sc);
            }
            (Some(_), None) | (None, Some(_)) => return false,
            (None, None) => {}
        }
        if self.is_erased_subtype(target, source) || self.is_erased_subtype(source, target) {
            return true;
        }
        // an unrelated interface can still be implemented by a subclass, unless the class is final
        match (self.is_interface(target), self.is_interface(source)) {
            (true, true) => true,
            (true, false) => !self.is_final(source),
            (false, true) => !self.is_final(target),
            (false, false) => false,
        }
    }

    /// Assignment plus primitive widening
    pub fn is_convertible_from(&mut self, target: TypeId, source: TypeId) -> bool {
        let (t, s) = (self.ty(target), self.ty(source));
        if t.is_primitive() && s.is_primitive() {
            return t.signature() == s.signature() || widens_to(s.signature(), t.signature());
        }
        self.is_assignable_from(target, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::delegate::{InMemoryTypeSource, TypeDescriptor};
    use std::sync::Arc;
    use weaver_common::{CollectingHandler, WorldConfig};

    fn universe() -> TypeUniverse {
        let source = InMemoryTypeSource::with_java_lang();
        source.add(TypeDescriptor::class("com.acme.Base"));
        source.add(TypeDescriptor::class("com.acme.Derived").extends("com.acme.Base"));
        source.add(TypeDescriptor::class("com.acme.Sealed").final_type());
        source.add(TypeDescriptor::interface("com.acme.Service"));
        TypeUniverse::new(WorldConfig::default(), Arc::new(source), Arc::new(CollectingHandler::new()))
    }

    fn check(world: &mut TypeUniverse, target: &str, source: &str) -> bool {
        let t = world.resolve_name(target);
        let s = world.resolve_name(source);
        world.is_assignable_from(t, s)
    }

    #[test]
    fn test_class_hierarchy() {
        let mut world = universe();
        assert!(check(&mut world, "com.acme.Base", "com.acme.Derived"));
        assert!(!check(&mut world, "com.acme.Derived", "com.acme.Base"));
        assert!(check(&mut world, "java.lang.Object", "com.acme.Derived"));
        assert!(check(&mut world, "java.lang.Comparable", "java.lang.String"));
        assert!(check(&mut world, "java.lang.Exception", "java.lang.IllegalStateException"));
        assert!(!check(&mut world, "java.lang.Object", "int"));
        assert!(!check(&mut world, "com.acme.Base", "com.acme.Missing"));
    }

    #[test]
    fn test_arrays() {
        let mut world = universe();
        assert!(check(&mut world, "com.acme.Base[]", "com.acme.Derived[]"));
        assert!(!check(&mut world, "long[]", "int[]"));
        assert!(check(&mut world, "java.lang.Object", "int[]"));
        assert!(check(&mut world, "java.io.Serializable", "java.lang.String[]"));
        assert!(!check(&mut world, "java.lang.Runnable", "java.lang.String[]"));
    }

    #[test]
    fn test_parameterized_types() {
        let mut world = universe();
        assert!(check(&mut world, "java.util.List<java.lang.String>", "java.util.ArrayList<java.lang.String>"));
        assert!(!check(&mut world, "java.util.List<java.lang.Object>", "java.util.ArrayList<java.lang.String>"));
        assert!(check(&mut world, "java.util.List<?>", "java.util.ArrayList<java.lang.String>"));
        assert!(check(&mut world, "java.util.List<? extends java.lang.Number>", "java.util.List<java.lang.Integer>"));
        assert!(!check(&mut world, "java.util.List<? extends java.lang.Number>", "java.util.List<java.lang.String>"));
        assert!(check(&mut world, "java.util.List<? super java.lang.Integer>", "java.util.List<java.lang.Number>"));
        assert!(check(&mut world, "java.lang.Comparable<java.lang.String>", "java.lang.String"));
        assert!(!check(&mut world, "java.lang.Comparable<java.lang.Integer>", "java.lang.String"));
    }

    #[test]
    fn test_raw_types_accept_any_parameterization() {
        let mut world = universe();
        assert!(check(&mut world, "java.util.List", "java.util.ArrayList<java.lang.String>"));
        assert!(check(&mut world, "java.util.Collection", "java.util.List"));
        // unchecked conversion
        assert!(check(&mut world, "java.util.List<java.lang.String>", "java.util.ArrayList"));
    }

    #[test]
    fn test_coercion() {
        let mut world = universe();
        let base = world.resolve_name("com.acme.Base");
        let derived = world.resolve_name("com.acme.Derived");
        let service = world.resolve_name("com.acme.Service");
        let sealed = world.resolve_name("com.acme.Sealed");
        let string = world.resolve_name("java.lang.String");
        assert!(world.is_coercible_from(derived, base));
        assert!(world.is_coercible_from(service, base));
        assert!(!world.is_coercible_from(service, sealed));
        assert!(!world.is_coercible_from(string, base));
    }

    #[test]
    fn test_primitive_conversion() {
        let mut world = universe();
        let int = world.resolve_name("int");
        let long = world.resolve_name("long");
        let boolean = world.resolve_name("boolean");
        assert!(world.is_convertible_from(long, int));
        assert!(!world.is_convertible_from(int, long));
        assert!(!world.is_convertible_from(boolean, int));
        assert!(!world.is_assignable_from(long, int));
    }
}
