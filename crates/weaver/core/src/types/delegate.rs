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

//! Introspection of compiled units
//!
//! The engine never reads class files itself. A [`TypeSource`] hands out a
//! [`ReferenceTypeDelegate`] per type name, and the universe builds its
//! resolved view from what the delegate reports. [`TypeDescriptor`] is a
//! plain in-memory delegate for hosts that already hold the information and
//! for tests.

use crate::declare::Declare;
use crate::munger::{PerClause, ResolvedTypeMunger, ShadowMunger};
use crate::pointcut::PointcutDefinition;
use crate::types::annotation::AnnotationAj;
use crate::types::member::{ResolvedMember, TypeVariable, modifiers};
use crate::types::unresolved::UnresolvedType;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Structural description of one reference type.
///
/// Implementations must be idempotent and free of side effects other than
/// internal caching.
#[cfg_attr(test, mockall::automock)]
pub trait ReferenceTypeDelegate: Send + Sync {
    /// Dotted name, e.g. `com.acme.Foo`
    fn name(&self) -> String;
    fn is_interface(&self) -> bool;
    fn is_aspect(&self) -> bool;
    fn is_enum(&self) -> bool;
    fn is_annotation(&self) -> bool;
    fn modifiers(&self) -> u32;
    fn declared_fields(&self) -> Vec<ResolvedMember>;
    fn declared_methods(&self) -> Vec<ResolvedMember>;
    fn declared_interfaces(&self) -> Vec<UnresolvedType>;
    fn declared_pointcuts(&self) -> Vec<PointcutDefinition>;
    fn superclass(&self) -> Option<UnresolvedType>;
    fn annotations(&self) -> Vec<AnnotationAj>;
    fn declared_generic_signature(&self) -> Option<String>;
    fn type_variables(&self) -> Vec<TypeVariable>;
    fn has_been_woven(&self) -> bool;
    fn is_exposed_to_weaver(&self) -> bool;
    /// Lexically enclosing type of a nested type
    fn outer_type(&self) -> Option<UnresolvedType>;
    fn per_clause(&self) -> Option<PerClause>;
    /// Advice and declare error/warning checkers, in declaration order
    fn declared_shadow_mungers(&self) -> Vec<ShadowMunger>;
    fn declares(&self) -> Vec<Declare>;
    fn type_mungers(&self) -> Vec<ResolvedTypeMunger>;
    fn privileged_accesses(&self) -> Vec<ResolvedMember>;

    fn is_class(&self) -> bool {
        !self.is_interface()
    }
}

/// Finds delegates by dotted type name
pub trait TypeSource: Send + Sync {
    fn find(&self, name: &str) -> Option<Arc<dyn ReferenceTypeDelegate>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaredKind {
    Class,
    Interface,
    Aspect,
    Enum,
    Annotation,
}

/// In-memory delegate built with a fluent API
#[derive(Clone)]
pub struct TypeDescriptor {
    name: String,
    kind: DeclaredKind,
    modifiers: u32,
    superclass: Option<UnresolvedType>,
    interfaces: Vec<UnresolvedType>,
    fields: Vec<ResolvedMember>,
    methods: Vec<ResolvedMember>,
    pointcuts: Vec<PointcutDefinition>,
    annotations: Vec<AnnotationAj>,
    type_variables: Vec<TypeVariable>,
    outer: Option<UnresolvedType>,
    woven: bool,
    exposed: bool,
    per_clause: Option<PerClause>,
    shadow_mungers: Vec<ShadowMunger>,
    declares: Vec<Declare>,
    type_mungers: Vec<ResolvedTypeMunger>,
    privileged: Vec<ResolvedMember>,
}

impl TypeDescriptor {
    fn with_kind(name: &str, kind: DeclaredKind) -> Self {
        let superclass = match kind {
            DeclaredKind::Class | DeclaredKind::Aspect if name != "java.lang.Object" => Some(UnresolvedType::object()),
            DeclaredKind::Enum => Some(UnresolvedType::for_name("java.lang.Enum")),
            _ => None,
        };
        let interfaces = if kind == DeclaredKind::Annotation { vec![UnresolvedType::for_name("java.lang.annotation.Annotation")] } else { Vec::new() };
        let modifiers = match kind {
            DeclaredKind::Interface | DeclaredKind::Annotation => modifiers::PUBLIC | modifiers::INTERFACE | modifiers::ABSTRACT,
            _ => modifiers::PUBLIC,
        };
        Self {
            name: name.to_string(),
            kind,
            modifiers,
            superclass,
            interfaces,
            fields: Vec::new(),
            methods: Vec::new(),
            pointcuts: Vec::new(),
            annotations: Vec::new(),
            type_variables: Vec::new(),
            outer: None,
            woven: false,
            exposed: false,
            per_clause: None,
            shadow_mungers: Vec::new(),
            declares: Vec::new(),
            type_mungers: Vec::new(),
            privileged: Vec::new(),
        }
    }

    pub fn class(name: &str) -> Self {
        Self::with_kind(name, DeclaredKind::Class)
    }

    pub fn interface(name: &str) -> Self {
        Self::with_kind(name, DeclaredKind::Interface)
    }

    pub fn aspect(name: &str) -> Self {
        Self::with_kind(name, DeclaredKind::Aspect).exposed()
    }

    pub fn enumeration(name: &str) -> Self {
        Self::with_kind(name, DeclaredKind::Enum)
    }

    pub fn annotation_type(name: &str) -> Self {
        Self::with_kind(name, DeclaredKind::Annotation)
    }

    pub fn unresolved_type(&self) -> UnresolvedType {
        UnresolvedType::for_name(&self.name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.type_variables.iter().map(|v| v.name.clone()).collect()
    }

    /// Declare type variables; must precede `extends`/`implements` that mention them
    pub fn with_type_variables(mut self, names: &[&str]) -> Self {
        self.type_variables = names.iter().map(|n| TypeVariable::new(*n)).collect();
        self
    }

    pub fn with_bounded_type_variable(mut self, variable: TypeVariable) -> Self {
        self.type_variables.push(variable);
        self
    }

    pub fn extends(mut self, name: &str) -> Self {
        let vars = self.variable_names();
        self.superclass = Some(UnresolvedType::for_name(name).bind_type_variables(&vars));
        self
    }

    pub fn implements(mut self, name: &str) -> Self {
        let vars = self.variable_names();
        self.interfaces.push(UnresolvedType::for_name(name).bind_type_variables(&vars));
        self
    }

    pub fn with_modifiers(mut self, flags: u32) -> Self {
        self.modifiers |= flags;
        self
    }

    pub fn abstract_type(self) -> Self {
        self.with_modifiers(modifiers::ABSTRACT)
    }

    pub fn final_type(self) -> Self {
        self.with_modifiers(modifiers::FINAL)
    }

    pub fn with_method(mut self, method: ResolvedMember) -> Self {
        self.methods.push(method);
        self
    }

    /// Convenience: public method declared on this type, with source-level type names
    pub fn method(self, return_type: &str, name: &str, params: &[&str]) -> Self {
        let vars = self.variable_names();
        let owner = self.unresolved_type();
        let params = params.iter().map(|p| UnresolvedType::for_name(p).bind_type_variables(&vars)).collect();
        let ret = UnresolvedType::for_name(return_type).bind_type_variables(&vars);
        self.with_method(ResolvedMember::method(owner, modifiers::PUBLIC, ret, name, params))
    }

    pub fn with_field(mut self, field: ResolvedMember) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(self, field_type: &str, name: &str) -> Self {
        let owner = self.unresolved_type();
        self.with_field(ResolvedMember::field(owner, modifiers::PRIVATE, UnresolvedType::for_name(field_type), name))
    }

    pub fn with_annotation(mut self, annotation: AnnotationAj) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_pointcut(mut self, definition: PointcutDefinition) -> Self {
        self.pointcuts.push(definition);
        self
    }

    pub fn nested_in(mut self, outer: &str) -> Self {
        self.outer = Some(UnresolvedType::for_name(outer));
        self
    }

    pub fn woven(mut self) -> Self {
        self.woven = true;
        self
    }

    pub fn exposed(mut self) -> Self {
        self.exposed = true;
        self
    }

    pub fn with_per_clause(mut self, per_clause: PerClause) -> Self {
        self.per_clause = Some(per_clause);
        self
    }

    pub fn with_shadow_munger(mut self, munger: ShadowMunger) -> Self {
        self.shadow_mungers.push(munger);
        self
    }

    pub fn with_declare(mut self, declare: Declare) -> Self {
        self.declares.push(declare);
        self
    }

    pub fn with_type_munger(mut self, munger: ResolvedTypeMunger) -> Self {
        self.type_mungers.push(munger);
        self
    }

    pub fn with_privileged_access(mut self, member: ResolvedMember) -> Self {
        self.privileged.push(member);
        self
    }
}

impl ReferenceTypeDelegate for TypeDescriptor {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_interface(&self) -> bool {
        matches!(self.kind, DeclaredKind::Interface | DeclaredKind::Annotation)
    }

    fn is_aspect(&self) -> bool {
        self.kind == DeclaredKind::Aspect
    }

    fn is_enum(&self) -> bool {
        self.kind == DeclaredKind::Enum
    }

    fn is_annotation(&self) -> bool {
        self.kind == DeclaredKind::Annotation
    }

    fn modifiers(&self) -> u32 {
        self.modifiers
    }

    fn declared_fields(&self) -> Vec<ResolvedMember> {
        self.fields.clone()
    }

    fn declared_methods(&self) -> Vec<ResolvedMember> {
        self.methods.clone()
    }

    fn declared_interfaces(&self) -> Vec<UnresolvedType> {
        self.interfaces.clone()
    }

    fn declared_pointcuts(&self) -> Vec<PointcutDefinition> {
        self.pointcuts.clone()
    }

    fn superclass(&self) -> Option<UnresolvedType> {
        self.superclass.clone()
    }

    fn annotations(&self) -> Vec<AnnotationAj> {
        self.annotations.clone()
    }

    fn declared_generic_signature(&self) -> Option<String> {
        if self.type_variables.is_empty() {
            return None;
        }
        let mut sig = String::from("<");
        for v in &self.type_variables {
            sig.push_str(&format!("{}:{}", v.name, v.upper_bound.signature()));
        }
        sig.push('>');
        sig.push_str(self.superclass.as_ref().map(|s| s.signature()).unwrap_or("Ljava/lang/Object;"));
        for i in &self.interfaces {
            sig.push_str(i.signature());
        }
        Some(sig)
    }

    fn type_variables(&self) -> Vec<TypeVariable> {
        self.type_variables.clone()
    }

    fn has_been_woven(&self) -> bool {
        self.woven
    }

    fn is_exposed_to_weaver(&self) -> bool {
        self.exposed
    }

    fn outer_type(&self) -> Option<UnresolvedType> {
        self.outer.clone()
    }

    fn per_clause(&self) -> Option<PerClause> {
        self.per_clause.clone()
    }

    fn declared_shadow_mungers(&self) -> Vec<ShadowMunger> {
        self.shadow_mungers.clone()
    }

    fn declares(&self) -> Vec<Declare> {
        self.declares.clone()
    }

    fn type_mungers(&self) -> Vec<ResolvedTypeMunger> {
        self.type_mungers.clone()
    }

    fn privileged_accesses(&self) -> Vec<ResolvedMember> {
        self.privileged.clone()
    }
}

/// A [`TypeSource`] backed by a map of descriptors
#[derive(Default)]
pub struct InMemoryTypeSource {
    types: RwLock<HashMap<String, Arc<dyn ReferenceTypeDelegate>>>,
}

impl InMemoryTypeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source preloaded with the platform types every program depends on
    pub fn with_java_lang() -> Self {
        let source = Self::new();
        for descriptor in bootstrap_types() {
            source.add(descriptor);
        }
        source
    }

    pub fn add(&self, descriptor: TypeDescriptor) {
        self.add_delegate(Arc::new(descriptor));
    }

    pub fn add_delegate(&self, delegate: Arc<dyn ReferenceTypeDelegate>) {
        self.types.write().insert(delegate.name(), delegate);
    }

    pub fn remove(&self, name: &str) -> bool {
        self.types.write().remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl TypeSource for InMemoryTypeSource {
    fn find(&self, name: &str) -> Option<Arc<dyn ReferenceTypeDelegate>> {
        self.types.read().get(name).cloned()
    }
}

fn bootstrap_types() -> Vec<TypeDescriptor> {
    vec![
        TypeDescriptor::class("java.lang.Object").method("java.lang.String", "toString", &[]).method("int", "hashCode", &[]),
        TypeDescriptor::interface("java.io.Serializable"),
        TypeDescriptor::interface("java.lang.Cloneable"),
        TypeDescriptor::interface("java.lang.CharSequence").method("int", "length", &[]),
        TypeDescriptor::interface("java.lang.Comparable").with_type_variables(&["T"]).method("int", "compareTo", &["T"]),
        TypeDescriptor::interface("java.lang.Runnable").method("void", "run", &[]),
        TypeDescriptor::interface("java.lang.annotation.Annotation"),
        TypeDescriptor::annotation_type("java.lang.annotation.Inherited"),
        TypeDescriptor::class("java.lang.String")
            .final_type()
            .implements("java.io.Serializable")
            .implements("java.lang.Comparable<java.lang.String>")
            .implements("java.lang.CharSequence")
            .method("int", "length", &[]),
        TypeDescriptor::class("java.lang.Number").abstract_type().implements("java.io.Serializable"),
        TypeDescriptor::class("java.lang.Integer").final_type().extends("java.lang.Number").implements("java.lang.Comparable<java.lang.Integer>"),
        TypeDescriptor::class("java.lang.Long").final_type().extends("java.lang.Number").implements("java.lang.Comparable<java.lang.Long>"),
        TypeDescriptor::class("java.lang.Boolean").final_type().implements("java.io.Serializable"),
        TypeDescriptor::class("java.lang.Enum").abstract_type().with_type_variables(&["E"]).implements("java.io.Serializable"),
        TypeDescriptor::class("java.lang.Throwable").implements("java.io.Serializable").method("java.lang.String", "getMessage", &[]),
        TypeDescriptor::class("java.lang.Exception").extends("java.lang.Throwable"),
        TypeDescriptor::class("java.lang.RuntimeException").extends("java.lang.Exception"),
        TypeDescriptor::class("java.lang.IllegalStateException").extends("java.lang.RuntimeException"),
        TypeDescriptor::class("java.io.IOException").extends("java.lang.Exception"),
        TypeDescriptor::interface("java.lang.Iterable").with_type_variables(&["T"]),
        TypeDescriptor::interface("java.util.Collection").with_type_variables(&["E"]).implements("java.lang.Iterable<E>").method("boolean", "add", &["E"]).method("int", "size", &[]),
        TypeDescriptor::interface("java.util.List").with_type_variables(&["E"]).implements("java.util.Collection<E>").method("E", "get", &["int"]),
        TypeDescriptor::class("java.util.ArrayList")
            .with_type_variables(&["E"])
            .implements("java.util.List<E>")
            .implements("java.lang.Cloneable")
            .implements("java.io.Serializable")
            .method("E", "get", &["int"]),
        TypeDescriptor::interface("java.util.Map").with_type_variables(&["K", "V"]).method("V", "get", &["java.lang.Object"]).method("V", "put", &["K", "V"]),
        TypeDescriptor::class("java.util.HashMap").with_type_variables(&["K", "V"]).implements("java.util.Map<K, V>").implements("java.io.Serializable"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_binds_type_variables_in_supertypes() {
        let list = TypeDescriptor::class("com.acme.Box").with_type_variables(&["T"]).implements("java.lang.Comparable<T>").method("T", "get", &[]);
        let iface = &list.declared_interfaces()[0];
        assert_eq!(iface.signature(), "Pjava/lang/Comparable<TT;>;");
        assert!(list.declared_methods()[0].return_type.is_type_variable());
        assert!(list.declared_generic_signature().is_some());
    }

    #[test]
    fn test_bootstrap_source_knows_platform_types() {
        let source = InMemoryTypeSource::with_java_lang();
        let string = source.find("java.lang.String").expect("String should be known");
        assert!(string.modifiers() & modifiers::FINAL != 0);
        assert_eq!(string.superclass(), Some(UnresolvedType::object()));
        assert!(source.find("java.lang.Object").expect("Object").superclass().is_none());
        assert!(source.find("com.acme.Missing").is_none());
    }

    #[test]
    fn test_kinds() {
        assert!(TypeDescriptor::aspect("A").is_aspect());
        assert!(TypeDescriptor::aspect("A").is_exposed_to_weaver());
        assert!(TypeDescriptor::annotation_type("Tx").is_annotation());
        assert!(TypeDescriptor::annotation_type("Tx").is_interface());
        assert!(TypeDescriptor::interface("I").superclass().is_none());
        assert!(TypeDescriptor::class("C").is_class());
    }
}
