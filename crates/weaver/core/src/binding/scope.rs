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

//! Name lookup for pointcut resolution

use crate::types::{TypeId, TypeUniverse, UnresolvedType};
use serde::{Deserialize, Serialize};
use weaver_common::{Message, SourceLocation};

/// A named, typed parameter of an advice or pointcut definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Formal {
    pub name: String,
    pub ty: UnresolvedType,
}

impl Formal {
    pub fn new(name: impl Into<String>, ty: UnresolvedType) -> Self {
        Self { name: name.into(), ty }
    }

    pub fn named(name: &str, type_name: &str) -> Self {
        Self::new(name, UnresolvedType::for_name(type_name))
    }
}

/// What a pointcut can see while its names are being resolved
pub trait Scope {
    fn formals(&self) -> &[Formal];
    fn enclosing_type(&self) -> Option<&UnresolvedType>;
    /// Package prefixes tried for unqualified names, each ending in `.`
    fn import_prefixes(&self) -> &[String];
    fn location(&self) -> Option<&SourceLocation>;

    fn formal_count(&self) -> usize {
        self.formals().len()
    }

    fn lookup_formal(&self, name: &str) -> Option<(usize, &Formal)> {
        self.formals().iter().enumerate().find(|(_, f)| f.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimpleScope {
    formals: Vec<Formal>,
    enclosing_type: Option<UnresolvedType>,
    import_prefixes: Vec<String>,
    location: Option<SourceLocation>,
}

impl SimpleScope {
    /// Scope seeing only `java.lang`
    pub fn new() -> Self {
        Self {
            import_prefixes: vec!["java.lang.".to_string()],
            ..Default::default()
        }
    }

    /// Scope of a declaration inside `enclosing`, which also sees its package
    pub fn for_type(enclosing: UnresolvedType) -> Self {
        let mut scope = Self::new();
        if let Some(package) = enclosing.package_name() {
            scope.import_prefixes.push(format!("{}.", package));
        }
        scope.enclosing_type = Some(enclosing);
        scope
    }

    pub fn with_formals(mut self, formals: Vec<Formal>) -> Self {
        self.formals = formals;
        self
    }

    pub fn with_formal(mut self, name: &str, type_name: &str) -> Self {
        self.formals.push(Formal::named(name, type_name));
        self
    }

    pub fn with_import(mut self, prefix: &str) -> Self {
        let prefix = if prefix.ends_with('.') { prefix.to_string() } else { format!("{}.", prefix) };
        self.import_prefixes.push(prefix);
        self
    }

    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }
}

impl Scope for SimpleScope {
    fn formals(&self) -> &[Formal] {
        &self.formals
    }

    fn enclosing_type(&self) -> Option<&UnresolvedType> {
        self.enclosing_type.as_ref()
    }

    fn import_prefixes(&self) -> &[String] {
        &self.import_prefixes
    }

    fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }
}

/// Resolve a source-level type name the way a declaration in `scope` sees it.
///
/// Nested types of the enclosing type win, then the name as written for
/// qualified names, then each import prefix, then the default package.
/// A name found nowhere is left for the caller to report.
pub fn lookup_type(world: &mut TypeUniverse, scope: &dyn Scope, name: &str) -> TypeId {
    let written = UnresolvedType::for_name(name);
    if written.is_primitive() {
        return world.resolve(&written);
    }
    if let Some(enclosing) = scope.enclosing_type() {
        let nested = world.resolve_quietly(&UnresolvedType::for_name(&format!("{}${}", enclosing.base_name(), name)));
        if !world.is_missing(nested) {
            return nested;
        }
    }
    if name.contains('.') {
        let id = world.resolve_quietly(&written);
        if !world.is_missing(id) {
            return id;
        }
    }
    for prefix in scope.import_prefixes() {
        let id = world.resolve_quietly(&UnresolvedType::for_name(&format!("{}{}", prefix, name)));
        if !world.is_missing(id) {
            return id;
        }
    }
    world.resolve_quietly(&written)
}

/// Resolution state threaded through one `resolve` pass.
///
/// Errors go to the universe's message handler; a pass that reported any
/// error yields a pointcut that matches nothing.
pub struct ResolveContext<'a> {
    pub world: &'a mut TypeUniverse,
    pub scope: &'a dyn Scope,
    errors: usize,
}

impl<'a> ResolveContext<'a> {
    pub fn new(world: &'a mut TypeUniverse, scope: &'a dyn Scope) -> Self {
        Self { world, scope, errors: 0 }
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.errors += 1;
        self.world.report(Message::error(text).at(self.scope.location().cloned()));
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn lookup_type(&mut self, name: &str) -> TypeId {
        lookup_type(self.world, self.scope, name)
    }

    pub fn location(&self) -> Option<SourceLocation> {
        self.scope.location().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InMemoryTypeSource, TypeDescriptor};
    use std::sync::Arc;
    use weaver_common::{CollectingHandler, WorldConfig};

    fn universe() -> TypeUniverse {
        let source = InMemoryTypeSource::with_java_lang();
        source.add(TypeDescriptor::class("com.acme.Foo"));
        source.add(TypeDescriptor::class("com.acme.Tracing$Helper"));
        source.add(TypeDescriptor::aspect("com.acme.Tracing"));
        TypeUniverse::new(WorldConfig::default(), Arc::new(source), Arc::new(CollectingHandler::new()))
    }

    #[test]
    fn test_lookup_order() {
        let mut world = universe();
        let scope = SimpleScope::for_type(UnresolvedType::for_name("com.acme.Tracing"));
        let foo = lookup_type(&mut world, &scope, "Foo");
        assert_eq!(world.name(foo), "com.acme.Foo");
        let string = lookup_type(&mut world, &scope, "String");
        assert_eq!(world.name(string), "java.lang.String");
        let helper = lookup_type(&mut world, &scope, "Helper");
        assert_eq!(world.name(helper), "com.acme.Tracing$Helper");
        let int = lookup_type(&mut world, &scope, "int");
        assert!(world.ty(int).is_primitive());
        let missing = lookup_type(&mut world, &scope, "Nope");
        assert!(world.is_missing(missing));
    }

    #[test]
    fn test_import_lookups_are_not_reported_missing() {
        let handler = Arc::new(CollectingHandler::new());
        let mut world = TypeUniverse::new(WorldConfig::default(), Arc::new(InMemoryTypeSource::with_java_lang()), handler.clone());
        let scope = SimpleScope::for_type(UnresolvedType::for_name("com.acme.Tracing")).with_import("com.acme.");
        let string = lookup_type(&mut world, &scope, "String");
        assert_eq!(world.name(string), "java.lang.String");
        let missing = lookup_type(&mut world, &scope, "Nope");
        assert!(world.is_missing(missing));
        assert!(handler.messages().is_empty(), "{:?}", handler.messages());
    }

    #[test]
    fn test_formal_lookup() {
        let scope = SimpleScope::new().with_formal("s", "java.lang.String").with_formal("n", "int");
        let (index, formal) = scope.lookup_formal("n").unwrap();
        assert_eq!(index, 1);
        assert!(formal.ty.is_primitive());
        assert!(scope.lookup_formal("x").is_none());
        assert_eq!(scope.formal_count(), 2);
    }
}
