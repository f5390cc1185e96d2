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

//! Declare statements contributed by aspects

use crate::binding::{ResolveContext, Scope};
use crate::patterns::TypePattern;
use crate::pointcut::Pointcut;
use crate::types::{TypeId, TypeUniverse, UnresolvedType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use weaver_common::{Persistent, SourceLocation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Declare {
    /// `declare error: pc: "msg";` or `declare warning: ...`
    ErrorOrWarning {
        is_error: bool,
        pointcut: Pointcut,
        message: String,
        location: Option<SourceLocation>,
    },
    /// `declare parents: Child extends/implements P1, P2;`
    Parents {
        child: TypePattern,
        parents: Vec<TypePattern>,
        is_extends: bool,
        location: Option<SourceLocation>,
    },
    /// `declare soft: Exception: pc;`
    Soft {
        exception: TypePattern,
        pointcut: Pointcut,
        location: Option<SourceLocation>,
    },
    /// `declare precedence: A, B, *;` earlier patterns take precedence
    Precedence {
        patterns: Vec<TypePattern>,
        location: Option<SourceLocation>,
    },
}

impl Declare {
    pub fn error(pointcut: Pointcut, message: impl Into<String>) -> Self {
        Declare::ErrorOrWarning {
            is_error: true,
            pointcut,
            message: message.into(),
            location: None,
        }
    }

    pub fn warning(pointcut: Pointcut, message: impl Into<String>) -> Self {
        Declare::ErrorOrWarning {
            is_error: false,
            pointcut,
            message: message.into(),
            location: None,
        }
    }

    pub fn parents(child: TypePattern, parents: Vec<TypePattern>, is_extends: bool) -> Self {
        Declare::Parents {
            child,
            parents,
            is_extends,
            location: None,
        }
    }

    pub fn soft(exception: TypePattern, pointcut: Pointcut) -> Self {
        Declare::Soft { exception, pointcut, location: None }
    }

    pub fn precedence(patterns: Vec<TypePattern>) -> Self {
        Declare::Precedence { patterns, location: None }
    }

    pub fn at(mut self, at: Option<SourceLocation>) -> Self {
        match &mut self {
            Declare::ErrorOrWarning { location, .. } | Declare::Parents { location, .. } | Declare::Soft { location, .. } | Declare::Precedence { location, .. } => {
                *location = at;
            }
        }
        self
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Declare::ErrorOrWarning { location, .. } | Declare::Parents { location, .. } | Declare::Soft { location, .. } | Declare::Precedence { location, .. } => location.as_ref(),
        }
    }

    /// Resolve the type patterns of parents, soft and precedence declarations.
    ///
    /// Pointcuts are left alone; they are resolved when the checker or
    /// softener built from them is concretized.
    pub fn resolve(&self, world: &mut TypeUniverse, scope: &dyn Scope) -> Declare {
        let mut cx = ResolveContext::new(world, scope);
        match self.clone() {
            Declare::Parents { child, parents, is_extends, location } => Declare::Parents {
                child: child.resolve_bindings(&mut cx, None, true),
                parents: parents.into_iter().map(|p| p.resolve_bindings(&mut cx, None, true)).collect(),
                is_extends,
                location,
            },
            Declare::Soft { exception, pointcut, location } => Declare::Soft {
                exception: exception.resolve_bindings(&mut cx, None, false),
                pointcut,
                location,
            },
            Declare::Precedence { patterns, location } => {
                let patterns: Vec<TypePattern> = patterns.into_iter().map(|p| p.resolve_bindings(&mut cx, None, false)).collect();
                if patterns.iter().filter(|p| p.is_star()).count() > 1 {
                    cx.error("circularity in declare precedence, '*' occurs more than once");
                }
                Declare::Precedence { patterns, location }
            }
            other => other,
        }
    }

    /// Position of `aspect` in a precedence list.
    ///
    /// A named pattern wins over `*`, which stands for every aspect the
    /// other patterns do not name.
    pub fn precedence_index(&self, world: &mut TypeUniverse, aspect: TypeId) -> Option<usize> {
        let Declare::Precedence { patterns, .. } = self else { return None };
        let mut star = None;
        for (i, pattern) in patterns.iter().enumerate() {
            if pattern.is_star() {
                star = Some(i);
            } else if pattern.matches_statically(world, aspect) {
                return Some(i);
            }
        }
        star
    }

    /// `Greater` when this declaration gives `a` precedence over `b`;
    /// `Equal` when it says nothing about the pair
    pub fn compare(&self, world: &mut TypeUniverse, a: TypeId, b: TypeId) -> Ordering {
        match (self.precedence_index(world, a), self.precedence_index(world, b)) {
            (Some(ia), Some(ib)) => ib.cmp(&ia),
            _ => Ordering::Equal,
        }
    }

    /// New supertypes `declare parents` gives `ty`: the parents it does not already have
    pub fn new_parents_for(&self, world: &mut TypeUniverse, ty: TypeId) -> Vec<TypeId> {
        let Declare::Parents { child, parents, .. } = self else { return Vec::new() };
        if !child.matches_statically(world, ty) {
            return Vec::new();
        }
        let mut result = Vec::new();
        for parent in parents {
            let Some(parent_type) = parent.exact_type() else { continue };
            let id = world.resolve(parent_type);
            if !world.is_missing(id) && id != ty && !world.is_assignable_from(id, ty) {
                result.push(id);
            }
        }
        result
    }

    /// Exception type named by `declare soft`
    pub fn softened_exception(&self) -> Option<&UnresolvedType> {
        match self {
            Declare::Soft { exception, .. } => exception.exact_type(),
            _ => None,
        }
    }
}

impl fmt::Display for Declare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |patterns: &[TypePattern]| patterns.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        match self {
            Declare::ErrorOrWarning { is_error, pointcut, message, .. } => {
                write!(f, "declare {}: {}: \"{}\";", if *is_error { "error" } else { "warning" }, pointcut, message)
            }
            Declare::Parents { child, parents, is_extends, .. } => {
                write!(f, "declare parents: {} {} {};", child, if *is_extends { "extends" } else { "implements" }, join(parents))
            }
            Declare::Soft { exception, pointcut, .. } => write!(f, "declare soft: {}: {};", exception, pointcut),
            Declare::Precedence { patterns, .. } => write!(f, "declare precedence: {};", join(patterns)),
        }
    }
}

impl Persistent for Declare {
    const FAMILY: u8 = 5;

    fn kind_tag(&self) -> u8 {
        match self {
            Declare::ErrorOrWarning { .. } => 1,
            Declare::Parents { .. } => 2,
            Declare::Soft { .. } => 3,
            Declare::Precedence { .. } => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::SimpleScope;
    use crate::patterns::parse_type_pattern;
    use crate::types::{InMemoryTypeSource, TypeDescriptor};
    use std::sync::Arc;
    use weaver_common::{CollectingHandler, WorldConfig};

    fn universe() -> TypeUniverse {
        let source = InMemoryTypeSource::with_java_lang();
        for name in ["com.acme.Security", "com.acme.Logging", "com.acme.Metrics"] {
            source.add(TypeDescriptor::aspect(name));
        }
        source.add(TypeDescriptor::class("com.acme.Order"));
        source.add(TypeDescriptor::interface("com.acme.Auditable"));
        TypeUniverse::new(WorldConfig::default(), Arc::new(source), Arc::new(CollectingHandler::new()))
    }

    fn pattern(text: &str) -> TypePattern {
        parse_type_pattern(text).unwrap()
    }

    #[test]
    fn test_precedence_order_with_star() {
        let mut world = universe();
        let scope = SimpleScope::new().with_import("com.acme");
        let declare = Declare::precedence(vec![pattern("Security"), pattern("*"), pattern("Logging")]).resolve(&mut world, &scope);
        let security = world.resolve_name("com.acme.Security");
        let logging = world.resolve_name("com.acme.Logging");
        let metrics = world.resolve_name("com.acme.Metrics");

        assert_eq!(declare.precedence_index(&mut world, metrics), Some(1));
        assert_eq!(declare.compare(&mut world, security, logging), Ordering::Greater);
        assert_eq!(declare.compare(&mut world, logging, metrics), Ordering::Less);
        assert_eq!(declare.compare(&mut world, security, security), Ordering::Equal);
    }

    #[test]
    fn test_precedence_without_star_ignores_unnamed() {
        let mut world = universe();
        let scope = SimpleScope::new().with_import("com.acme");
        let declare = Declare::precedence(vec![pattern("Security"), pattern("Logging")]).resolve(&mut world, &scope);
        let security = world.resolve_name("com.acme.Security");
        let metrics = world.resolve_name("com.acme.Metrics");
        assert_eq!(declare.compare(&mut world, security, metrics), Ordering::Equal);
    }

    #[test]
    fn test_declare_parents_skips_existing_supertypes() {
        let mut world = universe();
        let scope = SimpleScope::new().with_import("com.acme");
        let declare = Declare::parents(pattern("Order"), vec![pattern("Auditable"), pattern("Object")], false).resolve(&mut world, &scope);
        let order = world.resolve_name("com.acme.Order");
        let parents = declare.new_parents_for(&mut world, order);
        assert_eq!(parents.len(), 1);
        assert_eq!(world.name(parents[0]), "com.acme.Auditable");
        assert!(declare.to_string().starts_with("declare parents: com.acme.Order implements"));
    }
}
