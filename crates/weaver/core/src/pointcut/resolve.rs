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

use crate::binding::{Bindings, ResolveContext, Scope};
use crate::patterns::TypePattern;
use crate::pointcut::{Pointcut, PointcutKind, PointcutState};
use crate::types::TypeUniverse;
use tracing::{debug, instrument};

impl Pointcut {
    /// Resolve every name against `scope`.
    ///
    /// Every formal of the scope must be bound exactly once. Problems are
    /// reported to the universe's message handler and turn the result into
    /// a pointcut that matches nothing.
    #[instrument(level = "trace", skip_all, fields(pointcut = %self))]
    pub fn resolve(&self, world: &mut TypeUniverse, scope: &dyn Scope) -> Pointcut {
        let mut cx = ResolveContext::new(world, scope);
        let mut bindings = Bindings::new(scope.formal_count());
        let resolved = self.clone().resolve_node(&mut cx, Some(&mut bindings));
        for index in bindings.unbound_indices() {
            cx.error(format!("formal unbound in pointcut: {}", scope.formals()[index].name));
        }
        if cx.has_errors() {
            debug!(pointcut = %self, "resolution failed");
            return Pointcut::in_state(PointcutKind::Nothing, PointcutState::Resolved, self.location.clone());
        }
        resolved
    }

    fn resolve_node(self, cx: &mut ResolveContext<'_>, mut bindings: Option<&mut Bindings>) -> Pointcut {
        let kind = match self.kind {
            PointcutKind::Kinded { kind, signature } => PointcutKind::Kinded {
                kind,
                signature: signature.resolve_bindings(cx),
            },
            PointcutKind::Within(pattern) => PointcutKind::Within(pattern.resolve_bindings(cx, None, true)),
            PointcutKind::WithinCode(signature) => PointcutKind::WithinCode(signature.resolve_bindings(cx)),
            PointcutKind::Handler(pattern) => PointcutKind::Handler(pattern.resolve_bindings(cx, None, false)),
            PointcutKind::Args(list) => {
                let list = list.resolve_bindings(cx, bindings, true);
                for pattern in list.patterns() {
                    reject_wildcard(cx, "args", pattern);
                }
                PointcutKind::Args(list)
            }
            PointcutKind::ThisOrTarget { is_this, pattern } => {
                let pattern = pattern.resolve_bindings(cx, bindings, false);
                reject_wildcard(cx, if is_this { "this" } else { "target" }, &pattern);
                PointcutKind::ThisOrTarget { is_this, pattern }
            }
            PointcutKind::ArgsAnnotation(list) => PointcutKind::ArgsAnnotation(list.resolve_bindings(cx, bindings)),
            PointcutKind::ThisOrTargetAnnotation { is_this, pattern } => PointcutKind::ThisOrTargetAnnotation {
                is_this,
                pattern: pattern.resolve_bindings(cx, bindings),
            },
            PointcutKind::WithinAnnotation(pattern) => PointcutKind::WithinAnnotation(pattern.resolve_bindings(cx, bindings)),
            PointcutKind::WithinCodeAnnotation(pattern) => PointcutKind::WithinCodeAnnotation(pattern.resolve_bindings(cx, bindings)),
            PointcutKind::Annotation(pattern) => PointcutKind::Annotation(pattern.resolve_bindings(cx, bindings)),
            PointcutKind::Cflow { entry, below, .. } => resolve_cflow(cx, bindings, *entry, below),
            PointcutKind::Reference { on_type, name, arguments } => {
                let arguments = arguments.resolve_bindings(cx, bindings, true);
                let on_type = on_type.map(|t| {
                    let id = cx.lookup_type(&t.name());
                    cx.world.to_unresolved(id)
                });
                let reference = PointcutKind::Reference { on_type, name, arguments };
                check_reference(cx, &reference);
                reference
            }
            PointcutKind::And(l, r) => {
                let left = l.resolve_node(cx, bindings.as_deref_mut());
                let right = r.resolve_node(cx, bindings);
                PointcutKind::And(Box::new(left), Box::new(right))
            }
            PointcutKind::Or(l, r) => match bindings {
                Some(outer) => {
                    let mut left_bindings = outer.clone();
                    let mut right_bindings = outer.clone();
                    let left = l.resolve_node(cx, Some(&mut left_bindings));
                    let right = r.resolve_node(cx, Some(&mut right_bindings));
                    if !left_bindings.check_equal(&right_bindings) {
                        cx.error(format!("inconsistent binding in ({} || {})", left, right));
                    }
                    *outer = left_bindings;
                    PointcutKind::Or(Box::new(left), Box::new(right))
                }
                None => PointcutKind::Or(Box::new(l.resolve_node(cx, None)), Box::new(r.resolve_node(cx, None))),
            },
            PointcutKind::Not(p) => PointcutKind::Not(Box::new(p.resolve_node(cx, None))),
            other => other,
        };
        Pointcut::in_state(kind, PointcutState::Resolved, self.location)
    }
}

/// Formals bound inside the entry pointcut are exposed through the cflow
fn resolve_cflow(cx: &mut ResolveContext<'_>, bindings: Option<&mut Bindings>, entry: Pointcut, below: bool) -> PointcutKind {
    let Some(outer) = bindings else {
        let entry = entry.resolve_node(cx, None);
        return PointcutKind::Cflow { entry: Box::new(entry), below, free_vars: Vec::new() };
    };
    let mut inner = Bindings::new(outer.len());
    let entry = entry.resolve_node(cx, Some(&mut inner));
    for duplicate in outer.merge_in(&inner) {
        let name = cx.scope.formals().get(duplicate).map(|f| f.name.clone()).unwrap_or_default();
        cx.error(format!("formal '{}' is bound more than once", name));
    }
    PointcutKind::Cflow {
        entry: Box::new(entry),
        below,
        free_vars: inner.bound_indices(),
    }
}

/// `this`, `target` and `args` test runtime types, which a wildcard cannot name
fn reject_wildcard(cx: &mut ResolveContext<'_>, designator: &str, pattern: &TypePattern) {
    match pattern {
        TypePattern::Wild(_) if !pattern.is_star() => {
            cx.error(format!("wildcard type pattern not allowed, must use type name: {}({})", designator, pattern));
        }
        TypePattern::And(l, r) | TypePattern::Or(l, r) => {
            reject_wildcard(cx, designator, l);
            reject_wildcard(cx, designator, r);
        }
        TypePattern::Not(p) => reject_wildcard(cx, designator, p),
        _ => {}
    }
}

/// The referenced definition exists and takes arguments of compatible types
fn check_reference(cx: &mut ResolveContext<'_>, reference: &PointcutKind) {
    let PointcutKind::Reference { on_type, name, arguments } = reference else { return };
    let owner = match on_type {
        Some(t) => cx.world.resolve(t),
        None => match cx.scope.enclosing_type().cloned() {
            Some(enclosing) => cx.world.resolve(&enclosing),
            None => {
                cx.error(format!("no enclosing type to find pointcut {} in", name));
                return;
            }
        },
    };
    if cx.world.is_missing(owner) {
        let written = on_type.as_ref().map(|t| t.name()).unwrap_or_default();
        cx.error(format!("can't find type {}", written));
        return;
    }
    let Some(definition) = cx.world.find_pointcut(owner, name) else {
        cx.error(format!("can't find referenced pointcut {}", name));
        return;
    };
    if arguments.ellipsis_count() > 0 || arguments.len() != definition.parameter_types.len() {
        cx.error(format!("incorrect number of arguments for pointcut {}, expected {} found {}", name, definition.parameter_types.len(), arguments.len()));
        return;
    }
    for (argument, parameter) in arguments.patterns().iter().zip(&definition.parameter_types) {
        let Some(argument_type) = argument.exact_type() else { continue };
        let expected = cx.world.resolve(parameter);
        let found = cx.world.resolve(argument_type);
        if !cx.world.is_coercible_from(expected, found) {
            cx.error(format!("incompatible type, expected {} found {}", parameter.name(), argument_type.name()));
        }
    }
}
