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

//! Residue computation: the runtime test left after static matching

use crate::patterns::{AnnotationTypePattern, MatchKind, TypePattern};
use crate::pointcut::matching::context_type;
use crate::pointcut::{Pointcut, PointcutKind};
use crate::residue::{ExposedState, Test, Var};
use crate::shadow::Shadow;
use crate::tristate::TriState;
use crate::types::{TypeId, TypeUniverse, UnresolvedType};

impl Pointcut {
    /// Test the backend must run at `shadow`, binding exposed formals into `state`.
    ///
    /// Only meaningful on a concrete pointcut whose static match was not `No`.
    /// A branch that statically fails contributes `false` and binds nothing.
    ///
    /// # Panics
    ///
    /// Panics on an unconcretized `cflow` or named reference, and when a
    /// binding names a formal outside `state`.
    pub fn find_residue(&self, world: &mut TypeUniverse, shadow: &Shadow, state: &mut ExposedState) -> Test {
        match &self.kind {
            PointcutKind::And(l, r) => {
                if l.match_shadow(world, shadow).always_false() || r.match_shadow(world, shadow).always_false() {
                    return Test::FALSE;
                }
                let left = l.find_residue(world, shadow, state);
                let right = r.find_residue(world, shadow, state);
                Test::and(left, right)
            }
            PointcutKind::Or(l, r) => {
                let left_match = l.match_shadow(world, shadow);
                let right_match = r.match_shadow(world, shadow);
                if left_match.always_true() || right_match.always_false() {
                    return l.find_residue(world, shadow, state);
                }
                if right_match.always_true() || left_match.always_false() {
                    return r.find_residue(world, shadow, state);
                }
                let left = l.find_residue(world, shadow, state);
                let right = r.find_residue(world, shadow, state);
                Test::or(left, right)
            }
            PointcutKind::Not(p) => {
                if p.match_shadow(world, shadow).always_false() {
                    return Test::TRUE;
                }
                // bindings are not visible through a negation
                let mut scratch = ExposedState::new(state.len());
                Test::not(p.find_residue(world, shadow, &mut scratch))
            }
            PointcutKind::Cflow { .. } | PointcutKind::Reference { .. } => {
                panic!("pointcut must be concretized before computing a residue: {}", self)
            }
            PointcutKind::Nothing => Test::FALSE,
            PointcutKind::ConcreteCflow { field, slots, uses_counter } => {
                for slot in slots {
                    state.set(slot.formal, Var::CflowStackSlot { field: field.clone(), index: slot.stack_index });
                }
                if *uses_counter {
                    Test::CflowCounterIsValid { field: field.clone() }
                } else {
                    Test::CflowStackIsValid { field: field.clone() }
                }
            }
            _ => {
                let matched = self.match_shadow(world, shadow);
                if matched.always_false() {
                    return Test::FALSE;
                }
                self.leaf_residue(world, shadow, state, matched)
            }
        }
    }

    fn leaf_residue(&self, world: &mut TypeUniverse, shadow: &Shadow, state: &mut ExposedState, matched: TriState) -> Test {
        match &self.kind {
            PointcutKind::Args(list) => {
                let Some(positions) = list.positions(shadow.arg_types.len()) else {
                    return Test::FALSE;
                };
                let mut test = Test::TRUE;
                for (pattern_index, arg_index) in positions {
                    let pattern = &list.patterns()[pattern_index];
                    let residue = type_residue(world, pattern, Var::Arg(arg_index), shadow.arg_types[arg_index], state);
                    test = Test::and(test, residue);
                }
                test
            }
            PointcutKind::ThisOrTarget { is_this, pattern } => match context_type(shadow, *is_this) {
                Some(ty) => type_residue(world, pattern, context_var(*is_this), ty, state),
                None => Test::FALSE,
            },
            PointcutKind::ArgsAnnotation(list) => {
                let Some(positions) = list.positions(shadow.arg_types.len()) else {
                    return Test::FALSE;
                };
                let mut test = Test::TRUE;
                for (pattern_index, arg_index) in positions {
                    let pattern = &list.patterns()[pattern_index];
                    let ty = shadow.arg_types[arg_index];
                    let residue = runtime_annotation_residue(world, pattern, Var::Arg(arg_index), ty, state, |a| Var::ArgAnnotation(arg_index, a));
                    test = Test::and(test, residue);
                }
                test
            }
            PointcutKind::ThisOrTargetAnnotation { is_this, pattern } => match context_type(shadow, *is_this) {
                Some(ty) => {
                    let is_this = *is_this;
                    runtime_annotation_residue(world, pattern, context_var(is_this), ty, state, |a| {
                        if is_this { Var::ThisAnnotation(a) } else { Var::TargetAnnotation(a) }
                    })
                }
                None => Test::FALSE,
            },
            PointcutKind::Annotation(pattern) => static_annotation_residue(pattern, state, matched, Var::KindedAnnotation),
            PointcutKind::WithinAnnotation(pattern) => static_annotation_residue(pattern, state, matched, Var::WithinAnnotation),
            PointcutKind::WithinCodeAnnotation(pattern) => static_annotation_residue(pattern, state, matched, Var::WithinCodeAnnotation),
            _ => Test::from_static(matched),
        }
    }
}

impl Test {
    /// `true` for a definite static match; nothing else can be tested at runtime
    fn from_static(matched: TriState) -> Test {
        Test::Literal(matched.always_true())
    }
}

fn context_var(is_this: bool) -> Var {
    if is_this { Var::This } else { Var::Target }
}

fn type_residue(world: &mut TypeUniverse, pattern: &TypePattern, var: Var, ty: TypeId, state: &mut ExposedState) -> Test {
    match pattern {
        TypePattern::Binding { formal_index, ty: bound } => {
            state.set(*formal_index, var.clone());
            instanceof_unless_assignable(world, bound, var, ty)
        }
        TypePattern::Exact(e) => {
            if pattern.matches(world, ty, MatchKind::Dynamic).always_true() {
                Test::TRUE
            } else {
                Test::Instanceof { var, ty: e.ty.clone() }
            }
        }
        TypePattern::And(l, r) => {
            let left = type_residue(world, l, var.clone(), ty, state);
            Test::and(left, type_residue(world, r, var, ty, state))
        }
        TypePattern::Or(l, r) => {
            let left = type_residue(world, l, var.clone(), ty, state);
            Test::or(left, type_residue(world, r, var, ty, state))
        }
        TypePattern::Not(p) => {
            let mut scratch = ExposedState::new(state.len());
            Test::not(type_residue(world, p, var, ty, &mut scratch))
        }
        TypePattern::NoType => Test::FALSE,
        other => Test::from_static(other.matches(world, ty, MatchKind::Dynamic)),
    }
}

fn instanceof_unless_assignable(world: &mut TypeUniverse, bound: &UnresolvedType, var: Var, ty: TypeId) -> Test {
    let target = world.resolve(bound);
    let ty = world.upper_bound(ty);
    if world.is_assignable_from(target, ty) {
        Test::TRUE
    } else {
        Test::Instanceof { var, ty: bound.clone() }
    }
}

/// Annotations only known at runtime: the value's class may carry more than its static type
fn runtime_annotation_residue(
    world: &mut TypeUniverse,
    pattern: &AnnotationTypePattern,
    object: Var,
    ty: TypeId,
    state: &mut ExposedState,
    bind: impl Fn(UnresolvedType) -> Var + Copy,
) -> Test {
    match pattern {
        AnnotationTypePattern::Binding { formal_index, ty: annotation } => {
            state.set(*formal_index, bind(annotation.clone()));
            has_annotation_unless_known(world, pattern, object, ty, annotation)
        }
        AnnotationTypePattern::Exact { ty: annotation, .. } => has_annotation_unless_known(world, pattern, object, ty, annotation),
        AnnotationTypePattern::And(l, r) => {
            let left = runtime_annotation_residue(world, l, object.clone(), ty, state, bind);
            Test::and(left, runtime_annotation_residue(world, r, object, ty, state, bind))
        }
        AnnotationTypePattern::Or(l, r) => {
            let left = runtime_annotation_residue(world, l, object.clone(), ty, state, bind);
            Test::or(left, runtime_annotation_residue(world, r, object, ty, state, bind))
        }
        AnnotationTypePattern::Not(p) => {
            let mut scratch = ExposedState::new(state.len());
            Test::not(runtime_annotation_residue(world, p, object, ty, &mut scratch, bind))
        }
        other => Test::from_static(other.matches_runtime_type(world, ty)),
    }
}

fn has_annotation_unless_known(world: &mut TypeUniverse, pattern: &AnnotationTypePattern, object: Var, ty: TypeId, annotation: &UnresolvedType) -> Test {
    match pattern.matches_runtime_type(world, ty) {
        TriState::Yes => Test::TRUE,
        TriState::No => Test::FALSE,
        TriState::Maybe => Test::HasAnnotation { var: object, annotation: annotation.clone() },
    }
}

/// Annotations fixed at weave time: the static match already decided, only bindings remain
fn static_annotation_residue(pattern: &AnnotationTypePattern, state: &mut ExposedState, matched: TriState, bind: fn(UnresolvedType) -> Var) -> Test {
    bind_static(pattern, state, bind);
    Test::from_static(matched)
}

fn bind_static(pattern: &AnnotationTypePattern, state: &mut ExposedState, bind: fn(UnresolvedType) -> Var) {
    match pattern {
        AnnotationTypePattern::Binding { formal_index, ty } => state.set(*formal_index, bind(ty.clone())),
        AnnotationTypePattern::And(l, r) => {
            bind_static(l, state, bind);
            bind_static(r, state, bind);
        }
        _ => {}
    }
}
