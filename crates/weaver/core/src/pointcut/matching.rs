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

//! Static matching: per type and per shadow

use crate::lint::Lint;
use crate::patterns::MatchKind;
use crate::pointcut::{Pointcut, PointcutKind};
use crate::shadow::{FastMatchInfo, Shadow, ShadowKind, ShadowKindSet};
use crate::tristate::TriState;
use crate::types::{TypeId, TypeUniverse};
use crate::patterns::TypePattern;

impl Pointcut {
    /// Could any shadow inside the type described by `info` match?
    ///
    /// `No` is definite; `Yes` means every shadow of the type matches as far
    /// as the type alone can tell. Returns `Maybe` throughout when fast
    /// matching is disabled.
    pub fn fast_match(&self, world: &mut TypeUniverse, info: &FastMatchInfo) -> TriState {
        if !world.config().fast_match {
            return TriState::Maybe;
        }
        self.fast_match_node(world, info)
    }

    fn fast_match_node(&self, world: &mut TypeUniverse, info: &FastMatchInfo) -> TriState {
        match &self.kind {
            PointcutKind::Kinded { kind, .. } => match info.kind {
                Some(asked) if asked != *kind => TriState::No,
                _ => TriState::Maybe,
            },
            PointcutKind::Within(pattern) => TriState::from_bool(within_matches(world, pattern, info.ty)),
            PointcutKind::WithinAnnotation(pattern) => {
                let annotations = world.annotations(info.ty);
                pattern.matches(world, &annotations)
            }
            PointcutKind::And(l, r) => l.fast_match_node(world, info).and_then(|| r.fast_match_node(world, info)),
            PointcutKind::Or(l, r) => l.fast_match_node(world, info).or_else(|| r.fast_match_node(world, info)),
            PointcutKind::Not(p) => p.fast_match_node(world, info).negate(),
            PointcutKind::Nothing => TriState::No,
            _ => TriState::Maybe,
        }
    }

    /// Static match against one shadow; `Maybe` leaves a runtime test
    pub fn match_shadow(&self, world: &mut TypeUniverse, shadow: &Shadow) -> TriState {
        match &self.kind {
            PointcutKind::Kinded { kind, signature } => {
                if shadow.kind != *kind {
                    return TriState::No;
                }
                let result = signature.matches(world, &shadow.signature);
                if result.always_false() && *kind == ShadowKind::MethodCall {
                    check_unmatched_super_type(world, signature, shadow);
                }
                result
            }
            PointcutKind::Within(pattern) => TriState::from_bool(within_matches(world, pattern, shadow.enclosing_type)),
            PointcutKind::WithinCode(signature) => match shadow.enclosing_code_signature() {
                Some(code) => signature.matches(world, code),
                None => TriState::No,
            },
            PointcutKind::Handler(pattern) => {
                if shadow.kind != ShadowKind::ExceptionHandler {
                    return TriState::No;
                }
                match shadow.arg_types.first() {
                    Some(exception) => TriState::from_bool(pattern.matches_statically(world, *exception)),
                    None => TriState::No,
                }
            }
            PointcutKind::Args(list) => list.matches(world, &shadow.arg_types, MatchKind::Dynamic),
            PointcutKind::ArgsAnnotation(list) => list.matches(world, &shadow.arg_types),
            PointcutKind::ThisOrTarget { is_this, pattern } => match context_type(shadow, *is_this) {
                Some(ty) => pattern.matches(world, ty, MatchKind::Dynamic),
                None => TriState::No,
            },
            PointcutKind::ThisOrTargetAnnotation { is_this, pattern } => match context_type(shadow, *is_this) {
                Some(ty) => pattern.matches_runtime_type(world, ty),
                None => TriState::No,
            },
            PointcutKind::WithinAnnotation(pattern) => {
                let annotations = world.annotations(shadow.enclosing_type);
                pattern.matches(world, &annotations)
            }
            PointcutKind::WithinCodeAnnotation(pattern) => match shadow.enclosing_code_signature() {
                Some(code) => {
                    let annotations = code.annotations.clone();
                    pattern.matches(world, &annotations)
                }
                None => TriState::No,
            },
            PointcutKind::Annotation(pattern) => pattern.matches(world, &shadow.signature.annotations),
            PointcutKind::Cflow { .. } | PointcutKind::ConcreteCflow { .. } | PointcutKind::Reference { .. } => TriState::Maybe,
            PointcutKind::And(l, r) => l.match_shadow(world, shadow).and_then(|| r.match_shadow(world, shadow)),
            PointcutKind::Or(l, r) => l.match_shadow(world, shadow).or_else(|| r.match_shadow(world, shadow)),
            PointcutKind::Not(p) => p.match_shadow(world, shadow).negate(),
            PointcutKind::Nothing => TriState::No,
        }
    }

    /// Shadow kinds this pointcut can possibly match
    pub fn could_match_kinds(&self) -> ShadowKindSet {
        match &self.kind {
            PointcutKind::Kinded { kind, .. } => ShadowKindSet::single(*kind),
            PointcutKind::Handler(_) => ShadowKindSet::single(ShadowKind::ExceptionHandler),
            PointcutKind::And(l, r) => l.could_match_kinds().intersection(r.could_match_kinds()),
            PointcutKind::Or(l, r) => l.could_match_kinds().union(r.could_match_kinds()),
            PointcutKind::Nothing => ShadowKindSet::NONE,
            _ => ShadowKindSet::ALL,
        }
    }
}

pub(crate) fn context_type(shadow: &Shadow, is_this: bool) -> Option<TypeId> {
    if is_this { shadow.this_type } else { shadow.target_type }
}

/// The type or any type lexically enclosing it matches
fn within_matches(world: &mut TypeUniverse, pattern: &TypePattern, ty: TypeId) -> bool {
    let mut current = Some(ty);
    while let Some(t) = current {
        if pattern.matches_statically(world, t) {
            return true;
        }
        current = world.outer_type(t);
    }
    false
}

fn check_unmatched_super_type(world: &mut TypeUniverse, signature: &crate::patterns::SignaturePattern, shadow: &Shadow) {
    let Some(target) = shadow.target_type else { return };
    if signature.declaring_type.is_any() || !signature.matches_ignoring_declaring_type(world, &shadow.signature) {
        return;
    }
    if signature.declaring_type.matches_statically(world, target) {
        let text = format!(
            "does not match because declaring type is {}, if match desired use target({})",
            shadow.signature.declaring_type.name(),
            signature.declaring_type
        );
        world.report_lint(Lint::UnmatchedSuperTypeInCall, text, shadow.location.clone());
    }
}
