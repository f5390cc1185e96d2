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

//! The backend hooks called during concretization

use crate::munger::{Advice, AdviceKind, PerClause, ResolvedTypeMunger, ShadowMunger, TypeMungerKind};
use crate::pointcut::Pointcut;
use crate::types::{ResolvedMember, UnresolvedType};
use std::sync::Arc;
use weaver_common::SourceLocation;

/// Factory for the mungers the engine needs but the instrumentation backend
/// owns. Results are stored and handed back to the backend unchanged.
#[cfg_attr(test, mockall::automock)]
pub trait WeavingSupport {
    /// Synthetic advice, such as the entry advice of a cflow
    fn create_advice_munger(
        &self,
        kind: AdviceKind,
        pointcut: Pointcut,
        cflow_field: Option<Arc<ResolvedMember>>,
        arity: usize,
        aspect: UnresolvedType,
        location: Option<SourceLocation>,
    ) -> ShadowMunger;

    fn make_cflow_counter_field_adder(&self, field: &Arc<ResolvedMember>) -> ResolvedTypeMunger;

    fn make_cflow_stack_field_adder(&self, field: &Arc<ResolvedMember>) -> ResolvedTypeMunger;

    fn make_per_clause_aspect(&self, aspect: &UnresolvedType, per_clause: &PerClause) -> ResolvedTypeMunger;

    /// Accessors letting inlined around advice reach non-public members
    fn create_access_for_inline_munger(&self, aspect: &UnresolvedType) -> ResolvedTypeMunger;
}

/// Produces plain data mungers
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWeavingSupport;

impl WeavingSupport for DefaultWeavingSupport {
    fn create_advice_munger(
        &self,
        kind: AdviceKind,
        pointcut: Pointcut,
        cflow_field: Option<Arc<ResolvedMember>>,
        arity: usize,
        aspect: UnresolvedType,
        location: Option<SourceLocation>,
    ) -> ShadowMunger {
        let mut advice = Advice::new(kind, aspect.clone(), pointcut).with_arity(arity).with_cflow_field(cflow_field).at(location);
        advice.concrete_aspect = Some(aspect);
        ShadowMunger::Advice(advice)
    }

    fn make_cflow_counter_field_adder(&self, field: &Arc<ResolvedMember>) -> ResolvedTypeMunger {
        ResolvedTypeMunger::new(TypeMungerKind::CflowCounterField, Some(field.as_ref().clone()))
    }

    fn make_cflow_stack_field_adder(&self, field: &Arc<ResolvedMember>) -> ResolvedTypeMunger {
        ResolvedTypeMunger::new(TypeMungerKind::CflowStackField, Some(field.as_ref().clone()))
    }

    fn make_per_clause_aspect(&self, aspect: &UnresolvedType, per_clause: &PerClause) -> ResolvedTypeMunger {
        ResolvedTypeMunger::per_clause_aspect(aspect.clone(), per_clause.clone())
    }

    fn create_access_for_inline_munger(&self, aspect: &UnresolvedType) -> ResolvedTypeMunger {
        ResolvedTypeMunger::new(TypeMungerKind::AccessForInline, Some(ResolvedMember::static_initializer(aspect.clone())))
    }
}
