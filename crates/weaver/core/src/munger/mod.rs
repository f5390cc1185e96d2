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

//! Shadow mungers and type mungers
//!
//! A [`ShadowMunger`] pairs a pointcut with what happens at its join points:
//! advice runs there, a checker reports there. A [`ResolvedTypeMunger`]
//! changes a type's structure.

pub mod advice;
pub mod checker;
pub mod per_clause;
pub mod support;
pub mod type_munger;

pub use advice::{Advice, AdviceKind};
pub use checker::Checker;
pub use per_clause::PerClause;
#[cfg(test)]
pub use support::MockWeavingSupport;
pub use support::{DefaultWeavingSupport, WeavingSupport};
pub use type_munger::{ConcreteTypeMunger, ResolvedTypeMunger, TypeMungerKind};

use crate::binding::{Concretizer, EnclosingKind, SimpleScope};
use crate::pointcut::{Pointcut, PointcutState};
use crate::residue::{ExposedState, Test};
use crate::shadow::{FastMatchInfo, Shadow};
use crate::tristate::TriState;
use crate::types::{TypeId, TypeUniverse, UnresolvedType};
use serde::{Deserialize, Serialize};
use weaver_common::{Persistent, SourceLocation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowMunger {
    Advice(Advice),
    Checker(Checker),
}

impl ShadowMunger {
    pub fn pointcut(&self) -> &Pointcut {
        match self {
            ShadowMunger::Advice(a) => &a.pointcut,
            ShadowMunger::Checker(c) => &c.pointcut,
        }
    }

    fn with_pointcut(&self, pointcut: Pointcut) -> ShadowMunger {
        match self {
            ShadowMunger::Advice(a) => ShadowMunger::Advice(Advice { pointcut, ..a.clone() }),
            ShadowMunger::Checker(c) => ShadowMunger::Checker(Checker { pointcut, ..c.clone() }),
        }
    }

    pub fn declaring_type(&self) -> &UnresolvedType {
        match self {
            ShadowMunger::Advice(a) => &a.declaring_type,
            ShadowMunger::Checker(c) => &c.declaring_type,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            ShadowMunger::Advice(a) => a.location.as_ref(),
            ShadowMunger::Checker(c) => c.location.as_ref(),
        }
    }

    /// Number of values bound at a match
    pub fn arity(&self) -> usize {
        match self {
            ShadowMunger::Advice(a) => a.arity,
            ShadowMunger::Checker(_) => 0,
        }
    }

    pub fn advice_kind(&self) -> Option<AdviceKind> {
        match self {
            ShadowMunger::Advice(a) => Some(a.kind),
            ShadowMunger::Checker(_) => None,
        }
    }

    fn enclosing_kind(&self) -> EnclosingKind {
        match self {
            ShadowMunger::Advice(a) if a.kind != AdviceKind::Softener => EnclosingKind::Advice(a.kind),
            _ => EnclosingKind::Declare,
        }
    }

    /// Resolve a symbolic pointcut in the scope of the declaring type and formals
    pub fn resolve(&self, world: &mut TypeUniverse) -> ShadowMunger {
        if self.pointcut().state != PointcutState::Symbolic {
            return self.clone();
        }
        let formals = match self {
            ShadowMunger::Advice(a) => a.formals.clone(),
            ShadowMunger::Checker(_) => Vec::new(),
        };
        let scope = SimpleScope::for_type(self.declaring_type().clone()).with_formals(formals).at(self.location().cloned());
        let resolved = self.pointcut().resolve(world, &scope);
        self.with_pointcut(resolved)
    }

    /// Concretize for the concrete aspect `aspect`, resolving first if needed
    pub fn concretize(&self, cx: &mut Concretizer<'_>, aspect: TypeId) -> ShadowMunger {
        let resolved = self.resolve(cx.world);
        let declaring = cx.world.resolve(resolved.declaring_type());
        let concrete = resolved.pointcut().concretize(cx, aspect, declaring, resolved.arity(), resolved.enclosing_kind());
        let mut munger = resolved.with_pointcut(concrete);
        if let ShadowMunger::Advice(a) = &mut munger {
            a.concrete_aspect = Some(cx.world.to_unresolved(aspect));
        }
        munger
    }

    pub fn fast_match(&self, world: &mut TypeUniverse, info: &FastMatchInfo) -> TriState {
        self.pointcut().fast_match(world, info)
    }

    /// Whether the munger applies at `shadow`; checkers report and never apply
    pub fn match_shadow(&self, world: &mut TypeUniverse, shadow: &Shadow) -> bool {
        match self {
            ShadowMunger::Advice(a) => !a.pointcut.match_shadow(world, shadow).always_false(),
            ShadowMunger::Checker(c) => c.check(world, shadow),
        }
    }

    /// Runtime test and exposed values for a matched shadow
    pub fn find_residue(&self, world: &mut TypeUniverse, shadow: &Shadow) -> (Test, ExposedState) {
        let mut state = ExposedState::new(self.arity());
        let test = match self {
            ShadowMunger::Advice(a) => a.pointcut.find_residue(world, shadow, &mut state),
            ShadowMunger::Checker(_) => Test::FALSE,
        };
        (test, state)
    }
}

impl Persistent for ShadowMunger {
    const FAMILY: u8 = 6;

    fn kind_tag(&self) -> u8 {
        match self {
            ShadowMunger::Advice(_) => 1,
            ShadowMunger::Checker(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crosscutting::CrosscuttingMembers;
    use crate::patterns::parse_pointcut;
    use crate::pointcut::PointcutKind;
    use crate::shadow::ShadowKind;
    use crate::types::{InMemoryTypeSource, ResolvedMember, TypeDescriptor, modifiers};
    use std::sync::Arc;
    use weaver_common::{CollectingHandler, WorldConfig};

    fn universe(handler: Arc<CollectingHandler>) -> TypeUniverse {
        let source = InMemoryTypeSource::with_java_lang();
        source.add(TypeDescriptor::class("com.acme.Service").method("void", "save", &["java.lang.String"]));
        source.add(TypeDescriptor::aspect("com.acme.Audit"));
        TypeUniverse::new(WorldConfig::default(), Arc::new(source), handler)
    }

    fn save_execution(world: &mut TypeUniverse) -> Shadow {
        let service = world.resolve_name("com.acme.Service");
        let save = ResolvedMember::method(UnresolvedType::for_name("com.acme.Service"), modifiers::PUBLIC, UnresolvedType::void(), "save", vec![UnresolvedType::string()]);
        Shadow::new(world, 7, ShadowKind::MethodExecution, save, service, None).at(Some(SourceLocation::new("Service.java", 12, 5)))
    }

    #[test]
    fn test_advice_concretize_and_residue() {
        let handler = Arc::new(CollectingHandler::new());
        let mut world = universe(handler.clone());
        let aspect = world.resolve_name("com.acme.Audit");
        let advice = Advice::new(AdviceKind::Before, UnresolvedType::for_name("com.acme.Audit"), parse_pointcut("execution(* save(..)) && args(s)").unwrap()).with_formal("s", "java.lang.String");
        let munger = ShadowMunger::Advice(advice);

        let mut members = CrosscuttingMembers::new(world.to_unresolved(aspect));
        let support = DefaultWeavingSupport;
        let concrete = {
            let mut cx = Concretizer::new(&mut world, &support, &mut members);
            munger.concretize(&mut cx, aspect)
        };
        assert!(concrete.pointcut().is_concrete());
        assert!(!handler.has_errors());

        let shadow = save_execution(&mut world);
        assert!(concrete.match_shadow(&mut world, &shadow));
        let (test, state) = concrete.find_residue(&mut world, &shadow);
        assert!(test.is_true());
        assert_eq!(state.get(0), Some(&crate::residue::Var::Arg(0)));
    }

    #[test]
    fn test_checker_reports_with_both_locations() {
        let handler = Arc::new(CollectingHandler::new());
        let mut world = universe(handler.clone());
        let pointcut = parse_pointcut("execution(* com.acme.Service.save(..))").unwrap();
        let checker = Checker::new(false, "do not save here", pointcut, UnresolvedType::for_name("com.acme.Audit")).at(Some(SourceLocation::new("Audit.aj", 3, 1)));
        let munger = ShadowMunger::Checker(checker).resolve(&mut world);
        assert!(matches!(munger.pointcut().kind, PointcutKind::Kinded { .. }));

        let shadow = save_execution(&mut world);
        assert!(!munger.match_shadow(&mut world, &shadow));
        let warnings = handler.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].to_string().contains("do not save here"));
        assert_eq!(munger.find_residue(&mut world, &shadow).0, Test::FALSE);
    }

    #[test]
    fn test_mocked_support_receives_cflow_entry() {
        let handler = Arc::new(CollectingHandler::new());
        let mut world = universe(handler.clone());
        let aspect = world.resolve_name("com.acme.Audit");
        let mut support = MockWeavingSupport::new();
        support
            .expect_make_cflow_counter_field_adder()
            .times(1)
            .returning(|f| ResolvedTypeMunger::new(TypeMungerKind::CflowCounterField, Some(f.as_ref().clone())));
        support
            .expect_create_advice_munger()
            .withf(|kind, _, field, arity, _, _| *kind == AdviceKind::CflowEntry && field.is_some() && *arity == 0)
            .times(1)
            .returning(|kind, pointcut, field, arity, aspect, location| DefaultWeavingSupport.create_advice_munger(kind, pointcut, field, arity, aspect, location));

        let advice = Advice::new(AdviceKind::After, UnresolvedType::for_name("com.acme.Audit"), parse_pointcut("call(* *(..)) && cflow(execution(* save(..)))").unwrap());
        let mut members = CrosscuttingMembers::new(world.to_unresolved(aspect));
        let concrete = {
            let mut cx = Concretizer::new(&mut world, &support, &mut members);
            ShadowMunger::Advice(advice).concretize(&mut cx, aspect)
        };
        assert!(concrete.pointcut().is_concrete());
        assert_eq!(members.shadow_mungers().len(), 1);
        assert_eq!(members.type_mungers().len(), 1);
    }
}
