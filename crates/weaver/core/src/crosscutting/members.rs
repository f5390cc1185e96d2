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

//! What one aspect contributes to a weaving session

use crate::binding::{Concretizer, EnclosingKind, SimpleScope};
use crate::declare::Declare;
use crate::munger::{Advice, AdviceKind, Checker, ConcreteTypeMunger, PerClause, ResolvedTypeMunger, ShadowMunger, TypeMungerKind, WeavingSupport};
use crate::pointcut::{Pointcut, PointcutState};
use crate::types::{MemberKind, ResolvedMember, TypeId, TypeUniverse, UnresolvedType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Identity of a cflow state field: the same entry in the same aspect with
/// the same storage shares one field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CflowKey {
    entry: String,
    aspect: String,
    uses_counter: bool,
}

impl CflowKey {
    pub fn new(entry: String, aspect: impl Into<String>, uses_counter: bool) -> Self {
        Self {
            entry,
            aspect: aspect.into(),
            uses_counter,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrosscuttingMembers {
    aspect: UnresolvedType,
    shadow_mungers: Vec<ShadowMunger>,
    type_mungers: Vec<ConcreteTypeMunger>,
    declare_parents: Vec<Declare>,
    declare_soft: Vec<Declare>,
    declare_precedence: Vec<Declare>,
    /// Fields this collection has emitted adders and entry advice for
    cflow_fields: HashMap<CflowKey, Arc<ResolvedMember>>,
    /// Fields of earlier collections; reused for identity only
    inherited_cflow_fields: HashMap<CflowKey, Arc<ResolvedMember>>,
    cflow_field_count: usize,
}

impl CrosscuttingMembers {
    pub fn new(aspect: UnresolvedType) -> Self {
        Self {
            aspect,
            shadow_mungers: Vec::new(),
            type_mungers: Vec::new(),
            declare_parents: Vec::new(),
            declare_soft: Vec::new(),
            declare_precedence: Vec::new(),
            cflow_fields: HashMap::new(),
            inherited_cflow_fields: HashMap::new(),
            cflow_field_count: 0,
        }
    }

    pub fn aspect(&self) -> &UnresolvedType {
        &self.aspect
    }

    /// Remember the cflow fields of an earlier collection so field identity
    /// survives re-collection. Adders and entry advice are still emitted anew.
    pub fn inherit_cflow_fields(&mut self, previous: &CrosscuttingMembers) {
        let earlier = previous.inherited_cflow_fields.iter().chain(previous.cflow_fields.iter());
        self.inherited_cflow_fields.extend(earlier.map(|(k, v)| (k.clone(), v.clone())));
        self.cflow_field_count = self.cflow_field_count.max(previous.cflow_field_count);
    }

    /// Collect the contributions of `aspect`, including those inherited from super-aspects.
    ///
    /// An abstract aspect contributes only its declare parents and precedence
    /// statements; its advice runs through its concrete sub-aspects.
    #[instrument(level = "debug", skip(world, support, previous), fields(aspect = %world.name(aspect)))]
    pub fn collect(world: &mut TypeUniverse, support: &dyn WeavingSupport, aspect: TypeId, previous: Option<&CrosscuttingMembers>) -> Self {
        let aspect_type = world.to_unresolved(aspect);
        let mut members = CrosscuttingMembers::new(aspect_type.clone());
        if let Some(previous) = previous {
            members.inherit_cflow_fields(previous);
        }

        let chain = aspect_chain(world, aspect);
        let is_abstract = world.is_abstract(aspect);
        for declaring in &chain {
            let Some(delegate) = world.delegate_of(*declaring) else { continue };
            let scope = SimpleScope::for_type(world.to_unresolved(*declaring));
            for declare in delegate.declares() {
                members.add_declare(world, support, aspect, *declaring, &scope, declare, is_abstract);
            }
            if is_abstract {
                continue;
            }
            for munger in delegate.declared_shadow_mungers() {
                let concrete = {
                    let mut cx = Concretizer::new(world, support, &mut members);
                    munger.concretize(&mut cx, aspect)
                };
                if concrete.advice_kind() == Some(AdviceKind::Around) && !members.has_kind(TypeMungerKind::AccessForInline) {
                    let accessor = support.create_access_for_inline_munger(&aspect_type);
                    members.add_type_munger(ConcreteTypeMunger::new(accessor, Some(aspect_type.clone())));
                }
                members.add_shadow_munger(concrete);
            }
            for munger in delegate.type_mungers() {
                members.add_type_munger(ConcreteTypeMunger::new(munger, Some(aspect_type.clone())));
            }
            for member in delegate.privileged_accesses() {
                let short_syntax = member.kind == MemberKind::Field;
                members.add_type_munger(ConcreteTypeMunger::new(ResolvedTypeMunger::privileged_access(member, short_syntax), Some(aspect_type.clone())));
            }
        }

        if !is_abstract {
            let per_clause = effective_per_clause(world, &chain);
            members.add_per_clause(world, support, aspect, &per_clause);
        }

        debug!(
            shadow_mungers = members.shadow_mungers.len(),
            type_mungers = members.type_mungers.len(),
            declares = members.declare_parents.len() + members.declare_soft.len() + members.declare_precedence.len(),
            "collected crosscutting members"
        );
        members
    }

    #[allow(clippy::too_many_arguments)]
    fn add_declare(&mut self, world: &mut TypeUniverse, support: &dyn WeavingSupport, aspect: TypeId, declaring: TypeId, scope: &SimpleScope, declare: Declare, is_abstract: bool) {
        let declaring_type = world.to_unresolved(declaring);
        match declare {
            Declare::Parents { .. } => self.declare_parents.push(declare.resolve(world, scope)),
            Declare::Precedence { .. } => self.declare_precedence.push(declare.resolve(world, scope)),
            _ if is_abstract => trace!(%declare, "declare in abstract aspect waits for a concrete sub-aspect"),
            Declare::ErrorOrWarning { is_error, pointcut, message, location } => {
                let checker = Checker::new(is_error, message, pointcut, declaring_type).at(location);
                let concrete = {
                    let mut cx = Concretizer::new(world, support, self);
                    ShadowMunger::Checker(checker).concretize(&mut cx, aspect)
                };
                self.add_shadow_munger(concrete);
            }
            Declare::Soft { .. } => {
                let resolved = declare.resolve(world, scope);
                if let Declare::Soft { exception, pointcut, location } = &resolved {
                    let softener = Advice::new(AdviceKind::Softener, declaring_type, pointcut.clone())
                        .softening(exception.exact_type().cloned().unwrap_or_else(|| UnresolvedType::for_name("java.lang.Exception")))
                        .at(location.clone());
                    let concrete = {
                        let mut cx = Concretizer::new(world, support, self);
                        ShadowMunger::Advice(softener).concretize(&mut cx, aspect)
                    };
                    self.add_shadow_munger(concrete);
                }
                self.declare_soft.push(resolved);
            }
        }
    }

    fn add_per_clause(&mut self, world: &mut TypeUniverse, support: &dyn WeavingSupport, aspect: TypeId, per_clause: &PerClause) {
        let aspect_type = world.to_unresolved(aspect);
        let entry_kind = match per_clause {
            PerClause::PerObject { .. } => Some(AdviceKind::PerObjectEntry),
            PerClause::PerCflow { below: false, .. } => Some(AdviceKind::PerCflowEntry),
            PerClause::PerCflow { below: true, .. } => Some(AdviceKind::PerCflowBelowEntry),
            _ => None,
        };
        if let (Some(kind), Some(entry)) = (entry_kind, per_clause.entry()) {
            let entry = resolve_in(world, entry, &aspect_type);
            let concrete = {
                let mut cx = Concretizer::new(world, support, self);
                entry.concretize(&mut cx, aspect, aspect, 0, EnclosingKind::Advice(kind))
            };
            let munger = support.create_advice_munger(kind, concrete, None, 0, aspect_type.clone(), entry.location.clone());
            self.add_shadow_munger(munger);
        }
        let munger = support.make_per_clause_aspect(&aspect_type, per_clause);
        self.add_type_munger(ConcreteTypeMunger::new(munger, Some(aspect_type)));
    }

    pub fn cflow_field(&self, key: &CflowKey) -> Option<Arc<ResolvedMember>> {
        self.cflow_fields.get(key).cloned()
    }

    /// Field an earlier collection created for `key`
    pub fn inherited_cflow_field(&self, key: &CflowKey) -> Option<Arc<ResolvedMember>> {
        self.inherited_cflow_fields.get(key).cloned()
    }

    pub fn register_cflow_field(&mut self, key: CflowKey, field: Arc<ResolvedMember>) {
        self.cflow_fields.insert(key, field);
    }

    /// Unique field name; numbering continues across collections
    pub fn next_cflow_field_name(&mut self, prefix: &str) -> String {
        let name = format!("{}${}", prefix, self.cflow_field_count);
        self.cflow_field_count += 1;
        name
    }

    pub fn add_type_munger(&mut self, munger: ConcreteTypeMunger) {
        self.type_mungers.push(munger);
    }

    pub fn add_shadow_munger(&mut self, munger: ShadowMunger) {
        self.shadow_mungers.push(munger);
    }

    fn has_kind(&self, kind: TypeMungerKind) -> bool {
        self.type_mungers.iter().any(|m| m.kind() == kind)
    }

    pub fn shadow_mungers(&self) -> &[ShadowMunger] {
        &self.shadow_mungers
    }

    pub fn type_mungers(&self) -> &[ConcreteTypeMunger] {
        &self.type_mungers
    }

    pub fn declare_parents(&self) -> &[Declare] {
        &self.declare_parents
    }

    pub fn declare_soft(&self) -> &[Declare] {
        &self.declare_soft
    }

    pub fn declare_precedence(&self) -> &[Declare] {
        &self.declare_precedence
    }

    /// Take over `other`'s contributions; true if anything structural changed
    pub fn replace_with(&mut self, other: CrosscuttingMembers) -> bool {
        let changed = self.shadow_mungers != other.shadow_mungers
            || self.type_mungers != other.type_mungers
            || self.declare_parents != other.declare_parents
            || self.declare_soft != other.declare_soft
            || self.declare_precedence != other.declare_precedence;
        *self = other;
        changed
    }
}

/// The aspect followed by its super-aspects, nearest first
fn aspect_chain(world: &mut TypeUniverse, aspect: TypeId) -> Vec<TypeId> {
    let mut chain = vec![aspect];
    let mut current = world.superclass(aspect);
    while let Some(s) = current {
        if world.is_missing(s) || chain.contains(&s) {
            break;
        }
        if world.is_aspect(s) {
            chain.push(s);
        }
        current = world.superclass(s);
    }
    chain
}

/// First per-clause up the chain that is not inherited; singleton by default
fn effective_per_clause(world: &TypeUniverse, chain: &[TypeId]) -> PerClause {
    chain
        .iter()
        .filter_map(|t| world.delegate_of(*t).and_then(|d| d.per_clause()))
        .find(|p| *p != PerClause::FromSuper)
        .unwrap_or_default()
}

fn resolve_in(world: &mut TypeUniverse, pointcut: &Pointcut, aspect: &UnresolvedType) -> Pointcut {
    if pointcut.state != PointcutState::Symbolic {
        return pointcut.clone();
    }
    pointcut.resolve(world, &SimpleScope::for_type(aspect.clone()).at(pointcut.location.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::munger::DefaultWeavingSupport;
    use crate::patterns::{parse_pointcut, parse_type_pattern};
    use crate::types::{InMemoryTypeSource, TypeDescriptor};
    use weaver_common::{CollectingHandler, WorldConfig};

    fn advice(kind: AdviceKind, aspect: &str, pointcut: &str) -> ShadowMunger {
        ShadowMunger::Advice(Advice::new(kind, UnresolvedType::for_name(aspect), parse_pointcut(pointcut).unwrap()))
    }

    fn universe(source: InMemoryTypeSource) -> (TypeUniverse, Arc<CollectingHandler>) {
        let handler = Arc::new(CollectingHandler::new());
        (TypeUniverse::new(WorldConfig::default(), Arc::new(source), handler.clone()), handler)
    }

    #[test]
    fn test_collect_concrete_aspect() {
        let source = InMemoryTypeSource::with_java_lang();
        source.add(
            TypeDescriptor::aspect("com.acme.Timing")
                .with_shadow_munger(advice(AdviceKind::Around, "com.acme.Timing", "execution(* *(..))"))
                .with_shadow_munger(advice(AdviceKind::Before, "com.acme.Timing", "call(* *(..))"))
                .with_declare(Declare::warning(parse_pointcut("call(* java.lang.Object.*(..))").unwrap(), "avoid"))
                .with_declare(Declare::precedence(vec![parse_type_pattern("Timing").unwrap(), parse_type_pattern("*").unwrap()])),
        );
        let (mut world, handler) = universe(source);
        let aspect = world.resolve_name("com.acme.Timing");
        let members = CrosscuttingMembers::collect(&mut world, &DefaultWeavingSupport, aspect, None);

        assert!(!handler.has_errors(), "{:?}", handler.messages());
        assert_eq!(members.shadow_mungers().len(), 3);
        assert!(members.shadow_mungers().iter().all(|m| m.pointcut().is_concrete()));
        let kinds: Vec<TypeMungerKind> = members.type_mungers().iter().map(ConcreteTypeMunger::kind).collect();
        assert_eq!(kinds, vec![TypeMungerKind::AccessForInline, TypeMungerKind::PerClauseAspect]);
        assert_eq!(members.declare_precedence().len(), 1);
    }

    #[test]
    fn test_abstract_aspect_contributes_declares_only() {
        let source = InMemoryTypeSource::with_java_lang();
        source.add(
            TypeDescriptor::aspect("com.acme.Base")
                .abstract_type()
                .with_shadow_munger(advice(AdviceKind::Before, "com.acme.Base", "call(* *(..))"))
                .with_declare(Declare::parents(parse_type_pattern("com.acme.Order").unwrap(), vec![parse_type_pattern("java.io.Serializable").unwrap()], false)),
        );
        source.add(TypeDescriptor::aspect("com.acme.Concrete").extends("com.acme.Base"));
        source.add(TypeDescriptor::class("com.acme.Order"));
        let (mut world, _) = universe(source);

        let base = world.resolve_name("com.acme.Base");
        let members = CrosscuttingMembers::collect(&mut world, &DefaultWeavingSupport, base, None);
        assert!(members.shadow_mungers().is_empty());
        assert!(members.type_mungers().is_empty());
        assert_eq!(members.declare_parents().len(), 1);

        let concrete = world.resolve_name("com.acme.Concrete");
        let members = CrosscuttingMembers::collect(&mut world, &DefaultWeavingSupport, concrete, None);
        assert_eq!(members.shadow_mungers().len(), 1);
        assert_eq!(members.shadow_mungers()[0].declaring_type().name(), "com.acme.Base");
    }

    #[test]
    fn test_replace_detects_structural_change() {
        let mut members = CrosscuttingMembers::new(UnresolvedType::for_name("A"));
        assert!(!members.replace_with(CrosscuttingMembers::new(UnresolvedType::for_name("A"))));
        let mut changed = CrosscuttingMembers::new(UnresolvedType::for_name("A"));
        changed.add_shadow_munger(advice(AdviceKind::Before, "A", "call(* *(..))"));
        assert!(members.replace_with(changed));
        assert_eq!(members.shadow_mungers().len(), 1);
    }
}
