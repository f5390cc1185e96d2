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

//! The type universe of one weaving session
//!
//! Resolved types live in a generational arena and are found by signature
//! through a two-tier [`TypeMap`]. Types are created on first request and
//! never fail to resolve: anything the [`TypeSource`] does not know becomes
//! the missing-type sentinel and is reported through the `cantFindType` lint.

use crate::lint::Lint;
use crate::munger::ConcreteTypeMunger;
use crate::pointcut::PointcutDefinition;
use crate::types::annotation::AnnotationAj;
use crate::types::delegate::{ReferenceTypeDelegate, TypeSource};
use crate::types::member::{ResolvedMember, TypeVariable, modifiers};
use crate::types::resolved::{MemberView, ResolvedType, TypeId};
use crate::types::type_map::{ReclaimHandle, Tier, TypeMap};
use crate::types::unresolved::{TypeKind, UnresolvedType, WildcardBound};
use metrics::counter;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, instrument, trace};
use weaver_common::{DemotionMode, Message, MessageHandler, ReclaimPolicy, Severity, SourceLocation, WorldConfig};

const MISSING: TypeId = TypeId { index: 0, generation: 0 };

struct Slot {
    generation: u32,
    entry: Option<ResolvedType>,
}

pub struct TypeUniverse {
    config: WorldConfig,
    source: Arc<dyn TypeSource>,
    handler: Arc<dyn MessageHandler>,
    missing_type: ResolvedType,
    slots: Vec<Slot>,
    free: Vec<u32>,
    map: TypeMap,
    generation: u64,
    /// Signatures already reported as missing
    reported_missing: HashSet<String>,
}

impl TypeUniverse {
    pub fn new(config: WorldConfig, source: Arc<dyn TypeSource>, handler: Arc<dyn MessageHandler>) -> Self {
        let mut missing_type = ResolvedType::new(MISSING, UnresolvedType::missing("@missing@"), TypeKind::Missing);
        missing_type.cached = false;
        Self {
            config,
            source,
            handler,
            missing_type,
            // slot 0 is reserved for the sentinel
            slots: vec![Slot { generation: 0, entry: None }],
            free: Vec::new(),
            map: TypeMap::new(),
            generation: 0,
            reported_missing: HashSet::new(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Bumped on every structural change to a type
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn message_handler(&self) -> &Arc<dyn MessageHandler> {
        &self.handler
    }

    pub fn report(&self, message: Message) {
        self.handler.handle(message);
    }

    /// Report through a configurable lint; `Ignore` drops the message
    pub fn report_lint(&self, lint: Lint, text: impl Into<String>, location: Option<SourceLocation>) {
        self.report_lint_related(lint, text, location, None);
    }

    /// Lint message pointing at two places, such as both halves of a conflict
    pub fn report_lint_related(&self, lint: Lint, text: impl Into<String>, location: Option<SourceLocation>, related: Option<SourceLocation>) {
        let severity = lint.severity(&self.config.lint);
        if severity == Severity::Ignore || self.handler.is_ignoring(severity) {
            return;
        }
        let text = format!("{} [Xlint:{}]", text.into(), lint.key());
        self.handler.handle(Message::new(severity, text).at(location).related_to(related));
    }

    pub fn missing(&self) -> TypeId {
        MISSING
    }

    pub fn is_missing(&self, id: TypeId) -> bool {
        self.ty(id).is_missing()
    }

    pub fn get(&self, id: TypeId) -> Option<&ResolvedType> {
        if id == MISSING {
            return Some(&self.missing_type);
        }
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// The type behind `id`; stale ids read as the missing sentinel
    pub fn ty(&self, id: TypeId) -> &ResolvedType {
        self.get(id).unwrap_or(&self.missing_type)
    }

    fn update(&mut self, id: TypeId, f: impl FnOnce(&mut ResolvedType)) {
        if id == MISSING {
            return;
        }
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation {
                if let Some(entry) = slot.entry.as_mut() {
                    f(entry);
                }
            }
        }
    }

    fn alloc(&mut self, unresolved: UnresolvedType, kind: TypeKind) -> TypeId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                TypeId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, entry: None });
                TypeId::new(index, 0)
            }
        };
        self.slots[id.index as usize].entry = Some(ResolvedType::new(id, unresolved, kind));
        id
    }

    fn free_slot(&mut self, id: TypeId) {
        if id == MISSING {
            return;
        }
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.entry.take().is_some() {
                self.free.push(id.index);
            }
        }
    }

    fn live_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.entry.is_some())
            .map(|(i, s)| TypeId::new(i as u32, s.generation))
    }

    pub fn live_type_count(&self) -> usize {
        self.live_ids().count()
    }

    // ---- resolution ----

    pub fn resolve_name(&mut self, name: &str) -> TypeId {
        self.resolve(&UnresolvedType::for_name(name))
    }

    pub fn resolve_signature(&mut self, signature: &str) -> TypeId {
        self.resolve(&UnresolvedType::for_signature(signature))
    }

    pub fn object(&mut self) -> TypeId {
        self.resolve(&UnresolvedType::object())
    }

    /// Resolve a type, creating it on first request.
    ///
    /// Never fails: unknown types yield the missing sentinel and a
    /// `cantFindType` lint, reported once per signature. Types whose
    /// signature mentions a type variable are built fresh on every call.
    pub fn resolve(&mut self, ty: &UnresolvedType) -> TypeId {
        let id = self.resolve_quietly(ty);
        if id == MISSING && !ty.is_missing() {
            self.report_missing(ty, None);
        }
        id
    }

    /// Like [`resolve`](Self::resolve) but without reporting a missing type,
    /// for lookups that try several candidate names
    #[instrument(level = "trace", skip(self, ty), fields(signature = %ty.signature()))]
    pub fn resolve_quietly(&mut self, ty: &UnresolvedType) -> TypeId {
        self.drain_collected();
        if ty.is_missing() {
            return MISSING;
        }
        let cacheable = !ty.mentions_type_variables();
        if cacheable {
            if let Some((id, _)) = self.map.get(ty.signature()) {
                return id;
            }
        }

        let id = match ty.kind() {
            TypeKind::Primitive => self.alloc(ty.clone(), TypeKind::Primitive),
            TypeKind::Array => self.resolve_array(ty),
            TypeKind::Parameterized => self.resolve_parameterized(ty),
            TypeKind::Generic => self.resolve_generic_view(ty),
            TypeKind::TypeVariableReference => self.resolve_type_variable(&TypeVariable::new(ty.base_name())),
            TypeKind::Wildcard => self.resolve_wildcard(ty),
            TypeKind::Simple | TypeKind::Raw => self.resolve_reference(ty),
            TypeKind::Missing => MISSING,
        };
        if id == MISSING {
            return id;
        }

        if cacheable {
            self.register(id);
        } else if self.ty(id).signature() == ty.signature() {
            self.update(id, |t| t.cached = false);
        }
        id
    }

    fn report_missing(&mut self, ty: &UnresolvedType, needed_by: Option<TypeId>) {
        // name the type that is actually absent, not an array or parameterization of it
        let (element, _) = ty.element_type();
        let culprit = element.erasure();
        if !self.reported_missing.insert(culprit.signature().to_string()) {
            return;
        }
        let text = match needed_by {
            Some(owner) => format!("can't find type {} (supertype of {})", culprit.name(), self.name(owner)),
            None => format!("can't find type {}", culprit.name()),
        };
        self.report_lint(Lint::CantFindType, text, None);
    }

    /// Resolve a supertype of `owner`, naming `owner` when it is missing
    fn resolve_supertype(&mut self, owner: TypeId, ty: &UnresolvedType) -> TypeId {
        let id = self.resolve_quietly(ty);
        if id == MISSING && !ty.is_missing() {
            self.report_missing(ty, Some(owner));
        }
        id
    }

    /// Resolve a type variable to a fresh, uncached type bounded by its upper bound
    pub fn resolve_type_variable(&mut self, variable: &TypeVariable) -> TypeId {
        let bound = self.resolve(&variable.upper_bound);
        let id = self.alloc(UnresolvedType::type_variable(&variable.name), TypeKind::TypeVariableReference);
        self.update(id, |t| {
            t.bound = Some((WildcardBound::Extends, bound));
            t.cached = false;
        });
        id
    }

    /// Signature map entry for a type, if it is not already mapped
    fn register(&mut self, id: TypeId) {
        let Some(t) = self.get(id) else { return };
        let signature = t.signature().to_string();
        if self.map.is_mapped(&signature, id) {
            return;
        }
        let tier = self.tier_for(t);
        trace!(%signature, ?tier, "registered type");
        self.map.insert(signature, id, tier);
    }

    fn tier_for(&self, t: &ResolvedType) -> Tier {
        if !self.config.reclaimable_tier_enabled() || t.pinned || t.exposed_to_weaver || t.is_object() || t.is_primitive() || self.is_primitive_array(t.id) {
            Tier::Permanent
        } else {
            Tier::Reclaimable
        }
    }

    fn find_delegate(&self, name: &str) -> Option<Arc<dyn ReferenceTypeDelegate>> {
        if let Some(d) = self.source.find(name) {
            return Some(d);
        }
        // Outer.Inner written with dots
        let mut candidate = name.to_string();
        while let Some(dot) = candidate.rfind('.') {
            candidate.replace_range(dot..dot + 1, "$");
            if let Some(d) = self.source.find(&candidate) {
                return Some(d);
            }
        }
        None
    }

    fn resolve_reference(&mut self, ty: &UnresolvedType) -> TypeId {
        let name = ty.base_name();
        let Some(delegate) = self.find_delegate(&name) else {
            debug!(type_name = %name, "type not found");
            return MISSING;
        };
        let canonical = delegate.name();
        if let Some((id, _)) = self.map.get(UnresolvedType::for_name(&canonical).signature()) {
            return id;
        }
        let exposed = delegate.is_exposed_to_weaver();
        counter!("weaver_types_resolved", 1);

        if self.config.generics_mode && !delegate.type_variables().is_empty() {
            let generic = self.alloc(UnresolvedType::generic(&canonical), TypeKind::Generic);
            let raw = self.alloc(UnresolvedType::for_name(&canonical), TypeKind::Raw);
            self.update(generic, |t| {
                t.delegate = Some(delegate);
                t.raw = Some(raw);
                t.derivatives.push(raw);
                t.exposed_to_weaver = exposed;
            });
            self.update(raw, |t| {
                t.generic = Some(generic);
                t.exposed_to_weaver = exposed;
            });
            self.register(generic);
            debug!(type_name = %canonical, "resolved generic type");
            raw
        } else {
            let id = self.alloc(UnresolvedType::for_name(&canonical), TypeKind::Simple);
            self.update(id, |t| {
                t.delegate = Some(delegate);
                t.exposed_to_weaver = exposed;
            });
            id
        }
    }

    fn resolve_array(&mut self, ty: &UnresolvedType) -> TypeId {
        let Some(component_type) = ty.component_type() else { return MISSING };
        let component = self.resolve_quietly(component_type);
        if self.is_missing(component) {
            return MISSING;
        }
        let exposed = self.ty(component).exposed_to_weaver;
        let id = self.alloc(ty.clone(), TypeKind::Array);
        self.update(id, |t| {
            t.component = Some(component);
            t.exposed_to_weaver = exposed;
        });
        id
    }

    fn resolve_generic_view(&mut self, ty: &UnresolvedType) -> TypeId {
        let raw = self.resolve_quietly(&UnresolvedType::for_name(&ty.base_name()));
        self.ty(raw).generic.unwrap_or(raw)
    }

    fn resolve_parameterized(&mut self, ty: &UnresolvedType) -> TypeId {
        let raw = self.resolve_quietly(&ty.erasure());
        if self.is_missing(raw) {
            return MISSING;
        }
        let Some(generic) = self.ty(raw).generic else {
            // not generic, or generics mode is off: the erasure stands in
            return raw;
        };
        let args: Vec<TypeId> = ty.type_parameters().iter().map(|a| self.resolve(a)).collect();
        let declared = self.delegate_of(generic).map(|d| d.type_variables().len()).unwrap_or(0);
        if declared != args.len() {
            debug!(signature = %ty.signature(), declared, supplied = args.len(), "type argument count mismatch");
        }
        let exposed = self.ty(generic).exposed_to_weaver;
        let id = self.alloc(ty.clone(), TypeKind::Parameterized);
        self.update(id, |t| {
            t.generic = Some(generic);
            t.raw = Some(raw);
            t.type_arguments = args;
            t.exposed_to_weaver = exposed;
        });
        self.update(generic, |t| t.derivatives.push(id));
        id
    }

    fn resolve_wildcard(&mut self, ty: &UnresolvedType) -> TypeId {
        let bound = match ty.wildcard_bound() {
            (kind @ (WildcardBound::Extends | WildcardBound::Super), Some(b)) => Some((kind, self.resolve(b))),
            _ => None,
        };
        let id = self.alloc(ty.clone(), TypeKind::Wildcard);
        self.update(id, |t| t.bound = bound);
        id
    }

    /// Parameterize a generic (or raw) type with resolved arguments
    pub fn parameterize(&mut self, generic: TypeId, args: &[TypeId]) -> TypeId {
        let base = self.ty(generic).unresolved.base_name();
        let args = args.iter().map(|a| self.ty(*a).unresolved.clone()).collect();
        self.resolve(&UnresolvedType::parameterized(&base, args))
    }

    pub fn make_array(&mut self, component: TypeId, dims: u32) -> TypeId {
        let ty = self.ty(component).unresolved.make_array(dims);
        self.resolve(&ty)
    }

    // ---- tiers ----

    pub fn tier_of(&self, id: TypeId) -> Option<Tier> {
        let t = self.get(id)?;
        match self.map.get(t.signature()) {
            Some((mapped, tier)) if mapped == id => Some(tier),
            _ => None,
        }
    }

    /// Pin a type: it moves to the permanent tier and stays there
    pub fn mark_exposed(&mut self, id: TypeId) {
        self.update(id, |t| t.pinned = true);
        if let Some(t) = self.get(id) {
            let signature = t.signature().to_string();
            if self.map.is_mapped(&signature, id) && self.map.promote(&signature) {
                debug!(%signature, "promoted exposed type");
            }
        }
    }

    /// Release a pin; the type becomes a demotion candidate again
    pub fn unmark_exposed(&mut self, id: TypeId) {
        self.update(id, |t| t.pinned = false);
        if let Some(t) = self.get(id) {
            let signature = t.signature().to_string();
            if self.map.permanent_id(&signature) == Some(id) {
                self.map.restore_added(vec![signature]);
            }
        }
    }

    pub fn mark_emitted(&mut self, id: TypeId) {
        self.update(id, |t| t.emitted = true);
    }

    pub fn mark_weaving_complete(&mut self, id: TypeId) {
        self.update(id, |t| t.weaving_complete = true);
    }

    pub fn add_type_munger(&mut self, target: TypeId, munger: Arc<ConcreteTypeMunger>) {
        self.update(target, |t| t.type_mungers.push(munger));
        self.generation += 1;
    }

    fn is_primitive_array(&self, id: TypeId) -> bool {
        let t = self.ty(id);
        t.is_array() && t.unresolved.element_type().0.is_primitive()
    }

    /// Move types added since the last sweep to the reclaimable tier.
    ///
    /// Pinned types, aspects, `Object`, primitives and types carrying type
    /// mungers stay. In batch mode a type must also have been emitted and
    /// have completed weaving; otherwise it is reconsidered next sweep.
    #[instrument(skip(self))]
    pub fn demote(&mut self) -> usize {
        let mode = self.config.demotion;
        if mode == DemotionMode::Disabled {
            return 0;
        }
        let mut deferred = Vec::new();
        let mut demoted = 0usize;
        for signature in self.map.take_added_since_sweep() {
            let Some(id) = self.map.permanent_id(&signature) else { continue };
            let t = self.ty(id);
            if t.pinned || t.is_object() || t.is_primitive() || self.is_primitive_array(id) || self.is_aspect(id) || !t.type_mungers.is_empty() {
                continue;
            }
            if mode == DemotionMode::Batch && !(t.emitted && t.weaving_complete) {
                deferred.push(signature);
                continue;
            }
            if self.map.demote(&signature) {
                demoted += 1;
            }
        }
        self.map.restore_added(deferred);
        counter!("weaver_types_demoted", demoted as u64);
        debug!(demoted, "demotion sweep finished");
        demoted
    }

    pub fn reclaim_handle(&self) -> ReclaimHandle {
        self.map.handle()
    }

    /// Everything reachable from the permanent tier and from pinned types
    fn reachable(&self) -> HashSet<TypeId> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<TypeId> = self.map.permanent_ids().collect();
        queue.extend(self.live_ids().filter(|id| self.ty(*id).pinned));
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(t) = self.get(id) {
                queue.extend(t.strong_links().filter(|l| !seen.contains(l)));
            }
        }
        seen
    }

    /// Process entries removed through a [`ReclaimHandle`]; returns slots freed
    fn drain_collected(&mut self) -> usize {
        let collected = self.map.drain_collected();
        if collected.is_empty() {
            return 0;
        }
        let live = self.reachable();
        let mut freed = 0;
        for (signature, id) in collected {
            if live.contains(&id) {
                // still referenced from the permanent tier
                self.map.insert(signature, id, Tier::Reclaimable);
            } else {
                self.free_slot(id);
                freed += 1;
            }
        }
        if freed > 0 {
            self.prune_derivatives();
        }
        freed
    }

    fn prune_derivatives(&mut self) {
        let live: HashSet<TypeId> = self.live_ids().collect();
        for slot in &mut self.slots {
            if let Some(t) = slot.entry.as_mut() {
                t.derivatives.retain(|d| live.contains(d));
            }
        }
    }

    /// Evict reclaimable and uncached types no longer reachable from the
    /// permanent tier. `Soft` only evicts under memory pressure, `Strong`
    /// never does.
    #[instrument(skip(self))]
    pub fn collect_garbage(&mut self, under_pressure: bool) -> usize {
        let mut freed = self.drain_collected();
        match self.config.reclaim_policy {
            ReclaimPolicy::Strong => return freed,
            ReclaimPolicy::Soft if !under_pressure => return freed,
            _ => {}
        }
        let live = self.reachable();
        for (signature, id) in self.map.reclaimable_entries() {
            if !live.contains(&id) {
                self.map.remove(&signature);
                self.free_slot(id);
                freed += 1;
            }
        }
        let orphans: Vec<TypeId> = self.live_ids().filter(|id| !live.contains(id) && !self.ty(*id).cached).collect();
        for id in orphans {
            self.free_slot(id);
            freed += 1;
        }
        self.prune_derivatives();
        counter!("weaver_types_reclaimed", freed as u64);
        debug!(freed, remaining = self.live_type_count(), "garbage collection finished");
        freed
    }

    // ---- delegates ----

    fn delegate_owner(&self, id: TypeId) -> Option<TypeId> {
        let t = self.get(id)?;
        match t.kind {
            TypeKind::Simple | TypeKind::Generic => Some(id),
            TypeKind::Raw | TypeKind::Parameterized => t.generic,
            _ => None,
        }
    }

    /// Introspection delegate; raw and parameterized types share their generic's
    pub fn delegate_of(&self, id: TypeId) -> Option<Arc<dyn ReferenceTypeDelegate>> {
        let owner = self.delegate_owner(id)?;
        self.get(owner)?.delegate.clone()
    }

    /// Swap the delegate after a structural change; every derivative observes it
    #[instrument(skip(self, delegate))]
    pub fn replace_delegate(&mut self, id: TypeId, delegate: Arc<dyn ReferenceTypeDelegate>) {
        let Some(owner) = self.delegate_owner(id) else {
            debug!(%id, "no delegate to replace");
            return;
        };
        self.update(owner, |t| {
            t.delegate = Some(delegate);
            t.member_view = None;
        });
        let derivatives = self.ty(owner).derivatives.clone();
        for d in derivatives {
            self.update(d, |t| t.member_view = None);
        }
        self.generation += 1;
    }

    // ---- structural queries ----

    pub fn name(&self, id: TypeId) -> String {
        self.ty(id).name()
    }

    pub fn to_unresolved(&self, id: TypeId) -> UnresolvedType {
        self.ty(id).unresolved.clone()
    }

    pub fn modifiers(&self, id: TypeId) -> u32 {
        self.delegate_of(id).map(|d| d.modifiers()).unwrap_or(0)
    }

    pub fn is_interface(&self, id: TypeId) -> bool {
        self.delegate_of(id).is_some_and(|d| d.is_interface())
    }

    pub fn is_class(&self, id: TypeId) -> bool {
        self.delegate_of(id).is_some_and(|d| d.is_class())
    }

    pub fn is_aspect(&self, id: TypeId) -> bool {
        self.delegate_of(id).is_some_and(|d| d.is_aspect())
    }

    pub fn is_enum(&self, id: TypeId) -> bool {
        self.delegate_of(id).is_some_and(|d| d.is_enum())
    }

    pub fn is_annotation(&self, id: TypeId) -> bool {
        self.delegate_of(id).is_some_and(|d| d.is_annotation())
    }

    pub fn is_abstract(&self, id: TypeId) -> bool {
        self.modifiers(id) & modifiers::ABSTRACT != 0
    }

    /// Final classes and primitives have no subtypes
    pub fn is_final(&self, id: TypeId) -> bool {
        let t = self.ty(id);
        t.is_primitive() || (t.is_reference() && self.modifiers(id) & modifiers::FINAL != 0)
    }

    pub fn has_been_woven(&self, id: TypeId) -> bool {
        self.delegate_of(id).is_some_and(|d| d.has_been_woven())
    }

    /// Declared type variables of a generic type (or any of its views)
    pub fn type_variables(&self, id: TypeId) -> Vec<TypeVariable> {
        self.delegate_of(id).map(|d| d.type_variables()).unwrap_or_default()
    }

    /// Type variable name to argument for a parameterized type
    pub fn type_variable_bindings(&self, id: TypeId) -> HashMap<String, UnresolvedType> {
        let t = self.ty(id);
        if !t.is_parameterized() {
            return HashMap::new();
        }
        self.type_variables(id)
            .into_iter()
            .zip(t.type_arguments.iter())
            .map(|(v, a)| (v.name, self.ty(*a).unresolved.clone()))
            .collect()
    }

    fn erasure_bindings(&self, id: TypeId) -> HashMap<String, UnresolvedType> {
        self.type_variables(id).into_iter().map(|v| (v.name, v.upper_bound.erasure())).collect()
    }

    /// How a type mentioned in a declaration reads from this view of the type
    fn view_type(&self, id: TypeId, ty: &UnresolvedType) -> UnresolvedType {
        match self.ty(id).kind {
            TypeKind::Parameterized => ty.substitute(&self.type_variable_bindings(id)),
            TypeKind::Raw => ty.substitute(&self.erasure_bindings(id)).erasure(),
            _ => ty.clone(),
        }
    }

    pub fn superclass(&mut self, id: TypeId) -> Option<TypeId> {
        let (kind, bound) = self.get(id).map(|t| (t.kind, t.bound))?;
        match kind {
            TypeKind::Array => Some(self.object()),
            TypeKind::TypeVariableReference => bound.map(|(_, b)| b),
            TypeKind::Simple | TypeKind::Generic | TypeKind::Raw | TypeKind::Parameterized => {
                let declared = self.delegate_of(id)?.superclass()?;
                let view = self.view_type(id, &declared);
                Some(self.resolve_supertype(id, &view))
            }
            _ => None,
        }
    }

    pub fn declared_interfaces(&mut self, id: TypeId) -> Vec<TypeId> {
        match self.ty(id).kind {
            TypeKind::Array => vec![self.resolve_name("java.lang.Cloneable"), self.resolve_name("java.io.Serializable")],
            TypeKind::Simple | TypeKind::Generic | TypeKind::Raw | TypeKind::Parameterized => {
                let Some(delegate) = self.delegate_of(id) else { return Vec::new() };
                let views: Vec<UnresolvedType> = delegate.declared_interfaces().iter().map(|i| self.view_type(id, i)).collect();
                views.iter().map(|v| self.resolve_supertype(id, v)).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn direct_supertypes(&mut self, id: TypeId) -> Vec<TypeId> {
        let mut supers: Vec<TypeId> = self.superclass(id).into_iter().collect();
        supers.extend(self.declared_interfaces(id));
        supers
    }

    /// Every supertype, breadth first, without `id` itself
    pub fn all_supertypes(&mut self, id: TypeId) -> Vec<TypeId> {
        let mut seen = HashSet::from([id]);
        let mut result = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for s in self.direct_supertypes(current) {
                if self.is_missing(s) {
                    continue;
                }
                let signature = self.ty(s).signature().to_string();
                if seen.insert(s) && !result.iter().any(|r: &TypeId| self.ty(*r).signature() == signature) {
                    result.push(s);
                    queue.push_back(s);
                }
            }
        }
        result
    }

    fn view_member(&self, id: TypeId, member: &ResolvedMember) -> ResolvedMember {
        let mut copy = member.clone();
        copy.declaring_type = self.ty(id).unresolved.clone();
        copy.return_type = self.view_type(id, &member.return_type);
        copy.parameter_types = member.parameter_types.iter().map(|p| self.view_type(id, p)).collect();
        copy.exceptions = member.exceptions.iter().map(|e| self.view_type(id, e)).collect();
        copy
    }

    fn member_view(&mut self, id: TypeId) -> Option<Arc<MemberView>> {
        if let Some(view) = &self.ty(id).member_view {
            return Some(Arc::clone(view));
        }
        let delegate = self.delegate_of(id)?;
        let view = Arc::new(MemberView {
            methods: delegate.declared_methods().iter().map(|m| self.view_member(id, m)).collect(),
            fields: delegate.declared_fields().iter().map(|f| self.view_member(id, f)).collect(),
        });
        let cached = Arc::clone(&view);
        self.update(id, |t| t.member_view = Some(cached));
        Some(view)
    }

    /// Declared methods, substituted for parameterized types and erased for raw ones
    pub fn declared_methods(&mut self, id: TypeId) -> Vec<ResolvedMember> {
        match self.ty(id).kind {
            TypeKind::Simple | TypeKind::Generic => self.delegate_of(id).map(|d| d.declared_methods()).unwrap_or_default(),
            TypeKind::Raw | TypeKind::Parameterized => self.member_view(id).map(|v| v.methods.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn declared_fields(&mut self, id: TypeId) -> Vec<ResolvedMember> {
        match self.ty(id).kind {
            TypeKind::Simple | TypeKind::Generic => self.delegate_of(id).map(|d| d.declared_fields()).unwrap_or_default(),
            TypeKind::Raw | TypeKind::Parameterized => self.member_view(id).map(|v| v.fields.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn annotations(&self, id: TypeId) -> Vec<AnnotationAj> {
        self.delegate_of(id).map(|d| d.annotations()).unwrap_or_default()
    }

    pub fn has_annotation(&self, id: TypeId, annotation_type: &UnresolvedType) -> bool {
        self.annotations(id).iter().any(|a| a.is_of_type(annotation_type))
    }

    /// Lexically enclosing type of a nested type
    pub fn outer_type(&mut self, id: TypeId) -> Option<TypeId> {
        let outer = self.delegate_of(id)?.outer_type()?;
        let resolved = self.resolve(&outer);
        (!self.is_missing(resolved)).then_some(resolved)
    }

    pub fn declared_pointcuts(&self, id: TypeId) -> Vec<PointcutDefinition> {
        self.delegate_of(id).map(|d| d.declared_pointcuts()).unwrap_or_default()
    }

    /// Named pointcut visible from `id`, searching the type and then its supertypes
    pub fn find_pointcut(&mut self, id: TypeId, name: &str) -> Option<PointcutDefinition> {
        if let Some(found) = self.declared_pointcuts(id).into_iter().find(|p| p.name == name) {
            return Some(found);
        }
        self.all_supertypes(id).into_iter().find_map(|s| self.declared_pointcuts(s).into_iter().find(|p| p.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::delegate::{InMemoryTypeSource, TypeDescriptor};
    use weaver_common::CollectingHandler;

    fn universe_with(config: WorldConfig, extra: Vec<TypeDescriptor>) -> TypeUniverse {
        let source = InMemoryTypeSource::with_java_lang();
        for d in extra {
            source.add(d);
        }
        TypeUniverse::new(config, Arc::new(source), Arc::new(CollectingHandler::new()))
    }

    fn universe() -> TypeUniverse {
        universe_with(WorldConfig::default(), vec![TypeDescriptor::class("com.acme.Foo").method("void", "bar", &["java.lang.String"])])
    }

    #[test]
    fn test_resolution_identity() {
        let mut world = universe();
        let a = world.resolve_name("com.acme.Foo");
        let b = world.resolve_signature("Lcom/acme/Foo;");
        assert_eq!(a, b);
        assert_eq!(world.ty(a).kind(), TypeKind::Simple);
        assert_eq!(world.resolve_name("int[]"), world.resolve_signature("[I"));
    }

    #[test]
    fn test_unknown_type_is_missing_sentinel() {
        let mut world = universe();
        let id = world.resolve_name("com.acme.Nope");
        assert!(world.is_missing(id));
        assert_eq!(id, world.missing());
    }

    #[test]
    fn test_type_variable_types_are_not_cached() {
        let mut world = universe();
        let sig = UnresolvedType::for_signature("Pjava/util/List<TE;>;");
        let a = world.resolve(&sig);
        let b = world.resolve(&sig);
        assert_ne!(a, b);
        assert!(!world.ty(a).is_cached());
        assert_eq!(world.tier_of(a), None);
    }

    #[test]
    fn test_generic_triangle() {
        let mut world = universe();
        let raw = world.resolve_name("java.util.List");
        assert!(world.ty(raw).is_raw());
        let generic = world.ty(raw).generic_type().unwrap();
        assert_eq!(world.ty(generic).raw_type(), Some(raw));
        assert_eq!(world.resolve_signature("Gjava/util/List;"), generic);

        let p = world.resolve_name("java.util.List<java.lang.String>");
        assert_eq!(world.ty(p).generic_type(), Some(generic));
        assert_eq!(world.ty(p).raw_type(), Some(raw));
        assert!(world.ty(generic).derivatives().contains(&p));
    }

    #[test]
    fn test_generics_mode_off_resolves_erasure() {
        let mut world = universe_with(WorldConfig::default().with_generics_mode(false), vec![]);
        let p = world.resolve_name("java.util.List<java.lang.String>");
        assert_eq!(world.ty(p).kind(), TypeKind::Simple);
        assert_eq!(world.ty(p).signature(), "Ljava/util/List;");
    }

    #[test]
    fn test_parameterized_members_are_substituted() {
        let mut world = universe();
        let p = world.resolve_name("java.util.List<java.lang.String>");
        let get = world.declared_methods(p).into_iter().find(|m| m.name == "get").unwrap();
        assert_eq!(get.return_type, UnresolvedType::string());

        let raw = world.resolve_name("java.util.List");
        let get = world.declared_methods(raw).into_iter().find(|m| m.name == "get").unwrap();
        assert!(get.return_type.is_object());
    }

    #[test]
    fn test_parameterized_supertypes_are_substituted() {
        let mut world = universe();
        let p = world.resolve_name("java.util.ArrayList<java.lang.String>");
        let supers: Vec<String> = world.all_supertypes(p).into_iter().map(|s| world.name(s)).collect();
        assert!(supers.contains(&"java.util.List<java.lang.String>".to_string()));
        assert!(supers.contains(&"java.lang.Iterable<java.lang.String>".to_string()));
        assert!(supers.contains(&"java.lang.Object".to_string()));
    }

    #[test]
    fn test_tier_assignment() {
        let mut world = universe_with(WorldConfig::default(), vec![TypeDescriptor::class("com.acme.Woven").exposed()]);
        let object = world.object();
        let int_array = world.resolve_name("int[][]");
        let incidental = world.resolve_name("java.lang.Runnable");
        let woven = world.resolve_name("com.acme.Woven");
        assert_eq!(world.tier_of(object), Some(Tier::Permanent));
        assert_eq!(world.tier_of(int_array), Some(Tier::Permanent));
        assert_eq!(world.tier_of(incidental), Some(Tier::Reclaimable));
        assert_eq!(world.tier_of(woven), Some(Tier::Permanent));

        let mut strong = universe_with(WorldConfig::retain_all(), vec![]);
        let runnable = strong.resolve_name("java.lang.Runnable");
        assert_eq!(strong.tier_of(runnable), Some(Tier::Permanent));
    }

    #[test]
    fn test_incremental_demotion_skips_pinned_types() {
        let mut world = universe_with(
            WorldConfig::default(),
            vec![TypeDescriptor::class("com.acme.A").exposed(), TypeDescriptor::class("com.acme.B").exposed(), TypeDescriptor::aspect("com.acme.Tracing")],
        );
        let a = world.resolve_name("com.acme.A");
        let b = world.resolve_name("com.acme.B");
        let aspect = world.resolve_name("com.acme.Tracing");
        world.mark_exposed(a);

        assert_eq!(world.demote(), 1);
        assert_eq!(world.tier_of(a), Some(Tier::Permanent));
        assert_eq!(world.tier_of(b), Some(Tier::Reclaimable));
        assert_eq!(world.tier_of(aspect), Some(Tier::Permanent));

        assert_eq!(world.demote(), 0);
        assert_eq!(world.tier_of(a), Some(Tier::Permanent));

        world.mark_exposed(b);
        assert_eq!(world.tier_of(b), Some(Tier::Permanent));
    }

    #[test]
    fn test_batch_demotion_waits_for_weaving() {
        let mut world = universe_with(WorldConfig::batch(), vec![TypeDescriptor::class("com.acme.A").exposed()]);
        let a = world.resolve_name("com.acme.A");
        assert_eq!(world.demote(), 0);
        world.mark_emitted(a);
        assert_eq!(world.demote(), 0);
        world.mark_weaving_complete(a);
        assert_eq!(world.demote(), 1);
        assert_eq!(world.tier_of(a), Some(Tier::Reclaimable));
    }

    #[test]
    fn test_collect_garbage_keeps_reachable_types() {
        let mut world = universe_with(WorldConfig::default().with_reclaim_policy(ReclaimPolicy::Weak), vec![TypeDescriptor::class("com.acme.Holder").exposed()]);
        let holder = world.resolve_name("com.acme.Holder");
        let strings = world.resolve_name("java.lang.String[]");
        let runnable = world.resolve_name("java.lang.Runnable");
        world.mark_exposed(strings);

        let freed = world.collect_garbage(false);
        assert!(freed >= 1);
        assert!(world.get(runnable).is_none());
        assert!(world.is_missing(runnable));
        // the array keeps its component alive
        let component = world.ty(strings).component_type().unwrap();
        assert_eq!(world.name(component), "java.lang.String");
        assert!(!world.is_missing(holder));

        let again = world.resolve_name("java.lang.Runnable");
        assert_ne!(again, runnable);
        assert!(!world.is_missing(again));
    }

    #[test]
    fn test_soft_policy_only_collects_under_pressure() {
        let mut world = universe();
        let runnable = world.resolve_name("java.lang.Runnable");
        assert_eq!(world.collect_garbage(false), 0);
        assert!(!world.is_missing(runnable));
        assert!(world.collect_garbage(true) >= 1);
        assert!(world.is_missing(runnable));
    }

    #[test]
    fn test_background_reclaim_is_drained_before_lookup() {
        let mut world = universe();
        let runnable = world.resolve_name("java.lang.Runnable");
        let handle = world.reclaim_handle();
        assert!(handle.reclaim("Ljava/lang/Runnable;"));
        let again = world.resolve_name("java.lang.Runnable");
        assert_ne!(again, runnable);
        assert!(world.get(runnable).is_none());
    }

    #[test]
    fn test_replace_delegate_is_observed_by_derivatives() {
        let mut world = universe_with(WorldConfig::default(), vec![TypeDescriptor::class("com.acme.Box").with_type_variables(&["T"]).method("T", "get", &[])]);
        let p = world.resolve_name("com.acme.Box<java.lang.String>");
        assert_eq!(world.declared_methods(p).len(), 1);
        let before = world.generation();

        let replacement = TypeDescriptor::class("com.acme.Box").with_type_variables(&["T"]).method("T", "get", &[]).method("void", "set", &["T"]);
        world.replace_delegate(p, Arc::new(replacement));
        assert!(world.generation() > before);
        let methods = world.declared_methods(p);
        assert_eq!(methods.len(), 2);
        assert!(methods.iter().any(|m| m.name == "set" && m.parameter_types == vec![UnresolvedType::string()]));
    }

    #[test]
    fn test_nested_type_found_by_dotted_name() {
        let mut world = universe_with(WorldConfig::default(), vec![TypeDescriptor::class("com.acme.Outer$Inner").nested_in("com.acme.Outer"), TypeDescriptor::class("com.acme.Outer")]);
        let inner = world.resolve_name("com.acme.Outer.Inner");
        assert!(!world.is_missing(inner));
        let outer = world.outer_type(inner).unwrap();
        assert_eq!(world.name(outer), "com.acme.Outer");
    }

    #[test]
    fn test_lint_severity_and_ignore() {
        let handler = CollectingHandler::new();
        let world = TypeUniverse::new(WorldConfig::default(), Arc::new(InMemoryTypeSource::new()), Arc::new(handler.clone()));
        world.report_lint(Lint::CantFindType, "can't find type Foo", None);
        world.report_lint(Lint::UnmatchedSuperTypeInCall, "ignored", None);
        assert!(handler.has_errors());
        assert!(handler.contains("[Xlint:cantFindType]"));
        assert!(!handler.contains("ignored"));
    }

    fn reporting_universe(config: WorldConfig, extra: Vec<TypeDescriptor>) -> (TypeUniverse, CollectingHandler) {
        let source = InMemoryTypeSource::with_java_lang();
        for d in extra {
            source.add(d);
        }
        let handler = CollectingHandler::new();
        (TypeUniverse::new(config, Arc::new(source), Arc::new(handler.clone())), handler)
    }

    #[test]
    fn test_missing_type_is_reported_once() {
        let (mut world, handler) = reporting_universe(WorldConfig::default(), vec![]);
        let ids = [
            world.resolve_name("com.acme.Nope"),
            world.resolve_name("com.acme.Nope"),
            world.resolve_name("com.acme.Nope[]"),
            world.resolve_quietly(&UnresolvedType::for_name("com.acme.Other")),
        ];
        assert!(ids.iter().all(|id| world.is_missing(*id)));

        let errors = handler.errors();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].text.starts_with("can't find type com.acme.Nope [Xlint:cantFindType]"));
    }

    #[test]
    fn test_missing_superclass_is_reported_with_its_subtype() {
        let child = TypeDescriptor::class("com.acme.Child").extends("com.acme.GoneParent");
        let (mut world, handler) = reporting_universe(WorldConfig::default(), vec![child]);
        let child = world.resolve_name("com.acme.Child");
        assert!(handler.messages().is_empty());

        assert!(world.all_supertypes(child).is_empty());
        world.all_supertypes(child);
        assert_eq!(handler.errors().len(), 1);
        assert!(handler.contains("can't find type com.acme.GoneParent (supertype of com.acme.Child)"));
    }

    #[test]
    fn test_missing_type_lint_can_be_ignored() {
        let lint = weaver_common::LintConfig {
            cant_find_type: Severity::Ignore,
            ..weaver_common::LintConfig::default()
        };
        let (mut world, handler) = reporting_universe(WorldConfig::default().with_lint(lint), vec![]);
        world.resolve_name("com.acme.Nope");
        assert!(handler.messages().is_empty());
    }
}
