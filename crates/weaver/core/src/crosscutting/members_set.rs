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

//! Every aspect registered in one weaving session

use crate::crosscutting::CrosscuttingMembers;
use crate::declare::Declare;
use crate::munger::{ConcreteTypeMunger, ShadowMunger, TypeMungerKind, WeavingSupport};
use crate::types::{TypeId, TypeUniverse};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Contributions of all registered aspects, in registration order
#[derive(Debug, Default)]
pub struct AggregateViews {
    pub generation: u64,
    pub shadow_mungers: Vec<ShadowMunger>,
    pub type_mungers: Vec<ConcreteTypeMunger>,
    pub type_mungers_by_kind: BTreeMap<TypeMungerKind, Vec<ConcreteTypeMunger>>,
    pub declare_parents: Vec<Declare>,
    pub declare_soft: Vec<Declare>,
    pub declare_precedence: Vec<Declare>,
}

impl AggregateViews {
    pub fn type_mungers_of_kind(&self, kind: TypeMungerKind) -> &[ConcreteTypeMunger] {
        self.type_mungers_by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Default)]
pub struct CrosscuttingMembersSet {
    members: Vec<(TypeId, CrosscuttingMembers)>,
    index: HashMap<TypeId, usize>,
    generation: u64,
    dirty: bool,
    views: Mutex<Option<Arc<AggregateViews>>>,
}

impl CrosscuttingMembersSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `aspect` or re-collect it if already registered.
    ///
    /// Returns true when the set changed: a new aspect, or a replaced one
    /// whose mungers or declares differ. Re-adding an abstract aspect also
    /// re-collects its registered concrete sub-aspects.
    #[instrument(level = "debug", skip(self, world, support), fields(aspect = %world.name(aspect)))]
    pub fn add_or_replace_aspect(&mut self, world: &mut TypeUniverse, support: &dyn WeavingSupport, aspect: TypeId) -> bool {
        let mut changed = self.collect_one(world, support, aspect);
        if world.is_abstract(aspect) {
            let descendants: Vec<TypeId> = self
                .members
                .iter()
                .map(|(id, _)| *id)
                .filter(|id| *id != aspect && !world.is_abstract(*id) && world.is_assignable_from(aspect, *id))
                .collect();
            for descendant in descendants {
                debug!(descendant = %world.name(descendant), "re-collecting sub-aspect of abstract aspect");
                changed |= self.collect_one(world, support, descendant);
            }
        }
        if changed {
            self.invalidate();
        }
        changed
    }

    fn collect_one(&mut self, world: &mut TypeUniverse, support: &dyn WeavingSupport, aspect: TypeId) -> bool {
        match self.index.get(&aspect).copied() {
            Some(i) => {
                let fresh = CrosscuttingMembers::collect(world, support, aspect, Some(&self.members[i].1));
                self.members[i].1.replace_with(fresh)
            }
            None => {
                let fresh = CrosscuttingMembers::collect(world, support, aspect, None);
                self.index.insert(aspect, self.members.len());
                self.members.push((aspect, fresh));
                info!(aspect = %world.name(aspect), "aspect registered");
                true
            }
        }
    }

    /// Remove `aspect`; true if it was registered
    pub fn delete_aspect(&mut self, aspect: TypeId) -> bool {
        let Some(i) = self.index.remove(&aspect) else { return false };
        self.members.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        self.invalidate();
        true
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.dirty = true;
        *self.views.lock() = None;
    }

    pub fn contains_aspect(&self, aspect: TypeId) -> bool {
        self.index.contains_key(&aspect)
    }

    /// Registered aspects in registration order
    pub fn aspects(&self) -> Vec<TypeId> {
        self.members.iter().map(|(id, _)| *id).collect()
    }

    pub fn members_of(&self, aspect: TypeId) -> Option<&CrosscuttingMembers> {
        self.index.get(&aspect).map(|i| &self.members[*i].1)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Acknowledge the current state; the next change sets the flag again
    pub fn reset_dirty(&mut self) {
        self.dirty = false;
    }

    /// Aggregate views, built on first use after a change
    pub fn views(&self) -> Arc<AggregateViews> {
        let mut slot = self.views.lock();
        if let Some(views) = slot.as_ref() {
            return views.clone();
        }
        let views = Arc::new(self.build_views());
        *slot = Some(views.clone());
        views
    }

    pub fn shadow_mungers(&self) -> Vec<ShadowMunger> {
        self.views().shadow_mungers.clone()
    }

    pub fn type_mungers(&self) -> Vec<ConcreteTypeMunger> {
        self.views().type_mungers.clone()
    }

    pub fn declare_precedence(&self) -> Vec<Declare> {
        self.views().declare_precedence.clone()
    }

    fn build_views(&self) -> AggregateViews {
        let mut views = AggregateViews {
            generation: self.generation,
            ..AggregateViews::default()
        };
        let mut privileged_fields: HashSet<(String, String)> = HashSet::new();
        for (_, members) in &self.members {
            views.shadow_mungers.extend(members.shadow_mungers().iter().cloned());
            for munger in members.type_mungers() {
                if let Some(key) = munger.munger.privileged_field_key() {
                    if !privileged_fields.insert(key) {
                        continue;
                    }
                }
                views.type_mungers.push(munger.clone());
                views.type_mungers_by_kind.entry(munger.kind()).or_default().push(munger.clone());
            }
            views.declare_parents.extend(members.declare_parents().iter().cloned());
            views.declare_soft.extend(members.declare_soft().iter().cloned());
            views.declare_precedence.extend(members.declare_precedence().iter().cloned());
        }
        debug!(
            generation = views.generation,
            shadow_mungers = views.shadow_mungers.len(),
            type_mungers = views.type_mungers.len(),
            "built aggregate views"
        );
        views
    }
}
