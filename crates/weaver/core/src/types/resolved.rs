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

//! Resolved types stored in the universe arena

use crate::munger::ConcreteTypeMunger;
use crate::types::delegate::ReferenceTypeDelegate;
use crate::types::member::ResolvedMember;
use crate::types::unresolved::{TypeKind, UnresolvedType, WildcardBound};
use std::fmt;
use std::sync::Arc;

/// Handle to a type in one [`crate::types::TypeUniverse`].
///
/// Handles are generational: once the slot is reclaimed the handle goes
/// stale and reads as the missing-type sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl TypeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Substituted member lists of a parameterized or raw type
#[derive(Debug, Clone, Default)]
pub(crate) struct MemberView {
    pub methods: Vec<ResolvedMember>,
    pub fields: Vec<ResolvedMember>,
}

pub struct ResolvedType {
    pub(crate) id: TypeId,
    pub(crate) unresolved: UnresolvedType,
    pub(crate) kind: TypeKind,
    /// Only simple and generic types own a delegate; raw and parameterized
    /// views read it through `generic`, so a swapped delegate is observed
    /// by every derivative.
    pub(crate) delegate: Option<Arc<dyn ReferenceTypeDelegate>>,
    pub(crate) component: Option<TypeId>,
    pub(crate) generic: Option<TypeId>,
    pub(crate) raw: Option<TypeId>,
    pub(crate) type_arguments: Vec<TypeId>,
    /// Raw and parameterized views of a generic type. Not traversed by the
    /// collector, so they never keep a derivative alive.
    pub(crate) derivatives: Vec<TypeId>,
    pub(crate) bound: Option<(WildcardBound, TypeId)>,
    pub(crate) exposed_to_weaver: bool,
    pub(crate) pinned: bool,
    pub(crate) emitted: bool,
    pub(crate) weaving_complete: bool,
    pub(crate) cached: bool,
    pub(crate) type_mungers: Vec<Arc<ConcreteTypeMunger>>,
    pub(crate) member_view: Option<Arc<MemberView>>,
}

impl ResolvedType {
    pub(crate) fn new(id: TypeId, unresolved: UnresolvedType, kind: TypeKind) -> Self {
        Self {
            id,
            unresolved,
            kind,
            delegate: None,
            component: None,
            generic: None,
            raw: None,
            type_arguments: Vec::new(),
            derivatives: Vec::new(),
            bound: None,
            exposed_to_weaver: false,
            pinned: false,
            emitted: false,
            weaving_complete: false,
            cached: true,
            type_mungers: Vec::new(),
            member_view: None,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn signature(&self) -> &str {
        self.unresolved.signature()
    }

    pub fn name(&self) -> String {
        self.unresolved.name()
    }

    pub fn unresolved(&self) -> &UnresolvedType {
        &self.unresolved
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_missing(&self) -> bool {
        self.kind == TypeKind::Missing
    }

    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    pub fn is_array(&self) -> bool {
        self.kind == TypeKind::Array
    }

    pub fn is_generic(&self) -> bool {
        self.kind == TypeKind::Generic
    }

    pub fn is_raw(&self) -> bool {
        self.kind == TypeKind::Raw
    }

    pub fn is_parameterized(&self) -> bool {
        self.kind == TypeKind::Parameterized
    }

    pub fn is_type_variable(&self) -> bool {
        self.kind == TypeKind::TypeVariableReference
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind == TypeKind::Wildcard
    }

    pub fn is_object(&self) -> bool {
        self.unresolved.is_object()
    }

    /// Class, interface or aspect in any of its generic views
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, TypeKind::Simple | TypeKind::Raw | TypeKind::Generic | TypeKind::Parameterized)
    }

    pub fn generic_type(&self) -> Option<TypeId> {
        self.generic
    }

    pub fn raw_type(&self) -> Option<TypeId> {
        self.raw
    }

    pub fn component_type(&self) -> Option<TypeId> {
        self.component
    }

    pub fn type_arguments(&self) -> &[TypeId] {
        &self.type_arguments
    }

    pub fn derivatives(&self) -> &[TypeId] {
        &self.derivatives
    }

    pub fn bound(&self) -> Option<(WildcardBound, TypeId)> {
        self.bound
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn is_exposed_to_weaver(&self) -> bool {
        self.exposed_to_weaver
    }

    /// Whether this type is registered in the signature map
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn type_mungers(&self) -> &[Arc<ConcreteTypeMunger>] {
        &self.type_mungers
    }

    /// Ids of every type this one keeps alive
    pub(crate) fn strong_links(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.component
            .iter()
            .chain(self.generic.iter())
            .chain(self.raw.iter())
            .chain(self.type_arguments.iter())
            .chain(self.bound.iter().map(|(_, b)| b))
            .copied()
    }
}

impl fmt::Debug for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedType")
            .field("id", &self.id)
            .field("signature", &self.signature())
            .field("kind", &self.kind)
            .field("pinned", &self.pinned)
            .finish()
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
