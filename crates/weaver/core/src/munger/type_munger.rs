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

use crate::munger::PerClause;
use crate::types::{ResolvedMember, UnresolvedType};
use serde::{Deserialize, Serialize};
use weaver_common::Persistent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeMungerKind {
    Field,
    Method,
    Constructor,
    Parents,
    PrivilegedAccess,
    PerClauseAspect,
    CflowCounterField,
    CflowStackField,
    AccessForInline,
}

/// A structural addition to a type: an inter-type member, new parents, or
/// one of the support members the engine itself needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTypeMunger {
    pub kind: TypeMungerKind,
    pub member: Option<ResolvedMember>,
    pub new_parents: Vec<UnresolvedType>,
    pub per_clause: Option<PerClause>,
    /// Privileged field accessor named by field alone rather than by full signature
    pub short_syntax: bool,
}

impl ResolvedTypeMunger {
    pub fn new(kind: TypeMungerKind, member: Option<ResolvedMember>) -> Self {
        Self {
            kind,
            member,
            new_parents: Vec::new(),
            per_clause: None,
            short_syntax: false,
        }
    }

    pub fn inter_type_field(field: ResolvedMember) -> Self {
        Self::new(TypeMungerKind::Field, Some(field))
    }

    pub fn inter_type_method(method: ResolvedMember) -> Self {
        Self::new(TypeMungerKind::Method, Some(method))
    }

    pub fn privileged_access(member: ResolvedMember, short_syntax: bool) -> Self {
        Self {
            short_syntax,
            ..Self::new(TypeMungerKind::PrivilegedAccess, Some(member))
        }
    }

    pub fn parents(target: UnresolvedType, new_parents: Vec<UnresolvedType>) -> Self {
        Self {
            new_parents,
            ..Self::new(TypeMungerKind::Parents, Some(ResolvedMember::static_initializer(target)))
        }
    }

    pub fn per_clause_aspect(aspect: UnresolvedType, per_clause: PerClause) -> Self {
        Self {
            per_clause: Some(per_clause),
            ..Self::new(TypeMungerKind::PerClauseAspect, Some(ResolvedMember::static_initializer(aspect)))
        }
    }

    /// Declaring type of the munger's member: the type being changed
    pub fn target_type(&self) -> Option<&UnresolvedType> {
        self.member.as_ref().map(|m| &m.declaring_type)
    }

    /// Key under which short-syntax field accessors of sibling aspects collapse
    pub fn privileged_field_key(&self) -> Option<(String, String)> {
        if self.kind != TypeMungerKind::PrivilegedAccess || !self.short_syntax {
            return None;
        }
        let member = self.member.as_ref()?;
        (member.kind == crate::types::MemberKind::Field).then(|| (member.declaring_type.signature().to_string(), member.name.clone()))
    }
}

impl Persistent for ResolvedTypeMunger {
    const FAMILY: u8 = 7;

    fn kind_tag(&self) -> u8 {
        self.kind as u8 + 1
    }
}

/// A type munger owned by the aspect that contributed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcreteTypeMunger {
    pub munger: ResolvedTypeMunger,
    pub aspect: Option<UnresolvedType>,
}

impl ConcreteTypeMunger {
    pub fn new(munger: ResolvedTypeMunger, aspect: Option<UnresolvedType>) -> Self {
        Self { munger, aspect }
    }

    pub fn kind(&self) -> TypeMungerKind {
        self.munger.kind
    }

    /// The type changed by this munger, the aspect itself when the munger has no member
    pub fn target_type(&self) -> Option<&UnresolvedType> {
        self.munger.target_type().or(self.aspect.as_ref())
    }
}
