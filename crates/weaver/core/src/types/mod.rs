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

//! Type universe: signatures, resolved types, members and introspection

pub mod annotation;
pub mod assignability;
pub mod delegate;
pub mod member;
pub mod resolved;
pub mod type_map;
pub mod universe;
pub mod unresolved;

pub use annotation::AnnotationAj;
pub use delegate::{InMemoryTypeSource, ReferenceTypeDelegate, TypeDescriptor, TypeSource};
pub use member::{MemberKind, ResolvedMember, TypeVariable, modifiers};
pub use resolved::{ResolvedType, TypeId};
pub use type_map::{ReclaimHandle, Tier};
pub use universe::TypeUniverse;
pub use unresolved::{TypeKind, UnresolvedType, WildcardBound};
