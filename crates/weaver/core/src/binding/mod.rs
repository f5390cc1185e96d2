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

//! Formal binding and concretization support

pub mod bindings;
pub mod int_map;
pub mod scope;

pub use bindings::Bindings;
pub use int_map::{EnclosingKind, IntMap};
pub use scope::{Formal, ResolveContext, Scope, SimpleScope, lookup_type};

use crate::crosscutting::CrosscuttingMembers;
use crate::munger::WeavingSupport;
use crate::types::TypeUniverse;

/// Everything a pointcut needs while being concretized for one aspect.
///
/// Cflow state fields and their entry mungers are registered with
/// `members`, the contributions of the aspect being collected.
pub struct Concretizer<'a> {
    pub world: &'a mut TypeUniverse,
    pub support: &'a dyn WeavingSupport,
    pub members: &'a mut CrosscuttingMembers,
}

impl<'a> Concretizer<'a> {
    pub fn new(world: &'a mut TypeUniverse, support: &'a dyn WeavingSupport, members: &'a mut CrosscuttingMembers) -> Self {
        Self { world, support, members }
    }
}
