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

//! Weaver Core
//!
//! Pointcut matching and type resolution for an aspect weaver: a type
//! universe with generics-aware assignability, type/signature/annotation
//! patterns, the pointcut tree with its three matching phases, binding and
//! concretization of pointcuts for concrete aspects, and the aggregation and
//! precedence ordering of aspect contributions.

pub mod binding;
pub mod crosscutting;
pub mod declare;
pub mod lint;
pub mod munger;
pub mod patterns;
pub mod pointcut;
pub mod residue;
pub mod shadow;
pub mod tristate;
pub mod types;

// Re-export the main entry points for easy access
pub use binding::{Bindings, Concretizer, IntMap, Scope, SimpleScope};
pub use crosscutting::{CrosscuttingMembers, CrosscuttingMembersSet, PrecedenceCalculator};
pub use declare::Declare;
pub use lint::Lint;
pub use munger::{Advice, AdviceKind, DefaultWeavingSupport, ShadowMunger, WeavingSupport};
pub use patterns::{ParseError, parse_pointcut, parse_type_pattern};
pub use pointcut::{Pointcut, PointcutDefinition, PointcutKind, PointcutState};
pub use residue::{ExposedState, Test};
pub use shadow::{FastMatchInfo, Shadow, ShadowKind};
pub use tristate::TriState;
pub use types::{InMemoryTypeSource, ReferenceTypeDelegate, TypeDescriptor, TypeId, TypeSource, TypeUniverse, UnresolvedType};
