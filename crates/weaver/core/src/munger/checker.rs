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

use crate::pointcut::Pointcut;
use crate::shadow::Shadow;
use crate::types::{TypeUniverse, UnresolvedType};
use serde::{Deserialize, Serialize};
use tracing::trace;
use weaver_common::{Message, SourceLocation};

/// `declare error` / `declare warning`: a compile-time message at every
/// statically matched shadow. A checker never runs at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checker {
    pub is_error: bool,
    pub message: String,
    pub pointcut: Pointcut,
    pub declaring_type: UnresolvedType,
    pub location: Option<SourceLocation>,
}

impl Checker {
    pub fn new(is_error: bool, message: impl Into<String>, pointcut: Pointcut, declaring_type: UnresolvedType) -> Self {
        Self {
            is_error,
            message: message.into(),
            pointcut,
            declaring_type,
            location: None,
        }
    }

    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    /// Report the message when the shadow definitely matches.
    ///
    /// Always false: there is nothing to weave. The message points at the
    /// shadow and refers back to the declaration.
    pub fn check(&self, world: &mut TypeUniverse, shadow: &Shadow) -> bool {
        if self.pointcut.match_shadow(world, shadow).always_true() {
            trace!(shadow = shadow.id, "declare {} matched", if self.is_error { "error" } else { "warning" });
            let message = if self.is_error { Message::error(self.message.clone()) } else { Message::warning(self.message.clone()) };
            world.report(message.at(shadow.location.clone()).related_to(self.location.clone()));
        }
        false
    }
}
