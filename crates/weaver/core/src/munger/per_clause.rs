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
use serde::{Deserialize, Serialize};
use std::fmt;
use weaver_common::Persistent;

/// How instances of an aspect are created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PerClause {
    #[default]
    Singleton,
    /// `perthis(entry)` or `pertarget(entry)`
    PerObject { is_this: bool, entry: Pointcut },
    /// `percflow(entry)` or `percflowbelow(entry)`
    PerCflow { below: bool, entry: Pointcut },
    /// Inherit the clause of the super-aspect
    FromSuper,
}

impl PerClause {
    pub fn entry(&self) -> Option<&Pointcut> {
        match self {
            PerClause::PerObject { entry, .. } | PerClause::PerCflow { entry, .. } => Some(entry),
            _ => None,
        }
    }
}

impl fmt::Display for PerClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerClause::Singleton => write!(f, "issingleton()"),
            PerClause::PerObject { is_this, entry } => write!(f, "{}({})", if *is_this { "perthis" } else { "pertarget" }, entry),
            PerClause::PerCflow { below, entry } => write!(f, "{}({})", if *below { "percflowbelow" } else { "percflow" }, entry),
            PerClause::FromSuper => write!(f, "persuper()"),
        }
    }
}

impl Persistent for PerClause {
    const FAMILY: u8 = 8;

    fn kind_tag(&self) -> u8 {
        match self {
            PerClause::Singleton => 1,
            PerClause::PerObject { .. } => 2,
            PerClause::PerCflow { .. } => 3,
            PerClause::FromSuper => 4,
        }
    }
}
