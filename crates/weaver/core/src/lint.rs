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

//! Configurable lint checks

use weaver_common::{LintConfig, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lint {
    CantFindType,
    InvalidAbsoluteTypeName,
    PrecedenceConflict,
    UnmatchedSuperTypeInCall,
}

impl Lint {
    pub fn severity(self, config: &LintConfig) -> Severity {
        match self {
            Lint::CantFindType => config.cant_find_type,
            Lint::InvalidAbsoluteTypeName => config.invalid_absolute_type_name,
            Lint::PrecedenceConflict => config.precedence_conflict,
            Lint::UnmatchedSuperTypeInCall => config.unmatched_super_type_in_call,
        }
    }

    /// Suffix appended to lint messages so users can find the switch
    pub fn key(self) -> &'static str {
        match self {
            Lint::CantFindType => "cantFindType",
            Lint::InvalidAbsoluteTypeName => "invalidAbsoluteTypeName",
            Lint::PrecedenceConflict => "precedenceConflict",
            Lint::UnmatchedSuperTypeInCall => "unmatchedSuperTypeInCall",
        }
    }
}
