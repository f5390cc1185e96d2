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

//! Modifier constraints such as `public !static`

use crate::types::modifiers;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifiersPattern {
    pub required: u32,
    pub forbidden: u32,
}

impl ModifiersPattern {
    pub const ANY: ModifiersPattern = ModifiersPattern { required: 0, forbidden: 0 };

    pub fn new(required: u32, forbidden: u32) -> Self {
        Self { required, forbidden }
    }

    pub fn require(mut self, flag: u32) -> Self {
        self.required |= flag;
        self
    }

    pub fn forbid(mut self, flag: u32) -> Self {
        self.forbidden |= flag;
        self
    }

    pub fn is_any(&self) -> bool {
        self.required == 0 && self.forbidden == 0
    }

    pub fn matches(&self, flags: u32) -> bool {
        flags & self.required == self.required && flags & self.forbidden == 0
    }
}

impl fmt::Display for ModifiersPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words: Vec<String> = modifiers::to_keywords(self.required).into_iter().map(str::to_string).collect();
        words.extend(modifiers::to_keywords(self.forbidden).into_iter().map(|k| format!("!{}", k)));
        write!(f, "{}", words.join(" "))
    }
}
