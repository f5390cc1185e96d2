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

//! Opaque annotation values as reported by the introspection delegate

use crate::types::unresolved::UnresolvedType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An annotation instance on a type, member or parameter.
///
/// Element values are kept in their textual form; the engine only ever asks
/// whether a named value equals a given literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationAj {
    annotation_type: UnresolvedType,
    values: Vec<(String, String)>,
    runtime_visible: bool,
}

impl AnnotationAj {
    pub fn new(annotation_type: UnresolvedType) -> Self {
        Self {
            annotation_type,
            values: Vec::new(),
            runtime_visible: true,
        }
    }

    pub fn named(name: &str) -> Self {
        Self::new(UnresolvedType::for_name(name))
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    pub fn class_retention(mut self) -> Self {
        self.runtime_visible = false;
        self
    }

    pub fn annotation_type(&self) -> &UnresolvedType {
        &self.annotation_type
    }

    pub fn is_runtime_visible(&self) -> bool {
        self.runtime_visible
    }

    /// Value explicitly present on this instance
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn has_named_value(&self, name: &str, value: &str) -> bool {
        self.value(name) == Some(value)
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn is_of_type(&self, ty: &UnresolvedType) -> bool {
        self.annotation_type.signature() == ty.signature()
    }
}

impl fmt::Display for AnnotationAj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.annotation_type.name())?;
        if !self.values.is_empty() {
            let pairs: Vec<String> = self.values.iter().map(|(n, v)| format!("{}={}", n, v)).collect();
            write!(f, "({})", pairs.join(","))?;
        }
        Ok(())
    }
}
