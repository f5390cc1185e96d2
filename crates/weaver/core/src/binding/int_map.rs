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

//! Formal position remapping used during concretization

use crate::munger::AdviceKind;
use crate::types::{TypeId, UnresolvedType};
use std::collections::HashMap;

/// The declaration a pointcut is being concretized for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnclosingKind {
    Advice(AdviceKind),
    /// declare error/warning/soft
    Declare,
}

/// Maps a pointcut's own formal positions to slots of the advice it is
/// concretized for.
///
/// A position without a mapping may carry a type constraint from the
/// referencing pointcut. The map also tracks the chain of named pointcut
/// definitions being expanded, so that cyclic references are detected.
#[derive(Debug, Clone, Default)]
pub struct IntMap {
    map: HashMap<usize, usize>,
    constraints: HashMap<usize, UnresolvedType>,
    concrete_aspect: Option<TypeId>,
    enclosing_kind: Option<EnclosingKind>,
    enclosing_definitions: Vec<String>,
}

impl IntMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// `i -> i` for every position below `arity`
    pub fn identity(arity: usize) -> Self {
        let mut map = Self::new();
        for i in 0..arity {
            map.put(i, i);
        }
        map
    }

    pub fn put(&mut self, key: usize, value: usize) {
        self.map.insert(key, value);
    }

    pub fn get(&self, key: usize) -> Option<usize> {
        self.map.get(&key).copied()
    }

    pub fn constrain(&mut self, key: usize, ty: UnresolvedType) {
        self.constraints.insert(key, ty);
    }

    pub fn constraint(&self, key: usize) -> Option<&UnresolvedType> {
        self.constraints.get(&key)
    }

    pub fn set_concrete_aspect(&mut self, aspect: TypeId) {
        self.concrete_aspect = Some(aspect);
    }

    pub fn concrete_aspect(&self) -> Option<TypeId> {
        self.concrete_aspect
    }

    pub fn set_enclosing_kind(&mut self, kind: EnclosingKind) {
        self.enclosing_kind = Some(kind);
    }

    pub fn enclosing_kind(&self) -> Option<EnclosingKind> {
        self.enclosing_kind
    }

    /// Push a named definition; false if it is already being expanded
    pub fn enter_definition(&mut self, key: String) -> bool {
        if self.enclosing_definitions.contains(&key) {
            return false;
        }
        self.enclosing_definitions.push(key);
        true
    }

    pub fn exit_definition(&mut self) {
        self.enclosing_definitions.pop();
    }

    pub fn enclosing_definitions(&self) -> &[String] {
        &self.enclosing_definitions
    }

    /// Empty mapping sharing this map's aspect, enclosing kind and definition chain
    pub fn child(&self) -> IntMap {
        IntMap {
            map: HashMap::new(),
            constraints: HashMap::new(),
            concrete_aspect: self.concrete_aspect,
            enclosing_kind: self.enclosing_kind,
            enclosing_definitions: self.enclosing_definitions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_and_constraints() {
        let mut map = IntMap::identity(2);
        assert_eq!(map.get(1), Some(1));
        assert_eq!(map.get(2), None);
        map.constrain(2, UnresolvedType::string());
        assert_eq!(map.constraint(2), Some(&UnresolvedType::string()));
    }

    #[test]
    fn test_definition_cycle_detection() {
        let mut map = IntMap::new();
        map.set_enclosing_kind(EnclosingKind::Declare);
        assert!(map.enter_definition("A.p".into()));
        let mut child = map.child();
        assert_eq!(child.enclosing_kind(), Some(EnclosingKind::Declare));
        assert!(child.enter_definition("A.q".into()));
        assert!(!child.enter_definition("A.p".into()));
        child.exit_definition();
        assert!(child.enter_definition("A.r".into()));
        map.exit_definition();
        assert!(map.enclosing_definitions().is_empty());
    }
}
