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

//! Which formals a pointcut under resolution has bound so far

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    bound: Vec<bool>,
}

impl Bindings {
    pub fn new(formal_count: usize) -> Self {
        Self {
            bound: vec![false; formal_count],
        }
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Record a binding; false if the formal was already bound or is unknown
    pub fn register(&mut self, formal_index: usize) -> bool {
        match self.bound.get_mut(formal_index) {
            Some(slot) if !*slot => {
                *slot = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_bound(&self, formal_index: usize) -> bool {
        self.bound.get(formal_index).copied().unwrap_or(false)
    }

    /// Add every binding of `other`; returns the formals bound in both
    pub fn merge_in(&mut self, other: &Bindings) -> Vec<usize> {
        let mut duplicates = Vec::new();
        for index in other.bound_indices() {
            if !self.register(index) {
                duplicates.push(index);
            }
        }
        duplicates
    }

    /// Both alternatives of an `||` must bind the same formals
    pub fn check_equal(&self, other: &Bindings) -> bool {
        self.bound == other.bound
    }

    pub fn bound_indices(&self) -> Vec<usize> {
        self.bound.iter().enumerate().filter(|(_, b)| **b).map(|(i, _)| i).collect()
    }

    pub fn unbound_indices(&self) -> Vec<usize> {
        self.bound.iter().enumerate().filter(|(_, b)| !**b).map(|(i, _)| i).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_binding_is_rejected() {
        let mut b = Bindings::new(2);
        assert!(b.register(0));
        assert!(!b.register(0));
        assert!(!b.register(5));
        assert_eq!(b.unbound_indices(), vec![1]);
    }

    #[test]
    fn test_merge_reports_overlap() {
        let mut outer = Bindings::new(3);
        outer.register(0);
        let mut inner = Bindings::new(3);
        inner.register(0);
        inner.register(2);
        assert_eq!(outer.merge_in(&inner), vec![0]);
        assert_eq!(outer.bound_indices(), vec![0, 2]);
        assert!(outer.check_equal(&inner));
        assert!(!outer.check_equal(&Bindings::new(3)));
    }
}
