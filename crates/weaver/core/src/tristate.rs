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

//! Three-valued match results
//!
//! `Maybe` means the answer cannot be decided from static information and
//! must be deferred to a runtime test.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriState {
    Yes,
    No,
    Maybe,
}

impl TriState {
    pub fn from_bool(value: bool) -> Self {
        if value { TriState::Yes } else { TriState::No }
    }

    /// No is absorbing, Yes is the identity
    pub fn and(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::No, _) | (_, TriState::No) => TriState::No,
            (TriState::Yes, TriState::Yes) => TriState::Yes,
            _ => TriState::Maybe,
        }
    }

    /// Yes is absorbing, No is the identity
    pub fn or(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::Yes, _) | (_, TriState::Yes) => TriState::Yes,
            (TriState::No, TriState::No) => TriState::No,
            _ => TriState::Maybe,
        }
    }

    pub fn negate(self) -> TriState {
        match self {
            TriState::Yes => TriState::No,
            TriState::No => TriState::Yes,
            TriState::Maybe => TriState::Maybe,
        }
    }

    /// Short-circuiting AND: `other` is not evaluated when `self` is No
    pub fn and_then(self, other: impl FnOnce() -> TriState) -> TriState {
        if self == TriState::No { TriState::No } else { self.and(other()) }
    }

    /// Short-circuiting OR: `other` is not evaluated when `self` is Yes
    pub fn or_else(self, other: impl FnOnce() -> TriState) -> TriState {
        if self == TriState::Yes { TriState::Yes } else { self.or(other()) }
    }

    pub fn always_true(self) -> bool {
        self == TriState::Yes
    }

    pub fn always_false(self) -> bool {
        self == TriState::No
    }

    pub fn maybe_true(self) -> bool {
        self != TriState::No
    }

    pub fn maybe_false(self) -> bool {
        self != TriState::Yes
    }
}

impl Not for TriState {
    type Output = TriState;

    fn not(self) -> TriState {
        self.negate()
    }
}

impl BitAnd for TriState {
    type Output = TriState;

    fn bitand(self, rhs: TriState) -> TriState {
        self.and(rhs)
    }
}

impl BitOr for TriState {
    type Output = TriState;

    fn bitor(self, rhs: TriState) -> TriState {
        self.or(rhs)
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        TriState::from_bool(value)
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriState::Yes => write!(f, "YES"),
            TriState::No => write!(f, "NO"),
            TriState::Maybe => write!(f, "MAYBE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn tri() -> impl Strategy<Value = TriState> {
        prop_oneof![Just(TriState::Yes), Just(TriState::No), Just(TriState::Maybe)]
    }

    proptest! {
        #[test]
        fn and_is_commutative(a in tri(), b in tri()) {
            prop_assert_eq!(a & b, b & a);
        }

        #[test]
        fn or_is_commutative(a in tri(), b in tri()) {
            prop_assert_eq!(a | b, b | a);
        }

        #[test]
        fn no_absorbs_and_yes_is_and_identity(a in tri()) {
            prop_assert_eq!(a & TriState::No, TriState::No);
            prop_assert_eq!(a & TriState::Yes, a);
        }

        #[test]
        fn yes_absorbs_or_and_no_is_or_identity(a in tri()) {
            prop_assert_eq!(a | TriState::Yes, TriState::Yes);
            prop_assert_eq!(a | TriState::No, a);
        }

        #[test]
        fn negation_is_an_involution(a in tri()) {
            prop_assert_eq!(!!a, a);
        }

        #[test]
        fn lazy_forms_agree_with_eager_forms(a in tri(), b in tri()) {
            prop_assert_eq!(a.and_then(|| b), a.and(b));
            prop_assert_eq!(a.or_else(|| b), a.or(b));
        }
    }

    #[test]
    fn test_maybe_combinations() {
        assert_eq!(TriState::Maybe & TriState::Yes, TriState::Maybe);
        assert_eq!(TriState::Maybe | TriState::No, TriState::Maybe);
        assert_eq!(!TriState::Maybe, TriState::Maybe);
    }

    #[test]
    fn test_short_circuit_skips_second_operand() {
        let calls = Cell::new(0);
        let r = TriState::No.and_then(|| {
            calls.set(calls.get() + 1);
            TriState::Yes
        });
        assert_eq!(r, TriState::No);
        let r = TriState::Yes.or_else(|| {
            calls.set(calls.get() + 1);
            TriState::No
        });
        assert_eq!(r, TriState::Yes);
        assert_eq!(calls.get(), 0);
    }
}
