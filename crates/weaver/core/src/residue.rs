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

//! Residual runtime tests and exposed join point state
//!
//! When static matching answers `Maybe`, [`Test`] is what the backend must
//! evaluate at runtime. [`ExposedState`] records, per advice formal, which
//! runtime value ([`Var`]) it is bound to.

use crate::types::{ResolvedMember, UnresolvedType};
use std::fmt;
use std::sync::Arc;

/// A runtime value available at a join point
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Var {
    This,
    Target,
    Arg(usize),
    ThisAnnotation(UnresolvedType),
    TargetAnnotation(UnresolvedType),
    ArgAnnotation(usize, UnresolvedType),
    /// Annotation on the join point's signature member
    KindedAnnotation(UnresolvedType),
    WithinAnnotation(UnresolvedType),
    WithinCodeAnnotation(UnresolvedType),
    /// Value saved by a cflow entry, read back from its stack field
    CflowStackSlot { field: Arc<ResolvedMember>, index: usize },
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::This => write!(f, "this"),
            Var::Target => write!(f, "target"),
            Var::Arg(i) => write!(f, "arg{}", i),
            Var::ThisAnnotation(t) => write!(f, "@this<{}>", t.name()),
            Var::TargetAnnotation(t) => write!(f, "@target<{}>", t.name()),
            Var::ArgAnnotation(i, t) => write!(f, "@arg{}<{}>", i, t.name()),
            Var::KindedAnnotation(t) => write!(f, "@annotation<{}>", t.name()),
            Var::WithinAnnotation(t) => write!(f, "@within<{}>", t.name()),
            Var::WithinCodeAnnotation(t) => write!(f, "@withincode<{}>", t.name()),
            Var::CflowStackSlot { field, index } => write!(f, "{}[{}]", field.name, index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Test {
    Literal(bool),
    And(Box<Test>, Box<Test>),
    Or(Box<Test>, Box<Test>),
    Not(Box<Test>),
    Instanceof { var: Var, ty: UnresolvedType },
    HasAnnotation { var: Var, annotation: UnresolvedType },
    /// The cflow counter field is non-zero
    CflowCounterIsValid { field: Arc<ResolvedMember> },
    /// The cflow stack field is non-empty
    CflowStackIsValid { field: Arc<ResolvedMember> },
}

impl Test {
    pub const TRUE: Test = Test::Literal(true);
    pub const FALSE: Test = Test::Literal(false);

    pub fn is_true(&self) -> bool {
        *self == Test::TRUE
    }

    pub fn is_false(&self) -> bool {
        *self == Test::FALSE
    }

    /// Conjunction folding literal operands
    pub fn and(left: Test, right: Test) -> Test {
        match (left, right) {
            (Test::Literal(true), other) | (other, Test::Literal(true)) => other,
            (Test::Literal(false), _) | (_, Test::Literal(false)) => Test::FALSE,
            (l, r) => Test::And(Box::new(l), Box::new(r)),
        }
    }

    pub fn or(left: Test, right: Test) -> Test {
        match (left, right) {
            (Test::Literal(false), other) | (other, Test::Literal(false)) => other,
            (Test::Literal(true), _) | (_, Test::Literal(true)) => Test::TRUE,
            (l, r) => Test::Or(Box::new(l), Box::new(r)),
        }
    }

    pub fn not(inner: Test) -> Test {
        match inner {
            Test::Literal(b) => Test::Literal(!b),
            Test::Not(t) => *t,
            other => Test::Not(Box::new(other)),
        }
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Test::Literal(b) => write!(f, "{}", b),
            Test::And(l, r) => write!(f, "({} && {})", l, r),
            Test::Or(l, r) => write!(f, "({} || {})", l, r),
            Test::Not(t) => write!(f, "!{}", t),
            Test::Instanceof { var, ty } => write!(f, "{} instanceof {}", var, ty.name()),
            Test::HasAnnotation { var, annotation } => write!(f, "{} has @{}", var, annotation.name()),
            Test::CflowCounterIsValid { field } | Test::CflowStackIsValid { field } => write!(f, "{}.isValid()", field.name),
        }
    }
}

/// Runtime values bound to each advice formal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposedState {
    vars: Vec<Option<Var>>,
    erroneous: Vec<bool>,
}

impl ExposedState {
    pub fn new(arity: usize) -> Self {
        Self {
            vars: vec![None; arity],
            erroneous: vec![false; arity],
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Bind `formal` to `var`.
    ///
    /// Binding a formal to two different values marks it erroneous.
    /// Panics if `formal` is outside the advice's arity.
    pub fn set(&mut self, formal: usize, var: Var) {
        assert!(formal < self.vars.len(), "formal index {} out of range for exposed state of arity {}", formal, self.vars.len());
        match &self.vars[formal] {
            Some(existing) if *existing != var => self.erroneous[formal] = true,
            _ => self.vars[formal] = Some(var),
        }
    }

    pub fn get(&self, formal: usize) -> Option<&Var> {
        self.vars.get(formal).and_then(Option::as_ref)
    }

    pub fn is_erroneous(&self, formal: usize) -> bool {
        self.erroneous.get(formal).copied().unwrap_or(false)
    }

    pub fn all_bound(&self) -> bool {
        self.vars.iter().all(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_folding() {
        let check = Test::Instanceof { var: Var::Arg(0), ty: UnresolvedType::string() };
        assert_eq!(Test::and(Test::TRUE, check.clone()), check);
        assert!(Test::and(check.clone(), Test::FALSE).is_false());
        assert!(Test::or(check.clone(), Test::TRUE).is_true());
        assert_eq!(Test::not(Test::not(check.clone())), check);
        assert_eq!(Test::and(check.clone(), check.clone()).to_string(), "(arg0 instanceof java.lang.String && arg0 instanceof java.lang.String)");
    }

    #[test]
    fn test_conflicting_bindings_are_erroneous() {
        let mut state = ExposedState::new(2);
        state.set(0, Var::Arg(1));
        state.set(0, Var::Arg(1));
        assert!(!state.is_erroneous(0));
        state.set(0, Var::This);
        assert!(state.is_erroneous(0));
        assert_eq!(state.get(0), Some(&Var::Arg(1)));
        assert!(!state.all_bound());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_formal_panics() {
        ExposedState::new(1).set(3, Var::This);
    }
}
