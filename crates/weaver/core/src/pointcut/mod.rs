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

//! The pointcut expression tree
//!
//! A pointcut moves through three states. Parsing yields a `Symbolic`
//! tree whose names are plain text. [`Pointcut::resolve`] looks the names
//! up in a scope and produces a `Resolved` tree. [`Pointcut::concretize`]
//! specializes a resolved tree for one advice in one concrete aspect and
//! produces a `Concrete` tree. Each step returns a new tree and leaves its
//! input untouched.
//!
//! Concrete trees answer the three matching questions: [`Pointcut::fast_match`]
//! (per type), [`Pointcut::match_shadow`] (per join point) and
//! [`Pointcut::find_residue`] (the runtime test left over).

pub mod concretize;
pub mod definition;
mod display;
mod matching;
mod residue;
mod resolve;

pub use definition::PointcutDefinition;

use crate::patterns::{AnnotationPatternList, AnnotationTypePattern, SignaturePattern, TypePattern, TypePatternList};
use crate::shadow::ShadowKind;
use crate::types::{ResolvedMember, UnresolvedType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use weaver_common::{Persistent, SourceLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointcutState {
    Symbolic,
    Resolved,
    Concrete,
}

/// Advice formal fed from a cflow stack frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CflowSlot {
    pub formal: usize,
    pub stack_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointcutKind {
    /// `call`, `execution`, `get`, `set`, the initializations and `adviceexecution`
    Kinded { kind: ShadowKind, signature: SignaturePattern },
    Within(TypePattern),
    WithinCode(SignaturePattern),
    Handler(TypePattern),
    Args(TypePatternList),
    ArgsAnnotation(AnnotationPatternList),
    ThisOrTarget { is_this: bool, pattern: TypePattern },
    ThisOrTargetAnnotation { is_this: bool, pattern: AnnotationTypePattern },
    WithinAnnotation(AnnotationTypePattern),
    WithinCodeAnnotation(AnnotationTypePattern),
    Annotation(AnnotationTypePattern),
    /// `free_vars` are the formals bound inside `entry`, filled in on resolution
    Cflow { entry: Box<Pointcut>, below: bool, free_vars: Vec<usize> },
    /// Cflow after concretization: a test of the state field kept by the entry advice
    ConcreteCflow { field: Arc<ResolvedMember>, slots: Vec<CflowSlot>, uses_counter: bool },
    /// A named pointcut, optionally qualified by its declaring type
    Reference { on_type: Option<UnresolvedType>, name: String, arguments: TypePatternList },
    And(Box<Pointcut>, Box<Pointcut>),
    Or(Box<Pointcut>, Box<Pointcut>),
    Not(Box<Pointcut>),
    /// Matches nothing; also the result of a failed resolution
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointcut {
    pub kind: PointcutKind,
    pub state: PointcutState,
    pub location: Option<SourceLocation>,
}

impl Pointcut {
    pub fn new(kind: PointcutKind) -> Self {
        Self {
            kind,
            state: PointcutState::Symbolic,
            location: None,
        }
    }

    pub fn nothing() -> Self {
        Self::new(PointcutKind::Nothing)
    }

    pub fn and(left: Pointcut, right: Pointcut) -> Self {
        Self::new(PointcutKind::And(Box::new(left), Box::new(right)))
    }

    pub fn or(left: Pointcut, right: Pointcut) -> Self {
        Self::new(PointcutKind::Or(Box::new(left), Box::new(right)))
    }

    pub fn not(inner: Pointcut) -> Self {
        Self::new(PointcutKind::Not(Box::new(inner)))
    }

    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    pub(crate) fn in_state(kind: PointcutKind, state: PointcutState, location: Option<SourceLocation>) -> Self {
        Self { kind, state, location }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self.kind, PointcutKind::Nothing)
    }

    pub fn is_concrete(&self) -> bool {
        self.state == PointcutState::Concrete
    }
}

impl Persistent for Pointcut {
    const FAMILY: u8 = 1;

    fn kind_tag(&self) -> u8 {
        match &self.kind {
            PointcutKind::Kinded { .. } => 1,
            PointcutKind::Within(_) => 2,
            PointcutKind::WithinCode(_) => 3,
            PointcutKind::Handler(_) => 4,
            PointcutKind::Args(_) => 5,
            PointcutKind::ArgsAnnotation(_) => 6,
            PointcutKind::ThisOrTarget { .. } => 7,
            PointcutKind::ThisOrTargetAnnotation { .. } => 8,
            PointcutKind::WithinAnnotation(_) => 9,
            PointcutKind::WithinCodeAnnotation(_) => 10,
            PointcutKind::Annotation(_) => 11,
            PointcutKind::Cflow { .. } => 12,
            PointcutKind::ConcreteCflow { .. } => 13,
            PointcutKind::Reference { .. } => 14,
            PointcutKind::And(..) => 15,
            PointcutKind::Or(..) => 16,
            PointcutKind::Not(_) => 17,
            PointcutKind::Nothing => 18,
        }
    }
}
