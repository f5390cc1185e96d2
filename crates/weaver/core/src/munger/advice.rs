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

use crate::binding::Formal;
use crate::pointcut::Pointcut;
use crate::types::{ResolvedMember, UnresolvedType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use weaver_common::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdviceKind {
    Before,
    After,
    AfterReturning,
    AfterThrowing,
    Around,
    /// Maintains a cflow counter or stack around the entry join points
    CflowEntry,
    CflowBelowEntry,
    /// Binds an aspect instance at the entry of a `perthis`/`pertarget` aspect
    PerObjectEntry,
    PerCflowEntry,
    PerCflowBelowEntry,
    /// Wraps checked exceptions named by `declare soft`
    Softener,
}

impl AdviceKind {
    /// Kinds created by the engine rather than written by the user
    pub fn is_synthetic(self) -> bool {
        !matches!(self, AdviceKind::Before | AdviceKind::After | AdviceKind::AfterReturning | AdviceKind::AfterThrowing | AdviceKind::Around)
    }

    pub fn is_cflow_entry(self) -> bool {
        matches!(self, AdviceKind::CflowEntry | AdviceKind::CflowBelowEntry)
    }
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AdviceKind::Before => "before",
            AdviceKind::After => "after",
            AdviceKind::AfterReturning => "afterReturning",
            AdviceKind::AfterThrowing => "afterThrowing",
            AdviceKind::Around => "around",
            AdviceKind::CflowEntry => "cflowEntry",
            AdviceKind::CflowBelowEntry => "cflowBelowEntry",
            AdviceKind::PerObjectEntry => "perObjectEntry",
            AdviceKind::PerCflowEntry => "perCflowEntry",
            AdviceKind::PerCflowBelowEntry => "perCflowBelowEntry",
            AdviceKind::Softener => "softener",
        };
        write!(f, "{}", text)
    }
}

/// A piece of advice: what runs where.
///
/// `arity` is the number of values the advice receives; for user advice it
/// equals the number of formals, synthetic entry advice has no names for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    pub kind: AdviceKind,
    pub pointcut: Pointcut,
    pub formals: Vec<Formal>,
    pub arity: usize,
    pub declaring_type: UnresolvedType,
    /// Set once the advice has been concretized for an aspect
    pub concrete_aspect: Option<UnresolvedType>,
    pub location: Option<SourceLocation>,
    /// State field maintained by a cflow entry advice
    pub cflow_field: Option<Arc<ResolvedMember>>,
    /// Exception type softened by a softener
    pub exception: Option<UnresolvedType>,
}

impl Advice {
    pub fn new(kind: AdviceKind, declaring_type: UnresolvedType, pointcut: Pointcut) -> Self {
        Self {
            kind,
            pointcut,
            formals: Vec::new(),
            arity: 0,
            declaring_type,
            concrete_aspect: None,
            location: None,
            cflow_field: None,
            exception: None,
        }
    }

    pub fn with_formals(mut self, formals: Vec<Formal>) -> Self {
        self.arity = formals.len();
        self.formals = formals;
        self
    }

    pub fn with_formal(mut self, name: &str, type_name: &str) -> Self {
        self.formals.push(Formal::named(name, type_name));
        self.arity = self.formals.len();
        self
    }

    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    pub fn with_cflow_field(mut self, field: Option<Arc<ResolvedMember>>) -> Self {
        self.cflow_field = field;
        self
    }

    pub fn softening(mut self, exception: UnresolvedType) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }
}
