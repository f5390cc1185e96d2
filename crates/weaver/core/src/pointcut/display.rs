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

use crate::pointcut::{Pointcut, PointcutKind};
use crate::shadow::ShadowKind;
use std::fmt;

impl fmt::Display for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl fmt::Display for PointcutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointcutKind::Kinded { kind: ShadowKind::AdviceExecution, .. } => write!(f, "adviceexecution()"),
            PointcutKind::Kinded { kind, signature } => write!(f, "{}({})", kind.keyword(), signature),
            PointcutKind::Within(p) => write!(f, "within({})", p),
            PointcutKind::WithinCode(s) => write!(f, "withincode({})", s),
            PointcutKind::Handler(p) => write!(f, "handler({})", p),
            PointcutKind::Args(list) => write!(f, "args({})", list),
            PointcutKind::ArgsAnnotation(list) => write!(f, "@args({})", list),
            PointcutKind::ThisOrTarget { is_this, pattern } => write!(f, "{}({})", if *is_this { "this" } else { "target" }, pattern),
            PointcutKind::ThisOrTargetAnnotation { is_this, pattern } => write!(f, "{}({})", if *is_this { "@this" } else { "@target" }, pattern),
            PointcutKind::WithinAnnotation(p) => write!(f, "@within({})", p),
            PointcutKind::WithinCodeAnnotation(p) => write!(f, "@withincode({})", p),
            PointcutKind::Annotation(p) => write!(f, "@annotation({})", p),
            PointcutKind::Cflow { entry, below, .. } => write!(f, "{}({})", if *below { "cflowbelow" } else { "cflow" }, entry),
            PointcutKind::ConcreteCflow { field, .. } => write!(f, "concretecflow({})", field.name),
            PointcutKind::Reference { on_type, name, arguments } => {
                if let Some(t) = on_type {
                    write!(f, "{}.", t.name())?;
                }
                write!(f, "{}({})", name, arguments)
            }
            PointcutKind::And(l, r) => write!(f, "({} && {})", l, r),
            PointcutKind::Or(l, r) => write!(f, "({} || {})", l, r),
            PointcutKind::Not(p) => write!(f, "!{}", p),
            PointcutKind::Nothing => write!(f, "<nothing>"),
        }
    }
}
