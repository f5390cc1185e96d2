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

//! Named pointcut declarations

use crate::binding::{Formal, SimpleScope};
use crate::patterns::{ParseError, parse_pointcut};
use crate::pointcut::Pointcut;
use crate::types::{UnresolvedType, modifiers};
use serde::{Deserialize, Serialize};

/// `pointcut name(T1 a, T2 b): body;` declared in `declaring_type`.
///
/// The body may be stored symbolic; it is resolved against [`Self::scope`]
/// the first time a reference to it is concretized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointcutDefinition {
    pub declaring_type: UnresolvedType,
    pub modifiers: u32,
    pub name: String,
    pub parameter_names: Vec<String>,
    pub parameter_types: Vec<UnresolvedType>,
    pub pointcut: Pointcut,
}

impl PointcutDefinition {
    pub fn new(declaring_type: UnresolvedType, name: impl Into<String>, pointcut: Pointcut) -> Self {
        Self {
            declaring_type,
            modifiers: modifiers::PUBLIC,
            name: name.into(),
            parameter_names: Vec::new(),
            parameter_types: Vec::new(),
            pointcut,
        }
    }

    /// Parse `body` as the definition's pointcut
    pub fn parse(declaring_type: &str, name: &str, parameters: &[(&str, &str)], body: &str) -> Result<Self, ParseError> {
        let pointcut = parse_pointcut(body)?;
        let definition = parameters
            .iter()
            .fold(Self::new(UnresolvedType::for_name(declaring_type), name, pointcut), |d, (param, ty)| d.with_parameter(param, ty));
        Ok(definition)
    }

    /// An abstract pointcut, made concrete by a sub-aspect
    pub fn abstract_pointcut(declaring_type: UnresolvedType, name: impl Into<String>) -> Self {
        Self::new(declaring_type, name, Pointcut::nothing()).with_modifiers(modifiers::PUBLIC | modifiers::ABSTRACT)
    }

    pub fn with_parameter(mut self, name: &str, type_name: &str) -> Self {
        self.parameter_names.push(name.to_string());
        self.parameter_types.push(UnresolvedType::for_name(type_name));
        self
    }

    pub fn with_modifiers(mut self, flags: u32) -> Self {
        self.modifiers = flags;
        self
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers & modifiers::ABSTRACT != 0
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    /// Scope the body is resolved in: its parameters, seen from the declaring type
    pub fn scope(&self) -> SimpleScope {
        let formals = self.parameter_names.iter().zip(&self.parameter_types).map(|(n, t)| Formal::new(n.clone(), t.clone())).collect();
        SimpleScope::for_type(self.declaring_type.clone()).with_formals(formals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Scope;
    use crate::pointcut::{PointcutKind, PointcutState};

    #[test]
    fn test_parse_definition() {
        let def = PointcutDefinition::parse("com.acme.Tracing", "traced", &[("s", "String")], "call(* *(..)) && args(s)").unwrap();
        assert_eq!(def.arity(), 1);
        assert!(!def.is_abstract());
        assert_eq!(def.pointcut.state, PointcutState::Symbolic);
        assert!(matches!(def.pointcut.kind, PointcutKind::And(..)));
        let scope = def.scope();
        assert_eq!(scope.lookup_formal("s").map(|(i, _)| i), Some(0));
        assert!(scope.import_prefixes().contains(&"com.acme.".to_string()));
    }

    #[test]
    fn test_abstract_definition() {
        let def = PointcutDefinition::abstract_pointcut(UnresolvedType::for_name("com.acme.Base"), "scope");
        assert!(def.is_abstract());
        assert!(def.pointcut.is_nothing());
    }

    #[test]
    fn test_parse_error_surfaces() {
        assert!(PointcutDefinition::parse("A", "p", &[], "call(").is_err());
    }
}
