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

//! Members (methods, constructors, fields, ...) and their modifiers

use crate::types::annotation::AnnotationAj;
use crate::types::unresolved::UnresolvedType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Access and property flags, using the class-file bit layout
pub mod modifiers {
    pub const PUBLIC: u32 = 0x0001;
    pub const PRIVATE: u32 = 0x0002;
    pub const PROTECTED: u32 = 0x0004;
    pub const STATIC: u32 = 0x0008;
    pub const FINAL: u32 = 0x0010;
    pub const SYNCHRONIZED: u32 = 0x0020;
    pub const VOLATILE: u32 = 0x0040;
    pub const TRANSIENT: u32 = 0x0080;
    pub const NATIVE: u32 = 0x0100;
    pub const INTERFACE: u32 = 0x0200;
    pub const ABSTRACT: u32 = 0x0400;
    pub const STRICT: u32 = 0x0800;
    pub const SYNTHETIC: u32 = 0x1000;

    /// Keyword to flag, for pattern parsing
    pub fn from_keyword(word: &str) -> Option<u32> {
        Some(match word {
            "public" => PUBLIC,
            "private" => PRIVATE,
            "protected" => PROTECTED,
            "static" => STATIC,
            "final" => FINAL,
            "synchronized" => SYNCHRONIZED,
            "volatile" => VOLATILE,
            "transient" => TRANSIENT,
            "native" => NATIVE,
            "abstract" => ABSTRACT,
            "strictfp" => STRICT,
            _ => return None,
        })
    }

    /// Render flags as keywords in canonical order
    pub fn to_keywords(flags: u32) -> Vec<&'static str> {
        const ORDER: [(u32, &str); 11] = [
            (PUBLIC, "public"),
            (PROTECTED, "protected"),
            (PRIVATE, "private"),
            (ABSTRACT, "abstract"),
            (STATIC, "static"),
            (FINAL, "final"),
            (TRANSIENT, "transient"),
            (VOLATILE, "volatile"),
            (SYNCHRONIZED, "synchronized"),
            (NATIVE, "native"),
            (STRICT, "strictfp"),
        ];
        ORDER.iter().filter(|(f, _)| flags & f != 0).map(|(_, k)| *k).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Method,
    Constructor,
    Field,
    StaticInitialization,
    Handler,
    Advice,
}

/// A type variable declared by a generic type or method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeVariable {
    pub name: String,
    pub upper_bound: UnresolvedType,
    pub interface_bounds: Vec<UnresolvedType>,
}

impl TypeVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            upper_bound: UnresolvedType::object(),
            interface_bounds: Vec::new(),
        }
    }

    pub fn bounded_by(name: impl Into<String>, upper_bound: UnresolvedType) -> Self {
        Self {
            name: name.into(),
            upper_bound,
            interface_bounds: Vec::new(),
        }
    }
}

/// A member with all information needed for matching
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedMember {
    pub kind: MemberKind,
    pub declaring_type: UnresolvedType,
    pub modifiers: u32,
    pub return_type: UnresolvedType,
    pub name: String,
    pub parameter_types: Vec<UnresolvedType>,
    pub exceptions: Vec<UnresolvedType>,
    pub annotations: Vec<AnnotationAj>,
    pub parameter_annotations: Vec<Vec<AnnotationAj>>,
    pub type_variables: Vec<TypeVariable>,
    /// Declared default of an annotation element
    pub default_value: Option<String>,
    pub varargs: bool,
}

impl ResolvedMember {
    pub fn new(kind: MemberKind, declaring_type: UnresolvedType, modifiers: u32, return_type: UnresolvedType, name: impl Into<String>, parameter_types: Vec<UnresolvedType>) -> Self {
        Self {
            kind,
            declaring_type,
            modifiers,
            return_type,
            name: name.into(),
            parameter_types,
            exceptions: Vec::new(),
            annotations: Vec::new(),
            parameter_annotations: Vec::new(),
            type_variables: Vec::new(),
            default_value: None,
            varargs: false,
        }
    }

    pub fn method(declaring_type: UnresolvedType, modifiers: u32, return_type: UnresolvedType, name: impl Into<String>, parameter_types: Vec<UnresolvedType>) -> Self {
        Self::new(MemberKind::Method, declaring_type, modifiers, return_type, name, parameter_types)
    }

    pub fn constructor(declaring_type: UnresolvedType, modifiers: u32, parameter_types: Vec<UnresolvedType>) -> Self {
        Self::new(MemberKind::Constructor, declaring_type, modifiers, UnresolvedType::void(), "<init>", parameter_types)
    }

    pub fn field(declaring_type: UnresolvedType, modifiers: u32, field_type: UnresolvedType, name: impl Into<String>) -> Self {
        Self::new(MemberKind::Field, declaring_type, modifiers, field_type, name, Vec::new())
    }

    pub fn static_initializer(declaring_type: UnresolvedType) -> Self {
        Self::new(MemberKind::StaticInitialization, declaring_type, modifiers::STATIC, UnresolvedType::void(), "<clinit>", Vec::new())
    }

    /// Signature of an exception handler catching `exception_type`
    pub fn handler(enclosing_type: UnresolvedType, exception_type: UnresolvedType) -> Self {
        Self::new(MemberKind::Handler, enclosing_type, modifiers::STATIC, UnresolvedType::void(), "<catch>", vec![exception_type])
    }

    pub fn with_annotations(mut self, annotations: Vec<AnnotationAj>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_parameter_annotations(mut self, annotations: Vec<Vec<AnnotationAj>>) -> Self {
        self.parameter_annotations = annotations;
        self
    }

    pub fn with_exceptions(mut self, exceptions: Vec<UnresolvedType>) -> Self {
        self.exceptions = exceptions;
        self
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_type_variables(mut self, type_variables: Vec<TypeVariable>) -> Self {
        self.type_variables = type_variables;
        self
    }

    pub fn with_varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    pub fn is_static(&self) -> bool {
        self.modifiers & modifiers::STATIC != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers & modifiers::ABSTRACT != 0
    }

    pub fn is_private(&self) -> bool {
        self.modifiers & modifiers::PRIVATE != 0
    }

    /// Erased descriptor, e.g. `(Ljava/lang/String;)V`
    pub fn signature(&self) -> String {
        let params: String = self.parameter_types.iter().map(|p| p.erasure_signature()).collect();
        format!("({}){}", params, self.return_type.erasure_signature())
    }

    /// Same name and erased parameter list; used to find overridden declarations
    pub fn same_name_and_parameters(&self, other: &ResolvedMember) -> bool {
        self.name == other.name
            && self.parameter_types.len() == other.parameter_types.len()
            && self.parameter_types.iter().zip(&other.parameter_types).all(|(a, b)| a.erasure_signature() == b.erasure_signature())
    }

    pub fn has_annotation(&self, annotation_type: &UnresolvedType) -> bool {
        self.annotations.iter().any(|a| a.is_of_type(annotation_type))
    }

    /// Copy with type variables replaced and re-homed onto `declaring_type`
    pub fn parameterized(&self, declaring_type: UnresolvedType, bindings: &HashMap<String, UnresolvedType>) -> ResolvedMember {
        let mut copy = self.clone();
        copy.declaring_type = declaring_type;
        copy.return_type = self.return_type.substitute(bindings);
        copy.parameter_types = self.parameter_types.iter().map(|p| p.substitute(bindings)).collect();
        copy.exceptions = self.exceptions.iter().map(|e| e.substitute(bindings)).collect();
        copy
    }

    fn parameter_list(&self) -> String {
        let names: Vec<String> = self.parameter_types.iter().map(UnresolvedType::name).collect();
        names.join(", ")
    }
}

impl fmt::Display for ResolvedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MemberKind::Field => write!(f, "{} {}.{}", self.return_type, self.declaring_type, self.name),
            MemberKind::Constructor => write!(f, "{}({})", self.declaring_type, self.parameter_list()),
            MemberKind::StaticInitialization => write!(f, "{}.<clinit>", self.declaring_type),
            MemberKind::Handler => write!(f, "handler({})", self.parameter_list()),
            MemberKind::Method | MemberKind::Advice => write!(f, "{} {}.{}({})", self.return_type, self.declaring_type, self.name, self.parameter_list()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_signature() {
        let m = ResolvedMember::method(UnresolvedType::for_name("com.acme.Foo"), modifiers::PUBLIC, UnresolvedType::void(), "bar", vec![UnresolvedType::string(), UnresolvedType::int()]);
        assert_eq!(m.to_string(), "void com.acme.Foo.bar(java.lang.String, int)");
        assert_eq!(m.signature(), "(Ljava/lang/String;I)V");

        let f = ResolvedMember::field(UnresolvedType::for_name("com.acme.Foo"), 0, UnresolvedType::int(), "count");
        assert_eq!(f.to_string(), "int com.acme.Foo.count");
    }

    #[test]
    fn test_parameterization_substitutes_type_variables() {
        let get = ResolvedMember::method(UnresolvedType::for_name("java.util.List"), modifiers::PUBLIC | modifiers::ABSTRACT, UnresolvedType::type_variable("E"), "get", vec![UnresolvedType::int()]);
        let mut bindings = HashMap::new();
        bindings.insert("E".to_string(), UnresolvedType::string());
        let owner = UnresolvedType::for_name("java.util.List<java.lang.String>");
        let p = get.parameterized(owner.clone(), &bindings);
        assert_eq!(p.return_type, UnresolvedType::string());
        assert_eq!(p.declaring_type, owner);
        assert!(p.same_name_and_parameters(&get));
    }

    #[test]
    fn test_modifier_keywords() {
        let flags = modifiers::from_keyword("public").unwrap() | modifiers::from_keyword("static").unwrap();
        assert_eq!(modifiers::to_keywords(flags), vec!["public", "static"]);
        assert_eq!(modifiers::from_keyword("sealed"), None);
    }
}
