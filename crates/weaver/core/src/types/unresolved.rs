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

//! Unresolved type references identified by their signature string
//!
//! Signature grammar:
//!
//! | form | meaning |
//! |---|---|
//! | `Z B C S I J F D V` | primitives |
//! | `Lpkg/Name;` | simple or raw reference type |
//! | `Gpkg/Name;` | generic view of a generic type |
//! | `Ppkg/Name<args>;` | parameterized type (`L..<..>;` is accepted) |
//! | `[X` | array of `X` |
//! | `TT;` | type variable reference |
//! | `*`, `+X`, `-X` | wildcards |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Structural kind of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Primitive,
    Simple,
    Array,
    Generic,
    Raw,
    Parameterized,
    TypeVariableReference,
    Wildcard,
    Missing,
}

/// Bound of a wildcard type argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WildcardBound {
    Unbounded,
    Extends,
    Super,
}

const PRIMITIVES: [(char, &str); 9] = [
    ('Z', "boolean"),
    ('B', "byte"),
    ('C', "char"),
    ('S', "short"),
    ('I', "int"),
    ('J', "long"),
    ('F', "float"),
    ('D', "double"),
    ('V', "void"),
];

/// A reference to a type that has not (necessarily) been resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnresolvedType {
    signature: String,
    kind: TypeKind,
    /// Type arguments, array component, or wildcard bound depending on kind
    parameters: Vec<UnresolvedType>,
    bound: WildcardBound,
}

impl UnresolvedType {
    fn make(signature: String, kind: TypeKind, parameters: Vec<UnresolvedType>) -> Self {
        Self {
            signature,
            kind,
            parameters,
            bound: WildcardBound::Unbounded,
        }
    }

    pub fn object() -> Self {
        Self::for_signature("Ljava/lang/Object;")
    }

    pub fn string() -> Self {
        Self::for_signature("Ljava/lang/String;")
    }

    pub fn void() -> Self {
        Self::for_signature("V")
    }

    pub fn boolean() -> Self {
        Self::for_signature("Z")
    }

    pub fn int() -> Self {
        Self::for_signature("I")
    }

    /// Placeholder for a type whose name is known but which cannot be found
    pub fn missing(name: &str) -> Self {
        Self::make(format!("L{};", name.replace('.', "/")), TypeKind::Missing, Vec::new())
    }

    /// Parse a signature; malformed input yields a `Missing` type carrying the text
    pub fn for_signature(signature: &str) -> Self {
        Self::try_for_signature(signature).unwrap_or_else(|| Self::make(signature.to_string(), TypeKind::Missing, Vec::new()))
    }

    pub fn try_for_signature(signature: &str) -> Option<Self> {
        let (ty, rest) = parse_signature(signature)?;
        if rest.is_empty() { Some(ty) } else { None }
    }

    /// Build from a source-level name such as `java.util.List<java.lang.String>[]`
    pub fn for_name(name: &str) -> Self {
        let name = name.trim();
        if let Some(elem) = name.strip_suffix("[]") {
            return Self::for_name(elem).make_array(1);
        }
        if let Some(elem) = name.strip_suffix("...") {
            return Self::for_name(elem).make_array(1);
        }
        if name == "?" {
            return Self::wildcard(WildcardBound::Unbounded, None);
        }
        if let Some(rest) = name.strip_prefix("? extends ") {
            return Self::wildcard(WildcardBound::Extends, Some(Self::for_name(rest)));
        }
        if let Some(rest) = name.strip_prefix("? super ") {
            return Self::wildcard(WildcardBound::Super, Some(Self::for_name(rest)));
        }
        if let Some((c, _)) = PRIMITIVES.iter().find(|(_, n)| *n == name) {
            return Self::make(c.to_string(), TypeKind::Primitive, Vec::new());
        }
        if let Some(open) = name.find('<') {
            if name.ends_with('>') {
                let base = &name[..open];
                let args = split_top_level(&name[open + 1..name.len() - 1]).into_iter().map(Self::for_name).collect();
                return Self::parameterized(base, args);
            }
        }
        Self::make(format!("L{};", name.replace('.', "/")), TypeKind::Simple, Vec::new())
    }

    /// A parameterized type `base<args>`; `base` is a dotted name
    pub fn parameterized(base: &str, args: Vec<UnresolvedType>) -> Self {
        if args.is_empty() {
            return Self::for_name(base);
        }
        let mut sig = format!("P{}<", base.replace('.', "/"));
        for a in &args {
            sig.push_str(&a.signature);
        }
        sig.push_str(">;");
        Self::make(sig, TypeKind::Parameterized, args)
    }

    /// Generic view of the type named `base`
    pub fn generic(base: &str) -> Self {
        Self::make(format!("G{};", base.replace('.', "/")), TypeKind::Generic, Vec::new())
    }

    pub fn type_variable(name: &str) -> Self {
        Self::make(format!("T{};", name), TypeKind::TypeVariableReference, Vec::new())
    }

    pub fn wildcard(bound: WildcardBound, upper: Option<UnresolvedType>) -> Self {
        match (bound, upper) {
            (WildcardBound::Extends, Some(b)) => Self {
                signature: format!("+{}", b.signature),
                kind: TypeKind::Wildcard,
                parameters: vec![b],
                bound,
            },
            (WildcardBound::Super, Some(b)) => Self {
                signature: format!("-{}", b.signature),
                kind: TypeKind::Wildcard,
                parameters: vec![b],
                bound,
            },
            _ => Self::make("*".to_string(), TypeKind::Wildcard, Vec::new()),
        }
    }

    pub fn make_array(&self, dims: u32) -> Self {
        let mut ty = self.clone();
        for _ in 0..dims {
            ty = Self::make(format!("[{}", ty.signature), TypeKind::Array, vec![ty]);
        }
        ty
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    pub fn is_void(&self) -> bool {
        self.signature == "V"
    }

    pub fn is_array(&self) -> bool {
        self.kind == TypeKind::Array
    }

    pub fn is_parameterized(&self) -> bool {
        self.kind == TypeKind::Parameterized
    }

    pub fn is_generic(&self) -> bool {
        self.kind == TypeKind::Generic
    }

    pub fn is_type_variable(&self) -> bool {
        self.kind == TypeKind::TypeVariableReference
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind == TypeKind::Wildcard
    }

    pub fn is_missing(&self) -> bool {
        self.kind == TypeKind::Missing
    }

    pub fn is_object(&self) -> bool {
        self.signature == "Ljava/lang/Object;"
    }

    /// Reference types whose identity is a plain class name
    pub fn is_reference_name(&self) -> bool {
        matches!(self.kind, TypeKind::Simple | TypeKind::Raw | TypeKind::Generic | TypeKind::Parameterized)
    }

    pub fn component_type(&self) -> Option<&UnresolvedType> {
        if self.is_array() { self.parameters.first() } else { None }
    }

    /// Innermost non-array component and the number of dimensions
    pub fn element_type(&self) -> (&UnresolvedType, u32) {
        let mut ty = self;
        let mut dims = 0;
        while let Some(c) = ty.component_type() {
            ty = c;
            dims += 1;
        }
        (ty, dims)
    }

    pub fn type_parameters(&self) -> &[UnresolvedType] {
        if self.is_parameterized() { &self.parameters } else { &[] }
    }

    pub fn wildcard_bound(&self) -> (WildcardBound, Option<&UnresolvedType>) {
        if self.is_wildcard() { (self.bound, self.parameters.first()) } else { (WildcardBound::Unbounded, None) }
    }

    /// Whether resolving this type depends on a calling context
    pub fn mentions_type_variables(&self) -> bool {
        self.is_type_variable() || self.parameters.iter().any(UnresolvedType::mentions_type_variables)
    }

    /// Dotted base name with generics and arrays stripped, e.g. `java.util.List`
    pub fn base_name(&self) -> String {
        match self.kind {
            TypeKind::Primitive => primitive_name(&self.signature).to_string(),
            TypeKind::Array => self.parameters[0].base_name(),
            TypeKind::TypeVariableReference => self.signature[1..self.signature.len() - 1].to_string(),
            TypeKind::Wildcard => "?".to_string(),
            TypeKind::Missing if !(self.signature.len() > 2 && self.signature.starts_with('L') && self.signature.ends_with(';')) => self.signature.clone(),
            _ => {
                let body = &self.signature[1..self.signature.len() - 1];
                let body = body.split('<').next().unwrap_or(body);
                body.replace('/', ".")
            }
        }
    }

    /// Source-level rendering, e.g. `java.util.Map<java.lang.String, int[]>`
    pub fn name(&self) -> String {
        match self.kind {
            TypeKind::Array => format!("{}[]", self.parameters[0].name()),
            TypeKind::Parameterized => {
                let args: Vec<String> = self.parameters.iter().map(UnresolvedType::name).collect();
                format!("{}<{}>", self.base_name(), args.join(", "))
            }
            TypeKind::Wildcard => match (self.bound, self.parameters.first()) {
                (WildcardBound::Extends, Some(b)) => format!("? extends {}", b.name()),
                (WildcardBound::Super, Some(b)) => format!("? super {}", b.name()),
                _ => "?".to_string(),
            },
            _ => self.base_name(),
        }
    }

    pub fn simple_name(&self) -> String {
        let base = self.base_name();
        base.rsplit(['.', '$']).next().unwrap_or(&base).to_string()
    }

    pub fn package_name(&self) -> Option<String> {
        let base = self.base_name();
        base.rfind('.').map(|i| base[..i].to_string())
    }

    /// Signature of the erasure
    pub fn erasure_signature(&self) -> String {
        match self.kind {
            TypeKind::Array => format!("[{}", self.parameters[0].erasure_signature()),
            TypeKind::Parameterized | TypeKind::Generic | TypeKind::Raw | TypeKind::Missing => format!("L{};", self.base_name().replace('.', "/")),
            TypeKind::TypeVariableReference => "Ljava/lang/Object;".to_string(),
            TypeKind::Wildcard => match (self.bound, self.parameters.first()) {
                (WildcardBound::Extends, Some(b)) => b.erasure_signature(),
                _ => "Ljava/lang/Object;".to_string(),
            },
            _ => self.signature.clone(),
        }
    }

    pub fn erasure(&self) -> UnresolvedType {
        if matches!(self.kind, TypeKind::Simple | TypeKind::Primitive) {
            return self.clone();
        }
        Self::for_signature(&self.erasure_signature())
    }

    /// Signature of the generic view of this type's erasure
    pub fn generic_signature(&self) -> String {
        format!("G{};", self.base_name().replace('.', "/"))
    }

    /// Reinterpret simple names that match one of `variables` as type variable references.
    ///
    /// Source-level names cannot tell `List<E>` (a variable) from `List<Foo>`
    /// (a class), so declarations re-bind them once the variables are known.
    pub fn bind_type_variables(&self, variables: &[String]) -> UnresolvedType {
        match self.kind {
            TypeKind::Simple if variables.iter().any(|v| *v == self.base_name()) => Self::type_variable(&self.base_name()),
            TypeKind::Array => self.parameters[0].bind_type_variables(variables).make_array(1),
            TypeKind::Parameterized => Self::parameterized(&self.base_name(), self.parameters.iter().map(|p| p.bind_type_variables(variables)).collect()),
            TypeKind::Wildcard => Self::wildcard(self.bound, self.parameters.first().map(|b| b.bind_type_variables(variables))),
            _ => self.clone(),
        }
    }

    /// Replace type variable references by the types bound in `bindings`
    pub fn substitute(&self, bindings: &HashMap<String, UnresolvedType>) -> UnresolvedType {
        match self.kind {
            TypeKind::TypeVariableReference => bindings.get(&self.base_name()).cloned().unwrap_or_else(|| self.clone()),
            TypeKind::Array => self.parameters[0].substitute(bindings).make_array(1),
            TypeKind::Parameterized => Self::parameterized(&self.base_name(), self.parameters.iter().map(|p| p.substitute(bindings)).collect()),
            TypeKind::Wildcard => Self::wildcard(self.bound, self.parameters.first().map(|b| b.substitute(bindings))),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for UnresolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn primitive_name(sig: &str) -> &'static str {
    PRIMITIVES.iter().find(|(c, _)| sig.starts_with(*c)).map(|(_, n)| *n).unwrap_or("?")
}

/// Split `a, b<c, d>, e` at top-level commas
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

fn parse_signature(sig: &str) -> Option<(UnresolvedType, &str)> {
    let first = sig.chars().next()?;
    let rest = &sig[first.len_utf8()..];
    match first {
        c if PRIMITIVES.iter().any(|(p, _)| *p == c) => Some((UnresolvedType::make(c.to_string(), TypeKind::Primitive, Vec::new()), rest)),
        '[' => {
            let (component, rest) = parse_signature(rest)?;
            Some((component.make_array(1), rest))
        }
        '*' => Some((UnresolvedType::wildcard(WildcardBound::Unbounded, None), rest)),
        '+' | '-' => {
            let (b, rest) = parse_signature(rest)?;
            let bound = if first == '+' { WildcardBound::Extends } else { WildcardBound::Super };
            Some((UnresolvedType::wildcard(bound, Some(b)), rest))
        }
        'T' => {
            let end = rest.find(';')?;
            let name = &rest[..end];
            if name.is_empty() {
                return None;
            }
            Some((UnresolvedType::type_variable(name), &rest[end + 1..]))
        }
        'G' => {
            let end = rest.find(';')?;
            let base = &rest[..end];
            if base.is_empty() || base.contains('<') {
                return None;
            }
            Some((UnresolvedType::generic(&base.replace('/', ".")), &rest[end + 1..]))
        }
        'L' | 'P' => {
            let mut depth = 0usize;
            let mut base_end = None;
            for (i, ch) in rest.char_indices() {
                match ch {
                    '<' => {
                        if depth == 0 && base_end.is_none() {
                            base_end = Some(i);
                        }
                        depth += 1;
                    }
                    '>' => depth = depth.checked_sub(1)?,
                    ';' if depth == 0 => {
                        let body = &rest[..i];
                        let remaining = &rest[i + 1..];
                        return match base_end {
                            None if !body.is_empty() => Some((UnresolvedType::make(format!("L{};", body), TypeKind::Simple, Vec::new()), remaining)),
                            None => None,
                            Some(b) => {
                                let base = &body[..b];
                                let mut args_sig = body[b + 1..].strip_suffix('>')?;
                                let mut args = Vec::new();
                                while !args_sig.is_empty() {
                                    let (arg, r) = parse_signature(args_sig)?;
                                    args.push(arg);
                                    args_sig = r;
                                }
                                if base.is_empty() || args.is_empty() {
                                    return None;
                                }
                                Some((UnresolvedType::parameterized(&base.replace('/', "."), args), remaining))
                            }
                        };
                    }
                    _ => {}
                }
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_and_array_signatures() {
        let int_array = UnresolvedType::for_signature("[[I");
        assert_eq!(int_array.kind(), TypeKind::Array);
        assert_eq!(int_array.name(), "int[][]");
        let (elem, dims) = int_array.element_type();
        assert!(elem.is_primitive());
        assert_eq!(dims, 2);
        assert_eq!(UnresolvedType::for_name("int[][]"), int_array);
    }

    #[test]
    fn test_parameterized_round_trip_between_forms() {
        let from_name = UnresolvedType::for_name("java.util.Map<java.lang.String, java.util.List<java.lang.Integer>>");
        assert_eq!(from_name.signature(), "Pjava/util/Map<Ljava/lang/String;Pjava/util/List<Ljava/lang/Integer;>;>;");
        let from_sig = UnresolvedType::for_signature("Ljava/util/Map<Ljava/lang/String;Ljava/util/List<Ljava/lang/Integer;>;>;");
        assert_eq!(from_sig, from_name);
        assert_eq!(from_name.name(), "java.util.Map<java.lang.String, java.util.List<java.lang.Integer>>");
        assert_eq!(from_name.erasure_signature(), "Ljava/util/Map;");
        assert_eq!(from_name.generic_signature(), "Gjava/util/Map;");
    }

    #[test]
    fn test_wildcards_and_type_variables() {
        let w = UnresolvedType::for_name("? extends java.lang.Number");
        assert_eq!(w.signature(), "+Ljava/lang/Number;");
        assert_eq!(w.wildcard_bound().0, WildcardBound::Extends);
        assert_eq!(UnresolvedType::for_signature(&w.signature().to_string()), w);

        let list_of_t = UnresolvedType::for_signature("Pjava/util/List<TT;>;");
        assert!(list_of_t.mentions_type_variables());
        assert!(!UnresolvedType::string().mentions_type_variables());
    }

    #[test]
    fn test_substitution() {
        let list_of_t = UnresolvedType::for_signature("Pjava/util/List<TT;>;");
        let mut bindings = HashMap::new();
        bindings.insert("T".to_string(), UnresolvedType::string());
        assert_eq!(list_of_t.substitute(&bindings).name(), "java.util.List<java.lang.String>");
    }

    #[test]
    fn test_malformed_signature_degrades_to_missing() {
        assert!(UnresolvedType::for_signature("Ljava/lang/String").is_missing());
        assert!(UnresolvedType::try_for_signature("Q").is_none());
        assert!(UnresolvedType::try_for_signature("II").is_none());
    }

    #[test]
    fn test_names() {
        let t = UnresolvedType::for_name("com.acme.Outer$Inner");
        assert_eq!(t.simple_name(), "Inner");
        assert_eq!(t.package_name().as_deref(), Some("com.acme"));
        assert_eq!(UnresolvedType::for_name("String").package_name(), None);
    }
}
