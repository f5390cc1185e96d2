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

//! Join point shadows: the static code sites pointcuts are matched against

use crate::types::{MemberKind, ResolvedMember, TypeId, TypeUniverse, UnresolvedType, modifiers};
use serde::{Deserialize, Serialize};
use std::fmt;
use weaver_common::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShadowKind {
    MethodCall,
    ConstructorCall,
    MethodExecution,
    ConstructorExecution,
    FieldGet,
    FieldSet,
    StaticInitialization,
    PreInitialization,
    Initialization,
    ExceptionHandler,
    AdviceExecution,
}

impl ShadowKind {
    pub const ALL: [ShadowKind; 11] = [
        ShadowKind::MethodCall,
        ShadowKind::ConstructorCall,
        ShadowKind::MethodExecution,
        ShadowKind::ConstructorExecution,
        ShadowKind::FieldGet,
        ShadowKind::FieldSet,
        ShadowKind::StaticInitialization,
        ShadowKind::PreInitialization,
        ShadowKind::Initialization,
        ShadowKind::ExceptionHandler,
        ShadowKind::AdviceExecution,
    ];

    /// Designator that selects this kind
    pub fn keyword(self) -> &'static str {
        match self {
            ShadowKind::MethodCall | ShadowKind::ConstructorCall => "call",
            ShadowKind::MethodExecution | ShadowKind::ConstructorExecution => "execution",
            ShadowKind::FieldGet => "get",
            ShadowKind::FieldSet => "set",
            ShadowKind::StaticInitialization => "staticinitialization",
            ShadowKind::PreInitialization => "preinitialization",
            ShadowKind::Initialization => "initialization",
            ShadowKind::ExceptionHandler => "handler",
            ShadowKind::AdviceExecution => "adviceexecution",
        }
    }

    /// Kind of member a shadow of this kind is signed by
    pub fn member_kind(self) -> MemberKind {
        match self {
            ShadowKind::MethodCall | ShadowKind::MethodExecution => MemberKind::Method,
            ShadowKind::ConstructorCall | ShadowKind::ConstructorExecution | ShadowKind::PreInitialization | ShadowKind::Initialization => MemberKind::Constructor,
            ShadowKind::FieldGet | ShadowKind::FieldSet => MemberKind::Field,
            ShadowKind::StaticInitialization => MemberKind::StaticInitialization,
            ShadowKind::ExceptionHandler => MemberKind::Handler,
            ShadowKind::AdviceExecution => MemberKind::Advice,
        }
    }

    /// Whether code runs with no `this` at such a shadow regardless of its enclosing member
    fn never_has_this(self) -> bool {
        matches!(self, ShadowKind::StaticInitialization | ShadowKind::PreInitialization)
    }

    /// Whether the shadow's target is the object under construction or the enclosing `this`
    fn targets_this(self) -> bool {
        matches!(self, ShadowKind::MethodExecution | ShadowKind::ConstructorExecution | ShadowKind::Initialization | ShadowKind::AdviceExecution)
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for ShadowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ShadowKind::MethodCall => "method-call",
            ShadowKind::ConstructorCall => "constructor-call",
            ShadowKind::MethodExecution => "method-execution",
            ShadowKind::ConstructorExecution => "constructor-execution",
            ShadowKind::FieldGet => "field-get",
            ShadowKind::FieldSet => "field-set",
            ShadowKind::StaticInitialization => "staticinitialization",
            ShadowKind::PreInitialization => "preinitialization",
            ShadowKind::Initialization => "initialization",
            ShadowKind::ExceptionHandler => "exception-handler",
            ShadowKind::AdviceExecution => "adviceexecution",
        };
        write!(f, "{}", text)
    }
}

/// A set of shadow kinds as a bit mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ShadowKindSet(u16);

impl ShadowKindSet {
    pub const NONE: ShadowKindSet = ShadowKindSet(0);
    pub const ALL: ShadowKindSet = ShadowKindSet((1 << 11) - 1);

    pub fn single(kind: ShadowKind) -> Self {
        ShadowKindSet(kind.bit())
    }

    pub fn contains(self, kind: ShadowKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn union(self, other: ShadowKindSet) -> Self {
        ShadowKindSet(self.0 | other.0)
    }

    pub fn intersection(self, other: ShadowKindSet) -> Self {
        ShadowKindSet(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ShadowKind> {
        ShadowKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

/// A join point site supplied by the instrumentation backend.
///
/// `this_type`, `target_type` and `arg_types` describe the static context;
/// [`Shadow::new`] derives them from the kind and signature and the `with_*`
/// methods override them.
#[derive(Debug, Clone)]
pub struct Shadow {
    pub id: u64,
    pub kind: ShadowKind,
    pub signature: ResolvedMember,
    pub enclosing_type: TypeId,
    pub enclosing_code: Option<ResolvedMember>,
    pub this_type: Option<TypeId>,
    pub target_type: Option<TypeId>,
    pub arg_types: Vec<TypeId>,
    pub location: Option<SourceLocation>,
}

impl Shadow {
    pub fn new(world: &mut TypeUniverse, id: u64, kind: ShadowKind, signature: ResolvedMember, enclosing_type: TypeId, enclosing_code: Option<ResolvedMember>) -> Self {
        let static_context = enclosing_code.as_ref().is_some_and(|c| c.is_static() || c.kind == MemberKind::StaticInitialization);
        let this_type = if kind.never_has_this() || static_context { None } else { Some(enclosing_type) };

        let declaring = world.resolve(&signature.declaring_type);
        let target_type = match kind {
            _ if kind.targets_this() => this_type,
            ShadowKind::MethodCall | ShadowKind::FieldGet | ShadowKind::FieldSet if signature.modifiers & modifiers::STATIC == 0 => Some(declaring),
            _ => None,
        };

        let arg_types = match kind {
            ShadowKind::FieldGet | ShadowKind::StaticInitialization => Vec::new(),
            ShadowKind::FieldSet => vec![world.resolve(&signature.return_type)],
            ShadowKind::ExceptionHandler => signature.parameter_types.first().map(|p| world.resolve(p)).into_iter().collect(),
            _ => signature.parameter_types.iter().map(|p| world.resolve(p)).collect(),
        };

        Self {
            id,
            kind,
            signature,
            enclosing_type,
            enclosing_code,
            this_type,
            target_type,
            arg_types,
            location: None,
        }
    }

    pub fn with_this(mut self, this_type: Option<TypeId>) -> Self {
        self.this_type = this_type;
        self
    }

    pub fn with_target(mut self, target_type: Option<TypeId>) -> Self {
        self.target_type = target_type;
        self
    }

    pub fn with_args(mut self, arg_types: Vec<TypeId>) -> Self {
        self.arg_types = arg_types;
        self
    }

    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    /// Declaring type of the shadow's signature
    pub fn signature_type(&self) -> &UnresolvedType {
        &self.signature.declaring_type
    }

    /// The member `withincode` is matched against: the enclosing method, or the
    /// constructor itself for the initialization shadows that have no enclosing code
    pub fn enclosing_code_signature(&self) -> Option<&ResolvedMember> {
        match self.kind {
            ShadowKind::PreInitialization | ShadowKind::Initialization | ShadowKind::ConstructorExecution | ShadowKind::MethodExecution | ShadowKind::AdviceExecution => {
                self.enclosing_code.as_ref().or(Some(&self.signature))
            }
            _ => self.enclosing_code.as_ref(),
        }
    }
}

/// What is known about a type before any of its shadows are enumerated
#[derive(Debug, Clone, Copy)]
pub struct FastMatchInfo {
    pub ty: TypeId,
    /// Set when the backend already knows it only asks about one kind
    pub kind: Option<ShadowKind>,
}

impl FastMatchInfo {
    pub fn new(ty: TypeId) -> Self {
        Self { ty, kind: None }
    }

    pub fn for_kind(ty: TypeId, kind: ShadowKind) -> Self {
        Self { ty, kind: Some(kind) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InMemoryTypeSource;
    use std::sync::Arc;
    use weaver_common::{CollectingHandler, WorldConfig};

    #[test]
    fn test_kind_set_operations() {
        let calls = ShadowKindSet::single(ShadowKind::MethodCall).union(ShadowKindSet::single(ShadowKind::ConstructorCall));
        assert!(calls.contains(ShadowKind::ConstructorCall));
        assert!(!calls.contains(ShadowKind::FieldGet));
        assert_eq!(calls.iter().count(), 2);
        assert!(calls.intersection(ShadowKindSet::single(ShadowKind::FieldGet)).is_empty());
        assert_eq!(ShadowKindSet::ALL.iter().count(), ShadowKind::ALL.len());
    }

    #[test]
    fn test_static_context_derivation() {
        let mut world = TypeUniverse::new(WorldConfig::default(), Arc::new(InMemoryTypeSource::with_java_lang()), Arc::new(CollectingHandler::new()));
        let object = world.object();
        let length = ResolvedMember::method(UnresolvedType::string(), modifiers::PUBLIC, UnresolvedType::int(), "length", vec![]);
        let caller = ResolvedMember::method(UnresolvedType::object(), modifiers::PUBLIC | modifiers::STATIC, UnresolvedType::void(), "main", vec![]);
        let call = Shadow::new(&mut world, 1, ShadowKind::MethodCall, length.clone(), object, Some(caller));
        assert_eq!(call.this_type, None);
        assert_eq!(call.target_type, Some(world.resolve_name("java.lang.String")));
        assert!(call.arg_types.is_empty());

        let execution = Shadow::new(&mut world, 2, ShadowKind::MethodExecution, length, object, None);
        assert_eq!(execution.this_type, Some(object));
        assert_eq!(execution.target_type, Some(object));
        assert!(execution.enclosing_code_signature().is_some());
    }
}
