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

//! Persisted form of pointcuts, patterns, declares and mungers

use std::sync::Arc;
use weaver_common::codec::{self, FORMAT_VERSION};
use weaver_common::{CodecError, CollectingHandler, Persistent, WorldConfig};
use weaver_core::binding::SimpleScope;
use weaver_core::crosscutting::CrosscuttingMembers;
use weaver_core::declare::Declare;
use weaver_core::munger::{Advice, AdviceKind, DefaultWeavingSupport, PerClause, ShadowMunger};
use weaver_core::parse_pointcut;
use weaver_core::patterns::{TypePattern, parse_type_pattern};
use weaver_core::pointcut::Pointcut;
use weaver_core::types::{InMemoryTypeSource, TypeDescriptor, TypeUniverse, UnresolvedType};

fn round_trip<T: Persistent + PartialEq + std::fmt::Debug>(value: &T) {
    let bytes = codec::write(value).unwrap();
    assert_eq!(bytes[0], T::FAMILY);
    assert_eq!(bytes[1], value.kind_tag());
    assert_eq!(codec::read::<T>(&bytes).unwrap(), *value);
}

#[test]
fn test_parsed_pointcuts_survive_the_codec() {
    let texts = [
        "call(public * com.acme..*Service.find*(String, ..) throws java.io.IOException)",
        "execution(new(..)) || staticinitialization(com.acme.*)",
        "get(int com.acme.Order.count) && !set(* *)",
        "handler(java.io.IOException+) && withincode(* run())",
        "this(com.acme.Order) && target(Object) && args(.., int)",
        "@within(com.acme.Audited) && @annotation(com.acme.Timed) && @args(*, com.acme.Sensitive)",
        "cflowbelow(adviceexecution()) && com.acme.Pointcuts.inService()",
        "preinitialization(com.acme.Order.new()) && initialization(*.new(..))",
    ];
    for text in texts {
        let pointcut = parse_pointcut(text).unwrap();
        round_trip(&pointcut);
    }
}

#[test]
fn test_concrete_pointcut_with_cflow_field_survives_the_codec() {
    let source = InMemoryTypeSource::with_java_lang();
    source.add(TypeDescriptor::aspect("com.acme.Audit"));
    let mut world = TypeUniverse::new(WorldConfig::default(), Arc::new(source), Arc::new(CollectingHandler::new()));
    let aspect = world.resolve_name("com.acme.Audit");

    let advice = Advice::new(AdviceKind::Before, UnresolvedType::for_name("com.acme.Audit"), parse_pointcut("call(* *(..)) && cflow(execution(* main(..)))").unwrap());
    let mut members = CrosscuttingMembers::new(world.to_unresolved(aspect));
    let concrete = {
        let mut cx = weaver_core::Concretizer::new(&mut world, &DefaultWeavingSupport, &mut members);
        ShadowMunger::Advice(advice).concretize(&mut cx, aspect)
    };
    assert!(concrete.pointcut().is_concrete());
    round_trip(concrete.pointcut());
    round_trip(&concrete);
    for munger in members.shadow_mungers() {
        round_trip(munger);
    }
    for munger in members.type_mungers() {
        round_trip(&munger.munger);
    }
}

#[test]
fn test_declares_and_per_clauses_survive_the_codec() {
    let pattern = |t: &str| parse_type_pattern(t).unwrap();
    round_trip(&Declare::precedence(vec![pattern("com.acme.Security"), pattern("*")]));
    round_trip(&Declare::soft(pattern("java.io.IOException"), parse_pointcut("call(* *(..))").unwrap()));
    round_trip(&Declare::warning(parse_pointcut("get(* *)").unwrap(), "field read"));
    round_trip(&PerClause::PerObject {
        is_this: true,
        entry: parse_pointcut("execution(* *(..))").unwrap(),
    });
    round_trip(&pattern("java.util.List<String>+[]"));
}

#[test]
fn test_resolved_declare_round_trips() {
    let mut world = TypeUniverse::new(WorldConfig::default(), Arc::new(InMemoryTypeSource::with_java_lang()), Arc::new(CollectingHandler::new()));
    let declare = Declare::parents(parse_type_pattern("Object").unwrap(), vec![parse_type_pattern("java.io.Serializable").unwrap()], false).resolve(&mut world, &SimpleScope::new());
    round_trip(&declare);
}

#[test]
fn test_reader_rejects_foreign_or_newer_data() {
    let pointcut = parse_pointcut("within(com.acme..*)").unwrap();
    let mut bytes = codec::write(&pointcut).unwrap();

    assert!(matches!(codec::read::<TypePattern>(&bytes), Err(CodecError::FamilyMismatch { .. })));

    bytes[2] = FORMAT_VERSION + 1;
    assert!(matches!(codec::read::<Pointcut>(&bytes), Err(CodecError::UnsupportedVersion { .. })));

    bytes[2] = FORMAT_VERSION;
    bytes[1] = bytes[1].wrapping_add(1);
    assert!(matches!(codec::read::<Pointcut>(&bytes), Err(CodecError::KindMismatch { .. })));

    assert!(matches!(codec::read::<Pointcut>(&bytes[..2]), Err(CodecError::Truncated { .. })));
}
