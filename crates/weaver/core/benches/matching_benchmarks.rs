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

//! Matching pipeline benchmarks
//!
//! Measures the three phases a backend drives per woven type: fast matching
//! of every munger against the type, static matching against each shadow and
//! residue computation for the shadows that matched.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use weaver_common::logging::init_tracing;
use weaver_common::{CollectingHandler, TracingHandler, WorldConfig};
use weaver_core::crosscutting::CrosscuttingMembersSet;
use weaver_core::munger::{Advice, AdviceKind, DefaultWeavingSupport, ShadowMunger};
use weaver_core::parse_pointcut;
use weaver_core::shadow::{FastMatchInfo, Shadow, ShadowKind};
use weaver_core::types::{InMemoryTypeSource, ResolvedMember, TypeDescriptor, TypeUniverse, UnresolvedType, modifiers};

const SERVICES: usize = 50;
const ASPECT: &str = "com.acme.aspects.Tracing";

const POINTCUTS: [&str; 6] = [
    "within(com.acme..*) && args(String)",
    "execution(public * com.acme.service.*.find*(..))",
    "call(* com.acme.service.Service7.*(..)) && target(com.acme.service.Service7)",
    "execution(* *(..)) && !within(com.acme.aspects..*)",
    "call(* save(..)) && cflow(execution(* com.acme.service.*.run(..)))",
    "execution(* com.other..*(..))",
];

fn source() -> InMemoryTypeSource {
    let source = InMemoryTypeSource::with_java_lang();
    for i in 0..SERVICES {
        source.add(
            TypeDescriptor::class(&format!("com.acme.service.Service{}", i))
                .method("java.lang.String", "findName", &["java.lang.String"])
                .method("void", "save", &["java.lang.Object"])
                .method("void", "run", &[]),
        );
    }
    let mut aspect = TypeDescriptor::aspect(ASPECT);
    for (i, text) in POINTCUTS.iter().enumerate() {
        let kind = if i % 2 == 0 { AdviceKind::Before } else { AdviceKind::AfterReturning };
        aspect = aspect.with_shadow_munger(ShadowMunger::Advice(Advice::new(kind, UnresolvedType::for_name(ASPECT), parse_pointcut(text).unwrap())));
    }
    source.add(aspect);
    source
}

fn session() -> (TypeUniverse, Vec<ShadowMunger>) {
    let mut world = TypeUniverse::new(WorldConfig::default(), Arc::new(source()), Arc::new(CollectingHandler::new()));
    let mut set = CrosscuttingMembersSet::new();
    let aspect = world.resolve_name(ASPECT);
    set.add_or_replace_aspect(&mut world, &DefaultWeavingSupport, aspect);
    let mungers = set.shadow_mungers();
    (world, mungers)
}

fn shadows(world: &mut TypeUniverse, index: usize) -> Vec<Shadow> {
    let name = format!("com.acme.service.Service{}", index);
    let owner = world.resolve_name(&name);
    let declaring = UnresolvedType::for_name(&name);
    let find = ResolvedMember::method(declaring.clone(), modifiers::PUBLIC, UnresolvedType::string(), "findName", vec![UnresolvedType::string()]);
    let save = ResolvedMember::method(declaring.clone(), modifiers::PUBLIC, UnresolvedType::void(), "save", vec![UnresolvedType::object()]);
    vec![
        Shadow::new(world, 1, ShadowKind::MethodExecution, find.clone(), owner, None),
        Shadow::new(world, 2, ShadowKind::MethodCall, save, owner, Some(find.clone())),
        Shadow::new(world, 3, ShadowKind::MethodCall, find, owner, None),
    ]
}

fn bench_type_resolution(c: &mut Criterion) {
    init_tracing("warn");
    let mut group = c.benchmark_group("type_resolution");
    group.throughput(Throughput::Elements(SERVICES as u64));
    group.bench_function("cold_universe", |b| {
        b.iter(|| {
            let mut world = TypeUniverse::new(WorldConfig::default(), Arc::new(source()), Arc::new(TracingHandler));
            for i in 0..SERVICES {
                black_box(world.resolve_name(&format!("com.acme.service.Service{}", i)));
            }
        })
    });
    group.bench_function("cached_lookup", |b| {
        let (mut world, _) = session();
        b.iter(|| black_box(world.resolve_name(black_box("com.acme.service.Service7"))))
    });
    group.finish();
}

fn bench_matching_phases(c: &mut Criterion) {
    let (mut world, mungers) = session();
    let all_shadows: Vec<Vec<Shadow>> = (0..SERVICES).map(|i| shadows(&mut world, i)).collect();
    let types: Vec<_> = (0..SERVICES).map(|i| world.resolve_name(&format!("com.acme.service.Service{}", i))).collect();

    let mut group = c.benchmark_group("matching");
    group.throughput(Throughput::Elements((SERVICES * mungers.len()) as u64));
    group.bench_function("fast_match", |b| {
        b.iter(|| {
            for ty in &types {
                for munger in &mungers {
                    black_box(munger.fast_match(&mut world, &FastMatchInfo::new(*ty)));
                }
            }
        })
    });
    group.bench_function("match_and_residue", |b| {
        b.iter(|| {
            for shadows in &all_shadows {
                for shadow in shadows {
                    for munger in &mungers {
                        if munger.match_shadow(&mut world, shadow) {
                            black_box(munger.find_residue(&mut world, shadow));
                        }
                    }
                }
            }
        })
    });
    group.finish();
}

fn bench_aspect_collection(c: &mut Criterion) {
    c.bench_function("collect_aspect", |b| {
        b.iter(|| {
            let (_, mungers) = session();
            black_box(mungers.len())
        })
    });
}

criterion_group!(benches, bench_type_resolution, bench_matching_phases, bench_aspect_collection);
criterion_main!(benches);
