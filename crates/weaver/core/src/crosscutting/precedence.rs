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

//! Ordering of aspects by `declare precedence`

use crate::crosscutting::CrosscuttingMembersSet;
use crate::declare::Declare;
use crate::lint::Lint;
use crate::types::{TypeId, TypeUniverse};
use metrics::counter;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};
use weaver_common::{ConflictPolicy, SourceLocation};

/// Compares aspects against every registered precedence declaration.
///
/// `Greater` means the first aspect has precedence. Results are cached per
/// pair, in both directions.
#[derive(Debug, Default)]
pub struct PrecedenceCalculator {
    declares: Vec<Declare>,
    cache: HashMap<(TypeId, TypeId), Ordering>,
}

impl PrecedenceCalculator {
    pub fn new(declares: Vec<Declare>) -> Self {
        Self {
            declares,
            cache: HashMap::new(),
        }
    }

    pub fn from_members(set: &CrosscuttingMembersSet) -> Self {
        Self::new(set.declare_precedence())
    }

    pub fn compare(&mut self, world: &mut TypeUniverse, a: TypeId, b: TypeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        if let Some(cached) = self.cache.get(&(a, b)) {
            return *cached;
        }
        let ordering = self.evaluate(world, a, b);
        self.cache.insert((a, b), ordering);
        self.cache.insert((b, a), ordering.reverse());
        ordering
    }

    fn evaluate(&self, world: &mut TypeUniverse, a: TypeId, b: TypeId) -> Ordering {
        let mut result = Ordering::Equal;
        let mut decided_at: Option<SourceLocation> = None;
        for declare in &self.declares {
            let ordering = declare.compare(world, a, b);
            if ordering == Ordering::Equal || ordering == result {
                continue;
            }
            if result == Ordering::Equal {
                result = ordering;
                decided_at = declare.location().cloned();
                continue;
            }

            let text = format!("conflicting declare precedence orderings for aspects: {} and {}", world.name(a), world.name(b));
            warn!(first = %world.name(a), second = %world.name(b), "precedence conflict");
            world.report_lint_related(Lint::PrecedenceConflict, text, declare.location().cloned(), decided_at.clone());
            counter!("weaver_precedence_conflicts", 1);
            match world.config().conflict_policy {
                ConflictPolicy::LastWins => {
                    result = ordering;
                    decided_at = declare.location().cloned();
                }
                ConflictPolicy::Reject => return Ordering::Equal,
            }
        }
        result
    }

    /// Precedence, then the type hierarchy: a super-aspect ranks below its sub-aspects
    pub fn compare_by_hierarchy(&mut self, world: &mut TypeUniverse, a: TypeId, b: TypeId) -> Ordering {
        let ordering = self.compare(world, a, b);
        if ordering != Ordering::Equal || a == b {
            return ordering;
        }
        if world.is_assignable_from(a, b) {
            Ordering::Less
        } else if world.is_assignable_from(b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    /// `aspects` ordered highest precedence first.
    ///
    /// Unordered aspects keep no particular relative order. When the
    /// declarations form a cycle the cycle is reported and registration
    /// order is returned unchanged.
    pub fn total_order(&mut self, world: &mut TypeUniverse, aspects: &[TypeId]) -> Vec<TypeId> {
        let mut graph: DiGraph<TypeId, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = aspects.iter().map(|a| graph.add_node(*a)).collect();
        for i in 0..aspects.len() {
            for j in (i + 1)..aspects.len() {
                match self.compare_by_hierarchy(world, aspects[i], aspects[j]) {
                    Ordering::Greater => {
                        graph.add_edge(nodes[i], nodes[j], ());
                    }
                    Ordering::Less => {
                        graph.add_edge(nodes[j], nodes[i], ());
                    }
                    Ordering::Equal => {}
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => {
                let order: Vec<TypeId> = order.into_iter().map(|n| graph[n]).collect();
                debug!(aspects = order.len(), "computed aspect precedence order");
                order
            }
            Err(cycle) => {
                let at = graph[cycle.node_id()];
                world.report_lint(Lint::PrecedenceConflict, format!("declare precedence orderings form a cycle involving {}", world.name(at)), None);
                counter!("weaver_precedence_conflicts", 1);
                aspects.to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::SimpleScope;
    use crate::patterns::parse_type_pattern;
    use crate::types::{InMemoryTypeSource, TypeDescriptor};
    use std::sync::Arc;
    use weaver_common::{CollectingHandler, WorldConfig};

    fn universe(config: WorldConfig) -> (TypeUniverse, Arc<CollectingHandler>) {
        let source = InMemoryTypeSource::with_java_lang();
        for name in ["com.acme.Security", "com.acme.Logging", "com.acme.Metrics"] {
            source.add(TypeDescriptor::aspect(name));
        }
        source.add(TypeDescriptor::aspect("com.acme.Base").abstract_type());
        source.add(TypeDescriptor::aspect("com.acme.Derived").extends("com.acme.Base"));
        let handler = Arc::new(CollectingHandler::new());
        (TypeUniverse::new(config, Arc::new(source), handler.clone()), handler)
    }

    fn precedence(world: &mut TypeUniverse, names: &[&str], line: u32) -> Declare {
        let patterns = names.iter().map(|n| parse_type_pattern(n).unwrap()).collect();
        Declare::precedence(patterns)
            .at(Some(SourceLocation::new("Order.aj", line, 1)))
            .resolve(world, &SimpleScope::new().with_import("com.acme"))
    }

    #[test]
    fn test_compare_caches_both_directions() {
        let (mut world, handler) = universe(WorldConfig::default());
        let declares = vec![precedence(&mut world, &["Security", "*"], 1)];
        let mut calculator = PrecedenceCalculator::new(declares);
        let security = world.resolve_name("com.acme.Security");
        let logging = world.resolve_name("com.acme.Logging");

        assert_eq!(calculator.compare(&mut world, security, logging), Ordering::Greater);
        assert_eq!(calculator.compare(&mut world, logging, security), Ordering::Less);
        assert!(handler.messages().is_empty());
    }

    #[test]
    fn test_conflict_reported_and_last_wins() {
        let (mut world, handler) = universe(WorldConfig::default());
        let declares = vec![precedence(&mut world, &["Security", "Logging"], 1), precedence(&mut world, &["Logging", "Security"], 2)];
        let mut calculator = PrecedenceCalculator::new(declares);
        let security = world.resolve_name("com.acme.Security");
        let logging = world.resolve_name("com.acme.Logging");

        assert_eq!(calculator.compare(&mut world, security, logging), Ordering::Less);
        let errors = handler.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("conflicting declare precedence"));
        assert_eq!(errors[0].location.as_ref().map(|l| l.line), Some(2));
        assert_eq!(errors[0].related.as_ref().map(|l| l.line), Some(1));

        calculator.compare(&mut world, security, logging);
        assert_eq!(handler.errors().len(), 1);
    }

    #[test]
    fn test_conflict_rejected_leaves_pair_unordered() {
        let (mut world, handler) = universe(WorldConfig::default().with_conflict_policy(ConflictPolicy::Reject));
        let declares = vec![precedence(&mut world, &["Security", "Logging"], 1), precedence(&mut world, &["Logging", "Security"], 2)];
        let mut calculator = PrecedenceCalculator::new(declares);
        let security = world.resolve_name("com.acme.Security");
        let logging = world.resolve_name("com.acme.Logging");

        assert_eq!(calculator.compare(&mut world, security, logging), Ordering::Equal);
        assert!(handler.has_errors());
    }

    #[test]
    fn test_super_aspect_ranks_below_sub_aspect() {
        let (mut world, _) = universe(WorldConfig::default());
        let mut calculator = PrecedenceCalculator::default();
        let base = world.resolve_name("com.acme.Base");
        let derived = world.resolve_name("com.acme.Derived");
        let metrics = world.resolve_name("com.acme.Metrics");

        assert_eq!(calculator.compare(&mut world, base, derived), Ordering::Equal);
        assert_eq!(calculator.compare_by_hierarchy(&mut world, base, derived), Ordering::Less);
        assert_eq!(calculator.compare_by_hierarchy(&mut world, derived, base), Ordering::Greater);
        assert_eq!(calculator.compare_by_hierarchy(&mut world, derived, metrics), Ordering::Equal);
    }

    #[test]
    fn test_total_order_follows_declarations() {
        let (mut world, handler) = universe(WorldConfig::default());
        let declares = vec![precedence(&mut world, &["Security", "Logging", "Metrics"], 1)];
        let mut calculator = PrecedenceCalculator::new(declares);
        let ids: Vec<TypeId> = ["com.acme.Metrics", "com.acme.Security", "com.acme.Logging"].iter().map(|n| world.resolve_name(n)).collect();

        let order: Vec<String> = calculator.total_order(&mut world, &ids).into_iter().map(|id| world.name(id)).collect();
        assert_eq!(order, vec!["com.acme.Security", "com.acme.Logging", "com.acme.Metrics"]);
        assert!(handler.messages().is_empty());
    }

    #[test]
    fn test_total_order_cycle_keeps_registration_order() {
        let (mut world, handler) = universe(WorldConfig::default());
        let declares = vec![
            precedence(&mut world, &["Security", "Logging"], 1),
            precedence(&mut world, &["Logging", "Metrics"], 2),
            precedence(&mut world, &["Metrics", "Security"], 3),
        ];
        let mut calculator = PrecedenceCalculator::new(declares);
        let ids: Vec<TypeId> = ["com.acme.Security", "com.acme.Logging", "com.acme.Metrics"].iter().map(|n| world.resolve_name(n)).collect();

        assert_eq!(calculator.total_order(&mut world, &ids), ids);
        assert!(handler.contains("form a cycle"));
    }
}
