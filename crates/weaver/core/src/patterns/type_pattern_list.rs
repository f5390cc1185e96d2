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

//! Ordered pattern lists with `..` for parameter and argument matching

use crate::binding::{Bindings, IntMap, ResolveContext};
use crate::patterns::type_pattern::{MatchKind, TypePattern};
use crate::tristate::TriState;
use crate::types::{TypeId, TypeUniverse, UnresolvedType};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypePatternList {
    patterns: Vec<TypePattern>,
}

impl TypePatternList {
    pub fn new(patterns: Vec<TypePattern>) -> Self {
        Self { patterns }
    }

    /// `()`
    pub fn empty() -> Self {
        Self::default()
    }

    /// `(..)`
    pub fn any() -> Self {
        Self::new(vec![TypePattern::Ellipsis])
    }

    pub fn patterns(&self) -> &[TypePattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn ellipsis_count(&self) -> usize {
        self.patterns.iter().filter(|p| p.is_ellipsis()).count()
    }

    /// Match `types` position by position, `..` standing for any run of types.
    ///
    /// The result is the best answer over all ways of placing the ellipses:
    /// `Yes` if some placement matches outright, else `Maybe` if some
    /// placement might match, else `No`.
    pub fn matches(&self, world: &mut TypeUniverse, types: &[TypeId], kind: MatchKind) -> TriState {
        match_from(&self.patterns, world, types, kind)
    }

    /// Pattern index to argument index for every non-ellipsis pattern, if the
    /// list can line up with `arg_count` arguments in exactly one way.
    pub fn positions(&self, arg_count: usize) -> Option<Vec<(usize, usize)>> {
        let fixed = self.len() - self.ellipsis_count();
        match self.ellipsis_count() {
            0 if fixed == arg_count => Some((0..fixed).map(|i| (i, i)).collect()),
            1 if fixed <= arg_count => {
                let gap = arg_count - fixed;
                let mut result = Vec::with_capacity(fixed);
                let mut arg = 0;
                for (i, p) in self.patterns.iter().enumerate() {
                    if p.is_ellipsis() {
                        arg += gap;
                    } else {
                        result.push((i, arg));
                        arg += 1;
                    }
                }
                Some(result)
            }
            _ => None,
        }
    }

    /// Every pattern names one exact type
    pub fn exact_types(&self) -> Option<Vec<UnresolvedType>> {
        self.patterns
            .iter()
            .map(|p| match p {
                TypePattern::Exact(e) if !e.include_subtypes => Some(e.ty.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn resolve_bindings(self, cx: &mut ResolveContext<'_>, mut bindings: Option<&mut Bindings>, allow_parameterized: bool) -> Self {
        if self.ellipsis_count() > 1 {
            cx.error(format!("only one '..' allowed in an argument list: ({})", self));
        }
        let patterns = self.patterns.into_iter().map(|p| p.resolve_bindings(cx, bindings.as_deref_mut(), allow_parameterized)).collect();
        Self { patterns }
    }

    pub fn remap(&self, map: &IntMap) -> Self {
        Self {
            patterns: self.patterns.iter().map(|p| p.remap(map)).collect(),
        }
    }
}

fn match_from(patterns: &[TypePattern], world: &mut TypeUniverse, types: &[TypeId], kind: MatchKind) -> TriState {
    let Some((first, rest)) = patterns.split_first() else {
        return TriState::from_bool(types.is_empty());
    };
    if first.is_ellipsis() {
        let mut best = TriState::No;
        for skip in 0..=types.len() {
            best = best.or(match_from(rest, world, &types[skip..], kind));
            if best.always_true() {
                break;
            }
        }
        return best;
    }
    let Some((ty, remaining)) = types.split_first() else {
        return TriState::No;
    };
    first.matches(world, *ty, kind).and_then(|| match_from(rest, world, remaining, kind))
}

impl fmt::Display for TypePatternList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.patterns.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InMemoryTypeSource;
    use proptest::prelude::*;
    use std::sync::Arc;
    use weaver_common::{CollectingHandler, WorldConfig};

    fn universe() -> TypeUniverse {
        TypeUniverse::new(WorldConfig::default(), Arc::new(InMemoryTypeSource::with_java_lang()), Arc::new(CollectingHandler::new()))
    }

    #[test]
    fn test_ellipsis_placement() {
        let mut world = universe();
        let s = world.resolve_name("java.lang.String");
        let i = world.resolve_name("int");
        let list = TypePatternList::new(vec![TypePattern::Ellipsis, TypePattern::exact(UnresolvedType::int())]);
        assert_eq!(list.matches(&mut world, &[s, s, i], MatchKind::Static), TriState::Yes);
        assert_eq!(list.matches(&mut world, &[i, s], MatchKind::Static), TriState::No);
        assert_eq!(TypePatternList::any().matches(&mut world, &[], MatchKind::Static), TriState::Yes);
        assert_eq!(TypePatternList::empty().matches(&mut world, &[s], MatchKind::Static), TriState::No);
    }

    #[test]
    fn test_dynamic_list_takes_best_placement() {
        let mut world = universe();
        let object = world.object();
        let s = world.resolve_name("java.lang.String");
        let list = TypePatternList::new(vec![TypePattern::Ellipsis, TypePattern::exact(UnresolvedType::string()), TypePattern::Ellipsis]);
        assert_eq!(list.matches(&mut world, &[object, s], MatchKind::Dynamic), TriState::Yes);
        assert_eq!(list.matches(&mut world, &[object], MatchKind::Dynamic), TriState::Maybe);
    }

    #[test]
    fn test_positions() {
        let list = TypePatternList::new(vec![TypePattern::Any, TypePattern::Ellipsis, TypePattern::Any]);
        assert_eq!(list.positions(4), Some(vec![(0, 0), (2, 3)]));
        assert_eq!(list.positions(1), None);
        assert_eq!(TypePatternList::new(vec![TypePattern::Any]).positions(2), None);
    }

    proptest! {
        #[test]
        fn prop_any_list_matches_every_arity(n in 0usize..6) {
            let mut world = universe();
            let object = world.object();
            let types = vec![object; n];
            prop_assert_eq!(TypePatternList::any().matches(&mut world, &types, MatchKind::Static), TriState::Yes);
            let stars = TypePatternList::new(vec![TypePattern::Any; n]);
            prop_assert_eq!(stars.matches(&mut world, &types, MatchKind::Static), TriState::Yes);
        }
    }
}
