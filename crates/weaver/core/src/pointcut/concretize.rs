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

//! Specializing a resolved pointcut for one advice in one concrete aspect

use crate::binding::{Concretizer, EnclosingKind, IntMap};
use crate::crosscutting::CflowKey;
use crate::munger::{AdviceKind, ConcreteTypeMunger};
use crate::patterns::TypePattern;
use crate::pointcut::{CflowSlot, Pointcut, PointcutKind, PointcutState};
use crate::types::{ResolvedMember, TypeId, UnresolvedType, modifiers};
use metrics::counter;
use std::sync::Arc;
use tracing::debug;
use weaver_common::Message;

pub const CFLOW_COUNTER_TYPE: &str = "org.aspectj.runtime.internal.CFlowCounter";
pub const CFLOW_STACK_TYPE: &str = "org.aspectj.runtime.internal.CFlowStack";

impl Pointcut {
    /// Concretize for a declaration with `arity` formals in `in_aspect`.
    ///
    /// `declaring` is the type the declaration was written in, which is a
    /// supertype of `in_aspect` when the advice is inherited. Named references
    /// are expanded, cflows become state-field tests and bindings are
    /// renumbered to advice slots.
    ///
    /// # Panics
    ///
    /// Panics if the pointcut has not been resolved.
    pub fn concretize(&self, cx: &mut Concretizer<'_>, in_aspect: TypeId, declaring: TypeId, arity: usize, enclosing: EnclosingKind) -> Pointcut {
        let mut map = IntMap::identity(arity);
        map.set_concrete_aspect(in_aspect);
        map.set_enclosing_kind(enclosing);
        self.concretize_with(cx, in_aspect, declaring, &mut map)
    }

    pub fn concretize_with(&self, cx: &mut Concretizer<'_>, in_aspect: TypeId, declaring: TypeId, map: &mut IntMap) -> Pointcut {
        match self.state {
            PointcutState::Symbolic => panic!("pointcut must be resolved before concretization: {}", self),
            PointcutState::Concrete => return self.clone(),
            PointcutState::Resolved => {}
        }
        let kind = match &self.kind {
            PointcutKind::Args(list) => PointcutKind::Args(list.remap(map)),
            PointcutKind::ThisOrTarget { is_this, pattern } => PointcutKind::ThisOrTarget {
                is_this: *is_this,
                pattern: pattern.remap(map),
            },
            PointcutKind::ArgsAnnotation(list) => PointcutKind::ArgsAnnotation(list.remap(map)),
            PointcutKind::ThisOrTargetAnnotation { is_this, pattern } => PointcutKind::ThisOrTargetAnnotation {
                is_this: *is_this,
                pattern: pattern.remap(map),
            },
            PointcutKind::WithinAnnotation(pattern) => PointcutKind::WithinAnnotation(pattern.remap(map)),
            PointcutKind::WithinCodeAnnotation(pattern) => PointcutKind::WithinCodeAnnotation(pattern.remap(map)),
            PointcutKind::Annotation(pattern) => PointcutKind::Annotation(pattern.remap(map)),
            PointcutKind::Reference { .. } => return self.concretize_reference(cx, in_aspect, declaring, map),
            PointcutKind::Cflow { entry, below, free_vars } => return self.concretize_cflow(cx, in_aspect, declaring, map, entry, *below, free_vars),
            PointcutKind::And(l, r) => {
                let left = l.concretize_with(cx, in_aspect, declaring, map);
                let right = r.concretize_with(cx, in_aspect, declaring, map);
                PointcutKind::And(Box::new(left), Box::new(right))
            }
            PointcutKind::Or(l, r) => {
                let left = l.concretize_with(cx, in_aspect, declaring, map);
                let right = r.concretize_with(cx, in_aspect, declaring, map);
                PointcutKind::Or(Box::new(left), Box::new(right))
            }
            PointcutKind::Not(p) => PointcutKind::Not(Box::new(p.concretize_with(cx, in_aspect, declaring, map))),
            other => other.clone(),
        };
        Pointcut::in_state(kind, PointcutState::Concrete, self.location.clone())
    }

    fn concrete_nothing(&self) -> Pointcut {
        Pointcut::in_state(PointcutKind::Nothing, PointcutState::Concrete, self.location.clone())
    }

    fn concretize_error(&self, cx: &mut Concretizer<'_>, text: String) -> Pointcut {
        cx.world.report(Message::error(text).at(self.location.clone()));
        self.concrete_nothing()
    }

    fn concretize_reference(&self, cx: &mut Concretizer<'_>, in_aspect: TypeId, declaring: TypeId, map: &mut IntMap) -> Pointcut {
        let PointcutKind::Reference { on_type, name, arguments } = &self.kind else {
            return self.concrete_nothing();
        };
        // unqualified names are looked up from the concrete aspect, so a sub-aspect can define an abstract pointcut
        let search = match on_type {
            Some(t) => cx.world.resolve(t),
            None if cx.world.is_assignable_from(declaring, in_aspect) => in_aspect,
            None => declaring,
        };
        let Some(definition) = cx.world.find_pointcut(search, name) else {
            return self.concretize_error(cx, format!("can't find referenced pointcut {}", name));
        };
        if definition.is_abstract() {
            let aspect = cx.world.name(in_aspect);
            return self.concretize_error(cx, format!("inherited abstract pointcut {}.{} is not made concrete in {}", definition.declaring_type.name(), name, aspect));
        }
        if arguments.len() != definition.arity() {
            return self.concretize_error(cx, format!("incorrect number of arguments for pointcut {}, expected {} found {}", name, definition.arity(), arguments.len()));
        }

        let mut child = map.child();
        for (position, argument) in arguments.patterns().iter().enumerate() {
            match argument {
                TypePattern::Binding { formal_index, ty } => match map.get(*formal_index) {
                    Some(slot) => child.put(position, slot),
                    None => child.constrain(position, map.constraint(*formal_index).cloned().unwrap_or_else(|| ty.clone())),
                },
                TypePattern::Exact(e) => child.constrain(position, e.ty.clone()),
                _ => {}
            }
        }

        let key = format!("{}.{}", definition.declaring_type.name(), definition.name);
        if !child.enter_definition(key.clone()) {
            return self.concretize_error(cx, format!("circular pointcut declaration involving: {}", key));
        }
        let body = match definition.pointcut.state {
            PointcutState::Symbolic => definition.pointcut.resolve(cx.world, &definition.scope()),
            _ => definition.pointcut.clone(),
        };
        let owner = cx.world.resolve(&definition.declaring_type);
        let concrete = body.concretize_with(cx, in_aspect, owner, &mut child);
        child.exit_definition();
        concrete
    }

    #[allow(clippy::too_many_arguments)]
    fn concretize_cflow(&self, cx: &mut Concretizer<'_>, in_aspect: TypeId, declaring: TypeId, map: &IntMap, entry: &Pointcut, below: bool, free_vars: &[usize]) -> Pointcut {
        if map.enclosing_kind() == Some(EnclosingKind::Declare) {
            return self.concretize_error(cx, "cflow() pointcut designator cannot be used in declare statement".to_string());
        }
        let entry_kind = if below { AdviceKind::CflowBelowEntry } else { AdviceKind::CflowEntry };

        // the entry advice exposes the free variables as its own formals 0..k
        let mut entry_map = map.child();
        entry_map.set_enclosing_kind(EnclosingKind::Advice(entry_kind));
        let mut slots = Vec::new();
        for (stack_index, formal) in free_vars.iter().enumerate() {
            entry_map.put(*formal, stack_index);
            if let Some(slot) = map.get(*formal) {
                slots.push(CflowSlot { formal: slot, stack_index });
            }
        }
        let concrete_entry = entry.concretize_with(cx, in_aspect, declaring, &mut entry_map);

        let uses_counter = free_vars.is_empty();
        let aspect_type = cx.world.to_unresolved(in_aspect);
        let designator = if below { "cflowbelow" } else { "cflow" };
        let key = CflowKey::new(format!("{}({})", designator, concrete_entry), aspect_type.signature(), uses_counter);

        let field = match cx.members.cflow_field(&key) {
            Some(existing) => existing,
            None => {
                let field = match cx.members.inherited_cflow_field(&key) {
                    Some(previous) => previous,
                    None => {
                        let (prefix, field_type) = if uses_counter { ("cflowCounter", CFLOW_COUNTER_TYPE) } else { ("cflowStack", CFLOW_STACK_TYPE) };
                        let name = cx.members.next_cflow_field_name(prefix);
                        counter!("weaver_cflow_fields_created", 1);
                        Arc::new(ResolvedMember::field(
                            aspect_type.clone(),
                            modifiers::PUBLIC | modifiers::STATIC | modifiers::FINAL,
                            UnresolvedType::for_name(field_type),
                            name,
                        ))
                    }
                };
                let adder = if uses_counter { cx.support.make_cflow_counter_field_adder(&field) } else { cx.support.make_cflow_stack_field_adder(&field) };
                cx.members.add_type_munger(ConcreteTypeMunger::new(adder, Some(aspect_type.clone())));
                let entry_munger = cx.support.create_advice_munger(entry_kind, concrete_entry, Some(field.clone()), free_vars.len(), aspect_type, self.location.clone());
                cx.members.add_shadow_munger(entry_munger);
                cx.members.register_cflow_field(key, field.clone());
                debug!(field = %field.name, aspect = %cx.world.name(in_aspect), "registered cflow state field");
                field
            }
        };

        let kind = PointcutKind::ConcreteCflow { field, slots, uses_counter };
        Pointcut::in_state(kind, PointcutState::Concrete, self.location.clone())
    }
}
