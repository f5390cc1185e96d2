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

//! Two-tier signature map
//!
//! Permanent entries are owned by the universe and never reclaimed. The
//! reclaimable tier lives in a [`DashMap`] shared with [`ReclaimHandle`]s so
//! a background agent may drop entries while the universe is working. Every
//! removal made through a handle is queued; the universe drains the queue
//! before it trusts a miss.

use crate::types::resolved::TypeId;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Permanent,
    Reclaimable,
}

#[derive(Debug, Default)]
pub(crate) struct TypeMap {
    permanent: HashMap<String, TypeId>,
    reclaimable: Arc<DashMap<String, TypeId>>,
    collected: Arc<Mutex<Vec<(String, TypeId)>>>,
    added_since_sweep: Vec<String>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries removed by handles since the last drain
    pub fn drain_collected(&mut self) -> Vec<(String, TypeId)> {
        std::mem::take(&mut *self.collected.lock())
    }

    pub fn get(&self, signature: &str) -> Option<(TypeId, Tier)> {
        if let Some(id) = self.permanent.get(signature) {
            return Some((*id, Tier::Permanent));
        }
        self.reclaimable.get(signature).map(|e| (*e.value(), Tier::Reclaimable))
    }

    pub fn insert(&mut self, signature: String, id: TypeId, tier: Tier) {
        match tier {
            Tier::Permanent => {
                self.reclaimable.remove(&signature);
                self.added_since_sweep.push(signature.clone());
                self.permanent.insert(signature, id);
            }
            Tier::Reclaimable => {
                self.permanent.remove(&signature);
                self.reclaimable.insert(signature, id);
            }
        }
    }

    pub fn remove(&mut self, signature: &str) -> Option<TypeId> {
        self.permanent.remove(signature).or_else(|| self.reclaimable.remove(signature).map(|(_, id)| id))
    }

    /// Move a permanent entry to the reclaimable tier
    pub fn demote(&mut self, signature: &str) -> bool {
        match self.permanent.remove(signature) {
            Some(id) => {
                self.reclaimable.insert(signature.to_string(), id);
                true
            }
            None => false,
        }
    }

    /// Move a reclaimable entry to the permanent tier
    pub fn promote(&mut self, signature: &str) -> bool {
        match self.reclaimable.remove(signature) {
            Some((sig, id)) => {
                self.permanent.insert(sig, id);
                true
            }
            None => false,
        }
    }

    pub fn permanent_id(&self, signature: &str) -> Option<TypeId> {
        self.permanent.get(signature).copied()
    }

    pub fn take_added_since_sweep(&mut self) -> Vec<String> {
        std::mem::take(&mut self.added_since_sweep)
    }

    /// Requeue candidates a batch sweep was not yet allowed to demote
    pub fn restore_added(&mut self, signatures: Vec<String>) {
        self.added_since_sweep.extend(signatures);
    }

    pub fn permanent_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.permanent.values().copied()
    }

    pub fn reclaimable_entries(&self) -> Vec<(String, TypeId)> {
        self.reclaimable.iter().map(|e| (e.key().clone(), *e.value())).collect()
    }

    pub fn is_mapped(&self, signature: &str, id: TypeId) -> bool {
        self.get(signature).is_some_and(|(mapped, _)| mapped == id)
    }

    pub fn permanent_len(&self) -> usize {
        self.permanent.len()
    }

    pub fn reclaimable_len(&self) -> usize {
        self.reclaimable.len()
    }

    pub fn handle(&self) -> ReclaimHandle {
        ReclaimHandle {
            reclaimable: Arc::clone(&self.reclaimable),
            collected: Arc::clone(&self.collected),
        }
    }
}

/// Thread-safe access to the reclaimable tier of one universe
#[derive(Debug, Clone)]
pub struct ReclaimHandle {
    reclaimable: Arc<DashMap<String, TypeId>>,
    collected: Arc<Mutex<Vec<(String, TypeId)>>>,
}

impl ReclaimHandle {
    /// Drop a reclaimable entry; false when the signature is not in that tier
    pub fn reclaim(&self, signature: &str) -> bool {
        match self.reclaimable.remove(signature) {
            Some(entry) => {
                self.collected.lock().push(entry);
                true
            }
            None => false,
        }
    }

    pub fn reclaimable_signatures(&self) -> Vec<String> {
        self.reclaimable.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.reclaimable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reclaimable.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn id(i: u32) -> TypeId {
        TypeId::new(i, 0)
    }

    #[test]
    fn test_permanent_tier_is_checked_first() {
        let mut map = TypeMap::new();
        map.insert("LA;".into(), id(1), Tier::Reclaimable);
        map.insert("LA;".into(), id(2), Tier::Permanent);
        assert_eq!(map.get("LA;"), Some((id(2), Tier::Permanent)));
        assert_eq!(map.reclaimable_len(), 0);
    }

    #[test]
    fn test_demote_and_promote() {
        let mut map = TypeMap::new();
        map.insert("LA;".into(), id(1), Tier::Permanent);
        assert_eq!(map.take_added_since_sweep(), vec!["LA;".to_string()]);
        assert!(map.demote("LA;"));
        assert_eq!(map.get("LA;"), Some((id(1), Tier::Reclaimable)));
        assert!(map.promote("LA;"));
        assert_eq!(map.get("LA;"), Some((id(1), Tier::Permanent)));
        assert!(!map.demote("LB;"));
    }

    #[test]
    fn test_handle_reclaims_from_another_thread() {
        let mut map = TypeMap::new();
        map.insert("LA;".into(), id(1), Tier::Reclaimable);
        map.insert("LB;".into(), id(2), Tier::Permanent);
        let handle = map.handle();
        let worker = thread::spawn(move || (handle.reclaim("LA;"), handle.reclaim("LB;")));
        assert_eq!(worker.join().unwrap(), (true, false));

        assert_eq!(map.drain_collected(), vec![("LA;".to_string(), id(1))]);
        assert!(map.drain_collected().is_empty());
        assert_eq!(map.get("LA;"), None);
        assert!(map.get("LB;").is_some());
    }
}
