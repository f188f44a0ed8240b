// SPDX-License-Identifier: AGPL-3.0-or-later
// AxonDB - Vector Storage Substrate
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Label ↔ local-id bookkeeping with free-list reuse and tail compaction.
//!
//! The id pool is one dense array of [`LabelEntity`] indexed by local id
//! (`lid`), partitioned into three contiguous ranges:
//!
//! ```text
//! |-- reserved --|------- active/free -------|---- pre-allocated unused ----|
//! [0, reserved)   [reserved, next_id)         [next_id, ids.len())
//! ```
//!
//! - `[0, reserved)` is locked: allocation never touches it; only
//!   [`IdManager::set_reserved_id`] may bind labels there.
//! - `[reserved, next_id)` holds in-use lids (present in the label map) and
//!   freed lids (label set to [`IdManager::INVALID_ID`], present in the free
//!   set); the two cases are mutually exclusive and exhaustive over the
//!   range.
//! - `[next_id, ids.len())` is pre-allocated capacity activated by advancing
//!   `next_id`; no allocation happens there until the free set is empty.
//!
//! Freed lids are reused smallest-first. Freeing at the tail shrinks
//! `next_id` back down (never below `reserved`, never past an in-use lid),
//! keeping the active range compact.
//!
//! Each slot also carries a 64-bit `status` word owned entirely by the
//! caller; the store uses one bit pattern for tombstones. Status is
//! orthogonal to the free/active state machine.
//!
//! Two compaction triggers are designed to run above this layer, hot-swapped
//! and asynchronous: a *physical* rebuild when the free-to-active ratio
//! grows too large (rebuild a denser manager, status ignored) and a
//! *logical* rebuild when the tombstoned fraction grows too large (rebuild
//! the consuming index, physical holes ignored). Neither is implemented
//! here; the introspection accessors expose everything they need.

use std::collections::{BTreeSet, HashMap};

use axondb_core::{AxonError, Result};

// ============================================================================
// Label Entity
// ============================================================================

/// One id-pool slot: the external label plus a caller-defined status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelEntity {
    /// External label, or [`IdManager::INVALID_ID`] for a free slot.
    pub label: u64,
    /// Caller-defined status, reset to [`LabelEntity::NONE_STATUS`] on free.
    pub status: u64,
}

impl LabelEntity {
    pub const NONE_STATUS: u64 = 0;
}

impl Default for LabelEntity {
    fn default() -> Self {
        Self {
            label: IdManager::INVALID_ID,
            status: Self::NONE_STATUS,
        }
    }
}

// ============================================================================
// Id Manager
// ============================================================================

/// Bijective label ↔ lid mapping with smallest-first free-list reuse.
pub struct IdManager {
    free_ids: BTreeSet<u64>,
    ids: Vec<LabelEntity>,
    next_id: u64,
    reserved_id: u64,
    id_map: HashMap<u64, u64>,
    initialized: bool,
}

impl IdManager {
    /// Free-slot sentinel; never a valid label.
    pub const INVALID_ID: u64 = u64::MAX;

    /// Growth step when the pool must expand.
    pub const DEFAULT_GROWTH: u64 = 256;

    pub fn new() -> Self {
        Self {
            free_ids: BTreeSet::new(),
            ids: Vec::new(),
            next_id: 0,
            reserved_id: 0,
            id_map: HashMap::new(),
            initialized: false,
        }
    }

    /// One-shot initialization from an existing pool.
    ///
    /// Grows the pool to `next_id + DEFAULT_GROWTH` when undersized, then
    /// scans the active range once to rebuild the free set and label map.
    /// Calling again is a no-op.
    pub fn initialize(&mut self, entities: Vec<LabelEntity>, reserved_id: u64, next_id: u64) {
        if self.initialized {
            return;
        }
        self.ids = entities;
        self.next_id = next_id;
        self.reserved_id = reserved_id;
        if (self.ids.len() as u64) < self.next_id {
            self.resize((self.next_id + Self::DEFAULT_GROWTH) as usize);
        }
        for lid in self.reserved_id..self.next_id {
            let entity = self.ids[lid as usize];
            if entity.label == Self::INVALID_ID {
                self.free_ids.insert(lid);
            } else {
                self.id_map.insert(entity.label, lid);
            }
        }
        self.initialized = true;
    }

    /// Expand the pool to `n` slots; smaller `n` is a no-op. New slots are
    /// free-sentineled.
    pub fn resize(&mut self, n: usize) {
        if n > self.ids.len() {
            self.ids.resize(n, LabelEntity::default());
        }
    }

    /// Append `n` free slots to the pool.
    pub fn grow(&mut self, n: usize) {
        let old = self.ids.len();
        self.ids.resize(old + n, LabelEntity::default());
    }

    /// Allocate a lid for `label`.
    ///
    /// Reuses the smallest free lid when one exists, otherwise takes
    /// `next_id`; fails with `AlreadyExists` for a duplicate label and
    /// `ResourceExhausted` when the pool is full.
    pub fn alloc_id(&mut self, label: u64) -> Result<u64> {
        assert!(self.initialized, "must call initialize() first");
        if self.id_map.contains_key(&label) {
            return Err(AxonError::AlreadyExists(format!(
                "label already exists: {label}"
            )));
        }
        let lid = if let Some(smallest) = self.free_ids.pop_first() {
            smallest
        } else {
            if self.next_id >= self.ids.len() as u64 {
                return Err(AxonError::ResourceExhausted(format!(
                    "no id left to allocate: {}",
                    self.next_id
                )));
            }
            let lid = self.next_id;
            self.next_id += 1;
            lid
        };
        self.id_map.insert(label, lid);
        self.ids[lid as usize].label = label;
        Ok(lid)
    }

    /// Free the lid bound to `label`. No-op when the label is unknown;
    /// reserved-range bindings are unbound but their slots never enter the
    /// free set.
    pub fn free_id(&mut self, label: u64) {
        assert!(self.initialized, "must call initialize() first");
        let Some(lid) = self.id_map.remove(&label) else {
            return;
        };
        if lid < self.reserved_id || lid >= self.ids.len() as u64 {
            return;
        }
        self.release_slot(lid);
    }

    /// Free a lid directly. No-op outside the active range or on an
    /// already-free slot; the reserved range is never released.
    pub fn free_local_id(&mut self, lid: u64) {
        assert!(self.initialized, "must call initialize() first");
        if lid < self.reserved_id || lid >= self.next_id {
            return;
        }
        let label = self.ids[lid as usize].label;
        if label == Self::INVALID_ID {
            return;
        }
        self.id_map.remove(&label);
        self.release_slot(lid);
    }

    fn release_slot(&mut self, lid: u64) {
        let entity = &mut self.ids[lid as usize];
        entity.label = Self::INVALID_ID;
        entity.status = LabelEntity::NONE_STATUS;
        self.free_ids.insert(lid);
        self.shrink_next_id();
    }

    /// Pop trailing free lids off the active range, stopping at `reserved`.
    fn shrink_next_id(&mut self) {
        while self.next_id > self.reserved_id {
            if !self.free_ids.remove(&(self.next_id - 1)) {
                break;
            }
            self.next_id -= 1;
        }
    }

    /// Lid bound to `label`, or `OutOfRange`.
    pub fn local_id(&self, label: u64) -> Result<u64> {
        self.id_map
            .get(&label)
            .copied()
            .ok_or_else(|| AxonError::OutOfRange(format!("label not found: {label}")))
    }

    /// Slot contents for `label`, or `OutOfRange`.
    pub fn label_entity(&self, label: u64) -> Result<LabelEntity> {
        let lid = self.local_id(label)?;
        self.local_entity(lid)
    }

    /// Slot contents for `lid`, or `OutOfRange` beyond the pool.
    pub fn local_entity(&self, lid: u64) -> Result<LabelEntity> {
        self.ids
            .get(lid as usize)
            .copied()
            .ok_or_else(|| AxonError::OutOfRange(format!("lid not found: {lid}")))
    }

    /// Set the status word for `label`. No-op when the label is unknown.
    pub fn set_label_status(&mut self, label: u64, status: u64) {
        if let Some(&lid) = self.id_map.get(&label) {
            self.set_local_id_status(lid, status);
        }
    }

    /// Set the status word for `lid`. No-op beyond the pool.
    pub fn set_local_id_status(&mut self, lid: u64, status: u64) {
        assert!(self.initialized, "must call initialize() first");
        if let Some(entity) = self.ids.get_mut(lid as usize) {
            entity.status = status;
        }
    }

    /// Bind a label inside the locked reserved range. The only sanctioned
    /// way to populate `[0, reserved)`.
    pub fn set_reserved_id(&mut self, lid: u64, label: u64) {
        assert!(lid < self.reserved_id, "lid outside the reserved range");
        self.id_map.insert(label, lid);
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn reserved_id(&self) -> u64 {
        self.reserved_id
    }

    /// The whole id pool, for serializer introspection.
    pub fn ids(&self) -> &[LabelEntity] {
        &self.ids
    }

    /// Label → lid map, for serializer introspection.
    pub fn id_map(&self) -> &HashMap<u64, u64> {
        &self.id_map
    }

    /// Free lids within the active range, smallest first.
    pub fn free_ids(&self) -> &BTreeSet<u64> {
        &self.free_ids
    }
}

impl Default for IdManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // mirrors MemStore::new, which seeds the active range with one free slot
    fn manager(reserved: u64) -> IdManager {
        let mut m = IdManager::new();
        m.initialize(Vec::new(), reserved, reserved + 1);
        m
    }

    #[test]
    fn test_sequential_allocation() {
        let mut m = manager(2);
        for i in 0..5 {
            let lid = m.alloc_id(100 + i).unwrap();
            assert_eq!(lid, 2 + i);
        }
        assert_eq!(m.next_id(), 7);
    }

    #[test]
    fn test_duplicate_label() {
        let mut m = manager(0);
        m.alloc_id(42).unwrap();
        assert!(matches!(
            m.alloc_id(42),
            Err(AxonError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_free_then_realloc_same_lid() {
        let mut m = manager(0);
        let lid = m.alloc_id(7).unwrap();
        m.alloc_id(8).unwrap();
        m.free_id(7);
        assert!(m.free_ids().contains(&lid));
        // smallest free lid is reused
        assert_eq!(m.alloc_id(7).unwrap(), lid);
    }

    #[test]
    fn test_trailing_free_shrinks_next_id() {
        let mut m = manager(1);
        for i in 0..4 {
            m.alloc_id(100 + i).unwrap();
        }
        assert_eq!(m.next_id(), 5);
        // freeing the two trailing lids shrinks next_id by 2
        m.free_id(103);
        m.free_id(102);
        assert_eq!(m.next_id(), 3);
        assert!(m.free_ids().is_empty());
        // freeing a non-trailing lid does not shrink
        m.free_id(100);
        assert_eq!(m.next_id(), 3);
        assert!(m.free_ids().contains(&1));
    }

    #[test]
    fn test_shrink_stops_at_reserved() {
        let mut m = manager(3);
        m.alloc_id(1).unwrap();
        m.free_id(1);
        assert_eq!(m.next_id(), 3);
        m.free_local_id(2); // reserved range, ignored
        assert_eq!(m.next_id(), 3);
        assert!(m.free_ids().is_empty());
    }

    #[test]
    fn test_exhaustion() {
        let mut m = IdManager::new();
        m.initialize(Vec::new(), 0, 0);
        m.resize(2);
        m.alloc_id(1).unwrap();
        m.alloc_id(2).unwrap();
        assert!(matches!(
            m.alloc_id(3),
            Err(AxonError::ResourceExhausted(_))
        ));
        m.grow(1);
        assert!(m.alloc_id(3).is_ok());
    }

    #[test]
    fn test_free_miss_is_noop() {
        let mut m = manager(0);
        m.alloc_id(5).unwrap();
        m.free_id(999);
        m.free_local_id(999);
        assert_eq!(m.id_map().len(), 1);
    }

    #[test]
    fn test_free_local_id_ignores_free_slot() {
        let mut m = manager(0);
        m.alloc_id(5).unwrap();
        m.alloc_id(6).unwrap();
        m.free_local_id(0);
        let free_before = m.free_ids().len();
        m.free_local_id(0); // already free
        assert_eq!(m.free_ids().len(), free_before);
    }

    #[test]
    fn test_status_round_trip() {
        let mut m = manager(0);
        let lid = m.alloc_id(5).unwrap();
        m.set_label_status(5, 0b10);
        assert_eq!(m.label_entity(5).unwrap().status, 0b10);
        m.set_local_id_status(lid, 0b100);
        assert_eq!(m.local_entity(lid).unwrap().status, 0b100);
        // status resets when the slot is freed
        m.free_id(5);
        // miss semantics are symmetric no-ops
        m.set_label_status(5, 1);
        assert!(m.label_entity(5).is_err());
    }

    #[test]
    fn test_initialize_idempotent() {
        let mut m = IdManager::new();
        m.initialize(Vec::new(), 1, 1);
        m.alloc_id(9).unwrap();
        m.initialize(Vec::new(), 0, 0); // ignored
        assert_eq!(m.reserved_id(), 1);
        assert_eq!(m.local_id(9).unwrap(), 1);
    }

    #[test]
    fn test_initialize_rebuilds_from_existing_pool() {
        let mut entities = vec![LabelEntity::default(); 6];
        entities[1] = LabelEntity { label: 10, status: 0 };
        entities[3] = LabelEntity { label: 30, status: 7 };
        let mut m = IdManager::new();
        m.initialize(entities, 1, 4);

        assert_eq!(m.local_id(10).unwrap(), 1);
        assert_eq!(m.local_id(30).unwrap(), 3);
        // slot 2 was free in the active range
        assert!(m.free_ids().contains(&2));
        assert_eq!(m.free_ids().len(), 1);
        // next alloc reuses it
        assert_eq!(m.alloc_id(20).unwrap(), 2);
    }

    #[test]
    fn test_set_reserved_id() {
        let mut m = manager(2);
        m.set_reserved_id(0, 777);
        assert_eq!(m.local_id(777).unwrap(), 0);
    }

    #[test]
    #[should_panic]
    fn test_set_reserved_id_outside_range() {
        let mut m = manager(1);
        m.set_reserved_id(1, 777);
    }

    #[test]
    #[should_panic]
    fn test_alloc_before_initialize() {
        let mut m = IdManager::new();
        let _ = m.alloc_id(1);
    }

    #[test]
    fn test_random_churn_preserves_partition() {
        use rand::{Rng, SeedableRng};
        use std::collections::HashSet;

        let mut rng = rand::rngs::StdRng::seed_from_u64(97);
        let mut m = manager(4);
        m.resize(512);
        let mut live: HashSet<u64> = HashSet::new();

        for _ in 0..2000 {
            let label = rng.gen_range(0..200u64);
            if rng.gen_bool(0.6) {
                match m.alloc_id(label) {
                    Ok(_) => {
                        assert!(live.insert(label));
                    }
                    Err(AxonError::AlreadyExists(_)) => assert!(live.contains(&label)),
                    Err(e) => panic!("unexpected error: {e}"),
                }
            } else {
                m.free_id(label);
                live.remove(&label);
            }
        }

        assert_eq!(m.id_map().len(), live.len());
        // the free set and the label map partition the active range exactly
        let active = (m.next_id() - m.reserved_id()) as usize;
        assert_eq!(m.free_ids().len() + m.id_map().len(), active);
        for lid in m.free_ids() {
            assert!(*lid >= m.reserved_id() && *lid < m.next_id());
            assert_eq!(m.ids()[*lid as usize].label, IdManager::INVALID_ID);
        }
        for label in &live {
            let lid = m.local_id(*label).unwrap();
            assert_eq!(m.ids()[lid as usize].label, *label);
        }
    }
}
