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

//! In-memory vector store: id manager + vector space + growable batches.
//!
//! A global local id maps to storage as
//! `(batch = lid / batch_size, slot = lid % batch_size)`. Batches are
//! allocated on demand up to the configured `max_elements` ceiling and never
//! shrink; logical deletion is a status bit on the id slot (tombstone),
//! physical deletion releases the lid for reuse.
//!
//! # Locking contract
//!
//! The store performs no internal synchronization. Mutations take `&mut
//! self` and reads take `&self`; concurrent use goes through one
//! readers-writer lock covering the store, its batches, and its id manager
//! (the [`SharedMemStore`] alias). Externalizing the lock lets a caller batch
//! several operations under a single critical section. The mutation methods
//! accept a caller-supplied `snapshot_id` stamped on every change so that a
//! serializer can detect the most recent persisted state.

use std::sync::Arc;

use axondb_core::{AxonError, Result, VectorSpace};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::batch::VectorBatch;
use crate::id_manager::{IdManager, LabelEntity};
use crate::metrics;

/// Caller-defined status bit marking a logically deleted vector.
pub const TOMBSTONE: u64 = 1;

/// Store configuration supplied by the owning index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Locked lid count at the bottom of the id pool.
    pub reserved: u64,
    /// Vectors per allocation unit.
    pub batch_size: u64,
    /// Hard capacity ceiling in vectors.
    pub max_elements: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            reserved: 0,
            batch_size: 1024,
            max_elements: 1 << 20,
        }
    }
}

/// The sanctioned shared wrapper: shared lock for reads, exclusive for
/// mutations.
pub type SharedMemStore = Arc<RwLock<MemStore>>;

/// Batch-allocated raw vector storage addressed by local id.
pub struct MemStore {
    space: Arc<VectorSpace>,
    batches: Vec<VectorBatch>,
    id_manager: IdManager,
    options: StoreOptions,
    snapshot_id: u64,
}

impl MemStore {
    /// Create a store against an externally owned vector space.
    pub fn new(space: Arc<VectorSpace>, options: StoreOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(AxonError::InvalidArgument(
                "batch_size must be positive".to_string(),
            ));
        }
        if options.max_elements == 0 {
            return Err(AxonError::InvalidArgument(
                "max_elements must be positive".to_string(),
            ));
        }
        let mut id_manager = IdManager::new();
        id_manager.initialize(Vec::new(), options.reserved, options.reserved + 1);
        Ok(Self {
            space,
            batches: Vec::new(),
            id_manager,
            options,
            snapshot_id: 0,
        })
    }

    /// Add a vector under a fresh label. Returns the allocated lid.
    pub fn add_vector(&mut self, snapshot_id: u64, label: u64, vector: &[u8]) -> Result<u64> {
        self.check_vector_len(vector)?;
        let lid = self.id_manager.alloc_id(label)?;
        let (bi, si) = match self.ensure_capacity(lid) {
            Ok(pos) => pos,
            Err(e) => {
                // the failed lid must not stay bound
                self.id_manager.free_local_id(lid);
                return Err(e);
            }
        };
        let slot = self.batches[bi]
            .at_mut(si)
            .ok_or_else(|| AxonError::OutOfRange(format!("slot {si} out of batch range")))?;
        slot[..vector.len()].copy_from_slice(vector);
        self.snapshot_id = snapshot_id;
        metrics::STORE_ADDS.inc();
        metrics::update_occupancy(self.size(), self.allocated_bytes());
        Ok(lid)
    }

    /// Overwrite the vector bound to an existing label in place.
    pub fn set_vector(&mut self, snapshot_id: u64, label: u64, vector: &[u8]) -> Result<u64> {
        self.check_vector_len(vector)?;
        let lid = self.id_manager.local_id(label)?;
        let bi = (lid / self.options.batch_size) as usize;
        let si = (lid % self.options.batch_size) as usize;
        let slot = self
            .batches
            .get_mut(bi)
            .and_then(|b| b.at_mut(si))
            .ok_or_else(|| {
                AxonError::OutOfRange(format!("vector out of range, lid: {lid} label: {label}"))
            })?;
        slot[..vector.len()].copy_from_slice(vector);
        self.snapshot_id = snapshot_id;
        Ok(lid)
    }

    /// Release the lid bound to `label`. No-op on miss.
    pub fn remove_vector_by_label(&mut self, snapshot_id: u64, label: u64) {
        self.id_manager.free_id(label);
        self.snapshot_id = snapshot_id;
        metrics::STORE_REMOVES.inc();
        metrics::update_occupancy(self.size(), self.allocated_bytes());
    }

    /// Release a lid directly. No-op on miss.
    pub fn remove_vector_by_id(&mut self, snapshot_id: u64, lid: u64) {
        self.id_manager.free_local_id(lid);
        self.snapshot_id = snapshot_id;
        metrics::STORE_REMOVES.inc();
        metrics::update_occupancy(self.size(), self.allocated_bytes());
    }

    /// Mark the vector bound to `label` logically deleted without releasing
    /// its slot. No-op on miss.
    pub fn tombstone_vector_by_label(&mut self, snapshot_id: u64, label: u64) {
        self.id_manager.set_label_status(label, TOMBSTONE);
        self.snapshot_id = snapshot_id;
        metrics::STORE_TOMBSTONES.inc();
    }

    /// Mark a lid logically deleted. No-op on miss.
    pub fn tombstone_vector_by_id(&mut self, snapshot_id: u64, lid: u64) {
        self.id_manager.set_local_id_status(lid, TOMBSTONE);
        self.snapshot_id = snapshot_id;
        metrics::STORE_TOMBSTONES.inc();
    }

    /// Label stored at `lid`, or `OutOfRange` past the pool.
    pub fn get_label(&self, lid: u64) -> Result<u64> {
        Ok(self.id_manager.local_entity(lid)?.label)
    }

    /// Lid bound to `label`, or `OutOfRange`.
    pub fn get_id(&self, label: u64) -> Result<u64> {
        self.id_manager.local_id(label)
    }

    /// Backing byte span for `label`, or `OutOfRange` if unallocated.
    pub fn get_vector_by_label(&self, label: u64) -> Result<&[u8]> {
        let lid = self.id_manager.local_id(label)?;
        self.vector_slot(lid)
    }

    /// Backing byte span for `lid`, or `OutOfRange` if no batch backs it.
    pub fn get_vector_by_id(&self, lid: u64) -> Result<&[u8]> {
        self.vector_slot(lid)
    }

    fn vector_slot(&self, lid: u64) -> Result<&[u8]> {
        let bi = (lid / self.options.batch_size) as usize;
        let si = (lid % self.options.batch_size) as usize;
        self.batches
            .get(bi)
            .and_then(|b| b.at(si))
            .ok_or_else(|| AxonError::OutOfRange(format!("vector out of range, lid: {lid}")))
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    /// Count of live label bindings.
    pub fn size(&self) -> u64 {
        self.id_manager.id_map().len() as u64
    }

    /// Live bindings × per-vector stride.
    pub fn bytes_size(&self) -> u64 {
        self.size() * self.space.vector_byte_size as u64
    }

    /// Physical capacity across all batches, in bytes.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_vector_size() * self.space.vector_byte_size as u64
    }

    /// Physical capacity across all batches, in vectors.
    pub fn allocated_vector_size(&self) -> u64 {
        self.batches.len() as u64 * self.options.batch_size
    }

    /// Allocated slots not bound to a live label.
    pub fn free_vector_size(&self) -> u64 {
        self.allocated_vector_size().saturating_sub(self.size())
    }

    /// [`free_vector_size`](Self::free_vector_size) in bytes.
    pub fn free_bytes(&self) -> u64 {
        self.free_vector_size() * self.space.vector_byte_size as u64
    }

    /// Count of tombstoned slots in the active range.
    pub fn tombstones(&self) -> u64 {
        self.scan_tombstones().count() as u64
    }

    /// Lids of tombstoned slots, ascending.
    pub fn tombstone_local_ids(&self) -> Vec<u64> {
        self.scan_tombstones().map(|(lid, _)| lid).collect()
    }

    /// Labels of tombstoned slots, in lid order.
    pub fn tombstone_labels(&self) -> Vec<u64> {
        self.scan_tombstones()
            .map(|(_, entity)| entity.label)
            .collect()
    }

    fn scan_tombstones(&self) -> impl Iterator<Item = (u64, LabelEntity)> + '_ {
        let ids = self.id_manager.ids();
        let end = (ids.len() as u64).min(self.id_manager.next_id());
        (self.id_manager.reserved_id()..end).filter_map(move |lid| {
            let entity = ids[lid as usize];
            (entity.status == TOMBSTONE).then_some((lid, entity))
        })
    }

    // ------------------------------------------------------------------
    // Introspection (serializer surface)
    // ------------------------------------------------------------------

    pub fn vector_space(&self) -> &Arc<VectorSpace> {
        &self.space
    }

    pub fn batches(&self) -> &[VectorBatch] {
        &self.batches
    }

    pub fn id_manager(&self) -> &IdManager {
        &self.id_manager
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Snapshot marker of the most recent mutation.
    pub fn snapshot_id(&self) -> u64 {
        self.snapshot_id
    }

    // ------------------------------------------------------------------

    fn check_vector_len(&self, vector: &[u8]) -> Result<()> {
        let len = vector.len();
        if len != self.space.data_byte_size() && len != self.space.vector_byte_size {
            return Err(AxonError::InvalidArgument(format!(
                "vector length {len} does not match space ({} logical / {} padded)",
                self.space.data_byte_size(),
                self.space.vector_byte_size
            )));
        }
        Ok(())
    }

    /// Grow batch storage to back `lid`, bounded by `max_elements`.
    fn ensure_capacity(&mut self, lid: u64) -> Result<(usize, usize)> {
        if lid >= self.options.max_elements {
            tracing::warn!(
                lid,
                max_elements = self.options.max_elements,
                "store capacity ceiling reached"
            );
            return Err(AxonError::OutOfRange(format!(
                "lid {lid} exceeds max elements {}",
                self.options.max_elements
            )));
        }
        let bi = (lid / self.options.batch_size) as usize;
        let si = (lid % self.options.batch_size) as usize;
        while self.batches.len() <= bi {
            let batch = VectorBatch::new(
                self.space.vector_byte_size,
                self.options.batch_size as usize,
            )?;
            self.batches.push(batch);
            tracing::debug!(
                batches = self.batches.len(),
                capacity = self.allocated_vector_size(),
                "vector batch allocated"
            );
        }
        Ok((bi, si))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axondb_core::{DataType, MetricType, OperatorRegistry, SimdLevel};

    fn f32_space(dim: usize) -> Arc<VectorSpace> {
        let registry = OperatorRegistry::with_builtins().unwrap();
        Arc::new(
            VectorSpace::create(&registry, dim, MetricType::L2, DataType::F32, SimdLevel::None)
                .unwrap(),
        )
    }

    fn vec_bytes(dim: usize, fill: f32) -> Vec<u8> {
        (0..dim).flat_map(|_| fill.to_ne_bytes()).collect()
    }

    fn small_store() -> MemStore {
        MemStore::new(
            f32_space(4),
            StoreOptions {
                reserved: 1,
                batch_size: 4,
                max_elements: 16,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_add_then_get_roundtrip() {
        let mut store = small_store();
        let payload = vec_bytes(4, 3.25);
        let lid = store.add_vector(1, 100, &payload).unwrap();

        let got = store.get_vector_by_label(100).unwrap();
        assert_eq!(&got[..payload.len()], &payload[..]);
        assert_eq!(store.get_vector_by_id(lid).unwrap(), got);
        assert_eq!(store.get_id(100).unwrap(), lid);
        assert_eq!(store.get_label(lid).unwrap(), 100);
        assert_eq!(store.snapshot_id(), 1);
    }

    #[test]
    fn test_set_vector_overwrites_in_place() {
        let mut store = small_store();
        let lid = store.add_vector(1, 100, &vec_bytes(4, 1.0)).unwrap();

        let newer = vec_bytes(4, 9.0);
        let set_lid = store.set_vector(2, 100, &newer).unwrap();
        assert_eq!(set_lid, lid);
        assert_eq!(store.size(), 1);
        let got = store.get_vector_by_label(100).unwrap();
        assert_eq!(&got[..newer.len()], &newer[..]);
        assert_eq!(store.snapshot_id(), 2);
    }

    #[test]
    fn test_set_vector_requires_existing_label() {
        let mut store = small_store();
        assert!(matches!(
            store.set_vector(1, 555, &vec_bytes(4, 1.0)),
            Err(AxonError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_add_duplicate_label() {
        let mut store = small_store();
        store.add_vector(1, 100, &vec_bytes(4, 1.0)).unwrap();
        assert!(matches!(
            store.add_vector(2, 100, &vec_bytes(4, 2.0)),
            Err(AxonError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_bad_vector_length() {
        let mut store = small_store();
        assert!(matches!(
            store.add_vector(1, 100, &[0u8; 7]),
            Err(AxonError::InvalidArgument(_))
        ));
        // padded stride is also accepted
        let padded = vec![0u8; store.vector_space().vector_byte_size];
        assert!(store.add_vector(1, 101, &padded).is_ok());
    }

    #[test]
    fn test_remove_then_lookup_fails() {
        let mut store = small_store();
        let lid = store.add_vector(1, 100, &vec_bytes(4, 1.0)).unwrap();
        store.remove_vector_by_label(2, 100);

        assert!(matches!(
            store.get_vector_by_label(100),
            Err(AxonError::OutOfRange(_))
        ));
        assert!(store.get_id(100).is_err());
        assert!(
            store.id_manager().free_ids().contains(&lid)
                || lid >= store.id_manager().next_id()
        );
        // removing again is a no-op
        store.remove_vector_by_id(3, lid);
        assert_eq!(store.snapshot_id(), 3);
    }

    #[test]
    fn test_tombstones() {
        let mut store = small_store();
        let lid = store.add_vector(1, 100, &vec_bytes(4, 1.0)).unwrap();
        store.add_vector(2, 101, &vec_bytes(4, 2.0)).unwrap();

        store.tombstone_vector_by_label(3, 100);
        assert_eq!(store.tombstones(), 1);
        assert_eq!(store.tombstone_local_ids(), vec![lid]);
        assert_eq!(store.tombstone_labels(), vec![100]);
        // the slot stays allocated and readable
        assert!(store.get_vector_by_label(100).is_ok());
        assert_eq!(store.size(), 2);

        // tombstone by id and miss semantics
        store.tombstone_vector_by_id(4, 999);
        assert_eq!(store.tombstones(), 1);

        // physical removal clears the status
        store.remove_vector_by_label(5, 100);
        assert_eq!(store.tombstones(), 0);
    }

    #[test]
    fn test_capacity_ceiling() {
        let mut store = MemStore::new(
            f32_space(4),
            StoreOptions {
                reserved: 0,
                batch_size: 2,
                max_elements: 2,
            },
        )
        .unwrap();
        store.add_vector(1, 1, &vec_bytes(4, 1.0)).unwrap();
        store.add_vector(2, 2, &vec_bytes(4, 2.0)).unwrap();
        assert!(matches!(
            store.add_vector(3, 3, &vec_bytes(4, 3.0)),
            Err(AxonError::OutOfRange(_))
        ));
        // the failed label is not left bound
        assert!(store.get_id(3).is_err());
        assert_eq!(store.size(), 2);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut store = small_store();

        for (i, label) in (100u64..105).enumerate() {
            store
                .add_vector(i as u64 + 1, label, &vec_bytes(4, label as f32))
                .unwrap();
        }
        assert_eq!(store.batches().len(), 2);
        assert_eq!(store.size(), 5);
        assert_eq!(store.allocated_vector_size(), 8);
        assert_eq!(store.free_vector_size(), 3);
        assert_eq!(
            store.bytes_size(),
            5 * store.vector_space().vector_byte_size as u64
        );
        assert_eq!(
            store.allocated_bytes(),
            8 * store.vector_space().vector_byte_size as u64
        );

        let lid = store.get_id(101).unwrap();
        store.remove_vector_by_label(6, 101);
        assert_eq!(store.size(), 4);
        assert_eq!(store.free_vector_size(), 4);
        assert!(matches!(
            store.get_vector_by_label(101),
            Err(AxonError::OutOfRange(_))
        ));
        assert!(store.id_manager().free_ids().contains(&lid));
    }

    #[test]
    fn test_sequential_lids_from_reserved() {
        let mut store = small_store();
        for (i, label) in (200u64..204).enumerate() {
            let lid = store
                .add_vector(i as u64 + 1, label, &vec_bytes(4, 0.5))
                .unwrap();
            assert_eq!(lid, 1 + i as u64);
        }
    }

    #[test]
    fn test_distance_over_stored_vectors() {
        let space = f32_space(4);
        let mut store = MemStore::new(Arc::clone(&space), StoreOptions::default()).unwrap();

        store.add_vector(1, 10, &vec_bytes(4, 1.0)).unwrap();
        store.add_vector(2, 20, &vec_bytes(4, 3.0)).unwrap();

        let a = store.get_vector_by_label(10).unwrap();
        let b = store.get_vector_by_label(20).unwrap();
        // stored slots are full padded strides from the aligned allocator
        assert_eq!(a.len(), space.vector_byte_size);
        let d = space.distance(a, b).unwrap();
        assert!((d - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_concurrent_readers_see_consistent_vectors() {
        use std::thread;

        let store: SharedMemStore = Arc::new(RwLock::new(small_store()));
        store
            .write()
            .add_vector(1, 100, &vec![0x11u8; 16])
            .unwrap();

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..500u64 {
                    let fill = if i % 2 == 0 { 0x22u8 } else { 0x11u8 };
                    store.write().set_vector(i + 2, 100, &vec![fill; 16]).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let guard = store.read();
                        let bytes = guard.get_vector_by_label(100).unwrap();
                        let first = bytes[0];
                        // a shared lock never observes a torn write
                        assert!(bytes[..16].iter().all(|&b| b == first));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
