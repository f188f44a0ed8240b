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

//! Fixed-capacity aligned vector block, the store's unit of growth.

use axondb_core::{AlignedBytes, Result, ALIGNMENT_BYTES};

/// A batch of `capacity` vector slots of `vector_byte_size` bytes each,
/// 64-byte aligned and zero-initialized. Capacity is fixed at construction;
/// the block is released when the batch drops.
pub struct VectorBatch {
    vector_byte_size: usize,
    capacity: usize,
    data: AlignedBytes,
}

impl VectorBatch {
    /// Allocate a batch. Allocation failure surfaces as `Unavailable`.
    pub fn new(vector_byte_size: usize, capacity: usize) -> Result<Self> {
        let data = AlignedBytes::new(vector_byte_size * capacity, ALIGNMENT_BYTES)?;
        Ok(Self {
            vector_byte_size,
            capacity,
            data,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn vector_byte_size(&self) -> usize {
        self.vector_byte_size
    }

    /// Slot `index`, or `None` past capacity.
    pub fn at(&self, index: usize) -> Option<&[u8]> {
        if index >= self.capacity {
            return None;
        }
        let start = index * self.vector_byte_size;
        Some(&self.data[start..start + self.vector_byte_size])
    }

    /// Mutable slot `index`, or `None` past capacity.
    pub fn at_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        if index >= self.capacity {
            return None;
        }
        let start = index * self.vector_byte_size;
        Some(&mut self.data[start..start + self.vector_byte_size])
    }

    /// Zero slot `index`. No-op past capacity.
    pub fn clear(&mut self, index: usize) {
        if let Some(slot) = self.at_mut(index) {
            slot.fill(0);
        }
    }

    /// Copy `value` into slot `index`. No-op past capacity; `value` must not
    /// exceed the slot stride.
    pub fn set(&mut self, index: usize, value: &[u8]) {
        if let Some(slot) = self.at_mut(index) {
            slot[..value.len()].copy_from_slice(value);
        }
    }

    /// The whole block, for serializer introspection.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
