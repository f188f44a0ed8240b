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

//! AxonDB storage layer: identifier management and batch-allocated vector
//! storage.
//!
//! Composes three pieces over the numeric core:
//!
//! - [`id_manager`]: bijective label ↔ local-id mapping with smallest-first
//!   free-list reuse, a locked reserved range, and trailing compaction.
//! - [`batch`]: fixed-capacity, fixed-stride, 64-byte aligned vector
//!   blocks, the store's unit of growth.
//! - [`store`]: the memory store: add/set/remove/tombstone/lookup plus
//!   occupancy statistics, addressed by `lid = batch * batch_size + slot`.
//!
//! The store is not internally synchronized; wrap it in
//! [`store::SharedMemStore`] and hold a shared lock for reads, an exclusive
//! lock for mutations. See the [`store`] module docs for the contract.

pub mod batch;
pub mod id_manager;
pub mod metrics;
pub mod store;

pub use batch::VectorBatch;
pub use id_manager::{IdManager, LabelEntity};
pub use store::{MemStore, SharedMemStore, StoreOptions, TOMBSTONE};
