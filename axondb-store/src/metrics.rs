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

//! Prometheus metrics for the memory store.
//!
//! Mutation paths update counters and occupancy gauges; distance computation
//! never touches these.

use lazy_static::lazy_static;
use prometheus::{register_counter, register_gauge, Counter, Gauge};

lazy_static! {
    pub static ref STORE_ADDS: Counter = register_counter!(
        "axon_store_adds_total",
        "Total vectors added to the store"
    )
    .unwrap();

    pub static ref STORE_REMOVES: Counter = register_counter!(
        "axon_store_removes_total",
        "Total vectors removed from the store"
    )
    .unwrap();

    pub static ref STORE_TOMBSTONES: Counter = register_counter!(
        "axon_store_tombstones_total",
        "Total tombstone markings"
    )
    .unwrap();

    pub static ref STORE_VECTORS: Gauge = register_gauge!(
        "axon_store_vectors",
        "Live label bindings in the store"
    )
    .unwrap();

    pub static ref STORE_ALLOCATED_BYTES: Gauge = register_gauge!(
        "axon_store_allocated_bytes",
        "Physical batch capacity in bytes"
    )
    .unwrap();
}

/// Refresh occupancy gauges after a mutation.
pub fn update_occupancy(vectors: u64, allocated_bytes: u64) {
    STORE_VECTORS.set(vectors as f64);
    STORE_ALLOCATED_BYTES.set(allocated_bytes as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_accessible() {
        STORE_ADDS.inc();
        STORE_REMOVES.inc();
        STORE_TOMBSTONES.inc();
        update_occupancy(10, 4096);
    }
}
