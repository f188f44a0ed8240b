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

//! AxonDB numeric core: distance kernels, operator registry, vector space.
//!
//! This crate is the compute half of the substrate beneath an ANN vector
//! engine. It owns no vector storage; it resolves *how* distances are
//! computed for a given (metric, element type, SIMD tier) configuration.
//!
//! # Architecture
//!
//! - [`kernels`]: scalar reference kernels for every metric plus explicit
//!   SSE4.1/AVX2/AVX-512 f32 variants written with `core::arch` intrinsics.
//! - [`registry`]: the operator capability table, built once at startup,
//!   frozen with `finish_build`, then shared read-only.
//! - [`space`]: per-engine configuration resolving dimension, metric, data
//!   type and tier into a byte layout and operator bindings, plus the
//!   64-byte aligned allocation facility the SIMD kernels rely on.
//!
//! All SIMD code is pure Rust using `core::arch` intrinsics with runtime
//! feature detection; unsupported tiers are simply never registered, so a
//! lookup for them fails instead of silently falling back.
//!
//! ```
//! use axondb_core::{DataType, MetricType, OperatorRegistry, SimdLevel, VectorSpace};
//!
//! let mut registry = OperatorRegistry::with_builtins().unwrap();
//! registry.finish_build();
//!
//! let space = VectorSpace::create(
//!     &registry, 128, MetricType::L2, DataType::F32, SimdLevel::None,
//! ).unwrap();
//! let a = space.alloc_aligned_vectors(1).unwrap();
//! let b = space.alloc_aligned_vectors(1).unwrap();
//! assert_eq!(space.distance(&a, &b).unwrap(), 0.0);
//! ```

pub mod error;
pub mod kernels;
pub mod registry;
pub mod space;
pub mod types;

pub use error::{AxonError, Result};
pub use registry::{DistanceFn, NormFn, NormalizeFn, OperatorEntity, OperatorRegistry};
pub use space::{AlignedBytes, VectorSpace, ALIGNMENT_BYTES};
pub use types::{
    cpu_features, CpuFeatures, DataType, MetricType, SimdLevel, DATA_TYPE_COUNT,
    METRIC_TYPE_COUNT, SIMD_LEVEL_COUNT,
};
