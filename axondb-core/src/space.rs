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

//! Vector space configuration and aligned allocation.
//!
//! A [`VectorSpace`] resolves (dimension, metric, data type, SIMD tier) into
//! a concrete byte layout (element size, 64-byte padded stride) and two
//! operator bindings: the tier-`None` *standard* operator kept as the
//! portable reference, and the *active* operator selected for the requested
//! tier. Spaces are immutable after construction and safely shared across
//! threads; vector storage lifetime belongs to consumers (the memory store).

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::error::{AxonError, Result};
use crate::registry::{OperatorEntity, OperatorRegistry};
use crate::types::{DataType, MetricType, SimdLevel};

/// Vector stride alignment: one cache line, wide enough for AVX-512 loads.
pub const ALIGNMENT_BYTES: usize = 64;

// ============================================================================
// Aligned Allocation
// ============================================================================

/// A zero-initialized aligned heap block, released on drop.
pub struct AlignedBytes {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

impl AlignedBytes {
    /// Allocate `len` zeroed bytes at the given alignment.
    pub fn new(len: usize, alignment: usize) -> Result<Self> {
        if len == 0 {
            return Err(AxonError::InvalidArgument(
                "zero-size aligned allocation".to_string(),
            ));
        }
        let layout = Layout::from_size_align(len, alignment)
            .map_err(|e| AxonError::InvalidArgument(format!("bad layout: {e}")))?;
        let ptr = unsafe { alloc_zeroed(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => Ok(Self { ptr, len, layout }),
            None => Err(AxonError::Unavailable(format!(
                "aligned allocation of {len} bytes failed"
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Deref for AlignedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBytes {
    fn deref_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBytes {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

// The block is uniquely owned; access follows &/&mut borrows.
unsafe impl Send for AlignedBytes {}
unsafe impl Sync for AlignedBytes {}

// ============================================================================
// Vector Space
// ============================================================================

/// Per-engine vector configuration with resolved operator bindings.
#[derive(Debug, Clone)]
pub struct VectorSpace {
    pub dim: usize,
    pub metric: MetricType,
    pub data_type: DataType,
    /// Bytes per element.
    pub element_size: usize,
    /// Elements per padded stride (`vector_byte_size / element_size`).
    pub aligned_dim: usize,
    /// Padded per-vector stride in bytes, a multiple of [`ALIGNMENT_BYTES`].
    pub vector_byte_size: usize,
    pub alignment_bytes: usize,
    pub need_normalize_vector: bool,
    /// Human-readable name of the selected tier.
    pub arch_name: String,
    /// Tier-`None` binding, the portable reference.
    pub standard_operator: OperatorEntity,
    /// Binding selected for the requested tier.
    pub operator: OperatorEntity,
}

impl VectorSpace {
    /// Resolve a vector space against a populated registry.
    ///
    /// Fails with `InvalidArgument` for a zero dimension or unknown data
    /// type, and with `Unavailable` when either the portable tier-`None`
    /// operator or the requested-tier operator is not registered. No tier
    /// fallback happens here: callers wanting "best available" pass
    /// `CpuFeatures::best_simd_level()` explicitly.
    pub fn create(
        registry: &OperatorRegistry,
        dim: usize,
        metric: MetricType,
        data_type: DataType,
        simd_level: SimdLevel,
    ) -> Result<VectorSpace> {
        if dim == 0 {
            return Err(AxonError::InvalidArgument(
                "vector dimension must be positive".to_string(),
            ));
        }
        let element_size = data_type.size_bytes()?;
        let vector_byte_size =
            (element_size * dim + ALIGNMENT_BYTES - 1) / ALIGNMENT_BYTES * ALIGNMENT_BYTES;
        let aligned_dim = vector_byte_size / element_size;

        let standard_operator =
            registry.get_metric_operator(metric, data_type, SimdLevel::None)?;

        let operator = registry.get_metric_operator(metric, data_type, simd_level)?;
        if !operator.supports {
            return Err(AxonError::Unavailable(format!(
                "operator not supported: {metric:?}/{data_type:?}/{simd_level:?}"
            )));
        }

        let space = VectorSpace {
            dim,
            metric,
            data_type,
            element_size,
            aligned_dim,
            vector_byte_size,
            alignment_bytes: ALIGNMENT_BYTES,
            need_normalize_vector: operator.need_normalize_vector,
            arch_name: format!("{simd_level:?}").to_lowercase(),
            standard_operator,
            operator,
        };
        tracing::debug!(
            dim,
            metric = ?metric,
            data_type = ?data_type,
            simd_level = ?simd_level,
            stride = space.vector_byte_size,
            "vector space created"
        );
        Ok(space)
    }

    /// Logical payload size in bytes (`dim * element_size`, unpadded).
    pub fn data_byte_size(&self) -> usize {
        self.dim * self.element_size
    }

    /// Allocate `n` full-stride vectors, 64-byte aligned and zeroed.
    /// The hot path: SIMD kernels assume this layout.
    pub fn alloc_aligned_vectors(&self, n: usize) -> Result<AlignedBytes> {
        AlignedBytes::new(n * self.vector_byte_size, ALIGNMENT_BYTES)
    }

    /// Allocate `n` unpadded vectors without alignment. Debug use only.
    pub fn alloc_vectors(&self, n: usize) -> Vec<u8> {
        vec![0u8; n * self.data_byte_size()]
    }

    /// Allocate `n` single elements, aligned. Used by auxiliary structures
    /// such as product-quantization codebooks.
    pub fn alloc_aligned_elements(&self, n: usize) -> Result<AlignedBytes> {
        AlignedBytes::new(n * self.element_size, ALIGNMENT_BYTES)
    }

    /// Allocate `n` single elements without alignment.
    pub fn alloc_elements(&self, n: usize) -> Vec<u8> {
        vec![0u8; n * self.element_size]
    }

    /// Whether a span satisfies the allocator's alignment contract.
    pub fn is_aligned(bytes: &[u8]) -> bool {
        bytes.as_ptr() as usize % ALIGNMENT_BYTES == 0
    }

    /// Distance under the active (requested-tier) operator.
    pub fn distance(&self, a: &[u8], b: &[u8]) -> Result<f32> {
        match self.operator.distance {
            Some(f) => Ok(f(a, b)),
            None => Err(AxonError::Unavailable(format!(
                "no distance operation for {:?}",
                self.metric
            ))),
        }
    }

    /// Distance under the portable tier-`None` operator.
    pub fn standard_distance(&self, a: &[u8], b: &[u8]) -> Result<f32> {
        match self.standard_operator.distance {
            Some(f) => Ok(f(a, b)),
            None => Err(AxonError::Unavailable(format!(
                "no distance operation for {:?}",
                self.metric
            ))),
        }
    }

    /// Normalize under the active operator.
    pub fn normalize(&self, input: &[u8], output: &mut [u8]) -> Result<()> {
        match self.operator.normalize {
            Some(f) => {
                f(input, output);
                Ok(())
            }
            None => Err(AxonError::Unavailable(format!(
                "no normalize operation for {:?}",
                self.metric
            ))),
        }
    }

    /// Norm under the active operator.
    pub fn norm(&self, a: &[u8]) -> Result<f32> {
        match self.operator.norm {
            Some(f) => Ok(f(a)),
            None => Err(AxonError::Unavailable(format!(
                "no norm operation for {:?}",
                self.metric
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> OperatorRegistry {
        OperatorRegistry::with_builtins().unwrap()
    }

    #[test]
    fn test_aligned_bytes() {
        let mut buf = AlignedBytes::new(192, ALIGNMENT_BYTES).unwrap();
        assert_eq!(buf.len(), 192);
        assert_eq!(buf.as_ptr() as usize % ALIGNMENT_BYTES, 0);
        assert!(buf.iter().all(|&b| b == 0));
        buf[3] = 7;
        assert_eq!(buf[3], 7);
        assert!(AlignedBytes::new(0, ALIGNMENT_BYTES).is_err());
    }

    #[test]
    fn test_stride_padding() {
        let r = registry();
        let space =
            VectorSpace::create(&r, 3, MetricType::L2, DataType::F32, SimdLevel::None).unwrap();
        assert_eq!(space.element_size, 4);
        assert_eq!(space.vector_byte_size, 64);
        assert_eq!(space.aligned_dim, 16);
        assert_eq!(space.data_byte_size(), 12);

        let space =
            VectorSpace::create(&r, 128, MetricType::L2, DataType::F32, SimdLevel::None).unwrap();
        assert_eq!(space.vector_byte_size, 512);
        assert_eq!(space.aligned_dim, 128);
    }

    #[test]
    fn test_create_rejects_bad_params() {
        let r = registry();
        assert!(matches!(
            VectorSpace::create(&r, 0, MetricType::L2, DataType::F32, SimdLevel::None),
            Err(AxonError::InvalidArgument(_))
        ));
        assert!(matches!(
            VectorSpace::create(&r, 8, MetricType::L2, DataType::None, SimdLevel::None),
            Err(AxonError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_create_requires_registered_tier() {
        let r = registry();
        // Hamming is never registered at the SSE tier
        assert!(matches!(
            VectorSpace::create(&r, 64, MetricType::Hamming, DataType::U8, SimdLevel::Sse),
            Err(AxonError::Unavailable(_))
        ));
    }

    #[test]
    fn test_every_pair_has_portable_fallback() {
        let r = registry();
        let mut pairs: Vec<(MetricType, DataType)> = r
            .all_metric_operators()
            .iter()
            .map(|op| (op.metric, op.data_type))
            .collect();
        pairs.sort_by_key(|(m, d)| (*m as u32, *d as u32));
        pairs.dedup();
        for (metric, data_type) in pairs {
            let space = VectorSpace::create(&r, 16, metric, data_type, SimdLevel::None).unwrap();
            assert!(space.standard_operator.supports);
            assert!(space.operator.supports);
        }
    }

    #[test]
    fn test_allocation_helpers() {
        let r = registry();
        let space =
            VectorSpace::create(&r, 10, MetricType::L2, DataType::F32, SimdLevel::None).unwrap();

        let aligned = space.alloc_aligned_vectors(3).unwrap();
        assert_eq!(aligned.len(), 3 * space.vector_byte_size);
        assert!(VectorSpace::is_aligned(&aligned));

        let plain = space.alloc_vectors(3);
        assert_eq!(plain.len(), 3 * 40);

        let elems = space.alloc_aligned_elements(5).unwrap();
        assert_eq!(elems.len(), 20);
        assert!(VectorSpace::is_aligned(&elems));

        assert_eq!(space.alloc_elements(5).len(), 20);
    }

    #[test]
    fn test_distance_through_bindings() {
        let r = registry();
        let space =
            VectorSpace::create(&r, 4, MetricType::L2, DataType::F32, SimdLevel::None).unwrap();

        let mut a = space.alloc_aligned_vectors(1).unwrap();
        let mut b = space.alloc_aligned_vectors(1).unwrap();
        a[..4].copy_from_slice(&3.0f32.to_ne_bytes());
        b[..4].copy_from_slice(&7.0f32.to_ne_bytes());

        let d = space.distance(&a, &b).unwrap();
        assert!((d - 4.0).abs() < 1e-6);
        let ds = space.standard_distance(&a, &b).unwrap();
        assert_eq!(d, ds);
    }

    #[test]
    fn test_active_tier_matches_request() {
        let r = registry();
        let features = crate::types::cpu_features();
        let level = features.best_simd_level();
        let space =
            VectorSpace::create(&r, 64, MetricType::L2, DataType::F32, level).unwrap();
        assert_eq!(space.operator.simd_level, level);
        assert_eq!(space.standard_operator.simd_level, SimdLevel::None);

        let mut a = space.alloc_aligned_vectors(1).unwrap();
        let b = space.alloc_aligned_vectors(1).unwrap();
        for (i, chunk) in a.chunks_exact_mut(4).enumerate().take(64) {
            chunk.copy_from_slice(&(i as f32).to_ne_bytes());
        }
        let fast = space.distance(&a, &b).unwrap();
        let portable = space.standard_distance(&a, &b).unwrap();
        assert!((fast - portable).abs() <= 1e-4 * portable.max(1.0));
    }
}
