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

//! Distance kernel family.
//!
//! Every metric ships a scalar reference kernel generic over the element
//! encoding (u8 / f16 / f32) and, for f32, explicit SSE4.1/AVX2/AVX-512
//! variants written with `core::arch` intrinsics. All kernels of one metric
//! compute the same function; the SIMD tiers process a vectorizable prefix
//! and fall back to scalar accumulation for the remainder. Cross-tier
//! numeric agreement is the load-bearing invariant and is exercised by the
//! randomized tests in each module.
//!
//! Kernels operate on raw byte spans. Operands are expected to come from the
//! 64-byte aligned allocator (see [`crate::space`]); the element views below
//! assert that in debug builds. Padding bytes beyond the logical dimension
//! are zero for storage produced by this crate and therefore contribute
//! nothing to any accumulation.

pub mod angle;
pub mod cosine;
pub mod hamming;
pub mod ip;
pub mod jaccard;
pub mod l1;
pub mod l2;
pub mod normalized;

// ============================================================================
// Element Access
// ============================================================================

/// Element encodings a scalar kernel can be instantiated over.
pub trait Element: Copy + Send + Sync + 'static {
    fn to_f32(self) -> f32;

    fn from_f32(v: f32) -> Self;
}

impl Element for u8 {
    #[inline(always)]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline(always)]
    fn from_f32(v: f32) -> Self {
        v as u8
    }
}

impl Element for half::f16 {
    #[inline(always)]
    fn to_f32(self) -> f32 {
        f32::from(self)
    }

    #[inline(always)]
    fn from_f32(v: f32) -> Self {
        half::f16::from_f32(v)
    }
}

impl Element for f32 {
    #[inline(always)]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline(always)]
    fn from_f32(v: f32) -> Self {
        v
    }
}

/// View a byte span as a slice of `T`.
///
/// The span length must be a multiple of `size_of::<T>()` and the base
/// pointer must satisfy `T`'s alignment; both hold for storage produced by
/// the aligned allocator and are asserted in debug builds.
#[inline(always)]
pub(crate) fn elements_of<T>(bytes: &[u8]) -> &[T] {
    let size = std::mem::size_of::<T>();
    debug_assert_eq!(bytes.len() % size, 0);
    debug_assert_eq!(bytes.as_ptr() as usize % std::mem::align_of::<T>(), 0);
    unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const T, bytes.len() / size) }
}

/// Mutable variant of [`elements_of`].
#[inline(always)]
pub(crate) fn elements_of_mut<T>(bytes: &mut [u8]) -> &mut [T] {
    let size = std::mem::size_of::<T>();
    debug_assert_eq!(bytes.len() % size, 0);
    debug_assert_eq!(bytes.as_ptr() as usize % std::mem::align_of::<T>(), 0);
    unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut T, bytes.len() / size) }
}

// ============================================================================
// Horizontal Sum Epilogues
// ============================================================================

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86 {
    use std::arch::x86_64::*;

    /// Sum the four f32 lanes of a 128-bit register.
    #[inline(always)]
    pub(crate) unsafe fn hsum128_ps(v: __m128) -> f32 {
        let sum64 = _mm_add_ps(v, _mm_movehl_ps(v, v));
        let sum32 = _mm_add_ss(sum64, _mm_shuffle_ps(sum64, sum64, 1));
        _mm_cvtss_f32(sum32)
    }

    /// Sum the eight f32 lanes of a 256-bit register.
    #[inline(always)]
    pub(crate) unsafe fn hsum256_ps(v: __m256) -> f32 {
        let sum128 = _mm_add_ps(_mm256_extractf128_ps(v, 0), _mm256_extractf128_ps(v, 1));
        hsum128_ps(sum128)
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::space::{AlignedBytes, ALIGNMENT_BYTES};

    /// Copy f32s into a fresh 64-byte aligned buffer.
    pub(crate) fn aligned_f32(values: &[f32]) -> AlignedBytes {
        let mut buf = AlignedBytes::new(values.len() * 4, ALIGNMENT_BYTES).unwrap();
        for (chunk, v) in buf.chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&v.to_ne_bytes());
        }
        buf
    }

    /// Copy raw bytes into a fresh 64-byte aligned buffer.
    pub(crate) fn aligned_u8(values: &[u8]) -> AlignedBytes {
        let mut buf = AlignedBytes::new(values.len(), ALIGNMENT_BYTES).unwrap();
        buf.copy_from_slice(values);
        buf
    }

    /// Deterministically seeded random f32 vector in [-1, 1].
    pub(crate) fn random_f32(n: usize, seed: u64) -> Vec<f32> {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
    }

    /// Relative agreement check for cross-tier consistency tests.
    pub(crate) fn assert_close(a: f32, b: f32, tolerance: f32) {
        let scale = a.abs().max(b.abs()).max(1.0);
        assert!(
            (a - b).abs() <= tolerance * scale,
            "kernel results diverge: {a} vs {b}"
        );
    }
}
