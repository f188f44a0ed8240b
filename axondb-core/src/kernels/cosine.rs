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

//! Cosine metric: `Σab / sqrt(Σa²·Σb²)` accumulated in one pass.
//!
//! Returns exactly 0.0 when either operand has zero norm, so zero vectors
//! rank as maximally dissimilar instead of producing NaN.

use crate::error::Result;
use crate::kernels::{elements_of, Element};
use crate::registry::{OperatorEntity, OperatorRegistry};
use crate::types::{DataType, MetricType, SimdLevel};

/// Scalar reference kernel, unrolled by 4 lanes.
pub fn cosine_distance_scalar<T: Element>(a: &[u8], b: &[u8]) -> f32 {
    let pa = elements_of::<T>(a);
    let pb = elements_of::<T>(b);
    let n = pa.len();
    let mut sum = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    let mut i = 0;
    while i + 4 <= n {
        let a0 = pa[i].to_f32();
        let a1 = pa[i + 1].to_f32();
        let a2 = pa[i + 2].to_f32();
        let a3 = pa[i + 3].to_f32();
        let b0 = pb[i].to_f32();
        let b1 = pb[i + 1].to_f32();
        let b2 = pb[i + 2].to_f32();
        let b3 = pb[i + 3].to_f32();
        norm_a += a0 * a0 + a1 * a1 + a2 * a2 + a3 * a3;
        norm_b += b0 * b0 + b1 * b1 + b2 * b2 + b3 * b3;
        sum += a0 * b0 + a1 * b1 + a2 * b2 + a3 * b3;
        i += 4;
    }
    while i < n {
        let av = pa[i].to_f32();
        let bv = pb[i].to_f32();
        norm_a += av * av;
        norm_b += bv * bv;
        sum += av * bv;
        i += 1;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    sum / (norm_a * norm_b).sqrt()
}

#[cfg(target_arch = "x86_64")]
pub fn cosine_distance_sse(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "sse4.1")]
    unsafe fn inner(a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 4;
        let mut sum = _mm_setzero_ps();
        let mut norm_a = _mm_setzero_ps();
        let mut norm_b = _mm_setzero_ps();
        for i in 0..chunks {
            let va = _mm_loadu_ps(a.as_ptr().add(i * 4));
            let vb = _mm_loadu_ps(b.as_ptr().add(i * 4));
            norm_a = _mm_add_ps(norm_a, _mm_mul_ps(va, va));
            norm_b = _mm_add_ps(norm_b, _mm_mul_ps(vb, vb));
            sum = _mm_add_ps(sum, _mm_mul_ps(va, vb));
        }
        let mut dot = crate::kernels::x86::hsum128_ps(sum);
        let mut na = crate::kernels::x86::hsum128_ps(norm_a);
        let mut nb = crate::kernels::x86::hsum128_ps(norm_b);
        for i in (chunks * 4)..n {
            let av = a[i];
            let bv = b[i];
            dot += av * bv;
            na += av * av;
            nb += bv * bv;
        }
        if na == 0.0 || nb == 0.0 {
            return 0.0;
        }
        dot / (na * nb).sqrt()
    }

    if is_x86_feature_detected!("sse4.1") {
        unsafe { inner(elements_of::<f32>(a), elements_of::<f32>(b)) }
    } else {
        cosine_distance_scalar::<f32>(a, b)
    }
}

#[cfg(target_arch = "x86_64")]
pub fn cosine_distance_avx2(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "avx2,fma")]
    unsafe fn inner(a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 8;
        let mut sum = _mm256_setzero_ps();
        let mut norm_a = _mm256_setzero_ps();
        let mut norm_b = _mm256_setzero_ps();
        for i in 0..chunks {
            let va = _mm256_loadu_ps(a.as_ptr().add(i * 8));
            let vb = _mm256_loadu_ps(b.as_ptr().add(i * 8));
            norm_a = _mm256_fmadd_ps(va, va, norm_a);
            norm_b = _mm256_fmadd_ps(vb, vb, norm_b);
            sum = _mm256_fmadd_ps(va, vb, sum);
        }
        let mut dot = crate::kernels::x86::hsum256_ps(sum);
        let mut na = crate::kernels::x86::hsum256_ps(norm_a);
        let mut nb = crate::kernels::x86::hsum256_ps(norm_b);
        for i in (chunks * 8)..n {
            let av = a[i];
            let bv = b[i];
            dot += av * bv;
            na += av * av;
            nb += bv * bv;
        }
        if na == 0.0 || nb == 0.0 {
            return 0.0;
        }
        dot / (na * nb).sqrt()
    }

    if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
        unsafe { inner(elements_of::<f32>(a), elements_of::<f32>(b)) }
    } else {
        cosine_distance_scalar::<f32>(a, b)
    }
}

fn scalar_entity(data_type: DataType, distance: crate::registry::DistanceFn) -> OperatorEntity {
    OperatorEntity {
        supports: true,
        metric: MetricType::Cosine,
        data_type,
        simd_level: SimdLevel::None,
        distance: Some(distance),
        ..Default::default()
    }
}

pub fn register_cosine_operators(r: &mut OperatorRegistry) -> Result<()> {
    r.register_operator(
        scalar_entity(DataType::U8, cosine_distance_scalar::<u8>),
        false,
    )?;
    r.register_operator(
        scalar_entity(DataType::F16, cosine_distance_scalar::<half::f16>),
        false,
    )?;
    r.register_operator(
        scalar_entity(DataType::F32, cosine_distance_scalar::<f32>),
        false,
    )?;

    #[cfg(target_arch = "x86_64")]
    {
        let features = crate::types::cpu_features();
        if features.sse41 {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::Cosine,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Sse,
                    distance: Some(cosine_distance_sse),
                    ..Default::default()
                },
                false,
            )?;
        }
        if features.avx2 {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::Cosine,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Avx2,
                    distance: Some(cosine_distance_avx2),
                    ..Default::default()
                },
                false,
            )?;
        }
    }

    Ok(())
}
