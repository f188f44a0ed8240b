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

//! L2 (Euclidean) distance and norm.

use crate::error::Result;
use crate::kernels::{elements_of, Element};
use crate::registry::{OperatorEntity, OperatorRegistry};
use crate::types::{DataType, MetricType, SimdLevel};

/// Scalar reference kernel, unrolled by 4 lanes.
pub fn l2_distance_scalar<T: Element>(a: &[u8], b: &[u8]) -> f32 {
    let pa = elements_of::<T>(a);
    let pb = elements_of::<T>(b);
    let n = pa.len();
    let mut sum = 0.0f32;
    let mut i = 0;
    while i + 4 <= n {
        let d0 = pa[i].to_f32() - pb[i].to_f32();
        let d1 = pa[i + 1].to_f32() - pb[i + 1].to_f32();
        let d2 = pa[i + 2].to_f32() - pb[i + 2].to_f32();
        let d3 = pa[i + 3].to_f32() - pb[i + 3].to_f32();
        sum += d0 * d0 + d1 * d1 + d2 * d2 + d3 * d3;
        i += 4;
    }
    while i < n {
        let d = pa[i].to_f32() - pb[i].to_f32();
        sum += d * d;
        i += 1;
    }
    sum.sqrt()
}

/// Scalar L2 norm.
pub fn l2_norm_scalar<T: Element>(a: &[u8]) -> f32 {
    let pa = elements_of::<T>(a);
    let n = pa.len();
    let mut sum = 0.0f32;
    let mut i = 0;
    while i + 4 <= n {
        let v0 = pa[i].to_f32();
        let v1 = pa[i + 1].to_f32();
        let v2 = pa[i + 2].to_f32();
        let v3 = pa[i + 3].to_f32();
        sum += v0 * v0 + v1 * v1 + v2 * v2 + v3 * v3;
        i += 4;
    }
    while i < n {
        let v = pa[i].to_f32();
        sum += v * v;
        i += 1;
    }
    sum.sqrt()
}

#[cfg(target_arch = "x86_64")]
pub fn l2_distance_sse(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "sse4.1")]
    unsafe fn inner(a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 4;
        let mut sum = _mm_setzero_ps();
        for i in 0..chunks {
            let va = _mm_loadu_ps(a.as_ptr().add(i * 4));
            let vb = _mm_loadu_ps(b.as_ptr().add(i * 4));
            let diff = _mm_sub_ps(va, vb);
            sum = _mm_add_ps(sum, _mm_mul_ps(diff, diff));
        }
        let mut result = crate::kernels::x86::hsum128_ps(sum);
        for i in (chunks * 4)..n {
            let d = a[i] - b[i];
            result += d * d;
        }
        result.sqrt()
    }

    if is_x86_feature_detected!("sse4.1") {
        unsafe { inner(elements_of::<f32>(a), elements_of::<f32>(b)) }
    } else {
        l2_distance_scalar::<f32>(a, b)
    }
}

#[cfg(target_arch = "x86_64")]
pub fn l2_distance_avx2(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "avx2,fma")]
    unsafe fn inner(a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 8;
        let mut sum = _mm256_setzero_ps();
        for i in 0..chunks {
            let va = _mm256_loadu_ps(a.as_ptr().add(i * 8));
            let vb = _mm256_loadu_ps(b.as_ptr().add(i * 8));
            let diff = _mm256_sub_ps(va, vb);
            sum = _mm256_fmadd_ps(diff, diff, sum);
        }
        let mut result = crate::kernels::x86::hsum256_ps(sum);
        for i in (chunks * 8)..n {
            let d = a[i] - b[i];
            result += d * d;
        }
        result.sqrt()
    }

    if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
        unsafe { inner(elements_of::<f32>(a), elements_of::<f32>(b)) }
    } else {
        l2_distance_scalar::<f32>(a, b)
    }
}

#[cfg(target_arch = "x86_64")]
pub fn l2_distance_avx512(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "avx512f")]
    unsafe fn inner(a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 16;
        let mut sum = _mm512_setzero_ps();
        for i in 0..chunks {
            let va = _mm512_loadu_ps(a.as_ptr().add(i * 16));
            let vb = _mm512_loadu_ps(b.as_ptr().add(i * 16));
            let diff = _mm512_sub_ps(va, vb);
            sum = _mm512_fmadd_ps(diff, diff, sum);
        }
        let mut result = _mm512_reduce_add_ps(sum);
        for i in (chunks * 16)..n {
            let d = a[i] - b[i];
            result += d * d;
        }
        result.sqrt()
    }

    if is_x86_feature_detected!("avx512f") {
        unsafe { inner(elements_of::<f32>(a), elements_of::<f32>(b)) }
    } else {
        l2_distance_scalar::<f32>(a, b)
    }
}

#[cfg(target_arch = "x86_64")]
pub fn l2_norm_sse(a: &[u8]) -> f32 {
    #[target_feature(enable = "sse4.1")]
    unsafe fn inner(a: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 4;
        let mut sum = _mm_setzero_ps();
        for i in 0..chunks {
            let va = _mm_loadu_ps(a.as_ptr().add(i * 4));
            sum = _mm_add_ps(sum, _mm_mul_ps(va, va));
        }
        let mut result = crate::kernels::x86::hsum128_ps(sum);
        for i in (chunks * 4)..n {
            result += a[i] * a[i];
        }
        result.sqrt()
    }

    if is_x86_feature_detected!("sse4.1") {
        unsafe { inner(elements_of::<f32>(a)) }
    } else {
        l2_norm_scalar::<f32>(a)
    }
}

#[cfg(target_arch = "x86_64")]
pub fn l2_norm_avx2(a: &[u8]) -> f32 {
    #[target_feature(enable = "avx2,fma")]
    unsafe fn inner(a: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 8;
        let mut sum = _mm256_setzero_ps();
        for i in 0..chunks {
            let va = _mm256_loadu_ps(a.as_ptr().add(i * 8));
            sum = _mm256_fmadd_ps(va, va, sum);
        }
        let mut result = crate::kernels::x86::hsum256_ps(sum);
        for i in (chunks * 8)..n {
            result += a[i] * a[i];
        }
        result.sqrt()
    }

    if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
        unsafe { inner(elements_of::<f32>(a)) }
    } else {
        l2_norm_scalar::<f32>(a)
    }
}

fn scalar_entity(
    data_type: DataType,
    distance: crate::registry::DistanceFn,
    norm: crate::registry::NormFn,
) -> OperatorEntity {
    OperatorEntity {
        supports: true,
        metric: MetricType::L2,
        data_type,
        simd_level: SimdLevel::None,
        distance: Some(distance),
        norm: Some(norm),
        ..Default::default()
    }
}

pub fn register_l2_operators(r: &mut OperatorRegistry) -> Result<()> {
    r.register_operator(
        scalar_entity(DataType::U8, l2_distance_scalar::<u8>, l2_norm_scalar::<u8>),
        false,
    )?;
    r.register_operator(
        scalar_entity(
            DataType::F16,
            l2_distance_scalar::<half::f16>,
            l2_norm_scalar::<half::f16>,
        ),
        false,
    )?;
    r.register_operator(
        scalar_entity(DataType::F32, l2_distance_scalar::<f32>, l2_norm_scalar::<f32>),
        false,
    )?;

    #[cfg(target_arch = "x86_64")]
    {
        let features = crate::types::cpu_features();
        if features.sse41 {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::L2,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Sse,
                    distance: Some(l2_distance_sse),
                    norm: Some(l2_norm_sse),
                    ..Default::default()
                },
                false,
            )?;
        }
        if features.avx2 {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::L2,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Avx2,
                    distance: Some(l2_distance_avx2),
                    norm: Some(l2_norm_avx2),
                    ..Default::default()
                },
                false,
            )?;
        }
        if features.avx512f {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::L2,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Avx512,
                    distance: Some(l2_distance_avx512),
                    norm: Some(l2_norm_avx2),
                    ..Default::default()
                },
                false,
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::test_util::{aligned_f32, assert_close, random_f32};

    #[test]
    fn test_l2_scalar() {
        let a = aligned_f32(&[1.0, 2.0, 3.0, 4.0]);
        let b = aligned_f32(&[1.0, 2.0, 3.0, 6.0]);
        let d = l2_distance_scalar::<f32>(&a, &b);
        assert!((d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm() {
        let a = aligned_f32(&[3.0, 4.0]);
        assert!((l2_norm_scalar::<f32>(&a) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_tiers_agree() {
        let av = random_f32(257, 21);
        let bv = random_f32(257, 22);
        let a = aligned_f32(&av);
        let b = aligned_f32(&bv);
        let reference = l2_distance_scalar::<f32>(&a, &b);
        #[cfg(target_arch = "x86_64")]
        {
            let features = crate::types::cpu_features();
            if features.sse41 {
                assert_close(reference, l2_distance_sse(&a, &b), 1e-4);
                assert_close(l2_norm_scalar::<f32>(&a), l2_norm_sse(&a), 1e-4);
            }
            if features.avx2 {
                assert_close(reference, l2_distance_avx2(&a, &b), 1e-4);
                assert_close(l2_norm_scalar::<f32>(&a), l2_norm_avx2(&a), 1e-4);
            }
            if features.avx512f {
                assert_close(reference, l2_distance_avx512(&a, &b), 1e-4);
            }
        }
        assert!(reference > 0.0);
    }
}
