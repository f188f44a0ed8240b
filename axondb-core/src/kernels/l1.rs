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

//! L1 (Manhattan) distance: sum of absolute elementwise differences.

use crate::error::Result;
use crate::kernels::{elements_of, Element};
use crate::registry::{OperatorEntity, OperatorRegistry};
use crate::types::{DataType, MetricType, SimdLevel};

/// Scalar reference kernel, unrolled by 4 lanes.
pub fn l1_distance_scalar<T: Element>(a: &[u8], b: &[u8]) -> f32 {
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
        sum += d0.abs() + d1.abs() + d2.abs() + d3.abs();
        i += 4;
    }
    while i < n {
        sum += (pa[i].to_f32() - pb[i].to_f32()).abs();
        i += 1;
    }
    sum
}

/// Scalar L1 norm.
pub fn l1_norm_scalar<T: Element>(a: &[u8]) -> f32 {
    let pa = elements_of::<T>(a);
    let n = pa.len();
    let mut sum = 0.0f32;
    let mut i = 0;
    while i + 4 <= n {
        sum += pa[i].to_f32().abs()
            + pa[i + 1].to_f32().abs()
            + pa[i + 2].to_f32().abs()
            + pa[i + 3].to_f32().abs();
        i += 4;
    }
    while i < n {
        sum += pa[i].to_f32().abs();
        i += 1;
    }
    sum
}

#[cfg(target_arch = "x86_64")]
pub fn l1_distance_sse(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "sse4.1")]
    unsafe fn inner(a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 4;
        let sign_mask = _mm_set1_ps(-0.0);
        let mut sum = _mm_setzero_ps();
        for i in 0..chunks {
            let va = _mm_loadu_ps(a.as_ptr().add(i * 4));
            let vb = _mm_loadu_ps(b.as_ptr().add(i * 4));
            sum = _mm_add_ps(sum, _mm_andnot_ps(sign_mask, _mm_sub_ps(va, vb)));
        }
        let mut result = crate::kernels::x86::hsum128_ps(sum);
        for i in (chunks * 4)..n {
            result += (a[i] - b[i]).abs();
        }
        result
    }

    if is_x86_feature_detected!("sse4.1") {
        unsafe { inner(elements_of::<f32>(a), elements_of::<f32>(b)) }
    } else {
        l1_distance_scalar::<f32>(a, b)
    }
}

#[cfg(target_arch = "x86_64")]
pub fn l1_distance_avx2(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "avx2")]
    unsafe fn inner(a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 8;
        let sign_mask = _mm256_set1_ps(-0.0);
        let mut sum = _mm256_setzero_ps();
        for i in 0..chunks {
            let va = _mm256_loadu_ps(a.as_ptr().add(i * 8));
            let vb = _mm256_loadu_ps(b.as_ptr().add(i * 8));
            sum = _mm256_add_ps(sum, _mm256_andnot_ps(sign_mask, _mm256_sub_ps(va, vb)));
        }
        let mut result = crate::kernels::x86::hsum256_ps(sum);
        for i in (chunks * 8)..n {
            result += (a[i] - b[i]).abs();
        }
        result
    }

    if is_x86_feature_detected!("avx2") {
        unsafe { inner(elements_of::<f32>(a), elements_of::<f32>(b)) }
    } else {
        l1_distance_scalar::<f32>(a, b)
    }
}

#[cfg(target_arch = "x86_64")]
pub fn l1_norm_avx2(a: &[u8]) -> f32 {
    #[target_feature(enable = "avx2")]
    unsafe fn inner(a: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 8;
        let sign_mask = _mm256_set1_ps(-0.0);
        let mut sum = _mm256_setzero_ps();
        for i in 0..chunks {
            let va = _mm256_loadu_ps(a.as_ptr().add(i * 8));
            sum = _mm256_add_ps(sum, _mm256_andnot_ps(sign_mask, va));
        }
        let mut result = crate::kernels::x86::hsum256_ps(sum);
        for i in (chunks * 8)..n {
            result += a[i].abs();
        }
        result
    }

    if is_x86_feature_detected!("avx2") {
        unsafe { inner(elements_of::<f32>(a)) }
    } else {
        l1_norm_scalar::<f32>(a)
    }
}

fn scalar_entity(data_type: DataType, distance: crate::registry::DistanceFn, norm: crate::registry::NormFn) -> OperatorEntity {
    OperatorEntity {
        supports: true,
        metric: MetricType::L1,
        data_type,
        simd_level: SimdLevel::None,
        distance: Some(distance),
        norm: Some(norm),
        ..Default::default()
    }
}

pub fn register_l1_operators(r: &mut OperatorRegistry) -> Result<()> {
    r.register_operator(
        scalar_entity(DataType::U8, l1_distance_scalar::<u8>, l1_norm_scalar::<u8>),
        false,
    )?;
    r.register_operator(
        scalar_entity(
            DataType::F16,
            l1_distance_scalar::<half::f16>,
            l1_norm_scalar::<half::f16>,
        ),
        false,
    )?;
    r.register_operator(
        scalar_entity(DataType::F32, l1_distance_scalar::<f32>, l1_norm_scalar::<f32>),
        false,
    )?;

    #[cfg(target_arch = "x86_64")]
    {
        let features = crate::types::cpu_features();
        if features.sse41 {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::L1,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Sse,
                    distance: Some(l1_distance_sse),
                    norm: Some(l1_norm_scalar::<f32>),
                    ..Default::default()
                },
                false,
            )?;
        }
        if features.avx2 {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::L1,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Avx2,
                    distance: Some(l1_distance_avx2),
                    norm: Some(l1_norm_avx2),
                    ..Default::default()
                },
                false,
            )?;
        }
    }

    Ok(())
}
