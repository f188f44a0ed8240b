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

//! Inner-product distance.
//!
//! Every tier returns `sqrt(Σ aᵢbᵢ)`. The square root over a plain product
//! sum is inherited engine behavior that downstream scores depend on; it is
//! pending product-owner review and must not be changed independently of the
//! normalized metrics that compose it (see DESIGN.md).

use crate::error::Result;
use crate::kernels::{elements_of, Element};
use crate::registry::{OperatorEntity, OperatorRegistry};
use crate::types::{DataType, MetricType, SimdLevel};

/// Scalar reference kernel, unrolled by 4 lanes.
pub fn ip_distance_scalar<T: Element>(a: &[u8], b: &[u8]) -> f32 {
    let pa = elements_of::<T>(a);
    let pb = elements_of::<T>(b);
    let n = pa.len();
    let mut sum = 0.0f32;
    let mut i = 0;
    while i + 4 <= n {
        let p0 = pa[i].to_f32() * pb[i].to_f32();
        let p1 = pa[i + 1].to_f32() * pb[i + 1].to_f32();
        let p2 = pa[i + 2].to_f32() * pb[i + 2].to_f32();
        let p3 = pa[i + 3].to_f32() * pb[i + 3].to_f32();
        sum += p0 + p1 + p2 + p3;
        i += 4;
    }
    while i < n {
        sum += pa[i].to_f32() * pb[i].to_f32();
        i += 1;
    }
    sum.sqrt()
}

#[cfg(target_arch = "x86_64")]
pub fn ip_distance_sse(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "sse4.1")]
    unsafe fn inner(a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 4;
        let mut sum = _mm_setzero_ps();
        for i in 0..chunks {
            let va = _mm_loadu_ps(a.as_ptr().add(i * 4));
            let vb = _mm_loadu_ps(b.as_ptr().add(i * 4));
            sum = _mm_add_ps(sum, _mm_mul_ps(va, vb));
        }
        let mut result = crate::kernels::x86::hsum128_ps(sum);
        for i in (chunks * 4)..n {
            result += a[i] * b[i];
        }
        result.sqrt()
    }

    if is_x86_feature_detected!("sse4.1") {
        unsafe { inner(elements_of::<f32>(a), elements_of::<f32>(b)) }
    } else {
        ip_distance_scalar::<f32>(a, b)
    }
}

#[cfg(target_arch = "x86_64")]
pub fn ip_distance_avx2(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "avx2,fma")]
    unsafe fn inner(a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 8;
        let mut sum = _mm256_setzero_ps();
        for i in 0..chunks {
            let va = _mm256_loadu_ps(a.as_ptr().add(i * 8));
            let vb = _mm256_loadu_ps(b.as_ptr().add(i * 8));
            sum = _mm256_fmadd_ps(va, vb, sum);
        }
        let mut result = crate::kernels::x86::hsum256_ps(sum);
        for i in (chunks * 8)..n {
            result += a[i] * b[i];
        }
        result.sqrt()
    }

    if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
        unsafe { inner(elements_of::<f32>(a), elements_of::<f32>(b)) }
    } else {
        ip_distance_scalar::<f32>(a, b)
    }
}

#[cfg(target_arch = "x86_64")]
pub fn ip_distance_avx512(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "avx512f")]
    unsafe fn inner(a: &[f32], b: &[f32]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 16;
        let mut sum = _mm512_setzero_ps();
        for i in 0..chunks {
            let va = _mm512_loadu_ps(a.as_ptr().add(i * 16));
            let vb = _mm512_loadu_ps(b.as_ptr().add(i * 16));
            sum = _mm512_fmadd_ps(va, vb, sum);
        }
        let mut result = _mm512_reduce_add_ps(sum);
        for i in (chunks * 16)..n {
            result += a[i] * b[i];
        }
        result.sqrt()
    }

    if is_x86_feature_detected!("avx512f") {
        unsafe { inner(elements_of::<f32>(a), elements_of::<f32>(b)) }
    } else {
        ip_distance_scalar::<f32>(a, b)
    }
}

fn scalar_entity(data_type: DataType, distance: crate::registry::DistanceFn) -> OperatorEntity {
    OperatorEntity {
        supports: true,
        metric: MetricType::Ip,
        data_type,
        simd_level: SimdLevel::None,
        distance: Some(distance),
        ..Default::default()
    }
}

pub fn register_ip_operators(r: &mut OperatorRegistry) -> Result<()> {
    r.register_operator(scalar_entity(DataType::U8, ip_distance_scalar::<u8>), false)?;
    r.register_operator(
        scalar_entity(DataType::F16, ip_distance_scalar::<half::f16>),
        false,
    )?;
    r.register_operator(scalar_entity(DataType::F32, ip_distance_scalar::<f32>), false)?;

    #[cfg(target_arch = "x86_64")]
    {
        let features = crate::types::cpu_features();
        if features.sse41 {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::Ip,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Sse,
                    distance: Some(ip_distance_sse),
                    ..Default::default()
                },
                false,
            )?;
        }
        if features.avx2 {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::Ip,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Avx2,
                    distance: Some(ip_distance_avx2),
                    ..Default::default()
                },
                false,
            )?;
        }
        if features.avx512f {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::Ip,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Avx512,
                    distance: Some(ip_distance_avx512),
                    ..Default::default()
                },
                false,
            )?;
        }
    }

    Ok(())
}
