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

//! Pre-normalized metric family.
//!
//! These operators require unit-L2-norm operands (`need_normalize_vector` is
//! set on every entity). Under that precondition the cosine reduces to the
//! inner product, the L2 distance to `sqrt(max(0, 2 − 2·ip))`, and the angle
//! to the clamped arccosine of the inner product. Each tier composes the
//! inner-product kernel of the same tier, so the inherited square root inside
//! `ip` flows through here unchanged.
//!
//! The paired normalize operation divides every element by the vector's L2
//! norm and writes zeros when the norm is zero.

use crate::error::Result;
use crate::kernels::angle::angle_from_cosine;
use crate::kernels::{elements_of, elements_of_mut, ip, l2, Element};
use crate::registry::{OperatorEntity, OperatorRegistry};
use crate::types::{DataType, MetricType, SimdLevel};

// ============================================================================
// Normalize
// ============================================================================

pub fn normalize_l2_scalar<T: Element>(input: &[u8], output: &mut [u8]) {
    let norm = l2::l2_norm_scalar::<T>(input);
    if norm == 0.0 {
        output.fill(0);
        return;
    }
    let src = elements_of::<T>(input);
    let dst = elements_of_mut::<T>(output);
    for (out, inp) in dst.iter_mut().zip(src.iter()) {
        *out = T::from_f32(inp.to_f32() / norm);
    }
}

#[cfg(target_arch = "x86_64")]
pub fn normalize_l2_avx2(input: &[u8], output: &mut [u8]) {
    #[target_feature(enable = "avx2,fma")]
    unsafe fn inner(src: &[f32], dst: &mut [f32], norm: f32) {
        use std::arch::x86_64::*;

        let n = src.len();
        let chunks = n / 8;
        let inv = _mm256_set1_ps(1.0 / norm);
        for i in 0..chunks {
            let v = _mm256_loadu_ps(src.as_ptr().add(i * 8));
            _mm256_storeu_ps(dst.as_mut_ptr().add(i * 8), _mm256_mul_ps(v, inv));
        }
        for i in (chunks * 8)..n {
            dst[i] = src[i] / norm;
        }
    }

    let norm = l2::l2_norm_avx2(input);
    if norm == 0.0 {
        output.fill(0);
        return;
    }
    if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
        // input and output never alias
        let src = elements_of::<f32>(input);
        let dst = elements_of_mut::<f32>(output);
        unsafe { inner(src, dst, norm) }
    } else {
        normalize_l2_scalar::<f32>(input, output);
    }
}

// ============================================================================
// Normalized Cosine
// ============================================================================

pub fn normalized_cosine_distance_scalar<T: Element>(a: &[u8], b: &[u8]) -> f32 {
    ip::ip_distance_scalar::<T>(a, b)
}

#[cfg(target_arch = "x86_64")]
pub fn normalized_cosine_distance_sse(a: &[u8], b: &[u8]) -> f32 {
    ip::ip_distance_sse(a, b)
}

#[cfg(target_arch = "x86_64")]
pub fn normalized_cosine_distance_avx2(a: &[u8], b: &[u8]) -> f32 {
    ip::ip_distance_avx2(a, b)
}

#[cfg(target_arch = "x86_64")]
pub fn normalized_cosine_distance_avx512(a: &[u8], b: &[u8]) -> f32 {
    ip::ip_distance_avx512(a, b)
}

// ============================================================================
// Normalized L2
// ============================================================================

#[inline]
fn normalized_l2_from_ip(ip: f32) -> f32 {
    let v = 2.0 - 2.0 * ip;
    if v < 0.0 {
        0.0
    } else {
        v.sqrt()
    }
}

pub fn normalized_l2_distance_scalar<T: Element>(a: &[u8], b: &[u8]) -> f32 {
    normalized_l2_from_ip(ip::ip_distance_scalar::<T>(a, b))
}

#[cfg(target_arch = "x86_64")]
pub fn normalized_l2_distance_sse(a: &[u8], b: &[u8]) -> f32 {
    normalized_l2_from_ip(ip::ip_distance_sse(a, b))
}

#[cfg(target_arch = "x86_64")]
pub fn normalized_l2_distance_avx2(a: &[u8], b: &[u8]) -> f32 {
    normalized_l2_from_ip(ip::ip_distance_avx2(a, b))
}

#[cfg(target_arch = "x86_64")]
pub fn normalized_l2_distance_avx512(a: &[u8], b: &[u8]) -> f32 {
    normalized_l2_from_ip(ip::ip_distance_avx512(a, b))
}

// ============================================================================
// Normalized Angle
// ============================================================================

pub fn normalized_angle_distance_scalar<T: Element>(a: &[u8], b: &[u8]) -> f32 {
    angle_from_cosine(normalized_cosine_distance_scalar::<T>(a, b))
}

#[cfg(target_arch = "x86_64")]
pub fn normalized_angle_distance_sse(a: &[u8], b: &[u8]) -> f32 {
    angle_from_cosine(normalized_cosine_distance_sse(a, b))
}

#[cfg(target_arch = "x86_64")]
pub fn normalized_angle_distance_avx2(a: &[u8], b: &[u8]) -> f32 {
    angle_from_cosine(normalized_cosine_distance_avx2(a, b))
}

// ============================================================================
// Registration
// ============================================================================

fn entity(
    metric: MetricType,
    data_type: DataType,
    simd_level: SimdLevel,
    distance: crate::registry::DistanceFn,
    normalize: crate::registry::NormalizeFn,
    norm: crate::registry::NormFn,
) -> OperatorEntity {
    OperatorEntity {
        supports: true,
        need_normalize_vector: true,
        metric,
        data_type,
        simd_level,
        distance: Some(distance),
        normalize: Some(normalize),
        norm: Some(norm),
    }
}

pub fn register_normalized_l2_operators(r: &mut OperatorRegistry) -> Result<()> {
    r.register_operator(
        entity(
            MetricType::NormalizedL2,
            DataType::F16,
            SimdLevel::None,
            normalized_l2_distance_scalar::<half::f16>,
            normalize_l2_scalar::<half::f16>,
            l2::l2_norm_scalar::<half::f16>,
        ),
        false,
    )?;
    r.register_operator(
        entity(
            MetricType::NormalizedL2,
            DataType::F32,
            SimdLevel::None,
            normalized_l2_distance_scalar::<f32>,
            normalize_l2_scalar::<f32>,
            l2::l2_norm_scalar::<f32>,
        ),
        false,
    )?;

    #[cfg(target_arch = "x86_64")]
    {
        let features = crate::types::cpu_features();
        if features.sse41 {
            r.register_operator(
                entity(
                    MetricType::NormalizedL2,
                    DataType::F32,
                    SimdLevel::Sse,
                    normalized_l2_distance_sse,
                    normalize_l2_scalar::<f32>,
                    l2::l2_norm_sse,
                ),
                false,
            )?;
        }
        if features.avx2 {
            r.register_operator(
                entity(
                    MetricType::NormalizedL2,
                    DataType::F32,
                    SimdLevel::Avx2,
                    normalized_l2_distance_avx2,
                    normalize_l2_avx2,
                    l2::l2_norm_avx2,
                ),
                false,
            )?;
        }
        if features.avx512f {
            r.register_operator(
                entity(
                    MetricType::NormalizedL2,
                    DataType::F32,
                    SimdLevel::Avx512,
                    normalized_l2_distance_avx512,
                    normalize_l2_avx2,
                    l2::l2_norm_avx2,
                ),
                false,
            )?;
        }
    }

    Ok(())
}

pub fn register_normalized_cosine_operators(r: &mut OperatorRegistry) -> Result<()> {
    r.register_operator(
        entity(
            MetricType::NormalizedCosine,
            DataType::F16,
            SimdLevel::None,
            normalized_cosine_distance_scalar::<half::f16>,
            normalize_l2_scalar::<half::f16>,
            l2::l2_norm_scalar::<half::f16>,
        ),
        false,
    )?;
    r.register_operator(
        entity(
            MetricType::NormalizedCosine,
            DataType::F32,
            SimdLevel::None,
            normalized_cosine_distance_scalar::<f32>,
            normalize_l2_scalar::<f32>,
            l2::l2_norm_scalar::<f32>,
        ),
        false,
    )?;

    #[cfg(target_arch = "x86_64")]
    {
        let features = crate::types::cpu_features();
        if features.sse41 {
            r.register_operator(
                entity(
                    MetricType::NormalizedCosine,
                    DataType::F32,
                    SimdLevel::Sse,
                    normalized_cosine_distance_sse,
                    normalize_l2_scalar::<f32>,
                    l2::l2_norm_sse,
                ),
                false,
            )?;
        }
        if features.avx2 {
            r.register_operator(
                entity(
                    MetricType::NormalizedCosine,
                    DataType::F32,
                    SimdLevel::Avx2,
                    normalized_cosine_distance_avx2,
                    normalize_l2_avx2,
                    l2::l2_norm_avx2,
                ),
                false,
            )?;
        }
        if features.avx512f {
            r.register_operator(
                entity(
                    MetricType::NormalizedCosine,
                    DataType::F32,
                    SimdLevel::Avx512,
                    normalized_cosine_distance_avx512,
                    normalize_l2_avx2,
                    l2::l2_norm_avx2,
                ),
                false,
            )?;
        }
    }

    Ok(())
}

pub fn register_normalized_angle_operators(r: &mut OperatorRegistry) -> Result<()> {
    r.register_operator(
        entity(
            MetricType::NormalizedAngle,
            DataType::F16,
            SimdLevel::None,
            normalized_angle_distance_scalar::<half::f16>,
            normalize_l2_scalar::<half::f16>,
            l2::l2_norm_scalar::<half::f16>,
        ),
        false,
    )?;
    r.register_operator(
        entity(
            MetricType::NormalizedAngle,
            DataType::F32,
            SimdLevel::None,
            normalized_angle_distance_scalar::<f32>,
            normalize_l2_scalar::<f32>,
            l2::l2_norm_scalar::<f32>,
        ),
        false,
    )?;

    #[cfg(target_arch = "x86_64")]
    {
        let features = crate::types::cpu_features();
        if features.sse41 {
            r.register_operator(
                entity(
                    MetricType::NormalizedAngle,
                    DataType::F32,
                    SimdLevel::Sse,
                    normalized_angle_distance_sse,
                    normalize_l2_scalar::<f32>,
                    l2::l2_norm_sse,
                ),
                false,
            )?;
        }
        if features.avx2 {
            r.register_operator(
                entity(
                    MetricType::NormalizedAngle,
                    DataType::F32,
                    SimdLevel::Avx2,
                    normalized_angle_distance_avx2,
                    normalize_l2_avx2,
                    l2::l2_norm_avx2,
                ),
                false,
            )?;
        }
    }

    Ok(())
}
