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

//! Angular distance: `acos` of the clamped cosine, composed per tier from
//! the cosine kernels.

use crate::error::Result;
use crate::kernels::cosine;
use crate::kernels::Element;
use crate::registry::{OperatorEntity, OperatorRegistry};
use crate::types::{DataType, MetricType, SimdLevel};

/// Clamped arccosine: identical direction maps to 0, opposite to π.
#[inline]
pub(crate) fn angle_from_cosine(cosine: f32) -> f32 {
    if cosine >= 1.0 {
        0.0
    } else if cosine <= -1.0 {
        std::f32::consts::PI
    } else {
        cosine.acos()
    }
}

pub fn angle_distance_scalar<T: Element>(a: &[u8], b: &[u8]) -> f32 {
    angle_from_cosine(cosine::cosine_distance_scalar::<T>(a, b))
}

#[cfg(target_arch = "x86_64")]
pub fn angle_distance_sse(a: &[u8], b: &[u8]) -> f32 {
    angle_from_cosine(cosine::cosine_distance_sse(a, b))
}

#[cfg(target_arch = "x86_64")]
pub fn angle_distance_avx2(a: &[u8], b: &[u8]) -> f32 {
    angle_from_cosine(cosine::cosine_distance_avx2(a, b))
}

fn scalar_entity(data_type: DataType, distance: crate::registry::DistanceFn) -> OperatorEntity {
    OperatorEntity {
        supports: true,
        metric: MetricType::Angle,
        data_type,
        simd_level: SimdLevel::None,
        distance: Some(distance),
        ..Default::default()
    }
}

pub fn register_angle_operators(r: &mut OperatorRegistry) -> Result<()> {
    r.register_operator(
        scalar_entity(DataType::U8, angle_distance_scalar::<u8>),
        false,
    )?;
    r.register_operator(
        scalar_entity(DataType::F16, angle_distance_scalar::<half::f16>),
        false,
    )?;
    r.register_operator(
        scalar_entity(DataType::F32, angle_distance_scalar::<f32>),
        false,
    )?;

    #[cfg(target_arch = "x86_64")]
    {
        let features = crate::types::cpu_features();
        if features.sse41 {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::Angle,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Sse,
                    distance: Some(angle_distance_sse),
                    ..Default::default()
                },
                false,
            )?;
        }
        if features.avx2 {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::Angle,
                    data_type: DataType::F32,
                    simd_level: SimdLevel::Avx2,
                    distance: Some(angle_distance_avx2),
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
    fn test_angle_identical() {
        let a = aligned_f32(&[1.0, 2.0, 3.0, 4.0]);
        assert!(angle_distance_scalar::<f32>(&a, &a).abs() < 1e-3);
    }

    #[test]
    fn test_angle_opposite() {
        let a = aligned_f32(&[1.0, 0.0, 0.0, 0.0]);
        let b = aligned_f32(&[-1.0, 0.0, 0.0, 0.0]);
        let d = angle_distance_scalar::<f32>(&a, &b);
        assert!((d - std::f32::consts::PI).abs() < 1e-5);
    }

    #[test]
    fn test_angle_orthogonal() {
        let a = aligned_f32(&[1.0, 0.0, 0.0, 0.0]);
        let b = aligned_f32(&[0.0, 1.0, 0.0, 0.0]);
        let d = angle_distance_scalar::<f32>(&a, &b);
        assert!((d - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_angle_clamp_bounds() {
        assert_eq!(angle_from_cosine(1.5), 0.0);
        assert_eq!(angle_from_cosine(-1.5), std::f32::consts::PI);
    }

    #[test]
    fn test_angle_tiers_agree() {
        let av = random_f32(61, 51);
        let bv = random_f32(61, 52);
        let a = aligned_f32(&av);
        let b = aligned_f32(&bv);
        let reference = angle_distance_scalar::<f32>(&a, &b);
        #[cfg(target_arch = "x86_64")]
        {
            let features = crate::types::cpu_features();
            if features.sse41 {
                assert_close(reference, angle_distance_sse(&a, &b), 1e-3);
            }
            if features.avx2 {
                assert_close(reference, angle_distance_avx2(&a, &b), 1e-3);
            }
        }
        assert!((0.0..=std::f32::consts::PI).contains(&reference));
    }
}
