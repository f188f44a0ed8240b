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

//! Jaccard distance over bit sets: `1 − |A∩B| / |A∪B|` computed as
//! popcount(AND) / popcount(OR) across 64-bit words, 0.0 on empty union.

use crate::error::Result;
use crate::kernels::elements_of;
use crate::registry::{OperatorEntity, OperatorRegistry};
use crate::types::{DataType, MetricType, SimdLevel};

/// Scalar reference kernel over 64-bit words, unrolled by 4.
pub fn jaccard_distance_scalar(a: &[u8], b: &[u8]) -> f32 {
    let pa = elements_of::<u64>(a);
    let pb = elements_of::<u64>(b);
    let n = pa.len();
    let mut intersection = 0u64;
    let mut union = 0u64;
    let mut i = 0;
    while i + 4 <= n {
        intersection += ((pa[i] & pb[i]).count_ones()
            + (pa[i + 1] & pb[i + 1]).count_ones()
            + (pa[i + 2] & pb[i + 2]).count_ones()
            + (pa[i + 3] & pb[i + 3]).count_ones()) as u64;
        union += ((pa[i] | pb[i]).count_ones()
            + (pa[i + 1] | pb[i + 1]).count_ones()
            + (pa[i + 2] | pb[i + 2]).count_ones()
            + (pa[i + 3] | pb[i + 3]).count_ones()) as u64;
        i += 4;
    }
    while i < n {
        intersection += (pa[i] & pb[i]).count_ones() as u64;
        union += (pa[i] | pb[i]).count_ones() as u64;
        i += 1;
    }
    if union == 0 {
        return 0.0;
    }
    1.0 - intersection as f32 / union as f32
}

/// AVX2 kernel: AND/OR popcounts via the nibble-LUT shuffle.
#[cfg(target_arch = "x86_64")]
pub fn jaccard_distance_avx2(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "avx2")]
    unsafe fn inner(a: &[u8], b: &[u8]) -> f32 {
        use std::arch::x86_64::*;

        #[inline]
        #[target_feature(enable = "avx2")]
        unsafe fn popcount256(v: __m256i, lookup: __m256i, low_mask: __m256i) -> __m256i {
            let lo = _mm256_and_si256(v, low_mask);
            let hi = _mm256_and_si256(_mm256_srli_epi16(v, 4), low_mask);
            let cnt = _mm256_add_epi8(
                _mm256_shuffle_epi8(lookup, lo),
                _mm256_shuffle_epi8(lookup, hi),
            );
            _mm256_sad_epu8(cnt, _mm256_setzero_si256())
        }

        let n = a.len();
        let chunks = n / 32;
        let lookup = _mm256_setr_epi8(
            0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4, 0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3,
            2, 3, 3, 4,
        );
        let low_mask = _mm256_set1_epi8(0x0f);
        let mut acc_and = _mm256_setzero_si256();
        let mut acc_or = _mm256_setzero_si256();
        for i in 0..chunks {
            let va = _mm256_loadu_si256(a.as_ptr().add(i * 32) as *const __m256i);
            let vb = _mm256_loadu_si256(b.as_ptr().add(i * 32) as *const __m256i);
            acc_and = _mm256_add_epi64(
                acc_and,
                popcount256(_mm256_and_si256(va, vb), lookup, low_mask),
            );
            acc_or = _mm256_add_epi64(
                acc_or,
                popcount256(_mm256_or_si256(va, vb), lookup, low_mask),
            );
        }
        let mut lanes_and = [0u64; 4];
        let mut lanes_or = [0u64; 4];
        _mm256_storeu_si256(lanes_and.as_mut_ptr() as *mut __m256i, acc_and);
        _mm256_storeu_si256(lanes_or.as_mut_ptr() as *mut __m256i, acc_or);
        let mut intersection: u64 = lanes_and.iter().sum();
        let mut union: u64 = lanes_or.iter().sum();

        let pa = crate::kernels::elements_of::<u64>(a);
        let pb = crate::kernels::elements_of::<u64>(b);
        for i in (chunks * 4)..pa.len() {
            intersection += (pa[i] & pb[i]).count_ones() as u64;
            union += (pa[i] | pb[i]).count_ones() as u64;
        }
        if union == 0 {
            return 0.0;
        }
        1.0 - intersection as f32 / union as f32
    }

    if is_x86_feature_detected!("avx2") {
        unsafe { inner(a, b) }
    } else {
        jaccard_distance_scalar(a, b)
    }
}

pub fn register_jaccard_operators(r: &mut OperatorRegistry) -> Result<()> {
    r.register_operator(
        OperatorEntity {
            supports: true,
            metric: MetricType::Jaccard,
            data_type: DataType::U8,
            simd_level: SimdLevel::None,
            distance: Some(jaccard_distance_scalar),
            ..Default::default()
        },
        false,
    )?;

    #[cfg(target_arch = "x86_64")]
    {
        if crate::types::cpu_features().avx2 {
            r.register_operator(
                OperatorEntity {
                    supports: true,
                    metric: MetricType::Jaccard,
                    data_type: DataType::U8,
                    simd_level: SimdLevel::Avx2,
                    distance: Some(jaccard_distance_avx2),
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
    use crate::kernels::test_util::aligned_u8;

    #[test]
    fn test_jaccard_identical_nonzero() {
        let a = aligned_u8(&[0b1010_1010; 64]);
        assert_eq!(jaccard_distance_scalar(&a, &a), 0.0);
    }

    #[test]
    fn test_jaccard_disjoint() {
        let a = aligned_u8(&[0b1010_1010; 64]);
        let b = aligned_u8(&[0b0101_0101; 64]);
        assert_eq!(jaccard_distance_scalar(&a, &b), 1.0);
    }

    #[test]
    fn test_jaccard_empty_union() {
        let zero = aligned_u8(&[0u8; 64]);
        assert_eq!(jaccard_distance_scalar(&zero, &zero), 0.0);
    }

    #[test]
    fn test_jaccard_half_overlap() {
        let a = aligned_u8(&[0b0000_0011; 64]);
        let b = aligned_u8(&[0b0000_0110; 64]);
        // |A∩B| = 64, |A∪B| = 192
        let d = jaccard_distance_scalar(&a, &b);
        assert!((d - (1.0 - 64.0 / 192.0)).abs() < 1e-6);
    }

    #[test]
    fn test_jaccard_tiers_agree() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(71);
        let av: Vec<u8> = (0..256).map(|_| rng.gen()).collect();
        let bv: Vec<u8> = (0..256).map(|_| rng.gen()).collect();
        let a = aligned_u8(&av);
        let b = aligned_u8(&bv);
        let reference = jaccard_distance_scalar(&a, &b);
        #[cfg(target_arch = "x86_64")]
        assert_eq!(reference, jaccard_distance_avx2(&a, &b));
        assert!((0.0..=1.0).contains(&reference));
    }
}
