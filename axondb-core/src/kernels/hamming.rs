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

//! Bit-level Hamming distance: population count of XOR across 32-bit words.
//! Defined only over byte-equal-length spans whose length is word-aligned
//! (vector strides are 64-byte multiples, so stored vectors always qualify).

use crate::error::Result;
use crate::kernels::elements_of;
use crate::registry::{OperatorEntity, OperatorRegistry};
use crate::types::{DataType, MetricType, SimdLevel};

/// Scalar reference kernel over 32-bit words.
pub fn hamming_distance_scalar(a: &[u8], b: &[u8]) -> f32 {
    let pa = elements_of::<u32>(a);
    let pb = elements_of::<u32>(b);
    let mut count = 0u64;
    for (x, y) in pa.iter().zip(pb.iter()) {
        count += (x ^ y).count_ones() as u64;
    }
    count as f32
}

/// AVX2 kernel: 32-byte XOR blocks popcounted with the nibble-LUT shuffle,
/// lane sums folded through `psadbw`.
#[cfg(target_arch = "x86_64")]
pub fn hamming_distance_avx2(a: &[u8], b: &[u8]) -> f32 {
    #[target_feature(enable = "avx2")]
    unsafe fn inner(a: &[u8], b: &[u8]) -> f32 {
        use std::arch::x86_64::*;

        let n = a.len();
        let chunks = n / 32;
        let lookup = _mm256_setr_epi8(
            0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4, 0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3,
            2, 3, 3, 4,
        );
        let low_mask = _mm256_set1_epi8(0x0f);
        let mut acc = _mm256_setzero_si256();
        for i in 0..chunks {
            let va = _mm256_loadu_si256(a.as_ptr().add(i * 32) as *const __m256i);
            let vb = _mm256_loadu_si256(b.as_ptr().add(i * 32) as *const __m256i);
            let x = _mm256_xor_si256(va, vb);
            let lo = _mm256_and_si256(x, low_mask);
            let hi = _mm256_and_si256(_mm256_srli_epi16(x, 4), low_mask);
            let cnt = _mm256_add_epi8(
                _mm256_shuffle_epi8(lookup, lo),
                _mm256_shuffle_epi8(lookup, hi),
            );
            acc = _mm256_add_epi64(acc, _mm256_sad_epu8(cnt, _mm256_setzero_si256()));
        }
        let mut lanes = [0u64; 4];
        _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, acc);
        let mut count: u64 = lanes.iter().sum();

        let pa = crate::kernels::elements_of::<u32>(a);
        let pb = crate::kernels::elements_of::<u32>(b);
        for i in (chunks * 8)..pa.len() {
            count += (pa[i] ^ pb[i]).count_ones() as u64;
        }
        count as f32
    }

    if is_x86_feature_detected!("avx2") {
        unsafe { inner(a, b) }
    } else {
        hamming_distance_scalar(a, b)
    }
}

pub fn register_hamming_operators(r: &mut OperatorRegistry) -> Result<()> {
    r.register_operator(
        OperatorEntity {
            supports: true,
            metric: MetricType::Hamming,
            data_type: DataType::U8,
            simd_level: SimdLevel::None,
            distance: Some(hamming_distance_scalar),
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
                    metric: MetricType::Hamming,
                    data_type: DataType::U8,
                    simd_level: SimdLevel::Avx2,
                    distance: Some(hamming_distance_avx2),
                    ..Default::default()
                },
                false,
            )?;
        }
    }

    Ok(())
}
