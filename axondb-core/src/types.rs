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

//! Core enumerations: distance metric, element encoding, and SIMD tier,
//! plus runtime CPU feature detection for tier selection.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{AxonError, Result};

// ============================================================================
// Metric Type
// ============================================================================

/// Distance metric family.
///
/// `Poincare` and `Lorentz` are reserved for hyperbolic-space support; they
/// are valid registry keys but have no built-in kernels.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricType {
    Undefined = 0,
    L1 = 1,
    L2 = 2,
    Ip = 3,
    Hamming = 4,
    Jaccard = 5,
    Cosine = 6,
    Angle = 7,
    NormalizedL2 = 8,
    NormalizedCosine = 9,
    NormalizedAngle = 10,
    Poincare = 11,
    Lorentz = 12,
}

/// Number of metric slots in the registry table.
pub const METRIC_TYPE_COUNT: usize = 13;

impl MetricType {
    pub const ALL: [MetricType; 12] = [
        MetricType::L1,
        MetricType::L2,
        MetricType::Ip,
        MetricType::Hamming,
        MetricType::Jaccard,
        MetricType::Cosine,
        MetricType::Angle,
        MetricType::NormalizedL2,
        MetricType::NormalizedCosine,
        MetricType::NormalizedAngle,
        MetricType::Poincare,
        MetricType::Lorentz,
    ];
}

impl TryFrom<u32> for MetricType {
    type Error = AxonError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(MetricType::Undefined),
            1 => Ok(MetricType::L1),
            2 => Ok(MetricType::L2),
            3 => Ok(MetricType::Ip),
            4 => Ok(MetricType::Hamming),
            5 => Ok(MetricType::Jaccard),
            6 => Ok(MetricType::Cosine),
            7 => Ok(MetricType::Angle),
            8 => Ok(MetricType::NormalizedL2),
            9 => Ok(MetricType::NormalizedCosine),
            10 => Ok(MetricType::NormalizedAngle),
            11 => Ok(MetricType::Poincare),
            12 => Ok(MetricType::Lorentz),
            other => Err(AxonError::InvalidArgument(format!(
                "invalid metric type: {other}"
            ))),
        }
    }
}

// ============================================================================
// Data Type
// ============================================================================

/// Element encoding of a stored vector.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    None = 0,
    U8 = 1,
    F16 = 2,
    F32 = 3,
}

/// Number of data type slots in the registry table.
pub const DATA_TYPE_COUNT: usize = 4;

impl DataType {
    /// Byte size of one element.
    pub fn size_bytes(self) -> Result<usize> {
        match self {
            DataType::U8 => Ok(std::mem::size_of::<u8>()),
            DataType::F16 => Ok(std::mem::size_of::<half::f16>()),
            DataType::F32 => Ok(std::mem::size_of::<f32>()),
            DataType::None => Err(AxonError::InvalidArgument(
                "unknown data type".to_string(),
            )),
        }
    }
}

impl TryFrom<u32> for DataType {
    type Error = AxonError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(DataType::None),
            1 => Ok(DataType::U8),
            2 => Ok(DataType::F16),
            3 => Ok(DataType::F32),
            other => Err(AxonError::InvalidArgument(format!(
                "invalid data type: {other}"
            ))),
        }
    }
}

// ============================================================================
// SIMD Tier
// ============================================================================

/// Ordered instruction-set tier used for kernel selection.
///
/// The tier is a capability rank, not a correctness knob: every tier of a
/// metric family computes the same function, higher tiers merely do it wider.
#[repr(u32)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SimdLevel {
    None = 0,
    Sse = 1,
    Avx2 = 2,
    Avx512 = 3,
}

/// Number of SIMD tier slots in the registry table.
pub const SIMD_LEVEL_COUNT: usize = 4;

impl SimdLevel {
    /// Vector register width in bytes.
    pub fn width_bytes(self) -> usize {
        match self {
            SimdLevel::None => 1,
            SimdLevel::Sse => 16,
            SimdLevel::Avx2 => 32,
            SimdLevel::Avx512 => 64,
        }
    }

    /// f32 lanes processed per iteration at this tier.
    pub fn f32_lanes(self) -> usize {
        match self {
            SimdLevel::None => 1,
            _ => self.width_bytes() / 4,
        }
    }
}

impl TryFrom<u32> for SimdLevel {
    type Error = AxonError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(SimdLevel::None),
            1 => Ok(SimdLevel::Sse),
            2 => Ok(SimdLevel::Avx2),
            3 => Ok(SimdLevel::Avx512),
            other => Err(AxonError::InvalidArgument(format!(
                "invalid simd level: {other}"
            ))),
        }
    }
}

// ============================================================================
// CPU Feature Detection
// ============================================================================

/// Detected CPU features relevant to kernel dispatch.
#[derive(Debug, Clone, Copy)]
pub struct CpuFeatures {
    pub sse41: bool,
    pub avx2: bool,
    pub avx512f: bool,
}

impl CpuFeatures {
    /// Detect CPU features at runtime.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            Self {
                sse41: is_x86_feature_detected!("sse4.1"),
                avx2: is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma"),
                avx512f: is_x86_feature_detected!("avx512f"),
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            Self {
                sse41: false,
                avx2: false,
                avx512f: false,
            }
        }
    }

    /// Best tier the running CPU can execute.
    pub fn best_simd_level(&self) -> SimdLevel {
        if self.avx512f {
            SimdLevel::Avx512
        } else if self.avx2 {
            SimdLevel::Avx2
        } else if self.sse41 {
            SimdLevel::Sse
        } else {
            SimdLevel::None
        }
    }

    /// Whether the running CPU can execute kernels of the given tier.
    pub fn supports(&self, level: SimdLevel) -> bool {
        match level {
            SimdLevel::None => true,
            SimdLevel::Sse => self.sse41,
            SimdLevel::Avx2 => self.avx2,
            SimdLevel::Avx512 => self.avx512f,
        }
    }
}

static CPU_FEATURES: OnceLock<CpuFeatures> = OnceLock::new();

/// Cached CPU feature detection.
pub fn cpu_features() -> CpuFeatures {
    *CPU_FEATURES.get_or_init(CpuFeatures::detect)
}
