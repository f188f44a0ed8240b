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

//! Metric Operator Registry
//!
//! A capability table indexed by (metric, data type, SIMD tier), populated at
//! startup and frozen with [`OperatorRegistry::finish_build`]. Vector spaces
//! resolve their distance/normalize/norm bindings against it at configuration
//! time; nothing in the hot path consults the table.
//!
//! The registry is an explicit context object, not a process-wide global:
//! construct one at startup, install the built-in operators, optionally
//! register custom kernels, freeze it, then share it read-only.
//!
//! ```text
//! metric ──► data type ──► simd tier ──► OperatorEntity
//!   init        init          init
//! ```
//!
//! Each level carries an `init` flag; lookups report `Unavailable` for any
//! level that was never populated and never fall back to a different tier.
//! Tier fallback, where desired, belongs to the caller (see
//! [`crate::space::VectorSpace`], which always resolves the tier-`None`
//! operator as the portable reference alongside the requested tier).

use crate::error::{AxonError, Result};
use crate::kernels;
use crate::types::{
    DataType, MetricType, SimdLevel, DATA_TYPE_COUNT, METRIC_TYPE_COUNT, SIMD_LEVEL_COUNT,
};

// ============================================================================
// Operator Entity
// ============================================================================

/// In-place/out-of-place vector normalization over raw bytes.
pub type NormalizeFn = fn(input: &[u8], output: &mut [u8]);

/// Pairwise distance over two equal-length byte spans.
pub type DistanceFn = fn(a: &[u8], b: &[u8]) -> f32;

/// Scalar norm of one vector.
pub type NormFn = fn(a: &[u8]) -> f32;

/// A registered kernel capability record.
///
/// `supports == false` marks an empty slot; such an entity is never returned
/// from a successful lookup.
#[derive(Debug, Clone, Copy)]
pub struct OperatorEntity {
    pub supports: bool,

    /// Whether the caller must pre-normalize operands before use.
    pub need_normalize_vector: bool,

    pub simd_level: SimdLevel,

    pub metric: MetricType,

    pub data_type: DataType,

    pub normalize: Option<NormalizeFn>,

    pub distance: Option<DistanceFn>,

    pub norm: Option<NormFn>,
}

impl Default for OperatorEntity {
    fn default() -> Self {
        Self {
            supports: false,
            need_normalize_vector: false,
            simd_level: SimdLevel::None,
            metric: MetricType::Undefined,
            data_type: DataType::None,
            normalize: None,
            distance: None,
            norm: None,
        }
    }
}

// ============================================================================
// Registry Table
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct TierSlot {
    init: bool,
    entity: OperatorEntity,
}

#[derive(Debug, Clone, Copy)]
struct DataTypeSlots {
    init: bool,
    tiers: [TierSlot; SIMD_LEVEL_COUNT],
}

impl Default for DataTypeSlots {
    fn default() -> Self {
        Self {
            init: false,
            tiers: [TierSlot::default(); SIMD_LEVEL_COUNT],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MetricSlots {
    init: bool,
    data_types: [DataTypeSlots; DATA_TYPE_COUNT],
}

impl Default for MetricSlots {
    fn default() -> Self {
        Self {
            init: false,
            data_types: [DataTypeSlots::default(); DATA_TYPE_COUNT],
        }
    }
}

/// The operator capability table.
///
/// Lifecycle: [`new`](OperatorRegistry::new) →
/// [`install_builtin_operators`](OperatorRegistry::install_builtin_operators)
/// → optional custom [`register_operator`](OperatorRegistry::register_operator)
/// calls → [`finish_build`](OperatorRegistry::finish_build), after which the
/// table is immutable and safely shared read-only across threads.
pub struct OperatorRegistry {
    finished: bool,
    builtins_installed: bool,
    metrics: Vec<MetricSlots>,
}

impl OperatorRegistry {
    /// Create an empty, mutable registry.
    pub fn new() -> Self {
        Self {
            finished: false,
            builtins_installed: false,
            metrics: vec![MetricSlots::default(); METRIC_TYPE_COUNT],
        }
    }

    /// Create a registry with the built-in operators already installed.
    ///
    /// The result is still mutable; callers may add custom operators before
    /// calling [`finish_build`](OperatorRegistry::finish_build).
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        registry.install_builtin_operators()?;
        Ok(registry)
    }

    /// Install the built-in kernel family.
    ///
    /// Registers the portable scalar operators for every supported
    /// (metric, data type) pair and, where runtime CPU detection allows,
    /// the SSE/AVX2/AVX-512 f32 variants. Idempotent: a second call is a
    /// no-op, not an error.
    pub fn install_builtin_operators(&mut self) -> Result<()> {
        if self.builtins_installed {
            return Ok(());
        }
        kernels::l1::register_l1_operators(self)?;
        kernels::l2::register_l2_operators(self)?;
        kernels::ip::register_ip_operators(self)?;
        kernels::hamming::register_hamming_operators(self)?;
        kernels::jaccard::register_jaccard_operators(self)?;
        kernels::cosine::register_cosine_operators(self)?;
        kernels::angle::register_angle_operators(self)?;
        kernels::normalized::register_normalized_l2_operators(self)?;
        kernels::normalized::register_normalized_cosine_operators(self)?;
        kernels::normalized::register_normalized_angle_operators(self)?;
        self.builtins_installed = true;
        Ok(())
    }

    /// Register one operator at its (metric, data type, tier) triple.
    ///
    /// Fails with `FailedPrecondition` once the registry is finalized, with
    /// `InvalidArgument` for undefined keys, and with `AlreadyExists` when
    /// the slot is occupied and `replace` is false. Ancestor level `init`
    /// flags are set idempotently.
    pub fn register_operator(&mut self, entity: OperatorEntity, replace: bool) -> Result<()> {
        if self.finished {
            return Err(AxonError::FailedPrecondition(
                "registry already finalized".to_string(),
            ));
        }
        if entity.metric == MetricType::Undefined {
            return Err(AxonError::InvalidArgument(format!(
                "invalid metric type: {:?}",
                entity.metric
            )));
        }
        if entity.data_type == DataType::None {
            return Err(AxonError::InvalidArgument(format!(
                "invalid data type: {:?}",
                entity.data_type
            )));
        }

        let metric_slot = &mut self.metrics[entity.metric as usize];
        metric_slot.init = true;

        let dt_slot = &mut metric_slot.data_types[entity.data_type as usize];
        dt_slot.init = true;

        let tier_slot = &mut dt_slot.tiers[entity.simd_level as usize];
        if tier_slot.init && !replace {
            return Err(AxonError::AlreadyExists(format!(
                "operator already registered: {:?}/{:?}/{:?}",
                entity.metric, entity.data_type, entity.simd_level
            )));
        }
        tier_slot.init = true;
        tier_slot.entity = entity;
        Ok(())
    }

    /// Look up the operator at the exact (metric, data type, tier) triple.
    ///
    /// Returns `Unavailable` when any level, including the leaf tier, was
    /// never populated. Never falls back to another tier.
    pub fn get_metric_operator(
        &self,
        metric: MetricType,
        data_type: DataType,
        simd_level: SimdLevel,
    ) -> Result<OperatorEntity> {
        if metric == MetricType::Undefined {
            return Err(AxonError::InvalidArgument(format!(
                "invalid metric type: {metric:?}"
            )));
        }
        let metric_slot = &self.metrics[metric as usize];
        if !metric_slot.init {
            return Err(AxonError::Unavailable(format!(
                "unavailable metric type: {metric:?}"
            )));
        }

        if data_type == DataType::None {
            return Err(AxonError::InvalidArgument(format!(
                "invalid data type: {data_type:?}"
            )));
        }
        let dt_slot = &metric_slot.data_types[data_type as usize];
        if !dt_slot.init {
            return Err(AxonError::Unavailable(format!(
                "unavailable data type: {data_type:?} for metric {metric:?}"
            )));
        }

        let tier_slot = &dt_slot.tiers[simd_level as usize];
        if !tier_slot.init {
            return Err(AxonError::Unavailable(format!(
                "unavailable simd level: {simd_level:?} for {metric:?}/{data_type:?}"
            )));
        }
        Ok(tier_slot.entity)
    }

    /// Every registered entity with `supports == true`, in table order
    /// (metric, then data type, then tier). Introspection only.
    pub fn all_metric_operators(&self) -> Vec<OperatorEntity> {
        let mut result = Vec::new();
        for metric_slot in &self.metrics {
            if !metric_slot.init {
                continue;
            }
            for dt_slot in &metric_slot.data_types {
                if !dt_slot.init {
                    continue;
                }
                for tier_slot in &dt_slot.tiers {
                    if tier_slot.init && tier_slot.entity.supports {
                        result.push(tier_slot.entity);
                    }
                }
            }
        }
        result
    }

    /// Freeze the table. Further registration fails with `FailedPrecondition`.
    pub fn finish_build(&mut self) {
        self.finished = true;
        tracing::debug!(
            operators = self.all_metric_operators().len(),
            "operator registry finalized"
        );
    }

    /// Whether the table has been frozen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cpu_features;

    fn dummy_distance(_a: &[u8], _b: &[u8]) -> f32 {
        42.0
    }

    fn other_distance(_a: &[u8], _b: &[u8]) -> f32 {
        7.0
    }

    fn entity(metric: MetricType, dt: DataType, level: SimdLevel) -> OperatorEntity {
        OperatorEntity {
            supports: true,
            metric,
            data_type: dt,
            simd_level: level,
            distance: Some(dummy_distance),
            ..Default::default()
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = OperatorRegistry::new();
        registry
            .register_operator(entity(MetricType::L2, DataType::F32, SimdLevel::None), false)
            .unwrap();

        let op = registry
            .get_metric_operator(MetricType::L2, DataType::F32, SimdLevel::None)
            .unwrap();
        assert!(op.supports);
        assert_eq!(op.metric, MetricType::L2);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = OperatorRegistry::new();
        let e = entity(MetricType::L2, DataType::F32, SimdLevel::None);
        registry.register_operator(e, false).unwrap();

        assert!(matches!(
            registry.register_operator(e, false),
            Err(AxonError::AlreadyExists(_))
        ));

        // replace=true wins and subsequent lookups see the newer entity
        let mut newer = e;
        newer.distance = Some(other_distance);
        registry.register_operator(newer, true).unwrap();
        let op = registry
            .get_metric_operator(MetricType::L2, DataType::F32, SimdLevel::None)
            .unwrap();
        assert_eq!((op.distance.unwrap())(&[], &[]), 7.0);
    }

    #[test]
    fn test_invalid_keys() {
        let mut registry = OperatorRegistry::new();
        assert!(matches!(
            registry.register_operator(
                entity(MetricType::Undefined, DataType::F32, SimdLevel::None),
                false
            ),
            Err(AxonError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.register_operator(
                entity(MetricType::L2, DataType::None, SimdLevel::None),
                false
            ),
            Err(AxonError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.get_metric_operator(MetricType::Undefined, DataType::F32, SimdLevel::None),
            Err(AxonError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unpopulated_levels() {
        let mut registry = OperatorRegistry::new();
        registry
            .register_operator(entity(MetricType::L2, DataType::F32, SimdLevel::None), false)
            .unwrap();

        // never-touched metric
        assert!(matches!(
            registry.get_metric_operator(MetricType::L1, DataType::F32, SimdLevel::None),
            Err(AxonError::Unavailable(_))
        ));
        // populated metric, untouched data type
        assert!(matches!(
            registry.get_metric_operator(MetricType::L2, DataType::U8, SimdLevel::None),
            Err(AxonError::Unavailable(_))
        ));
        // populated pair, untouched tier: no silent fallback
        assert!(matches!(
            registry.get_metric_operator(MetricType::L2, DataType::F32, SimdLevel::Avx512),
            Err(AxonError::Unavailable(_))
        ));
    }

    #[test]
    fn test_finish_build_freezes() {
        let mut registry = OperatorRegistry::new();
        registry
            .register_operator(entity(MetricType::L2, DataType::F32, SimdLevel::None), false)
            .unwrap();
        registry.finish_build();
        assert!(registry.is_finished());
        assert!(matches!(
            registry.register_operator(
                entity(MetricType::L1, DataType::F32, SimdLevel::None),
                false
            ),
            Err(AxonError::FailedPrecondition(_))
        ));
        // reads still work
        assert!(registry
            .get_metric_operator(MetricType::L2, DataType::F32, SimdLevel::None)
            .is_ok());
    }

    #[test]
    fn test_builtins_idempotent() {
        let mut registry = OperatorRegistry::new();
        registry.install_builtin_operators().unwrap();
        let count = registry.all_metric_operators().len();
        assert!(count > 0);
        // second install is a no-op, not a duplicate-registration error
        registry.install_builtin_operators().unwrap();
        assert_eq!(registry.all_metric_operators().len(), count);
    }

    #[test]
    fn test_builtin_coverage() {
        let registry = OperatorRegistry::with_builtins().unwrap();
        // every float metric has a portable f32 fallback
        for metric in [
            MetricType::L1,
            MetricType::L2,
            MetricType::Ip,
            MetricType::Cosine,
            MetricType::Angle,
            MetricType::NormalizedL2,
            MetricType::NormalizedCosine,
            MetricType::NormalizedAngle,
        ] {
            let op = registry
                .get_metric_operator(metric, DataType::F32, SimdLevel::None)
                .unwrap();
            assert!(op.supports, "{metric:?} missing portable fallback");
            assert!(op.distance.is_some());
        }
        // bit metrics are keyed on u8
        for metric in [MetricType::Hamming, MetricType::Jaccard] {
            let op = registry
                .get_metric_operator(metric, DataType::U8, SimdLevel::None)
                .unwrap();
            assert!(op.supports);
        }
        // every operator visible through introspection is usable
        for op in registry.all_metric_operators() {
            assert!(op.supports);
        }
        // detected tiers were registered for L2/f32
        let features = cpu_features();
        if features.avx2 {
            assert!(registry
                .get_metric_operator(MetricType::L2, DataType::F32, SimdLevel::Avx2)
                .is_ok());
        }
    }
}
