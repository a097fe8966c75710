//! Aggregation functors: reduce the events around one voxel to a scalar.
//!
//! ```text
//!   center, spacing ──► region = center ± spacing/2 (± extend)
//!                               │
//!                               ▼
//!                     EventSource::find_events
//!                               │
//!             ┌───────────┬─────┴──────┬─────────────┐
//!             ▼           ▼            ▼             ▼
//!          Density      Field      Frequency        Lfp
//!          Σ value   Σ value·w(d)  max value   Σ value·w(d)/4πσ
//!             └───────────┴─────┬──────┴─────────────┘
//!                               ▼
//!                 RangeNormalizer::scale (or background)
//! ```
//!
//! The variant set is closed, so functors are one struct tagged with a
//! [`FunctorType`] rather than a trait hierarchy. Field and LFP only count
//! events within `cutoff` of the voxel center; `extend` widens the query box
//! so that those events can lie outside the voxel itself.

pub mod kernel;

use std::f32::consts::PI;
use std::fmt;

use glam::Vec3;

pub use kernel::FalloffKernel;

use crate::constants::{DEFAULT_CONDUCTIVITY, DEFAULT_CUTOFF, DEFAULT_EXTEND, LFP_MIN_DISTANCE};
use crate::normalizer::{InputRange, RangeNormalizer, VoxelValue};
use crate::source::EventSource;
use crate::types::{Aabb, Event};

/// Aggregation variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunctorType {
  /// Sum of event values: accumulated mass or charge per voxel.
  Density,
  /// Distance-weighted sum: continuous field spreading.
  Field,
  /// Maximum event value: peak activity.
  Frequency,
  /// Point-source extracellular potential with a hard cutoff.
  Lfp,
}

impl FunctorType {
  pub const ALL: [FunctorType; 4] = [
    FunctorType::Density,
    FunctorType::Field,
    FunctorType::Frequency,
    FunctorType::Lfp,
  ];

  /// Parse a configuration value (`density`, `field`, `frequency`, `lfp`).
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "density" => Some(FunctorType::Density),
      "field" => Some(FunctorType::Field),
      "frequency" => Some(FunctorType::Frequency),
      "lfp" => Some(FunctorType::Lfp),
      _ => None,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      FunctorType::Density => "density",
      FunctorType::Field => "field",
      FunctorType::Frequency => "frequency",
      FunctorType::Lfp => "lfp",
    }
  }

  /// True for variants that weight events by distance.
  pub fn is_distance_sensitive(&self) -> bool {
    matches!(self, FunctorType::Field | FunctorType::Lfp)
  }
}

impl fmt::Display for FunctorType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FunctorType::Lfp => f.write_str("LFP functor"),
      other => write!(f, "{} functor", other.name()),
    }
  }
}

/// Tuning for the distance-sensitive variants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FunctorParams {
  /// Events farther than this from the voxel center do not contribute.
  pub cutoff: f32,
  /// Widening of the query box on every side.
  pub extend: f32,
  /// Distance weighting.
  pub kernel: FalloffKernel,
  /// Extracellular conductivity in S/m (LFP only).
  pub conductivity: f32,
}

impl FunctorParams {
  /// Defaults for a functor type: inverse-square field, point-source LFP.
  pub fn for_type(functor: FunctorType) -> Self {
    let kernel = match functor {
      FunctorType::Lfp => FalloffKernel::Inverse {
        min_distance: LFP_MIN_DISTANCE,
      },
      _ => FalloffKernel::default(),
    };
    Self {
      cutoff: DEFAULT_CUTOFF,
      extend: DEFAULT_EXTEND,
      kernel,
      conductivity: DEFAULT_CONDUCTIVITY,
    }
  }

  pub fn with_cutoff(mut self, cutoff: f32) -> Self {
    self.cutoff = cutoff.max(0.0);
    self
  }

  pub fn with_extend(mut self, extend: f32) -> Self {
    self.extend = extend.max(0.0);
    self
  }

  pub fn with_kernel(mut self, kernel: FalloffKernel) -> Self {
    self.kernel = kernel;
    self
  }

  pub fn with_conductivity(mut self, conductivity: f32) -> Self {
    self.conductivity = conductivity;
    self
  }
}

/// One configured aggregation strategy plus its output normalizer.
#[derive(Clone, Debug, PartialEq)]
pub struct EventFunctor {
  kind: FunctorType,
  params: FunctorParams,
  normalizer: RangeNormalizer,
}

impl EventFunctor {
  pub fn new(kind: FunctorType, input_range: InputRange) -> Self {
    Self {
      kind,
      params: FunctorParams::for_type(kind),
      normalizer: RangeNormalizer::new(input_range),
    }
  }

  pub fn with_params(mut self, params: FunctorParams) -> Self {
    self.params = params;
    self
  }

  pub fn kind(&self) -> FunctorType {
    self.kind
  }

  pub fn params(&self) -> &FunctorParams {
    &self.params
  }

  pub fn normalizer(&self) -> &RangeNormalizer {
    &self.normalizer
  }

  /// Support region of the voxel at `center` with the given `spacing`.
  pub fn query_region(&self, center: Vec3, spacing: Vec3) -> Aabb {
    let region = Aabb::from_center_half_extents(center, spacing * 0.5);
    if self.kind.is_distance_sensitive() && self.params.extend > 0.0 {
      region.expanded(self.params.extend)
    } else {
      region
    }
  }

  /// Raw aggregate before normalization.
  ///
  /// `None` means nothing contributed: no source attached, no events in the
  /// region, or every match beyond the cutoff.
  pub fn reduce(&self, source: Option<&dyn EventSource>, center: Vec3, spacing: Vec3) -> Option<f32> {
    let source = source?;
    let events = source.find_events(&self.query_region(center, spacing));
    if events.is_empty() {
      return None;
    }
    self.reduce_events(&events, center)
  }

  /// Reduce an already-queried match set.
  pub fn reduce_events(&self, events: &[Event], center: Vec3) -> Option<f32> {
    if events.is_empty() {
      return None;
    }

    match self.kind {
      FunctorType::Density => Some(events.iter().map(|e| e.value).sum()),
      // Spike rates are non-negative; the fold starts at zero.
      FunctorType::Frequency => Some(events.iter().fold(0.0f32, |acc, e| acc.max(e.value))),
      FunctorType::Field => self.weighted_sum(events, center, 1.0),
      FunctorType::Lfp => {
        let factor = 1.0 / (4.0 * PI * self.params.conductivity);
        self.weighted_sum(events, center, factor)
      }
    }
  }

  fn weighted_sum(&self, events: &[Event], center: Vec3, factor: f32) -> Option<f32> {
    let cutoff_sq = self.params.cutoff * self.params.cutoff;
    let mut sum = 0.0f32;
    let mut contributed = false;
    for event in events {
      let distance_sq = event.position.distance_squared(center);
      if distance_sq > cutoff_sq {
        continue;
      }
      sum += event.value * self.params.kernel.weight(distance_sq.sqrt());
      contributed = true;
    }
    contributed.then_some(sum * factor)
  }

  /// Normalized value of the voxel at `center`.
  ///
  /// Voxels with no contribution are [`VoxelValue::BACKGROUND`].
  #[inline]
  pub fn evaluate<T: VoxelValue>(&self, source: Option<&dyn EventSource>, center: Vec3, spacing: Vec3) -> T {
    match self.reduce(source, center, spacing) {
      Some(raw) => self.normalizer.scale(raw),
      None => T::BACKGROUND,
    }
  }
}
