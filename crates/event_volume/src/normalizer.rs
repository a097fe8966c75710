//! Range normalization from raw functor values into voxel output types.
//!
//! ```text
//! output = clamp((raw - min) / (max - min), 0, 1) * T::MAX_OUTPUT
//! ```
//!
//! Saturating at both ends: anything at or below `min` becomes the output
//! minimum, anything at or above `max` the output maximum.

use std::fmt;

/// Raw value range mapped onto the full output range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputRange {
  pub min: f32,
  pub max: f32,
}

impl InputRange {
  pub const fn new(min: f32, max: f32) -> Self {
    Self { min, max }
  }
}

impl fmt::Display for InputRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}, {}]", self.min, self.max)
  }
}

/// Numeric type a voxel block is produced in.
///
/// Only the types actually streamed are implemented: `u8` and `u16` for
/// textures, `f32` for intermediate or export volumes.
pub trait VoxelValue:
  bytemuck::Pod + Default + PartialOrd + fmt::Debug + Send + Sync + 'static
{
  /// Value produced for a raw value at or above the input maximum.
  const MAX_OUTPUT: f32;

  /// Value of voxels with no contributing events.
  const BACKGROUND: Self;

  /// Convert a unit-interval value (already clamped) to this type.
  fn from_unit(t: f32) -> Self;

  /// Bytes per voxel component.
  #[inline]
  fn bytes_per_voxel() -> usize {
    std::mem::size_of::<Self>()
  }
}

impl VoxelValue for u8 {
  const MAX_OUTPUT: f32 = u8::MAX as f32;
  const BACKGROUND: Self = 0;

  #[inline(always)]
  fn from_unit(t: f32) -> Self {
    (t * Self::MAX_OUTPUT).round() as u8
  }
}

impl VoxelValue for u16 {
  const MAX_OUTPUT: f32 = u16::MAX as f32;
  const BACKGROUND: Self = 0;

  #[inline(always)]
  fn from_unit(t: f32) -> Self {
    (t * Self::MAX_OUTPUT).round() as u16
  }
}

impl VoxelValue for f32 {
  const MAX_OUTPUT: f32 = 1.0;
  const BACKGROUND: Self = 0.0;

  #[inline(always)]
  fn from_unit(t: f32) -> Self {
    t
  }
}

/// Rescales and clamps raw aggregates into a bounded output range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeNormalizer {
  range: InputRange,
}

impl RangeNormalizer {
  pub fn new(range: InputRange) -> Self {
    Self { range }
  }

  pub fn range(&self) -> InputRange {
    self.range
  }

  /// Position of `raw` within the input range, clamped to `[0, 1]`.
  ///
  /// NaN maps to 0. A degenerate range acts as a step at `max`.
  #[inline]
  pub fn unit(&self, raw: f32) -> f32 {
    let InputRange { min, max } = self.range;
    let width = max - min;
    let t = if width > 0.0 {
      (raw - min) / width
    } else if raw >= max {
      1.0
    } else {
      0.0
    };
    if t.is_nan() {
      0.0
    } else {
      t.clamp(0.0, 1.0)
    }
  }

  /// Scale `raw` into the output type's range.
  #[inline]
  pub fn scale<T: VoxelValue>(&self, raw: f32) -> T {
    T::from_unit(self.unit(raw))
  }
}
