//! Core data types shared by the event store, functors and the provider.

use glam::Vec3;

/// A positioned scalar sample contributed by one simulation entity.
///
/// Events carry no timestamp: they belong to whichever frame the owning
/// event source currently has selected.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Event {
  /// Position in data space (micrometers for circuit data).
  pub position: Vec3,
  /// Sample value (voltage, current, spike count, ...).
  pub value: f32,
}

impl Event {
  pub fn new(position: Vec3, value: f32) -> Self {
    Self { position, value }
  }

  /// Shorthand used heavily by tests and synthetic sources.
  pub fn at(x: f32, y: f32, z: f32, value: f32) -> Self {
    Self::new(Vec3::new(x, y, z), value)
  }
}

/// Axis-aligned bounding box in data space.
///
/// Queries treat both corners as inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
  pub min: Vec3,
  pub max: Vec3,
}

impl Aabb {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: Vec3::splat(f32::INFINITY),
      max: Vec3::splat(f32::NEG_INFINITY),
    }
  }

  /// Create AABB from min/max corners.
  pub fn new(min: Vec3, max: Vec3) -> Self {
    Self { min, max }
  }

  /// Create AABB from center and half-extents.
  pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
    Self {
      min: center - half_extents,
      max: center + half_extents,
    }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Expand AABB to include another box.
  #[inline]
  pub fn merge(&mut self, other: &Aabb) {
    if other.is_valid() {
      self.encapsulate(other.min);
      self.encapsulate(other.max);
    }
  }

  /// Grow the box by `distance` on every side.
  #[inline]
  pub fn expanded(&self, distance: f32) -> Self {
    Self {
      min: self.min - Vec3::splat(distance),
      max: self.max + Vec3::splat(distance),
    }
  }

  /// Check if AABB is valid (min <= max on all axes, all finite).
  pub fn is_valid(&self) -> bool {
    self.min.is_finite() && self.max.is_finite() && self.min.cmple(self.max).all()
  }

  /// Check if this AABB contains a point (boundary inclusive).
  #[inline]
  pub fn contains_point(&self, point: Vec3) -> bool {
    point.cmpge(self.min).all() && point.cmple(self.max).all()
  }

  /// Check if this AABB overlaps with another (touching counts).
  #[inline]
  pub fn overlaps(&self, other: &Aabb) -> bool {
    self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
  }

  /// Get the size of the AABB (max - min).
  #[inline]
  pub fn size(&self) -> Vec3 {
    self.max - self.min
  }

  /// Get the center of the AABB.
  #[inline]
  pub fn center(&self) -> Vec3 {
    (self.min + self.max) * 0.5
  }
}

impl Default for Aabb {
  fn default() -> Self {
    Self::empty()
  }
}

/// Frames currently available for sampling, as the half-open range
/// `[start, end)`.
///
/// `end` counts produced frames; `end == 0` means no frame exists yet. Ranges
/// reported by a source only ever grow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FrameRange {
  pub start: u32,
  pub end: u32,
}

impl FrameRange {
  pub const EMPTY: Self = Self { start: 0, end: 0 };

  pub fn new(start: u32, end: u32) -> Self {
    Self { start, end }
  }

  /// True once at least one frame has been produced.
  #[inline]
  pub fn has_frames(&self) -> bool {
    self.end > self.start
  }

  #[inline]
  pub fn contains(&self, frame: u32) -> bool {
    frame >= self.start && frame < self.end
  }

  #[inline]
  pub fn len(&self) -> u32 {
    self.end.saturating_sub(self.start)
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
