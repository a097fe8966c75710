//! Uniform-grid spatial index for one frame of events.
//!
//! Events are bucketed into cubic cells and stored contiguously per cell
//! (compressed-row layout), so a region query touches only the cells that
//! overlap the region and then filters by exact containment.
//!
//! ```text
//! cell_starts: [0, 3, 3, 7, ...]      events: [e e e | e e e e | ...]
//!               │  │  │                          cell 0  cell 2
//!               │  │  └─ cell 2 starts at 3
//!               │  └──── cell 1 is empty
//!               └─────── cell 0 starts at 0
//! ```

use glam::{IVec3, UVec3, Vec3};

use crate::types::{Aabb, Event};

/// Target number of events per cell.
const EVENTS_PER_CELL: f32 = 8.0;

/// Per-axis cell cap, bounds index memory for sparse, wide data sets.
const MAX_CELLS_PER_AXIS: u32 = 256;

/// Uniform grid over the events of one frame.
#[derive(Clone, Debug, Default)]
pub struct GridIndex {
  /// Events sorted by cell.
  events: Vec<Event>,
  /// `cell_starts[c]..cell_starts[c + 1]` are the events of cell `c`.
  cell_starts: Vec<u32>,
  /// Grid origin (bounds minimum).
  origin: Vec3,
  /// Edge length of one cubic cell.
  cell_size: f32,
  /// Cells per axis.
  dims: UVec3,
  /// Tight bounds of the indexed events.
  bounds: Aabb,
}

impl GridIndex {
  /// Build the index. Events with non-finite coordinates are dropped.
  pub fn build(events: Vec<Event>) -> Self {
    let events: Vec<Event> = events
      .into_iter()
      .filter(|e| e.position.is_finite())
      .collect();

    if events.is_empty() {
      return Self::default();
    }

    let mut bounds = Aabb::empty();
    for event in &events {
      bounds.encapsulate(event.position);
    }

    let cell_size = choose_cell_size(bounds.size(), events.len());
    let dims = (bounds.size() / cell_size)
      .floor()
      .as_uvec3()
      .saturating_add(UVec3::ONE)
      .min(UVec3::splat(MAX_CELLS_PER_AXIS));

    let mut index = Self {
      events: Vec::new(),
      cell_starts: Vec::new(),
      origin: bounds.min,
      cell_size,
      dims,
      bounds,
    };

    // Counting sort by cell.
    let num_cells = (dims.x * dims.y * dims.z) as usize;
    let cell_of: Vec<u32> = events.iter().map(|e| index.cell_of(e.position)).collect();

    let mut counts = vec![0u32; num_cells + 1];
    for &cell in &cell_of {
      counts[cell as usize + 1] += 1;
    }
    for i in 1..counts.len() {
      counts[i] += counts[i - 1];
    }

    let mut cursor = counts.clone();
    let mut sorted = vec![Event::new(Vec3::ZERO, 0.0); events.len()];
    for (event, &cell) in events.iter().zip(&cell_of) {
      let slot = &mut cursor[cell as usize];
      sorted[*slot as usize] = *event;
      *slot += 1;
    }

    index.events = sorted;
    index.cell_starts = counts;
    index
  }

  /// Number of indexed events.
  #[inline]
  pub fn len(&self) -> usize {
    self.events.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  /// Tight bounds of the indexed events (invalid when empty).
  #[inline]
  pub fn bounds(&self) -> Aabb {
    self.bounds
  }

  /// Cells per axis.
  #[inline]
  pub fn dims(&self) -> UVec3 {
    self.dims
  }

  /// All events, in cell order.
  pub fn events(&self) -> &[Event] {
    &self.events
  }

  /// Visit every event inside `region` (boundary inclusive).
  pub fn for_each_in<F: FnMut(&Event)>(&self, region: &Aabb, mut f: F) {
    if self.is_empty() || !region.overlaps(&self.bounds) {
      return;
    }

    let max_cell = self.dims.as_ivec3() - IVec3::ONE;
    let lo = self.cell_coord(region.min).clamp(IVec3::ZERO, max_cell);
    let hi = self.cell_coord(region.max).clamp(IVec3::ZERO, max_cell);

    for z in lo.z..=hi.z {
      for y in lo.y..=hi.y {
        let row = (z as u32 * self.dims.y + y as u32) * self.dims.x;
        let start = self.cell_starts[(row + lo.x as u32) as usize] as usize;
        let end = self.cell_starts[(row + hi.x as u32 + 1) as usize] as usize;
        // Cells of one row are contiguous, so the whole x-span is one slice.
        for event in &self.events[start..end] {
          if region.contains_point(event.position) {
            f(event);
          }
        }
      }
    }
  }

  #[inline]
  fn cell_coord(&self, point: Vec3) -> IVec3 {
    // Saturating float -> int cast keeps far-away regions clampable.
    ((point - self.origin) / self.cell_size).floor().as_ivec3()
  }

  #[inline]
  fn cell_of(&self, point: Vec3) -> u32 {
    let c = self
      .cell_coord(point)
      .clamp(IVec3::ZERO, self.dims.as_ivec3() - IVec3::ONE)
      .as_uvec3();
    (c.z * self.dims.y + c.y) * self.dims.x + c.x
  }
}

/// Cubic cell edge so that occupied volume / cell volume ≈ events / 8.
fn choose_cell_size(extent: Vec3, count: usize) -> f32 {
  let longest = extent.max_element();
  if !(longest > 0.0) {
    return 1.0;
  }

  // Flat axes would zero the volume; treat them as one cell thick.
  let floor = longest / MAX_CELLS_PER_AXIS as f32;
  let volume = extent.max(Vec3::splat(floor)).element_product();
  let target_cells = (count as f32 / EVENTS_PER_CELL).max(1.0);
  let size = (volume / target_cells).cbrt();

  size.max(floor)
}
