//! Synthetic event source for `fivoxtest://` volumes.
//!
//! A cubic lattice of events whose values cycle through `0..10` as frames
//! advance, so hosts can exercise the whole pipeline without simulation
//! output.

use glam::Vec3;
use tracing::{debug, warn};

use super::{EventSource, EventStore};
use crate::config::VolumeConfig;
use crate::error::{Error, Result};
use crate::types::{Aabb, Event};

/// Lattice points per axis.
pub const LATTICE_SIZE: u32 = 10;

/// Distance between neighbouring lattice points (micrometers).
pub const LATTICE_SPACING: f32 = 10.0;

/// Distinct event values; values are `0..VALUE_PERIOD`.
const VALUE_PERIOD: u32 = 10;

/// Upper bound on generated frames. Every frame holds a full lattice and its
/// own index.
pub const MAX_TEST_FRAMES: u32 = 256;

/// Build the synthetic source for `config`.
///
/// `duration / dt` frames are produced (`dt` defaults to 1), at most
/// [`MAX_TEST_FRAMES`]. `gidFraction` thins the lattice evenly; a fraction
/// that keeps nothing is an error.
pub fn load(config: &VolumeConfig) -> Result<Box<dyn EventSource>> {
  let dt = match config.dt() {
    dt if dt > 0.0 => dt,
    _ => 1.0,
  };
  let requested = (config.duration() / dt).floor();
  let frames = if requested > MAX_TEST_FRAMES as f32 {
    warn!(requested, max = MAX_TEST_FRAMES, "too many test frames, clamping");
    MAX_TEST_FRAMES
  } else {
    (requested as u32).max(1)
  };
  let fraction = config.gid_fraction().clamp(0.0, 1.0);

  let points = lattice_points(fraction);
  if points.is_empty() {
    return Err(Error::EmptySource(format!(
      "{} (gidFraction = {fraction})",
      config.target().unwrap_or("test lattice")
    )));
  }

  let mut store = EventStore::new()
    .with_bounds(lattice_bounds())
    .with_dt(dt)
    .with_label("test events");
  let writer = store.writer();
  for frame in 0..frames {
    writer.push_frame(frame_events(&points, frame));
  }
  debug!(frames, events = points.len(), "test lattice built");

  store.set_time(0)?;
  Ok(Box::new(store))
}

/// Bounds of the full lattice.
pub fn lattice_bounds() -> Aabb {
  Aabb::new(Vec3::ZERO, Vec3::splat((LATTICE_SIZE - 1) as f32 * LATTICE_SPACING))
}

/// Value of lattice point `index` at `frame`.
pub fn lattice_value(index: u32, frame: u32) -> f32 {
  ((index + frame) % VALUE_PERIOD) as f32
}

/// Lattice indices kept at `fraction`, spread evenly over the lattice.
fn lattice_points(fraction: f32) -> Vec<(u32, Vec3)> {
  let total = LATTICE_SIZE.pow(3);
  let keep = (total as f32 * fraction).round() as u32;

  (0..keep)
    .map(|k| (k as u64 * total as u64 / keep as u64) as u32)
    .map(|index| {
      let x = index % LATTICE_SIZE;
      let y = (index / LATTICE_SIZE) % LATTICE_SIZE;
      let z = index / (LATTICE_SIZE * LATTICE_SIZE);
      (index, Vec3::new(x as f32, y as f32, z as f32) * LATTICE_SPACING)
    })
    .collect()
}

fn frame_events(points: &[(u32, Vec3)], frame: u32) -> Vec<Event> {
  points
    .iter()
    .map(|&(index, position)| Event::new(position, lattice_value(index, frame)))
    .collect()
}
