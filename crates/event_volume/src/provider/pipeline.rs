//! Reusable per-provider sampling state: source, functor and output buffer.
//!
//! One block is produced at a time. Within a block, z-slices are evaluated
//! in parallel on rayon's pool; that is safe because the frame is fixed for
//! the duration of the block and queries are read-only.
//!
//! When called from a rayon worker the block is evaluated serially on that
//! worker instead.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::{UVec3, Vec3};
use rayon::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::functor::EventFunctor;
use crate::normalizer::VoxelValue;
use crate::source::EventSource;

/// Region of one block in data space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockRegion {
  /// Voxels per axis.
  pub dims: UVec3,
  /// Center of voxel `(0, 0, 0)`.
  pub origin: Vec3,
  /// Distance between neighbouring voxel centers.
  pub spacing: Vec3,
}

impl BlockRegion {
  #[inline]
  pub fn voxel_count(&self) -> usize {
    self.dims.x as usize * self.dims.y as usize * self.dims.z as usize
  }

  /// Center of voxel `(x, y, z)`.
  #[inline]
  pub fn voxel_center(&self, x: u32, y: u32, z: u32) -> Vec3 {
    self.origin + UVec3::new(x, y, z).as_vec3() * self.spacing
  }
}

/// Event source, functor and output buffer reused across blocks.
pub struct SamplingPipeline<T: VoxelValue> {
  source: Box<dyn EventSource>,
  functor: EventFunctor,
  buffer: Vec<T>,
  show_progress: bool,
}

impl<T: VoxelValue> SamplingPipeline<T> {
  pub fn new(source: Box<dyn EventSource>, functor: EventFunctor) -> Self {
    Self {
      source,
      functor,
      buffer: Vec::new(),
      show_progress: false,
    }
  }

  /// Log progress every 10% of a block.
  pub fn with_progress(mut self, show_progress: bool) -> Self {
    self.show_progress = show_progress;
    self
  }

  pub fn source(&self) -> &dyn EventSource {
    self.source.as_ref()
  }

  pub fn functor(&self) -> &EventFunctor {
    &self.functor
  }

  /// Select `frame` and evaluate every voxel of `region`.
  ///
  /// The returned slice is valid until the next call.
  #[tracing::instrument(level = "debug", skip(self, region), fields(dims = ?region.dims))]
  pub fn materialize(&mut self, frame: u32, region: &BlockRegion) -> Result<&[T]> {
    self.source.set_time(frame)?;

    self.buffer.clear();
    self.buffer.resize(region.voxel_count(), T::BACKGROUND);
    if self.buffer.is_empty() {
      return Ok(&self.buffer);
    }

    let slice_len = region.dims.x as usize * region.dims.y as usize;
    let slices = region.dims.z;
    let done = AtomicU32::new(0);

    let source = self.source.as_ref();
    let functor = &self.functor;
    let show_progress = self.show_progress;

    let evaluate_slice = |z: usize, slice: &mut [T]| {
      let z = z as u32;
      for y in 0..region.dims.y {
        let row = &mut slice[(y * region.dims.x) as usize..((y + 1) * region.dims.x) as usize];
        for (x, voxel) in row.iter_mut().enumerate() {
          let center = region.voxel_center(x as u32, y, z);
          *voxel = functor.evaluate(Some(source), center, region.spacing);
        }
      }

      if show_progress {
        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
        let decile = finished * 10 / slices;
        if decile > (finished - 1) * 10 / slices {
          info!("Sampling block: {}%", decile * 10);
        }
      }
    };

    // Callers hold the provider lock. On a pool worker, a nested join may run
    // another queued job on this thread, and that job could re-enter the lock.
    if rayon::current_thread_index().is_some() {
      for (z, slice) in self.buffer.chunks_mut(slice_len).enumerate() {
        evaluate_slice(z, slice);
      }
    } else {
      self
        .buffer
        .par_chunks_mut(slice_len)
        .enumerate()
        .for_each(|(z, slice)| evaluate_slice(z, slice));
    }

    Ok(&self.buffer)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::functor::FunctorType;
  use crate::normalizer::InputRange;
  use crate::source::EventStore;
  use crate::types::Event;

  fn pipeline(events: Vec<Event>, kind: FunctorType) -> SamplingPipeline<u8> {
    let source = Box::new(EventStore::from_events(events));
    SamplingPipeline::new(source, EventFunctor::new(kind, InputRange::new(0.0, 10.0)))
  }

  fn unit_region(dims: UVec3) -> BlockRegion {
    BlockRegion {
      dims,
      origin: Vec3::ZERO,
      spacing: Vec3::ONE,
    }
  }

  #[test]
  fn test_voxels_land_at_event_positions() {
    let mut p = pipeline(
      vec![Event::at(1.0, 2.0, 3.0, 10.0), Event::at(0.0, 0.0, 0.0, 5.0)],
      FunctorType::Density,
    );
    let region = unit_region(UVec3::new(4, 4, 4));
    let data = p.materialize(0, &region).unwrap().to_vec();

    assert_eq!(data.len(), 64);
    let at = |x: usize, y: usize, z: usize| data[(z * 4 + y) * 4 + x];
    assert_eq!(at(1, 2, 3), 255);
    assert_eq!(at(0, 0, 0), 128);
    assert_eq!(data.iter().filter(|&&v| v != 0).count(), 2);
  }

  #[test]
  fn test_origin_and_spacing() {
    let region = BlockRegion {
      dims: UVec3::splat(2),
      origin: Vec3::new(10.0, 20.0, 30.0),
      spacing: Vec3::splat(4.0),
    };
    assert_eq!(region.voxel_center(1, 0, 1), Vec3::new(14.0, 20.0, 34.0));

    let mut p = pipeline(vec![Event::at(14.0, 20.0, 34.0, 10.0)], FunctorType::Frequency);
    let data = p.materialize(0, &region).unwrap();
    assert_eq!(data[5], 255);
  }

  #[test]
  fn test_missing_frame_errors() {
    let mut p = pipeline(vec![Event::at(0.0, 0.0, 0.0, 1.0)], FunctorType::Density);
    assert!(p.materialize(2, &unit_region(UVec3::ONE)).is_err());
  }

  #[test]
  fn test_progress_does_not_change_output() {
    let events = vec![Event::at(2.0, 2.0, 2.0, 6.0)];
    let region = unit_region(UVec3::splat(5));

    let quiet = pipeline(events.clone(), FunctorType::Field)
      .materialize(0, &region)
      .unwrap()
      .to_vec();
    let mut loud = pipeline(events, FunctorType::Field).with_progress(true);
    assert_eq!(loud.materialize(0, &region).unwrap(), quiet.as_slice());
  }

  #[test]
  fn test_pool_worker_evaluates_same_block() {
    let events = vec![Event::at(1.0, 2.0, 3.0, 4.0), Event::at(3.0, 3.0, 0.0, 9.0)];
    let region = unit_region(UVec3::splat(4));

    let outside = pipeline(events.clone(), FunctorType::Density)
      .materialize(0, &region)
      .unwrap()
      .to_vec();

    let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
    let inside = pool.install(|| {
      assert!(rayon::current_thread_index().is_some());
      pipeline(events, FunctorType::Density)
        .materialize(0, &region)
        .unwrap()
        .to_vec()
    });
    assert_eq!(inside, outside);
  }
}
