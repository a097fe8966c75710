//! Event sources: queryable sets of positioned events with frame metadata.
//!
//! An [`EventSource`] owns the events of the currently selected frame and
//! answers bounding-box queries against them. Queries are read-only and may
//! run concurrently; [`EventSource::set_time`] swaps the active event set and
//! must not overlap with anything else. The provider enforces that split by
//! holding its sampling lock across frame selection and the per-voxel queries.
//!
//! # Module Structure
//!
//! - [`grid_index`]: `GridIndex` - uniform-grid spatial index over one frame
//! - [`store`]: `EventStore` - in-memory, frame-indexed source with a
//!   producer handle for live simulations
//! - [`test_source`]: synthetic lattice source for smoke tests
//! - [`loader`]: `LoaderRegistry` - volume type to source factory

pub mod grid_index;
pub mod loader;
pub mod store;
pub mod test_source;

use smallvec::SmallVec;

pub use grid_index::GridIndex;
pub use loader::{LoaderFn, LoaderRegistry};
pub use store::{EventStore, EventStoreWriter};

use crate::error::Result;
use crate::types::{Aabb, Event, FrameRange};

/// Query result. Most voxels see a handful of events, so they stay inline.
pub type Events = SmallVec<[Event; 16]>;

/// Abstract spatial event store.
pub trait EventSource: Send + Sync {
  /// Events of the active frame inside `region` (boundary inclusive).
  fn find_events(&self, region: &Aabb) -> Events;

  /// Select the frame whose events subsequent queries see.
  fn set_time(&mut self, frame: u32) -> Result<()>;

  /// Frames available so far. Only ever grows.
  fn frame_range(&self) -> FrameRange;

  /// Number of events in the active frame.
  fn num_events(&self) -> usize;

  /// Nominal time step; negative defers to the source default.
  fn dt(&self) -> f32;

  /// Spatial extent of the data, stable across frames.
  fn bounding_box(&self) -> Aabb;

  /// Human readable summary for logs.
  fn description(&self) -> String {
    format!("{} events", self.num_events())
  }
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
  fn find_events(&self, region: &Aabb) -> Events {
    (**self).find_events(region)
  }

  fn set_time(&mut self, frame: u32) -> Result<()> {
    (**self).set_time(frame)
  }

  fn frame_range(&self) -> FrameRange {
    (**self).frame_range()
  }

  fn num_events(&self) -> usize {
    (**self).num_events()
  }

  fn dt(&self) -> f32 {
    (**self).dt()
  }

  fn bounding_box(&self) -> Aabb {
    (**self).bounding_box()
  }

  fn description(&self) -> String {
    (**self).description()
  }
}
