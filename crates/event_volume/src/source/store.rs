//! In-memory, frame-indexed event store.
//!
//! Frames are appended through an [`EventStoreWriter`] (typically by the
//! thread that consumes simulation output) while the store itself is being
//! sampled. Each frame is indexed once when appended; selecting a frame is
//! a pointer swap.

use std::sync::{Arc, PoisonError, RwLock};

use super::{EventSource, Events, GridIndex};
use crate::error::{Error, Result};
use crate::types::{Aabb, Event, FrameRange};

/// Frames produced so far, shared between store and writers.
#[derive(Default)]
struct FrameLog {
  frames: Vec<Arc<GridIndex>>,
  /// Union of all frame bounds.
  bounds: Aabb,
}

/// Frame-indexed event source backed by per-frame grid indices.
pub struct EventStore {
  log: Arc<RwLock<FrameLog>>,
  /// Index of the selected frame.
  active: Option<(u32, Arc<GridIndex>)>,
  /// Circuit bounds, if known up front.
  bounds: Option<Aabb>,
  dt: f32,
  label: String,
}

impl EventStore {
  /// Create a store with no frames yet.
  pub fn new() -> Self {
    Self {
      log: Arc::new(RwLock::new(FrameLog::default())),
      active: None,
      bounds: None,
      dt: crate::constants::DEFAULT_DT,
      label: String::from("events"),
    }
  }

  /// Create a single-frame store with frame 0 selected.
  pub fn from_events(events: Vec<Event>) -> Self {
    let mut store = Self::new();
    store.writer().push_frame(events);
    store.active = store.frame(0).map(|index| (0, index));
    store
  }

  /// Use fixed bounds instead of the union of event positions.
  pub fn with_bounds(mut self, bounds: Aabb) -> Self {
    self.bounds = Some(bounds);
    self
  }

  /// Set the nominal time step between frames.
  pub fn with_dt(mut self, dt: f32) -> Self {
    self.dt = dt;
    self
  }

  /// Set the label reported by [`EventSource::description`].
  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = label.into();
    self
  }

  /// Producer handle for appending frames.
  pub fn writer(&self) -> EventStoreWriter {
    EventStoreWriter {
      log: Arc::clone(&self.log),
    }
  }

  /// Currently selected frame, if any.
  pub fn active_frame(&self) -> Option<u32> {
    self.active.as_ref().map(|(frame, _)| *frame)
  }

  fn frame(&self, frame: u32) -> Option<Arc<GridIndex>> {
    let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
    log.frames.get(frame as usize).cloned()
  }
}

impl Default for EventStore {
  fn default() -> Self {
    Self::new()
  }
}

impl EventSource for EventStore {
  fn find_events(&self, region: &Aabb) -> Events {
    let mut events = Events::new();
    if let Some((_, index)) = &self.active {
      index.for_each_in(region, |event| events.push(*event));
    }
    events
  }

  fn set_time(&mut self, frame: u32) -> Result<()> {
    if self.active_frame() == Some(frame) {
      return Ok(());
    }

    let range = self.frame_range();
    let index = self.frame(frame).ok_or(Error::FrameOutOfRange {
      frame,
      start: range.start,
      end: range.end,
    })?;
    self.active = Some((frame, index));
    Ok(())
  }

  fn frame_range(&self) -> FrameRange {
    let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
    FrameRange::new(0, log.frames.len() as u32)
  }

  fn num_events(&self) -> usize {
    match &self.active {
      Some((_, index)) => index.len(),
      None => self.frame(0).map_or(0, |index| index.len()),
    }
  }

  fn dt(&self) -> f32 {
    self.dt
  }

  fn bounding_box(&self) -> Aabb {
    match self.bounds {
      Some(bounds) => bounds,
      None => {
        let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
        log.bounds
      }
    }
  }

  fn description(&self) -> String {
    format!("{} {}", self.num_events(), self.label)
  }
}

/// Cloneable handle that appends frames to an [`EventStore`].
#[derive(Clone)]
pub struct EventStoreWriter {
  log: Arc<RwLock<FrameLog>>,
}

impl EventStoreWriter {
  /// Index and append one frame; returns its frame number.
  pub fn push_frame(&self, events: Vec<Event>) -> u32 {
    // Index outside the lock so readers are never blocked on it.
    let index = Arc::new(GridIndex::build(events));

    let mut log = self.log.write().unwrap_or_else(PoisonError::into_inner);
    log.bounds.merge(&index.bounds());
    log.frames.push(index);
    log.frames.len() as u32 - 1
  }

  /// Frames appended so far.
  pub fn frame_count(&self) -> u32 {
    let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
    log.frames.len() as u32
  }
}
