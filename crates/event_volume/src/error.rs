//! Error types for provider construction and block sampling.
//!
//! Configuration problems never surface here: unparseable parameters are
//! logged and replaced by their defaults. What remains falls into three
//! groups:
//!
//! - **Data**: the event source cannot be built or holds nothing usable.
//!   Fatal at construction.
//! - **Geometry**: no octree layout satisfies the block constraints. Fatal at
//!   construction.
//! - **Sampling**: one block could not be produced. Caught by the provider and
//!   reported as missing data.

use thiserror::Error;

use crate::config::VolumeType;

/// Result type for event volume operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  /// The URI scheme does not name a known volume type.
  #[error("unknown volume scheme '{0}'")]
  UnknownScheme(String),

  /// No event-source factory is registered for the volume type.
  #[error("no event loader registered for {0:?} volumes")]
  MissingLoader(VolumeType),

  /// The requested population resolved to nothing.
  #[error("no events found for target '{0}'")]
  EmptySource(String),

  /// The event source has no valid bounding box to voxelize.
  #[error("event source has an empty or non-finite bounding box")]
  EmptyBounds,

  /// Tree geometry derivation failed.
  #[error("cannot set up the regular tree: {0}")]
  Geometry(String),

  /// A frame outside the available range was selected.
  #[error("frame {frame} is outside the available range [{start}, {end})")]
  FrameOutOfRange { frame: u32, start: u32, end: u32 },

  /// A node identifier does not address a block in the tree.
  #[error("node at level {level} position {position:?} is outside the tree")]
  InvalidNode { level: u32, position: [i32; 3] },

  /// A panic inside the sampling pipeline poisoned shared state.
  #[error("sampling pipeline panicked: {0}")]
  SamplerPanic(String),
}
