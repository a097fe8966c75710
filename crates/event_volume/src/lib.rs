//! event_volume - Samples spatially positioned simulation events into
//! octree voxel blocks
//!
//! This crate turns a set of point events (a position plus a scalar value,
//! one set per time frame) into a multi-resolution scalar volume that a
//! streaming renderer can request block by block.
//!
//! # Features
//!
//! - **Event Functors**: Density, frequency, field and LFP reductions of the
//!   events around each voxel, normalized into `u8` or `f32` voxels
//! - **Octree Layout**: Block size and tree depth derived from the event
//!   bounds, a resolution and a per-block byte budget
//! - **Lazy Sampling**: Blocks are materialized on demand, one at a time per
//!   provider, with rayon parallelism inside a block
//! - **Streaming Sources**: Providers adopt frames appended to a live event
//!   store via `update()`
//!
//! # Example
//!
//! ```ignore
//! use event_volume::{LoaderRegistry, NodeId, VolumeProvider};
//!
//! let registry = LoaderRegistry::new();
//! let provider: VolumeProvider = VolumeProvider::from_uri("fivoxtest://?functor=density", &registry)?;
//!
//! let info = provider.info();
//! println!("{} levels of {:?} voxel blocks", info.levels, info.block_voxels);
//!
//! if let Some(block) = provider.sample(NodeId::root(0)) {
//!     upload(block.as_bytes());
//! }
//! ```

pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use error::{Error, Result};
pub use types::{Aabb, Event, FrameRange};

// Volume URIs and per-source defaults
pub mod config;
pub use config::{VolumeConfig, VolumeType, VolumeUri};

// Raw values to voxel output types
pub mod normalizer;
pub use normalizer::{InputRange, RangeNormalizer, VoxelValue};

// Event sources, spatial index and loaders
pub mod source;
pub use source::{EventSource, EventStore, EventStoreWriter, LoaderRegistry};

// Per-voxel reductions of nearby events
pub mod functor;
pub use functor::{EventFunctor, FalloffKernel, FunctorParams, FunctorType};

// Octree geometry and node addressing
pub mod octree;
pub use octree::{NodeId, TreeGeometry, TreeNode, VolumeInfo};

// Block materialization
pub mod provider;
pub use provider::{description, handles, VolumeProvider, VoxelBlock};

// Non-blocking block requests
pub mod threading;
pub use threading::{BlockCompletion, BlockLoader};

// Performance metrics
pub mod metrics;
