//! Octree volume provider: lazily materializes blocks for a streaming
//! renderer.
//!
//! ```text
//!   render threads ──sample(node)──┐
//!                                   ▼
//!                       ┌───────── Mutex ─────────┐
//!                       │ resolve node            │
//!                       │ spacing / origin        │
//!                       │ set_time(frame)         │
//!                       │ evaluate block (rayon)  │
//!                       │ copy into VoxelBlock    │
//!                       └─────────────────────────┘
//!                                   │
//!                                   ▼
//!                       Some(block) or None on failure
//! ```
//!
//! The pipeline (source, functor, buffer) is reused across calls and is not
//! reentrant, so one lock serializes every `sample()` and `update()`. Only
//! one block is in flight per provider; callers must not expect parallel
//! sampling. Failures and panics inside the critical section surface as
//! `None` and leave the provider usable.
//!
//! # Module Structure
//!
//! - [`block`]: `VoxelBlock` - caller-owned packed voxel grid
//! - [`pipeline`]: `SamplingPipeline` - reusable per-block evaluation state

pub mod block;
pub mod pipeline;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};
use web_time::Instant;

pub use block::VoxelBlock;
pub use pipeline::{BlockRegion, SamplingPipeline};

use crate::config::{VolumeConfig, VolumeUri};
use crate::constants::URI_SCHEME_PREFIX;
use crate::error::{Error, Result};
use crate::functor::EventFunctor;
use crate::metrics::ProviderMetrics;
use crate::normalizer::VoxelValue;
use crate::octree::{NodeId, TreeGeometry, VolumeInfo};
use crate::source::{EventSource, LoaderRegistry};

/// Everything the sampling lock guards.
struct ProviderState<T: VoxelValue> {
  pipeline: SamplingPipeline<T>,
  info: VolumeInfo,
}

/// Multi-resolution volume over an event source.
///
/// `T` is the voxel output type; blocks are `u8` unless asked otherwise.
pub struct VolumeProvider<T: VoxelValue = u8> {
  state: Mutex<ProviderState<T>>,
  metrics: Mutex<ProviderMetrics>,
}

impl<T: VoxelValue> VolumeProvider<T> {
  /// Build a provider over `source` as configured by `config`.
  ///
  /// Fails if the source has no usable bounds or no tree layout fits the
  /// block budget; nothing is left half-constructed.
  pub fn new(config: &VolumeConfig, source: Box<dyn EventSource>) -> Result<Self> {
    let bbox = source.bounding_box();
    if !bbox.is_valid() {
      return Err(Error::EmptyBounds);
    }

    let resolution = match config.size_in_voxels() {
      0 => config.resolution(),
      size => size as f32 / bbox.size().max_element(),
    };

    let bytes_per_voxel = T::bytes_per_voxel();
    let geometry = TreeGeometry::derive(&bbox, resolution, config.max_block_size(), bytes_per_voxel)?;

    let functor = EventFunctor::new(config.functor_type(), config.input_range()).with_params(config.functor_params());
    let info = VolumeInfo::new(
      &geometry,
      bbox,
      source.frame_range(),
      bytes_per_voxel as u32,
      config.to_string(),
    );

    info!(
      total = ?info.total_voxels,
      block = ?info.block_voxels,
      levels = info.levels,
      frames = ?info.frame_range,
      "volume provider ready"
    );

    let pipeline = SamplingPipeline::new(source, functor).with_progress(config.show_progress());
    Ok(Self {
      state: Mutex::new(ProviderState { pipeline, info }),
      metrics: Mutex::new(ProviderMetrics::default()),
    })
  }

  /// Parse `uri`, load its event source from `registry` and build the
  /// provider.
  pub fn from_uri(uri: &str, registry: &LoaderRegistry) -> Result<Self> {
    let config = VolumeConfig::parse(uri);
    let source = registry.load(&config)?;
    Self::new(&config, source)
  }

  /// Snapshot of the volume description.
  pub fn info(&self) -> VolumeInfo {
    self.lock().info.clone()
  }

  /// Snapshot of the provider statistics.
  pub fn metrics(&self) -> ProviderMetrics {
    self.metrics.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Materialize the block of `node`.
  ///
  /// Blocks the caller until the block is ready. Any failure, panics
  /// included, is logged and returned as `None`.
  pub fn sample(&self, node: NodeId) -> Option<VoxelBlock<T>> {
    let start = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
      let mut state = self.lock();
      Self::sample_locked(&mut state, node)
    }));

    let block = match result {
      Ok(Ok(block)) => Some(block),
      Ok(Err(err)) => {
        error!(?node, "sample failed: {err}");
        None
      }
      Err(payload) => {
        let err = Error::SamplerPanic(panic_message(payload.as_ref()));
        error!(?node, "sample failed: {err}");
        None
      }
    };

    self
      .metrics
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .record_sample(start.elapsed().as_micros() as u64, block.is_some());
    block
  }

  /// Adopt frames the source produced since the last call.
  ///
  /// Returns true iff the source's frame range end grew and is nonzero.
  pub fn update(&self) -> bool {
    let changed = {
      let mut state = self.lock();
      let current = state.pipeline.source().frame_range();
      let known = state.info.frame_range;

      if current.end > 0 && current.end > known.end {
        debug!(?known, ?current, "frame range grew");
        state.info.frame_range = current;
        true
      } else {
        false
      }
    };

    self
      .metrics
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .record_update(changed);
    changed
  }

  fn sample_locked(state: &mut ProviderState<T>, id: NodeId) -> Result<VoxelBlock<T>> {
    let ProviderState { pipeline, info } = state;

    let node = info.resolve(id)?;
    let region = BlockRegion {
      dims: info.block_voxels,
      origin: info.block_origin(&node),
      spacing: info.block_spacing(id.level),
    };
    debug!(?id, origin = ?region.origin, spacing = region.spacing.x, "sampling node");

    let data = pipeline.materialize(id.frame, &region)?;
    VoxelBlock::new(region.dims, data.to_vec())
      .ok_or_else(|| Error::Geometry(format!("block buffer does not match {:?}", region.dims)))
  }

  fn lock(&self) -> MutexGuard<'_, ProviderState<T>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// True if a provider can serve `uri` (scheme starts with `fivox`).
pub fn handles(uri: &str) -> bool {
  VolumeUri::parse(uri).scheme().starts_with(URI_SCHEME_PREFIX)
}

/// Capability summary with the option help.
pub fn description() -> String {
  let mut description = format!("Field volumes: {URI_SCHEME_PREFIX}*://\n");
  for line in VolumeConfig::help().lines() {
    description.push_str("  ");
    description.push_str(line);
    description.push('\n');
  }
  description
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_owned()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    String::from("unknown panic")
  }
}
