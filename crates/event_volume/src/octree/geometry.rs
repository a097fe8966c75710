//! Regular octree layout derived from a bounding box and a block budget.
//!
//! ```text
//!   full = bbox.size * resolution
//!   while block.bytes >= max_block_bytes or any(block >= MAX_TEXTURE_SIZE):
//!     block /= 2, halvings += 1
//!   block_voxels = align8(ceil(block))
//!   total_voxels = block_voxels << halvings
//!   border       = total_voxels / resolution - bbox.size
//! ```
//!
//! The border absorbs the difference between the integer tree extent and the
//! physical box, so that `bbox.size + border` maps exactly onto
//! `total_voxels` at the configured resolution.

use glam::{DVec3, UVec3, Vec3};
use tracing::debug;

use crate::constants::{BLOCK_ALIGNMENT, MAX_TEXTURE_SIZE, MAX_TREE_HALVINGS};
use crate::error::{Error, Result};
use crate::types::Aabb;

/// Block and tree extents for one volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeGeometry {
  /// Voxels per block, identical for every node.
  pub block_voxels: UVec3,
  /// Voxels of the whole tree at full resolution.
  pub total_voxels: UVec3,
  /// Times the full extent was halved; the tree has `halvings + 1` levels.
  pub halvings: u32,
  /// Padding added to the bounding box, split evenly on both sides.
  pub border: Vec3,
  /// Voxels per data unit.
  pub resolution: f32,
}

impl TreeGeometry {
  /// Derive the layout for `bbox` sampled at `resolution` voxels per unit,
  /// with blocks of at most `max_block_bytes` at `bytes_per_voxel`.
  ///
  /// Axes with zero extent are one voxel thick.
  #[tracing::instrument(level = "debug", skip_all, err)]
  pub fn derive(bbox: &Aabb, resolution: f32, max_block_bytes: usize, bytes_per_voxel: usize) -> Result<Self> {
    if !bbox.is_valid() {
      return Err(Error::EmptyBounds);
    }
    if !(resolution.is_finite() && resolution > 0.0) {
      return Err(Error::Geometry(format!("invalid resolution {resolution}")));
    }

    let full = bbox.size().as_dvec3() * resolution as f64;
    if !full.is_finite() {
      return Err(Error::Geometry(format!("voxel extent {full} is not finite")));
    }

    let max_texture = MAX_TEXTURE_SIZE as f64;
    let max_bytes = max_block_bytes as f64;
    let bytes_per_voxel = bytes_per_voxel.max(1) as f64;
    let fits = |block: DVec3| {
      let voxels = block.max(DVec3::ONE).element_product();
      voxels * bytes_per_voxel < max_bytes && block.max_element() < max_texture
    };

    let mut block = full;
    let mut halvings = 0u32;
    while !fits(block) {
      if halvings == MAX_TREE_HALVINGS {
        return Err(Error::Geometry(format!(
          "no block of {full} voxels fits in {max_block_bytes} bytes after {halvings} halvings"
        )));
      }
      block /= 2.0;
      halvings += 1;
    }

    let block_voxels = UVec3::new(align(block.x), align(block.y), align(block.z));
    let scale = 1u32 << halvings;
    let total_voxels = UVec3::new(
      checked_total(block_voxels.x, scale)?,
      checked_total(block_voxels.y, scale)?,
      checked_total(block_voxels.z, scale)?,
    );
    let border = total_voxels.as_vec3() / resolution - bbox.size();

    debug!(
      ?block_voxels,
      ?total_voxels,
      halvings,
      ?border,
      "derived tree geometry"
    );

    Ok(Self {
      block_voxels,
      total_voxels,
      halvings,
      border,
      resolution,
    })
  }

  /// Number of tree levels, root included.
  #[inline]
  pub fn levels(&self) -> u32 {
    self.halvings + 1
  }

  /// Bytes of one block with `bytes_per_voxel` and a single component.
  pub fn block_bytes(&self, bytes_per_voxel: usize) -> usize {
    let v = self.block_voxels;
    v.x as usize * v.y as usize * v.z as usize * bytes_per_voxel
  }
}

/// Round up to whole voxels, then down to the block alignment above it.
fn align(extent: f64) -> u32 {
  let voxels = (extent.ceil() as u32).max(1);
  if voxels > BLOCK_ALIGNMENT {
    voxels - voxels % BLOCK_ALIGNMENT
  } else {
    voxels
  }
}

fn checked_total(block: u32, scale: u32) -> Result<u32> {
  block
    .checked_mul(scale)
    .ok_or_else(|| Error::Geometry(format!("tree of {block} x {scale} voxels overflows")))
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;
