//! Node addressing within the regular block tree.
//!
//! Level 0 is the root, a single block covering the whole volume. Level `l`
//! has `2^l` blocks per axis, so grid positions at level `l` are in
//! `[0, 2^l)`.

use glam::{IVec3, Vec3};

use crate::error::{Error, Result};
use crate::types::Aabb;

/// External identifier of one block at one timestep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
  /// Tree level (0 = root, coarsest).
  pub level: u32,
  /// Grid position at this level.
  pub position: IVec3,
  /// Frame to sample.
  pub frame: u32,
}

impl NodeId {
  pub fn new(level: u32, position: IVec3, frame: u32) -> Self {
    Self { level, position, frame }
  }

  /// Root block at `frame`.
  pub fn root(frame: u32) -> Self {
    Self::new(0, IVec3::ZERO, frame)
  }

  /// Child in `octant` (bit 0: +X, bit 1: +Y, bit 2: +Z), one level finer.
  pub fn child(&self, octant: u8) -> Self {
    let offset = IVec3::new(
      (octant & 1) as i32,
      ((octant >> 1) & 1) as i32,
      ((octant >> 2) & 1) as i32,
    );
    Self {
      level: self.level + 1,
      position: self.position * 2 + offset,
      frame: self.frame,
    }
  }

  /// Enclosing block one level coarser; `None` at the root.
  pub fn parent(&self) -> Option<Self> {
    if self.level == 0 {
      return None;
    }
    Some(Self {
      level: self.level - 1,
      position: self.position.div_euclid(IVec3::splat(2)),
      frame: self.frame,
    })
  }

  /// All eight children.
  pub fn children(&self) -> [Self; 8] {
    std::array::from_fn(|octant| self.child(octant as u8))
  }
}

/// A node resolved against a tree of known depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeNode {
  pub id: NodeId,
  /// Block minimum as a fraction of the tree extent, in `[0, 1)`.
  pub relative_position: Vec3,
  /// Blocks per axis at this node's level.
  pub blocks_per_axis: u32,
}

impl TreeNode {
  /// Resolve `id` in a tree with `levels` levels.
  pub fn from_node_id(id: NodeId, levels: u32) -> Result<Self> {
    let invalid = || Error::InvalidNode {
      level: id.level,
      position: id.position.to_array(),
    };

    if id.level >= levels {
      return Err(invalid());
    }
    let blocks_per_axis = 1u32.checked_shl(id.level).ok_or_else(invalid)?;
    let in_range = id.position.cmpge(IVec3::ZERO).all()
      && id.position.as_uvec3().cmplt(glam::UVec3::splat(blocks_per_axis)).all();
    if !in_range {
      return Err(invalid());
    }

    Ok(Self {
      id,
      relative_position: id.position.as_vec3() / blocks_per_axis as f32,
      blocks_per_axis,
    })
  }

  /// Edge of this block as a fraction of the tree extent.
  #[inline]
  pub fn relative_size(&self) -> f32 {
    1.0 / self.blocks_per_axis as f32
  }

  /// Block bounds in normalized world space, where the tree spans
  /// `[-world_size / 2, world_size / 2]`.
  pub fn world_bounds(&self, world_size: Vec3) -> Aabb {
    let min = self.relative_position;
    let max = min + Vec3::splat(self.relative_size());
    Aabb::new(min * world_size - world_size * 0.5, max * world_size - world_size * 0.5)
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
