//! Read-mostly description of a sampled volume.

use glam::{Mat4, UVec3, Vec3};

use super::{NodeId, TreeGeometry, TreeNode};
use crate::constants::{COMPONENT_COUNT, METER_TO_DATA_UNIT_RATIO};
use crate::error::Result;
use crate::types::{Aabb, FrameRange};

/// Volume layout, transform and live frame window.
///
/// Only `frame_range` changes after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeInfo {
  /// Tree extent in voxels at full resolution.
  pub total_voxels: UVec3,
  /// Voxels of every block.
  pub block_voxels: UVec3,
  /// Tree levels, root included.
  pub levels: u32,
  /// Frames the host may request.
  pub frame_range: FrameRange,
  /// Data space (micrometers) to normalized world space.
  pub data_to_world: Mat4,
  pub component_count: u32,
  pub bytes_per_voxel: u32,
  /// Voxels per data unit.
  pub resolution: f32,
  /// Padding around `bounding_box`, split evenly on both sides.
  pub border: Vec3,
  /// Data bounds the tree was derived from.
  pub bounding_box: Aabb,
  /// Tree extent in world space; the longest axis is 1.
  pub world_size: Vec3,
  pub meter_to_data_unit_ratio: f64,
  pub description: String,
}

impl VolumeInfo {
  pub fn new(
    geometry: &TreeGeometry,
    bounding_box: Aabb,
    frame_range: FrameRange,
    bytes_per_voxel: u32,
    description: String,
  ) -> Self {
    let padded = bounding_box.size() + geometry.border;
    let scale = 1.0 / padded.max_element();
    let data_to_world = Mat4::from_scale(Vec3::splat(scale)) * Mat4::from_translation(-bounding_box.center());

    let total = geometry.total_voxels.as_vec3();
    let world_size = total / total.max_element();

    Self {
      total_voxels: geometry.total_voxels,
      block_voxels: geometry.block_voxels,
      levels: geometry.levels(),
      frame_range,
      data_to_world,
      component_count: COMPONENT_COUNT,
      bytes_per_voxel,
      resolution: geometry.resolution,
      border: geometry.border,
      bounding_box,
      world_size,
      meter_to_data_unit_ratio: METER_TO_DATA_UNIT_RATIO,
      description,
    }
  }

  /// Blocks per axis at `level`.
  #[inline]
  pub fn blocks_at_level(&self, level: u32) -> u32 {
    1u32 << level.min(31)
  }

  /// Resolve an external node identifier against this tree.
  pub fn resolve(&self, id: NodeId) -> Result<TreeNode> {
    TreeNode::from_node_id(id, self.levels)
  }

  /// Isotropic voxel spacing of blocks at `level`, in data units.
  ///
  /// Leaves sample at the full resolution; every level up doubles the
  /// spacing. The dominant axis sets the value for all three.
  pub fn block_spacing(&self, level: u32) -> Vec3 {
    let base = (self.bounding_box.size() + self.border) / self.total_voxels.as_vec3();
    let levels_from_bottom = self.levels.saturating_sub(1).saturating_sub(level);
    Vec3::splat(base.max_element() * (1u64 << levels_from_bottom) as f32)
  }

  /// Data-space position of the first voxel of `node`'s block.
  pub fn block_origin(&self, node: &TreeNode) -> Vec3 {
    let padded = self.bounding_box.size() + self.border;
    self.bounding_box.min - self.border * 0.5 + node.relative_position * padded
  }

  /// Voxels per block.
  #[inline]
  pub fn block_voxel_count(&self) -> usize {
    let v = self.block_voxels;
    v.x as usize * v.y as usize * v.z as usize
  }

  /// Bytes of one packed block.
  #[inline]
  pub fn block_byte_len(&self) -> usize {
    self.block_voxel_count() * self.component_count as usize * self.bytes_per_voxel as usize
  }
}

#[cfg(test)]
#[path = "volume_info_test.rs"]
mod volume_info_test;
