//! Caller-owned voxel block.

use glam::UVec3;

use crate::normalizer::VoxelValue;

/// One materialized block: a dense grid, x fastest, then y, then z.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelBlock<T: VoxelValue> {
  dims: UVec3,
  data: Vec<T>,
}

impl<T: VoxelValue> VoxelBlock<T> {
  /// Wrap `data`; returns `None` if its length does not match `dims`.
  pub fn new(dims: UVec3, data: Vec<T>) -> Option<Self> {
    let expected = dims.x as usize * dims.y as usize * dims.z as usize;
    (data.len() == expected).then_some(Self { dims, data })
  }

  pub fn dims(&self) -> UVec3 {
    self.dims
  }

  pub fn data(&self) -> &[T] {
    &self.data
  }

  pub fn into_data(self) -> Vec<T> {
    self.data
  }

  pub fn voxel_count(&self) -> usize {
    self.data.len()
  }

  /// Packed bytes in native endianness.
  pub fn as_bytes(&self) -> &[u8] {
    bytemuck::cast_slice(&self.data)
  }

  pub fn byte_len(&self) -> usize {
    self.data.len() * T::bytes_per_voxel()
  }

  /// Voxel at grid coordinate `(x, y, z)`.
  #[inline]
  pub fn get(&self, x: u32, y: u32, z: u32) -> Option<T> {
    if x >= self.dims.x || y >= self.dims.y || z >= self.dims.z {
      return None;
    }
    let index = (z as usize * self.dims.y as usize + y as usize) * self.dims.x as usize + x as usize;
    self.data.get(index).copied()
  }
}
