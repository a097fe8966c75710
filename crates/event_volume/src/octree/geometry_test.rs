use rand::{Rng, SeedableRng};

use super::*;

const MIB: usize = 1024 * 1024;

fn cube(edge: f32) -> Aabb {
  Aabb::new(Vec3::ZERO, Vec3::splat(edge))
}

// =========================================================================
// Known layouts
// =========================================================================

/// A box that fits in one block is aligned down and padded with a border.
#[test]
fn test_single_block() {
  let g = TreeGeometry::derive(&cube(90.0), 1.0, 64 * MIB, 1).unwrap();
  assert_eq!(g.halvings, 0);
  assert_eq!(g.levels(), 1);
  assert_eq!(g.block_voxels, UVec3::splat(88));
  assert_eq!(g.total_voxels, UVec3::splat(88));
  assert_eq!(g.border, Vec3::splat(-2.0));
}

/// Blocks of 8 voxels or fewer are left unaligned.
#[test]
fn test_small_blocks_untouched() {
  let g = TreeGeometry::derive(&cube(5.0), 1.0, 64 * MIB, 1).unwrap();
  assert_eq!(g.block_voxels, UVec3::splat(5));
  assert_eq!(g.border, Vec3::ZERO);

  let g = TreeGeometry::derive(&cube(4.2), 1.0, 64 * MIB, 1).unwrap();
  assert_eq!(g.block_voxels, UVec3::splat(5));
}

/// The byte budget halves the block until it fits.
#[test]
fn test_byte_budget_drives_depth() {
  let g = TreeGeometry::derive(&cube(256.0), 1.0, MIB, 1).unwrap();
  assert_eq!(g.halvings, 2);
  assert_eq!(g.block_voxels, UVec3::splat(64));
  assert_eq!(g.total_voxels, UVec3::splat(256));
  assert_eq!(g.border, Vec3::ZERO);

  // Four bytes per voxel: 64^3 * 4 is exactly the budget, which does not fit.
  let g = TreeGeometry::derive(&cube(256.0), 1.0, MIB, 4).unwrap();
  assert_eq!(g.halvings, 3);
  assert_eq!(g.block_voxels, UVec3::splat(32));
  assert_eq!(g.block_bytes(4), 32 * 32 * 32 * 4);
}

/// The texture limit halves long axes even when bytes would fit.
#[test]
fn test_texture_limit_drives_depth() {
  let bbox = Aabb::new(Vec3::ZERO, Vec3::new(4096.0, 100.0, 100.0));
  let g = TreeGeometry::derive(&bbox, 1.0, usize::MAX, 1).unwrap();
  assert_eq!(g.halvings, 2);
  assert_eq!(g.block_voxels, UVec3::new(1024, 24, 24));
  assert_eq!(g.total_voxels, UVec3::new(4096, 96, 96));
}

#[test]
fn test_resolution_scales_extent() {
  let g = TreeGeometry::derive(&cube(1600.0), 0.0625, 64 * MIB, 1).unwrap();
  assert_eq!(g.total_voxels, UVec3::splat(96));
  assert_eq!(g.border, Vec3::splat(-64.0));
}

#[test]
fn test_flat_axis_is_one_voxel() {
  let bbox = Aabb::new(Vec3::ZERO, Vec3::new(100.0, 100.0, 0.0));
  let g = TreeGeometry::derive(&bbox, 1.0, 64 * MIB, 1).unwrap();
  assert_eq!(g.block_voxels, UVec3::new(96, 96, 1));
  assert_eq!(g.border.z, 1.0);
}

// =========================================================================
// Failures
// =========================================================================

#[test]
fn test_invalid_bounds() {
  let result = TreeGeometry::derive(&Aabb::empty(), 1.0, 64 * MIB, 1);
  assert!(matches!(result, Err(Error::EmptyBounds)));
}

#[test]
fn test_invalid_resolution() {
  for resolution in [0.0, -1.0, f32::NAN, f32::INFINITY] {
    let result = TreeGeometry::derive(&cube(10.0), resolution, 64 * MIB, 1);
    assert!(matches!(result, Err(Error::Geometry(_))), "{resolution}");
  }
}

#[test]
fn test_unsatisfiable_budget() {
  let result = TreeGeometry::derive(&cube(10.0), 1.0, 0, 1);
  assert!(matches!(result, Err(Error::Geometry(_))));
}

// =========================================================================
// Layout invariants
// =========================================================================

/// Block dims are <= 8 or multiples of 8, the tree is block << halvings, and
/// the padded box maps onto the tree extent.
#[test]
fn test_layout_invariants_on_random_boxes() {
  let mut rng = rand::rngs::StdRng::seed_from_u64(42);
  for _ in 0..500 {
    let min = Vec3::new(
      rng.random_range(-5000.0..5000.0),
      rng.random_range(-5000.0..5000.0),
      rng.random_range(-5000.0..5000.0),
    );
    let size = Vec3::new(
      rng.random_range(0.5..20000.0),
      rng.random_range(0.5..20000.0),
      rng.random_range(0.5..20000.0),
    );
    let resolution = rng.random_range(0.01..4.0);
    let budget = rng.random_range(4096..256 * MIB);
    let bpv = [1usize, 2, 4][rng.random_range(0..3)];

    let g = TreeGeometry::derive(&Aabb::new(min, min + size), resolution, budget, bpv).unwrap();

    for axis in 0..3 {
      let block = g.block_voxels[axis];
      assert!(block >= 1);
      assert!(block <= 8 || block % 8 == 0, "block {block} not aligned");
      assert!(block <= MAX_TEXTURE_SIZE);
      assert_eq!(g.total_voxels[axis], block << g.halvings);

      let padded = (size[axis] + g.border[axis]) * resolution;
      let total = g.total_voxels[axis] as f32;
      assert!((padded - total).abs() <= total * 1e-3 + 1e-2, "{padded} vs {total}");
    }
  }
}
