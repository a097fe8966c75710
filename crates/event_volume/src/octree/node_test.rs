use std::collections::HashSet;

use super::*;

/// All 8 octants produce distinct children one level finer.
#[test]
fn test_children_cover_all_octants() {
  let parent = NodeId::new(2, IVec3::new(1, 3, 2), 7);
  let children = parent.children();

  let positions: HashSet<IVec3> = children.iter().map(|c| c.position).collect();
  assert_eq!(positions.len(), 8);

  for (octant, child) in children.iter().enumerate() {
    assert_eq!(child.level, 3);
    assert_eq!(child.frame, 7);
    let expected = IVec3::new(
      2 + (octant & 1) as i32,
      6 + ((octant >> 1) & 1) as i32,
      4 + ((octant >> 2) & 1) as i32,
    );
    assert_eq!(child.position, expected, "octant {octant}");
    assert_eq!(child.parent(), Some(parent));
  }
}

#[test]
fn test_root_has_no_parent() {
  assert_eq!(NodeId::root(0).parent(), None);
}

#[test]
fn test_root_covers_tree() {
  let node = TreeNode::from_node_id(NodeId::root(0), 3).unwrap();
  assert_eq!(node.blocks_per_axis, 1);
  assert_eq!(node.relative_position, Vec3::ZERO);
  assert_eq!(node.relative_size(), 1.0);

  let bounds = node.world_bounds(Vec3::new(1.0, 0.5, 0.25));
  assert_eq!(bounds.min, Vec3::new(-0.5, -0.25, -0.125));
  assert_eq!(bounds.max, Vec3::new(0.5, 0.25, 0.125));
}

/// rel = position / 2^level
#[test]
fn test_relative_position() {
  let node = TreeNode::from_node_id(NodeId::new(2, IVec3::new(1, 2, 3), 0), 3).unwrap();
  assert_eq!(node.blocks_per_axis, 4);
  assert_eq!(node.relative_position, Vec3::new(0.25, 0.5, 0.75));

  let bounds = node.world_bounds(Vec3::ONE);
  assert_eq!(bounds.min, Vec3::new(-0.25, 0.0, 0.25));
  assert_eq!(bounds.max, Vec3::new(0.0, 0.25, 0.5));
}

/// Children of a node tile its world bounds.
#[test]
fn test_children_tile_parent_bounds() {
  let world = Vec3::new(1.0, 0.75, 0.5);
  let parent = NodeId::new(1, IVec3::new(1, 0, 1), 0);
  let parent_bounds = TreeNode::from_node_id(parent, 3).unwrap().world_bounds(world);

  let mut union = Aabb::empty();
  for child in parent.children() {
    let bounds = TreeNode::from_node_id(child, 3).unwrap().world_bounds(world);
    union.merge(&bounds);
  }
  assert_eq!(union, parent_bounds);
}

#[test]
fn test_level_beyond_tree_is_invalid() {
  let result = TreeNode::from_node_id(NodeId::new(3, IVec3::ZERO, 0), 3);
  assert!(matches!(result, Err(Error::InvalidNode { level: 3, .. })));
}

#[test]
fn test_position_outside_level_is_invalid() {
  for position in [IVec3::new(2, 0, 0), IVec3::new(0, -1, 0), IVec3::new(0, 0, 5)] {
    let result = TreeNode::from_node_id(NodeId::new(1, position, 0), 4);
    assert!(
      matches!(result, Err(Error::InvalidNode { level: 1, position: p }) if p == position.to_array()),
      "{position}"
    );
  }
}
