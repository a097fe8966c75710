//! Regular block tree over the event bounding box.
//!
//! Every node holds a block of the same voxel dimensions; a node one level
//! finer covers half the extent per axis at half the spacing.
//!
//! ```text
//! level 0   [                root                ]   spacing = s * 2^(L-1)
//! level 1   [       ][       ][       ][       ]     spacing = s * 2^(L-2)
//!   ...
//! level L-1 leaves                                   spacing = s
//! ```
//!
//! # Module Structure
//!
//! - [`geometry`]: `TreeGeometry` - block size and depth from the byte and
//!   texture budget
//! - [`node`]: `NodeId`, `TreeNode` - node addressing and world bounds
//! - [`volume_info`]: `VolumeInfo` - layout, transform, per-level spacing
//!   and origin

pub mod geometry;
pub mod node;
pub mod volume_info;

pub use geometry::TreeGeometry;
pub use node::{NodeId, TreeNode};
pub use volume_info::VolumeInfo;
