//! Layout and configuration constants.
//!
//! ```text
//! Octree block layout (per axis)
//!
//!   full resolution   = bbox_size * resolution           (voxels)
//!   block resolution  = full / 2^halvings                 (until it fits)
//!   block dimension   = ceil(block) rounded down to % 8   (if > 8)
//!   tree voxels       = block dimension * 2^halvings
//!   tree levels       = halvings + 1                      (level 0 = root)
//! ```

/// Largest texture edge a block may have on any axis.
///
/// Should come from the GPU, but geometry is derived before a graphics
/// context exists.
pub const MAX_TEXTURE_SIZE: u32 = 2048;

/// Block edges above this size are rounded down to a multiple of it.
pub const BLOCK_ALIGNMENT: u32 = 8;

/// Upper bound on halvings before geometry derivation gives up.
pub const MAX_TREE_HALVINGS: u32 = 24;

/// Data units per meter (event positions are in micrometers).
pub const METER_TO_DATA_UNIT_RATIO: f64 = 1e6;

/// Voxel components per sample (scalar volumes only).
pub const COMPONENT_COUNT: u32 = 1;

/// URI scheme prefix accepted by the provider.
pub const URI_SCHEME_PREFIX: &str = "fivox";

// =============================================================================
// Configuration defaults
// =============================================================================

/// Time window length for windowed sources (spikes).
pub const DEFAULT_DURATION: f32 = 10.0;

/// Negative dt defers to the source's own time step.
pub const DEFAULT_DT: f32 = -1.0;

/// Byte budget per octree block (64 MiB).
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024;

/// Voxels per data unit for all functors except density.
pub const DEFAULT_RESOLUTION: f32 = 1.0;

/// Voxels per data unit for the density functor.
pub const DEFAULT_DENSITY_RESOLUTION: f32 = 0.0625;

/// Max contribution distance for distance-sensitive functors (micrometers).
pub const DEFAULT_CUTOFF: f32 = 100.0;

/// Query-region widening for distance-sensitive functors (micrometers).
pub const DEFAULT_EXTEND: f32 = 0.0;

/// Fraction of the population that is loaded.
pub const DEFAULT_GID_FRACTION: f32 = 1.0;

/// Resting-potential floor used as the lower voltage bound (mV).
pub const MINIMUM_VOLTAGE: f32 = -80.0;

/// Extracellular conductivity for the LFP point-source model (S/m).
pub const DEFAULT_CONDUCTIVITY: f32 = 0.3333;

/// Distance below which LFP contributions are clamped (micrometers).
pub const LFP_MIN_DISTANCE: f32 = 1.0;
