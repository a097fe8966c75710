//! C ABI bridge for event_volume providers.
//!
//! The host loads this library, checks the ABI version, registers the
//! provider factory and then drives volumes through integer handles. All
//! sampling state lives on the Rust side; the host only passes URIs and node
//! ids and receives packed voxel bytes.
//!
//! # Architecture
//!
//! ```text
//! Host runtime                         Rust (event_volume_host)
//! ┌────────────────────┐               ┌──────────────────────────┐
//! │ plugin loader      │  _version()   │ PLUGIN_ABI_VERSION       │
//! │                    │ ─_register()─►│ PluginRegistry           │
//! │                    │               │  - loaders per scheme    │
//! │ volume reader:     │  _handles()   │                          │
//! │   open(uri) ───────┼──_create()──► │ VOLUMES: id → Volume     │
//! │   info ◄───────────┼──_get_info()  │  - VolumeProvider<u8>    │
//! │   brick(node) ◄────┼──_sample()────│  - or VolumeProvider<f32>│
//! │   refresh ─────────┼──_update()──► │                          │
//! └────────────────────┘               └──────────────────────────┘
//! ```
//!
//! # Return codes
//!
//! Entry points returning `i32` use negative values for failures:
//! - -1 null or invalid argument
//! - -2 failed to acquire lock
//! - -3 volume id not found
//! - -4 plugin not registered
//! - -5 volume construction failed (see log)
//!
//! # Custom loaders
//!
//! Format readers linked into the same library add themselves with
//! [`register_loader`] before the host opens a volume of their type.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use glam::IVec3;
use tracing::{error, info};

use event_volume::metrics::ProviderMetrics;
use event_volume::source::LoaderFn;
use event_volume::{
    description, handles, LoaderRegistry, NodeId, Result, VolumeInfo, VolumeProvider, VolumeType,
    VoxelBlock, VoxelValue,
};

/// ABI revision of the entry points below. Bumped on any layout change.
pub const PLUGIN_ABI_VERSION: u32 = 1;

// =============================================================================
// FFI Types
// =============================================================================

/// Node address across the FFI boundary.
/// Matches the host's node id struct exactly.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FfiNodeId {
    pub level: u32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub frame: u32,
}

impl From<NodeId> for FfiNodeId {
    fn from(node: NodeId) -> Self {
        Self {
            level: node.level,
            x: node.position.x,
            y: node.position.y,
            z: node.position.z,
            frame: node.frame,
        }
    }
}

impl From<FfiNodeId> for NodeId {
    fn from(id: FfiNodeId) -> Self {
        NodeId::new(id.level, IVec3::new(id.x, id.y, id.z), id.frame)
    }
}

/// Volume layout snapshot.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct FfiVolumeInfo {
    /// Tree extent in voxels at full resolution
    pub total_voxels: [u32; 3],
    /// Voxels per block, identical for every node
    pub block_voxels: [u32; 3],
    /// Tree levels, root included
    pub levels: u32,
    /// First available frame
    pub frame_start: u32,
    /// One past the last available frame (0 = no frames yet)
    pub frame_end: u32,
    pub component_count: u32,
    pub bytes_per_voxel: u32,
    /// Voxels per data unit
    pub resolution: f32,
    /// Column-major data-to-world transform
    pub data_to_world: [f32; 16],
    /// Tree extent in world space (longest axis = 1)
    pub world_size: [f32; 3],
    pub bbox_min: [f32; 3],
    pub bbox_max: [f32; 3],
    pub border: [f32; 3],
    pub meter_to_data_unit_ratio: f64,
}

impl From<&VolumeInfo> for FfiVolumeInfo {
    fn from(info: &VolumeInfo) -> Self {
        Self {
            total_voxels: info.total_voxels.to_array(),
            block_voxels: info.block_voxels.to_array(),
            levels: info.levels,
            frame_start: info.frame_range.start,
            frame_end: info.frame_range.end,
            component_count: info.component_count,
            bytes_per_voxel: info.bytes_per_voxel,
            resolution: info.resolution,
            data_to_world: info.data_to_world.to_cols_array(),
            world_size: info.world_size.to_array(),
            bbox_min: info.bounding_box.min.to_array(),
            bbox_max: info.bounding_box.max.to_array(),
            border: info.border.to_array(),
            meter_to_data_unit_ratio: info.meter_to_data_unit_ratio,
        }
    }
}

/// Timing statistics for FFI.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct FfiTimingStats {
    pub last_us: u64,
    pub avg_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub sample_count: u32,
    pub _pad: u32,
}

/// Provider statistics for FFI.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct FfiMetricsSnapshot {
    /// Block materialization timings
    pub sample: FfiTimingStats,
    pub blocks_sampled: u64,
    pub blocks_failed: u64,
    pub updates: u64,
    pub frame_range_changes: u64,
}

impl From<&ProviderMetrics> for FfiMetricsSnapshot {
    fn from(metrics: &ProviderMetrics) -> Self {
        let stats = metrics.sample_timings_us.stats();
        Self {
            sample: FfiTimingStats {
                last_us: stats.last_us,
                avg_us: stats.avg_us,
                min_us: stats.min_us,
                max_us: stats.max_us,
                sample_count: stats.sample_count,
                _pad: 0,
            },
            blocks_sampled: metrics.blocks_sampled,
            blocks_failed: metrics.blocks_failed,
            updates: metrics.updates,
            frame_range_changes: metrics.frame_range_changes,
        }
    }
}

// =============================================================================
// Volume State
// =============================================================================

/// Provider variant per output type.
enum Volume {
    Byte(VolumeProvider<u8>),
    Float(VolumeProvider<f32>),
}

impl Volume {
    fn open(uri: &str, float_output: bool, loaders: &LoaderRegistry) -> Result<Self> {
        Ok(if float_output {
            Volume::Float(VolumeProvider::from_uri(uri, loaders)?)
        } else {
            Volume::Byte(VolumeProvider::from_uri(uri, loaders)?)
        })
    }

    fn info(&self) -> VolumeInfo {
        match self {
            Volume::Byte(p) => p.info(),
            Volume::Float(p) => p.info(),
        }
    }

    /// Sample `node` into `out`. Returns bytes written, 0 if there was no
    /// data or `out` is too small.
    fn sample_into(&self, node: NodeId, out: &mut [u8]) -> usize {
        match self {
            Volume::Byte(p) => copy_block(p.sample(node), out),
            Volume::Float(p) => copy_block(p.sample(node), out),
        }
    }

    fn update(&self) -> bool {
        match self {
            Volume::Byte(p) => p.update(),
            Volume::Float(p) => p.update(),
        }
    }

    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn metrics(&self) -> ProviderMetrics {
        match self {
            Volume::Byte(p) => p.metrics(),
            Volume::Float(p) => p.metrics(),
        }
    }
}

fn copy_block<T: VoxelValue>(block: Option<VoxelBlock<T>>, out: &mut [u8]) -> usize {
    let Some(block) = block else {
        return 0;
    };
    let bytes = block.as_bytes();
    if bytes.len() > out.len() {
        error!(
            needed = bytes.len(),
            capacity = out.len(),
            "output buffer too small for block"
        );
        return 0;
    }
    out[..bytes.len()].copy_from_slice(bytes);
    bytes.len()
}

// =============================================================================
// Global Storage
// =============================================================================

/// Factories available to `event_volume_create`.
struct PluginRegistry {
    loaders: LoaderRegistry,
}

/// Set once the host has called `event_volume_plugin_register`.
static PLUGIN: Mutex<Option<PluginRegistry>> = Mutex::new(None);

/// Open volumes by handle.
///
/// Each provider serializes its own sampling; this lock only guards the map.
static VOLUMES: Mutex<Option<HashMap<i32, Arc<Volume>>>> = Mutex::new(None);
static NEXT_VOLUME_ID: AtomicI32 = AtomicI32::new(1);

/// Look up a volume and release the map lock before using it.
fn with_volume<R>(volume_id: i32, f: impl FnOnce(&Volume) -> R) -> std::result::Result<R, i32> {
    let volume = {
        let Ok(guard) = VOLUMES.lock() else {
            return Err(-2);
        };
        let Some(ref volumes) = *guard else {
            return Err(-3);
        };
        let Some(volume) = volumes.get(&volume_id) else {
            return Err(-3);
        };
        Arc::clone(volume)
    };
    Ok(f(&volume))
}

/// Add a loader for `volume` to the plugin registry, creating the registry
/// if the host has not registered yet.
///
/// Volumes opened afterwards use the new loader; open volumes keep theirs.
///
/// # Returns
/// - false if failed to acquire lock
pub fn register_loader(volume: VolumeType, loader: LoaderFn) -> bool {
    let Ok(mut guard) = PLUGIN.lock() else {
        return false;
    };
    let plugin = guard.get_or_insert_with(|| PluginRegistry {
        loaders: LoaderRegistry::new(),
    });
    plugin.loaders.register(volume, loader);
    info!(?volume, "loader registered");
    true
}

/// Read a NUL-terminated UTF-8 string.
///
/// # Safety
/// - `ptr` must be null or point to a valid C string.
unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

// =============================================================================
// FFI Functions - Plugin negotiation
// =============================================================================

/// ABI revision the host must match before calling anything else.
#[no_mangle]
pub extern "C" fn event_volume_plugin_version() -> u32 {
    PLUGIN_ABI_VERSION
}

/// Register the provider factory. Idempotent.
///
/// # Returns
/// - true once registered
/// - false if failed to acquire lock
#[no_mangle]
pub extern "C" fn event_volume_plugin_register() -> bool {
    let Ok(mut guard) = PLUGIN.lock() else {
        return false;
    };
    if guard.is_none() {
        *guard = Some(PluginRegistry {
            loaders: LoaderRegistry::new(),
        });
        info!(abi = PLUGIN_ABI_VERSION, "event volume plugin registered");
    }
    true
}

/// True if this plugin can open `uri`.
///
/// # Safety
/// - `uri` must be null or point to a valid C string.
#[no_mangle]
pub unsafe extern "C" fn event_volume_handles(uri: *const c_char) -> bool {
    read_str(uri).is_some_and(handles)
}

/// Capability summary with the option help. The string is static and must
/// not be freed.
#[no_mangle]
pub extern "C" fn event_volume_description() -> *const c_char {
    static DESCRIPTION: OnceLock<CString> = OnceLock::new();
    DESCRIPTION
        .get_or_init(|| CString::new(description().replace('\0', "")).unwrap_or_default())
        .as_ptr()
}

// =============================================================================
// FFI Functions - Volumes
// =============================================================================

unsafe fn create(uri: *const c_char, float_output: bool) -> i32 {
    let Some(uri) = read_str(uri) else {
        return -1;
    };

    // Loading can take long; other host threads may create volumes meanwhile.
    let loaders = {
        let Ok(guard) = PLUGIN.lock() else {
            return -2;
        };
        let Some(ref plugin) = *guard else {
            return -4;
        };
        plugin.loaders.clone()
    };

    // A panic must not unwind into the host.
    let volume = match panic::catch_unwind(AssertUnwindSafe(|| Volume::open(uri, float_output, &loaders))) {
        Ok(Ok(volume)) => volume,
        Ok(Err(err)) => {
            error!(uri, "cannot open volume: {err}");
            return -5;
        }
        Err(_) => {
            error!(uri, "volume loader panicked");
            return -5;
        }
    };

    let Ok(mut guard) = VOLUMES.lock() else {
        return -2;
    };
    let volumes = guard.get_or_insert_with(HashMap::new);

    let volume_id = NEXT_VOLUME_ID.fetch_add(1, Ordering::SeqCst);
    volumes.insert(volume_id, Arc::new(volume));

    volume_id
}

/// Open a volume with `u8` voxels.
///
/// # Safety
/// - `uri` must be null or point to a valid C string.
///
/// # Returns
/// - Positive volume_id on success
/// - Negative return code on failure
#[no_mangle]
pub unsafe extern "C" fn event_volume_create(uri: *const c_char) -> i32 {
    create(uri, false)
}

/// Open a volume with `f32` voxels.
///
/// # Safety
/// - `uri` must be null or point to a valid C string.
#[no_mangle]
pub unsafe extern "C" fn event_volume_create_float(uri: *const c_char) -> i32 {
    create(uri, true)
}

/// Copy the volume layout into `out`.
///
/// # Safety
/// - `out` must be null or point to a writable FfiVolumeInfo.
///
/// # Returns
/// - 0 on success
/// - Negative return code on failure
#[no_mangle]
pub unsafe extern "C" fn event_volume_get_info(volume_id: i32, out: *mut FfiVolumeInfo) -> i32 {
    if out.is_null() {
        return -1;
    }
    match with_volume(volume_id, |volume| FfiVolumeInfo::from(&volume.info())) {
        Ok(info) => {
            *out = info;
            0
        }
        Err(code) => code,
    }
}

/// Materialize `node` into `out`, blocking until the block is ready.
///
/// # Safety
/// - `out` must be null or point to `capacity` writable bytes.
///
/// # Returns
/// - Bytes written
/// - 0 if the node has no data, the buffer is too small or the volume is
///   unknown
#[no_mangle]
pub unsafe extern "C" fn event_volume_sample(
    volume_id: i32,
    node: FfiNodeId,
    out: *mut u8,
    capacity: usize,
) -> usize {
    if out.is_null() || capacity == 0 {
        return 0;
    }
    let out = std::slice::from_raw_parts_mut(out, capacity);
    with_volume(volume_id, |volume| volume.sample_into(node.into(), out)).unwrap_or(0)
}

/// Adopt frames the source produced since the last call.
///
/// # Returns
/// - true if the frame range grew
#[no_mangle]
pub extern "C" fn event_volume_update(volume_id: i32) -> bool {
    with_volume(volume_id, Volume::update).unwrap_or(false)
}

/// Copy the volume's provider statistics into `out`.
///
/// # Safety
/// - `out` must be null or point to a writable FfiMetricsSnapshot.
///
/// # Returns
/// - 0 on success
/// - -1 if out is null
/// - -3 if volume_id not found
/// - -4 if metrics feature disabled
#[no_mangle]
pub unsafe extern "C" fn event_volume_get_metrics(volume_id: i32, out: *mut FfiMetricsSnapshot) -> i32 {
    if out.is_null() {
        return -1;
    }

    #[cfg(feature = "metrics")]
    {
        match with_volume(volume_id, |volume| FfiMetricsSnapshot::from(&volume.metrics())) {
            Ok(snapshot) => {
                *out = snapshot;
                0
            }
            Err(code) => code,
        }
    }

    #[cfg(not(feature = "metrics"))]
    {
        let _ = volume_id;
        -4
    }
}

/// Close a volume and free its resources.
///
/// Blocks still being sampled on other threads finish first.
///
/// # Returns
/// - 0 on success
/// - -2 if failed to acquire lock
/// - -3 if volume_id not found
#[no_mangle]
pub extern "C" fn event_volume_destroy(volume_id: i32) -> i32 {
    let Ok(mut guard) = VOLUMES.lock() else {
        return -2;
    };

    let Some(ref mut volumes) = *guard else {
        return -3;
    };

    if volumes.remove(&volume_id).is_some() {
        0
    } else {
        -3
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn open(uri: &str) -> i32 {
        assert!(event_volume_plugin_register());
        let uri = c(uri);
        unsafe { event_volume_create(uri.as_ptr()) }
    }

    #[test]
    fn test_version() {
        assert_eq!(event_volume_plugin_version(), PLUGIN_ABI_VERSION);
    }

    #[test]
    fn test_register_is_idempotent() {
        assert!(event_volume_plugin_register());
        assert!(event_volume_plugin_register());
    }

    #[test]
    fn test_handles() {
        unsafe {
            assert!(event_volume_handles(c("fivoxsomas:///BlueConfig").as_ptr()));
            assert!(event_volume_handles(c("fivoxtest://").as_ptr()));
            assert!(!event_volume_handles(c("raw:///volume.raw").as_ptr()));
            assert!(!event_volume_handles(std::ptr::null()));
        }
    }

    #[test]
    fn test_description() {
        let text = unsafe { CStr::from_ptr(event_volume_description()) };
        let text = text.to_str().unwrap();
        assert!(text.starts_with("Field volumes: fivox*://"));
        assert!(text.contains("functor="));
    }

    #[test]
    fn test_node_id_conversion() {
        let node = NodeId::new(2, IVec3::new(1, 3, 0), 7);
        let id: FfiNodeId = node.into();
        assert_eq!((id.level, id.x, id.y, id.z, id.frame), (2, 1, 3, 0, 7));

        let back: NodeId = id.into();
        assert_eq!(back, node);
    }

    #[test]
    fn test_volume_lifecycle() {
        let volume_id = open("fivoxtest://?functor=density&resolution=0.25&duration=3");
        assert!(volume_id > 0, "Expected positive volume_id, got {}", volume_id);

        unsafe {
            let mut info = FfiVolumeInfo::default();
            assert_eq!(event_volume_get_info(volume_id, &mut info), 0);
            assert!(info.levels >= 1);
            assert_eq!(info.bytes_per_voxel, 1);
            assert_eq!((info.frame_start, info.frame_end), (0, 3));
            assert_eq!(info.world_size.iter().cloned().fold(0.0, f32::max), 1.0);

            let block_len = info.block_voxels.iter().map(|&v| v as usize).product::<usize>();
            let mut buffer = vec![0u8; block_len];
            let root = FfiNodeId::from(NodeId::root(1));
            let written = event_volume_sample(volume_id, root, buffer.as_mut_ptr(), buffer.len());
            assert_eq!(written, block_len);
            assert!(buffer.iter().any(|&v| v != 0));

            // Too small a buffer writes nothing.
            let written = event_volume_sample(volume_id, root, buffer.as_mut_ptr(), block_len - 1);
            assert_eq!(written, 0);

            // Frames past the end have no data.
            let late = FfiNodeId::from(NodeId::root(3));
            assert_eq!(event_volume_sample(volume_id, late, buffer.as_mut_ptr(), buffer.len()), 0);
        }

        assert!(!event_volume_update(volume_id));
        assert_eq!(event_volume_destroy(volume_id), 0);
        assert_eq!(event_volume_destroy(volume_id), -3, "Double destroy should return -3");
        assert!(!event_volume_update(volume_id));
    }

    #[test]
    fn test_float_volume() {
        assert!(event_volume_plugin_register());
        let uri = c("fivoxtest://?functor=frequency&resolution=0.25");
        unsafe {
            let volume_id = event_volume_create_float(uri.as_ptr());
            assert!(volume_id > 0);

            let mut info = FfiVolumeInfo::default();
            assert_eq!(event_volume_get_info(volume_id, &mut info), 0);
            assert_eq!(info.bytes_per_voxel, 4);

            let block_len = info.block_voxels.iter().map(|&v| v as usize).product::<usize>() * 4;
            let mut buffer = vec![0u8; block_len];
            let root = FfiNodeId::from(NodeId::root(0));
            assert_eq!(event_volume_sample(volume_id, root, buffer.as_mut_ptr(), block_len), block_len);

            assert_eq!(event_volume_destroy(volume_id), 0);
        }
    }

    #[test]
    fn test_create_failures() {
        unsafe {
            assert_eq!(event_volume_create(std::ptr::null()), -1);
        }
        assert_eq!(open("fivoxspikes:///BlueConfig"), -5);
        assert_eq!(unsafe { event_volume_get_info(9999, &mut FfiVolumeInfo::default()) }, -3);
    }

    fn panicking_loader(_: &event_volume::VolumeConfig) -> Result<Box<dyn event_volume::EventSource>> {
        panic!("corrupt synapse table");
    }

    #[test]
    fn test_panicking_loader_leaves_plugin_usable() {
        assert!(register_loader(VolumeType::Synapses, panicking_loader));
        assert_eq!(open("fivoxsynapses:///BlueConfig"), -5);

        // The registry is not poisoned and other volumes still open.
        assert!(PLUGIN.lock().is_ok());
        let volume_id = open("fivoxtest://?functor=density&resolution=0.25");
        assert!(volume_id > 0, "Expected positive volume_id, got {}", volume_id);
        assert_eq!(event_volume_destroy(volume_id), 0);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_metrics_snapshot() {
        let volume_id = open("fivoxtest://?functor=density&resolution=0.25&duration=2");
        assert!(volume_id > 0);

        unsafe {
            let mut info = FfiVolumeInfo::default();
            assert_eq!(event_volume_get_info(volume_id, &mut info), 0);
            let block_len = info.block_voxels.iter().map(|&v| v as usize).product::<usize>();
            let mut buffer = vec![0u8; block_len];
            for frame in 0..3 {
                let root = FfiNodeId::from(NodeId::root(frame));
                event_volume_sample(volume_id, root, buffer.as_mut_ptr(), buffer.len());
            }
            assert!(!event_volume_update(volume_id));

            let mut snapshot = FfiMetricsSnapshot::default();
            assert_eq!(event_volume_get_metrics(volume_id, &mut snapshot), 0);
            assert_eq!(snapshot.blocks_sampled, 2);
            assert_eq!(snapshot.blocks_failed, 1);
            assert_eq!(snapshot.updates, 1);
            assert_eq!(snapshot.frame_range_changes, 0);
            assert_eq!(snapshot.sample.sample_count, 3);
            assert!(snapshot.sample.min_us <= snapshot.sample.avg_us);
            assert!(snapshot.sample.avg_us <= snapshot.sample.max_us);

            assert_eq!(event_volume_get_metrics(volume_id, std::ptr::null_mut()), -1);
            assert_eq!(event_volume_destroy(volume_id), 0);
            assert_eq!(event_volume_get_metrics(volume_id, &mut snapshot), -3);
        }
    }
}
