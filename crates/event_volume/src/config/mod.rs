//! Volume configuration resolved from a URI query string.
//!
//! Every option has a default. Values that fail to parse are logged and
//! replaced by that default; configuration never fails.
//!
//! # Module Structure
//!
//! - [`uri`]: `VolumeUri` - scheme/path/query parsing with percent-decoding
//! - [`defaults`]: `VolumeType` and the (volume type, functor) defaults table

pub mod defaults;
pub mod uri;

use std::fmt;
use std::str::FromStr;

use tracing::{error, warn};

pub use defaults::{SourceDefaults, VolumeType};
pub use uri::VolumeUri;

use crate::constants::{
  DEFAULT_CUTOFF, DEFAULT_DT, DEFAULT_DURATION, DEFAULT_EXTEND, DEFAULT_GID_FRACTION, DEFAULT_MAX_BLOCK_SIZE,
};
use crate::functor::{FalloffKernel, FunctorParams, FunctorType};
use crate::normalizer::InputRange;

/// Option summary, one line per key.
const HELP: &str = "\
Data source options:
  target=<name>         population to load, '*' for all (default: source specific)
  report=<name>         report to sample (default: somas, currents or voltages)
  dt=<float>            time step, -1 uses the report's own (default: -1)
  spikes=<path>         spike data, overriding the configured source
  duration=<float>      spike time window (default: 10)
  inputMin=<float>      lower bound of the value range mapped to output
  inputMax=<float>      upper bound of the value range mapped to output
  dyecurve=<path>       dye response curve for VSD volumes
  resolution=<float>    voxels per micrometer (default: 0.0625 density, else 1)
  maxBlockSize=<bytes>  byte budget per octree block (default: 64 MiB)
  cutoff=<float>        max contribution distance in micrometers (default: 100)
  extend=<float>        query widening in micrometers (default: 0)
  gidFraction=<float>   fraction of the population to load (default: 1)
  reference=<path>      reference volume for comparison
  size=<int>            voxels along the largest axis, overrides resolution
  showProgress          log sampling progress
  functor=<name>        density, field, frequency or lfp (default: source specific)
  kernel=<name>         field falloff: inverse-square, inverse, gaussian, constant
  kernelScale=<float>   kernel length parameter (default: 1)
Schemes: fivox, fivoxcompartments, fivoxsomas, fivoxspikes, fivoxsynapses,
  fivoxvsd, fivoxtest";

/// Typed view over a volume URI.
#[derive(Clone, Debug)]
pub struct VolumeConfig {
  uri: VolumeUri,
  volume_type: VolumeType,
  functor_type: FunctorType,
}

impl VolumeConfig {
  pub fn new(uri: VolumeUri) -> Self {
    let volume_type = VolumeType::from_scheme(uri.scheme());
    if volume_type == VolumeType::Unknown {
      error!(scheme = uri.scheme(), "Unknown URI scheme");
    }

    let functor_type = match uri.get("functor").filter(|name| !name.is_empty()) {
      Some(name) => FunctorType::from_name(name).unwrap_or_else(|| {
        let fallback = volume_type.default_functor();
        warn!("Invalid functor {name} specified, using {}", fallback.name());
        fallback
      }),
      None => volume_type.default_functor(),
    };

    Self {
      uri,
      volume_type,
      functor_type,
    }
  }

  /// Parse `uri` and resolve its configuration.
  pub fn parse(uri: &str) -> Self {
    Self::new(VolumeUri::parse(uri))
  }

  pub fn uri(&self) -> &VolumeUri {
    &self.uri
  }

  /// Help text listing every recognized option.
  pub fn help() -> &'static str {
    HELP
  }

  pub fn volume_type(&self) -> VolumeType {
    self.volume_type
  }

  pub fn functor_type(&self) -> FunctorType {
    self.functor_type
  }

  /// Defaults for this configuration's volume type and functor.
  pub fn defaults(&self) -> SourceDefaults {
    SourceDefaults::lookup(self.volume_type, self.functor_type)
  }

  /// Population selector; `None` leaves the choice to the loader.
  pub fn target(&self) -> Option<&str> {
    self.string("target")
  }

  pub fn report(&self) -> String {
    self
      .string("report")
      .map_or_else(|| self.defaults().report.to_owned(), str::to_owned)
  }

  pub fn dt(&self) -> f32 {
    self.parsed("dt", DEFAULT_DT)
  }

  pub fn spikes(&self) -> Option<&str> {
    self.string("spikes")
  }

  pub fn duration(&self) -> f32 {
    self.parsed("duration", DEFAULT_DURATION)
  }

  /// Normalizer input range; each bound can be overridden separately.
  pub fn input_range(&self) -> InputRange {
    let default = self.defaults().input_range;
    InputRange::new(
      self.parsed("inputMin", default.min),
      self.parsed("inputMax", default.max),
    )
  }

  pub fn dye_curve(&self) -> Option<&str> {
    self.string("dyecurve")
  }

  /// Voxels per data unit, before any `size` override.
  pub fn resolution(&self) -> f32 {
    self.parsed("resolution", self.defaults().resolution)
  }

  pub fn max_block_size(&self) -> usize {
    self.parsed("maxBlockSize", DEFAULT_MAX_BLOCK_SIZE)
  }

  pub fn cutoff(&self) -> f32 {
    self.parsed("cutoff", DEFAULT_CUTOFF).max(0.0)
  }

  pub fn extend(&self) -> f32 {
    self.parsed("extend", DEFAULT_EXTEND).max(0.0)
  }

  pub fn gid_fraction(&self) -> f32 {
    self.parsed("gidFraction", DEFAULT_GID_FRACTION)
  }

  /// Reference volume to compare sampled blocks against when tuning
  /// `cutoff`. Read by host-side comparison tools; sampling ignores it.
  pub fn reference(&self) -> Option<&str> {
    self.string("reference")
  }

  /// Explicit voxel count along the largest axis; 0 derives it from the
  /// resolution.
  pub fn size_in_voxels(&self) -> usize {
    self.parsed("size", 0)
  }

  pub fn show_progress(&self) -> bool {
    self.flag("showProgress", false)
  }

  /// Falloff kernel for distance-sensitive functors.
  pub fn kernel(&self) -> FalloffKernel {
    let default = FunctorParams::for_type(self.functor_type).kernel;
    let Some(name) = self.string("kernel") else {
      return default;
    };
    let scale = self.parsed("kernelScale", 1.0);
    FalloffKernel::from_name(name, scale).unwrap_or_else(|| {
      warn!("Invalid kernel {name} specified, using {default:?}");
      default
    })
  }

  /// Distance parameters for the selected functor.
  pub fn functor_params(&self) -> FunctorParams {
    FunctorParams::for_type(self.functor_type)
      .with_cutoff(self.cutoff())
      .with_extend(self.extend())
      .with_kernel(self.kernel())
  }

  /// Non-empty string value of `key`.
  fn string(&self, key: &str) -> Option<&str> {
    self.uri.get(key).filter(|value| !value.is_empty())
  }

  /// Parsed value of `key`; absent or empty yields `default`, unparseable
  /// logs a warning and yields `default`.
  fn parsed<T: FromStr + fmt::Display>(&self, key: &str, default: T) -> T {
    let Some(value) = self.string(key) else {
      return default;
    };
    match value.trim().parse() {
      Ok(parsed) => parsed,
      Err(_) => {
        warn!("Invalid {key} specified, using {default}");
        default
      }
    }
  }

  /// Boolean `key`; present without a value means true.
  fn flag(&self, key: &str, default: bool) -> bool {
    let Some(value) = self.uri.get(key) else {
      return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
      "" | "1" | "true" | "yes" | "on" => true,
      "0" | "false" | "no" | "off" => false,
      _ => {
        warn!("Invalid {key} specified, using {default}");
        default
      }
    }
  }
}

impl FromStr for VolumeConfig {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Self::parse(s))
  }
}

impl fmt::Display for VolumeConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.volume_type {
      VolumeType::Compartments => write!(f, "compartment voltages from {}", self.report())?,
      VolumeType::Somas => write!(f, "soma voltages from {}", self.report())?,
      VolumeType::Spikes => write!(
        f,
        "spikes from {}, duration = {}",
        self.spikes().unwrap_or(self.uri.path()),
        self.duration()
      )?,
      VolumeType::Synapses => write!(f, "synapse positions from {}", self.uri.path())?,
      VolumeType::Vsd => write!(f, "VSD (Voltage-Sensitive Dye) from {}", self.report())?,
      VolumeType::Test => f.write_str("test type for validation")?,
      VolumeType::Unknown => f.write_str("unknown data source")?,
    }

    write!(
      f,
      ", using {}, input data range = {}, resolution = {}",
      self.functor_type,
      self.input_range(),
      self.resolution()
    )
  }
}
