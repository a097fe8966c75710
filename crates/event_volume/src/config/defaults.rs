//! Per volume type and functor defaults, in one lookup table.

use std::fmt;

use crate::constants::{DEFAULT_DENSITY_RESOLUTION, DEFAULT_RESOLUTION, MINIMUM_VOLTAGE};
use crate::functor::FunctorType;
use crate::normalizer::InputRange;

/// Kind of simulation data a volume is built from, selected by URI scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VolumeType {
  Compartments,
  Somas,
  Spikes,
  Synapses,
  Vsd,
  Test,
  Unknown,
}

impl VolumeType {
  /// Map a URI scheme onto a volume type.
  pub fn from_scheme(scheme: &str) -> Self {
    match scheme {
      "fivox" | "fivoxcompartments" => VolumeType::Compartments,
      "fivoxsomas" => VolumeType::Somas,
      "fivoxspikes" => VolumeType::Spikes,
      "fivoxsynapses" => VolumeType::Synapses,
      "fivoxvsd" => VolumeType::Vsd,
      "fivoxtest" => VolumeType::Test,
      _ => VolumeType::Unknown,
    }
  }

  /// Functor used when the configuration does not name one.
  pub fn default_functor(&self) -> FunctorType {
    match self {
      VolumeType::Spikes => FunctorType::Frequency,
      VolumeType::Synapses => FunctorType::Density,
      _ => FunctorType::Field,
    }
  }
}

impl fmt::Display for VolumeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      VolumeType::Compartments => "compartments",
      VolumeType::Somas => "somas",
      VolumeType::Spikes => "spikes",
      VolumeType::Synapses => "synapses",
      VolumeType::Vsd => "vsd",
      VolumeType::Test => "test",
      VolumeType::Unknown => "unknown",
    })
  }
}

/// Defaults resolved for one (volume type, functor) pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceDefaults {
  pub input_range: InputRange,
  pub report: &'static str,
  pub resolution: f32,
}

impl SourceDefaults {
  /// Look up the defaults for `volume` sampled with `functor`.
  pub fn lookup(volume: VolumeType, functor: FunctorType) -> Self {
    use FunctorType as F;
    use VolumeType as V;

    let input_range = match (volume, functor) {
      (V::Compartments, F::Lfp) => InputRange::new(-1.47e-5, 2.25e-3),
      (V::Compartments | V::Somas, _) => InputRange::new(MINIMUM_VOLTAGE, 0.0),
      (V::Vsd, _) => InputRange::new(-100_000.0, 300.0),
      (V::Spikes | V::Synapses, _) => InputRange::new(0.0, 2.0),
      (V::Test | V::Unknown, _) => InputRange::new(0.0, 10.0),
    };

    let report = match (volume, functor) {
      (V::Somas, _) => "somas",
      (_, F::Lfp) => "currents",
      _ => "voltages",
    };

    let resolution = match functor {
      F::Density => DEFAULT_DENSITY_RESOLUTION,
      _ => DEFAULT_RESOLUTION,
    };

    Self {
      input_range,
      report,
      resolution,
    }
  }
}
