//! Distance falloff kernels for the field and LFP functors.

/// Weight applied to an event's value by its distance to the voxel center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FalloffKernel {
  /// `1 / max(d, min_distance)^2`
  InverseSquare { min_distance: f32 },
  /// `1 / max(d, min_distance)`
  Inverse { min_distance: f32 },
  /// `exp(-d^2 / (2 sigma^2))`
  Gaussian { sigma: f32 },
  /// Every event inside the cutoff counts fully.
  Constant,
}

impl FalloffKernel {
  /// Weight for an event at `distance` from the sample point.
  #[inline]
  pub fn weight(&self, distance: f32) -> f32 {
    match *self {
      FalloffKernel::InverseSquare { min_distance } => {
        let d = distance.max(min_distance);
        1.0 / (d * d)
      }
      FalloffKernel::Inverse { min_distance } => 1.0 / distance.max(min_distance),
      FalloffKernel::Gaussian { sigma } => {
        if sigma <= 0.0 {
          return if distance == 0.0 { 1.0 } else { 0.0 };
        }
        (-(distance * distance) / (2.0 * sigma * sigma)).exp()
      }
      FalloffKernel::Constant => 1.0,
    }
  }

  /// Parse a kernel name as used in configuration (`inverse-square`,
  /// `inverse`, `gaussian`, `constant`), with `scale` as the kernel's length
  /// parameter.
  pub fn from_name(name: &str, scale: f32) -> Option<Self> {
    match name {
      "inverse-square" | "inversesquare" => Some(FalloffKernel::InverseSquare { min_distance: scale }),
      "inverse" => Some(FalloffKernel::Inverse { min_distance: scale }),
      "gaussian" => Some(FalloffKernel::Gaussian { sigma: scale }),
      "constant" => Some(FalloffKernel::Constant),
      _ => None,
    }
  }
}

impl Default for FalloffKernel {
  fn default() -> Self {
    FalloffKernel::InverseSquare { min_distance: 1.0 }
  }
}
