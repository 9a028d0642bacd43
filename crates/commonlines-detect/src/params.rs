use crate::DetectError;
use serde::{Deserialize, Serialize};

/// Default angular resolution of the polar-Fourier transform.
pub const DEFAULT_N_THETA: usize = 360;

/// Default radial resolution for images of side `side`: half the side,
/// rounded up.
pub fn default_n_rad(side: usize) -> usize {
    side.div_ceil(2)
}

/// Configuration for the common-line detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommonLineParams {
    /// Largest 1D shift searched along a common line, in pixels.
    pub max_shift: f64,
    /// Step of the 1D shift search, in pixels.
    pub shift_step: f64,
    /// Partners checked per image among the later images.
    ///
    /// `None` compares every pair. Partners are drawn at random (seeded) when
    /// set.
    pub n_check: Option<usize>,
    /// Seed of the partner sampling.
    pub seed: u64,
    /// Rays whose band-passed norm falls below this are rejected.
    pub min_ray_norm: f64,
    /// Largest DC magnitude accepted, relative to the image's largest sample.
    pub dc_tolerance: f64,
}

impl Default for CommonLineParams {
    fn default() -> Self {
        Self {
            max_shift: 15.0,
            shift_step: 1.0,
            n_check: None,
            seed: 0,
            min_ray_norm: 1e-10,
            dc_tolerance: 1e-8,
        }
    }
}

impl CommonLineParams {
    /// Defaults scaled to images of side `side`: the shift search covers
    /// 15% of the side with unit steps.
    pub fn for_resolution(side: usize) -> Self {
        Self {
            max_shift: (0.15 * side as f64).ceil(),
            ..Self::default()
        }
    }

    /// Reject non-finite or non-positive shift settings and `n_check = 0`.
    pub fn validate(&self) -> Result<(), DetectError> {
        if !(self.max_shift.is_finite() && self.max_shift >= 0.0) {
            return Err(DetectError::InvalidParams(format!(
                "max_shift must be finite and non-negative, got {}",
                self.max_shift
            )));
        }
        if !(self.shift_step.is_finite() && self.shift_step > 0.0) {
            return Err(DetectError::InvalidParams(format!(
                "shift_step must be positive, got {}",
                self.shift_step
            )));
        }
        if self.n_check == Some(0) {
            return Err(DetectError::InvalidParams(
                "n_check must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_defaults() {
        let p = CommonLineParams::for_resolution(65);
        assert_eq!(p.max_shift, 10.0);
        assert_eq!(default_n_rad(65), 33);
        assert_eq!(default_n_rad(64), 32);
    }

    #[test]
    fn zero_step_is_rejected() {
        let p = CommonLineParams {
            shift_step: 0.0,
            ..CommonLineParams::default()
        };
        assert!(matches!(p.validate(), Err(DetectError::InvalidParams(_))));
    }
}
