//! Ray band-pass filter and the trial-shift phase table.
//!
//! Each half-ray is weighted by `h(r) = sqrt(r) exp(-r² / (2 (r_max/4)²))`
//! with `r_max = n_rad - 1`. Radii 0 and 1 are dropped entirely, so stored
//! rays start at `r = FIRST_RADIUS`. Stored rays have unit norm.

use crate::{CommonLineParams, DegenerateReason, DetectError};
use commonlines_core::PolarFourierStack;
use nalgebra::Complex;

/// First radius kept after filtering.
pub const FIRST_RADIUS: usize = 2;

/// Radial weights of the band-pass filter.
#[derive(Clone, Debug)]
pub struct RayFilter {
    weights: Vec<f64>,
}

impl RayFilter {
    pub fn new(n_rad: usize) -> Self {
        let r_max = n_rad.saturating_sub(1) as f64;
        let width = r_max / 4.0;
        let weights = (FIRST_RADIUS..n_rad)
            .map(|r| {
                let r = r as f64;
                r.sqrt() * (-(r * r) / (2.0 * width * width)).exp()
            })
            .collect();
        Self { weights }
    }

    /// Number of radial samples per filtered ray.
    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Filter and normalize one full ray (all `n_rad` samples) into `out`.
    /// Returns the norm before normalization.
    pub fn apply(&self, ray: &[Complex<f64>], out: &mut [Complex<f64>]) -> f64 {
        for ((o, &s), &w) in out
            .iter_mut()
            .zip(&ray[FIRST_RADIUS..])
            .zip(&self.weights)
        {
            *o = s * w;
        }
        let norm = out.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
        if norm > 0.0 {
            out.iter_mut().for_each(|c| *c /= norm);
        }
        norm
    }
}

/// Band-passed, unit-norm half-rays (`t < n_theta / 2`) of a whole stack.
#[derive(Clone, Debug)]
pub struct FilteredRays {
    n_images: usize,
    n_half: usize,
    n_used: usize,
    /// `data[(i * n_half + t) * n_used + k]`, radius `k + FIRST_RADIUS`
    data: Vec<Complex<f64>>,
}

impl FilteredRays {
    /// Check DC terms and filter every half-ray of the stack.
    pub fn prepare(stack: &PolarFourierStack, params: &CommonLineParams) -> Result<Self, DetectError> {
        let filter = RayFilter::new(stack.n_rad());
        let n_half = stack.n_theta() / 2;
        let n_used = filter.len();
        let mut data = vec![Complex::new(0.0, 0.0); stack.n_images() * n_half * n_used];

        for i in 0..stack.n_images() {
            let dc = stack.dc_magnitude(i);
            let scale = stack.max_magnitude(i);
            if dc > params.dc_tolerance * scale {
                return Err(DetectError::DegenerateRay {
                    image: i,
                    reason: DegenerateReason::NonzeroDc { magnitude: dc },
                });
            }
            for t in 0..n_half {
                let start = (i * n_half + t) * n_used;
                let norm = filter.apply(stack.ray(i, t), &mut data[start..start + n_used]);
                if norm < params.min_ray_norm {
                    return Err(DetectError::DegenerateRay {
                        image: i,
                        reason: DegenerateReason::LowEnergy { angle: t, norm },
                    });
                }
            }
        }

        Ok(Self {
            n_images: stack.n_images(),
            n_half,
            n_used,
            data,
        })
    }

    #[inline]
    pub fn n_images(&self) -> usize {
        self.n_images
    }

    /// Number of rays per image (half of `n_theta`).
    #[inline]
    pub fn n_half(&self) -> usize {
        self.n_half
    }

    /// Samples per ray.
    #[inline]
    pub fn n_used(&self) -> usize {
        self.n_used
    }

    /// All half-rays of image `i`, ray-major.
    #[inline]
    pub fn image(&self, i: usize) -> &[Complex<f64>] {
        let len = self.n_half * self.n_used;
        &self.data[i * len..(i + 1) * len]
    }

    #[inline]
    pub fn ray(&self, i: usize, t: usize) -> &[Complex<f64>] {
        let start = (i * self.n_half + t) * self.n_used;
        &self.data[start..start + self.n_used]
    }
}

/// Phase ramps `exp(+i ω0 r s)` for every trial shift `s`.
#[derive(Clone, Debug)]
pub struct ShiftTable {
    shifts: Vec<f64>,
    n_used: usize,
    phases: Vec<Complex<f64>>,
}

impl ShiftTable {
    /// Trial shifts `-max_shift + k * shift_step` for
    /// `k < ceil(2 max_shift / shift_step + 1)`.
    pub fn new(n_rad: usize, max_shift: f64, shift_step: f64) -> Self {
        let n_shifts = (2.0 * max_shift / shift_step + 1.0).ceil().max(1.0) as usize;
        let shifts: Vec<f64> = (0..n_shifts)
            .map(|k| -max_shift + k as f64 * shift_step)
            .collect();
        let omega0 = commonlines_core::frequency_step(n_rad);
        let n_used = n_rad.saturating_sub(FIRST_RADIUS);
        let phases = shifts
            .iter()
            .flat_map(|&s| {
                (FIRST_RADIUS..n_rad).map(move |r| Complex::from_polar(1.0, omega0 * r as f64 * s))
            })
            .collect();
        Self {
            shifts,
            n_used,
            phases,
        }
    }

    pub fn for_params(n_rad: usize, params: &CommonLineParams) -> Self {
        Self::new(n_rad, params.max_shift, params.shift_step)
    }

    #[inline]
    pub fn shifts(&self) -> &[f64] {
        &self.shifts
    }

    #[inline]
    pub fn phases(&self, k: usize) -> &[Complex<f64>] {
        &self.phases[k * self.n_used..(k + 1) * self.n_used]
    }
}
