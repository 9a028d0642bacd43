//! Polar-Fourier representation of an image stack.
//!
//! Ray `t` of image `i` samples the 2D Fourier transform of the image along
//! the in-plane direction `(cos θ_t, sin θ_t)`, `θ_t = 2π t / n_theta`, at
//! angular frequencies `ω0 · r`, `r = 0..n_rad`, with
//! `ω0 = 2π / (2 n_rad - 1)` radians per pixel. Sample `r = 0` is the DC term.
//!
//! Rays `t` and `t + n_theta / 2` are complex conjugates of each other for
//! real images; constructors enforce or assume that.

use crate::{ImageStack, InputShapeError};
use nalgebra::Complex;
use std::f64::consts::PI;

/// Smallest radial resolution that leaves samples after the band-pass.
pub const MIN_RADIAL_SAMPLES: usize = 3;

#[derive(Clone, Debug)]
pub struct PolarFourierStack {
    n_rad: usize,
    n_theta: usize,
    n_images: usize,
    /// `data[(i * n_theta + t) * n_rad + r]`
    data: Vec<Complex<f64>>,
}

fn check_dims(n_rad: usize, n_theta: usize) -> Result<(), InputShapeError> {
    if n_theta == 0 || n_theta % 2 != 0 {
        return Err(InputShapeError::OddAngularResolution { n_theta });
    }
    if n_rad < MIN_RADIAL_SAMPLES {
        return Err(InputShapeError::TooFewRadialSamples {
            n_rad,
            min: MIN_RADIAL_SAMPLES,
        });
    }
    Ok(())
}

/// Angular frequency step for a stack with `n_rad` radial samples.
#[inline]
pub fn frequency_step(n_rad: usize) -> f64 {
    2.0 * PI / (2 * n_rad).saturating_sub(1).max(1) as f64
}

impl PolarFourierStack {
    /// Wrap a full `[0, 2π)` stack laid out as `[image][angle][radius]`.
    pub fn new(
        n_rad: usize,
        n_theta: usize,
        n_images: usize,
        data: Vec<Complex<f64>>,
    ) -> Result<Self, InputShapeError> {
        check_dims(n_rad, n_theta)?;
        let expected = n_rad * n_theta * n_images;
        if data.len() != expected {
            return Err(InputShapeError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            n_rad,
            n_theta,
            n_images,
            data,
        })
    }

    /// Build a stack from the `[0, π)` half, laid out as
    /// `[image][angle < n_theta/2][radius]`. The second half is the exact
    /// conjugate of the first.
    pub fn from_half(
        n_rad: usize,
        n_theta: usize,
        n_images: usize,
        half: &[Complex<f64>],
    ) -> Result<Self, InputShapeError> {
        check_dims(n_rad, n_theta)?;
        let n_half = n_theta / 2;
        let expected = n_rad * n_half * n_images;
        if half.len() != expected {
            return Err(InputShapeError::DataLength {
                expected,
                actual: half.len(),
            });
        }

        let per_image = n_half * n_rad;
        let mut data = Vec::with_capacity(2 * expected);
        for img in half.chunks(per_image) {
            data.extend_from_slice(img);
            data.extend(img.iter().map(|c| c.conj()));
        }
        Ok(Self {
            n_rad,
            n_theta,
            n_images,
            data,
        })
    }

    /// Direct (non-uniform) Fourier transform of a small image stack.
    ///
    /// The image origin is pixel `(side/2, side/2)`. Cost is
    /// `O(n_images * n_theta/2 * n_rad * side²)`, which is fine for test
    /// sized stacks; large stacks should come from an external NUFFT.
    pub fn from_images(
        images: &ImageStack,
        n_rad: usize,
        n_theta: usize,
    ) -> Result<Self, InputShapeError> {
        check_dims(n_rad, n_theta)?;
        let side = images.side();
        let origin = (side / 2) as f64;
        let omega0 = frequency_step(n_rad);
        let n_half = n_theta / 2;

        let mut half = Vec::with_capacity(images.n_images() * n_half * n_rad);
        for i in 0..images.n_images() {
            let img = images.image(i);
            for t in 0..n_half {
                let theta = 2.0 * PI * t as f64 / n_theta as f64;
                let (s, c) = theta.sin_cos();
                for r in 0..n_rad {
                    let k = omega0 * r as f64;
                    let mut acc = Complex::new(0.0, 0.0);
                    for y in 0..side {
                        let yy = y as f64 - origin;
                        for x in 0..side {
                            let v = img[y * side + x];
                            if v == 0.0 {
                                continue;
                            }
                            let xx = x as f64 - origin;
                            let phase = -k * (xx * c + yy * s);
                            acc += Complex::from_polar(v, phase);
                        }
                    }
                    half.push(acc);
                }
            }
        }
        Self::from_half(n_rad, n_theta, images.n_images(), &half)
    }

    #[inline]
    pub fn n_rad(&self) -> usize {
        self.n_rad
    }

    #[inline]
    pub fn n_theta(&self) -> usize {
        self.n_theta
    }

    #[inline]
    pub fn n_images(&self) -> usize {
        self.n_images
    }

    /// Angular frequency step `ω0` in radians per pixel.
    #[inline]
    pub fn omega0(&self) -> f64 {
        frequency_step(self.n_rad)
    }

    /// Angle in radians of ray index `t`.
    #[inline]
    pub fn angle_of(&self, t: usize) -> f64 {
        2.0 * PI * t as f64 / self.n_theta as f64
    }

    #[inline]
    pub fn sample(&self, r: usize, t: usize, i: usize) -> Complex<f64> {
        self.data[(i * self.n_theta + t) * self.n_rad + r]
    }

    /// All radial samples of ray `t` in image `i`.
    #[inline]
    pub fn ray(&self, i: usize, t: usize) -> &[Complex<f64>] {
        let start = (i * self.n_theta + t) * self.n_rad;
        &self.data[start..start + self.n_rad]
    }

    /// Largest DC magnitude over the rays of image `i`.
    pub fn dc_magnitude(&self, i: usize) -> f64 {
        (0..self.n_theta)
            .map(|t| self.sample(0, t, i).norm())
            .fold(0.0, f64::max)
    }

    /// Largest sample magnitude in image `i`.
    pub fn max_magnitude(&self, i: usize) -> f64 {
        let per_image = self.n_theta * self.n_rad;
        self.data[i * per_image..(i + 1) * per_image]
            .iter()
            .map(|c| c.norm())
            .fold(0.0, f64::max)
    }
}
