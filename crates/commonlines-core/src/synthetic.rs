//! Synthetic test data with analytic Fourier transforms.
//!
//! The phantom is a sum of isotropic 3D Gaussian blobs. The 2D Fourier
//! transform of its projection along any direction is known in closed form,
//! so a polar-Fourier stack can be sampled exactly without an NUFFT. Blob
//! weights come in `(+w, -w)` pairs of equal width, which makes every DC
//! sample exactly zero.

use crate::geometry::rot_z;
use crate::polar::frequency_step;
use crate::{InputShapeError, PolarFourierStack, RotationSet, ShiftSet};
use nalgebra::{Complex, Matrix3, Quaternion, UnitQuaternion, Vector2, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Uniformly distributed random rotations (Shoemake's quaternion method).
pub fn random_rotations<R: Rng + ?Sized>(n: usize, rng: &mut R) -> RotationSet {
    let rotations = (0..n)
        .map(|_| {
            let u1: f64 = rng.random();
            let u2: f64 = rng.random();
            let u3: f64 = rng.random();
            let (a, b) = ((1.0 - u1).sqrt(), u1.sqrt());
            let q = Quaternion::new(
                b * (TAU * u3).cos(),
                a * (TAU * u2).sin(),
                a * (TAU * u2).cos(),
                b * (TAU * u3).sin(),
            );
            UnitQuaternion::from_quaternion(q)
                .to_rotation_matrix()
                .into_inner()
        })
        .collect();
    RotationSet::new(rotations)
}

/// Random in-plane shifts with components in `[-max_abs, max_abs]`.
pub fn random_shifts<R: Rng + ?Sized>(n: usize, max_abs: f64, rng: &mut R) -> ShiftSet {
    ShiftSet(
        (0..n)
            .map(|_| {
                Vector2::new(
                    rng.random_range(-max_abs..=max_abs),
                    rng.random_range(-max_abs..=max_abs),
                )
            })
            .collect(),
    )
}

/// Three projection planes (xy, xz, yz) meeting pairwise on the coordinate
/// axes, each turned in-plane by `steps[i] * 2π / n_theta` and then moved by
/// the global rotation `global`. All common lines fall exactly on ray
/// indices when `n_theta` is a multiple of 4.
pub fn grid_aligned_triplet(global: &Matrix3<f64>, steps: [usize; 3], n_theta: usize) -> RotationSet {
    let planes = [
        Matrix3::identity(),
        Matrix3::from_columns(&[Vector3::x(), Vector3::z(), -Vector3::y()]),
        Matrix3::from_columns(&[Vector3::y(), Vector3::z(), Vector3::x()]),
    ];
    let delta = TAU / n_theta as f64;
    RotationSet::new(
        planes
            .iter()
            .zip(steps)
            .map(|(p, k)| global * p * rot_z(k as f64 * delta))
            .collect(),
    )
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GaussianBlob {
    pub center: Vector3<f64>,
    pub weight: f64,
    pub sigma: f64,
}

/// Sum of Gaussian blobs with zero total mass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GaussianPhantom {
    pub blobs: Vec<GaussianBlob>,
}

impl GaussianPhantom {
    /// `n_pairs` pairs of opposite-weight blobs with centers inside a ball
    /// of the given radius (pixels).
    pub fn random<R: Rng + ?Sized>(n_pairs: usize, radius: f64, sigma: f64, rng: &mut R) -> Self {
        let random_center = |rng: &mut R| loop {
            let c = Vector3::new(
                rng.random_range(-radius..=radius),
                rng.random_range(-radius..=radius),
                rng.random_range(-radius..=radius),
            );
            if c.norm() <= radius {
                return c;
            }
        };
        let mut blobs = Vec::with_capacity(2 * n_pairs);
        for _ in 0..n_pairs {
            let weight = rng.random_range(0.5..1.5);
            blobs.push(GaussianBlob {
                center: random_center(rng),
                weight,
                sigma,
            });
            blobs.push(GaussianBlob {
                center: random_center(rng),
                weight: -weight,
                sigma,
            });
        }
        Self { blobs }
    }

    /// Fourier transform of the projection through `rotation`, shifted by
    /// `shift`, at in-plane angle `theta` and angular frequency `k`.
    pub fn projection_spectrum(
        &self,
        rotation: &Matrix3<f64>,
        shift: &Vector2<f64>,
        theta: f64,
        k: f64,
    ) -> Complex<f64> {
        let (s, c) = theta.sin_cos();
        let dir: Vector3<f64> = rotation.column(0) * c + rotation.column(1) * s;
        let offset = c * shift.x + s * shift.y;
        self.blobs
            .iter()
            .map(|b| {
                let amp = b.weight * TAU * b.sigma * b.sigma * (-0.5 * (k * b.sigma).powi(2)).exp();
                Complex::from_polar(amp, -k * (dir.dot(&b.center) + offset))
            })
            .sum()
    }

    /// Exact polar-Fourier stack of the projections.
    ///
    /// `shifts` defaults to zero for every image.
    pub fn polar_stack(
        &self,
        rotations: &RotationSet,
        shifts: Option<&ShiftSet>,
        n_rad: usize,
        n_theta: usize,
    ) -> Result<PolarFourierStack, InputShapeError> {
        if n_theta == 0 || n_theta % 2 != 0 {
            return Err(InputShapeError::OddAngularResolution { n_theta });
        }
        let omega0 = frequency_step(n_rad);
        let zero = Vector2::zeros();
        let n_half = n_theta / 2;
        let mut half = Vec::with_capacity(rotations.len() * n_half * n_rad);
        for (i, rot) in rotations.iter().enumerate() {
            let shift = shifts.map_or(&zero, |s| &s[i]);
            for t in 0..n_half {
                let theta = PI * t as f64 / n_half as f64;
                for r in 0..n_rad {
                    half.push(self.projection_spectrum(rot, shift, theta, omega0 * r as f64));
                }
            }
        }
        PolarFourierStack::from_half(n_rad, n_theta, rotations.len(), &half)
    }

    /// Same phantom with an extra blob that gives every projection a
    /// nonzero mean.
    pub fn with_offset_mass(&self, weight: f64) -> Self {
        let mut blobs = self.blobs.clone();
        blobs.push(GaussianBlob {
            center: Vector3::zeros(),
            weight,
            sigma: blobs.first().map_or(1.0, |b| b.sigma),
        });
        Self { blobs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RotationSet;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn random_rotations_are_proper() {
        let mut rng = StdRng::seed_from_u64(1);
        let rots = random_rotations(20, &mut rng);
        assert!(rots.max_orthogonality_error() < 1e-12);
        assert!(rots.max_determinant_error() < 1e-12);
    }

    #[test]
    fn phantom_has_zero_dc() {
        let mut rng = StdRng::seed_from_u64(2);
        let phantom = GaussianPhantom::random(3, 5.0, 1.0, &mut rng);
        let rots = random_rotations(4, &mut rng);
        let stack = phantom.polar_stack(&rots, None, 8, 16).unwrap();
        for i in 0..4 {
            assert_eq!(stack.dc_magnitude(i), 0.0);
            assert!(stack.max_magnitude(i) > 0.0);
        }
    }

    #[test]
    fn common_line_rays_agree_between_images() {
        let mut rng = StdRng::seed_from_u64(4);
        let phantom = GaussianPhantom::random(3, 5.0, 1.0, &mut rng);
        let n_theta = 36;
        let rots: RotationSet = grid_aligned_triplet(&Matrix3::identity(), [0, 0, 0], n_theta);
        let stack = phantom.polar_stack(&rots, None, 10, n_theta).unwrap();
        // images 0 and 1 share the x axis at angle 0 in both
        for r in 0..10 {
            let a = stack.sample(r, 0, 0);
            let b = stack.sample(r, 0, 1);
            assert!((a - b).norm() < 1e-12);
        }
    }
}
