//! Alignment of an estimated rotation set with a reference set.
//!
//! Common-line methods recover orientations only up to a global orthogonal
//! transform `O`: `R̂_i ≈ O R_i diag(1, 1, det O)`. `register_rotations`
//! finds `O` (orthogonal Procrustes on the in-plane axes) and reports how
//! well the two sets agree once it is removed.

use crate::RotationSet;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RotationRegistration {
    /// Orthogonal matrix with `estimated[i] ≈ transform * reference[i]` on
    /// the in-plane columns.
    pub transform: Matrix3<f64>,
    /// True when `transform` is a reflection (`det = -1`).
    pub reflected: bool,
    /// Mean Frobenius residual per rotation after alignment.
    pub mean_error: f64,
    /// Largest Frobenius residual after alignment.
    pub max_error: f64,
}

/// Register `estimated` onto `reference`.
///
/// Returns `None` for mismatched or empty inputs, or if the SVD does not
/// produce singular vectors.
pub fn register_rotations(
    estimated: &RotationSet,
    reference: &RotationSet,
) -> Option<RotationRegistration> {
    if estimated.is_empty() || estimated.len() != reference.len() {
        return None;
    }

    let mut cross = Matrix3::<f64>::zeros();
    for (e, r) in estimated.iter().zip(reference.iter()) {
        for c in 0..2 {
            cross += e.column(c) * r.column(c).transpose();
        }
    }
    let svd = cross.svd(true, true);
    let (u, v_t) = (svd.u?, svd.v_t?);
    let transform = u * v_t;
    let reflected = transform.determinant() < 0.0;
    let handedness = Matrix3::from_diagonal(&nalgebra::Vector3::new(
        1.0,
        1.0,
        if reflected { -1.0 } else { 1.0 },
    ));

    let errors: Vec<f64> = estimated
        .iter()
        .zip(reference.iter())
        .map(|(e, r)| (e - transform * r * handedness).norm())
        .collect();
    let max_error = errors.iter().copied().fold(0.0, f64::max);
    let mean_error = errors.iter().sum::<f64>() / errors.len() as f64;

    Some(RotationRegistration {
        transform,
        reflected,
        mean_error,
        max_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{rot_x, rot_z};
    use crate::synthetic::random_rotations;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn recovers_global_rotation() {
        let mut rng = StdRng::seed_from_u64(5);
        let truth = random_rotations(7, &mut rng);
        let g = rot_z(0.4) * rot_x(-1.1);
        let est = RotationSet::new(truth.iter().map(|r| g * r).collect());
        let reg = register_rotations(&est, &truth).unwrap();
        assert!(!reg.reflected);
        assert!(reg.max_error < 1e-12);
        assert!((reg.transform - g).norm() < 1e-12);
    }

    #[test]
    fn detects_reflected_set() {
        let mut rng = StdRng::seed_from_u64(9);
        let truth = random_rotations(6, &mut rng);
        let o = rot_z(1.3) * Matrix3::from_diagonal(&nalgebra::Vector3::new(1.0, 1.0, -1.0));
        let est = RotationSet::new(
            truth
                .iter()
                .map(|r| {
                    let a = o * r.column(0);
                    let b = o * r.column(1);
                    Matrix3::from_columns(&[a, b, a.cross(&b)])
                })
                .collect(),
        );
        let reg = register_rotations(&est, &truth).unwrap();
        assert!(reg.reflected);
        assert!(reg.max_error < 1e-12);
    }
}
