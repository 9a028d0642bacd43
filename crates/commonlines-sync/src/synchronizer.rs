//! Rotations from the leading eigenvectors of the synchronization matrix.
//!
//! For exact data `S = W Wᵀ` with `W` the `2N x 3` stack of the rows
//! `a_iᵀ, b_iᵀ`, so the top three eigenvectors `V` span the columns of `W`:
//! `a_i = A v1_i`, `b_i = A v2_i` for an unknown `3 x 3` matrix `A`. The
//! unit-norm and orthogonality of `a_i, b_i` give linear equations for the
//! Gram matrix `Q = AᵀA`; a Cholesky factor of `Q` recovers `A` up to a
//! global orthogonal transform.

use crate::{SyncError, SyncMatrix, SyncParams};
use commonlines_core::geometry::orthogonality_error;
use commonlines_core::{InputShapeError, RotationSet};
use log::{debug, warn};
use nalgebra::{Cholesky, DMatrix, DVector, Matrix3, SymmetricEigen, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Rotations recovered by synchronization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncRotations {
    pub rotations: RotationSet,
    /// All eigenvalues of `S`, descending.
    pub eigenvalues: Vec<f64>,
    /// Images whose matrix had to be projected onto SO(3).
    pub projected: usize,
}

/// Coefficients of `vᵀ Q w` on the six unknowns of the symmetric `Q`:
/// `q00, q01, q02, q11, q12, q22`.
#[inline]
fn gram_row(v: &Vector3<f64>, w: &Vector3<f64>) -> [f64; 6] {
    [
        v[0] * w[0],
        v[0] * w[1] + v[1] * w[0],
        v[0] * w[2] + v[2] * w[0],
        v[1] * w[1],
        v[1] * w[2] + v[2] * w[1],
        v[2] * w[2],
    ]
}

/// Flip each column so that its largest-magnitude entry is positive.
fn fix_signs(v: &mut DMatrix<f64>) {
    for mut col in v.column_iter_mut() {
        if col[col.iamax()] < 0.0 {
            col.neg_mut();
        }
    }
}

/// Nearest proper rotation in the Frobenius sense.
fn nearest_rotation(m: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    let svd = m.svd(true, true);
    let (mut u, v_t) = (svd.u?, svd.v_t?);
    if (u * v_t).determinant() < 0.0 {
        u.column_mut(2).neg_mut();
    }
    Some(u * v_t)
}

/// Eigenvector-based rotation synchronizer.
pub struct RotationSynchronizer {
    params: SyncParams,
}

impl RotationSynchronizer {
    pub fn new(params: SyncParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &SyncParams {
        &self.params
    }

    /// Recover one rotation per image from `S`.
    ///
    /// The result is determined up to a global rotation and a global
    /// reflection; use `commonlines_core::register_rotations` to compare it
    /// with a reference.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, s), fields(n_images = s.n_images()))
    )]
    pub fn synchronize(&self, s: &SyncMatrix) -> Result<SyncRotations, SyncError> {
        let n = s.n_images();
        if n < 3 {
            return Err(InputShapeError::TooFewImages { actual: n, min: 3 }.into());
        }

        let eig = SymmetricEigen::new(s.matrix().clone());
        let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));
        let eigenvalues: Vec<f64> = order.iter().map(|&k| eig.eigenvalues[k]).collect();
        if eigenvalues.len() < 3 {
            return Err(SyncError::EigenDecomposition);
        }
        let shown = self.params.top_eigenvalues.min(eigenvalues.len());
        debug!("top eigenvalues of S: {:?}", &eigenvalues[..shown]);

        let mut v = DMatrix::from_fn(2 * n, 3, |r, c| eig.eigenvectors[(r, order[c])]);
        fix_signs(&mut v);
        let v1 = |i: usize| Vector3::new(v[(2 * i, 0)], v[(2 * i, 1)], v[(2 * i, 2)]);
        let v2 = |i: usize| Vector3::new(v[(2 * i + 1, 0)], v[(2 * i + 1, 1)], v[(2 * i + 1, 2)]);

        let mut eqs = DMatrix::<f64>::zeros(3 * n, 6);
        let mut rhs = DVector::<f64>::zeros(3 * n);
        for i in 0..n {
            let (a, b) = (v1(i), v2(i));
            for (r, (row, target)) in [(gram_row(&a, &a), 1.0), (gram_row(&b, &b), 1.0), (gram_row(&a, &b), 0.0)]
                .into_iter()
                .enumerate()
            {
                eqs.row_mut(3 * i + r).copy_from_slice(&row);
                rhs[3 * i + r] = target;
            }
        }
        let q = eqs
            .svd(true, true)
            .solve(&rhs, 1e-14)
            .map_err(SyncError::LeastSquares)?;
        let gram = Matrix3::new(
            q[0], q[1], q[2], //
            q[1], q[3], q[4], //
            q[2], q[4], q[5],
        );

        let Some(chol) = Cholesky::new(gram) else {
            let e = gram.symmetric_eigenvalues();
            return Err(SyncError::NotPositiveDefinite {
                eigenvalues: [e[0], e[1], e[2]],
            });
        };
        let a = chol.l().transpose();

        let mut projected = 0usize;
        let mut rotations = Vec::with_capacity(n);
        for i in 0..n {
            let r1 = a * v1(i);
            let r2 = a * v2(i);
            let r3 = r1.cross(&r2);
            let mut r = Matrix3::from_columns(&[r1, r2, r3]);
            if orthogonality_error(&r) > self.params.orthogonality_tolerance
                || (r.determinant() - 1.0).abs() > self.params.orthogonality_tolerance
            {
                if let Some(fixed) = nearest_rotation(&r) {
                    r = fixed;
                    projected += 1;
                }
            }
            rotations.push(r);
        }
        if projected > 0 {
            warn!("{projected} of {n} rotations projected onto SO(3)");
        }

        Ok(SyncRotations {
            rotations: RotationSet::new(rotations),
            eigenvalues,
            projected,
        })
    }
}
