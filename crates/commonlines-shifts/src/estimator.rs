use crate::lsqr::{lsqr, LsqrParams, LsqrStop};
use crate::sparse::{estimate_equation_capacity, ShiftSystem, ShiftSystemBuilder};
use crate::{EquationBudget, ShiftError};
use commonlines_core::geometry::common_line_indices;
use commonlines_core::{CommonLineAngles, InputShapeError, PolarFourierStack, RotationSet, ShiftSet};
use commonlines_detect::{search_shift, CommonLineDetection, CommonLineParams, FilteredRays, ShiftTable};
use log::{debug, warn};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftParams {
    pub lsqr: LsqrParams,
}

/// Per-image shifts and how the solve went.
#[derive(Clone, Debug)]
pub struct ShiftEstimate {
    pub shifts: ShiftSet,
    pub n_equations: usize,
    pub stop: LsqrStop,
    pub iterations: usize,
    pub residual_norm: f64,
}

/// Pairs `(i, j)`, `i < j`, in row-major order.
fn all_pairs(n_images: usize) -> Vec<(usize, usize)> {
    (0..n_images)
        .flat_map(|i| ((i + 1)..n_images).map(move |j| (i, j)))
        .collect()
}

/// Least-squares estimator of 2D in-plane shifts.
pub struct ShiftEstimator {
    params: ShiftParams,
}

impl ShiftEstimator {
    pub fn new(params: ShiftParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &ShiftParams {
        &self.params
    }

    /// One equation per pair with a common line, right-hand side read from
    /// the upper triangle of `shifts_1d`.
    pub fn exact_system<A: CommonLineAngles + ?Sized>(
        cl: &A,
        shifts_1d: &DMatrix<f64>,
    ) -> Result<ShiftSystem, ShiftError> {
        let n = cl.n_images();
        let (rows, cols) = shifts_1d.shape();
        if rows != n || cols != n {
            return Err(InputShapeError::MatrixShape {
                expected: n,
                rows,
                cols,
            }
            .into());
        }

        let mut builder = ShiftSystemBuilder::with_capacity(n, estimate_equation_capacity(n, None));
        for (i, j) in all_pairs(n) {
            if let (Some(alpha), Some(beta)) = (cl.angle(i, j), cl.angle(j, i)) {
                builder.push_pair(i, j, alpha, beta, shifts_1d[(i, j)]);
            }
        }
        debug!("exact shift system: {} equations", builder.n_equations());
        Ok(builder.build())
    }

    /// Equations for a seeded subset of pairs, with common lines taken
    /// from `rotations` and the 1D shifts re-measured on `stack`.
    pub fn approximate_system(
        stack: &PolarFourierStack,
        rotations: &RotationSet,
        detect: &CommonLineParams,
        budget: EquationBudget,
        seed: u64,
    ) -> Result<ShiftSystem, ShiftError> {
        let n = stack.n_images();
        if rotations.len() != n {
            return Err(InputShapeError::DataLength {
                expected: n,
                actual: rotations.len(),
            }
            .into());
        }
        if n < 2 {
            return Err(InputShapeError::TooFewImages { actual: n, min: 2 }.into());
        }
        detect.validate()?;

        let pairs = all_pairs(n);
        let n_equations = budget.equations(n, pairs.len())?;
        if n_equations < 2 * n {
            return Err(ShiftError::Underdetermined {
                equations: n_equations,
                unknowns: 2 * n,
            });
        }
        let pairs = if n_equations < pairs.len() {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut picked = rand::seq::index::sample(&mut rng, pairs.len(), n_equations).into_vec();
            picked.sort_unstable();
            picked.into_iter().map(|k| pairs[k]).collect()
        } else {
            pairs
        };

        let rays = FilteredRays::prepare(stack, detect)?;
        let table = ShiftTable::for_params(stack.n_rad(), detect);
        let n_theta = stack.n_theta();
        let half = n_theta / 2;
        let step = TAU / n_theta as f64;

        let mut builder = ShiftSystemBuilder::with_capacity(n, pairs.len());
        let mut parallel = 0usize;
        for &(i, j) in &pairs {
            let Some((c_ij, c_ji)) = common_line_indices(&rotations[i], &rotations[j], n_theta) else {
                parallel += 1;
                continue;
            };
            let reflected = c_ji >= half;
            let q = rays.ray(j, if reflected { c_ji - half } else { c_ji });
            let (shift, _) = search_shift(rays.ray(i, c_ij), q, reflected, &table);
            builder.push_pair(i, j, c_ij as f64 * step, c_ji as f64 * step, shift);
        }
        if parallel > 0 {
            warn!("{parallel} sampled pairs have parallel planes and were skipped");
        }
        debug!(
            "approximate shift system: {} of {} pairs",
            builder.n_equations(),
            n * (n - 1) / 2
        );
        Ok(builder.build())
    }

    /// Solve an assembled system with LSQR.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, system), fields(n_equations = system.n_equations()))
    )]
    pub fn solve(&self, system: &ShiftSystem) -> Result<ShiftEstimate, ShiftError> {
        let (equations, unknowns) = (system.n_equations(), system.n_unknowns());
        if equations < unknowns {
            return Err(ShiftError::Underdetermined {
                equations,
                unknowns,
            });
        }

        let sol = lsqr(&system.matrix, &system.rhs, &self.params.lsqr);
        if sol.x.iter().any(|v| !v.is_finite()) {
            return Err(ShiftError::NonFinite);
        }
        if sol.stop == LsqrStop::IterationLimit {
            warn!(
                "LSQR stopped at the iteration limit ({}), residual {:.3e}",
                sol.iterations, sol.residual_norm
            );
        }
        debug!(
            "LSQR: {:?} after {} iterations, residual {:.3e}",
            sol.stop, sol.iterations, sol.residual_norm
        );

        Ok(ShiftEstimate {
            shifts: ShiftSet::from_interleaved(&sol.x),
            n_equations: equations,
            stop: sol.stop,
            iterations: sol.iterations,
            residual_norm: sol.residual_norm,
        })
    }

    /// Shifts from measured common lines and 1D shifts.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(n_images = cl.n_images()))
    )]
    pub fn estimate_exact<A: CommonLineAngles + ?Sized>(
        &self,
        cl: &A,
        shifts_1d: &DMatrix<f64>,
    ) -> Result<ShiftEstimate, ShiftError> {
        self.solve(&Self::exact_system(cl, shifts_1d)?)
    }

    pub fn estimate_from_detection(
        &self,
        detection: &CommonLineDetection,
    ) -> Result<ShiftEstimate, ShiftError> {
        self.estimate_exact(&detection.clmatrix, &detection.shifts_1d)
    }

    /// Shifts from estimated rotations, re-measuring the 1D shifts of a
    /// budgeted subset of pairs.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(n_images = stack.n_images()))
    )]
    pub fn estimate_approximate(
        &self,
        stack: &PolarFourierStack,
        rotations: &RotationSet,
        detect: &CommonLineParams,
        budget: EquationBudget,
        seed: u64,
    ) -> Result<ShiftEstimate, ShiftError> {
        self.solve(&Self::approximate_system(stack, rotations, detect, budget, seed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonlines_core::CommonLineAngleMatrix;

    #[test]
    fn pairs_are_row_major() {
        assert_eq!(all_pairs(3), vec![(0, 1), (0, 2), (1, 2)]);
        assert!(all_pairs(1).is_empty());
    }

    #[test]
    fn shifts_matrix_must_match_the_image_count() {
        let cl = CommonLineAngleMatrix::undefined(4);
        let err = ShiftEstimator::exact_system(&cl, &DMatrix::zeros(3, 3)).unwrap_err();
        assert!(matches!(err, ShiftError::Shape(InputShapeError::MatrixShape { .. })));
    }

    #[test]
    fn too_few_equations_are_rejected() {
        let mut cl = CommonLineAngleMatrix::undefined(4);
        cl.set_pair(0, 1, 0.2, 1.0);
        cl.set_pair(2, 3, 0.4, 2.0);
        let err = ShiftEstimator::new(ShiftParams::default())
            .estimate_exact(&cl, &DMatrix::zeros(4, 4))
            .unwrap_err();
        assert!(matches!(
            err,
            ShiftError::Underdetermined {
                equations: 2,
                unknowns: 8
            }
        ));
    }
}
