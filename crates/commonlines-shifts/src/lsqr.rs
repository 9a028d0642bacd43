//! LSQR (Paige & Saunders) for sparse least squares without damping.
//!
//! Minimizes `‖A x − b‖` by Golub–Kahan bidiagonalization, touching `A`
//! only through `A v` and `Aᵀ u`. Started from `x = 0`, a rank-deficient
//! but consistent system converges to its minimum-norm solution.

use crate::CsrMatrix;
use serde::{Deserialize, Serialize};

/// Stopping tolerances of [`lsqr`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LsqrParams {
    /// Relative accuracy of `A`; also bounds `‖Aᵀr‖ / (‖A‖ ‖r‖)` at a
    /// least-squares stop.
    pub atol: f64,
    /// Relative accuracy of `b`.
    pub btol: f64,
    /// `None` allows `4 * n_cols` iterations.
    pub max_iterations: Option<usize>,
}

impl Default for LsqrParams {
    fn default() -> Self {
        Self {
            atol: 1e-10,
            btol: 1e-10,
            max_iterations: None,
        }
    }
}

/// Why the iteration ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LsqrStop {
    /// `x = 0` is exact: `b = 0` or `Aᵀb = 0`.
    TrivialSolution,
    /// `A x = b` holds to the tolerances.
    Consistent,
    /// `x` is a least-squares solution to the tolerances.
    LeastSquares,
    IterationLimit,
}

#[derive(Clone, Debug)]
pub struct LsqrSolution {
    pub x: Vec<f64>,
    pub stop: LsqrStop,
    pub iterations: usize,
    /// `‖b − A x‖`.
    pub residual_norm: f64,
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn scale(v: &mut [f64], s: f64) {
    v.iter_mut().for_each(|x| *x *= s);
}

/// Solve `min ‖A x − b‖`.
pub fn lsqr(a: &CsrMatrix, b: &[f64], params: &LsqrParams) -> LsqrSolution {
    let n = a.n_cols();
    let max_iterations = params.max_iterations.unwrap_or(4 * n);
    let mut x = vec![0.0; n];

    let mut u = b.to_vec();
    let bnorm = norm(&u);
    let mut beta = bnorm;
    if beta == 0.0 {
        return LsqrSolution {
            x,
            stop: LsqrStop::TrivialSolution,
            iterations: 0,
            residual_norm: 0.0,
        };
    }
    scale(&mut u, 1.0 / beta);
    let mut v = a.tr_mul_vec(&u);
    let mut alpha = norm(&v);
    if alpha == 0.0 {
        return LsqrSolution {
            x,
            stop: LsqrStop::TrivialSolution,
            iterations: 0,
            residual_norm: bnorm,
        };
    }
    scale(&mut v, 1.0 / alpha);
    let mut w = v.clone();

    let mut rhobar = alpha;
    let mut phibar = beta;
    let mut anorm = 0.0f64;
    let mut stop = LsqrStop::IterationLimit;
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;

        // u = A v − α u
        let av = a.mul_vec(&v);
        for (ui, avi) in u.iter_mut().zip(&av) {
            *ui = avi - alpha * *ui;
        }
        beta = norm(&u);
        anorm = (anorm * anorm + alpha * alpha + beta * beta).sqrt();
        if beta > 0.0 {
            scale(&mut u, 1.0 / beta);
            // v = Aᵀ u − β v
            let atu = a.tr_mul_vec(&u);
            for (vi, atui) in v.iter_mut().zip(&atu) {
                *vi = atui - beta * *vi;
            }
            alpha = norm(&v);
            if alpha > 0.0 {
                scale(&mut v, 1.0 / alpha);
            }
        }

        let rho = rhobar.hypot(beta);
        let c = rhobar / rho;
        let s = beta / rho;
        let theta = s * alpha;
        rhobar = -c * alpha;
        let phi = c * phibar;
        phibar *= s;
        let tau = s * phi;

        let t1 = phi / rho;
        let t2 = -theta / rho;
        for ((xi, wi), vi) in x.iter_mut().zip(w.iter_mut()).zip(&v) {
            *xi += t1 * *wi;
            *wi = vi + t2 * *wi;
        }

        let rnorm = phibar;
        let arnorm = alpha * tau.abs();
        let xnorm = norm(&x);
        let rtol = params.btol + params.atol * anorm * xnorm / bnorm;
        if rnorm <= rtol * bnorm {
            stop = LsqrStop::Consistent;
            break;
        }
        if arnorm <= params.atol * anorm * rnorm {
            stop = LsqrStop::LeastSquares;
            break;
        }
    }

    let ax = a.mul_vec(&x);
    let residual_norm = norm(
        &b.iter()
            .zip(&ax)
            .map(|(bi, axi)| bi - axi)
            .collect::<Vec<_>>(),
    );
    LsqrSolution {
        x,
        stop,
        iterations,
        residual_norm,
    }
}
