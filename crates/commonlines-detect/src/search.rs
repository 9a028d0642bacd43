//! Exhaustive common-line search for one image pair.
//!
//! For every trial shift `s` the half-rays `p` of the first image are phase
//! shifted and correlated against the half-rays `q` of the second image in
//! two ways:
//!
//! - direct: `Re Σ p·e^{iω0 r s}·conj(q)`, a match at `(t1, t2)` means the
//!   common line is ray `t1` in image `i` and ray `t2` in image `j`;
//! - reflected: `Re Σ conj(p)·e^{iω0 r s}·conj(q)`, a match means ray `t2` of
//!   image `j` carries the conjugate, so the line sits at `t2 + n_theta/2`.

use crate::filter::ShiftTable;
use nalgebra::Complex;
use serde::{Deserialize, Serialize};

/// Best common line of one pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairMatch {
    pub i: usize,
    pub j: usize,
    /// Ray index in image `i`, `< n_theta / 2`.
    pub cl_ij: usize,
    /// Ray index in image `j`, `< n_theta`.
    pub cl_ji: usize,
    /// Normalized correlation, at most 1.
    pub score: f64,
    /// 1D shift along the common line, in pixels.
    pub shift: f64,
}

#[inline]
fn real_dot(x: &[Complex<f64>], q: &[Complex<f64>]) -> f64 {
    x.iter().zip(q).map(|(a, b)| a.re * b.re + a.im * b.im).sum()
}

/// Argmax over all `(t1, t2)` ray pairs; first occurrence wins ties.
fn best_ray_pair(p: &[Complex<f64>], q: &[Complex<f64>], n_half: usize, n_used: usize) -> (usize, usize, f64) {
    let mut best = (0, 0, f64::NEG_INFINITY);
    for t1 in 0..n_half {
        let x = &p[t1 * n_used..(t1 + 1) * n_used];
        for t2 in 0..n_half {
            let v = real_dot(x, &q[t2 * n_used..(t2 + 1) * n_used]);
            if v > best.2 {
                best = (t1, t2, v);
            }
        }
    }
    best
}

/// Search every ray pair and trial shift of images `i` and `j`.
///
/// `rays_i` and `rays_j` hold `n_half` unit-norm rays of `n_used` samples.
/// Returns `None` if no configuration correlates positively.
pub fn search_pair(
    (i, rays_i): (usize, &[Complex<f64>]),
    (j, rays_j): (usize, &[Complex<f64>]),
    n_half: usize,
    table: &ShiftTable,
) -> Option<PairMatch> {
    let n_used = rays_i.len() / n_half.max(1);
    let mut direct = vec![Complex::new(0.0, 0.0); rays_i.len()];
    let mut reflected = vec![Complex::new(0.0, 0.0); rays_i.len()];
    let mut best: Option<PairMatch> = None;

    for (k, &shift) in table.shifts().iter().enumerate() {
        let ph = table.phases(k);
        for ((p, d), r) in rays_i
            .chunks_exact(n_used)
            .zip(direct.chunks_exact_mut(n_used))
            .zip(reflected.chunks_exact_mut(n_used))
        {
            for n in 0..n_used {
                d[n] = p[n] * ph[n];
                r[n] = p[n].conj() * ph[n];
            }
        }

        let (t1, t2, v_direct) = best_ray_pair(&direct, rays_j, n_half, n_used);
        let (u1, u2, v_reflected) = best_ray_pair(&reflected, rays_j, n_half, n_used);
        let (cl_ij, cl_ji, score) = if v_reflected > v_direct {
            (u1, u2 + n_half, v_reflected)
        } else {
            (t1, t2, v_direct)
        };

        if score > best.map_or(0.0, |b| b.score) {
            best = Some(PairMatch {
                i,
                j,
                cl_ij,
                cl_ji,
                score,
                shift,
            });
        }
    }
    best
}

/// Best trial shift for a known common line.
///
/// `p` and `q` are the filtered rays of the line in the two images;
/// `reflected` selects the conjugate correlation used when the line of the
/// second image lies in its second half-turn. Returns `(shift, score)`.
pub fn search_shift(
    p: &[Complex<f64>],
    q: &[Complex<f64>],
    reflected: bool,
    table: &ShiftTable,
) -> (f64, f64) {
    let mut best = (0.0, f64::NEG_INFINITY);
    for (k, &shift) in table.shifts().iter().enumerate() {
        let ph = table.phases(k);
        let v: f64 = p
            .iter()
            .zip(ph)
            .zip(q)
            .map(|((a, w), b)| {
                let x = if reflected { a.conj() * w } else { a * w };
                x.re * b.re + x.im * b.im
            })
            .sum();
        if v > best.1 {
            best = (shift, v);
        }
    }
    best
}
