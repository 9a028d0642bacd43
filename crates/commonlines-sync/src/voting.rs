//! Witness voting for the angle between the planes of an image pair.
//!
//! Every third image `k` with common lines to both `i` and `j` closes a
//! spherical triangle whose sides are the in-plane angles between common
//! lines. The angle `φ` of that triangle opposite the `(k)` side is the
//! angle between the two projection planes along their common line, and
//! `cos φ` is the `(2,2)` entry of the relative rotation. Witnesses vote
//! on `φ` through a Gaussian-smoothed histogram; only votes near the peak
//! are kept.

use crate::VotingParams;
use commonlines_core::geometry::wrap_two_pi;
use commonlines_core::CommonLineAngles;
use log::{trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One accepted witness.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Witness {
    pub k: usize,
    pub cos_phi: f64,
    /// `φ` in degrees, `[0, 180]`.
    pub angle_deg: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteHistogram {
    pub bin_centers: Vec<f64>,
    pub values: Vec<f64>,
}

/// Result of voting on one pair.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoteOutcome {
    /// Witnesses agreeing with the consensus.
    pub good: Vec<Witness>,
    /// Witnesses failing the spherical-triangle test.
    pub rejected: Vec<usize>,
    /// Witnesses whose `|cos φ|` exceeded 1 by more than the tolerance.
    pub imprecise: usize,
    /// Peak of the smoothed histogram, degrees.
    pub consensus_deg: Option<f64>,
    pub peak_height: f64,
    pub histogram: Option<VoteHistogram>,
}

/// `cos φ` of one witness triangle, or why there is none.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TriangleVote {
    Accepted { cos_phi: f64, imprecise: bool },
    Inconsistent,
}

#[inline]
fn in_upper_half(theta: f64) -> bool {
    wrap_two_pi(theta) > PI
}

/// Solve the spherical triangle with sides `theta1`, `theta2` (at the pair)
/// and `theta3` (at the witness) for the cosine of the angle between the
/// first two sides.
pub fn triangle_vote(theta1: f64, theta2: f64, theta3: f64, params: &VotingParams) -> TriangleVote {
    let (c1, c2, c3) = (theta1.cos(), theta2.cos(), theta3.cos());
    let gram = 1.0 + 2.0 * c1 * c2 * c3 - (c1 * c1 + c2 * c2 + c3 * c3);
    if gram <= params.triangle_tolerance {
        return TriangleVote::Inconsistent;
    }

    let mut cos_phi = (c3 - c1 * c2) / (theta1.sin().abs() * theta2.sin().abs());
    if in_upper_half(theta1) != in_upper_half(theta2) {
        cos_phi = -cos_phi;
    }

    let excess = cos_phi.abs() - 1.0;
    let imprecise = excess > params.cos_tolerance;
    if imprecise {
        warn!("cos(phi) out of range by {excess:.3e}, clamping");
    }
    TriangleVote::Accepted {
        cos_phi: cos_phi.clamp(-1.0, 1.0),
        imprecise,
    }
}

/// Gaussian-smoothed histogram of angles (degrees) sampled at `n_bins`
/// evenly spaced points of `[0, 180]`.
pub fn vote_histogram(angles_deg: &[f64], n_bins: usize, sigma_deg: f64) -> VoteHistogram {
    let bin_centers: Vec<f64> = match n_bins {
        0 => Vec::new(),
        1 => vec![90.0],
        n => (0..n).map(|b| 180.0 * b as f64 / (n - 1) as f64).collect(),
    };
    let denom = 2.0 * sigma_deg * sigma_deg;
    let values = bin_centers
        .iter()
        .map(|&x| {
            angles_deg
                .iter()
                .map(|&a| (-(a - x) * (a - x) / denom).exp())
                .sum()
        })
        .collect();
    VoteHistogram {
        bin_centers,
        values,
    }
}

/// Votes witnesses for pairs of a common-line set.
#[derive(Clone, Debug)]
pub struct VotingEstimator {
    params: VotingParams,
}

impl VotingEstimator {
    pub fn new(params: VotingParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &VotingParams {
        &self.params
    }

    /// Images that can witness pair `(i, j)`, subsampled when
    /// `max_witnesses` is set. The subsample depends only on the seed and
    /// the pair, not on evaluation order.
    pub fn witnesses<A: CommonLineAngles + ?Sized>(&self, cl: &A, i: usize, j: usize) -> Vec<usize> {
        let all: Vec<usize> = (0..cl.n_images())
            .filter(|&k| k != i && k != j && cl.is_defined(i, k) && cl.is_defined(j, k))
            .collect();
        match self.params.max_witnesses {
            Some(m) if m < all.len() => {
                let pair_seed = self.params.seed ^ ((i as u64) << 32 | j as u64);
                let mut rng = StdRng::seed_from_u64(pair_seed);
                let mut picked: Vec<usize> = rand::seq::index::sample(&mut rng, all.len(), m)
                    .into_iter()
                    .map(|idx| all[idx])
                    .collect();
                picked.sort_unstable();
                picked
            }
            _ => all,
        }
    }

    /// Vote on pair `(i, j)` with all eligible witnesses.
    pub fn vote_pair<A: CommonLineAngles + ?Sized>(&self, cl: &A, i: usize, j: usize) -> VoteOutcome {
        let witnesses = self.witnesses(cl, i, j);
        self.vote(cl, i, j, &witnesses)
    }

    /// Vote on pair `(i, j)` with the given witnesses.
    ///
    /// Returns an empty outcome if the pair itself has no common line.
    pub fn vote<A: CommonLineAngles + ?Sized>(
        &self,
        cl: &A,
        i: usize,
        j: usize,
        witnesses: &[usize],
    ) -> VoteOutcome {
        let mut outcome = VoteOutcome::default();
        let (Some(a_ij), Some(a_ji)) = (cl.angle(i, j), cl.angle(j, i)) else {
            return outcome;
        };

        let mut accepted = Vec::with_capacity(witnesses.len());
        for &k in witnesses {
            let (Some(a_ik), Some(a_ki), Some(a_jk), Some(a_kj)) =
                (cl.angle(i, k), cl.angle(k, i), cl.angle(j, k), cl.angle(k, j))
            else {
                continue;
            };
            let theta1 = a_ik - a_ij;
            let theta2 = a_jk - a_ji;
            let theta3 = a_kj - a_ki;
            match triangle_vote(theta1, theta2, theta3, &self.params) {
                TriangleVote::Accepted { cos_phi, imprecise } => {
                    outcome.imprecise += usize::from(imprecise);
                    accepted.push(Witness {
                        k,
                        cos_phi,
                        angle_deg: cos_phi.acos().to_degrees(),
                    });
                }
                TriangleVote::Inconsistent => {
                    trace!("pair ({i},{j}): witness {k} fails the triangle test");
                    outcome.rejected.push(k);
                }
            }
        }

        if accepted.is_empty() {
            return outcome;
        }

        let angles: Vec<f64> = accepted.iter().map(|w| w.angle_deg).collect();
        let hist = vote_histogram(&angles, self.params.n_bins, self.params.sigma_deg);
        let Some((peak_bin, &peak_height)) = hist
            .values
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, &f64)>, (b, v)| match best {
                Some((_, bv)) if *bv >= *v => best,
                _ => Some((b, v)),
            })
        else {
            return outcome;
        };
        let consensus = hist.bin_centers[peak_bin];
        let window = self.params.peak_window();

        outcome.good = accepted
            .into_iter()
            .filter(|w| (w.angle_deg - consensus).abs() < window)
            .collect();
        outcome.consensus_deg = Some(consensus);
        outcome.peak_height = peak_height;
        outcome.histogram = Some(hist);
        outcome
    }
}
