use crate::voting::{VoteOutcome, VotingEstimator};
use crate::VotingParams;
use commonlines_core::geometry::{rot_x, rot_z};
use commonlines_core::{CommonLineAngles, InputShapeError, RotationSet};
use log::debug;
use nalgebra::{DMatrix, Matrix2, Matrix3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Relative rotation `R_iᵀ R_j` of a pair, from its common-line angles
/// `aa` (in image `i`), `bb` (in image `j`) and the angle `phi` between the
/// two planes: `Rz(aa) Rx(phi) Rz(-bb)`.
#[inline]
pub fn rotation_ratio(aa: f64, bb: f64, cos_phi: f64) -> Matrix3<f64> {
    rot_z(aa) * rot_x(cos_phi.clamp(-1.0, 1.0).acos()) * rot_z(-bb)
}

/// `2N x 2N` matrix of pairwise in-plane relative rotations.
///
/// Block `(i, j)` approximates the top-left 2x2 of `R_iᵀ R_j`; diagonal
/// blocks are the identity and block `(j, i)` is the transpose of `(i, j)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncMatrix {
    n_images: usize,
    data: DMatrix<f64>,
}

impl SyncMatrix {
    /// Identity diagonal, zero elsewhere.
    pub fn identity(n_images: usize) -> Self {
        Self {
            n_images,
            data: DMatrix::identity(2 * n_images, 2 * n_images),
        }
    }

    /// Wrap an existing `2N x 2N` matrix.
    pub fn from_matrix(data: DMatrix<f64>) -> Result<Self, InputShapeError> {
        let (rows, cols) = data.shape();
        if rows != cols || rows % 2 != 0 {
            return Err(InputShapeError::MatrixShape {
                expected: rows + rows % 2,
                rows,
                cols,
            });
        }
        Ok(Self {
            n_images: rows / 2,
            data,
        })
    }

    /// Exact matrix of a known rotation set.
    pub fn from_rotations(rotations: &RotationSet) -> Self {
        let n = rotations.len();
        let mut s = Self::identity(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let r = rotations[i].transpose() * rotations[j];
                s.set_pair(i, j, &r.fixed_view::<2, 2>(0, 0).into_owned());
            }
        }
        s
    }

    #[inline]
    pub fn n_images(&self) -> usize {
        self.n_images
    }

    #[inline]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn block(&self, i: usize, j: usize) -> Matrix2<f64> {
        self.data.fixed_view::<2, 2>(2 * i, 2 * j).into_owned()
    }

    /// Write block `(i, j)` and its transpose at `(j, i)`.
    pub fn set_pair(&mut self, i: usize, j: usize, block: &Matrix2<f64>) {
        self.data.fixed_view_mut::<2, 2>(2 * i, 2 * j).copy_from(block);
        self.data
            .fixed_view_mut::<2, 2>(2 * j, 2 * i)
            .copy_from(&block.transpose());
    }

    /// Largest `|S - Sᵀ|` entry.
    pub fn asymmetry(&self) -> f64 {
        (&self.data - self.data.transpose()).amax()
    }
}

/// Per-pair summary of the voting.
#[derive(Clone, Debug)]
pub struct PairBlock {
    pub i: usize,
    pub j: usize,
    /// `None` when no witness survived.
    pub block: Option<Matrix2<f64>>,
    pub outcome: VoteOutcome,
    /// Relative spread of the witnesses' blocks around their mean.
    pub spread: f64,
}

/// Counters collected while building the matrix.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Pairs with a common line that went through voting.
    pub pairs_voted: usize,
    /// Voted pairs left with a zero block.
    pub null_blocks: usize,
    /// Witnesses failing the spherical-triangle test.
    pub rejected_witnesses: usize,
    /// Witnesses whose `|cos φ|` exceeded 1 beyond tolerance.
    pub precision_warnings: usize,
    /// Pairs whose witnesses disagree beyond the consistency tolerance.
    pub inconsistent_pairs: usize,
}

#[derive(Clone, Debug)]
pub struct SyncMatrixBuild {
    pub matrix: SyncMatrix,
    pub report: SyncReport,
}

/// Builds the synchronization matrix from common lines by witness voting.
#[derive(Clone, Debug)]
pub struct SynchronizationMatrixBuilder {
    voting: VotingEstimator,
}

impl SynchronizationMatrixBuilder {
    pub fn new(params: VotingParams) -> Self {
        Self {
            voting: VotingEstimator::new(params),
        }
    }

    #[inline]
    pub fn voting(&self) -> &VotingEstimator {
        &self.voting
    }

    /// Vote pair `(i, j)` and average the witnesses' relative rotations.
    pub fn pair_block<A: CommonLineAngles + ?Sized>(&self, cl: &A, i: usize, j: usize) -> PairBlock {
        let outcome = self.voting.vote_pair(cl, i, j);
        let angles = cl.angle(i, j).zip(cl.angle(j, i));
        let (block, spread) = match angles {
            Some((aa, bb)) if !outcome.good.is_empty() => {
                let blocks: Vec<Matrix2<f64>> = outcome
                    .good
                    .iter()
                    .map(|w| {
                        rotation_ratio(aa, bb, w.cos_phi)
                            .fixed_view::<2, 2>(0, 0)
                            .into_owned()
                    })
                    .collect();
                let mean = blocks.iter().sum::<Matrix2<f64>>() / blocks.len() as f64;
                let total: f64 = blocks.iter().map(|b| b.norm_squared()).sum();
                let dev: f64 = blocks.iter().map(|b| (b - mean).norm_squared()).sum();
                let spread = if total > 0.0 { (dev / total).sqrt() } else { 0.0 };
                (Some(mean), spread)
            }
            _ => (None, 0.0),
        };
        PairBlock {
            i,
            j,
            block,
            outcome,
            spread,
        }
    }

    /// Build `S` for all pairs with a common line.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, cl), fields(n_images = cl.n_images()))
    )]
    pub fn build<A: CommonLineAngles + Sync + ?Sized>(&self, cl: &A) -> SyncMatrixBuild {
        let n = cl.n_images();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .filter(|&(i, j)| cl.is_defined(i, j))
            .collect();

        let run = |&(i, j): &(usize, usize)| self.pair_block(cl, i, j);
        #[cfg(feature = "rayon")]
        let blocks: Vec<PairBlock> = pairs.par_iter().map(run).collect();
        #[cfg(not(feature = "rayon"))]
        let blocks: Vec<PairBlock> = pairs.iter().map(run).collect();

        let tol = self.voting.params().consistency_tolerance;
        let mut matrix = SyncMatrix::identity(n);
        let mut report = SyncReport {
            pairs_voted: blocks.len(),
            ..SyncReport::default()
        };
        for pb in &blocks {
            report.rejected_witnesses += pb.outcome.rejected.len();
            report.precision_warnings += pb.outcome.imprecise;
            match &pb.block {
                Some(b) => matrix.set_pair(pb.i, pb.j, b),
                None => report.null_blocks += 1,
            }
            if pb.spread > tol {
                debug!(
                    "pair ({},{}): witnesses spread {:.3e} over {} votes",
                    pb.i,
                    pb.j,
                    pb.spread,
                    pb.outcome.good.len()
                );
                report.inconsistent_pairs += 1;
            }
        }

        debug!(
            "sync matrix: {} pairs, {} null blocks, {} rejected witnesses, {} inconsistent pairs",
            report.pairs_voted, report.null_blocks, report.rejected_witnesses, report.inconsistent_pairs
        );
        SyncMatrixBuild { matrix, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonlines_core::synthetic::random_rotations;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn ratio_with_zero_angles_keeps_the_plane_tilt() {
        let r = rotation_ratio(0.0, 0.0, 0.5);
        assert!((r[(0, 0)] - 1.0).abs() < 1e-15);
        assert!((r[(1, 1)] - 0.5).abs() < 1e-15);
        assert!(r[(0, 1)].abs() < 1e-15 && r[(1, 0)].abs() < 1e-15);
    }

    #[test]
    fn exact_matrix_is_symmetric_with_identity_diagonal() {
        let mut rng = StdRng::seed_from_u64(21);
        let rots = random_rotations(5, &mut rng);
        let s = SyncMatrix::from_rotations(&rots);
        assert!(s.asymmetry() < 1e-15);
        for i in 0..5 {
            assert_eq!(s.block(i, i), Matrix2::identity());
        }
    }

    #[test]
    fn odd_sized_matrix_is_rejected() {
        assert!(SyncMatrix::from_matrix(DMatrix::zeros(5, 5)).is_err());
        assert!(SyncMatrix::from_matrix(DMatrix::zeros(4, 6)).is_err());
    }
}
