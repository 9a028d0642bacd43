use crate::filter::{FilteredRays, ShiftTable};
use crate::search::{search_pair, PairMatch};
use crate::{CommonLineParams, DetectError};
use commonlines_core::{CommonLineMatrix, InputShapeError, PolarFourierStack};
use log::debug;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Common lines, correlation scores and 1D shifts of an image stack.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommonLineDetection {
    pub clmatrix: CommonLineMatrix,
    /// Symmetric normalized correlation of each detected pair, in `(0, 1]`.
    /// Zero marks a pair that was not evaluated or had no positive match.
    pub confidence: DMatrix<f64>,
    /// `shifts_1d[(i, j)]`, `i < j`: shift along the common line in pixels.
    pub shifts_1d: DMatrix<f64>,
}

impl CommonLineDetection {
    fn empty(n_images: usize, n_theta: usize) -> Self {
        Self {
            clmatrix: CommonLineMatrix::undefined(n_images, n_theta),
            confidence: DMatrix::zeros(n_images, n_images),
            shifts_1d: DMatrix::zeros(n_images, n_images),
        }
    }

    fn merge(&mut self, m: &PairMatch) {
        self.clmatrix.set_pair(m.i, m.j, m.cl_ij, m.cl_ji);
        self.confidence[(m.i, m.j)] = m.score;
        self.confidence[(m.j, m.i)] = m.score;
        self.shifts_1d[(m.i, m.j)] = m.shift;
    }

    /// `1 - score` for detected pairs, zero elsewhere (lower is better).
    pub fn dissimilarity(&self) -> DMatrix<f64> {
        self.confidence
            .map(|s| if s > 0.0 { 1.0 - s } else { 0.0 })
    }
}

/// Pairs `(i, j)`, `i < j`, compared by the detector.
///
/// With `n_check = None` every pair is listed. Otherwise image `i` is
/// compared with a random subset of `min(N - i - 1, n_check)` later images,
/// drawn from one seeded generator in image order.
pub fn candidate_pairs(n_images: usize, n_check: Option<usize>, seed: u64) -> Vec<(usize, usize)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pairs = Vec::new();
    for i in 0..n_images {
        let later = n_images - i - 1;
        match n_check {
            Some(k) if k < later => {
                let mut picked: Vec<usize> = rand::seq::index::sample(&mut rng, later, k)
                    .into_iter()
                    .map(|o| i + 1 + o)
                    .collect();
                picked.sort_unstable();
                pairs.extend(picked.into_iter().map(|j| (i, j)));
            }
            _ => pairs.extend(((i + 1)..n_images).map(|j| (i, j))),
        }
    }
    pairs
}

/// Exhaustive common-line detector over a polar-Fourier stack.
pub struct CommonLineDetector {
    params: CommonLineParams,
}

impl CommonLineDetector {
    pub fn new(params: CommonLineParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &CommonLineParams {
        &self.params
    }

    /// Detect the common line of every candidate pair.
    ///
    /// Fails on malformed parameters, fewer than two images, or a degenerate
    /// ray (nonzero DC, vanishing band-passed energy).
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, stack), fields(n_images = stack.n_images(), n_theta = stack.n_theta()))
    )]
    pub fn detect(&self, stack: &PolarFourierStack) -> Result<CommonLineDetection, DetectError> {
        self.params.validate()?;
        let n = stack.n_images();
        if n < 2 {
            return Err(InputShapeError::TooFewImages { actual: n, min: 2 }.into());
        }

        let rays = FilteredRays::prepare(stack, &self.params)?;
        let table = ShiftTable::for_params(stack.n_rad(), &self.params);
        let pairs = candidate_pairs(n, self.params.n_check, self.params.seed);
        debug!(
            "searching {} pairs, {} rays x {} shifts",
            pairs.len(),
            rays.n_half(),
            table.shifts().len()
        );

        let run = |&(i, j): &(usize, usize)| {
            search_pair((i, rays.image(i)), (j, rays.image(j)), rays.n_half(), &table)
        };
        #[cfg(feature = "rayon")]
        let matches: Vec<Option<PairMatch>> = pairs.par_iter().map(run).collect();
        #[cfg(not(feature = "rayon"))]
        let matches: Vec<Option<PairMatch>> = pairs.iter().map(run).collect();

        let mut out = CommonLineDetection::empty(n, stack.n_theta());
        for m in matches.iter().flatten() {
            out.merge(m);
        }
        debug!(
            "detected {} of {} candidate pairs",
            out.clmatrix.defined_pairs(),
            pairs.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pairs_without_n_check() {
        let pairs = candidate_pairs(4, None, 0);
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn n_check_limits_partners_per_image() {
        let pairs = candidate_pairs(10, Some(3), 7);
        for i in 0..10 {
            let count = pairs.iter().filter(|p| p.0 == i).count();
            assert_eq!(count, 3.min(10 - i - 1));
        }
        assert!(pairs.iter().all(|&(i, j)| i < j && j < 10));
        assert_eq!(pairs, candidate_pairs(10, Some(3), 7));
    }

    #[test]
    fn single_image_is_rejected() {
        let stack = PolarFourierStack::new(4, 8, 1, vec![Default::default(); 32]).unwrap();
        let err = CommonLineDetector::new(CommonLineParams::default())
            .detect(&stack)
            .unwrap_err();
        assert!(matches!(err, DetectError::Shape(InputShapeError::TooFewImages { .. })));
    }
}
