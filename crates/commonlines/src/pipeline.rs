use crate::{OrientationParams, ShiftMode};
use commonlines_core::{ImageStack, InputShapeError, PolarFourierStack, RotationSet};
use commonlines_detect::{CommonLineDetection, CommonLineDetector, DetectError};
use commonlines_shifts::{ShiftError, ShiftEstimate, ShiftEstimator};
use commonlines_sync::{
    RotationSynchronizer, SyncError, SyncMatrix, SyncReport, SynchronizationMatrixBuilder,
};
use log::info;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors of any pipeline stage.
#[derive(thiserror::Error, Debug)]
pub enum OrientationError {
    #[error(transparent)]
    Shape(#[from] InputShapeError),
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Shift(#[from] ShiftError),
}

/// Everything the pipeline produces.
#[derive(Clone, Debug)]
pub struct OrientationResult {
    pub common_lines: CommonLineDetection,
    pub sync_matrix: SyncMatrix,
    pub sync_report: SyncReport,
    /// One rotation per image, up to a global rotation and reflection.
    pub rotations: RotationSet,
    /// Eigenvalues of the synchronization matrix, descending.
    pub eigenvalues: Vec<f64>,
    /// `None` with [`ShiftMode::Skip`].
    pub shifts: Option<ShiftEstimate>,
}

/// Runs detection, voting, synchronization and shift estimation in order.
pub struct OrientationEstimator {
    params: OrientationParams,
}

impl OrientationEstimator {
    pub fn new(params: OrientationParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &OrientationParams {
        &self.params
    }

    /// Mean-subtract `images`, transform them with the direct polar DFT and
    /// run [`Self::estimate`].
    pub fn estimate_images(
        &self,
        images: &ImageStack,
        n_rad: usize,
        n_theta: usize,
    ) -> Result<OrientationResult, OrientationError> {
        let stack = PolarFourierStack::from_images(&images.mean_subtracted(), n_rad, n_theta)?;
        self.estimate(&stack)
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, stack), fields(n_images = stack.n_images(), n_theta = stack.n_theta()))
    )]
    pub fn estimate(&self, stack: &PolarFourierStack) -> Result<OrientationResult, OrientationError> {
        let p = &self.params;

        let common_lines = CommonLineDetector::new(p.detect.clone()).detect(stack)?;
        info!(
            "common lines: {} pairs detected",
            common_lines.clmatrix.defined_pairs()
        );

        let build = SynchronizationMatrixBuilder::new(p.voting.clone()).build(&common_lines.clmatrix);
        if build.report.null_blocks > 0 {
            info!("{} pairs have no voting consensus", build.report.null_blocks);
        }

        let sync = RotationSynchronizer::new(p.sync.clone()).synchronize(&build.matrix)?;
        info!(
            "rotations: {} images, leading eigenvalues {:?}",
            sync.rotations.len(),
            &sync.eigenvalues[..sync.eigenvalues.len().min(3)]
        );

        let estimator = ShiftEstimator::new(p.shift_solver.clone());
        let shifts = match &p.shifts {
            ShiftMode::Exact => Some(estimator.estimate_from_detection(&common_lines)?),
            ShiftMode::Approximate { budget, seed } => Some(estimator.estimate_approximate(
                stack,
                &sync.rotations,
                &p.detect,
                *budget,
                *seed,
            )?),
            ShiftMode::Skip => None,
        };

        Ok(OrientationResult {
            common_lines,
            sync_matrix: build.matrix,
            sync_report: build.report,
            rotations: sync.rotations,
            eigenvalues: sync.eigenvalues,
            shifts,
        })
    }
}
