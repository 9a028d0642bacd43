use serde::{Deserialize, Serialize};

/// Parameters of the witness voting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VotingParams {
    /// Histogram sample points on `[0°, 180°]`.
    pub n_bins: usize,
    /// Width of the Gaussian kernel, degrees.
    pub sigma_deg: f64,
    /// Witnesses with `1 + 2c1c2c3 - (c1² + c2² + c3²)` at or below this
    /// are discarded.
    pub triangle_tolerance: f64,
    /// `|cos φ| - 1` above this is reported as a precision problem.
    pub cos_tolerance: f64,
    /// Half-width of the accepted window around the peak, degrees.
    /// `None` uses `360 / n_bins`.
    pub peak_window_deg: Option<f64>,
    /// Cap on witnesses per pair; the subset is drawn at random.
    pub max_witnesses: Option<usize>,
    /// Seed of the witness subsampling.
    pub seed: u64,
    /// Relative spread of the witnesses' blocks above which a pair is
    /// flagged as inconsistent. The spread is roughly the RMS deviation of
    /// the witnesses' `φ` in radians; the default (about 3°) sits above the
    /// angular quantization of real detections and below the width of the
    /// peak window. Use `1e-12` to check analytic common lines.
    pub consistency_tolerance: f64,
}

impl Default for VotingParams {
    fn default() -> Self {
        Self {
            n_bins: 60,
            sigma_deg: 3.0,
            triangle_tolerance: 1e-5,
            cos_tolerance: 1e-12,
            peak_window_deg: None,
            max_witnesses: None,
            seed: 0,
            consistency_tolerance: 0.05,
        }
    }
}

impl VotingParams {
    pub(crate) fn peak_window(&self) -> f64 {
        self.peak_window_deg
            .unwrap_or(360.0 / self.n_bins.max(1) as f64)
    }
}

/// Parameters of the eigenvector synchronization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncParams {
    /// Number of leading eigenvalues reported in the log.
    pub top_eigenvalues: usize,
    /// Rotations with `‖R Rᵀ - I‖` above this are projected onto SO(3).
    pub orthogonality_tolerance: f64,
}

impl Default for SyncParams {
    fn default() -> Self {
        Self {
            top_eigenvalues: 10,
            orthogonality_tolerance: 1e-10,
        }
    }
}
