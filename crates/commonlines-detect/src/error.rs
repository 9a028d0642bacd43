use commonlines_core::InputShapeError;

/// Why a ray could not be used for correlation.
#[derive(Debug, Clone, PartialEq)]
pub enum DegenerateReason {
    /// The band-passed ray has (almost) no energy.
    LowEnergy { angle: usize, norm: f64 },
    /// The DC sample is not zero; images must be mean-subtracted.
    NonzeroDc { magnitude: f64 },
}

impl std::fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowEnergy { angle, norm } => {
                write!(f, "ray {angle} has filtered norm {norm:.3e}")
            }
            Self::NonzeroDc { magnitude } => write!(f, "nonzero DC component {magnitude:.3e}"),
        }
    }
}

/// Errors returned by the common-line detector.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error(transparent)]
    Shape(#[from] InputShapeError),
    #[error("invalid detector parameters: {0}")]
    InvalidParams(String),
    #[error("degenerate ray in image {image}: {reason}")]
    DegenerateRay {
        image: usize,
        reason: DegenerateReason,
    },
}
