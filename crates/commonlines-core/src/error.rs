/// Malformed input dimensions or layout.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InputShapeError {
    #[error("angular resolution n_theta={n_theta} must be even and positive")]
    OddAngularResolution { n_theta: usize },
    #[error("radial resolution n_rad={n_rad} is too small (need at least {min})")]
    TooFewRadialSamples { n_rad: usize, min: usize },
    #[error("expected {expected} samples, got {actual}")]
    DataLength { expected: usize, actual: usize },
    #[error("need at least {min} images, got {actual}")]
    TooFewImages { actual: usize, min: usize },
    #[error("matrix must be square with {expected} rows, got {rows}x{cols}")]
    MatrixShape {
        expected: usize,
        rows: usize,
        cols: usize,
    },
    #[error("image side length must be positive")]
    EmptyImage,
}
