use commonlines_core::InputShapeError;

/// Errors returned by rotation synchronization.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Shape(#[from] InputShapeError),
    #[error("Gram least-squares solve failed: {0}")]
    LeastSquares(&'static str),
    #[error("Gram matrix is not positive definite (eigenvalues {eigenvalues:?})")]
    NotPositiveDefinite { eigenvalues: [f64; 3] },
    #[error("synchronization matrix has fewer than 3 usable eigenvectors")]
    EigenDecomposition,
}
