use commonlines_core::InputShapeError;
use commonlines_detect::DetectError;

/// Errors returned by shift estimation.
#[derive(thiserror::Error, Debug)]
pub enum ShiftError {
    #[error(transparent)]
    Shape(#[from] InputShapeError),
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error("shift system is underdetermined: {equations} equations for {unknowns} unknowns")]
    Underdetermined { equations: usize, unknowns: usize },
    #[error("invalid equation budget: {0}")]
    InvalidBudget(String),
    #[error("least-squares solution is not finite")]
    NonFinite,
}
