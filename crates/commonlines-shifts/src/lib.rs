//! In-plane shift estimation from common lines.
//!
//! Every image pair with a common line contributes one linear equation in
//! the `2N` unknown shifts: the 1D shift measured along the line equals the
//! difference of the two images' shifts projected on it. The system is
//! sparse (four nonzeros per row) and is solved in the least-squares sense
//! with LSQR. The solution is defined up to a global 3D translation, which
//! projects to a 3-dimensional null space of the system.
//!
//! Two ways of building the system are provided:
//!
//! - exact: from a common-line matrix and the 1D shifts measured by the
//!   detector;
//! - approximate: from a seeded subset of pairs, with the common lines
//!   recomputed from estimated rotations and the 1D shift re-measured on
//!   the polar-Fourier stack.

mod budget;
mod error;
mod estimator;
mod lsqr;
mod sparse;

pub use budget::EquationBudget;
pub use error::ShiftError;
pub use estimator::{ShiftEstimate, ShiftEstimator, ShiftParams};
pub use lsqr::{lsqr, LsqrParams, LsqrSolution, LsqrStop};
pub use sparse::{estimate_equation_capacity, CsrMatrix, ShiftSystem, ShiftSystemBuilder};
