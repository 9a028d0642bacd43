//! Common-line detection between projections.
//!
//! Given a polar-Fourier stack, every candidate image pair is searched for
//! the pair of central rays (and 1D shift along them) with the highest
//! normalized correlation after a band-pass filter. The result is the
//! common-line matrix plus per-pair scores and 1D shifts.

mod detector;
mod error;
mod filter;
mod params;
mod search;

pub use detector::{candidate_pairs, CommonLineDetection, CommonLineDetector};
pub use error::{DegenerateReason, DetectError};
pub use filter::{FilteredRays, RayFilter, ShiftTable, FIRST_RADIUS};
pub use params::{default_n_rad, CommonLineParams, DEFAULT_N_THETA};
pub use search::{search_pair, search_shift, PairMatch};
