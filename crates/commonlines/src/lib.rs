//! High-level facade for the `commonlines-*` workspace.
//!
//! This crate provides:
//! - re-exports of the stage crates (`core`, `detect`, `sync`, `shifts`)
//! - [`OrientationEstimator`], which runs the whole pipeline on a
//!   polar-Fourier stack: common-line detection, voting, synchronization
//!   and shift estimation
//! - [`OrientationParams`], the JSON-loadable configuration of all stages
//!
//! ## Quickstart
//!
//! ```no_run
//! use commonlines::{OrientationEstimator, OrientationParams};
//! use commonlines::core::ImageStack;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = OrientationParams::load_json("orientation.json")?;
//! let images = ImageStack::new(65, 2, vec![0.0; 2 * 65 * 65])?;
//!
//! let result = OrientationEstimator::new(params).estimate_images(&images, 33, 360)?;
//! println!("estimated {} rotations", result.rotations.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `commonlines::core`: image and polar stacks, common-line matrices,
//!   geometry, rotation registration, synthetic phantoms.
//! - `commonlines::detect`: common-line detection with 1D shift search.
//! - `commonlines::sync`: witness voting, synchronization matrix, rotations.
//! - `commonlines::shifts`: shift equations and the LSQR solver.

pub use commonlines_core as core;
pub use commonlines_detect as detect;
pub use commonlines_shifts as shifts;
pub use commonlines_sync as sync;

mod io;
mod pipeline;

pub use commonlines_core::{register_rotations, PolarFourierStack, RotationSet, ShiftSet};
pub use io::{ConfigIoError, OrientationParams, ShiftMode};
pub use pipeline::{OrientationError, OrientationEstimator, OrientationResult};
