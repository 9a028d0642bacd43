//! Core types and geometry for common-lines orientation estimation.
//!
//! This crate holds the data model shared by the pipeline stages (image and
//! polar-Fourier stacks, common-line matrices, rotation and shift sets), the
//! common-line geometry conventions, rotation registration and synthetic
//! phantoms for testing. It does no detection or solving itself.

mod common_lines;
mod error;
pub mod geometry;
mod image;
mod logger;
mod polar;
mod poses;
mod registration;
pub mod synthetic;

pub use common_lines::{CommonLineAngleMatrix, CommonLineAngles, CommonLineMatrix};
pub use error::InputShapeError;
pub use image::ImageStack;
pub use polar::{frequency_step, PolarFourierStack, MIN_RADIAL_SAMPLES};
pub use poses::{RotationSet, ShiftSet};
pub use registration::{register_rotations, RotationRegistration};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
