use crate::geometry::orthogonality_error;
use nalgebra::{Matrix3, Vector2};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// One rotation per image.
///
/// Columns 0 and 1 of each matrix are the 3D directions of the image x and
/// y axes; column 2 is the viewing direction. Estimated sets agree with the
/// truth only up to a global rotation and possibly a global reflection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationSet(pub Vec<Matrix3<f64>>);

impl RotationSet {
    pub fn new(rotations: Vec<Matrix3<f64>>) -> Self {
        Self(rotations)
    }

    /// Largest `‖R Rᵀ − I‖_F` over the set.
    pub fn max_orthogonality_error(&self) -> f64 {
        self.0.iter().map(orthogonality_error).fold(0.0, f64::max)
    }

    /// Largest `|det R − 1|` over the set.
    pub fn max_determinant_error(&self) -> f64 {
        self.0
            .iter()
            .map(|r| (r.determinant() - 1.0).abs())
            .fold(0.0, f64::max)
    }

    pub fn into_inner(self) -> Vec<Matrix3<f64>> {
        self.0
    }
}

impl Deref for RotationSet {
    type Target = [Matrix3<f64>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Matrix3<f64>>> for RotationSet {
    fn from(v: Vec<Matrix3<f64>>) -> Self {
        Self(v)
    }
}

/// One in-plane shift `(dx, dy)` per image, in pixels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftSet(pub Vec<Vector2<f64>>);

impl ShiftSet {
    /// Interleaved `[x0, y0, x1, y1, ...]` layout used by the shift solver.
    pub fn from_interleaved(values: &[f64]) -> Self {
        Self(
            values
                .chunks_exact(2)
                .map(|c| Vector2::new(c[0], c[1]))
                .collect(),
        )
    }

    pub fn to_interleaved(&self) -> Vec<f64> {
        self.0.iter().flat_map(|s| [s.x, s.y]).collect()
    }
}

impl Deref for ShiftSet {
    type Target = [Vector2<f64>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
