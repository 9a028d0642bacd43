use crate::geometry::{common_line_angles, common_line_indices};
use crate::RotationSet;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Read access to pairwise common-line angles.
///
/// `angle(i, j)` is the in-plane angle (radians) of the common line between
/// images `i` and `j`, measured in image `i`. Entries are defined for both
/// orderings or for neither.
pub trait CommonLineAngles {
    fn n_images(&self) -> usize;
    fn angle(&self, i: usize, j: usize) -> Option<f64>;

    /// True when `(i, j)` and `(j, i)` are both defined.
    fn is_defined(&self, i: usize, j: usize) -> bool {
        self.angle(i, j).is_some() && self.angle(j, i).is_some()
    }
}

/// Quantized common lines, `-1` marking an undefined entry.
///
/// For a detected pair `i < j`, `index(i, j) < n_theta / 2` and
/// `index(j, i) < n_theta`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommonLineMatrix {
    n_images: usize,
    n_theta: usize,
    data: Vec<i32>,
}

impl CommonLineMatrix {
    pub fn undefined(n_images: usize, n_theta: usize) -> Self {
        Self {
            n_images,
            n_theta,
            data: vec![-1; n_images * n_images],
        }
    }

    /// Analytic common lines of a rotation set, quantized to `n_theta` rays.
    pub fn from_rotations(rotations: &RotationSet, n_theta: usize) -> Self {
        let n = rotations.len();
        let mut m = Self::undefined(n, n_theta);
        for i in 0..n {
            for j in (i + 1)..n {
                if let Some((c_ij, c_ji)) = common_line_indices(&rotations[i], &rotations[j], n_theta) {
                    m.set_pair(i, j, c_ij, c_ji);
                }
            }
        }
        m
    }

    #[inline]
    pub fn n_theta(&self) -> usize {
        self.n_theta
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize) -> Option<usize> {
        let v = self.data[i * self.n_images + j];
        (v >= 0).then_some(v as usize)
    }

    /// Set both entries of a pair at once.
    pub fn set_pair(&mut self, i: usize, j: usize, c_ij: usize, c_ji: usize) {
        self.data[i * self.n_images + j] = c_ij as i32;
        self.data[j * self.n_images + i] = c_ji as i32;
    }

    /// Raw entries, row-major.
    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    /// Number of defined unordered pairs.
    pub fn defined_pairs(&self) -> usize {
        (0..self.n_images)
            .flat_map(|i| ((i + 1)..self.n_images).map(move |j| (i, j)))
            .filter(|&(i, j)| self.index(i, j).is_some())
            .count()
    }
}

impl CommonLineAngles for CommonLineMatrix {
    fn n_images(&self) -> usize {
        self.n_images
    }

    fn angle(&self, i: usize, j: usize) -> Option<f64> {
        self.index(i, j)
            .map(|c| c as f64 * TAU / self.n_theta as f64)
    }
}

/// Continuous common-line angles in radians.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommonLineAngleMatrix {
    n_images: usize,
    data: Vec<Option<f64>>,
}

impl CommonLineAngleMatrix {
    pub fn undefined(n_images: usize) -> Self {
        Self {
            n_images,
            data: vec![None; n_images * n_images],
        }
    }

    /// Exact common lines of a rotation set, normalized like the detector
    /// output (`angle(i, j) < π` for `i < j`).
    pub fn from_rotations(rotations: &RotationSet) -> Self {
        let n = rotations.len();
        let mut m = Self::undefined(n);
        for i in 0..n {
            for j in (i + 1)..n {
                if let Some((a_ij, a_ji)) = common_line_angles(&rotations[i], &rotations[j]) {
                    m.set_pair(i, j, a_ij, a_ji);
                }
            }
        }
        m
    }

    pub fn set_pair(&mut self, i: usize, j: usize, a_ij: f64, a_ji: f64) {
        self.data[i * self.n_images + j] = Some(a_ij);
        self.data[j * self.n_images + i] = Some(a_ji);
    }
}

impl CommonLineAngles for CommonLineAngleMatrix {
    fn n_images(&self) -> usize {
        self.n_images
    }

    fn angle(&self, i: usize, j: usize) -> Option<f64> {
        self.data[i * self.n_images + j]
    }
}
