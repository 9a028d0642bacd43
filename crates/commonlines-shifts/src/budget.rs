use crate::ShiftError;
use serde::{Deserialize, Serialize};

/// Bytes of the dense `n_equations x 2N` system, `f64` entries.
fn dense_system_bytes(n_equations: usize, n_images: usize) -> f64 {
    n_equations as f64 * 2.0 * n_images as f64 * 8.0
}

/// How many of the available pair equations the approximate shift
/// estimator may use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum EquationBudget {
    #[default]
    All,
    /// Fraction of the available equations, in `(0, 1]`.
    Fraction(f64),
    /// Cap the size of the equivalent dense system, in megabytes.
    Megabytes(f64),
}

impl EquationBudget {
    /// Interpret a single memory factor: values in `(0, 1]` are a fraction
    /// of the equations, values of at least 100 a size in megabytes.
    pub fn from_memory_factor(factor: f64) -> Result<Self, ShiftError> {
        if !(factor.is_finite() && factor > 0.0) || (factor > 1.0 && factor < 100.0) {
            return Err(ShiftError::InvalidBudget(format!(
                "memory factor must lie in (0, 1] or be at least 100, got {factor}"
            )));
        }
        if factor <= 1.0 {
            Ok(Self::Fraction(factor))
        } else {
            Ok(Self::Megabytes(factor))
        }
    }

    /// Equations to draw out of `available` for `n_images` images.
    pub fn equations(&self, n_images: usize, available: usize) -> Result<usize, ShiftError> {
        let fraction = match *self {
            Self::All => 1.0,
            Self::Fraction(f) => {
                if !(f > 0.0 && f <= 1.0) {
                    return Err(ShiftError::InvalidBudget(format!(
                        "fraction must lie in (0, 1], got {f}"
                    )));
                }
                f
            }
            Self::Megabytes(mb) => {
                if !(mb.is_finite() && mb > 0.0) {
                    return Err(ShiftError::InvalidBudget(format!(
                        "megabytes must be positive, got {mb}"
                    )));
                }
                let total = dense_system_bytes(available, n_images);
                if total > 0.0 {
                    (mb * 1e6 / total).min(1.0)
                } else {
                    1.0
                }
            }
        };
        let n = (available as f64 * fraction).ceil() as usize;
        Ok(n.min(available))
    }
}
