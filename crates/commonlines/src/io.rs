//! JSON configuration of the full pipeline.

use commonlines_detect::CommonLineParams;
use commonlines_shifts::{EquationBudget, ShiftParams};
use commonlines_sync::{SyncParams, VotingParams};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// How in-plane shifts are estimated after the rotations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ShiftMode {
    /// One equation per detected pair, using the detector's 1D shifts.
    #[default]
    Exact,
    /// A budgeted, seeded subset of pairs re-measured against the
    /// estimated rotations.
    Approximate {
        #[serde(default)]
        budget: EquationBudget,
        #[serde(default)]
        seed: u64,
    },
    Skip,
}

/// Parameters of every pipeline stage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OrientationParams {
    #[serde(default)]
    pub detect: CommonLineParams,
    #[serde(default)]
    pub voting: VotingParams,
    #[serde(default)]
    pub sync: SyncParams,
    #[serde(default)]
    pub shifts: ShiftMode,
    #[serde(default)]
    pub shift_solver: ShiftParams,
}

impl OrientationParams {
    /// Defaults with the shift search scaled to images of side `side`.
    pub fn for_resolution(side: usize) -> Self {
        Self {
            detect: CommonLineParams::for_resolution(side),
            ..Self::default()
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_take_defaults() {
        let p: OrientationParams =
            serde_json::from_str(r#"{ "shifts": { "mode": "approximate", "seed": 5 } }"#).unwrap();
        assert_eq!(
            p.shifts,
            ShiftMode::Approximate {
                budget: EquationBudget::All,
                seed: 5
            }
        );
        assert_eq!(p.voting.n_bins, 60);
        assert_eq!(p.detect.max_shift, 15.0);
    }

    #[test]
    fn shift_mode_is_tagged() {
        let json = serde_json::to_string(&ShiftMode::Skip).unwrap();
        assert_eq!(json, r#"{"mode":"skip"}"#);
    }
}
