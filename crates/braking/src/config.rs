//! Detector tunables

use crate::BrakingError;
use serde::{Deserialize, Serialize};

/// Braking detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakingConfig {
    /// Sliding window length (seconds)
    pub window_secs: f64,
    /// Deceleration that counts as hard braking (km/h per second)
    pub deceleration_threshold: f64,
    /// Minimum gap between two events (seconds)
    pub debounce_secs: f64,
    /// Deceleration mapped to intensity 1.0 (km/h per second)
    pub intensity_ceiling: f64,
    /// Window spans at or below this are too short to estimate (seconds)
    pub min_elapsed_secs: f64,
    /// How long `is_braking` stays up after the last braking instant (seconds)
    pub braking_hold_secs: f64,
}

impl Default for BrakingConfig {
    fn default() -> Self {
        Self {
            window_secs: 3.0,
            deceleration_threshold: 10.0,
            debounce_secs: 3.0,
            intensity_ceiling: 30.0,
            min_elapsed_secs: 0.1,
            braking_hold_secs: 2.0,
        }
    }
}

impl BrakingConfig {
    /// Reject non-positive (or NaN) tunables
    pub fn validate(&self) -> Result<(), BrakingError> {
        let fields = [
            ("window_secs", self.window_secs),
            ("deceleration_threshold", self.deceleration_threshold),
            ("debounce_secs", self.debounce_secs),
            ("intensity_ceiling", self.intensity_ceiling),
            ("min_elapsed_secs", self.min_elapsed_secs),
            ("braking_hold_secs", self.braking_hold_secs),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(BrakingError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.min_elapsed_secs >= self.window_secs {
            return Err(BrakingError::InvalidConfig(format!(
                "min_elapsed_secs ({}) must be shorter than window_secs ({})",
                self.min_elapsed_secs, self.window_secs
            )));
        }
        Ok(())
    }
}

/// Energy content of the fuel actually reaching the wheels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelModel {
    /// Calorific value (J per liter)
    pub calorific_value_j_per_l: f64,
    /// Fraction of that energy the drivetrain delivers
    pub drivetrain_efficiency: f64,
}

impl Default for FuelModel {
    fn default() -> Self {
        Self {
            calorific_value_j_per_l: 34_000_000.0,
            drivetrain_efficiency: 0.25,
        }
    }
}

impl FuelModel {
    /// Usable energy per liter (J)
    pub fn energy_per_liter(&self) -> f64 {
        self.calorific_value_j_per_l * self.drivetrain_efficiency
    }
}
