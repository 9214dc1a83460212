//! Fuel Loss Estimation
//!
//! Fuel burnt to regain the kinetic energy dissipated by a braking event.

use crate::config::FuelModel;
use serde::{Deserialize, Serialize};

const KMH_TO_MS: f64 = 1000.0 / 3600.0;

/// Fuel lost to one braking event
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FuelLoss {
    pub liters: f64,
    pub cost: f64,
}

/// Kinetic-energy fuel loss calculator
#[derive(Debug, Clone, Default)]
pub struct FuelLossEstimator {
    model: FuelModel,
}

impl FuelLossEstimator {
    pub fn new(model: FuelModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &FuelModel {
        &self.model
    }

    /// Fuel needed to get back from `v_final_kmh` to `v_initial_kmh`.
    ///
    /// Never negative: a speed gain costs nothing here.
    pub fn estimate(
        &self,
        v_initial_kmh: f64,
        v_final_kmh: f64,
        vehicle_mass_kg: f64,
        fuel_price_per_liter: f64,
    ) -> FuelLoss {
        let v_init = v_initial_kmh * KMH_TO_MS;
        let v_final = v_final_kmh * KMH_TO_MS;
        let delta_ek = 0.5 * vehicle_mass_kg * (v_init * v_init - v_final * v_final);

        let liters = (delta_ek / self.model.energy_per_liter()).max(0.0);
        FuelLoss {
            liters,
            cost: liters * fuel_price_per_liter,
        }
    }
}
