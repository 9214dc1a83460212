//! Fuel Pricing
//!
//! Inputs to the fuel-loss estimate that come from the driver's settings or
//! from a station price feed: fuel type, vehicle mass and price per liter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Mass used when none (or garbage) is configured
pub const DEFAULT_VEHICLE_MASS_KG: f64 = 1300.0;

/// Quotes averaged by [`PriceSelector`]
pub const DEFAULT_NEAREST_QUOTES: usize = 5;

/// Fuel sold at the pump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    #[serde(alias = "benzina")]
    Petrol,
    #[default]
    #[serde(alias = "gasolio")]
    Diesel,
    #[serde(alias = "gpl")]
    Lpg,
    #[serde(alias = "metano")]
    Methane,
}

impl FuelType {
    /// Name used by the station price service
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Petrol => "benzina",
            Self::Diesel => "gasolio",
            Self::Lpg => "gpl",
            Self::Methane => "metano",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for FuelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "petrol" | "benzina" => Ok(Self::Petrol),
            "diesel" | "gasolio" => Ok(Self::Diesel),
            "lpg" | "gpl" => Ok(Self::Lpg),
            "methane" | "metano" => Ok(Self::Methane),
            other => Err(format!("unknown fuel type: {}", other)),
        }
    }
}

/// Parse a pump price; the feed uses a decimal comma ("1,859").
pub fn parse_price(text: &str) -> Option<f64> {
    let price: f64 = text.trim().replace(',', ".").parse().ok()?;
    (price.is_finite() && price > 0.0).then_some(price)
}

/// One station's price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationQuote {
    pub price_per_liter: f64,
    pub distance_km: f64,
}

/// Chooses the price used for new braking events
#[derive(Debug, Clone)]
pub struct PriceSelector {
    fallback_price: f64,
    nearest: usize,
}

impl PriceSelector {
    pub fn new(fallback_price: f64) -> Self {
        Self {
            fallback_price,
            nearest: DEFAULT_NEAREST_QUOTES,
        }
    }

    /// Average over this many nearest quotes (at least one)
    pub fn with_nearest(mut self, nearest: usize) -> Self {
        self.nearest = nearest.max(1);
        self
    }

    pub fn fallback_price(&self) -> f64 {
        self.fallback_price
    }

    /// Mean price of the nearest valid quotes, or the fallback when there
    /// are none.
    pub fn select(&self, quotes: &[StationQuote]) -> f64 {
        let mut valid: Vec<&StationQuote> = quotes
            .iter()
            .filter(|q| q.price_per_liter.is_finite() && q.price_per_liter > 0.0)
            .filter(|q| q.distance_km.is_finite() && q.distance_km >= 0.0)
            .collect();
        if valid.is_empty() {
            debug!("No station quotes, using fallback price {}", self.fallback_price);
            return self.fallback_price;
        }

        valid.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        valid.truncate(self.nearest);
        valid.iter().map(|q| q.price_per_liter).sum::<f64>() / valid.len() as f64
    }
}

/// Vehicle mass as entered in settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleMass(f64);

impl VehicleMass {
    /// Positive number, else the default mass
    pub fn parse(text: &str) -> Self {
        match text.trim().replace(',', ".").parse::<f64>() {
            Ok(kg) if kg.is_finite() && kg > 0.0 => Self(kg),
            _ => Self::default(),
        }
    }

    pub fn kg(&self) -> f64 {
        self.0
    }
}

impl Default for VehicleMass {
    fn default() -> Self {
        Self(DEFAULT_VEHICLE_MASS_KG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(price: f64, distance: f64) -> StationQuote {
        StationQuote {
            price_per_liter: price,
            distance_km: distance,
        }
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1,859"), Some(1.859));
        assert_eq!(parse_price(" 1.75 "), Some(1.75));
        assert_eq!(parse_price("n/d"), None);
        assert_eq!(parse_price("0"), None);
    }

    #[test]
    fn test_fuel_type_names() {
        assert_eq!(FuelType::default(), FuelType::Diesel);
        assert_eq!(FuelType::Petrol.api_name(), "benzina");
        assert_eq!("GPL".parse::<FuelType>(), Ok(FuelType::Lpg));
        assert_eq!("methane".parse::<FuelType>(), Ok(FuelType::Methane));
        assert!("kerosene".parse::<FuelType>().is_err());
    }

    #[test]
    fn test_selector_averages_nearest() {
        let selector = PriceSelector::new(1.8).with_nearest(2);
        let quotes = [quote(2.0, 9.0), quote(1.7, 1.0), quote(1.9, 2.5), quote(1.5, 20.0)];
        assert!((selector.select(&quotes) - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_selector_falls_back() {
        let selector = PriceSelector::new(1.79);
        assert_eq!(selector.select(&[]), 1.79);
        assert_eq!(selector.select(&[quote(0.0, 1.0), quote(f64::NAN, 2.0)]), 1.79);
    }

    #[test]
    fn test_vehicle_mass_parse() {
        assert_eq!(VehicleMass::parse("1450").kg(), 1450.0);
        assert_eq!(VehicleMass::parse("").kg(), 1300.0);
        assert_eq!(VehicleMass::parse("-3").kg(), 1300.0);
    }
}
