//! Drive configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then environment
//! variables prefixed `OBD_BUDDY` with `__` between sections, e.g.
//! `OBD_BUDDY__VEHICLE__MASS_KG=1450`.

use crate::DriveError;
use braking::{BrakingConfig, FuelModel, FuelType, DEFAULT_VEHICLE_MASS_KG};
use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use obd_protocol::serial::DEFAULT_BAUD_RATE;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "OBD_BUDDY";

/// Adapter connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Serial device; the simulated adapter is used when unset
    pub device: Option<String>,
    pub baud_rate: u32,
    /// Simulated adapter latency per reply (ms)
    pub sim_reply_delay_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            device: None,
            baud_rate: DEFAULT_BAUD_RATE,
            sim_reply_delay_ms: 100,
        }
    }
}

/// Vehicle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub mass_kg: f64,
    pub fuel_type: FuelType,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            mass_kg: DEFAULT_VEHICLE_MASS_KG,
            fuel_type: FuelType::default(),
        }
    }
}

/// Price used while no station quote is available
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub fallback_price_per_liter: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            fallback_price_per_liter: 1.8,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Plain,
            level: "info".to_string(),
        }
    }
}

/// Full drive configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub adapter: AdapterConfig,
    pub vehicle: VehicleConfig,
    pub pricing: PricingConfig,
    pub braking: BrakingConfig,
    pub fuel: FuelModel,
    pub logging: LoggingConfig,
}

impl DriveConfig {
    /// Load from `path` (if given and present) plus the environment
    pub fn load(path: Option<&str>) -> Result<Self, DriveError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        Self::finish(builder)
    }

    /// Load from TOML text plus the environment
    pub fn from_toml(text: &str) -> Result<Self, DriveError> {
        Self::finish(Config::builder().add_source(File::from_str(text, FileFormat::Toml)))
    }

    fn finish(builder: ConfigBuilder<::config::builder::DefaultState>) -> Result<Self, DriveError> {
        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.braking.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriveConfig::from_toml("").unwrap();
        assert_eq!(config.adapter.device, None);
        assert_eq!(config.adapter.baud_rate, 38400);
        assert_eq!(config.adapter.sim_reply_delay_ms, 100);
        assert_eq!(config.vehicle.mass_kg, 1300.0);
        assert_eq!(config.vehicle.fuel_type, FuelType::Diesel);
        assert_eq!(config.braking, BrakingConfig::default());
        assert_eq!(config.logging.format, LogFormat::Plain);
    }

    #[test]
    fn test_toml_sections() {
        let config = DriveConfig::from_toml(
            r#"
            [adapter]
            device = "/dev/rfcomm0"
            sim_reply_delay_ms = 40

            [vehicle]
            mass_kg = 1450.0
            fuel_type = "benzina"

            [braking]
            deceleration_threshold = 12.5

            [logging]
            format = "json"
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.adapter.device.as_deref(), Some("/dev/rfcomm0"));
        assert_eq!(config.adapter.sim_reply_delay_ms, 40);
        assert_eq!(config.vehicle.fuel_type, FuelType::Petrol);
        assert_eq!(config.braking.deceleration_threshold, 12.5);
        assert_eq!(config.braking.window_secs, 3.0);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_braking_rejected() {
        let err = DriveConfig::from_toml("[braking]\ndebounce_secs = -1.0\n").unwrap_err();
        assert!(matches!(err, DriveError::Braking(_)));
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let config = DriveConfig::load(Some("/nonexistent/obd-buddy")).unwrap();
        assert_eq!(config.pricing.fallback_price_per_liter, 1.8);
    }
}
