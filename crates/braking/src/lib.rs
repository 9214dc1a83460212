//! Braking Detection
//!
//! Turns the live speed stream into hard-braking events:
//! - sliding-window deceleration estimate and normalized intensity
//! - debounced event lifecycle (created, recovered, enriched)
//! - kinetic-energy fuel loss per event
//!
//! Persistence and geocoding stay outside; events are exposed through a
//! broadcast channel and an enrichment hook.

mod config;
mod detector;
mod event;
mod fuel;
mod pricing;
mod summary;

pub use config::{BrakingConfig, FuelModel};
pub use detector::{BrakingDetector, BrakingStatus, BrakingUpdate, SpeedSample};
pub use event::{BrakingEvent, IntensityLevel, Location};
pub use fuel::{FuelLoss, FuelLossEstimator};
pub use pricing::{
    parse_price, FuelType, PriceSelector, StationQuote, VehicleMass, DEFAULT_NEAREST_QUOTES,
    DEFAULT_VEHICLE_MASS_KG,
};
pub use summary::{FuelLossSummary, Period};

use thiserror::Error;
use uuid::Uuid;

/// Braking error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrakingError {
    #[error("Unknown braking event: {0}")]
    UnknownEvent(Uuid),

    #[error("Braking event {0} already enriched")]
    AlreadyEnriched(Uuid),

    #[error("Invalid braking configuration: {0}")]
    InvalidConfig(String),
}
