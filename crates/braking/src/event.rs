//! Braking events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Geographic position attached after the fact
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// One detected hard-braking event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrakingEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// km/h per second
    pub deceleration_rate: f64,
    /// km/h
    pub speed_at_detection: u8,
    /// Speed once deceleration subsided; written at most once
    pub speed_at_return: Option<u8>,
    /// 0..=1
    pub intensity: f64,
    pub fuel_used_liters: f64,
    pub fuel_cost: f64,
    pub address: Option<String>,
    pub location: Option<Location>,
}

impl BrakingEvent {
    pub fn level(&self) -> IntensityLevel {
        IntensityLevel::from_intensity(self.intensity)
    }

    /// Whether address or location has been attached
    pub fn is_enriched(&self) -> bool {
        self.address.is_some() || self.location.is_some()
    }
}

/// Coarse intensity bucket for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntensityLevel {
    Light,
    Medium,
    Strong,
}

impl IntensityLevel {
    pub fn from_intensity(intensity: f64) -> Self {
        if intensity > 0.7 {
            Self::Strong
        } else if intensity > 0.4 {
            Self::Medium
        } else {
            Self::Light
        }
    }
}

impl fmt::Display for IntensityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Strong => "strong",
        };
        f.write_str(label)
    }
}
