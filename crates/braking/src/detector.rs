//! Braking Detector
//!
//! Sliding-window deceleration classifier fed one speed sample at a time.
//! Must be driven by a single consumer so samples arrive in order.

use crate::config::{BrakingConfig, FuelModel};
use crate::event::{BrakingEvent, Location};
use crate::fuel::FuelLossEstimator;
use crate::pricing::DEFAULT_VEHICLE_MASS_KG;
use crate::BrakingError;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Decoded vehicle speed with its arrival time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedSample {
    /// km/h
    pub speed: u8,
    pub timestamp: DateTime<Utc>,
}

impl SpeedSample {
    pub fn new(speed: u8, timestamp: DateTime<Utc>) -> Self {
        Self { speed, timestamp }
    }
}

/// Continuously published braking state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BrakingStatus {
    /// Latest normalized deceleration, 0..=1
    pub intensity: f64,
    /// A braking instant happened within the hold time
    pub is_braking: bool,
}

/// Change to the event log
#[derive(Debug, Clone, PartialEq)]
pub enum BrakingUpdate {
    Created(BrakingEvent),
    Recovered {
        id: Uuid,
        speed_at_return: u8,
    },
    Enriched {
        id: Uuid,
        address: Option<String>,
        location: Option<Location>,
    },
}

/// Samples no older than the window length
#[derive(Debug, Default)]
struct SpeedWindow {
    samples: VecDeque<SpeedSample>,
}

impl SpeedWindow {
    fn push(&mut self, sample: SpeedSample, max_age_secs: f64) {
        self.samples.push_back(sample);
        while let Some(front) = self.samples.front() {
            if seconds_between(sample.timestamp, front.timestamp) > max_age_secs {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn oldest(&self) -> Option<&SpeedSample> {
        self.samples.front()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Hard-braking detector
pub struct BrakingDetector {
    config: BrakingConfig,
    estimator: FuelLossEstimator,
    window: SpeedWindow,
    /// Append-only for the detector's lifetime
    events: Vec<BrakingEvent>,
    /// Event still waiting for its recovery speed
    active_event: Option<Uuid>,
    last_braking_at: Option<DateTime<Utc>>,
    vehicle_mass_kg: f64,
    fuel_price_per_liter: f64,
    status: watch::Sender<BrakingStatus>,
    updates: broadcast::Sender<BrakingUpdate>,
}

impl BrakingDetector {
    /// Create a detector; the configuration is validated first.
    pub fn new(config: BrakingConfig, fuel_model: FuelModel) -> Result<Self, BrakingError> {
        config.validate()?;
        info!("Creating braking detector with config: {:?}", config);

        let (status, _) = watch::channel(BrakingStatus::default());
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Ok(Self {
            config,
            estimator: FuelLossEstimator::new(fuel_model),
            window: SpeedWindow::default(),
            events: Vec::new(),
            active_event: None,
            last_braking_at: None,
            vehicle_mass_kg: DEFAULT_VEHICLE_MASS_KG,
            fuel_price_per_liter: 0.0,
            status,
            updates,
        })
    }

    pub fn config(&self) -> &BrakingConfig {
        &self.config
    }

    /// Mass used for new events (kg)
    pub fn set_vehicle_mass(&mut self, mass_kg: f64) {
        if mass_kg.is_finite() && mass_kg > 0.0 {
            self.vehicle_mass_kg = mass_kg;
        } else {
            warn!("Ignoring vehicle mass {}", mass_kg);
        }
    }

    pub fn vehicle_mass(&self) -> f64 {
        self.vehicle_mass_kg
    }

    /// Price used for new events; already recorded costs stay as they are.
    pub fn set_fuel_price(&mut self, price_per_liter: f64) {
        if price_per_liter.is_finite() && price_per_liter >= 0.0 {
            self.fuel_price_per_liter = price_per_liter;
        } else {
            warn!("Ignoring fuel price {}", price_per_liter);
        }
    }

    pub fn fuel_price(&self) -> f64 {
        self.fuel_price_per_liter
    }

    /// Recorded events, oldest first
    pub fn events(&self) -> &[BrakingEvent] {
        &self.events
    }

    pub fn event(&self, id: Uuid) -> Option<&BrakingEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn status(&self) -> BrakingStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<BrakingStatus> {
        self.status.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BrakingUpdate> {
        self.updates.subscribe()
    }

    /// Process one speed sample
    pub fn on_sample(&mut self, sample: SpeedSample) -> Option<BrakingUpdate> {
        let now = sample.timestamp;
        self.window.push(sample, self.config.window_secs);

        let rate = self.deceleration_rate(&sample);
        let mut update = None;

        if let Some(rate) = rate {
            let intensity = (rate / self.config.intensity_ceiling).clamp(0.0, 1.0);
            self.status.send_modify(|s| s.intensity = intensity);

            if rate > self.config.deceleration_threshold {
                self.last_braking_at = Some(now);
                update = self.on_braking_instant(&sample, rate, intensity);
            } else {
                update = self.on_recovery(sample.speed);
            }
        }

        let is_braking = self
            .last_braking_at
            .is_some_and(|at| seconds_between(now, at) < self.config.braking_hold_secs);
        self.status.send_modify(|s| s.is_braking = is_braking);

        if let Some(update) = &update {
            let _ = self.updates.send(update.clone());
        }
        update
    }

    /// Attach geocoding results to an event. Allowed once per event.
    pub fn enrich(
        &mut self,
        id: Uuid,
        address: Option<String>,
        location: Option<Location>,
    ) -> Result<(), BrakingError> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(BrakingError::UnknownEvent(id))?;
        if event.is_enriched() {
            return Err(BrakingError::AlreadyEnriched(id));
        }

        event.address = address.clone();
        event.location = location;
        debug!("Enriched braking event {}", id);
        let _ = self.updates.send(BrakingUpdate::Enriched {
            id,
            address,
            location,
        });
        Ok(())
    }

    /// Forget the window and the active event; recorded events stay.
    pub fn reset(&mut self) {
        debug!("Resetting braking detector ({} events kept)", self.events.len());
        self.window.clear();
        self.active_event = None;
        self.last_braking_at = None;
        self.status.send_replace(BrakingStatus::default());
    }

    /// km/h per second across the window, `None` while the window is too
    /// short to tell
    fn deceleration_rate(&self, newest: &SpeedSample) -> Option<f64> {
        if self.window.len() < 2 {
            return None;
        }
        let oldest = self.window.oldest()?;
        let elapsed = seconds_between(newest.timestamp, oldest.timestamp);
        if elapsed <= self.config.min_elapsed_secs {
            return None;
        }
        Some((f64::from(oldest.speed) - f64::from(newest.speed)) / elapsed)
    }

    fn on_braking_instant(
        &mut self,
        sample: &SpeedSample,
        rate: f64,
        intensity: f64,
    ) -> Option<BrakingUpdate> {
        if let Some(last) = self.events.last() {
            if seconds_between(sample.timestamp, last.timestamp) <= self.config.debounce_secs {
                debug!("Braking at {:.1} km/h/s absorbed by event {}", rate, last.id);
                return None;
            }
        }

        let initial_speed = self.window.oldest().map_or(sample.speed, |s| s.speed);
        let loss = self.estimator.estimate(
            f64::from(initial_speed),
            f64::from(sample.speed),
            self.vehicle_mass_kg,
            self.fuel_price_per_liter,
        );

        let event = BrakingEvent {
            id: Uuid::new_v4(),
            timestamp: sample.timestamp,
            deceleration_rate: rate,
            speed_at_detection: sample.speed,
            speed_at_return: None,
            intensity,
            fuel_used_liters: loss.liters,
            fuel_cost: loss.cost,
            address: None,
            location: None,
        };
        info!(
            "Hard braking: {} -> {} km/h at {:.1} km/h/s ({}), {:.4} L",
            initial_speed,
            sample.speed,
            rate,
            event.level(),
            loss.liters
        );
        counter!("braking_events_total").increment(1);

        self.active_event = Some(event.id);
        self.events.push(event.clone());
        Some(BrakingUpdate::Created(event))
    }

    fn on_recovery(&mut self, speed: u8) -> Option<BrakingUpdate> {
        let id = self.active_event.take()?;
        let event = self.events.iter_mut().find(|e| e.id == id)?;
        if event.speed_at_return.is_some() {
            return None;
        }

        event.speed_at_return = Some(speed);
        debug!("Braking event {} recovered at {} km/h", id, speed);
        Some(BrakingUpdate::Recovered {
            id,
            speed_at_return: speed,
        })
    }
}

/// `later - earlier` in seconds
fn seconds_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    let delta = later - earlier;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}
