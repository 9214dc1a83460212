//! Drive
//!
//! One active drive: an adapter session and a braking detector created
//! together and torn down together. Every decoded speed is timestamped and
//! handed to the detector in arrival order.

use crate::config::DriveConfig;
use crate::DriveError;
use braking::{
    BrakingDetector, BrakingUpdate, FuelLossSummary, Period, PriceSelector, SpeedSample,
    StationQuote,
};
use chrono::{DateTime, Utc};
use obd_protocol::{AdapterSession, DecodedSample, ObdError, SessionEvent, SessionState, Transport};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Source of sample timestamps
pub type Clock = Box<dyn FnMut() -> DateTime<Utc> + Send>;

/// Session and detector for one drive
pub struct Drive<T: Transport> {
    session: AdapterSession<T>,
    detector: BrakingDetector,
    pricing: PriceSelector,
    clock: Clock,
}

impl<T: Transport> Drive<T> {
    /// Create a drive over `transport` with an already configured detector
    pub fn new(transport: T, mut detector: BrakingDetector, pricing: PriceSelector) -> Self {
        detector.set_fuel_price(pricing.fallback_price());
        Self {
            session: AdapterSession::new(transport),
            detector,
            pricing,
            clock: Box::new(Utc::now),
        }
    }

    /// Create a drive from the loaded configuration
    pub fn from_config(transport: T, config: &DriveConfig) -> Result<Self, DriveError> {
        let mut detector = BrakingDetector::new(config.braking.clone(), config.fuel.clone())?;
        detector.set_vehicle_mass(config.vehicle.mass_kg);
        info!(
            "Drive configured: {} kg, {} at fallback {:.3}/L",
            config.vehicle.mass_kg, config.vehicle.fuel_type, config.pricing.fallback_price_per_liter
        );
        Ok(Self::new(
            transport,
            detector,
            PriceSelector::new(config.pricing.fallback_price_per_liter),
        ))
    }

    /// Replace the wall clock used to timestamp speed samples
    pub fn with_clock(mut self, clock: impl FnMut() -> DateTime<Utc> + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn session(&self) -> &AdapterSession<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut AdapterSession<T> {
        &mut self.session
    }

    pub fn detector(&self) -> &BrakingDetector {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut BrakingDetector {
        &mut self.detector
    }

    /// Transport is ready: run the adapter setup
    pub fn start(&mut self) -> Result<(), DriveError> {
        self.session.start()?;
        Ok(())
    }

    /// Refresh the fuel price from station quotes
    pub fn update_prices(&mut self, quotes: &[StationQuote]) {
        let price = self.pricing.select(quotes);
        debug!("Fuel price now {:.3}/L from {} quotes", price, quotes.len());
        self.detector.set_fuel_price(price);
    }

    /// Feed one inbound transport chunk through session and detector
    pub fn handle_chunk(&mut self, chunk: &[u8]) -> Option<BrakingUpdate> {
        match self.session.on_chunk(chunk)? {
            SessionEvent::Sample(DecodedSample::Speed(speed)) => {
                let now = (self.clock)();
                self.detector.on_sample(SpeedSample::new(speed, now))
            }
            SessionEvent::Initialized {
                protocol,
                adapter_version,
            } => {
                info!("Adapter {} ready on {}", adapter_version, protocol);
                None
            }
            _ => None,
        }
    }

    /// Pump chunks until `shutdown` resolves or the stream ends.
    ///
    /// Starts the session if it is idle. An ended stream faults the session
    /// and is reported as [`ObdError::TransportClosed`].
    pub async fn run<F>(
        &mut self,
        mut chunks: mpsc::Receiver<Vec<u8>>,
        shutdown: F,
    ) -> Result<(), DriveError>
    where
        F: Future<Output = ()>,
    {
        if *self.session.state() == SessionState::Idle {
            self.start()?;
        }
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    self.stop();
                    return Ok(());
                }
                chunk = chunks.recv() => match chunk {
                    Some(chunk) => {
                        self.handle_chunk(&chunk);
                    }
                    None => {
                        warn!("Adapter stream ended");
                        self.session.fault("adapter stream ended");
                        return Err(ObdError::TransportClosed("adapter stream ended".to_string()).into());
                    }
                },
            }
        }
    }

    /// End the drive: stop the session and reset the detector. Recorded
    /// braking events are kept.
    pub fn stop(&mut self) {
        self.session.stop();
        self.detector.reset();
        info!("Drive stopped, {} braking events recorded", self.detector.events().len());
    }

    /// Fuel lost over `period`, ending now
    pub fn summary(&mut self, period: Period) -> FuelLossSummary {
        let now = (self.clock)();
        FuelLossSummary::for_period(self.detector.events(), period, now)
    }
}
