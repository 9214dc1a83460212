//! Simulated ELM327 adapter
//!
//! Answers the setup and PID commands the way a CAN vehicle behind an
//! ELM327 v1.5 does (headers on, spaces off), replaying a scripted speed
//! profile. Replies are split into small chunks like a BLE notify stream,
//! optionally held back by a fixed per-reply delay so a polling loop runs
//! at a vehicle-like cadence instead of spinning.

use crate::error::ObdError;
use crate::transport::Transport;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// BLE notification payload size
pub const DEFAULT_CHUNK_SIZE: usize = 20;

const REPLY_CHANNEL_CAPACITY: usize = 64;

/// In-process adapter implementing [`Transport`]
#[derive(Debug)]
pub struct SimulatedElm327 {
    replies: mpsc::Sender<Vec<u8>>,
    speeds: VecDeque<u8>,
    speed: u8,
    rpm: u16,
    fuel_pressure_raw: u8,
    chunk_size: usize,
    reply_delay: Option<Duration>,
    available: bool,
    received: Vec<String>,
}

impl SimulatedElm327 {
    /// Create an adapter replaying `speeds` (km/h) on successive speed
    /// requests; the last value repeats once the profile runs out.
    pub fn new(speeds: impl IntoIterator<Item = u8>) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (replies, rx) = mpsc::channel(REPLY_CHANNEL_CAPACITY);
        let sim = Self {
            replies,
            speeds: speeds.into_iter().collect(),
            speed: 0,
            rpm: 850,
            fuel_pressure_raw: 0x64,
            chunk_size: DEFAULT_CHUNK_SIZE,
            reply_delay: None,
            available: true,
            received: Vec::new(),
        };
        (sim, rx)
    }

    /// Split replies into chunks of `size` bytes
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Hold each reply back for `delay` before its first chunk is delivered.
    ///
    /// Delayed replies are delivered from a spawned task, so `send` must then
    /// be called from inside a Tokio runtime.
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = Some(delay).filter(|d| !d.is_zero());
        self
    }

    /// Fixed engine speed reported for RPM requests
    pub fn with_rpm(mut self, rpm: u16) -> Self {
        self.rpm = rpm;
        self
    }

    /// Toggle whether writes are accepted
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Commands received so far, without terminator
    pub fn received(&self) -> &[String] {
        &self.received
    }

    fn reply_to(&mut self, command: &str) -> String {
        match command {
            "ATZ" => "\r\rELM327 v1.5\r\r>".to_string(),
            "ATE0" | "ATL0" | "ATH1" | "ATS0" | "ATSP6" => "OK\r\r>".to_string(),
            "ATDPN" => "6\r\r>".to_string(),
            "ATI" => "ELM327 v1.5\r\r>".to_string(),
            "0100" => "7E8064100BE3FA813\r\r>".to_string(),
            "01 0D" | "010D" => {
                if let Some(next) = self.speeds.pop_front() {
                    self.speed = next;
                }
                format!("7E803410D{:02X}\r\r>", self.speed)
            }
            "01 0C" | "010C" => {
                let raw = u32::from(self.rpm) * 4;
                format!("7E804410C{:04X}\r\r>", raw.min(0xFFFF))
            }
            "01 0A" | "010A" => format!("7E803410A{:02X}\r\r>", self.fuel_pressure_raw),
            _ => "?\r\r>".to_string(),
        }
    }
}

impl Transport for SimulatedElm327 {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ObdError> {
        if !self.available {
            return Err(ObdError::TransportUnavailable);
        }

        let command = String::from_utf8_lossy(bytes).trim().to_uppercase();
        debug!("Simulated adapter RX: {}", command);
        let reply = self.reply_to(&command);
        self.received.push(command);

        let chunks: Vec<Vec<u8>> = reply
            .as_bytes()
            .chunks(self.chunk_size)
            .map(<[u8]>::to_vec)
            .collect();

        match self.reply_delay {
            None => {
                for chunk in chunks {
                    self.replies
                        .try_send(chunk)
                        .map_err(|e| ObdError::TransportClosed(e.to_string()))?;
                }
            }
            Some(delay) => {
                if self.replies.is_closed() {
                    return Err(ObdError::TransportClosed("reply channel closed".to_string()));
                }
                let runtime = tokio::runtime::Handle::try_current()
                    .map_err(|e| ObdError::TransportClosed(e.to_string()))?;
                let replies = self.replies.clone();
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    for chunk in chunks {
                        if replies.send(chunk).await.is_err() {
                            warn!("Simulated adapter reply dropped, receiver gone");
                            return;
                        }
                    }
                });
            }
        }
        Ok(())
    }
}
