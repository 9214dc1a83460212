//! OBD-II PID Definitions
//!
//! The Mode 01 PIDs polled by the session and their frame layout.

use serde::{Deserialize, Serialize};

/// Mode 01 (current data) PIDs polled by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Pid {
    /// Fuel pressure, gauge (0x0A)
    FuelPressure = 0x0A,
    /// Engine RPM (0x0C)
    Rpm = 0x0C,
    /// Vehicle speed (0x0D)
    Speed = 0x0D,
}

impl Pid {
    /// Get the PID hex value
    pub fn as_hex(&self) -> u8 {
        *self as u8
    }

    /// Number of data bytes following the PID in a response
    pub fn response_bytes(&self) -> usize {
        match self {
            Pid::Rpm => 2,
            Pid::Speed | Pid::FuelPressure => 1,
        }
    }

    /// Value of the ISO-TP length field: mode + PID + data bytes
    pub fn frame_length(&self) -> u8 {
        2 + self.response_bytes() as u8
    }

    /// Minimum compacted response length accepted by the decoder
    pub fn min_response_len(&self) -> usize {
        match self {
            Pid::Rpm => 12,
            Pid::Speed | Pid::FuelPressure => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_length() {
        assert_eq!(Pid::Speed.frame_length(), 3);
        assert_eq!(Pid::Rpm.frame_length(), 4);
        assert_eq!(Pid::FuelPressure.frame_length(), 3);
    }
}
